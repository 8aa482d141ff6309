//! Interned names for types and fields.
//!
//! Provides O(1) interning, lookup, and equality via 32-bit handles.
//! The interner leaks its string storage: runtime identifiers live for
//! the lifetime of the process, matching how the registry holds them.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;

/// An interned identifier handle.
///
/// Two `Name`s are equal iff they were interned from the same string in
/// the same interner. Comparison is a u32 compare.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// The pre-interned empty string.
    pub const EMPTY: Self = Self(0);

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

struct InternerInner {
    /// Map from string content to index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents, indexed by `Name`.
    strings: Vec<&'static str>,
}

/// String interner for type and field names.
///
/// # Thread Safety
///
/// Interning takes a write lock, lookup a read lock. The registry shares
/// one interner; lookups after type preparation are read-only.
pub struct NameInterner {
    inner: RwLock<InternerInner>,
}

impl NameInterner {
    /// Create a new interner with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let mut map = FxHashMap::default();
        let empty: &'static str = "";
        map.insert(empty, 0);
        Self {
            inner: RwLock::new(InternerInner {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Intern a string, returning its handle.
    ///
    /// Re-interning the same content returns the same `Name`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn intern(&self, s: &str) -> Name {
        {
            let inner = self.inner.read();
            if let Some(&idx) = inner.map.get(s) {
                return Name(idx);
            }
        }

        let mut inner = self.inner.write();
        // Re-check: another writer may have interned between the locks.
        if let Some(&idx) = inner.map.get(s) {
            return Name(idx);
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = inner.strings.len() as u32;
        inner.strings.push(leaked);
        inner.map.insert(leaked, idx);
        Name(idx)
    }

    /// Look up the string content of a handle.
    ///
    /// Returns the empty string for handles this interner never produced.
    pub fn lookup(&self, name: Name) -> &'static str {
        let inner = self.inner.read();
        inner
            .strings
            .get(name.0 as usize)
            .copied()
            .unwrap_or_default()
    }

    /// Number of interned strings (including the empty string).
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Whether the interner holds only the pre-interned empty string.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for NameInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NameInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameInterner")
            .field("len", &self.len())
            .finish()
    }
}
