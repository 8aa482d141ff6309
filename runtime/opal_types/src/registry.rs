//! Registry for declared runtime types.
//!
//! The `TypeRegistry` owns every type the runtime knows about: the six
//! pre-registered scalars, value types, reference (identity) types, and
//! interfaces. Layout planning consumes descriptors from here; nothing in
//! this module computes layout.
//!
//! # Design
//!
//! - Dual indexing: `BTreeMap<Name, TypeIdx>` (deterministic iteration) +
//!   `FxHashMap<TypeIdx, TypeDescriptor>` (O(1) lookup)
//! - Two-phase registration: `declare_*` hands out an index so mutually
//!   referential field types can name each other, `define` attaches the
//!   fields and finalizes. Descriptors are immutable once finalized.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{FieldFlags, Name, NameInterner, ScalarKind, TypeFlags, TypeIdx};

/// A declared field of a composite type.
///
/// Immutable once the owning type is finalized.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: Name,
    /// Declared field type.
    pub ty: TypeIdx,
    /// Declared annotations (flattenable, static).
    pub flags: FieldFlags,
}

impl FieldDescriptor {
    /// Create a field descriptor.
    pub const fn new(name: Name, ty: TypeIdx, flags: FieldFlags) -> Self {
        Self { name, ty, flags }
    }
}

/// A registered type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// The type name.
    pub name: Name,
    /// Registry index of this type.
    pub idx: TypeIdx,
    /// Storage-character flags.
    pub flags: TypeFlags,
    /// Declared fields, in declaration order. Empty until finalized.
    pub fields: Vec<FieldDescriptor>,
    /// Declared supertypes/interfaces, for assignability.
    pub implements: Vec<TypeIdx>,
}

impl TypeDescriptor {
    /// Whether fields have been defined and the descriptor is immutable.
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.flags.contains(TypeFlags::IS_FINALIZED)
    }
}

/// Error from type registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A type with this name is already registered.
    DuplicateType { name: String },
    /// The index does not name a registered type.
    UnknownType { idx: TypeIdx },
    /// The type's fields were already defined.
    AlreadyFinalized { idx: TypeIdx },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateType { name } => {
                write!(f, "type `{name}` is already registered")
            }
            RegistryError::UnknownType { idx } => {
                write!(f, "no registered type at index {}", idx.raw())
            }
            RegistryError::AlreadyFinalized { idx } => {
                write!(f, "type at index {} is already finalized", idx.raw())
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Registry of every type the runtime knows about.
pub struct TypeRegistry {
    interner: NameInterner,
    /// Types indexed by name (`BTreeMap` for deterministic iteration).
    by_name: BTreeMap<Name, TypeIdx>,
    /// Types indexed by `TypeIdx` (`FxHashMap` for fast lookup).
    by_idx: FxHashMap<TypeIdx, TypeDescriptor>,
    /// Next index for registered composite types.
    next_idx: u32,
}

impl TypeRegistry {
    /// Create a registry with the scalar types pre-registered.
    pub fn new() -> Self {
        let mut registry = Self {
            interner: NameInterner::new(),
            by_name: BTreeMap::new(),
            by_idx: FxHashMap::default(),
            next_idx: TypeIdx::FIRST_DYNAMIC,
        };

        for kind in [
            ScalarKind::Int32,
            ScalarKind::Int64,
            ScalarKind::Float32,
            ScalarKind::Float64,
            ScalarKind::Bool,
            ScalarKind::Byte,
        ] {
            let name = registry.interner.intern(kind.name());
            let idx = kind.type_idx();
            registry.by_name.insert(name, idx);
            registry.by_idx.insert(
                idx,
                TypeDescriptor {
                    name,
                    idx,
                    flags: TypeFlags::IS_PRIMITIVE | TypeFlags::IS_FINALIZED,
                    fields: Vec::new(),
                    implements: Vec::new(),
                },
            );
        }

        registry
    }

    /// Intern a name in the registry's interner.
    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// Look up the string content of an interned name.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Declare a value type, returning its index.
    ///
    /// Fields are attached later with [`define`](Self::define), so types
    /// whose fields reference each other can be declared first.
    pub fn declare_value_type(&mut self, name: &str) -> Result<TypeIdx, RegistryError> {
        self.declare(name, TypeFlags::IS_VALUE)
    }

    /// Declare a reference (identity) type, returning its index.
    pub fn declare_reference_type(&mut self, name: &str) -> Result<TypeIdx, RegistryError> {
        self.declare(name, TypeFlags::IS_REFERENCE)
    }

    /// Register an interface.
    ///
    /// Interfaces carry no fields and are finalized immediately.
    /// `extends` lists supertypes for transitive assignability.
    pub fn register_interface(
        &mut self,
        name: &str,
        extends: Vec<TypeIdx>,
    ) -> Result<TypeIdx, RegistryError> {
        let idx = self.declare(name, TypeFlags::IS_INTERFACE)?;
        self.define(idx, Vec::new(), extends)?;
        Ok(idx)
    }

    /// Declare and define a value type in one step.
    pub fn register_value_type(
        &mut self,
        name: &str,
        fields: Vec<FieldDescriptor>,
        implements: Vec<TypeIdx>,
    ) -> Result<TypeIdx, RegistryError> {
        let idx = self.declare_value_type(name)?;
        self.define(idx, fields, implements)?;
        Ok(idx)
    }

    /// Declare and define a reference type in one step.
    pub fn register_reference_type(
        &mut self,
        name: &str,
        fields: Vec<FieldDescriptor>,
        implements: Vec<TypeIdx>,
    ) -> Result<TypeIdx, RegistryError> {
        let idx = self.declare_reference_type(name)?;
        self.define(idx, fields, implements)?;
        Ok(idx)
    }

    fn declare(&mut self, name: &str, flags: TypeFlags) -> Result<TypeIdx, RegistryError> {
        let name = self.interner.intern(name);
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateType {
                name: self.interner.lookup(name).to_owned(),
            });
        }
        let idx = TypeIdx::from_raw(self.next_idx);
        self.next_idx += 1;
        self.by_name.insert(name, idx);
        self.by_idx.insert(
            idx,
            TypeDescriptor {
                name,
                idx,
                flags,
                fields: Vec::new(),
                implements: Vec::new(),
            },
        );
        Ok(idx)
    }

    /// Attach fields and supertypes to a declared type and finalize it.
    ///
    /// After this, the descriptor never changes; layout planning may run.
    pub fn define(
        &mut self,
        idx: TypeIdx,
        fields: Vec<FieldDescriptor>,
        implements: Vec<TypeIdx>,
    ) -> Result<(), RegistryError> {
        let entry = self
            .by_idx
            .get_mut(&idx)
            .ok_or(RegistryError::UnknownType { idx })?;
        if entry.flags.contains(TypeFlags::IS_FINALIZED) {
            return Err(RegistryError::AlreadyFinalized { idx });
        }
        entry.fields = fields;
        entry.implements = implements;
        entry.flags |= TypeFlags::IS_FINALIZED;
        Ok(())
    }

    /// Get the descriptor for a type index.
    pub fn descriptor(&self, idx: TypeIdx) -> Option<&TypeDescriptor> {
        self.by_idx.get(&idx)
    }

    /// Look up a type index by name.
    pub fn idx_of(&self, name: &str) -> Option<TypeIdx> {
        let name = self.interner.intern(name);
        self.by_name.get(&name).copied()
    }

    /// Position of a field within a type's declaration order.
    pub fn field_index(&self, owner: TypeIdx, field: &str) -> Option<usize> {
        let name = self.interner.intern(field);
        self.descriptor(owner)?
            .fields
            .iter()
            .position(|f| f.name == name)
    }

    /// Human-readable name for a type index.
    pub fn type_name(&self, idx: TypeIdx) -> &'static str {
        self.descriptor(idx)
            .map_or("<unknown>", |d| self.interner.lookup(d.name))
    }

    /// Whether a value of type `src` may be stored where `dst` is declared.
    ///
    /// Reflexive, and transitive over declared `implements` edges.
    /// Scalars are assignable only to themselves.
    pub fn is_assignable(&self, src: TypeIdx, dst: TypeIdx) -> bool {
        if src == dst {
            return true;
        }
        let mut visited = FxHashSet::default();
        let mut stack = vec![src];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(desc) = self.descriptor(current) else {
                continue;
            };
            for &parent in &desc.implements {
                if parent == dst {
                    return true;
                }
                stack.push(parent);
            }
        }
        false
    }

    /// Iterate registered types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.by_name.values().filter_map(|idx| self.by_idx.get(idx))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.by_idx.len())
            .finish()
    }
}
