//! Runtime values.
//!
//! Scalars are stored inline in the enum; composite values are behind
//! [`GcRef`] (`Arc`). A composite `Value` is a *reference* to an
//! instance — whether storing it copies the instance's bits or aliases
//! the reference is decided by the target cell's placement, not by the
//! value itself.
//!
//! Nullability is `Option<Value>` at the API boundary. There is no null
//! variant: a `Value` always holds something.

use std::fmt;
use std::sync::Arc;

use opal_types::{ScalarKind, TypeIdx};

use crate::Instance;

/// Shared reference to a heap instance.
///
/// Immutable once created: writes replace the reference in its slot,
/// they never mutate through it.
pub type GcRef = Arc<Instance>;

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit float.
    Float32(f32),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// 8-bit unsigned byte.
    Byte(u8),
    /// Composite value (value type or reference type instance).
    Composite(GcRef),
}

impl Value {
    /// Wrap an owned instance as a composite value.
    pub fn composite(instance: Instance) -> Self {
        Self::Composite(Arc::new(instance))
    }

    /// The value's runtime type.
    pub fn type_idx(&self) -> TypeIdx {
        match self {
            Self::Int32(_) => TypeIdx::INT32,
            Self::Int64(_) => TypeIdx::INT64,
            Self::Float32(_) => TypeIdx::FLOAT32,
            Self::Float64(_) => TypeIdx::FLOAT64,
            Self::Bool(_) => TypeIdx::BOOL,
            Self::Byte(_) => TypeIdx::BYTE,
            Self::Composite(r) => r.ty(),
        }
    }

    /// The scalar kind, if this is a scalar.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Self::Composite(_) => None,
            _ => ScalarKind::of(self.type_idx()),
        }
    }

    /// The composite reference, if this is a composite.
    pub fn as_composite(&self) -> Option<&GcRef> {
        match self {
            Self::Composite(r) => Some(r),
            _ => None,
        }
    }

    /// The zero value of a scalar kind.
    pub const fn scalar_zero(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Int32 => Self::Int32(0),
            ScalarKind::Int64 => Self::Int64(0),
            ScalarKind::Float32 => Self::Float32(0.0),
            ScalarKind::Float64 => Self::Float64(0.0),
            ScalarKind::Bool => Self::Bool(false),
            ScalarKind::Byte => Self::Byte(0),
        }
    }
}

/// Structural equality: scalars by value, composites by type and
/// storage contents (recursively through boxed sub-values).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float32(a), Self::Float32(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Composite(a), Self::Composite(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32(v) => write!(f, "{v}i32"),
            Self::Int64(v) => write!(f, "{v}i64"),
            Self::Float32(v) => write!(f, "{v}f32"),
            Self::Float64(v) => write!(f, "{v}f64"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}u8"),
            Self::Composite(r) => f
                .debug_struct("Composite")
                .field("ty", &r.ty())
                .finish_non_exhaustive(),
        }
    }
}
