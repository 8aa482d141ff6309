//! Access-time errors.
//!
//! Every variant is recoverable by the caller and leaves the target cell
//! byte-identical to its pre-write state: a failing write has zero
//! observable effect. Preparation-time failures are `LayoutError` in
//! `opal_layout`, not represented here.

use thiserror::Error;

/// Result of a storage access.
pub type AccessResult<T> = Result<T, AccessError>;

/// Error from a field, static, or array element access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// A null (absent) value was written to flattened storage.
    ///
    /// Flattened cells behave like non-nullable primitives; this is the
    /// null-dereference-class failure an ordinary access would raise.
    #[error("null written to flattened storage of type `{ty}`")]
    NullExclusionViolation { ty: String },

    /// A covariant array store whose runtime type is incompatible with
    /// the declared element type. Distinct from a null-exclusion
    /// violation: the value exists but does not fit the declaration.
    #[error("array store type violation: `{found}` is not assignable to `{expected}`")]
    StoreTypeViolation { expected: String, found: String },

    /// The written value's type does not match the cell's declared type.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: String, found: String },

    /// Array index outside the array's bounds.
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Full-array copy between arrays of different lengths.
    #[error("array length mismatch: source {src}, destination {dst}")]
    LengthMismatch { src: usize, dst: usize },

    /// The named field does not exist on the type.
    #[error("no field `{field}` on type `{ty}`")]
    NoSuchField { ty: String, field: String },

    /// An instance-storage access named a static field.
    #[error("field `{ty}.{field}` is static; access it through the type")]
    StaticField { ty: String, field: String },

    /// A static-storage access named an instance field.
    #[error("field `{ty}.{field}` is an instance field")]
    InstanceField { ty: String, field: String },

    /// The type was never prepared (layout planned, statics allocated).
    #[error("type `{ty}` has not been prepared")]
    NotPrepared { ty: String },
}
