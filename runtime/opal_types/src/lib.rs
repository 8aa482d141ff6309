//! Type descriptors for the Opal runtime.
//!
//! This crate holds the static side of the value-storage engine: interned
//! names, 32-bit type indices, descriptor flags, and the `TypeRegistry`
//! that owns every declared type. Nothing here allocates instances —
//! layout planning and storage live in `opal_layout` and `opal_heap`.
//!
//! # Type Indices
//!
//! All types are referenced by [`TypeIdx`], a 32-bit handle. Scalar types
//! have fixed indices for O(1) classification; registered composite types
//! are assigned indices from [`TypeIdx::FIRST_DYNAMIC`] upward. Equality
//! is index comparison, never structural.

/// Assert the size of a type at compile time.
///
/// Fails to compile if the size regresses, which keeps hot handle types
/// from silently growing.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod flags;
mod idx;
mod name;
mod registry;
mod scalar;

pub use flags::{FieldFlags, TypeFlags};
pub use idx::TypeIdx;
pub use name::{Name, NameInterner};
pub use registry::{FieldDescriptor, RegistryError, TypeDescriptor, TypeRegistry};
pub use scalar::ScalarKind;

// Size assertions to prevent accidental regressions.
// TypeIdx and Name are passed by value throughout the runtime.
#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{Name, TypeIdx};
    static_assert_size!(TypeIdx, 4);
    static_assert_size!(Name, 4);
}
