//! Descriptor flags for types and fields.
//!
//! Flags are set at registration time and queried in O(1) during layout
//! planning and access enforcement. They classify a type's storage
//! character and carry a field's declared annotations.

use bitflags::bitflags;

bitflags! {
    /// Properties of a declared type.
    ///
    /// Set once when the type is registered, never recomputed.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct TypeFlags: u32 {
        /// Machine-native scalar (fixed index, fixed bit pattern).
        const IS_PRIMITIVE = 1 << 0;
        /// Value-bearing composite: eligible for flattened storage.
        const IS_VALUE = 1 << 1;
        /// Identity class: always stored behind a reference, never inlined.
        const IS_REFERENCE = 1 << 2;
        /// Abstract supertype: carries no fields, used as a declared
        /// element type for covariant arrays.
        const IS_INTERFACE = 1 << 3;
        /// Fields are defined; descriptors are immutable from here on.
        const IS_FINALIZED = 1 << 4;
    }
}

bitflags! {
    /// Declared annotations of a field.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct FieldFlags: u32 {
        /// The field's value may be stored inline in the owner.
        /// Without this flag, storage is always a nullable reference slot.
        const FLATTENABLE = 1 << 0;
        /// The field belongs to the type, not to instances.
        const STATIC = 1 << 1;
    }
}

impl TypeFlags {
    /// Whether instances of this type can ever be stored inline.
    #[inline]
    pub const fn flattenable(self) -> bool {
        self.contains(Self::IS_PRIMITIVE) || self.contains(Self::IS_VALUE)
    }
}

impl FieldFlags {
    /// Whether the field is declared flattenable.
    #[inline]
    pub const fn is_flattenable(self) -> bool {
        self.contains(Self::FLATTENABLE)
    }

    /// Whether the field is a static field.
    #[inline]
    pub const fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }
}

impl Default for TypeFlags {
    fn default() -> Self {
        Self::empty()
    }
}
