//! Dynamic field handles.
//!
//! A `FieldHandle` is a field access resolved once: owner type, region,
//! placement, and (for flattened composites) the field type's layout.
//! It is the runtime's answer to dynamically generated accessors —
//! one generic path keyed by the placement kind instead of synthesized
//! code per field. Handle-based access funnels into the same cell
//! enforcer as every other path, so the contract is identical.

use std::sync::Arc;

use opal_layout::{FieldRef, FieldSlot, TypeLayout};
use opal_types::{Name, TypeIdx};

/// A resolved accessor for one declared field.
///
/// Obtain with [`Heap::handle`](crate::Heap::handle); use through
/// [`Heap::get_with`](crate::Heap::get_with) and friends.
#[derive(Clone, Debug)]
pub struct FieldHandle {
    pub(crate) owner: TypeIdx,
    pub(crate) name: Name,
    pub(crate) fref: FieldRef,
    pub(crate) slot: FieldSlot,
    pub(crate) sub_layout: Option<Arc<TypeLayout>>,
}

impl FieldHandle {
    /// The type declaring the field.
    pub fn owner(&self) -> TypeIdx {
        self.owner
    }

    /// The field's declared type.
    pub fn ty(&self) -> TypeIdx {
        self.slot.ty
    }

    /// The field's name handle.
    pub fn name(&self) -> Name {
        self.name
    }

    /// Whether the field lives in static storage.
    pub fn is_static(&self) -> bool {
        self.fref.is_static
    }

    /// Whether the field's storage is flattened (inline, never null).
    pub fn is_flattened(&self) -> bool {
        self.slot.placement.is_flattened()
    }
}
