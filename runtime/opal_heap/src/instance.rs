//! Instance storage.
//!
//! An `Instance` realizes one region of a planned layout: a flattened
//! byte space plus a run of nullable reference slots. Allocation
//! bulk-zeroes the bytes — the zero bit pattern *is* the default value
//! of every flattened cell, recursively — and nulls every reference
//! slot. There is no separate initialization pass.

use std::fmt;
use std::sync::Arc;

use opal_layout::TypeLayout;
use opal_types::TypeIdx;

use crate::GcRef;

/// Which region of the layout this storage realizes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RegionKind {
    /// Per-object instance fields.
    Instance,
    /// Per-type static fields.
    Statics,
}

/// Storage for one object (or one type's statics).
///
/// Exclusively owned by its allocator; flattened sub-cells are owned
/// transitively. Mutation goes through the access enforcer, never
/// through a shared reference.
#[derive(Clone)]
pub struct Instance {
    layout: Arc<TypeLayout>,
    region: RegionKind,
    bytes: Box<[u8]>,
    refs: Box<[Option<GcRef>]>,
}

impl Instance {
    /// Allocate zeroed instance-field storage for a type.
    pub(crate) fn new(layout: Arc<TypeLayout>) -> Self {
        Self::for_region(layout, RegionKind::Instance)
    }

    /// Allocate zeroed static-field storage for a type.
    pub(crate) fn new_statics(layout: Arc<TypeLayout>) -> Self {
        Self::for_region(layout, RegionKind::Statics)
    }

    fn for_region(layout: Arc<TypeLayout>, region: RegionKind) -> Self {
        let r = match region {
            RegionKind::Instance => &layout.instance,
            RegionKind::Statics => &layout.statics,
        };
        let bytes = vec![0u8; r.byte_len as usize].into_boxed_slice();
        let refs = vec![None; r.ref_len as usize].into_boxed_slice();
        Self {
            layout,
            region,
            bytes,
            refs,
        }
    }

    /// Build an instance from already-populated storage.
    ///
    /// Used by flattened-cell reads to detach an embedded value.
    pub(crate) fn from_parts(
        layout: Arc<TypeLayout>,
        bytes: Box<[u8]>,
        refs: Box<[Option<GcRef>]>,
    ) -> Self {
        Self {
            layout,
            region: RegionKind::Instance,
            bytes,
            refs,
        }
    }

    /// The instance's type.
    #[inline]
    pub fn ty(&self) -> TypeIdx {
        self.layout.ty
    }

    /// The published layout this storage follows.
    #[inline]
    pub fn layout(&self) -> &Arc<TypeLayout> {
        &self.layout
    }

    /// The region of the layout this storage realizes.
    #[inline]
    pub(crate) fn region_kind(&self) -> RegionKind {
        self.region
    }

    /// Flattened byte space.
    #[inline]
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reference slots.
    #[inline]
    pub(crate) fn refs(&self) -> &[Option<GcRef>] {
        &self.refs
    }

    /// Split mutable access to bytes and reference slots.
    #[inline]
    pub(crate) fn parts_mut(&mut self) -> (&mut [u8], &mut [Option<GcRef>]) {
        (&mut self.bytes, &mut self.refs)
    }
}

/// Structural equality: same type, same flattened bits, same boxed
/// contents (recursively). Two defaults of the same type are equal.
impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.layout.ty == other.layout.ty
            && self.region == other.region
            && self.bytes == other.bytes
            && self.refs == other.refs
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("ty", &self.layout.ty)
            .field("bytes", &self.bytes.len())
            .field("refs", &self.refs.len())
            .finish()
    }
}
