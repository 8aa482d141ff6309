//! Published layout data: placements, regions, and type layouts.
//!
//! A [`TypeLayout`] is the immutable product of planning one type. It is
//! shared behind an `Arc` by every instance of the type and by the
//! static-field storage; nothing mutates it after publication.

use opal_types::{Name, TypeIdx};
use smallvec::SmallVec;

/// Where one field's storage lives inside its owner.
///
/// The closed tagged union every access path dispatches on. There is no
/// third case: a cell is inline bytes or a nullable reference slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldPlacement {
    /// Inline byte range in the owner's flattened storage.
    ///
    /// `ref_base..ref_base + ref_len` is the owner-relative range of
    /// reference slots contributed by boxed sub-fields of the flattened
    /// value (embedded transitively along with its bytes).
    Flattened {
        offset: u32,
        size: u32,
        ref_base: u32,
        ref_len: u32,
    },

    /// Nullable reference slot at `slot` in the owner's reference space.
    Boxed { slot: u32 },
}

impl FieldPlacement {
    /// Whether this is an inline placement.
    #[inline]
    pub const fn is_flattened(self) -> bool {
        matches!(self, Self::Flattened { .. })
    }
}

/// One field's declared type plus its resolved placement.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldSlot {
    /// Field name (for diagnostics).
    pub name: Name,
    /// Declared field type.
    pub ty: TypeIdx,
    /// Resolved storage placement.
    pub placement: FieldPlacement,
    /// Whether the cell may never hold null.
    ///
    /// True for every flattened placement, and for boxed placements of
    /// fields declared flattenable whose value type had to box anyway
    /// (oversized, cycle guard, depth cap). The null contract follows
    /// the declaration, not the physical representation: such a cell
    /// reads as the type's default value while unwritten and rejects
    /// null writes, exactly like an inline cell.
    pub null_free: bool,
}

/// Planned storage for one region (instance fields or static fields).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LayoutRegion {
    /// Total flattened byte length, rounded up to `align`.
    pub byte_len: u32,
    /// Region alignment: the largest alignment of any flattened scalar
    /// placed in it (at least 1).
    pub align: u32,
    /// Number of reference slots.
    pub ref_len: u32,
    /// Field slots in placement order.
    pub slots: SmallVec<[FieldSlot; 8]>,
}

/// Locates a declared field inside a [`TypeLayout`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldRef {
    /// Whether the field lives in the static region.
    pub is_static: bool,
    /// Index into the region's `slots`.
    pub index: u32,
}

/// The immutable layout of one type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeLayout {
    /// The type this layout belongs to.
    pub ty: TypeIdx,

    /// Size in bytes when this type is stored flattened, or `None` if
    /// the type can never be inlined (reference types, interfaces,
    /// cycle-guarded types). Whether a *particular* field inlines is
    /// additionally subject to the configured size ceiling.
    pub flat_size: Option<u32>,

    /// Alignment of the flattened representation (at least 1).
    pub flat_align: u32,

    /// Layout of instance fields.
    pub instance: LayoutRegion,

    /// Layout of static fields.
    pub statics: LayoutRegion,

    /// Declaration-order index of every field into its region.
    pub field_map: Vec<FieldRef>,
}

impl TypeLayout {
    /// Resolve a field by its declaration-order index.
    pub fn resolve(&self, decl_index: usize) -> Option<(FieldRef, &FieldSlot)> {
        let fref = *self.field_map.get(decl_index)?;
        let region = if fref.is_static {
            &self.statics
        } else {
            &self.instance
        };
        let slot = region.slots.get(fref.index as usize)?;
        Some((fref, slot))
    }

    /// The region a field reference points into.
    pub fn region(&self, fref: FieldRef) -> &LayoutRegion {
        if fref.is_static {
            &self.statics
        } else {
            &self.instance
        }
    }
}
