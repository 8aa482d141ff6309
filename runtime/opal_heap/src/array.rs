//! Arrays and the representation selector.
//!
//! Element storage reuses the planner's flattenability verdict: a
//! scalar element type stores as raw contiguous values, a flattenable
//! value type as contiguous inline slots, anything else as nullable
//! reference slots — optionally covariant, with a runtime element-type
//! check on every store.
//!
//! Each element is an ordinary storage cell: element access synthesizes
//! the element's placement and funnels through the same enforcer as
//! field access, so the null-exclusion contract is identical.
//!
//! The three families exist because their copy costs differ: a
//! primitive copy is one slice copy, a flattened copy moves whole
//! inline values element by element, a boxed copy clones references
//! only (but every later element access pays the null check, and for
//! covariant arrays the type check).

use std::sync::Arc;

use opal_layout::{FieldPlacement, FieldSlot, LayoutError, LayoutPlanner, TypeLayout};
use opal_types::{Name, ScalarKind, TypeFlags, TypeIdx, TypeRegistry};

use crate::cell::{self, CellCx};
use crate::{AccessError, AccessResult, GcRef, Value};

/// The representation family of an array's element storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReprKind {
    /// Contiguous raw scalars. No null state; default is the scalar zero.
    Primitive,
    /// Contiguous inline value slots, each under the flattened-cell
    /// contract: never null, default-initialized.
    Flattened,
    /// Nullable reference slots with the declared element type equal to
    /// the runtime type.
    BoxedDirect,
    /// Nullable reference slots declared through a supertype/interface;
    /// every store is checked against the declared element type.
    BoxedCovariant,
}

/// A representation choice carrying what allocation needs.
pub(crate) enum ReprDecision {
    Primitive(ScalarKind),
    Flattened(Arc<TypeLayout>),
    Boxed { covariant: bool },
}

impl ReprDecision {
    pub(crate) fn kind(&self) -> ReprKind {
        match self {
            Self::Primitive(_) => ReprKind::Primitive,
            Self::Flattened(_) => ReprKind::Flattened,
            Self::Boxed { covariant: false } => ReprKind::BoxedDirect,
            Self::Boxed { covariant: true } => ReprKind::BoxedCovariant,
        }
    }
}

/// Pick the representation for an array of `elem`.
///
/// Reuses the planner's flattenability verdict; planning failures for
/// the element type are fatal exactly as they are for field layout.
/// An interface element type is covariant whether or not the caller
/// asked for it: the runtime type is always a proper subtype.
pub(crate) fn decide_repr(
    registry: &TypeRegistry,
    planner: &mut LayoutPlanner,
    elem: TypeIdx,
    covariant: bool,
) -> Result<ReprDecision, LayoutError> {
    if let Some(kind) = ScalarKind::of(elem) {
        return Ok(ReprDecision::Primitive(kind));
    }
    let is_interface = registry
        .descriptor(elem)
        .is_some_and(|d| d.flags.contains(TypeFlags::IS_INTERFACE));
    if covariant || is_interface {
        return Ok(ReprDecision::Boxed { covariant: true });
    }
    if planner.flattenable_size(registry, elem)?.is_some() {
        let layout = planner.plan(registry, elem)?;
        return Ok(ReprDecision::Flattened(layout));
    }
    Ok(ReprDecision::Boxed { covariant: false })
}

enum Repr {
    Primitive {
        kind: ScalarKind,
        bytes: Box<[u8]>,
    },
    Flattened {
        layout: Arc<TypeLayout>,
        stride: u32,
        ref_stride: u32,
        bytes: Box<[u8]>,
        refs: Box<[Option<GcRef>]>,
    },
    Boxed {
        covariant: bool,
        slots: Box<[Option<GcRef>]>,
    },
}

/// An array with representation-dependent element storage.
pub struct ValueArray {
    elem: TypeIdx,
    len: usize,
    repr: Repr,
}

impl ValueArray {
    pub(crate) fn new_primitive(kind: ScalarKind, len: usize) -> Self {
        Self {
            elem: kind.type_idx(),
            len,
            repr: Repr::Primitive {
                kind,
                bytes: vec![0u8; kind.size() as usize * len].into_boxed_slice(),
            },
        }
    }

    pub(crate) fn new_flattened(layout: Arc<TypeLayout>, len: usize) -> Self {
        let stride = layout.flat_size.unwrap_or(0);
        let ref_stride = layout.instance.ref_len;
        Self {
            elem: layout.ty,
            len,
            repr: Repr::Flattened {
                stride,
                ref_stride,
                bytes: vec![0u8; stride as usize * len].into_boxed_slice(),
                refs: vec![None; ref_stride as usize * len].into_boxed_slice(),
                layout,
            },
        }
    }

    pub(crate) fn new_boxed(elem: TypeIdx, len: usize, covariant: bool) -> Self {
        Self {
            elem,
            len,
            repr: Repr::Boxed {
                covariant,
                slots: vec![None; len].into_boxed_slice(),
            },
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Declared element type.
    pub fn elem_type(&self) -> TypeIdx {
        self.elem
    }

    /// The representation family this array was allocated with.
    pub fn repr_kind(&self) -> ReprKind {
        match &self.repr {
            Repr::Primitive { .. } => ReprKind::Primitive,
            Repr::Flattened { .. } => ReprKind::Flattened,
            Repr::Boxed {
                covariant: false, ..
            } => ReprKind::BoxedDirect,
            Repr::Boxed {
                covariant: true, ..
            } => ReprKind::BoxedCovariant,
        }
    }

    /// Read element `index`.
    ///
    /// Primitive and flattened elements are never `None`; an unwritten
    /// slot reads as the element type's default. Boxed elements return
    /// the stored reference verbatim.
    pub fn get(&self, registry: &TypeRegistry, index: usize) -> AccessResult<Option<Value>> {
        self.check_index(index)?;
        let slot = self.elem_slot(index);
        let cx = CellCx {
            registry,
            sub_layout: self.elem_layout(),
            defaults: None,
            array_store: true,
        };
        match &self.repr {
            Repr::Primitive { bytes, .. } => cell::read(&cx, &slot, bytes, &[]),
            Repr::Flattened { bytes, refs, .. } => cell::read(&cx, &slot, bytes, refs),
            Repr::Boxed { slots, .. } => cell::read(&cx, &slot, &[], slots),
        }
    }

    /// Write element `index`.
    ///
    /// Null stores fail for primitive and flattened elements; covariant
    /// stores of an incompatible runtime type fail with a store-type
    /// violation. Either way the slot is left unchanged.
    pub fn set(
        &mut self,
        registry: &TypeRegistry,
        index: usize,
        value: Option<Value>,
    ) -> AccessResult<()> {
        self.check_index(index)?;
        let slot = self.elem_slot(index);
        let cx = CellCx {
            registry,
            sub_layout: self.elem_layout(),
            defaults: None,
            array_store: true,
        };
        match &mut self.repr {
            Repr::Primitive { bytes, .. } => cell::write(&cx, &slot, bytes, &mut [], value),
            Repr::Flattened { bytes, refs, .. } => cell::write(&cx, &slot, bytes, refs, value),
            Repr::Boxed { slots, .. } => cell::write(&cx, &slot, &mut [], slots, value),
        }
    }

    /// Copy every element from `src`.
    ///
    /// Requires equal lengths and compatible element types. The cost is
    /// representation-dependent: one slice copy for primitives, a
    /// whole-value copy per element for flattened storage, reference
    /// clones for boxed storage.
    pub fn copy_from(&mut self, registry: &TypeRegistry, src: &ValueArray) -> AccessResult<()> {
        if self.len != src.len {
            return Err(AccessError::LengthMismatch {
                src: src.len,
                dst: self.len,
            });
        }
        let (dst_elem, src_elem) = (self.elem, src.elem);
        let mismatch = || AccessError::TypeMismatch {
            expected: registry.type_name(dst_elem).to_owned(),
            found: registry.type_name(src_elem).to_owned(),
        };
        match (&mut self.repr, &src.repr) {
            (
                Repr::Primitive {
                    kind: dst_kind,
                    bytes: dst_bytes,
                },
                Repr::Primitive {
                    kind: src_kind,
                    bytes: src_bytes,
                },
            ) => {
                if dst_kind != src_kind {
                    return Err(mismatch());
                }
                dst_bytes.copy_from_slice(src_bytes);
                Ok(())
            }
            (
                Repr::Flattened {
                    layout: dst_layout,
                    stride,
                    ref_stride,
                    bytes: dst_bytes,
                    refs: dst_refs,
                },
                Repr::Flattened {
                    layout: src_layout,
                    bytes: src_bytes,
                    refs: src_refs,
                    ..
                },
            ) => {
                if dst_layout.ty != src_layout.ty {
                    return Err(mismatch());
                }
                // Whole inline values, element by element.
                let stride = *stride as usize;
                let ref_stride = *ref_stride as usize;
                for i in 0..src.len {
                    let bytes_at = i * stride..(i + 1) * stride;
                    dst_bytes[bytes_at.clone()].copy_from_slice(&src_bytes[bytes_at]);
                    let refs_at = i * ref_stride..(i + 1) * ref_stride;
                    dst_refs[refs_at.clone()].clone_from_slice(&src_refs[refs_at]);
                }
                Ok(())
            }
            (Repr::Boxed { slots: dst_slots, .. }, Repr::Boxed { slots: src_slots, .. }) => {
                if !registry.is_assignable(src_elem, dst_elem) {
                    return Err(AccessError::StoreTypeViolation {
                        expected: registry.type_name(dst_elem).to_owned(),
                        found: registry.type_name(src_elem).to_owned(),
                    });
                }
                dst_slots.clone_from_slice(src_slots);
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }

    fn check_index(&self, index: usize) -> AccessResult<()> {
        if index < self.len {
            Ok(())
        } else {
            Err(AccessError::IndexOutOfBounds {
                index,
                len: self.len,
            })
        }
    }

    fn elem_layout(&self) -> Option<Arc<TypeLayout>> {
        match &self.repr {
            Repr::Flattened { layout, .. } => Some(Arc::clone(layout)),
            _ => None,
        }
    }

    /// Synthesize the element's placement as an ordinary storage cell.
    #[allow(clippy::cast_possible_truncation)]
    fn elem_slot(&self, index: usize) -> FieldSlot {
        let index = index as u32;
        let placement = match &self.repr {
            Repr::Primitive { kind, .. } => FieldPlacement::Flattened {
                offset: index * kind.size(),
                size: kind.size(),
                ref_base: 0,
                ref_len: 0,
            },
            Repr::Flattened {
                stride, ref_stride, ..
            } => FieldPlacement::Flattened {
                offset: index * stride,
                size: *stride,
                ref_base: index * ref_stride,
                ref_len: *ref_stride,
            },
            Repr::Boxed { .. } => FieldPlacement::Boxed { slot: index },
        };
        FieldSlot {
            name: Name::EMPTY,
            ty: self.elem,
            placement,
            // Reference arrays are always nullable; inline families have
            // no null state at all.
            null_free: placement.is_flattened(),
        }
    }
}

impl std::fmt::Debug for ValueArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueArray")
            .field("elem", &self.elem)
            .field("len", &self.len)
            .field("repr", &self.repr_kind())
            .finish()
    }
}
