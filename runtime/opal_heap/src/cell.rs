//! The access enforcer.
//!
//! Exactly one read and one write function, dispatched on the cell's
//! placement kind. Every access path — direct, named, handle, static,
//! array element — resolves its target to a [`FieldSlot`] plus raw
//! storage and funnels through here, so the null-exclusion and
//! default-materialization contract cannot be bypassed by choosing a
//! different call path.
//!
//! Writes are atomic: all validation happens before the first byte of
//! the target cell changes. A failed write leaves the cell untouched.

use std::sync::Arc;

use opal_layout::{FieldPlacement, FieldSlot, TypeLayout};
use opal_types::{ScalarKind, TypeRegistry};

use crate::default::DefaultPool;
use crate::{bits, AccessError, AccessResult, GcRef, Instance, Value};

/// Resolution context for one cell access.
pub(crate) struct CellCx<'a> {
    /// For assignability checks and error messages.
    pub registry: &'a TypeRegistry,
    /// Layout of the cell's type; required to detach a flattened
    /// composite on read, and to materialize the default of an
    /// unwritten null-free boxed cell.
    pub sub_layout: Option<Arc<TypeLayout>>,
    /// Default pool for null-free boxed cells. Array element cells pass
    /// `None`: array reference slots are always nullable.
    pub defaults: Option<&'a DefaultPool>,
    /// Whether this is an array element store. Boxed type failures then
    /// report as store-type violations rather than field type mismatches.
    pub array_store: bool,
}

/// Read a cell.
///
/// Boxed cells return the stored reference verbatim (possibly `None`) —
/// unless the cell is null-free, in which case an unwritten cell reads
/// as the type's memoized default. Flattened cells never return `None`:
/// an unwritten cell reads as the default because allocation
/// zero-filled it.
pub(crate) fn read(
    cx: &CellCx<'_>,
    slot: &FieldSlot,
    bytes: &[u8],
    refs: &[Option<GcRef>],
) -> AccessResult<Option<Value>> {
    match slot.placement {
        FieldPlacement::Boxed { slot: s } => {
            let stored = refs[s as usize].clone();
            if stored.is_none() && slot.null_free {
                // Declared flattenable, physically boxed: the absence of
                // a reference is an unwritten cell, not a null value.
                let (Some(layout), Some(defaults)) = (cx.sub_layout.as_ref(), cx.defaults) else {
                    return Err(AccessError::NotPrepared {
                        ty: cx.registry.type_name(slot.ty).to_owned(),
                    });
                };
                return Ok(Some(Value::Composite(defaults.default_of(layout))));
            }
            Ok(stored.map(Value::Composite))
        }
        FieldPlacement::Flattened {
            offset,
            size,
            ref_base,
            ref_len,
        } => {
            let range = offset as usize..(offset + size) as usize;
            if let Some(kind) = ScalarKind::of(slot.ty) {
                return Ok(Some(bits::decode(kind, &bytes[range])));
            }
            let layout = cx
                .sub_layout
                .as_ref()
                .ok_or_else(|| AccessError::NotPrepared {
                    ty: cx.registry.type_name(slot.ty).to_owned(),
                })?;
            let ref_range = ref_base as usize..(ref_base + ref_len) as usize;
            let detached = Instance::from_parts(
                Arc::clone(layout),
                bytes[range].into(),
                refs[ref_range].to_vec().into_boxed_slice(),
            );
            Ok(Some(Value::composite(detached)))
        }
    }
}

/// Write a cell.
///
/// `None` is a legal write only for nullable boxed cells; flattened and
/// null-free boxed cells fail with a null-exclusion violation before
/// any mutation. Flattened writes are whole-value: the bit pattern is
/// copied in full, and the embedded reference slots of a flattened
/// composite are copied with it.
pub(crate) fn write(
    cx: &CellCx<'_>,
    slot: &FieldSlot,
    bytes: &mut [u8],
    refs: &mut [Option<GcRef>],
    value: Option<Value>,
) -> AccessResult<()> {
    match slot.placement {
        FieldPlacement::Boxed { slot: s } => {
            let stored = match value {
                None if slot.null_free => {
                    tracing::debug!(
                        ty = cx.registry.type_name(slot.ty),
                        "null write rejected by null-free boxed cell"
                    );
                    return Err(AccessError::NullExclusionViolation {
                        ty: cx.registry.type_name(slot.ty).to_owned(),
                    });
                }
                None => None,
                Some(Value::Composite(r)) => {
                    if !cx.registry.is_assignable(r.ty(), slot.ty) {
                        return Err(boxed_type_error(cx, slot, r.ty()));
                    }
                    Some(r)
                }
                Some(v) => return Err(boxed_type_error(cx, slot, v.type_idx())),
            };
            refs[s as usize] = stored;
            Ok(())
        }
        FieldPlacement::Flattened {
            offset,
            size,
            ref_base,
            ref_len,
        } => {
            let Some(value) = value else {
                tracing::debug!(
                    ty = cx.registry.type_name(slot.ty),
                    "null write rejected by flattened cell"
                );
                return Err(AccessError::NullExclusionViolation {
                    ty: cx.registry.type_name(slot.ty).to_owned(),
                });
            };
            let range = offset as usize..(offset + size) as usize;
            if let Some(kind) = ScalarKind::of(slot.ty) {
                if !bits::encode(kind, &mut bytes[range], &value) {
                    return Err(AccessError::TypeMismatch {
                        expected: cx.registry.type_name(slot.ty).to_owned(),
                        found: cx.registry.type_name(value.type_idx()).to_owned(),
                    });
                }
                return Ok(());
            }
            let Value::Composite(r) = &value else {
                return Err(AccessError::TypeMismatch {
                    expected: cx.registry.type_name(slot.ty).to_owned(),
                    found: cx.registry.type_name(value.type_idx()).to_owned(),
                });
            };
            // Flattened storage is monomorphic: exact type, no subtypes.
            // The size check rejects values shaped by a different layout
            // configuration before any byte moves.
            if r.ty() != slot.ty
                || r.bytes().len() != size as usize
                || r.refs().len() != ref_len as usize
            {
                return Err(AccessError::TypeMismatch {
                    expected: cx.registry.type_name(slot.ty).to_owned(),
                    found: cx.registry.type_name(r.ty()).to_owned(),
                });
            }
            bytes[range].copy_from_slice(r.bytes());
            let ref_range = ref_base as usize..(ref_base + ref_len) as usize;
            refs[ref_range].clone_from_slice(r.refs());
            Ok(())
        }
    }
}

fn boxed_type_error(cx: &CellCx<'_>, slot: &FieldSlot, found: opal_types::TypeIdx) -> AccessError {
    let expected = cx.registry.type_name(slot.ty).to_owned();
    let found = cx.registry.type_name(found).to_owned();
    if cx.array_store {
        AccessError::StoreTypeViolation { expected, found }
    } else {
        AccessError::TypeMismatch { expected, found }
    }
}
