//! The layout planner.
//!
//! `plan` is pure and deterministic: the same registry and configuration
//! always produce the same layout, and results are memoized so repeat
//! calls are O(1). The planner holds an in-progress set instead of
//! recursing eagerly through cyclic descriptors; a re-entrant type forces
//! the referencing field to a boxed placement, which is the terminating
//! indirection the inline representation needs.

use std::sync::Arc;

use opal_types::{FieldDescriptor, ScalarKind, TypeDescriptor, TypeFlags, TypeIdx, TypeRegistry};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::{
    FieldPlacement, FieldRef, FieldSlot, LayoutConfig, LayoutError, LayoutRegion, TypeLayout,
};

/// Plans and memoizes type layouts.
pub struct LayoutPlanner {
    config: LayoutConfig,
    cache: FxHashMap<TypeIdx, Arc<TypeLayout>>,
    in_progress: FxHashSet<TypeIdx>,
}

/// Placement decision for a single field.
enum Decision {
    Inline {
        size: u32,
        align: u32,
        ref_len: u32,
    },
    /// Reference slot. `null_free` carries the declared contract when a
    /// flattenable field had to box for physical reasons.
    Boxed {
        null_free: bool,
    },
}

impl LayoutPlanner {
    /// Create a planner with the given configuration.
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            cache: FxHashMap::default(),
            in_progress: FxHashSet::default(),
        }
    }

    /// The planner's configuration.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Compute (or fetch the memoized) layout for a type.
    ///
    /// Fatal errors abort preparation of the type; nothing partial is
    /// ever cached or published.
    #[tracing::instrument(level = "debug", skip(self, registry))]
    pub fn plan(
        &mut self,
        registry: &TypeRegistry,
        ty: TypeIdx,
    ) -> Result<Arc<TypeLayout>, LayoutError> {
        let mut chain = Vec::new();
        self.plan_inner(registry, ty, &mut chain)
    }

    /// The memoized layout for a type, if it was already planned.
    pub fn cached(&self, ty: TypeIdx) -> Option<Arc<TypeLayout>> {
        self.cache.get(&ty).map(Arc::clone)
    }

    /// The size a flattenable field or array element of `ty` occupies
    /// inline, or `None` if such storage must box (no flattened size, or
    /// over the configured ceiling).
    pub fn flattenable_size(
        &mut self,
        registry: &TypeRegistry,
        ty: TypeIdx,
    ) -> Result<Option<u32>, LayoutError> {
        if let Some(kind) = ScalarKind::of(ty) {
            return Ok(Some(kind.size()));
        }
        let layout = self.plan(registry, ty)?;
        Ok(layout.flat_size.filter(|&s| s <= self.config.max_flat_size))
    }

    fn plan_inner(
        &mut self,
        registry: &TypeRegistry,
        ty: TypeIdx,
        chain: &mut Vec<TypeIdx>,
    ) -> Result<Arc<TypeLayout>, LayoutError> {
        if let Some(layout) = self.cache.get(&ty) {
            return Ok(Arc::clone(layout));
        }

        if let Some(kind) = ScalarKind::of(ty) {
            let layout = Arc::new(scalar_layout(ty, kind));
            self.cache.insert(ty, Arc::clone(&layout));
            return Ok(layout);
        }

        let desc = registry
            .descriptor(ty)
            .filter(|d| d.is_finalized())
            .ok_or_else(|| LayoutError::TypeNotFinalized {
                ty: registry.type_name(ty).to_owned(),
            })?;

        self.in_progress.insert(ty);
        chain.push(ty);
        let regions = self.plan_regions(registry, desc, chain);
        chain.pop();
        self.in_progress.remove(&ty);
        let (instance, statics, field_map) = regions?;

        let flat_size = desc
            .flags
            .contains(TypeFlags::IS_VALUE)
            .then_some(instance.byte_len);
        let layout = Arc::new(TypeLayout {
            ty,
            flat_size,
            flat_align: instance.align,
            instance,
            statics,
            field_map,
        });
        self.cache.insert(ty, Arc::clone(&layout));
        tracing::debug!(
            ty = registry.type_name(ty),
            flat_size = ?layout.flat_size,
            refs = layout.instance.ref_len,
            "layout planned"
        );
        Ok(layout)
    }

    fn plan_regions(
        &mut self,
        registry: &TypeRegistry,
        desc: &TypeDescriptor,
        chain: &mut Vec<TypeIdx>,
    ) -> Result<(LayoutRegion, LayoutRegion, Vec<FieldRef>), LayoutError> {
        let mut instance = RegionBuilder::default();
        let mut statics = RegionBuilder::default();
        let mut field_map = Vec::with_capacity(desc.fields.len());

        for field in &desc.fields {
            let decision = self.decide(registry, desc, field, chain)?;
            let is_static = field.flags.is_static();
            let builder = if is_static { &mut statics } else { &mut instance };
            let index = builder.push(field, &decision);
            field_map.push(FieldRef { is_static, index });
        }

        Ok((instance.finish(), statics.finish(), field_map))
    }

    /// Decide one field's placement, recursing into the field type's own
    /// layout when the flattening rules ask for its size.
    fn decide(
        &mut self,
        registry: &TypeRegistry,
        owner: &TypeDescriptor,
        field: &FieldDescriptor,
        chain: &mut Vec<TypeIdx>,
    ) -> Result<Decision, LayoutError> {
        let fty = field.ty;
        if fty.is_none() {
            return Err(unresolved(registry, owner, field));
        }

        // Scalars have no null state; they always store inline.
        if let Some(kind) = ScalarKind::of(fty) {
            return Ok(Decision::Inline {
                size: kind.size(),
                align: kind.align(),
                ref_len: 0,
            });
        }

        let fdesc = registry
            .descriptor(fty)
            .filter(|d| d.is_finalized())
            .ok_or_else(|| unresolved(registry, owner, field))?;

        // No annotation, or a type that can never be inlined (reference
        // class, interface): an ordinary nullable reference slot. The
        // annotation is inert on non-value types.
        if !field.flags.is_flattenable() || !fdesc.flags.flattenable() {
            return Ok(Decision::Boxed { null_free: false });
        }

        // A flattenable instance field of the owner's own type has no
        // possible terminating indirection.
        if fty == owner.idx && !field.flags.is_static() {
            return Err(LayoutError::UnterminatedFlatteningCycle {
                ty: registry.type_name(owner.idx).to_owned(),
                chain: format_chain(registry, chain, fty),
            });
        }

        // From here on the field keeps its declared null-free contract
        // even when physical storage has to fall back to a reference.
        if self.in_progress.contains(&fty) {
            tracing::debug!(
                owner = registry.type_name(owner.idx),
                field = registry.lookup(field.name),
                "flattening cycle, boxing field"
            );
            return Ok(Decision::Boxed { null_free: true });
        }

        if chain.len() >= self.config.max_flatten_depth as usize {
            tracing::debug!(
                owner = registry.type_name(owner.idx),
                field = registry.lookup(field.name),
                depth = chain.len(),
                "flattening depth limit reached, boxing field"
            );
            return Ok(Decision::Boxed { null_free: true });
        }

        let sub = self.plan_inner(registry, fty, chain)?;
        match sub.flat_size {
            Some(size) if size <= self.config.max_flat_size => Ok(Decision::Inline {
                size,
                align: sub.flat_align,
                ref_len: sub.instance.ref_len,
            }),
            _ => {
                tracing::debug!(
                    owner = registry.type_name(owner.idx),
                    field = registry.lookup(field.name),
                    flat_size = ?sub.flat_size,
                    "field type too large or not inlinable, boxing field"
                );
                Ok(Decision::Boxed { null_free: true })
            }
        }
    }
}

impl Default for LayoutPlanner {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl std::fmt::Debug for LayoutPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutPlanner")
            .field("config", &self.config)
            .field("planned", &self.cache.len())
            .finish()
    }
}

fn scalar_layout(ty: TypeIdx, kind: ScalarKind) -> TypeLayout {
    TypeLayout {
        ty,
        flat_size: Some(kind.size()),
        flat_align: kind.align(),
        instance: LayoutRegion {
            byte_len: 0,
            align: 1,
            ref_len: 0,
            slots: SmallVec::new(),
        },
        statics: LayoutRegion {
            byte_len: 0,
            align: 1,
            ref_len: 0,
            slots: SmallVec::new(),
        },
        field_map: Vec::new(),
    }
}

fn unresolved(
    registry: &TypeRegistry,
    owner: &TypeDescriptor,
    field: &FieldDescriptor,
) -> LayoutError {
    LayoutError::UnresolvedFieldType {
        owner: registry.type_name(owner.idx).to_owned(),
        field: registry.lookup(field.name).to_owned(),
    }
}

fn format_chain(registry: &TypeRegistry, chain: &[TypeIdx], last: TypeIdx) -> String {
    let mut parts: Vec<&str> = chain.iter().map(|&t| registry.type_name(t)).collect();
    parts.push(registry.type_name(last));
    parts.join(" -> ")
}

/// Accumulates placements for one region.
#[derive(Default)]
struct RegionBuilder {
    offset: u32,
    align: u32,
    ref_len: u32,
    slots: SmallVec<[FieldSlot; 8]>,
}

impl RegionBuilder {
    #[allow(clippy::cast_possible_truncation)]
    fn push(&mut self, field: &FieldDescriptor, decision: &Decision) -> u32 {
        let index = self.slots.len() as u32;
        let (placement, null_free) = match *decision {
            Decision::Inline {
                size,
                align,
                ref_len,
            } => {
                let offset = align_up(self.offset, align);
                let ref_base = self.ref_len;
                self.offset = offset + size;
                self.align = self.align.max(align);
                self.ref_len += ref_len;
                (
                    FieldPlacement::Flattened {
                        offset,
                        size,
                        ref_base,
                        ref_len,
                    },
                    true,
                )
            }
            Decision::Boxed { null_free } => {
                let slot = self.ref_len;
                self.ref_len += 1;
                (FieldPlacement::Boxed { slot }, null_free)
            }
        };
        self.slots.push(FieldSlot {
            name: field.name,
            ty: field.ty,
            placement,
            null_free,
        });
        index
    }

    fn finish(self) -> LayoutRegion {
        let align = self.align.max(1);
        LayoutRegion {
            byte_len: align_up(self.offset, align),
            align,
            ref_len: self.ref_len,
            slots: self.slots,
        }
    }
}

/// Round `n` up to a multiple of `align` (`align` >= 1).
const fn align_up(n: u32, align: u32) -> u32 {
    (n + align - 1) / align * align
}

#[cfg(test)]
mod tests;
