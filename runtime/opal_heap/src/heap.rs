//! The heap facade.
//!
//! `Heap` ties the registry, the layout planner, the default pool, and
//! per-type static storage together into the surface the execution
//! engine consumes: prepare a type once, allocate instances and arrays,
//! and access every cell through the enforcer.
//!
//! Preparation order is a contract: [`Heap::prepare`] must run (and
//! succeed) for a type before its first instantiation. A preparation
//! failure is a [`LayoutError`] and the type stays unusable; nothing
//! partial is published.

use std::sync::Arc;

use opal_layout::{FieldSlot, LayoutConfig, LayoutError, LayoutPlanner, TypeLayout};
use opal_types::{ScalarKind, TypeIdx, TypeRegistry};
use rustc_hash::FxHashMap;

use crate::array::{decide_repr, ReprDecision, ReprKind};
use crate::cell::{self, CellCx};
use crate::default::DefaultPool;
use crate::instance::RegionKind;
use crate::{AccessError, AccessResult, FieldHandle, Instance, Value, ValueArray};

/// The value-storage runtime.
pub struct Heap {
    registry: TypeRegistry,
    planner: LayoutPlanner,
    defaults: DefaultPool,
    statics: FxHashMap<TypeIdx, Instance>,
}

impl Heap {
    /// Create a heap over a populated registry with default layout
    /// configuration.
    pub fn new(registry: TypeRegistry) -> Self {
        Self::with_config(registry, LayoutConfig::default())
    }

    /// Create a heap with an explicit layout configuration.
    pub fn with_config(registry: TypeRegistry, config: LayoutConfig) -> Self {
        Self {
            registry,
            planner: LayoutPlanner::new(config),
            defaults: DefaultPool::new(),
            statics: FxHashMap::default(),
        }
    }

    /// The type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Mutable registry access, for declaring types before preparation.
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// The layout configuration in effect.
    pub fn config(&self) -> &LayoutConfig {
        self.planner.config()
    }

    /// Prepare a type: plan its layout and allocate its static storage.
    ///
    /// Idempotent. Must succeed before the first `alloc` of the type.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn prepare(&mut self, ty: TypeIdx) -> Result<Arc<TypeLayout>, LayoutError> {
        let layout = self.planner.plan(&self.registry, ty)?;
        self.statics
            .entry(ty)
            .or_insert_with(|| Instance::new_statics(Arc::clone(&layout)));
        Ok(layout)
    }

    /// Whether the type has been prepared.
    pub fn is_prepared(&self, ty: TypeIdx) -> bool {
        self.statics.contains_key(&ty)
    }

    /// Allocate an instance.
    ///
    /// Every flattened cell starts as the field type's default bit
    /// pattern; every boxed cell starts null. There is no uninitialized
    /// state to observe.
    pub fn alloc(&self, ty: TypeIdx) -> AccessResult<Instance> {
        let layout = self.prepared_layout(ty)?;
        Ok(Instance::new(layout))
    }

    /// Allocate an array of `len` elements of `elem`.
    ///
    /// The representation is chosen here, from the planner's verdict;
    /// see [`ValueArray::repr_kind`].
    pub fn alloc_array(
        &mut self,
        elem: TypeIdx,
        len: usize,
        covariant: bool,
    ) -> Result<ValueArray, LayoutError> {
        let decision = decide_repr(&self.registry, &mut self.planner, elem, covariant)?;
        tracing::debug!(
            elem = self.registry.type_name(elem),
            len,
            repr = ?decision.kind(),
            "array allocated"
        );
        Ok(match decision {
            ReprDecision::Primitive(kind) => ValueArray::new_primitive(kind, len),
            ReprDecision::Flattened(layout) => ValueArray::new_flattened(layout, len),
            ReprDecision::Boxed { covariant } => ValueArray::new_boxed(elem, len, covariant),
        })
    }

    /// The representation an array of `elem` would be allocated with.
    pub fn select_repr(
        &mut self,
        elem: TypeIdx,
        covariant: bool,
    ) -> Result<ReprKind, LayoutError> {
        Ok(decide_repr(&self.registry, &mut self.planner, elem, covariant)?.kind())
    }

    /// The canonical default value of a type: the scalar zero, or the
    /// memoized all-default instance of a prepared value type.
    pub fn default_value(&self, ty: TypeIdx) -> AccessResult<Value> {
        if let Some(kind) = ScalarKind::of(ty) {
            return Ok(Value::scalar_zero(kind));
        }
        let layout = self.prepared_layout(ty)?;
        Ok(Value::Composite(self.defaults.default_of(&layout)))
    }

    // === Field access (direct) ===

    /// Read an instance field by declaration index.
    pub fn get_field(&self, instance: &Instance, index: usize) -> AccessResult<Option<Value>> {
        let slot = self.resolve(instance, index)?;
        let cx = self.cx_for(&slot);
        cell::read(&cx, &slot, instance.bytes(), instance.refs())
    }

    /// Write an instance field by declaration index.
    pub fn set_field(
        &self,
        instance: &mut Instance,
        index: usize,
        value: Option<Value>,
    ) -> AccessResult<()> {
        let slot = self.resolve(instance, index)?;
        let cx = self.cx_for(&slot);
        let (bytes, refs) = instance.parts_mut();
        cell::write(&cx, &slot, bytes, refs, value)
    }

    /// Read an instance field by name.
    pub fn get_field_named(&self, instance: &Instance, name: &str) -> AccessResult<Option<Value>> {
        let index = self.field_index(instance.ty(), name)?;
        self.get_field(instance, index)
    }

    /// Write an instance field by name.
    pub fn set_field_named(
        &self,
        instance: &mut Instance,
        name: &str,
        value: Option<Value>,
    ) -> AccessResult<()> {
        let index = self.field_index(instance.ty(), name)?;
        self.set_field(instance, index, value)
    }

    // === Static field access ===

    /// Read a static field.
    pub fn get_static(&self, ty: TypeIdx, field: &str) -> AccessResult<Option<Value>> {
        let index = self.field_index(ty, field)?;
        let storage = self.static_storage(ty)?;
        let slot = self.resolve(storage, index)?;
        let cx = self.cx_for(&slot);
        cell::read(&cx, &slot, storage.bytes(), storage.refs())
    }

    /// Write a static field.
    pub fn set_static(&mut self, ty: TypeIdx, field: &str, value: Option<Value>) -> AccessResult<()> {
        let index = self.field_index(ty, field)?;
        let slot = self.resolve(self.static_storage(ty)?, index)?;
        let cx = CellCx {
            registry: &self.registry,
            sub_layout: self.planner.cached(slot.ty),
            defaults: Some(&self.defaults),
            array_store: false,
        };
        let storage = self
            .statics
            .get_mut(&ty)
            .ok_or_else(|| AccessError::NotPrepared {
                ty: self.registry.type_name(ty).to_owned(),
            })?;
        let (bytes, refs) = storage.parts_mut();
        cell::write(&cx, &slot, bytes, refs, value)
    }

    // === Dynamic handles ===

    /// Resolve a field to a reusable handle.
    pub fn handle(&self, ty: TypeIdx, field: &str) -> AccessResult<FieldHandle> {
        let index = self.field_index(ty, field)?;
        let layout = self.prepared_layout(ty)?;
        let (fref, slot) = layout
            .resolve(index)
            .ok_or_else(|| self.no_such_field(ty, field))?;
        Ok(FieldHandle {
            owner: ty,
            name: slot.name,
            fref,
            slot: *slot,
            sub_layout: self.planner.cached(slot.ty),
        })
    }

    /// Read an instance field through a handle.
    pub fn get_with(&self, handle: &FieldHandle, instance: &Instance) -> AccessResult<Option<Value>> {
        self.check_instance_handle(handle, instance)?;
        let cx = self.cx_for_handle(handle);
        cell::read(&cx, &handle.slot, instance.bytes(), instance.refs())
    }

    /// Write an instance field through a handle.
    pub fn set_with(
        &self,
        handle: &FieldHandle,
        instance: &mut Instance,
        value: Option<Value>,
    ) -> AccessResult<()> {
        self.check_instance_handle(handle, instance)?;
        let cx = self.cx_for_handle(handle);
        let (bytes, refs) = instance.parts_mut();
        cell::write(&cx, &handle.slot, bytes, refs, value)
    }

    /// Read a static field through a handle.
    pub fn get_static_with(&self, handle: &FieldHandle) -> AccessResult<Option<Value>> {
        self.check_static_handle(handle)?;
        let storage = self.static_storage(handle.owner)?;
        let cx = self.cx_for_handle(handle);
        cell::read(&cx, &handle.slot, storage.bytes(), storage.refs())
    }

    /// Write a static field through a handle.
    pub fn set_static_with(&mut self, handle: &FieldHandle, value: Option<Value>) -> AccessResult<()> {
        self.check_static_handle(handle)?;
        let cx = CellCx {
            registry: &self.registry,
            sub_layout: handle.sub_layout.clone(),
            defaults: Some(&self.defaults),
            array_store: false,
        };
        let storage =
            self.statics
                .get_mut(&handle.owner)
                .ok_or_else(|| AccessError::NotPrepared {
                    ty: self.registry.type_name(handle.owner).to_owned(),
                })?;
        let (bytes, refs) = storage.parts_mut();
        cell::write(&cx, &handle.slot, bytes, refs, value)
    }

    // === Internals ===

    fn prepared_layout(&self, ty: TypeIdx) -> AccessResult<Arc<TypeLayout>> {
        if !self.statics.contains_key(&ty) {
            return Err(AccessError::NotPrepared {
                ty: self.registry.type_name(ty).to_owned(),
            });
        }
        self.planner
            .cached(ty)
            .ok_or_else(|| AccessError::NotPrepared {
                ty: self.registry.type_name(ty).to_owned(),
            })
    }

    fn static_storage(&self, ty: TypeIdx) -> AccessResult<&Instance> {
        self.statics.get(&ty).ok_or_else(|| AccessError::NotPrepared {
            ty: self.registry.type_name(ty).to_owned(),
        })
    }

    fn field_index(&self, ty: TypeIdx, name: &str) -> AccessResult<usize> {
        self.registry
            .field_index(ty, name)
            .ok_or_else(|| self.no_such_field(ty, name))
    }

    fn no_such_field(&self, ty: TypeIdx, field: &str) -> AccessError {
        AccessError::NoSuchField {
            ty: self.registry.type_name(ty).to_owned(),
            field: field.to_owned(),
        }
    }

    /// Resolve a declaration-order field index against storage,
    /// rejecting cross-region access.
    fn resolve(&self, storage: &Instance, index: usize) -> AccessResult<FieldSlot> {
        let (fref, slot) =
            storage
                .layout()
                .resolve(index)
                .ok_or_else(|| AccessError::NoSuchField {
                    ty: self.registry.type_name(storage.ty()).to_owned(),
                    field: index.to_string(),
                })?;
        match (fref.is_static, storage.region_kind()) {
            (false, RegionKind::Instance) | (true, RegionKind::Statics) => Ok(*slot),
            (true, RegionKind::Instance) => Err(AccessError::StaticField {
                ty: self.registry.type_name(storage.ty()).to_owned(),
                field: self.registry.lookup(slot.name).to_owned(),
            }),
            (false, RegionKind::Statics) => Err(AccessError::InstanceField {
                ty: self.registry.type_name(storage.ty()).to_owned(),
                field: self.registry.lookup(slot.name).to_owned(),
            }),
        }
    }

    fn check_instance_handle(&self, handle: &FieldHandle, instance: &Instance) -> AccessResult<()> {
        if handle.fref.is_static {
            return Err(AccessError::StaticField {
                ty: self.registry.type_name(handle.owner).to_owned(),
                field: self.registry.lookup(handle.name).to_owned(),
            });
        }
        if instance.ty() != handle.owner {
            return Err(AccessError::TypeMismatch {
                expected: self.registry.type_name(handle.owner).to_owned(),
                found: self.registry.type_name(instance.ty()).to_owned(),
            });
        }
        Ok(())
    }

    fn check_static_handle(&self, handle: &FieldHandle) -> AccessResult<()> {
        if handle.fref.is_static {
            Ok(())
        } else {
            Err(AccessError::InstanceField {
                ty: self.registry.type_name(handle.owner).to_owned(),
                field: self.registry.lookup(handle.name).to_owned(),
            })
        }
    }

    fn cx_for(&self, slot: &FieldSlot) -> CellCx<'_> {
        CellCx {
            registry: &self.registry,
            sub_layout: self.planner.cached(slot.ty),
            defaults: Some(&self.defaults),
            array_store: false,
        }
    }

    fn cx_for_handle(&self, handle: &FieldHandle) -> CellCx<'_> {
        CellCx {
            registry: &self.registry,
            sub_layout: handle.sub_layout.clone(),
            defaults: Some(&self.defaults),
            array_store: false,
        }
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("prepared", &self.statics.len())
            .finish()
    }
}

#[cfg(test)]
mod tests;
