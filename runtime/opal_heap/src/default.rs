//! Canonical default values.
//!
//! Each value type has one all-default instance: every flattened
//! sub-field at its own default (recursively the zero bit pattern),
//! every boxed sub-field null. It is materialized once per type as
//! bulk-zeroed storage, memoized, and shared — consumers copy its bits,
//! they never re-derive it.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use opal_layout::TypeLayout;
use opal_types::TypeIdx;

use crate::{GcRef, Instance};

/// Memoized per-type default instances.
pub(crate) struct DefaultPool {
    defaults: RwLock<FxHashMap<TypeIdx, GcRef>>,
}

impl DefaultPool {
    pub(crate) fn new() -> Self {
        Self {
            defaults: RwLock::new(FxHashMap::default()),
        }
    }

    /// The canonical default instance for a type.
    pub(crate) fn default_of(&self, layout: &Arc<TypeLayout>) -> GcRef {
        {
            let defaults = self.defaults.read();
            if let Some(existing) = defaults.get(&layout.ty) {
                return Arc::clone(existing);
            }
        }

        let mut defaults = self.defaults.write();
        // Re-check: another writer may have materialized between the locks.
        if let Some(existing) = defaults.get(&layout.ty) {
            return Arc::clone(existing);
        }
        let instance: GcRef = Arc::new(Instance::new(Arc::clone(layout)));
        defaults.insert(layout.ty, Arc::clone(&instance));
        instance
    }
}
