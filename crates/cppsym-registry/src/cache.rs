//! Template instance cache.
//!
//! Instantiating the same template with structurally equal arguments must
//! yield the same symbol, so every instance is cached under its template
//! and flattened argument list.

use cppsym_core::{SymbolId, TypeInfo};
use rustc_hash::FxHashMap;

/// Maps (template, args) → instance.
///
/// Deferred instances (template-ids whose arguments are still template
/// parameters) are kept apart from concrete ones so the two never collide.
#[derive(Debug, Default, Clone)]
pub struct TemplateInstanceCache {
    /// Concrete instances: (template, args) → instance
    instances: FxHashMap<(SymbolId, Vec<TypeInfo>), SymbolId>,
    /// Deferred instances: (template, args) → deferred symbol
    deferred: FxHashMap<(SymbolId, Vec<TypeInfo>), SymbolId>,
}

impl TemplateInstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_instance(&mut self, template: SymbolId, args: Vec<TypeInfo>, instance: SymbolId) {
        self.instances.insert((template, args), instance);
    }

    pub fn get_instance(&self, template: SymbolId, args: &[TypeInfo]) -> Option<SymbolId> {
        self.instances.get(&(template, args.to_vec())).copied()
    }

    pub fn cache_deferred(&mut self, template: SymbolId, args: Vec<TypeInfo>, instance: SymbolId) {
        self.deferred.insert((template, args), instance);
    }

    pub fn get_deferred(&self, template: SymbolId, args: &[TypeInfo]) -> Option<SymbolId> {
        self.deferred.get(&(template, args.to_vec())).copied()
    }

    pub(crate) fn evict(&mut self, template: SymbolId, args: Vec<TypeInfo>, deferred: bool) {
        let key = (template, args);
        if deferred {
            self.deferred.remove(&key);
        } else {
            self.instances.remove(&key);
        }
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }
}
