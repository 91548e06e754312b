//! SymbolRegistry - the symbol arena.
//!
//! This module provides [`SymbolRegistry`], the central storage for every
//! declaration of one translation unit. Symbols live in a single vector
//! and refer to each other by [`SymbolId`], so containing-scope back
//! references, base classes and bound type symbols never own anything.
//!
//! # Storage Model
//!
//! - **Symbols**: one `Vec<Symbol>`; id `0` is the unnamed root namespace
//! - **Using-directives**: a [`UsingGraph`] between scopes
//! - **Instances**: a [`TemplateInstanceCache`] keyed by template and arguments
//! - **Journal**: undo records for every mutation made while a mark is open
//!
//! Creating a symbol is not journaled. A symbol only becomes visible once
//! it is added to a scope, and that step is journaled, so a rolled-back
//! symbol simply stays unreachable in the arena.
//!
//! # Example
//!
//! ```
//! use cppsym_core::{Symbol, TypeInfo, TypeKind};
//! use cppsym_registry::SymbolRegistry;
//!
//! let mut registry = SymbolRegistry::new();
//! let root = registry.root();
//!
//! let mark = registry.set_mark();
//! let x = registry.create(Symbol::new("x", TypeInfo::new(TypeKind::Int)));
//! registry.add_symbol(root, x).unwrap();
//! assert_eq!(registry.symbol(root).unwrap().scope().unwrap().lookup("x"), &[x]);
//!
//! assert!(registry.roll_back(mark));
//! assert!(registry.symbol(root).unwrap().scope().unwrap().lookup("x").is_empty());
//! ```

use cppsym_core::{
    Mark, ParentRef, Result, ScopeData, Symbol, SymbolId, SymbolTableError, TypeInfo, TypeKind,
};
use tracing::{debug, trace};

use crate::cache::TemplateInstanceCache;
use crate::journal::{Command, Journal};
use crate::using_graph::UsingGraph;

pub struct SymbolRegistry {
    symbols: Vec<Symbol>,
    root: SymbolId,
    using: UsingGraph,
    instances: TemplateInstanceCache,
    journal: Journal,
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolRegistry {
    /// Create a registry holding only the root namespace.
    pub fn new() -> Self {
        let root = Symbol::new("", TypeInfo::new(TypeKind::Namespace));
        Self {
            symbols: vec![root],
            root: SymbolId::new(0),
            using: UsingGraph::new(),
            instances: TemplateInstanceCache::new(),
            journal: Journal::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> SymbolId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    // ==========================================================================
    // Access
    // ==========================================================================

    #[inline]
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.slot())
    }

    /// Like [`SymbolRegistry::get`], but an unknown id is an error.
    pub fn symbol(&self, id: SymbolId) -> Result<&Symbol> {
        self.get(id)
            .ok_or_else(|| SymbolTableError::internal(format!("unknown symbol {}", id)))
    }

    /// Place a new symbol in the arena. It is not part of any scope yet.
    pub fn create(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId::new(self.symbols.len() as u32);
        trace!(id = %id, name = %symbol.name, kind = ?symbol.kind(), "created symbol");
        self.symbols.push(symbol);
        id
    }

    /// Unjournaled mutable access, for symbols that are still being built
    /// and are not reachable from any scope.
    pub fn detached_mut(&mut self, id: SymbolId) -> Result<&mut Symbol> {
        self.symbols
            .get_mut(id.slot())
            .ok_or_else(|| SymbolTableError::internal(format!("unknown symbol {}", id)))
    }

    /// Journaled in-place edit of a symbol.
    pub fn modify<R>(&mut self, id: SymbolId, edit: impl FnOnce(&mut Symbol) -> R) -> Result<R> {
        if self.journal.is_recording() {
            let snapshot = Box::new(self.symbol(id)?.clone());
            self.journal.record(Command::Restore {
                symbol: id,
                snapshot,
            });
        }
        Ok(edit(self.detached_mut(id)?))
    }

    fn scope_mut(&mut self, id: SymbolId) -> Result<&mut ScopeData> {
        let symbol = self.detached_mut(id)?;
        let name = symbol.name.clone();
        symbol
            .scope_mut()
            .ok_or_else(|| SymbolTableError::internal(format!("'{}' is not a scope", name)))
    }

    /// Link `child` under `scope`: containing scope, depth, template membership.
    fn attach(&mut self, scope: SymbolId, child: SymbolId) -> Result<String> {
        let (depth, template_member) = {
            let parent = self.symbol(scope)?;
            (
                parent.depth + 1,
                parent.is(TypeKind::Template) || parent.is_template_member,
            )
        };
        let symbol = self.detached_mut(child)?;
        symbol.containing = Some(scope);
        symbol.depth = depth;
        symbol.is_template_member |= template_member;
        Ok(symbol.name.clone())
    }

    // ==========================================================================
    // Journaled mutations
    // ==========================================================================

    /// Declare `id` in `scope`.
    pub fn add_symbol(&mut self, scope: SymbolId, id: SymbolId) -> Result<()> {
        let name = self.attach(scope, id)?;
        self.scope_mut(scope)?.insert(&name, id);
        trace!(scope = %scope, id = %id, name = %name, "added symbol");
        self.journal.record(Command::AddSymbol {
            scope,
            name,
            symbol: id,
        });
        Ok(())
    }

    /// Give `child` a containing scope without declaring it there by name.
    ///
    /// Used for symbols that are reached through another symbol rather than
    /// by name lookup: specializations, explicit specializations, instances.
    pub fn adopt(&mut self, scope: SymbolId, child: SymbolId) -> Result<()> {
        self.attach(scope, child)?;
        Ok(())
    }

    /// Make `id` visible under `name` in `scope` without moving it there.
    pub fn alias_symbol(&mut self, scope: SymbolId, name: &str, id: SymbolId) -> Result<()> {
        self.scope_mut(scope)?.alias(name, id);
        self.journal.record(Command::AddSymbol {
            scope,
            name: name.to_string(),
            symbol: id,
        });
        Ok(())
    }

    pub fn add_parent(&mut self, class: SymbolId, parent: ParentRef) -> Result<()> {
        let symbol = self.detached_mut(class)?;
        let name = symbol.name.clone();
        symbol
            .class_mut()
            .ok_or(SymbolTableError::BadTypeInfo { name })?
            .parents
            .push(parent);
        self.journal.record(Command::AddParent { class });
        Ok(())
    }

    /// Returns `false` if the directive already existed.
    pub fn add_using_directive(&mut self, scope: SymbolId, target: SymbolId) -> bool {
        let added = self.using.add(scope, target);
        if added {
            self.journal
                .record(Command::AddUsingDirective { scope, target });
        }
        added
    }

    pub fn using_directives(&self, scope: SymbolId) -> Vec<SymbolId> {
        self.using.targets(scope)
    }

    pub fn has_using_directives(&self, scope: SymbolId) -> bool {
        self.using.has_directives(scope)
    }

    /// Namespaces reachable from `scope` through any chain of directives.
    pub fn nominated_closure(&self, scope: SymbolId) -> Vec<SymbolId> {
        let mut reached: Vec<_> = self.using.reachable(scope).into_iter().collect();
        reached.sort();
        reached
    }

    pub fn add_parameter(&mut self, function: SymbolId, param: SymbolId) -> Result<()> {
        let name = self.attach(function, param)?;
        let symbol = self.detached_mut(function)?;
        let owner = symbol.name.clone();
        let data = symbol
            .function_mut()
            .ok_or(SymbolTableError::BadTypeInfo { name: owner })?;
        data.params.push(param);
        if !name.is_empty() {
            data.scope.insert(&name, param);
        }
        self.journal.record(Command::AddParameter {
            function,
            name,
            param,
        });
        Ok(())
    }

    pub fn add_template_parameter(&mut self, template: SymbolId, param: SymbolId) -> Result<()> {
        let name = self.attach(template, param)?;
        let symbol = self.detached_mut(template)?;
        let owner = symbol.name.clone();
        let data = symbol
            .template_mut()
            .ok_or(SymbolTableError::BadTypeInfo { name: owner })?;
        data.params.push(param);
        if !name.is_empty() {
            data.scope.insert(&name, param);
        }
        self.journal.record(Command::AddTemplateParameter {
            template,
            name,
            param,
        });
        Ok(())
    }

    pub fn add_constructor(&mut self, class: SymbolId, constructor: SymbolId) -> Result<()> {
        self.attach(class, constructor)?;
        let symbol = self.detached_mut(class)?;
        let name = symbol.name.clone();
        symbol
            .class_mut()
            .ok_or(SymbolTableError::BadTypeInfo { name })?
            .constructors
            .push(constructor);
        self.journal.record(Command::AddConstructor { class });
        Ok(())
    }

    pub fn add_friend(&mut self, class: SymbolId, friend: SymbolId) -> Result<()> {
        let symbol = self.detached_mut(class)?;
        let name = symbol.name.clone();
        symbol
            .class_mut()
            .ok_or(SymbolTableError::BadTypeInfo { name })?
            .friends
            .push(friend);
        self.journal.record(Command::AddFriend { class });
        Ok(())
    }

    /// Record `definition` as the completion of the forward declaration `forward`.
    pub fn set_definition(&mut self, forward: SymbolId, definition: SymbolId) -> Result<()> {
        let symbol = self.detached_mut(forward)?;
        let previous = symbol.definition.replace(definition);
        self.journal
            .record(Command::SetDefinition { forward, previous });
        Ok(())
    }

    pub fn add_specialization(&mut self, primary: SymbolId, specialization: SymbolId) -> Result<()> {
        if let Some(scope) = self.symbol(primary)?.containing {
            self.attach(scope, specialization)?;
        }
        if let Some(spec) = self.detached_mut(specialization)?.template_mut() {
            spec.specialization_of = Some(primary);
        }
        let symbol = self.detached_mut(primary)?;
        let name = symbol.name.clone();
        symbol
            .template_mut()
            .ok_or(SymbolTableError::BadTypeInfo { name })?
            .specializations
            .push(specialization);
        self.journal
            .record(Command::AddSpecialization { template: primary });
        Ok(())
    }

    pub fn add_explicit_specialization(
        &mut self,
        template: SymbolId,
        args: Vec<TypeInfo>,
        symbol: SymbolId,
    ) -> Result<()> {
        if let Some(scope) = self.symbol(template)?.containing {
            self.attach(scope, symbol)?;
        }
        let owner = self.detached_mut(template)?;
        let name = owner.name.clone();
        owner
            .template_mut()
            .ok_or(SymbolTableError::BadTypeInfo { name })?
            .explicit_specializations
            .push((args, symbol));
        self.journal
            .record(Command::AddExplicitSpecialization { template });
        Ok(())
    }

    // ==========================================================================
    // Instance cache
    // ==========================================================================

    pub fn cache_instance(&mut self, template: SymbolId, args: Vec<TypeInfo>, instance: SymbolId) {
        if self.journal.is_recording() {
            self.journal.record(Command::CacheInstance {
                template,
                args: args.clone(),
                deferred: false,
            });
        }
        self.instances.cache_instance(template, args, instance);
    }

    pub fn cached_instance(&self, template: SymbolId, args: &[TypeInfo]) -> Option<SymbolId> {
        self.instances.get_instance(template, args)
    }

    pub fn cache_deferred(&mut self, template: SymbolId, args: Vec<TypeInfo>, instance: SymbolId) {
        if self.journal.is_recording() {
            self.journal.record(Command::CacheInstance {
                template,
                args: args.clone(),
                deferred: true,
            });
        }
        self.instances.cache_deferred(template, args, instance);
    }

    pub fn cached_deferred(&self, template: SymbolId, args: &[TypeInfo]) -> Option<SymbolId> {
        self.instances.get_deferred(template, args)
    }

    pub fn instance_cache(&self) -> &TemplateInstanceCache {
        &self.instances
    }

    // ==========================================================================
    // Transactions
    // ==========================================================================

    pub fn set_mark(&mut self) -> Mark {
        let mark = self.journal.set_mark();
        debug!(mark = %mark, "set mark");
        mark
    }

    /// Undo everything recorded since `mark`. Returns `false` for a mark
    /// that is not open.
    pub fn roll_back(&mut self, mark: Mark) -> bool {
        let Some(commands) = self.journal.unwind(mark) else {
            return false;
        };
        debug!(mark = %mark, undone = commands.len(), "rolling back");
        for command in commands {
            self.undo(command);
        }
        true
    }

    pub fn commit(&mut self, mark: Mark) -> bool {
        let committed = self.journal.commit(mark);
        if committed {
            debug!(mark = %mark, "committed");
        }
        committed
    }

    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    fn undo(&mut self, command: Command) {
        match command {
            Command::Mark(_) => {}
            Command::AddSymbol {
                scope,
                name,
                symbol,
            } => {
                if let Some(data) = self.slot_mut(scope).and_then(Symbol::scope_mut) {
                    data.remove(&name, symbol);
                }
            }
            Command::AddParent { class } => {
                if let Some(data) = self.slot_mut(class).and_then(Symbol::class_mut) {
                    data.parents.pop();
                }
            }
            Command::AddUsingDirective { scope, target } => {
                self.using.remove(scope, target);
            }
            Command::AddParameter {
                function,
                name,
                param,
            } => {
                if let Some(data) = self.slot_mut(function).and_then(Symbol::function_mut) {
                    data.params.pop();
                    data.scope.remove(&name, param);
                }
            }
            Command::AddTemplateParameter {
                template,
                name,
                param,
            } => {
                if let Some(data) = self.slot_mut(template).and_then(Symbol::template_mut) {
                    data.params.pop();
                    data.scope.remove(&name, param);
                }
            }
            Command::AddConstructor { class } => {
                if let Some(data) = self.slot_mut(class).and_then(Symbol::class_mut) {
                    data.constructors.pop();
                }
            }
            Command::AddFriend { class } => {
                if let Some(data) = self.slot_mut(class).and_then(Symbol::class_mut) {
                    data.friends.pop();
                }
            }
            Command::SetDefinition { forward, previous } => {
                if let Some(symbol) = self.slot_mut(forward) {
                    symbol.definition = previous;
                }
            }
            Command::AddSpecialization { template } => {
                if let Some(data) = self.slot_mut(template).and_then(Symbol::template_mut) {
                    data.specializations.pop();
                }
            }
            Command::AddExplicitSpecialization { template } => {
                if let Some(data) = self.slot_mut(template).and_then(Symbol::template_mut) {
                    data.explicit_specializations.pop();
                }
            }
            Command::CacheInstance {
                template,
                args,
                deferred,
            } => self.instances.evict(template, args, deferred),
            Command::Restore { symbol, snapshot } => {
                if let Some(slot) = self.slot_mut(symbol) {
                    *slot = *snapshot;
                }
            }
        }
    }

    fn slot_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.get_mut(id.slot())
    }
}
