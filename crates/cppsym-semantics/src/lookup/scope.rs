//! The scope walk: contained declarations, using-directives and enclosing scopes.

use cppsym_core::{Result, SymbolId, SymbolTableError, TypeKind};
use tracing::trace;

use super::{Found, LookupData};
use crate::table::SymbolTable;

impl SymbolTable {
    /// Search `scope` and, failing that, its bases and enclosing scopes.
    /// The result accumulates in `data.found`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn lookup_scope(&self, data: &mut LookupData, scope: SymbolId) -> Result<()> {
        let mut scope = self.lookup_target(scope);
        loop {
            trace!(scope = %scope, name = %data.name, "searching scope");

            if !data.using_directives_only {
                let found = self.lookup_in_contained(data, scope)?;
                let previous = data.found.take();
                data.found = self.merge(data, previous, found)?;
            }

            if self.config.using_directives_enabled() && !data.ignore_using_directives {
                data.visited.clear();
                let mut transitives = Vec::new();
                self.lookup_in_nominated(data, scope, &mut transitives)?;
                if !data.qualified || data.found.is_none() {
                    self.process_directives(data, scope, &transitives);
                    let own = self.registry.using_directives(scope);
                    self.process_directives(data, scope, &own);
                    while data.pending.contains_key(&scope) {
                        transitives.clear();
                        self.lookup_in_nominated(data, scope, &mut transitives)?;
                        if !data.qualified || data.found.is_none() {
                            self.process_directives(data, scope, &transitives);
                        }
                    }
                }
            }

            if data.found.is_some() || data.stop_at == Some(scope) {
                return Ok(());
            }

            if !data.for_definition && self.kind_of(scope).is_class_like() {
                data.visited.clear();
                let inherited = self.lookup_in_parents(data, scope)?;
                let previous = data.found.take();
                data.found = self.merge(data, previous, inherited)?;
            }

            if data.found.is_some() || data.for_definition {
                return Ok(());
            }

            let Some(parent) = self.containing(scope) else {
                return Ok(());
            };
            if data.qualified {
                if data.pending.is_empty() {
                    return Ok(());
                }
                data.using_directives_only = true;
            }
            scope = self.lookup_target(parent);
        }
    }

    /// The scope a lookup "in `scope`" actually searches: the target of a
    /// namespace alias, the definition of a forward declaration, the
    /// templated class of a deferred instance.
    pub(crate) fn lookup_target(&self, scope: SymbolId) -> SymbolId {
        let scope = self.resolve_forward(scope);
        let Some(sym) = self.get(scope) else {
            return scope;
        };
        if sym.is(TypeKind::Namespace)
            && let Some(target) = sym.type_info.type_symbol
            && self.kind_of(target) == TypeKind::Namespace
        {
            return self.lookup_target(target);
        }
        if let Some((template, _)) = sym.deferred() {
            return self
                .get(template)
                .and_then(|t| t.template())
                .and_then(|t| t.templated)
                .unwrap_or(scope);
        }
        scope
    }

    /// Search the namespaces queued for `scope` by earlier directives.
    fn lookup_in_nominated(
        &self,
        data: &mut LookupData,
        scope: SymbolId,
        transitives: &mut Vec<SymbolId>,
    ) -> Result<()> {
        let Some(nominated) = data.pending.remove(&scope) else {
            return Ok(());
        };
        for namespace in nominated {
            if !data.visited.insert(namespace) {
                continue;
            }
            let found = self.lookup_in_contained(data, namespace)?;
            let found_here = found.is_some();
            let previous = data.found.take();
            data.found = self.merge(data, previous, found)?;
            if !data.qualified || !found_here {
                transitives.extend(self.registry.using_directives(namespace));
            }
        }
        Ok(())
    }

    /// Queue each nominated namespace at the closest scope enclosing both
    /// it and `scope`, where its names become visible.
    fn process_directives(&self, data: &mut LookupData, scope: SymbolId, directives: &[SymbolId]) {
        for &target in directives {
            let target = self.lookup_target(target);
            if data.visited.contains(&target) {
                continue;
            }
            let enclosing = self.closest_enclosing(scope, target);
            let queue = data.pending.entry(enclosing).or_default();
            if !queue.contains(&target) {
                queue.push(target);
            }
        }
    }

    /// The innermost scope containing both `a` and `b`.
    pub(crate) fn closest_enclosing(&self, a: SymbolId, b: SymbolId) -> SymbolId {
        let depth = |id: SymbolId| self.get(id).map(|s| s.depth).unwrap_or(0);
        let (mut a, mut b) = (a, b);
        while a != b {
            let (da, db) = (depth(a), depth(b));
            let next_a = if da >= db { self.containing(a) } else { Some(a) };
            let next_b = if db >= da { self.containing(b) } else { Some(b) };
            match (next_a, next_b) {
                (Some(x), Some(y)) => {
                    a = x;
                    b = y;
                }
                _ => return self.root(),
            }
        }
        a
    }

    /// Declarations of `data.name` directly inside `scope`.
    pub(crate) fn lookup_in_contained(
        &self,
        data: &mut LookupData,
        scope: SymbolId,
    ) -> Result<Option<Found>> {
        data.associated.remove(&scope);
        let sym = self.symbol(scope)?;
        let ids = sym
            .scope()
            .map(|s| s.lookup(&data.name).to_vec())
            .unwrap_or_default();
        if !ids.is_empty() {
            let found = self.collect_symbols(data, &ids)?;
            if found.is_some() {
                return Ok(found);
            }
        }

        // Parameters of out-of-class template member definitions are only
        // visible from inside the definition that declared them.
        if let Some(template) = sym.template() {
            for (definition, params) in &template.definition_params {
                if !self.is_within(data.origin, *definition) {
                    continue;
                }
                if let Some((param, _)) = params.iter().find(|(p, _)| self.name(*p) == data.name) {
                    return Ok(Some(Found::One(*param)));
                }
            }
        }
        Ok(None)
    }

    /// Whether `inner` is `outer` or nested inside it.
    pub(crate) fn is_within(&self, inner: SymbolId, outer: SymbolId) -> bool {
        let mut current = Some(inner);
        while let Some(id) = current {
            if id == outer {
                return true;
            }
            current = self.containing(id);
        }
        false
    }

    pub(crate) fn merge(
        &self,
        data: &LookupData,
        a: Option<Found>,
        b: Option<Found>,
    ) -> Result<Option<Found>> {
        match (a, b) {
            (None, other) | (other, None) => Ok(other),
            (Some(a), Some(b)) => {
                let mut ids = a.ids();
                ids.extend(b.ids());
                self.collect_symbols(data, &ids)
            }
        }
    }

    /// Classify a set of same-named declarations.
    ///
    /// Functions form an overload set. A class or enumeration is hidden by
    /// an object or functions declared in the same scope. Anything else
    /// that names more than one entity is ambiguous.
    pub(crate) fn collect_symbols(
        &self,
        data: &LookupData,
        ids: &[SymbolId],
    ) -> Result<Option<Found>> {
        let mut object: Option<SymbolId> = None;
        let mut class: Option<SymbolId> = None;
        let mut functions: Vec<SymbolId> = Vec::new();
        let mut ambiguous = false;

        for &id in ids {
            let sym = self.symbol(id)?;
            if sym.is_invisible && !data.for_friendship {
                continue;
            }
            if !data.filter.accepts(self, sym) {
                continue;
            }
            let id = self.resolve_forward(id);
            let sym = self.symbol(id)?;

            if sym.kind().is_function_like() || self.is_function_template(id) {
                let origin = self.using_origin(id);
                if !functions.iter().any(|&f| self.using_origin(f) == origin) {
                    functions.push(id);
                }
            } else if sym.kind().is_elaborated() {
                match class {
                    None => class = Some(id),
                    Some(c) if self.using_origin(c) == self.using_origin(id) => {}
                    Some(_) => ambiguous = true,
                }
            } else {
                match object {
                    None => object = Some(id),
                    Some(o) if self.using_origin(o) == self.using_origin(id) => {}
                    Some(_) => ambiguous = true,
                }
            }
        }

        if let Some(c) = class {
            let class_scope = self.containing(c);
            if object.is_some_and(|o| self.containing(o) != class_scope)
                || functions.iter().any(|&f| self.containing(f) != class_scope)
            {
                ambiguous = true;
            }
        }

        if let Some(o) = object
            && !ambiguous
        {
            if functions.is_empty() {
                return Ok(Some(Found::One(o)));
            }
            ambiguous = true;
        }

        if ambiguous {
            trace!(name = %data.name, "ambiguous declarations");
            return Err(SymbolTableError::ambiguous(data.name.clone()));
        }
        if !functions.is_empty() {
            return Ok(Some(Found::Overloads(functions)));
        }
        Ok(class.map(Found::One))
    }

    /// A template whose templated declaration is a function.
    pub(crate) fn is_function_template(&self, id: SymbolId) -> bool {
        self.get(id)
            .and_then(|s| s.template())
            .and_then(|t| t.templated)
            .is_some_and(|f| self.kind_of(f).is_function_like())
    }
}
