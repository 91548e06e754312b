//! Template instantiation logic.
//!
//! An instance is a copy of the declaration a template declares, made in two
//! passes: every symbol of the declaration's subtree is cloned first, then
//! each clone has its types substituted and its references into the subtree
//! redirected to the corresponding clones. The instance is cached before
//! the second pass so self-references resolve to it.

use cppsym_core::{
    InstanceInfo, Result, ScopeData, Symbol, SymbolData, SymbolId, SymbolTableError, TypeInfo,
    TypeKind,
};
use tracing::debug;

use super::substitution::{ArgumentMap, Substitution};
use crate::table::SymbolTable;

impl SymbolTable {
    /// The instance of `template` for `args`.
    ///
    /// Missing arguments take the parameters' defaults. Arguments that
    /// depend on enclosing template parameters yield a deferred instance,
    /// an explicit specialization registered for `args` is returned as is,
    /// and an existing instance is reused. Otherwise the best matching
    /// partial specialization (or the primary) is copied.
    ///
    /// The copy is made inside a transaction: a failure leaves the table
    /// as it was.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn instantiate(&mut self, template: SymbolId, args: &[TypeInfo]) -> Result<SymbolId> {
        let name = self.name(template).to_string();
        if !self.config.is_cpp() {
            return Err(SymbolTableError::bad_template(name, "templates require C++"));
        }
        let (is_parameter, specialization_of, pattern) = {
            let sym = self.symbol(template)?;
            let data = sym
                .template()
                .ok_or_else(|| SymbolTableError::bad_template(name.clone(), "not a template"))?;
            (
                sym.is(TypeKind::TemplateParameter),
                data.specialization_of,
                data.pattern.clone(),
            )
        };
        if is_parameter {
            return self.deferred_instance(template, args.to_vec());
        }

        // A partial specialization named directly stands for its primary
        // with the specialization's pattern.
        if let Some(primary) = specialization_of {
            let params = self.symbol(template)?.params().to_vec();
            let map: ArgumentMap = params.into_iter().zip(args.iter().cloned()).collect();
            let ctx = Substitution::lazy(map);
            let mut primary_args = Vec::with_capacity(pattern.len());
            for p in &pattern {
                primary_args.push(self.subst_type(p, &ctx)?);
            }
            return self.instantiate(primary, &primary_args);
        }

        let args = self.normalize_arguments(template, args)?;
        if args.iter().any(|a| self.is_dependent(a)) {
            return self.deferred_instance(template, args);
        }
        if let Some(explicit) = self.find_explicit_specialization(template, &args) {
            return Ok(explicit);
        }
        if let Some(cached) = self.registry.cached_instance(template, &args) {
            return Ok(cached);
        }
        if self.instantiation_depth >= self.config.max_instantiation_depth {
            return Err(SymbolTableError::bad_template(
                name,
                format!(
                    "instantiation nested more than {} levels deep",
                    self.config.max_instantiation_depth
                ),
            ));
        }

        let (source, mut map) = match self.match_partial_specialization(template, &args)? {
            Some(selected) => selected,
            None => {
                let params = self.symbol(template)?.params().to_vec();
                (template, params.into_iter().zip(args.iter().cloned()).collect())
            }
        };
        self.bind_definition_parameters(source, &mut map)?;

        let mark = self.registry.set_mark();
        self.instantiation_depth += 1;
        let result = self.instantiate_templated(template, source, &args, map);
        self.instantiation_depth -= 1;
        match result {
            Ok(instance) => {
                self.registry.commit(mark);
                debug!(template = %name, source = %source, instance = %instance, "instantiated");
                Ok(instance)
            }
            Err(e) => {
                self.registry.roll_back(mark);
                debug!(template = %name, error = %e, "instantiation failed");
                Err(e)
            }
        }
    }

    /// Parameters of out-of-class member definitions stand for the
    /// template's own parameters.
    fn bind_definition_parameters(&self, source: SymbolId, map: &mut ArgumentMap) -> Result<()> {
        let Some(data) = self.symbol(source)?.template() else {
            return Ok(());
        };
        for pairs in data.definition_params.values() {
            for (definition_param, original) in pairs {
                if let Some(arg) = map.get(original).cloned() {
                    map.insert(*definition_param, arg);
                }
            }
        }
        Ok(())
    }

    fn instantiate_templated(
        &mut self,
        primary: SymbolId,
        source: SymbolId,
        args: &[TypeInfo],
        map: ArgumentMap,
    ) -> Result<SymbolId> {
        let (templated, params) = {
            let data = self.symbol(source)?.template();
            (
                data.and_then(|t| t.templated),
                data.map(|t| t.params.clone()).unwrap_or_default(),
            )
        };
        let templated = templated.ok_or_else(|| {
            SymbolTableError::bad_template(self.name(source), "template declares nothing")
        })?;
        let templated = self.resolve_forward(templated);

        let argument_map = params
            .iter()
            .filter_map(|p| map.get(p).map(|a| (*p, a.clone())))
            .collect();
        let mut ctx = Substitution::new(map);
        let root = self.clone_tree(templated, &mut ctx)?;

        let (containing, depth, is_template_member) = {
            let p = self.symbol(primary)?;
            (p.containing, p.depth, p.is_template_member)
        };
        {
            let instance = self.registry.detached_mut(root)?;
            instance.containing = containing;
            instance.depth = depth;
            instance.is_template_member = is_template_member;
            instance.instance = Some(InstanceInfo {
                template: primary,
                args: args.to_vec(),
                argument_map,
            });
        }
        self.registry.cache_instance(primary, args.to_vec(), root);

        let order = ctx.order.clone();
        for (_, clone) in order {
            self.rewrite_clone(clone, root, &ctx)?;
        }
        Ok(root)
    }

    /// Copy `original` and everything declared inside it, parents first.
    fn clone_tree(&mut self, original: SymbolId, ctx: &mut Substitution) -> Result<SymbolId> {
        let mut stack = vec![original];
        while let Some(id) = stack.pop() {
            if ctx.clones.contains_key(&id) {
                continue;
            }
            let mut copy = self.symbol(id)?.clone();
            let children = children_of(&copy);
            copy.instantiated_from = Some(id);
            let clone = self.registry.create(copy);
            ctx.clones.insert(id, clone);
            ctx.order.push((id, clone));
            stack.extend(children.into_iter().rev());
        }
        Ok(ctx.remap(original))
    }

    /// Substitute the types of one clone and point its references into the
    /// copied subtree at the copies.
    fn rewrite_clone(&mut self, clone: SymbolId, root: SymbolId, ctx: &Substitution) -> Result<()> {
        let mut sym: Symbol = self.symbol(clone)?.clone();
        sym.type_info = self.subst_type(&sym.type_info, ctx)?;
        sym.definition = sym.definition.map(|d| ctx.remap(d));
        if clone != root {
            sym.containing = sym.containing.map(|c| ctx.remap(c));
            if let Some(parent) = sym.containing.and_then(|c| self.get(c)) {
                sym.depth = parent.depth + 1;
                sym.is_template_member = parent.is(TypeKind::Template) || parent.is_template_member;
            }
        }

        match &mut sym.data {
            SymbolData::Plain => {}
            SymbolData::Scope(scope) => remap_scope(scope, ctx),
            SymbolData::Class(class) => {
                remap_scope(&mut class.scope, ctx);
                for parent in &mut class.parents {
                    parent.parent = self.subst_symbol(parent.parent, ctx)?;
                }
                remap_all(&mut class.constructors, ctx);
                remap_all(&mut class.friends, ctx);
            }
            SymbolData::Function(function) => {
                remap_scope(&mut function.scope, ctx);
                remap_all(&mut function.params, ctx);
                if let Some(ret) = function.return_type.take() {
                    function.return_type = Some(self.subst_type(&ret, ctx)?);
                }
            }
            SymbolData::Template(template) => {
                remap_scope(&mut template.scope, ctx);
                remap_all(&mut template.params, ctx);
                remap_all(&mut template.specializations, ctx);
                template.templated = template.templated.map(|t| ctx.remap(t));
                template.specialization_of = template.specialization_of.map(|t| ctx.remap(t));
                let pattern = std::mem::take(&mut template.pattern);
                for p in &pattern {
                    template.pattern.push(self.subst_type(p, ctx)?);
                }
                for (args, symbol) in &mut template.explicit_specializations {
                    let written = std::mem::take(args);
                    for a in &written {
                        args.push(self.subst_type(a, ctx)?);
                    }
                    *symbol = ctx.remap(*symbol);
                }
                template.definition_params = std::mem::take(&mut template.definition_params)
                    .into_iter()
                    .map(|(definition, pairs)| {
                        let pairs = pairs
                            .into_iter()
                            .map(|(dp, original)| (dp, ctx.remap(original)))
                            .collect();
                        (ctx.remap(definition), pairs)
                    })
                    .collect();
            }
            SymbolData::DeferredInstance { template, args } => {
                *template = ctx.remap(*template);
                let written = std::mem::take(args);
                for a in &written {
                    args.push(self.subst_type(a, ctx)?);
                }
            }
        }

        *self.registry.detached_mut(clone)? = sym;
        Ok(())
    }
}

/// Symbols owned by `symbol`: its scope contents, parameters,
/// constructors and specializations.
fn children_of(symbol: &Symbol) -> Vec<SymbolId> {
    let mut children: Vec<SymbolId> = symbol
        .scope()
        .map(|s| s.contents.clone())
        .unwrap_or_default();
    let mut push = |id: SymbolId| {
        if !children.contains(&id) {
            children.push(id);
        }
    };
    for &p in symbol.params() {
        push(p);
    }
    if let Some(class) = symbol.class() {
        for &c in &class.constructors {
            push(c);
        }
    }
    if let Some(template) = symbol.template() {
        for &s in &template.specializations {
            push(s);
        }
        for (_, s) in &template.explicit_specializations {
            push(*s);
        }
    }
    children
}

fn remap_all(ids: &mut [SymbolId], ctx: &Substitution) {
    for id in ids {
        *id = ctx.remap(*id);
    }
}

fn remap_scope(scope: &mut ScopeData, ctx: &Substitution) {
    remap_all(&mut scope.contents, ctx);
    for ids in scope.names.values_mut() {
        remap_all(ids, ctx);
    }
}
