//! Type substitution for template instantiation.
//!
//! Replaces template parameters with their arguments inside a type, remaps
//! symbols that were cloned into an instance, and re-resolves deferred
//! instances whose arguments become concrete.

use cppsym_core::{Result, Symbol, SymbolData, SymbolId, TypeFlags, TypeInfo, TypeKind};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::table::SymbolTable;

/// Map from template parameter to the argument bound to it.
pub(crate) type ArgumentMap = FxHashMap<SymbolId, TypeInfo>;

/// State of one substitution pass.
#[derive(Debug, Default)]
pub(crate) struct Substitution {
    pub map: ArgumentMap,
    /// Original symbol to its clone in the instance being built.
    pub clones: FxHashMap<SymbolId, SymbolId>,
    /// Clones in creation order, parents before children.
    pub order: Vec<(SymbolId, SymbolId)>,
    /// Keep deferred instances deferred instead of instantiating them.
    pub lazy: bool,
}

impl Substitution {
    pub(crate) fn new(map: ArgumentMap) -> Self {
        Self {
            map,
            ..Self::default()
        }
    }

    pub(crate) fn lazy(map: ArgumentMap) -> Self {
        Self {
            map,
            lazy: true,
            ..Self::default()
        }
    }

    pub(crate) fn remap(&self, id: SymbolId) -> SymbolId {
        self.clones.get(&id).copied().unwrap_or(id)
    }
}

impl SymbolTable {
    /// `info` with every template parameter in `ctx.map` replaced by its
    /// argument.
    ///
    /// The operators and cv-qualifiers written around the parameter stay
    /// outside the argument: substituting `int*` for `T` in `const T&` gives
    /// `int* const&`.
    pub(crate) fn subst_type(&mut self, info: &TypeInfo, ctx: &Substitution) -> Result<TypeInfo> {
        let mut result = info.clone();
        if let Some(default) = &info.default {
            result.default = Some(Box::new(self.subst_type(default, ctx)?));
        }
        for op in &mut result.ptr_ops {
            if let Some(member_of) = op.member_of {
                op.member_of = Some(self.subst_symbol(member_of, ctx)?);
            }
        }

        let Some(id) = info.type_symbol else {
            return Ok(result);
        };

        if let Some(arg) = ctx.map.get(&id)
            && info.kind == TypeKind::Type
        {
            return Ok(bind_parameter(result, arg));
        }

        if let Some(clone) = ctx.clones.get(&id) {
            result.type_symbol = Some(*clone);
            return Ok(result);
        }

        let sym = self.symbol(id)?;
        if let Some((template, args)) = sym.deferred() {
            let template = ctx.remap(template);
            let args = args.to_vec();
            let mut substituted = Vec::with_capacity(args.len());
            for arg in &args {
                substituted.push(self.subst_type(arg, ctx)?);
            }
            let target = if ctx.lazy || substituted.iter().any(|a| self.is_dependent(a)) {
                self.deferred_instance(template, substituted)?
            } else {
                self.instantiate(template, &substituted)?
            };
            result.type_symbol = Some(target);
            return Ok(result);
        }

        if sym.is(TypeKind::Function) && sym.name.is_empty() && self.is_dependent(&TypeInfo::of_symbol(id)) {
            result.type_symbol = Some(self.subst_function_type(id, ctx)?);
            return Ok(result);
        }

        Ok(result)
    }

    /// The symbol a base class or member-pointer class becomes after
    /// substitution.
    pub(crate) fn subst_symbol(&mut self, id: SymbolId, ctx: &Substitution) -> Result<SymbolId> {
        if let Some(clone) = ctx.clones.get(&id) {
            return Ok(*clone);
        }
        let substituted = self.subst_type(&TypeInfo::of_symbol(id), ctx)?;
        let flat = self.flatten(&substituted);
        Ok(flat.type_symbol.unwrap_or(id))
    }

    /// A copy of the unnamed function type `function` with substituted
    /// return and parameter types.
    fn subst_function_type(&mut self, function: SymbolId, ctx: &Substitution) -> Result<SymbolId> {
        let sym = self.symbol(function)?.clone();
        let return_type = match sym.function().and_then(|f| f.return_type.clone()) {
            Some(r) => Some(self.subst_type(&r, ctx)?),
            None => None,
        };
        let has_var_args = sym.function().is_some_and(|f| f.has_var_args);

        let mut copy = Symbol::new(sym.name.clone(), sym.type_info.clone());
        if let SymbolData::Function(data) = &mut copy.data {
            data.return_type = return_type;
            data.has_var_args = has_var_args;
        }
        let id = self.registry.create(copy);
        for &param in sym.params() {
            let param_sym = self.symbol(param)?.clone();
            let info = self.subst_type(&param_sym.type_info, ctx)?;
            let new_param = self.registry.create(Symbol::new(param_sym.name, info));
            self.registry.add_parameter(id, new_param)?;
        }
        Ok(id)
    }

    /// The placeholder for `template<args>` with dependent arguments.
    ///
    /// Placeholders are cached, so equal argument lists share one symbol.
    pub(crate) fn deferred_instance(&mut self, template: SymbolId, args: Vec<TypeInfo>) -> Result<SymbolId> {
        if let Some(existing) = self.registry.cached_deferred(template, &args) {
            return Ok(existing);
        }
        let tsym = self.symbol(template)?;
        let kind = tsym
            .template()
            .and_then(|t| t.templated)
            .map(|t| self.kind_of(t))
            .unwrap_or(TypeKind::Class);
        let mut symbol = Symbol::new(tsym.name.clone(), TypeInfo::new(kind));
        symbol.containing = tsym.containing;
        symbol.depth = tsym.depth;
        symbol.is_template_member = tsym.is_template_member;
        symbol.data = SymbolData::DeferredInstance {
            template,
            args: args.clone(),
        };

        let id = self.registry.create(symbol);
        trace!(template = %template, deferred = %id, "deferred instance");
        self.registry.cache_deferred(template, args, id);
        Ok(id)
    }
}

/// Replace the parameter named by `written` with `arg`, keeping the
/// operators written around the parameter outermost.
fn bind_parameter(written: TypeInfo, arg: &TypeInfo) -> TypeInfo {
    let mut out = arg.clone();
    let cv = written.cv_flags();
    match out.ptr_ops.first_mut() {
        Some(top) => {
            top.is_const |= cv.contains(TypeFlags::CONST);
            top.is_volatile |= cv.contains(TypeFlags::VOLATILE);
        }
        None => out.flags |= cv,
    }
    out.flags |= written.flags - TypeFlags::CV;

    let mut ops = written.ptr_ops;
    ops.extend(out.ptr_ops);
    out.ptr_ops = ops;
    out.default = written.default;
    out.has_default = written.has_default;
    out.operator_exprs = written.operator_exprs;
    out
}
