//! Template argument deduction.
//!
//! Deduction matches a parameter type `P` written in terms of template
//! parameters against an argument type `A` and records what each template
//! parameter must be for the two to agree.

use cppsym_core::{PtrOpKind, Result, SymbolId, TypeFlags, TypeInfo, TypeKind};
use tracing::trace;

use super::substitution::ArgumentMap;
use crate::table::SymbolTable;

/// How strictly `P` has to match `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeductionMode {
    /// Function call: `P` and `A` are adjusted first, and parts of `P` that
    /// involve no template parameter are left to overload resolution.
    Call,
    /// Partial specialization matching and partial ordering: everything
    /// must match exactly.
    Exact,
}

impl SymbolTable {
    /// Deduce the parameters of the partial specialization `spec` from the
    /// arguments of a template-id of its primary.
    ///
    /// `None` when the arguments do not match the specialization's pattern
    /// or leave one of its parameters undeduced.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn deduce_template_arguments(
        &self,
        spec: SymbolId,
        args: &[TypeInfo],
    ) -> Option<ArgumentMap> {
        let data = self.get(spec)?.template()?;
        if data.pattern.len() != args.len() {
            return None;
        }
        let mut map = ArgumentMap::default();
        for (p, a) in data.pattern.iter().zip(args) {
            if !self.deduce(p, a, &mut map, DeductionMode::Exact) {
                return None;
            }
        }
        if data.params.iter().any(|p| !map.contains_key(p)) {
            return None;
        }
        Some(map)
    }

    /// Deduce the arguments of the function template `template` from the
    /// types of a call's arguments, after binding `explicit` to the leading
    /// parameters.
    ///
    /// The result lists arguments in parameter order up to the first one
    /// that was not deduced; the remaining parameters must have defaults.
    pub(crate) fn deduce_from_call(
        &self,
        template: SymbolId,
        call_args: &[TypeInfo],
        explicit: Option<&[TypeInfo]>,
    ) -> Result<Option<Vec<TypeInfo>>> {
        let tsym = self.symbol(template)?;
        let Some(data) = tsym.template() else {
            return Ok(None);
        };
        let Some(function) = data.templated else {
            return Ok(None);
        };
        let params = data.params.clone();

        let mut map = ArgumentMap::default();
        if let Some(explicit) = explicit {
            if explicit.len() > params.len() {
                return Ok(None);
            }
            for (&param, arg) in params.iter().zip(explicit) {
                map.insert(param, self.flatten(arg));
            }
        }

        for (p, a) in self.parameter_types(function).iter().zip(call_args) {
            if !self.deduce(p, a, &mut map, DeductionMode::Call) {
                trace!(template = %template, "deduction failed");
                return Ok(None);
            }
        }

        let mut deduced = Vec::with_capacity(params.len());
        for &param in &params {
            match map.get(&param) {
                Some(arg) => deduced.push(arg.clone()),
                None => break,
            }
        }
        let rest_defaulted = params[deduced.len()..].iter().all(|&p| {
            self.get(p)
                .is_some_and(|s| s.type_info.default.is_some() || s.type_info.has_default)
        });
        Ok(rest_defaulted.then_some(deduced))
    }

    /// Match `p` against `a`, extending `map`.
    pub(crate) fn deduce(&self, p: &TypeInfo, a: &TypeInfo, map: &mut ArgumentMap, mode: DeductionMode) -> bool {
        let (p, a) = match mode {
            DeductionMode::Call => self.adjust_for_call(p, a),
            DeductionMode::Exact => (self.flatten(p), self.flatten(a)),
        };
        self.deduce_adjusted(&p, &a, map, mode)
    }

    fn deduce_adjusted(&self, p: &TypeInfo, a: &TypeInfo, map: &mut ArgumentMap, mode: DeductionMode) -> bool {
        if !self.is_dependent(p) {
            return mode == DeductionMode::Call || self.types_equal(p, a);
        }
        let Some(id) = p.type_symbol else {
            return false;
        };
        let Some(sym) = self.get(id) else {
            return false;
        };

        if sym.is(TypeKind::TemplateParameter) {
            return match sym.type_info.template_param_kind {
                Some(TypeKind::TypeName) | None => self.deduce_type_parameter(id, p, a, map, mode),
                Some(TypeKind::Template) => {
                    a.ptr_ops.is_empty() && self.bind(map, id, strip_cv(a.clone()))
                }
                Some(kind) => {
                    let compatible = a.kind == kind
                        || (kind.is_arithmetic() && a.kind.is_arithmetic())
                        || a.kind == TypeKind::Enumerator
                        || self.is_dependent(a);
                    compatible && self.bind(map, id, a.clone())
                }
            };
        }

        if p.ptr_ops.len() != a.ptr_ops.len() || !self.operators_match(p, a, map, mode) {
            return false;
        }
        if p.cv_flags() != a.cv_flags() && mode == DeductionMode::Exact {
            return false;
        }

        if let Some((template, p_args)) = sym.deferred() {
            return self.deduce_template_id(template, p_args, a, map, mode);
        }
        if let Some(instance) = &sym.instance {
            let p_args = instance.args.clone();
            return self.deduce_template_id(instance.template, &p_args, a, map, mode);
        }
        if sym.is(TypeKind::Function) {
            return self.deduce_function_type(id, a, map);
        }
        false
    }

    /// `P` is `cv T ops`: `A` must end in the same operators, and what is
    /// left of `A` becomes `T`.
    fn deduce_type_parameter(
        &self,
        param: SymbolId,
        p: &TypeInfo,
        a: &TypeInfo,
        map: &mut ArgumentMap,
        mode: DeductionMode,
    ) -> bool {
        let count = p.ptr_ops.len();
        if a.ptr_ops.len() < count || !self.operators_match(p, a, map, mode) {
            return false;
        }
        let mut deduced = a.clone();
        deduced.ptr_ops.drain(..count);
        deduced.operator_exprs.clear();
        deduced.default = None;
        deduced.has_default = false;

        let written_cv = p.cv_flags();
        if !written_cv.is_empty() {
            let top_cv = match deduced.ptr_ops.first() {
                Some(op) => op.cv_flags(),
                None => deduced.cv_flags(),
            };
            if !top_cv.contains(written_cv) && mode == DeductionMode::Exact {
                return false;
            }
            match deduced.ptr_ops.first_mut() {
                Some(op) => {
                    op.is_const &= !written_cv.contains(TypeFlags::CONST);
                    op.is_volatile &= !written_cv.contains(TypeFlags::VOLATILE);
                }
                None => deduced.flags.remove(written_cv),
            }
        }
        self.bind(map, param, deduced)
    }

    /// Compare the leading operators of `p` and `a`,
    /// deducing the class of dependent pointer-to-member operators.
    fn operators_match(
        &self,
        p: &TypeInfo,
        a: &TypeInfo,
        map: &mut ArgumentMap,
        mode: DeductionMode,
    ) -> bool {
        for (pop, aop) in p.ptr_ops.iter().zip(&a.ptr_ops) {
            if pop.kind != aop.kind {
                return false;
            }
            let cv_ok = match mode {
                DeductionMode::Exact => pop.cv_flags() == aop.cv_flags(),
                DeductionMode::Call => aop.cv_subset_of(pop),
            };
            if !cv_ok {
                return false;
            }
            if pop.kind == PtrOpKind::MemberPointer {
                let (Some(pm), Some(am)) = (pop.member_of, aop.member_of) else {
                    return false;
                };
                let dependent = self
                    .get(pm)
                    .is_some_and(|s| s.is(TypeKind::TemplateParameter));
                let ok = if dependent {
                    self.bind(map, pm, TypeInfo::of_symbol(am))
                } else {
                    self.symbols_equivalent(pm, am)
                };
                if !ok {
                    return false;
                }
            }
        }
        true
    }

    /// `P` names `template<p_args>`: `A` must be an instance (or, in a call,
    /// have a base class that is an instance) of the same template.
    fn deduce_template_id(
        &self,
        template: SymbolId,
        p_args: &[TypeInfo],
        a: &TypeInfo,
        map: &mut ArgumentMap,
        mode: DeductionMode,
    ) -> bool {
        let Some(a_id) = a.type_symbol else {
            return false;
        };
        let mut candidates = vec![a_id];
        let mut seen = vec![a_id];
        while let Some(candidate) = candidates.pop() {
            if let Some(a_args) = self.template_id_arguments(template, candidate) {
                let mut attempt = map.clone();
                let matched = p_args.len() == a_args.len()
                    && p_args
                        .iter()
                        .zip(&a_args)
                        .all(|(pa, aa)| self.deduce(pa, aa, &mut attempt, DeductionMode::Exact));
                if matched {
                    *map = attempt;
                    return true;
                }
            }
            if mode == DeductionMode::Call {
                let parents = self.get(candidate).map(|s| s.parents().to_vec()).unwrap_or_default();
                for parent in parents {
                    if let Some(scope) = self.parent_scope(parent.parent)
                        && !seen.contains(&scope)
                    {
                        seen.push(scope);
                        candidates.push(scope);
                    }
                }
            }
        }
        false
    }

    /// The arguments of `candidate` when it is an instance or deferred
    /// instance of `template`.
    fn template_id_arguments(&self, template: SymbolId, candidate: SymbolId) -> Option<Vec<TypeInfo>> {
        let sym = self.get(candidate)?;
        if let Some((t, args)) = sym.deferred() {
            return self.symbols_equivalent(t, template).then(|| args.to_vec());
        }
        let instance = sym.instance.as_ref()?;
        (instance.template == template || self.symbols_equivalent(instance.template, template))
            .then(|| instance.args.clone())
    }

    fn deduce_function_type(&self, function: SymbolId, a: &TypeInfo, map: &mut ArgumentMap) -> bool {
        let Some(a_id) = a.type_symbol else {
            return false;
        };
        let (Some(pf), Some(af)) = (
            self.get(function).and_then(|s| s.function()),
            self.get(a_id).and_then(|s| s.function()),
        ) else {
            return false;
        };
        if pf.has_var_args != af.has_var_args {
            return false;
        }
        let returns = match (&pf.return_type, &af.return_type) {
            (Some(pr), Some(ar)) => self.deduce(pr, ar, map, DeductionMode::Exact),
            (None, None) => true,
            _ => false,
        };
        let p_params = self.parameter_types(function);
        let a_params = self.parameter_types(a_id);
        returns
            && p_params.len() == a_params.len()
            && p_params.iter().zip(&a_params).all(|(pp, ap)| {
                self.deduce(&self.adjusted_parameter(pp), &self.adjusted_parameter(ap), map, DeductionMode::Exact)
            })
    }

    /// Call adjustments: a reference `P` deduces from the referred type,
    /// otherwise arrays and functions in `A` decay and top-level cv is
    /// ignored on both sides.
    fn adjust_for_call(&self, p: &TypeInfo, a: &TypeInfo) -> (TypeInfo, TypeInfo) {
        let mut p = self.flatten(p);
        let mut a = self.flatten(a);
        if a.is_reference() {
            a.ptr_ops.remove(0);
        }
        if p.is_reference() {
            p.ptr_ops.remove(0);
            return (p, a);
        }
        if let Some(first) = a.ptr_ops.first_mut()
            && first.kind == PtrOpKind::Array
        {
            first.kind = PtrOpKind::Pointer;
        }
        if a.ptr_ops.is_empty()
            && a.type_symbol.is_some_and(|s| self.kind_of(s) == TypeKind::Function)
        {
            a.ptr_ops.push(cppsym_core::PtrOp::pointer());
        }
        (strip_cv(p), strip_cv(a))
    }

    /// Record `param = value`, or check it against an earlier deduction.
    fn bind(&self, map: &mut ArgumentMap, param: SymbolId, value: TypeInfo) -> bool {
        match map.get(&param) {
            Some(existing) => self.types_equal(&self.flatten(existing), &self.flatten(&value)),
            None => {
                map.insert(param, value);
                true
            }
        }
    }
}

/// Drop top-level cv-qualifiers.
fn strip_cv(mut info: TypeInfo) -> TypeInfo {
    match info.ptr_ops.first_mut() {
        Some(op) => {
            op.is_const = false;
            op.is_volatile = false;
        }
        None => info.flags.remove(TypeFlags::CV),
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use cppsym_core::PtrOp;

    fn param(table: &mut SymbolTable, name: &str) -> SymbolId {
        let template = table.new_template("t");
        let p = table.new_template_parameter(name, TypeKind::TypeName);
        table.add_template_parameter(template, p).unwrap();
        p
    }

    #[test]
    fn pointer_pattern_strips_operators() {
        let mut table = SymbolTable::cpp();
        let t = param(&mut table, "T");
        let p = TypeInfo::of_symbol(t).with_ptr(PtrOp::pointer());
        let a = TypeInfo::new(TypeKind::Char).with_ptr(PtrOp::pointer()).with_ptr(PtrOp::pointer());

        let mut map = ArgumentMap::default();
        assert!(table.deduce(&p, &a, &mut map, DeductionMode::Exact));
        assert_eq!(map[&t], TypeInfo::new(TypeKind::Char).with_ptr(PtrOp::pointer()));

        let mut map = ArgumentMap::default();
        assert!(!table.deduce(&p, &TypeInfo::new(TypeKind::Int), &mut map, DeductionMode::Exact));
    }

    #[test]
    fn repeated_parameter_must_agree() {
        let mut table = SymbolTable::cpp();
        let t = param(&mut table, "T");
        let mut map = ArgumentMap::default();
        let p = TypeInfo::of_symbol(t);
        assert!(table.deduce(&p, &TypeInfo::new(TypeKind::Int), &mut map, DeductionMode::Exact));
        assert!(!table.deduce(&p, &TypeInfo::new(TypeKind::Char), &mut map, DeductionMode::Exact));
        assert!(table.deduce(&p, &TypeInfo::new(TypeKind::Int), &mut map, DeductionMode::Exact));
    }

    #[test]
    fn const_parameter_in_call_and_exact_modes() {
        let mut table = SymbolTable::cpp();
        let t = param(&mut table, "T");
        // const T&
        let p = TypeInfo::of_symbol(t)
            .with_flags(TypeFlags::CONST)
            .with_ptr(PtrOp::reference());
        let int = TypeInfo::new(TypeKind::Int);

        let mut map = ArgumentMap::default();
        assert!(table.deduce(&p, &int, &mut map, DeductionMode::Call));
        assert_eq!(map[&t], int);

        let const_p = TypeInfo::of_symbol(t).with_flags(TypeFlags::CONST);
        let mut map = ArgumentMap::default();
        assert!(!table.deduce(&const_p, &int, &mut map, DeductionMode::Exact));
        let mut map = ArgumentMap::default();
        assert!(table.deduce(&const_p, &int.clone().with_flags(TypeFlags::CONST), &mut map, DeductionMode::Exact));
        assert_eq!(map[&t], int);
    }

    #[test]
    fn call_mode_ignores_non_dependent_parameters() {
        let mut table = SymbolTable::cpp();
        let t = param(&mut table, "T");
        let mut map = ArgumentMap::default();
        assert!(table.deduce(
            &TypeInfo::new(TypeKind::Double),
            &TypeInfo::new(TypeKind::Int),
            &mut map,
            DeductionMode::Call
        ));
        assert!(!table.deduce(
            &TypeInfo::new(TypeKind::Double),
            &TypeInfo::new(TypeKind::Int),
            &mut map,
            DeductionMode::Exact
        ));
        assert!(map.get(&t).is_none());
    }

    #[test]
    fn array_argument_decays_in_calls() {
        let mut table = SymbolTable::cpp();
        let t = param(&mut table, "T");
        let p = TypeInfo::of_symbol(t).with_ptr(PtrOp::pointer());
        let a = TypeInfo::new(TypeKind::Int).with_ptr(PtrOp::array());
        let mut map = ArgumentMap::default();
        assert!(table.deduce(&p, &a, &mut map, DeductionMode::Call));
        assert_eq!(map[&t], TypeInfo::new(TypeKind::Int));
    }
}
