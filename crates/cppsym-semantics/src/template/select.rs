//! Choosing between a primary template, its partial specializations and
//! its explicit specializations.

use std::cmp::Ordering;

use cppsym_core::{Reason, Result, SymbolId, SymbolTableError, TypeInfo};
use tracing::{debug, trace};

use super::substitution::{ArgumentMap, Substitution};
use crate::lookup::{LookupData, TypeFilter};
use crate::table::SymbolTable;

impl SymbolTable {
    /// The most specialized partial specialization of `primary` matching
    /// `args`, with the deduced values of its parameters.
    ///
    /// `None` selects the primary. Two matching specializations where
    /// neither is more specialized are [`SymbolTableError::Ambiguous`].
    pub(crate) fn match_partial_specialization(
        &mut self,
        primary: SymbolId,
        args: &[TypeInfo],
    ) -> Result<Option<(SymbolId, ArgumentMap)>> {
        let specializations = self
            .symbol(primary)?
            .template()
            .map(|t| t.specializations.clone())
            .unwrap_or_default();

        let mut best: Option<(SymbolId, ArgumentMap)> = None;
        let mut best_is_best = true;
        for spec in specializations {
            let Some(map) = self.deduce_template_arguments(spec, args) else {
                continue;
            };
            trace!(spec = %spec, "partial specialization matches");
            let Some(incumbent) = best.as_ref().map(|(id, _)| *id) else {
                best = Some((spec, map));
                continue;
            };
            match self.order_specializations(incumbent, spec)? {
                Ordering::Less => {}
                Ordering::Greater => {
                    best = Some((spec, map));
                    best_is_best = true;
                }
                Ordering::Equal => best_is_best = false,
            }
        }

        if !best_is_best {
            return Err(SymbolTableError::ambiguous(self.name(primary).to_string()));
        }
        Ok(best)
    }

    /// The explicit specialization of `template` registered for `args`.
    pub(crate) fn find_explicit_specialization(&self, template: SymbolId, args: &[TypeInfo]) -> Option<SymbolId> {
        let data = self.get(template)?.template()?;
        data.explicit_specializations
            .iter()
            .find(|(declared, _)| {
                declared.len() == args.len()
                    && declared
                        .iter()
                        .zip(args)
                        .all(|(d, a)| self.types_equal(&self.flatten(d), &self.flatten(a)))
            })
            .map(|(_, symbol)| *symbol)
    }

    /// Instances of the function templates in `templates` that a call with
    /// `call_args` (and explicit `template_args`) could use.
    ///
    /// Templates whose deduction fails, or whose deduced arguments are
    /// invalid, are left out.
    pub(crate) fn select_template_functions(
        &mut self,
        templates: &[SymbolId],
        call_args: &[TypeInfo],
        template_args: Option<&[TypeInfo]>,
    ) -> Result<Vec<SymbolId>> {
        let mut instances = Vec::with_capacity(templates.len());
        for &template in templates {
            let Some(args) = self.deduce_from_call(template, call_args, template_args)? else {
                continue;
            };
            match self.instantiate(template, &args) {
                Ok(instance) => {
                    trace!(template = %template, instance = %instance, "template candidate");
                    instances.push(instance);
                }
                Err(e) if e.reason() == Reason::BadTemplateArgument => {
                    trace!(template = %template, error = %e, "template candidate rejected");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(instances)
    }

    /// Which template a definition written as `name<args>` belongs to: the
    /// primary when `args` are exactly its parameters, the partial
    /// specialization whose pattern `args` spell, or the explicit
    /// specialization registered for `args`.
    pub fn select_template_or_specialization(
        &mut self,
        primary: SymbolId,
        args: &[TypeInfo],
    ) -> Result<SymbolId> {
        let (params, specializations) = {
            let data = self
                .symbol(primary)?
                .template()
                .ok_or_else(|| SymbolTableError::bad_template(self.name(primary), "not a template"))?;
            (data.params.clone(), data.specializations.clone())
        };

        let same = |table: &SymbolTable, written: &[TypeInfo], declared: &[TypeInfo]| {
            written.len() == declared.len()
                && written
                    .iter()
                    .zip(declared)
                    .all(|(w, d)| table.types_equal(&table.flatten(w), &table.flatten(d)))
        };

        let primary_args: Vec<TypeInfo> = params.iter().map(|&p| TypeInfo::of_symbol(p)).collect();
        if same(self, args, &primary_args) {
            return Ok(primary);
        }
        for spec in specializations {
            let pattern = self
                .symbol(spec)?
                .template()
                .map(|t| t.pattern.clone())
                .unwrap_or_default();
            if same(self, args, &pattern) {
                return Ok(spec);
            }
        }
        if let Some(explicit) = self.find_explicit_specialization(primary, args) {
            return Ok(explicit);
        }
        if !args.iter().any(|a| self.is_dependent(a)) {
            return self.instantiate(primary, args);
        }
        Err(SymbolTableError::bad_template(
            self.name(primary),
            "no template or specialization matches these arguments",
        ))
    }

    /// Register `symbol` as an explicit specialization of the function
    /// template named like it in `scope`.
    ///
    /// Without `args` (`template<> void f(int)`) the arguments are deduced
    /// from the specialization's parameter types. Returns the template.
    pub fn check_for_template_explicit_specialization(
        &mut self,
        scope: SymbolId,
        symbol: SymbolId,
        args: Option<&[TypeInfo]>,
    ) -> Result<SymbolId> {
        let name = self.name(symbol).to_string();
        let mut data = LookupData::new(name.clone(), TypeFilter::any(), scope).qualified();
        data.for_definition = true;
        self.lookup_scope(&mut data, scope)?;
        let candidates: Vec<SymbolId> = data
            .found
            .map(|f| f.ids())
            .unwrap_or_default()
            .into_iter()
            .filter(|&id| self.is_function_template(id))
            .collect();

        let param_types = self.parameter_types(symbol);
        let mut matched: Vec<(SymbolId, Vec<TypeInfo>)> = Vec::new();
        for template in candidates {
            let Some(deduced) = self.deduce_from_call(template, &param_types, args)? else {
                continue;
            };
            let Ok(normalized) = self.normalize_arguments(template, &deduced) else {
                continue;
            };
            if self.specializes_exactly(template, &normalized, &param_types)? {
                matched.push((template, normalized));
            }
        }

        let mut best: Option<(SymbolId, Vec<TypeInfo>)> = None;
        let mut best_is_best = true;
        for (template, normalized) in matched {
            let Some(incumbent) = best.as_ref().map(|(id, _)| *id) else {
                best = Some((template, normalized));
                continue;
            };
            match self.order_template_functions(incumbent, template)? {
                Ordering::Less => {}
                Ordering::Greater => {
                    best = Some((template, normalized));
                    best_is_best = true;
                }
                Ordering::Equal => best_is_best = false,
            }
        }
        if !best_is_best {
            return Err(SymbolTableError::ambiguous(name));
        }
        let Some((template, normalized)) = best else {
            return Err(SymbolTableError::bad_template(
                name,
                "no function template matches the explicit specialization",
            ));
        };
        self.add_explicit_specialization(template, normalized, symbol)?;
        debug!(template = %template, symbol = %symbol, "explicit specialization");
        Ok(template)
    }

    /// Whether substituting `args` into the function template gives exactly
    /// the parameter list `param_types`.
    fn specializes_exactly(
        &mut self,
        template: SymbolId,
        args: &[TypeInfo],
        param_types: &[TypeInfo],
    ) -> Result<bool> {
        let (params, function) = {
            let data = self.symbol(template)?.template();
            (
                data.map(|t| t.params.clone()).unwrap_or_default(),
                data.and_then(|t| t.templated),
            )
        };
        let Some(function) = function else {
            return Ok(false);
        };
        let map: ArgumentMap = params.into_iter().zip(args.iter().cloned()).collect();
        let ctx = Substitution::lazy(map);
        let declared = self.parameter_types(function);
        if declared.len() != param_types.len() {
            return Ok(false);
        }
        for (d, p) in declared.iter().zip(param_types) {
            let substituted = self.subst_type(d, &ctx)?;
            if !self.types_equal(&self.adjusted_parameter(&substituted), &self.adjusted_parameter(p)) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
