//! Partial ordering of partial specializations and function templates.
//!
//! To compare two templates, unique types are synthesized for the
//! parameters of one and substituted into its pattern (or function
//! parameter list). If the other template can deduce its own parameters
//! from the result, it is at least as general. The template that is more
//! general in only one direction loses.

use std::cmp::Ordering;

use cppsym_core::{PtrOpKind, Result, Symbol, SymbolId, TypeFlags, TypeInfo, TypeKind};
use tracing::trace;

use super::deduction::DeductionMode;
use super::substitution::{ArgumentMap, Substitution};
use crate::table::SymbolTable;

impl SymbolTable {
    /// Order two partial specializations of the same primary. `Less` means
    /// `first` is more specialized.
    pub(crate) fn order_specializations(&mut self, first: SymbolId, second: SymbolId) -> Result<Ordering> {
        let second_is_general = self.specialization_accepts(second, first)?;
        let first_is_general = self.specialization_accepts(first, second)?;
        trace!(first = %first, second = %second, first_is_general, second_is_general, "order specializations");
        Ok(ordering(first_is_general, second_is_general))
    }

    /// Order two function templates. `Less` means `first` is more
    /// specialized.
    pub fn order_template_functions(&mut self, first: SymbolId, second: SymbolId) -> Result<Ordering> {
        let second_is_general = self.function_template_accepts(second, first)?;
        let first_is_general = self.function_template_accepts(first, second)?;
        trace!(first = %first, second = %second, first_is_general, second_is_general, "order function templates");
        Ok(ordering(first_is_general, second_is_general))
    }

    /// Whether `general` matches the pattern of `specific` with unique
    /// types in place of `specific`'s parameters.
    fn specialization_accepts(&mut self, general: SymbolId, specific: SymbolId) -> Result<bool> {
        let ctx = Substitution::lazy(self.synthesize_arguments(specific)?);
        let pattern = self
            .symbol(specific)?
            .template()
            .map(|t| t.pattern.clone())
            .unwrap_or_default();
        let mut synthesized = Vec::with_capacity(pattern.len());
        for p in &pattern {
            synthesized.push(self.subst_type(p, &ctx)?);
        }
        Ok(self.deduce_template_arguments(general, &synthesized).is_some())
    }

    /// Whether `general`'s function parameters deduce from `specific`'s
    /// with unique types in place of `specific`'s template parameters.
    fn function_template_accepts(&mut self, general: SymbolId, specific: SymbolId) -> Result<bool> {
        let (Some(general_fn), Some(specific_fn)) = (self.templated(general), self.templated(specific)) else {
            return Ok(false);
        };
        let ctx = Substitution::lazy(self.synthesize_arguments(specific)?);
        let mut synthesized = Vec::new();
        for p in self.parameter_types(specific_fn) {
            let substituted = self.subst_type(&p, &ctx)?;
            synthesized.push(self.ordering_form(&substituted));
        }
        let declared: Vec<TypeInfo> = self
            .parameter_types(general_fn)
            .iter()
            .map(|p| self.ordering_form(p))
            .collect();
        if declared.len() != synthesized.len() {
            return Ok(false);
        }
        let mut map = ArgumentMap::default();
        Ok(declared
            .iter()
            .zip(&synthesized)
            .all(|(p, a)| self.deduce(p, a, &mut map, DeductionMode::Exact)))
    }

    /// A unique argument for every parameter of `template`.
    fn synthesize_arguments(&mut self, template: SymbolId) -> Result<ArgumentMap> {
        let params = self.symbol(template)?.params().to_vec();
        let mut map = ArgumentMap::default();
        for param in params {
            let (name, kind) = {
                let sym = self.symbol(param)?;
                (sym.name.clone(), sym.type_info.template_param_kind)
            };
            let arg = match kind {
                Some(TypeKind::TypeName) | None => {
                    let unique = self.registry.create(Symbol::new(name, TypeInfo::new(TypeKind::Class)));
                    TypeInfo::of_symbol(unique)
                }
                Some(TypeKind::Template) => TypeInfo::of_symbol(param),
                Some(value) => TypeInfo::new(value),
            };
            map.insert(param, arg);
        }
        Ok(map)
    }

    fn templated(&self, template: SymbolId) -> Option<SymbolId> {
        self.get(template)?.template()?.templated
    }

    /// Parameter types are compared without references and top-level cv.
    fn ordering_form(&self, info: &TypeInfo) -> TypeInfo {
        let mut t = self.adjusted_parameter(info);
        if t.ptr_ops.first().is_some_and(|op| op.kind == PtrOpKind::Reference) {
            t.ptr_ops.remove(0);
            match t.ptr_ops.first_mut() {
                Some(op) => {
                    op.is_const = false;
                    op.is_volatile = false;
                }
                None => t.flags.remove(TypeFlags::CV),
            }
        }
        t
    }
}

fn ordering(first_is_general: bool, second_is_general: bool) -> Ordering {
    match (first_is_general, second_is_general) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
