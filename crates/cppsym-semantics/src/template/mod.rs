//! Template engine.
//!
//! This module handles everything between a template declaration and the
//! concrete declarations its uses produce:
//!
//! - **Validation** (`validation`): arguments against parameters, defaults
//!   filled in from earlier arguments.
//! - **Deduction** (`deduction`): template arguments from a partial
//!   specialization's pattern or from call arguments.
//! - **Ordering** (`ordering`): which of two partial specializations or
//!   function templates is more specialized.
//! - **Selection** (`select`): primary, partial or explicit specialization.
//! - **Substitution** (`substitution`): template parameters replaced in
//!   types, deferred instances for dependent template-ids.
//! - **Instantiation** (`instantiation`): cached copies of templated
//!   declarations.
//! - **Factory** (`factory`): declarations under `template<...>` headers.

mod deduction;
mod factory;
mod instantiation;
mod ordering;
mod select;
mod substitution;
mod validation;

pub use factory::TemplateFactory;

use cppsym_core::{Result, SymbolId, SymbolTableError, TypeInfo, TypeKind};
use tracing::trace;

use crate::lookup::{LookupData, TypeFilter};
use crate::table::SymbolTable;

impl SymbolTable {
    /// Inside a class template, its bare name means the template applied to
    /// its own parameters: `A` within `template<class T> class A` is
    /// `A<T>`, and within an instance it is that instance.
    pub(crate) fn within_template_scope(&mut self, scope: SymbolId, found: SymbolId) -> Result<SymbolId> {
        let template = {
            let sym = self.symbol(found)?;
            if sym.is(TypeKind::Template) {
                found
            } else {
                match sym.containing {
                    Some(c) if self.get(c).and_then(|t| t.template()).and_then(|t| t.templated) == Some(found) => c,
                    _ => return Ok(found),
                }
            }
        };
        if self.is_function_template(template) {
            return Ok(found);
        }

        let primary = self
            .symbol(template)?
            .template()
            .and_then(|t| t.specialization_of)
            .unwrap_or(template);
        let mut current = Some(scope);
        while let Some(id) = current {
            let sym = self.symbol(id)?;
            if sym.instance.as_ref().is_some_and(|i| i.template == primary) {
                trace!(scope = %scope, instance = %id, "template name inside its instance");
                return Ok(id);
            }
            current = sym.containing;
        }

        if !self.is_within(scope, template) {
            return Ok(found);
        }
        let params = self.symbol(template)?.params().to_vec();
        let args = params.into_iter().map(TypeInfo::of_symbol).collect();
        self.deferred_instance(template, args)
    }

    /// `name<args>` from `scope`: the instance of the class template named
    /// `name`, or a deferred instance when the arguments are dependent.
    pub fn lookup_template_id(
        &mut self,
        scope: SymbolId,
        name: &str,
        args: &[TypeInfo],
    ) -> Result<Option<SymbolId>> {
        let mut data = LookupData::new(name, TypeFilter::any(), scope);
        self.lookup_scope(&mut data, scope)?;
        let Some(found) = self.resolve_ambiguities(&data)? else {
            return Ok(None);
        };
        let template = self.template_named_by(found)?;
        self.instantiate(template, args).map(Some)
    }

    /// `name<template_args>(fn_args)` from `scope`: overload resolution
    /// restricted to the function templates named `name`, with the explicit
    /// arguments fixing their leading parameters.
    pub fn lookup_function_template_id(
        &mut self,
        scope: SymbolId,
        name: &str,
        fn_args: &[TypeInfo],
        template_args: &[TypeInfo],
    ) -> Result<Option<SymbolId>> {
        let mut data = LookupData::new(name, TypeFilter::of(TypeKind::Function), scope).with_args(fn_args);
        data.template_args = Some(template_args.to_vec());
        data.associated = self.associated_scopes(fn_args);
        self.lookup_scope(&mut data, scope)?;
        self.lookup_associated(&mut data)?;
        self.resolve_ambiguities(&data)
    }

    /// The template a found name stands for: the template itself, the
    /// template declaring a templated class, the template an instance was
    /// made from, or a template template parameter.
    fn template_named_by(&self, found: SymbolId) -> Result<SymbolId> {
        let sym = self.symbol(found)?;
        if sym.is(TypeKind::Template) || sym.type_info.template_param_kind == Some(TypeKind::Template) {
            return Ok(found);
        }
        if let Some(instance) = &sym.instance {
            return Ok(instance.template);
        }
        if let Some(c) = sym.containing
            && self.get(c).and_then(|t| t.template()).and_then(|t| t.templated) == Some(found)
        {
            return Ok(c);
        }
        Err(SymbolTableError::bad_template(sym.name.clone(), "not a template"))
    }

    /// Register the partial specialization `spec` (a template whose pattern
    /// is already set) with `primary`.
    pub fn add_specialization(&mut self, primary: SymbolId, spec: SymbolId) -> Result<()> {
        let name = self.name(primary).to_string();
        if !self.config.is_cpp() {
            return Err(SymbolTableError::bad_template(name, "templates require C++"));
        }
        if self.kind_of(primary) != TypeKind::Template {
            return Err(SymbolTableError::bad_template(name, "not a template"));
        }
        let has_pattern = self
            .symbol(spec)?
            .template()
            .is_some_and(|t| !t.pattern.is_empty());
        if !has_pattern {
            return Err(SymbolTableError::bad_template(name, "specialization without arguments"));
        }
        self.registry.add_specialization(primary, spec)
    }

    /// Register `symbol` as the explicit specialization of `template` for
    /// `args`. Later lookups of `template<args>` return `symbol`.
    pub fn add_explicit_specialization(
        &mut self,
        template: SymbolId,
        args: Vec<TypeInfo>,
        symbol: SymbolId,
    ) -> Result<()> {
        if self.symbol(template)?.template().is_none() {
            return Err(SymbolTableError::bad_template(self.name(template), "not a template"));
        }
        self.registry.add_explicit_specialization(template, args, symbol)
    }

    /// Record that the parameters of an out-of-class `definition` stand
    /// for the parameters of `template`, pairwise.
    pub(crate) fn add_definition_parameters(
        &mut self,
        template: SymbolId,
        definition: SymbolId,
        pairs: Vec<(SymbolId, SymbolId)>,
    ) -> Result<()> {
        self.registry.modify(template, |t| {
            if let Some(data) = t.template_mut() {
                data.definition_params.insert(definition, pairs);
            }
        })
    }

    /// A builder for a declaration under `template<...>` headers in
    /// `containing`.
    pub fn new_template_factory(&self, containing: SymbolId) -> TemplateFactory {
        TemplateFactory::new(containing)
    }
}
