//! Overload resolution for function calls.
//!
//! This module selects the function a call refers to from the candidates
//! that lookup produced.
//!
//! ## Algorithm
//!
//! 1. Replace function templates with instances deduced from the call
//! 2. Drop candidates whose arity cannot match the arguments
//! 3. Rank the conversion of every argument for every remaining candidate
//! 4. Keep the candidate no worse on any argument and better on at least one
//! 5. Break remaining ties in favour of non-templates, then by partial
//!    ordering of the templates
//!
//! A call that no candidate accepts resolves to `Ok(None)`. Candidates that
//! cannot be told apart are [`SymbolTableError::Ambiguous`].

mod ranking;
mod viable;

use cppsym_core::{Result, SymbolId, SymbolTableError, TypeInfo};
use tracing::{debug, trace};

use crate::lookup::LookupData;
use crate::table::SymbolTable;

impl SymbolTable {
    /// Pick the function among `candidates` that best matches the call
    /// described by `data`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn resolve_function(
        &mut self,
        data: &LookupData,
        candidates: Vec<SymbolId>,
    ) -> Result<Option<SymbolId>> {
        let args = call_arguments(data.args.as_deref().unwrap_or(&[]));

        let mut functions: Vec<SymbolId> = Vec::with_capacity(candidates.len());
        let mut templates: Vec<SymbolId> = Vec::new();
        for id in candidates {
            let id = self.resolve_forward(id);
            if functions.contains(&id) || templates.contains(&id) {
                continue;
            }
            if self.is_function_template(id) {
                templates.push(id);
            } else if data.template_args.is_none() {
                functions.push(id);
            }
        }
        if !templates.is_empty() {
            let instances =
                self.select_template_functions(&templates, &args, data.template_args.as_deref())?;
            for instance in instances {
                if !functions.contains(&instance) {
                    functions.push(instance);
                }
            }
        }

        let viable = self.reduce_to_viable(&args, functions);
        trace!(name = %data.name, viable = viable.len(), args = args.len(), "overload candidates");
        if viable.is_empty() {
            return Ok(None);
        }
        if args.is_empty() {
            if let [only] = viable.as_slice() {
                return Ok(Some(*only));
            }
            return self.resolve_without_arguments(data, &viable).map(Some);
        }

        let matches = self.rank_candidates(data, &args, &viable)?;
        let best = self.find_best_match(data, matches)?;
        if let Some(best) = best {
            debug!(name = %data.name, function = %best, "resolved overload");
        }
        Ok(best)
    }

    /// With no arguments every viable candidate ranks the same: a single
    /// non-variadic, non-template function wins.
    fn resolve_without_arguments(&self, data: &LookupData, viable: &[SymbolId]) -> Result<SymbolId> {
        let plain: Vec<SymbolId> = viable
            .iter()
            .copied()
            .filter(|&f| {
                self.get(f).is_some_and(|s| {
                    s.instance.is_none() && !s.function().is_some_and(|d| d.has_var_args)
                })
            })
            .collect();
        match plain.as_slice() {
            [only] => Ok(*only),
            _ => Err(SymbolTableError::ambiguous(data.name.clone())),
        }
    }
}

/// `f(void)` style argument lists are empty.
fn call_arguments(args: &[TypeInfo]) -> Vec<TypeInfo> {
    match args {
        [only] if only.is_plain_void() => Vec::new(),
        _ => args.to_vec(),
    }
}
