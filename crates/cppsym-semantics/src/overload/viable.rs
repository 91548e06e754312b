//! Viability filtering by arity.

use cppsym_core::{SymbolId, TypeInfo};

use crate::table::SymbolTable;

impl SymbolTable {
    /// Keep the candidates that can take `args`: exactly as many parameters,
    /// surplus parameters that all have defaults, or an ellipsis absorbing
    /// the surplus arguments.
    pub(crate) fn reduce_to_viable(&self, args: &[TypeInfo], candidates: Vec<SymbolId>) -> Vec<SymbolId> {
        candidates
            .into_iter()
            .filter(|&f| self.accepts_arity(f, args.len()))
            .collect()
    }

    fn accepts_arity(&self, function: SymbolId, arg_count: usize) -> bool {
        let Some(data) = self.get(function).and_then(|s| s.function()) else {
            return false;
        };
        let params = self.parameter_types(function);
        let param_count = match params.as_slice() {
            [only] if only.is_plain_void() => 0,
            _ => params.len(),
        };

        if arg_count == param_count {
            true
        } else if arg_count < param_count {
            params[arg_count..].iter().all(|p| p.has_default || p.default.is_some())
        } else {
            data.has_var_args
        }
    }
}
