//! Template argument checking.
//!
//! Arguments are checked against their parameters before any instance is
//! looked up or built: type arguments must be nameable types, non-type
//! arguments must be constants or objects with linkage that convert to the
//! parameter type, and template template arguments must have the same
//! parameter list shape.

use cppsym_core::{PtrOpKind, Result, SymbolId, SymbolTableError, TypeInfo, TypeKind};
use tracing::trace;

use super::substitution::{ArgumentMap, Substitution};
use crate::table::SymbolTable;

impl SymbolTable {
    /// The full argument list for `template`: defaults filled in from the
    /// arguments before them, type arguments flattened, every argument
    /// checked against its parameter.
    pub(crate) fn normalize_arguments(
        &mut self,
        template: SymbolId,
        args: &[TypeInfo],
    ) -> Result<Vec<TypeInfo>> {
        let name = self.name(template).to_string();
        let params = self.symbol(template)?.params().to_vec();
        if args.len() > params.len() {
            return Err(SymbolTableError::bad_argument(
                name,
                format!("{} arguments for {} parameters", args.len(), params.len()),
            ));
        }

        let mut map = ArgumentMap::default();
        let mut normalized = Vec::with_capacity(params.len());
        for (i, &param) in params.iter().enumerate() {
            let param_info = self.symbol(param)?.type_info.clone();
            let arg = match args.get(i) {
                Some(arg) => arg.clone(),
                None => match &param_info.default {
                    Some(default) => self.subst_type(default, &Substitution::lazy(map.clone()))?,
                    None => {
                        return Err(SymbolTableError::bad_argument(
                            name,
                            format!("no argument for parameter '{}'", self.name(param)),
                        ));
                    }
                },
            };
            let arg = match param_info.template_param_kind {
                Some(TypeKind::TypeName) | None => {
                    let mut flat = self.flatten(&arg);
                    flat.default = None;
                    flat.has_default = false;
                    flat
                }
                _ => arg,
            };
            if !self.match_parameter_and_argument(param, &arg)? {
                return Err(SymbolTableError::bad_argument(
                    name,
                    format!("invalid argument for parameter '{}'", self.name(param)),
                ));
            }
            map.insert(param, arg.clone());
            normalized.push(arg);
        }
        Ok(normalized)
    }

    /// Check explicitly given arguments against the leading parameters of
    /// `template` without filling in defaults.
    pub fn verify_explicit_arguments(&self, template: SymbolId, args: &[TypeInfo]) -> Result<()> {
        let name = self.name(template).to_string();
        let params = self.symbol(template)?.params().to_vec();
        if args.len() > params.len() {
            return Err(SymbolTableError::bad_argument(name, "too many template arguments"));
        }
        for (&param, arg) in params.iter().zip(args) {
            if !self.match_parameter_and_argument(param, arg)? {
                return Err(SymbolTableError::bad_argument(
                    name,
                    format!("invalid argument for parameter '{}'", self.name(param)),
                ));
            }
        }
        Ok(())
    }

    /// Whether `arg` can be bound to the template parameter `param`.
    pub(crate) fn match_parameter_and_argument(&self, param: SymbolId, arg: &TypeInfo) -> Result<bool> {
        let param_info = self.symbol(param)?.type_info.clone();
        match param_info.template_param_kind {
            Some(TypeKind::TypeName) | None => Ok(self.is_valid_type_argument(arg)),
            Some(TypeKind::Template) => Ok(self.matches_template_parameter(param, arg)),
            Some(value_kind) => {
                if self.is_dependent(arg) {
                    return Ok(true);
                }
                if !self.is_valid_non_type_argument(&param_info, arg) {
                    return Ok(false);
                }
                let mut value = arg.clone();
                value.literal = None;
                let mut target = TypeInfo::new(value_kind);
                target.flags = param_info.flags;
                target.ptr_ops = param_info.ptr_ops.clone();
                if value_kind == TypeKind::Type {
                    target.type_symbol = param_info.type_symbol;
                }
                let cost = self.standard_conversion(&value, &target)?;
                trace!(param = %param, rank = ?cost.rank, "non-type argument conversion");
                Ok(cost.is_match())
            }
        }
    }

    /// Type arguments may not be unnamed or local classes.
    fn is_valid_type_argument(&self, arg: &TypeInfo) -> bool {
        let flat = self.flatten(arg);
        let Some(id) = flat.type_symbol else {
            return true;
        };
        let Some(sym) = self.get(id) else {
            return false;
        };
        if !sym.kind().is_elaborated() {
            return true;
        }
        !sym.name.is_empty() && !self.is_local(id)
    }

    fn is_valid_non_type_argument(&self, param_info: &TypeInfo, arg: &TypeInfo) -> bool {
        // Integral and enumerator constants.
        if arg.type_symbol.is_none() && !arg.has_ptr_ops() {
            return arg.kind.is_arithmetic() || arg.literal.is_some();
        }
        if arg.type_symbol.is_none() {
            // String literals have no linkage.
            return false;
        }
        let Some(object) = arg.type_symbol.and_then(|s| self.get(s)) else {
            return false;
        };
        if object.is(TypeKind::Enumerator) {
            return true;
        }
        let member_pointer = param_info
            .ptr_ops
            .first()
            .is_some_and(|op| op.kind == PtrOpKind::MemberPointer);
        let in_class = object
            .containing
            .is_some_and(|c| self.kind_of(c).is_class_like());
        if in_class && !object.type_info.is_static() && !member_pointer {
            return false;
        }
        let Some(id) = arg.type_symbol else {
            return false;
        };
        !self.is_local(id)
    }

    /// A template template argument must name a template whose parameter
    /// list has the same length and kinds.
    fn matches_template_parameter(&self, param: SymbolId, arg: &TypeInfo) -> bool {
        let flat = self.flatten(arg);
        let Some(id) = flat.type_symbol else {
            return false;
        };
        let Some(candidate) = self.get(id) else {
            return false;
        };
        let is_template = candidate.is(TypeKind::Template)
            || candidate.type_info.template_param_kind == Some(TypeKind::Template);
        if !is_template {
            return false;
        }
        let expected = self.get(param).map(|p| p.params().to_vec()).unwrap_or_default();
        let given = candidate.params();
        expected.len() == given.len()
            && expected.iter().zip(given).all(|(&e, &g)| {
                let kind = |p: SymbolId| self.get(p).and_then(|s| s.type_info.template_param_kind);
                kind(e) == kind(g)
            })
    }

    /// Declared inside a function body.
    fn is_local(&self, id: SymbolId) -> bool {
        let mut current = self.containing(id);
        while let Some(scope) = current {
            if self.kind_of(scope).is_function_like() {
                return true;
            }
            current = self.containing(scope);
        }
        false
    }
}
