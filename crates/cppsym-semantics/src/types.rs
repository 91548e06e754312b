//! Type identity and canonical forms.
//!
//! Types are compared after [`SymbolTable::flatten`] has collapsed typedef
//! chains and applied argument operator expressions. Two flattened types
//! are equal when their kinds, relevant flags, operator chains and literals
//! match and their named symbols are equivalent (see
//! [`SymbolTable::symbols_equivalent`]).

use cppsym_core::{
    OperatorExpression, PtrOp, PtrOpKind, SymbolId, TypeFlags, TypeInfo, TypeKind,
};
use rustc_hash::FxHashSet;

use crate::table::SymbolTable;

impl SymbolTable {
    /// Follow forward declarations to their definitions.
    pub fn resolve_forward(&self, id: SymbolId) -> SymbolId {
        let mut current = id;
        let mut hops = 0;
        while let Some(sym) = self.get(current) {
            match sym.definition {
                Some(def) if sym.is_forward && def != current && hops < 64 => {
                    current = def;
                    hops += 1;
                }
                _ => break,
            }
        }
        current
    }

    /// Semantic equality of two flattened types.
    pub fn types_equal(&self, a: &TypeInfo, b: &TypeInfo) -> bool {
        if a.kind != b.kind || a.relevant_flags() != b.relevant_flags() || a.literal != b.literal {
            return false;
        }
        if a.ptr_ops.len() != b.ptr_ops.len() {
            return false;
        }
        let ops_equal = a.ptr_ops.iter().zip(&b.ptr_ops).all(|(x, y)| {
            x.kind == y.kind
                && x.is_const == y.is_const
                && x.is_volatile == y.is_volatile
                && match (x.member_of, y.member_of) {
                    (Some(m), Some(n)) => self.symbols_equivalent(m, n),
                    (None, None) => true,
                    _ => false,
                }
        });
        if !ops_equal {
            return false;
        }
        match (a.type_symbol, b.type_symbol) {
            (Some(x), Some(y)) => self.symbols_equivalent(x, y),
            (None, None) => true,
            _ => false,
        }
    }

    /// Whether two type symbols denote the same type.
    ///
    /// Template parameters are equivalent when they sit at the same position
    /// of their template and have the same parameter kind, which is what
    /// makes `template<class T> void f(T)` redeclarable as
    /// `template<class U> void f(U)`.
    pub fn symbols_equivalent(&self, a: SymbolId, b: SymbolId) -> bool {
        let a = self.resolve_forward(a);
        let b = self.resolve_forward(b);
        if a == b {
            return true;
        }
        let (Some(sa), Some(sb)) = (self.get(a), self.get(b)) else {
            return false;
        };

        if sa.is(TypeKind::TemplateParameter) && sb.is(TypeKind::TemplateParameter) {
            return sa.type_info.template_param_kind == sb.type_info.template_param_kind
                && self.parameter_index(a).is_some()
                && self.parameter_index(a) == self.parameter_index(b);
        }

        if let (Some((ta, args_a)), Some((tb, args_b))) = (sa.deferred(), sb.deferred()) {
            return self.symbols_equivalent(ta, tb)
                && args_a.len() == args_b.len()
                && args_a
                    .iter()
                    .zip(args_b)
                    .all(|(x, y)| self.types_equal(&self.flatten(x), &self.flatten(y)));
        }

        if sa.is(TypeKind::Function) && sb.is(TypeKind::Function) && sa.name.is_empty() && sb.name.is_empty() {
            let returns_match = match (
                sa.function().and_then(|f| f.return_type.as_ref()),
                sb.function().and_then(|f| f.return_type.as_ref()),
            ) {
                (Some(x), Some(y)) => self.types_equal(&self.flatten(x), &self.flatten(y)),
                (None, None) => true,
                _ => false,
            };
            return returns_match && self.has_same_parameters(a, b);
        }

        false
    }

    /// Position of a template parameter in its template's parameter list.
    pub(crate) fn parameter_index(&self, param: SymbolId) -> Option<usize> {
        let owner = self.containing(param)?;
        self.get(owner)?.params().iter().position(|&p| p == param)
    }

    // ==========================================================================
    // Flattening
    // ==========================================================================

    /// Canonical form of `info`: typedef chains collapsed, the bound object's
    /// declared type substituted, operator expressions applied.
    ///
    /// The result either names a terminal type symbol (class, enumeration,
    /// function, template parameter, template or deferred instance) through
    /// `Type`, or is a builtin kind with no symbol.
    pub fn flatten(&self, info: &TypeInfo) -> TypeInfo {
        let mut result = self.flatten_chain(info);
        for op in &info.operator_exprs {
            match op {
                OperatorExpression::AddressOf => {
                    if result.is_reference() {
                        result.ptr_ops.remove(0);
                    }
                    result.ptr_ops.insert(0, PtrOp::pointer());
                }
                OperatorExpression::Indirection | OperatorExpression::Subscript => {
                    if result.is_reference() {
                        result.ptr_ops.remove(0);
                    }
                    if !result.ptr_ops.is_empty() {
                        result.ptr_ops.remove(0);
                    }
                }
            }
        }
        result.operator_exprs.clear();
        result
    }

    fn flatten_chain(&self, top: &TypeInfo) -> TypeInfo {
        let Some(first) = top.type_symbol.filter(|_| top.kind == TypeKind::Type) else {
            let mut copy = top.clone();
            copy.operator_exprs.clear();
            return copy;
        };

        let mut ops = top.ptr_ops.clone();
        let mut pending = top.cv_flags();
        let mut current = first;
        let mut seen = FxHashSet::default();

        loop {
            let id = self.resolve_forward(current);
            let Some(sym) = self.get(id) else {
                return named(id, pending, ops);
            };
            if !seen.insert(id) || is_terminal_type(sym) {
                return named(id, pending, ops);
            }
            if sym.is(TypeKind::Enumerator) {
                return match sym.type_info.type_symbol {
                    Some(enumeration) => named(enumeration, pending, ops),
                    None => builtin(TypeKind::Int, pending, ops),
                };
            }

            let level = &sym.type_info;
            if !level.ptr_ops.is_empty() {
                let first_of_level = ops.len();
                ops.extend(level.ptr_ops.iter().copied());
                let op = &mut ops[first_of_level];
                op.is_const |= pending.contains(TypeFlags::CONST);
                op.is_volatile |= pending.contains(TypeFlags::VOLATILE);
                pending = TypeFlags::empty();
            }
            pending |= level.cv_flags();

            match level.type_symbol {
                Some(next) if level.kind == TypeKind::Type => current = next,
                _ => {
                    let mut result = builtin(level.kind, level.relevant_flags() | pending, ops);
                    result.type_symbol = level.type_symbol;
                    return result;
                }
            }
        }
    }

    // ==========================================================================
    // Parameters
    // ==========================================================================

    /// Declared parameter types of a function, with `(void)` as no parameters.
    pub(crate) fn parameter_types(&self, function: SymbolId) -> Vec<TypeInfo> {
        let Some(sym) = self.get(function) else {
            return Vec::new();
        };
        let types: Vec<TypeInfo> = sym
            .params()
            .iter()
            .filter_map(|&p| self.get(p).map(|s| s.type_info.clone()))
            .collect();
        if types.len() == 1 && types[0].is_plain_void() {
            return Vec::new();
        }
        types
    }

    /// The form of a parameter type that decides redeclaration: arrays and
    /// functions decay to pointers and top-level cv is dropped.
    pub(crate) fn adjusted_parameter(&self, info: &TypeInfo) -> TypeInfo {
        let mut t = self.flatten(info);
        if let Some(first) = t.ptr_ops.first_mut()
            && first.kind == PtrOpKind::Array
        {
            first.kind = PtrOpKind::Pointer;
        }
        if t.ptr_ops.is_empty()
            && t.type_symbol
                .and_then(|s| self.get(s))
                .is_some_and(|s| s.is(TypeKind::Function))
        {
            t.ptr_ops.push(PtrOp::pointer());
        }
        match t.ptr_ops.first_mut() {
            Some(op) if op.kind != PtrOpKind::Reference => {
                op.is_const = false;
                op.is_volatile = false;
            }
            Some(_) => {}
            None => t.flags.remove(TypeFlags::CV),
        }
        t
    }

    /// Whether two functions declare the same parameter list.
    pub fn has_same_parameters(&self, f1: SymbolId, f2: SymbolId) -> bool {
        let var_args = |f: SymbolId| {
            self.get(f)
                .and_then(|s| s.function())
                .is_some_and(|d| d.has_var_args)
        };
        if var_args(f1) != var_args(f2) {
            return false;
        }
        let p1 = self.parameter_types(f1);
        let p2 = self.parameter_types(f2);
        p1.len() == p2.len()
            && p1.iter().zip(&p2).all(|(a, b)| {
                self.types_equal(&self.adjusted_parameter(a), &self.adjusted_parameter(b))
            })
    }

    // ==========================================================================
    // Dependence
    // ==========================================================================

    /// Whether `info` mentions a template parameter or a deferred instance.
    pub fn is_dependent(&self, info: &TypeInfo) -> bool {
        self.is_dependent_guarded(info, &mut FxHashSet::default())
    }

    fn is_dependent_guarded(&self, info: &TypeInfo, seen: &mut FxHashSet<SymbolId>) -> bool {
        if info.kind == TypeKind::TypeName {
            return true;
        }
        let member_dependent = info.ptr_ops.iter().any(|op| {
            op.member_of
                .and_then(|m| self.get(m))
                .is_some_and(|s| s.is(TypeKind::TemplateParameter) || s.is_deferred_instance())
        });
        if member_dependent {
            return true;
        }
        let Some(id) = info.type_symbol else {
            return false;
        };
        if !seen.insert(id) {
            return false;
        }
        let Some(sym) = self.get(id) else {
            return false;
        };
        if sym.is(TypeKind::TemplateParameter) || sym.is_deferred_instance() {
            return true;
        }
        if sym.is(TypeKind::Function) {
            let ret = sym.function().and_then(|f| f.return_type.clone());
            if ret.is_some_and(|r| self.is_dependent_guarded(&r, seen)) {
                return true;
            }
            let params: Vec<TypeInfo> = sym
                .params()
                .iter()
                .filter_map(|&p| self.get(p).map(|s| s.type_info.clone()))
                .collect();
            return params.iter().any(|p| self.is_dependent_guarded(p, seen));
        }
        if sym.is(TypeKind::Type) {
            let next = sym.type_info.clone();
            return self.is_dependent_guarded(&next, seen);
        }
        false
    }

    // ==========================================================================
    // Names
    // ==========================================================================

    /// Spelling of a type as it appears in a conversion-function name,
    /// e.g. `"operator " + type_name(int*)` is `"operator int*"`.
    pub fn type_name(&self, info: &TypeInfo) -> String {
        let mut out = String::new();
        if info.flags.contains(TypeFlags::CONST) {
            out.push_str("const ");
        }
        if info.flags.contains(TypeFlags::VOLATILE) {
            out.push_str("volatile ");
        }
        if info.flags.contains(TypeFlags::UNSIGNED) {
            out.push_str("unsigned ");
        }
        if info.flags.contains(TypeFlags::SHORT) {
            out.push_str("short ");
        }
        if info.flags.contains(TypeFlags::LONG_LONG) {
            out.push_str("long long ");
        } else if info.flags.contains(TypeFlags::LONG) {
            out.push_str("long ");
        }
        match info.type_symbol.and_then(|s| self.get(s)) {
            Some(sym) if info.kind == TypeKind::Type => out.push_str(&sym.name),
            _ => out.push_str(info.kind.keyword()),
        }
        for op in info.ptr_ops.iter().rev() {
            match op.kind {
                PtrOpKind::Pointer | PtrOpKind::MemberPointer => out.push('*'),
                PtrOpKind::Reference => out.push('&'),
                PtrOpKind::Array => out.push_str("[]"),
                PtrOpKind::Undef => {}
            }
            if op.is_const {
                out.push_str(" const");
            }
        }
        out
    }
}

fn is_terminal_type(sym: &cppsym_core::Symbol) -> bool {
    let kind = sym.kind();
    kind.is_elaborated()
        || kind.is_function_like()
        || matches!(
            kind,
            TypeKind::TemplateParameter | TypeKind::Template | TypeKind::Namespace
        )
        || sym.is_deferred_instance()
}

fn named(id: SymbolId, cv: TypeFlags, ops: Vec<PtrOp>) -> TypeInfo {
    let mut info = TypeInfo::of_symbol(id).with_flags(cv);
    info.ptr_ops = ops;
    info
}

fn builtin(kind: TypeKind, flags: TypeFlags, ops: Vec<PtrOp>) -> TypeInfo {
    let mut info = TypeInfo::new(kind).with_flags(flags);
    info.ptr_ops = ops;
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typedef_chain_collapses() {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        let a = table.new_class("A", TypeKind::Class).unwrap();
        table.add_symbol(root, a).unwrap();
        let b = table.new_typedef("B", TypeInfo::of_symbol(a));
        table.add_symbol(root, b).unwrap();
        let c = table.new_typedef("C", TypeInfo::of_symbol(b).with_ptr(PtrOp::pointer()));
        table.add_symbol(root, c).unwrap();

        let flat = table.flatten(&TypeInfo::of_symbol(c).with_flags(TypeFlags::CONST));
        assert_eq!(flat.type_symbol, Some(a));
        assert_eq!(flat.ptr_ops.len(), 1);
        assert!(flat.ptr_ops[0].is_const, "const applies to the pointer of C");
        assert!(!flat.is_const());
    }

    #[test]
    fn object_flattens_to_declared_builtin() {
        let mut table = SymbolTable::cpp();
        let x = table.new_symbol_with(
            "x",
            TypeInfo::new(TypeKind::Int).with_flags(TypeFlags::STATIC | TypeFlags::UNSIGNED),
        );
        let flat = table.flatten(&TypeInfo::of_symbol(x));
        assert_eq!(flat.kind, TypeKind::Int);
        assert_eq!(flat.flags, TypeFlags::UNSIGNED);
    }

    #[test]
    fn address_of_and_indirection() {
        let mut table = SymbolTable::cpp();
        let i = table.new_symbol("i", TypeKind::Int);
        let addr = table.flatten(&TypeInfo::of_symbol(i).with_operator(OperatorExpression::AddressOf));
        assert_eq!(addr.ptr_ops, vec![PtrOp::pointer()]);

        let p = table.new_symbol_with("p", TypeInfo::new(TypeKind::Int).with_ptr(PtrOp::pointer()));
        let deref = table.flatten(&TypeInfo::of_symbol(p).with_operator(OperatorExpression::Indirection));
        assert!(deref.ptr_ops.is_empty());
    }

    #[test]
    fn template_parameters_equivalent_by_position() {
        let mut table = SymbolTable::cpp();
        let t1 = table.new_template("f");
        let t2 = table.new_template("f");
        let a = table.new_template_parameter("T", TypeKind::TypeName);
        let b = table.new_template_parameter("U", TypeKind::TypeName);
        table.add_template_parameter(t1, a).unwrap();
        table.add_template_parameter(t2, b).unwrap();
        assert!(table.symbols_equivalent(a, b));

        let n = table.new_template_parameter("N", TypeKind::Int);
        table.add_template_parameter(t2, n).unwrap();
        assert!(!table.symbols_equivalent(a, n));
    }

    #[test]
    fn same_parameters_ignore_top_level_const_and_decay() {
        let mut table = SymbolTable::cpp();
        let f1 = table.new_function("f");
        let f2 = table.new_function("f");
        table
            .add_parameter_type(f1, TypeInfo::new(TypeKind::Char).with_ptr(PtrOp::array()))
            .unwrap();
        table
            .add_parameter_type(f2, TypeInfo::new(TypeKind::Char).with_ptr(PtrOp::pointer().with_const()))
            .unwrap();
        assert!(table.has_same_parameters(f1, f2));

        let f3 = table.new_function("f");
        table
            .add_parameter_type(
                f3,
                TypeInfo::new(TypeKind::Char)
                    .with_flags(TypeFlags::CONST)
                    .with_ptr(PtrOp::pointer()),
            )
            .unwrap();
        assert!(!table.has_same_parameters(f1, f3));
    }

    #[test]
    fn dependence() {
        let mut table = SymbolTable::cpp();
        let t = table.new_template_parameter("T", TypeKind::TypeName);
        assert!(table.is_dependent(&TypeInfo::of_symbol(t).with_ptr(PtrOp::pointer())));
        assert!(!table.is_dependent(&TypeInfo::new(TypeKind::Int)));
    }

    #[test]
    fn conversion_function_spelling() {
        let mut table = SymbolTable::cpp();
        let a = table.new_class("A", TypeKind::Class).unwrap();
        assert_eq!(table.type_name(&TypeInfo::of_symbol(a)), "A");
        let p = TypeInfo::new(TypeKind::Char)
            .with_flags(TypeFlags::UNSIGNED)
            .with_ptr(PtrOp::pointer());
        assert_eq!(table.type_name(&p), "unsigned char*");
    }
}
