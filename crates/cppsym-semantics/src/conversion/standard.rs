//! Standard conversion sequences.

use cppsym_core::{PtrOp, PtrOpKind, Result, SymbolId, TypeFlags, TypeInfo, TypeKind};

use super::cost::{Cost, Rank, qualification_levels};
use crate::table::SymbolTable;

impl SymbolTable {
    /// The best standard conversion sequence from `source` to `target`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn standard_conversion(&self, source: &TypeInfo, target: &TypeInfo) -> Result<Cost> {
        let mut cost = self.lvalue_to_rvalue(source, target);

        if self.types_equal(&cost.source, &cost.target) {
            cost.rank = Rank::Identity;
            return Ok(cost);
        }

        if !self.qualification_conversion(&mut cost) {
            cost.rank = Rank::NoMatch;
            return Ok(cost);
        }
        if self.same_unqualified(&cost.source, &cost.target) {
            cost.rank = Rank::Identity;
            return Ok(cost);
        }

        if self.promotion(&mut cost) {
            return Ok(cost);
        }
        if self.conversion(&mut cost)? {
            return Ok(cost);
        }
        if self.derived_to_base(&mut cost)? {
            return Ok(cost);
        }
        cost.rank = Rank::NoMatch;
        Ok(cost)
    }

    /// Lvalue-to-rvalue, array-to-pointer and function-to-pointer
    /// transformations, plus reference binding on the target side.
    fn lvalue_to_rvalue(&self, source: &TypeInfo, target: &TypeInfo) -> Cost {
        let mut s = self.flatten(source);
        let mut t = self.flatten(target);

        if s.is_reference() {
            s.ptr_ops.remove(0);
        }
        let target_had_reference = t.is_reference();
        if target_had_reference {
            t.ptr_ops.remove(0);
        }

        if let Some(first) = s.ptr_ops.first_mut()
            && first.kind == PtrOpKind::Array
        {
            first.kind = PtrOpKind::Pointer;
        }
        if let Some(first) = t.ptr_ops.first_mut()
            && first.kind == PtrOpKind::Array
        {
            first.kind = PtrOpKind::Pointer;
        }
        if s.ptr_ops.is_empty() && self.names_function(&s) && !target_had_reference {
            s.ptr_ops.push(PtrOp::pointer());
        }

        if !target_had_reference {
            strip_top_level_cv(&mut s);
            strip_top_level_cv(&mut t);
        }

        let mut cost = Cost::new(s, t);
        cost.target_had_reference = target_had_reference;
        cost
    }

    fn names_function(&self, info: &TypeInfo) -> bool {
        info.kind == TypeKind::Type
            && info
                .type_symbol
                .is_some_and(|s| self.kind_of(s) == TypeKind::Function)
    }

    /// Check cv-qualification level by level. Returns `false` when
    /// qualifiers would be lost, or added below a level that is not const.
    /// Types of different shape are left for the later conversions.
    fn qualification_conversion(&self, cost: &mut Cost) -> bool {
        let s_ops = &cost.source.ptr_ops;
        let t_ops = &cost.target.ptr_ops;
        if s_ops.len() != t_ops.len() || s_ops.iter().zip(t_ops).any(|(a, b)| a.kind != b.kind) {
            return true;
        }

        let source = qualification_levels(&cost.source);
        let target = qualification_levels(&cost.target);
        let mut const_in_every = true;
        let mut added = false;
        for (level, (s, t)) in source.iter().zip(&target).enumerate() {
            if !t.contains(*s) {
                return false;
            }
            if s != t {
                if level > 0 && !const_in_every {
                    return false;
                }
                added = true;
            }
            if level > 0 {
                const_in_every &= t.contains(TypeFlags::CONST);
            }
        }
        if added {
            cost.qualification = 1;
        }
        true
    }

    /// Same type once cv-qualifiers are ignored.
    fn same_unqualified(&self, a: &TypeInfo, b: &TypeInfo) -> bool {
        let strip = |info: &TypeInfo| {
            let mut info = info.clone();
            info.flags.remove(TypeFlags::CV);
            for op in &mut info.ptr_ops {
                op.is_const = false;
                op.is_volatile = false;
            }
            info
        };
        self.types_equal(&strip(a), &strip(b))
    }

    /// Integral promotion to `int`, floating promotion to `double`.
    fn promotion(&self, cost: &mut Cost) -> bool {
        let s = &cost.source;
        let t = &cost.target;
        if s.has_ptr_ops() || t.has_ptr_ops() {
            return false;
        }
        let plain_int = t.kind == TypeKind::Int && (t.flags & TypeFlags::INTEGRAL_MODIFIERS).is_empty();
        let plain_double = t.kind == TypeKind::Double && !t.flags.contains(TypeFlags::LONG);

        let promotes = match s.kind {
            TypeKind::Bool | TypeKind::CBool | TypeKind::Char | TypeKind::WChar => plain_int,
            TypeKind::Int => {
                plain_int
                    && s.flags.contains(TypeFlags::SHORT)
                    && !s.flags.contains(TypeFlags::UNSIGNED)
            }
            TypeKind::Float => plain_double,
            TypeKind::Type => plain_int && self.is_enumeration(s),
            _ => false,
        };
        if promotes {
            cost.promotion = 1;
            cost.rank = Rank::Promotion;
        }
        promotes
    }

    /// Pointer conversions, member pointer conversions and arithmetic
    /// conversions.
    fn conversion(&self, cost: &mut Cost) -> Result<bool> {
        let s = cost.source.clone();
        let t = cost.target.clone();

        if s.ptr_ops.is_empty() && t.ptr_ops.is_empty() {
            let arithmetic_source = s.kind.is_arithmetic() || self.is_enumeration(&s);
            if arithmetic_source && t.kind.is_arithmetic() {
                cost.conversion = 1;
                cost.rank = Rank::Conversion;
                return Ok(true);
            }
            return Ok(false);
        }

        // Pointer to bool.
        if t.ptr_ops.is_empty()
            && matches!(t.kind, TypeKind::Bool | TypeKind::CBool)
            && matches!(s.ptr_ops.first().map(|op| op.kind), Some(PtrOpKind::Pointer | PtrOpKind::MemberPointer))
        {
            cost.conversion = 1;
            cost.rank = Rank::Conversion;
            return Ok(true);
        }

        if s.ptr_ops.len() != 1 || t.ptr_ops.len() != 1 {
            return Ok(false);
        }
        let (s_op, t_op) = (s.ptr_ops[0], t.ptr_ops[0]);
        if !t.flags.contains(s.cv_flags()) {
            return Ok(false);
        }

        match (s_op.kind, t_op.kind) {
            (PtrOpKind::Pointer, PtrOpKind::Pointer) => {
                if t.kind == TypeKind::Void && !self.names_function(&s) {
                    cost.conversion = 1;
                    cost.detail = 2;
                    cost.rank = Rank::Conversion;
                    return Ok(true);
                }
                if let (Some(derived), Some(base)) = (self.class_of(&s), self.class_of(&t))
                    && let Some(distance) = self.has_base_class(derived, base, true)?
                    && distance > 0
                {
                    cost.conversion = distance;
                    cost.detail = 1;
                    cost.rank = Rank::Conversion;
                    return Ok(true);
                }
                Ok(false)
            }
            (PtrOpKind::MemberPointer, PtrOpKind::MemberPointer) => {
                // T B::* converts to T D::* for D derived from B.
                let (Some(base), Some(derived)) = (s_op.member_of, t_op.member_of) else {
                    return Ok(false);
                };
                let mut s_plain = s.clone();
                let mut t_plain = t.clone();
                s_plain.ptr_ops.clear();
                t_plain.ptr_ops.clear();
                if !self.same_unqualified(&s_plain, &t_plain) {
                    return Ok(false);
                }
                match self.has_base_class(derived, base, true)? {
                    Some(distance) if distance > 0 => {
                        cost.conversion = distance;
                        cost.detail = 1;
                        cost.rank = Rank::Conversion;
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }

    /// A class object or reference converted to one of its public bases.
    fn derived_to_base(&self, cost: &mut Cost) -> Result<bool> {
        if cost.source.has_ptr_ops() || cost.target.has_ptr_ops() {
            return Ok(false);
        }
        if !cost.target.flags.contains(cost.source.cv_flags()) {
            return Ok(false);
        }
        let (Some(derived), Some(base)) = (self.class_of(&cost.source), self.class_of(&cost.target)) else {
            return Ok(false);
        };
        match self.has_base_class(derived, base, true)? {
            Some(distance) if distance > 0 => {
                cost.conversion = distance;
                cost.rank = Rank::DerivedToBase;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// The class named by a flattened type.
    pub(crate) fn class_of(&self, info: &TypeInfo) -> Option<SymbolId> {
        let id = info.type_symbol.filter(|_| info.kind == TypeKind::Type)?;
        let id = self.resolve_forward(id);
        self.kind_of(id).is_class_like().then_some(id)
    }

    fn is_enumeration(&self, info: &TypeInfo) -> bool {
        info.kind == TypeKind::Type
            && info
                .type_symbol
                .is_some_and(|s| self.kind_of(s) == TypeKind::Enumeration)
    }
}

fn strip_top_level_cv(info: &mut TypeInfo) {
    match info.ptr_ops.first_mut() {
        Some(op) => {
            op.is_const = false;
            op.is_volatile = false;
        }
        None => info.flags.remove(TypeFlags::CV),
    }
}
