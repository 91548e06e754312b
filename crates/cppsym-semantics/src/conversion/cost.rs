//! Conversion costs and their ordering.

use std::cmp::Ordering;

use cppsym_core::{SymbolId, TypeFlags, TypeInfo};

/// Category of an implicit conversion sequence, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    /// Identity, lvalue transformations and qualification adjustments.
    Identity,
    Promotion,
    Conversion,
    DerivedToBase,
    UserDefined,
    Ellipsis,
    NoMatch,
}

/// The user-defined step of a conversion sequence, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDefined {
    None,
    /// A converting constructor or conversion function.
    Via(SymbolId),
    /// Both a constructor and a conversion function apply.
    Ambiguous,
}

/// The cost of converting one argument to one parameter type.
///
/// `source` and `target` are the types left after lvalue transformations:
/// references stripped, arrays decayed, top-level cv dropped for by-value
/// targets.
#[derive(Debug, Clone)]
pub struct Cost {
    pub source: TypeInfo,
    pub target: TypeInfo,
    pub rank: Rank,
    pub target_had_reference: bool,
    /// Non-zero when cv-qualifiers were added.
    pub qualification: u32,
    pub promotion: u32,
    /// Inheritance distance for pointer conversions, `1` for the rest.
    pub conversion: u32,
    /// `1` for a pointer to base conversion, `2` for a pointer to `void`.
    pub detail: u32,
    pub user_defined: UserDefined,
}

impl Cost {
    pub fn new(source: TypeInfo, target: TypeInfo) -> Self {
        Self {
            source,
            target,
            rank: Rank::NoMatch,
            target_had_reference: false,
            qualification: 0,
            promotion: 0,
            conversion: 0,
            detail: 0,
            user_defined: UserDefined::None,
        }
    }

    /// An argument matched by `...`.
    pub fn ellipsis(source: TypeInfo) -> Self {
        let mut cost = Self::new(source, TypeInfo::default());
        cost.rank = Rank::Ellipsis;
        cost
    }

    pub fn is_match(&self) -> bool {
        self.rank != Rank::NoMatch
    }

    /// Compare two conversion sequences. `Less` means `self` is the better one.
    ///
    /// Sequences through different user-defined conversions, or through an
    /// ambiguous one, are indistinguishable.
    pub fn compare(&self, other: &Cost) -> Ordering {
        if self.rank != other.rank {
            return self.rank.cmp(&other.rank);
        }

        match (self.user_defined, other.user_defined) {
            (UserDefined::None, UserDefined::None) => {}
            (UserDefined::Via(a), UserDefined::Via(b)) if a == b => {}
            (UserDefined::None, _) => return Ordering::Less,
            (_, UserDefined::None) => return Ordering::Greater,
            _ => return Ordering::Equal,
        }

        let mut result = Ordering::Equal;
        if self.promotion > 0 || other.promotion > 0 {
            result = self.promotion.cmp(&other.promotion);
        }
        if self.conversion > 0 || other.conversion > 0 {
            result = if self.detail == other.detail {
                self.conversion.cmp(&other.conversion)
            } else {
                self.detail.cmp(&other.detail)
            };
        }
        if result != Ordering::Equal {
            return result;
        }

        if self.qualification != other.qualification {
            return self.qualification.cmp(&other.qualification);
        }
        if self.qualification == 0 {
            return Ordering::Equal;
        }
        self.compare_qualifications(other)
    }

    /// Level-by-level cv comparison of the two targets: a target whose cv is
    /// a subset at every level, and a strict subset at one, is better.
    fn compare_qualifications(&self, other: &Cost) -> Ordering {
        let mine = qualification_levels(&self.target);
        let theirs = qualification_levels(&other.target);
        if mine.len() != theirs.len() {
            return Ordering::Equal;
        }
        let mut subset = true;
        let mut superset = true;
        for (a, b) in mine.iter().zip(&theirs) {
            subset &= b.contains(*a);
            superset &= a.contains(*b);
        }
        match (subset, superset) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

/// cv-qualification of each level of `info`, outermost operator first and
/// the base type last.
pub(crate) fn qualification_levels(info: &TypeInfo) -> Vec<TypeFlags> {
    let mut levels: Vec<TypeFlags> = info.ptr_ops.iter().map(|op| op.cv_flags()).collect();
    levels.push(info.cv_flags());
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use cppsym_core::{PtrOp, TypeKind};

    fn cost(rank: Rank) -> Cost {
        let mut c = Cost::new(TypeInfo::new(TypeKind::Int), TypeInfo::new(TypeKind::Int));
        c.rank = rank;
        c
    }

    #[test]
    fn rank_orders_first() {
        assert_eq!(cost(Rank::Identity).compare(&cost(Rank::Promotion)), Ordering::Less);
        assert_eq!(cost(Rank::UserDefined).compare(&cost(Rank::Conversion)), Ordering::Greater);
    }

    #[test]
    fn pointer_to_base_beats_pointer_to_void() {
        let mut to_base = cost(Rank::Conversion);
        to_base.conversion = 3;
        to_base.detail = 1;
        let mut to_void = cost(Rank::Conversion);
        to_void.conversion = 1;
        to_void.detail = 2;
        assert_eq!(to_base.compare(&to_void), Ordering::Less);

        let mut nearer = cost(Rank::Conversion);
        nearer.conversion = 1;
        nearer.detail = 1;
        assert_eq!(nearer.compare(&to_base), Ordering::Less);
    }

    #[test]
    fn fewer_added_qualifiers_win() {
        let plain = TypeInfo::new(TypeKind::Int).with_ptr(PtrOp::pointer());
        let mut to_const = cost(Rank::Identity);
        to_const.qualification = 1;
        to_const.target = plain.clone().with_flags(TypeFlags::CONST);
        let mut to_cv = cost(Rank::Identity);
        to_cv.qualification = 1;
        to_cv.target = plain.with_flags(TypeFlags::CV);
        assert_eq!(to_const.compare(&to_cv), Ordering::Less);
        assert_eq!(cost(Rank::Identity).compare(&to_const), Ordering::Less);
    }

    #[test]
    fn distinct_user_defined_conversions_are_incomparable() {
        let mut a = cost(Rank::UserDefined);
        a.user_defined = UserDefined::Via(SymbolId::new(1));
        let mut b = cost(Rank::UserDefined);
        b.user_defined = UserDefined::Via(SymbolId::new(2));
        b.promotion = 1;
        assert_eq!(a.compare(&b), Ordering::Equal);

        let mut ambiguous = cost(Rank::UserDefined);
        ambiguous.user_defined = UserDefined::Ambiguous;
        assert_eq!(a.compare(&ambiguous), Ordering::Equal);
    }
}
