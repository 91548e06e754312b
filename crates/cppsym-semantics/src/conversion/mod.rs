//! Implicit conversion sequences.
//!
//! This module ranks how an argument converts to a parameter type, which is
//! what overload resolution compares.
//!
//! ## Conversion order
//!
//! Conversions are tried in this order, the first that applies wins:
//! 1. Identity, after lvalue transformations
//! 2. Qualification adjustment (adding const/volatile)
//! 3. Integral and floating promotion
//! 4. Pointer, member pointer and arithmetic conversions
//! 5. Derived to base
//! 6. User-defined (converting constructor or conversion function)

mod cost;
mod standard;
mod user_defined;

pub use cost::{Cost, Rank, UserDefined};

use cppsym_core::{Result, SymbolTableError, TypeInfo};
use tracing::trace;

use crate::table::SymbolTable;

impl SymbolTable {
    /// The implicit conversion sequence from `source` to `target`: a
    /// standard sequence, or a user-defined one when no standard sequence
    /// exists and `allow_user_defined` is set.
    pub fn conversion_cost(
        &mut self,
        source: &TypeInfo,
        target: &TypeInfo,
        allow_user_defined: bool,
    ) -> Result<Cost> {
        let cost = self.standard_conversion(source, target)?;
        if cost.is_match() || !allow_user_defined {
            return Ok(cost);
        }
        Ok(self.user_defined_conversion(source, target)?.unwrap_or(cost))
    }

    /// The type of `c ? second : third` when the operands have different
    /// types: the type of whichever operand the other converts to.
    ///
    /// `None` when neither operand converts to the other. Both converting,
    /// or an ambiguous conversion, is [`SymbolTableError::Ambiguous`].
    pub fn get_conditional_operand(
        &mut self,
        second: &TypeInfo,
        third: &TypeInfo,
    ) -> Result<Option<TypeInfo>> {
        let flat_second = self.flatten(second);
        let flat_third = self.flatten(third);
        if self.types_equal(&flat_second, &flat_third) {
            return Ok(Some(flat_second));
        }

        let to_third = self.conversion_cost(&flat_second, &flat_third, true)?;
        let to_second = self.conversion_cost(&flat_third, &flat_second, true)?;
        let ambiguous = |c: &Cost| c.user_defined == UserDefined::Ambiguous;
        if ambiguous(&to_third) || ambiguous(&to_second) {
            return Err(SymbolTableError::ambiguous(self.type_name(&flat_second)));
        }

        trace!(
            second = %self.type_name(&flat_second),
            third = %self.type_name(&flat_third),
            "conditional operand conversion"
        );
        match (to_third.is_match(), to_second.is_match()) {
            (true, true) => Err(SymbolTableError::ambiguous(self.type_name(&flat_second))),
            (true, false) => Ok(Some(flat_third)),
            (false, true) => Ok(Some(flat_second)),
            (false, false) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cppsym_core::{PtrOp, SymbolId, TypeKind};

    fn class(table: &mut SymbolTable, name: &str) -> SymbolId {
        let root = table.root();
        let id = table.new_class(name, TypeKind::Class).unwrap();
        table.add_symbol(root, id).unwrap();
        id
    }

    #[test]
    fn user_defined_only_when_allowed() {
        let mut table = SymbolTable::cpp();
        let a = class(&mut table, "A");
        let ctor = table.new_constructor("A");
        table.add_parameter_type(ctor, TypeInfo::new(TypeKind::Int)).unwrap();
        table.add_constructor(a, ctor).unwrap();

        let int = TypeInfo::new(TypeKind::Int);
        let target = TypeInfo::of_symbol(a);
        assert_eq!(table.conversion_cost(&int, &target, false).unwrap().rank, Rank::NoMatch);
        assert_eq!(table.conversion_cost(&int, &target, true).unwrap().rank, Rank::UserDefined);
    }

    #[test]
    fn conditional_operand_picks_the_convertible_side() {
        let mut table = SymbolTable::cpp();
        let a = class(&mut table, "A");
        let b = class(&mut table, "B");
        let ctor = table.new_constructor("A");
        table
            .add_parameter_type(ctor, TypeInfo::of_symbol(b).with_ptr(PtrOp::reference()))
            .unwrap();
        table.add_constructor(a, ctor).unwrap();

        let result = table
            .get_conditional_operand(&TypeInfo::of_symbol(b), &TypeInfo::of_symbol(a))
            .unwrap();
        assert_eq!(result, Some(TypeInfo::of_symbol(a)));

        let c = class(&mut table, "C");
        let none = table
            .get_conditional_operand(&TypeInfo::of_symbol(c), &TypeInfo::of_symbol(a))
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn conditional_operands_converting_both_ways_are_ambiguous() {
        let table = &mut SymbolTable::cpp();
        let result = table.get_conditional_operand(
            &TypeInfo::new(TypeKind::Int),
            &TypeInfo::new(TypeKind::Double),
        );
        assert!(matches!(result, Err(SymbolTableError::Ambiguous { .. })));
    }
}
