//! User-defined conversions: converting constructors and conversion functions.

use cppsym_core::{Reason, Result, SymbolId, TypeFlags, TypeInfo, TypeKind};
use tracing::trace;

use super::cost::{Cost, Rank, UserDefined};
use crate::lookup::{LookupData, TypeFilter};
use crate::table::SymbolTable;

impl SymbolTable {
    /// A conversion from `source` to `target` through one user-defined step.
    ///
    /// Both a non-explicit constructor of the target class taking `source`
    /// and a conversion function `operator target()` of the source class are
    /// tried. When both apply the conversion is ambiguous. `None` when
    /// neither applies.
    pub fn user_defined_conversion(
        &mut self,
        source: &TypeInfo,
        target: &TypeInfo,
    ) -> Result<Option<Cost>> {
        let s = strip_reference(self.flatten(source));
        let t = strip_reference(self.flatten(target));

        let constructor = match self.class_of(&t).filter(|_| !t.has_ptr_ops()) {
            Some(class) => self.converting_constructor(class, source)?,
            None => Candidate::None,
        };
        let function = match self.class_of(&s).filter(|_| !s.has_ptr_ops()) {
            Some(class) => self.conversion_function(class, &t)?,
            None => Candidate::None,
        };

        let user_defined = match (constructor, function) {
            (Candidate::None, Candidate::None) => return Ok(None),
            (Candidate::One(id), Candidate::None) | (Candidate::None, Candidate::One(id)) => UserDefined::Via(id),
            _ => UserDefined::Ambiguous,
        };
        trace!(target = %self.type_name(&t), via = ?user_defined, "user-defined conversion");

        let mut cost = Cost::new(s, t);
        cost.rank = Rank::UserDefined;
        cost.user_defined = user_defined;
        Ok(Some(cost))
    }

    fn converting_constructor(&mut self, class: SymbolId, source: &TypeInfo) -> Result<Candidate> {
        let constructors = self
            .symbol(class)?
            .class()
            .map(|c| c.constructors.clone())
            .unwrap_or_default();
        if constructors.is_empty() {
            return Ok(Candidate::None);
        }
        let mut data = LookupData::new(
            self.name(class).to_string(),
            TypeFilter::of(TypeKind::Constructor),
            class,
        )
        .with_args(std::slice::from_ref(source));
        data.for_user_defined_conversion = true;

        let found = settle(self.resolve_function(&data, constructors))?;
        if let Candidate::One(id) = found
            && self.symbol(id)?.type_info.has_flag(TypeFlags::EXPLICIT)
        {
            return Ok(Candidate::None);
        }
        Ok(found)
    }

    fn conversion_function(&mut self, class: SymbolId, target: &TypeInfo) -> Result<Candidate> {
        let mut target = target.clone();
        target.flags.remove(TypeFlags::CV);
        let name = format!("operator {}", self.type_name(&target));
        let mut data = LookupData::new(name, TypeFilter::of(TypeKind::Function), class)
            .qualified()
            .with_args(&[]);
        data.for_user_defined_conversion = true;
        self.lookup_scope(&mut data, class)?;
        settle(self.resolve_ambiguities(&data))
    }
}

/// Outcome of looking for one kind of user-defined conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    None,
    One(SymbolId),
    Ambiguous,
}

/// An ambiguous selection makes the conversion ambiguous rather than
/// failing the whole call.
fn settle(result: Result<Option<SymbolId>>) -> Result<Candidate> {
    match result {
        Ok(Some(id)) => Ok(Candidate::One(id)),
        Ok(None) => Ok(Candidate::None),
        Err(e) if e.reason() == Reason::Ambiguous => Ok(Candidate::Ambiguous),
        Err(e) => Err(e),
    }
}

fn strip_reference(mut info: TypeInfo) -> TypeInfo {
    if info.is_reference() {
        info.ptr_ops.remove(0);
    }
    info
}
