//! Cost-based ranking for overload resolution.
//!
//! Every viable candidate gets one conversion cost per argument. The best
//! candidate is no worse than any other on every argument and strictly
//! better on at least one. Ties fall back to the template rules.

use std::cmp::Ordering;

use cppsym_core::{Result, SymbolId, SymbolTableError, TypeInfo};
use tracing::trace;

use crate::conversion::{Cost, UserDefined};
use crate::lookup::LookupData;
use crate::table::SymbolTable;

/// A viable candidate with the cost of each of its argument conversions.
#[derive(Debug, Clone)]
pub(crate) struct OverloadMatch {
    pub function: SymbolId,
    pub costs: Vec<Cost>,
    /// The function template this candidate was instantiated from.
    pub template: Option<SymbolId>,
    pub has_ambiguous_conversion: bool,
}

impl OverloadMatch {
    fn is_viable(&self) -> bool {
        self.costs.iter().all(Cost::is_match)
    }
}

impl SymbolTable {
    pub(crate) fn rank_candidates(
        &mut self,
        data: &LookupData,
        args: &[TypeInfo],
        candidates: &[SymbolId],
    ) -> Result<Vec<OverloadMatch>> {
        let allow_user_defined = !data.for_user_defined_conversion;
        let mut matches = Vec::with_capacity(candidates.len());
        for &function in candidates {
            let params = self.parameter_types(function);
            let mut costs = Vec::with_capacity(args.len());
            for (i, arg) in args.iter().enumerate() {
                let cost = match params.get(i) {
                    Some(param) => self.conversion_cost(arg, param, allow_user_defined)?,
                    None => Cost::ellipsis(arg.clone()),
                };
                let stop = !cost.is_match();
                costs.push(cost);
                if stop {
                    break;
                }
            }
            let has_ambiguous_conversion = costs
                .iter()
                .any(|c| c.user_defined == UserDefined::Ambiguous);
            let template = self.symbol(function)?.instance.as_ref().map(|i| i.template);
            matches.push(OverloadMatch {
                function,
                costs,
                template,
                has_ambiguous_conversion,
            });
        }
        Ok(matches)
    }

    /// Select the best of the ranked candidates.
    ///
    /// `Ok(None)` when no candidate converts every argument. The winner must
    /// beat every other viable candidate, not only the ones it was compared
    /// with on the way.
    pub(crate) fn find_best_match(
        &mut self,
        data: &LookupData,
        matches: Vec<OverloadMatch>,
    ) -> Result<Option<SymbolId>> {
        let viable: Vec<&OverloadMatch> = matches.iter().filter(|m| m.is_viable()).collect();
        let Some((&first, rest)) = viable.split_first() else {
            return Ok(None);
        };

        let mut best = first;
        for &current in rest {
            if self.compare_candidates(data, current, best)? == Ordering::Less {
                best = current;
            }
        }

        for &other in &viable {
            if std::ptr::eq(other, best) {
                continue;
            }
            if self.compare_candidates(data, best, other)? != Ordering::Less {
                return Err(SymbolTableError::ambiguous(data.name.clone()));
            }
        }
        if best.has_ambiguous_conversion {
            return Err(SymbolTableError::ambiguous(data.name.clone()));
        }
        Ok(Some(best.function))
    }

    /// `Less` when `current` is the better candidate, `Equal` when neither
    /// is better.
    fn compare_candidates(
        &mut self,
        data: &LookupData,
        current: &OverloadMatch,
        other: &OverloadMatch,
    ) -> Result<Ordering> {
        let mut better = false;
        let mut worse = false;
        for (mine, theirs) in current.costs.iter().zip(&other.costs) {
            match mine.compare(theirs) {
                Ordering::Less => better = true,
                Ordering::Greater => worse = true,
                Ordering::Equal => {}
            }
        }
        trace!(
            candidate = %current.function,
            other = %other.function,
            better,
            worse,
            "compare overload candidates"
        );
        match (better, worse) {
            (true, false) => Ok(Ordering::Less),
            (false, true) => Ok(Ordering::Greater),
            (true, true) => Ok(Ordering::Equal),
            (false, false) => self.break_tie(data, current, other),
        }
    }

    /// Order two candidates whose conversions are indistinguishable.
    /// `Less` prefers `current`.
    ///
    /// A non-template beats a template instance unless the call gave explicit
    /// template arguments. Two instances are ordered by how specialized their
    /// templates are.
    fn break_tie(
        &mut self,
        data: &LookupData,
        current: &OverloadMatch,
        incumbent: &OverloadMatch,
    ) -> Result<Ordering> {
        match (current.template, incumbent.template) {
            (Some(a), Some(b)) if a != b => self.order_template_functions(a, b),
            (None, Some(_)) if data.template_args.is_none() => Ok(Ordering::Less),
            (Some(_), None) if data.template_args.is_none() => Ok(Ordering::Greater),
            _ => Ok(Ordering::Equal),
        }
    }
}
