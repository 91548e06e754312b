//! Member access through inheritance.

use cppsym_core::{Result, SymbolId, TypeKind, Visibility};
use rustc_hash::FxHashSet;

use crate::table::SymbolTable;

impl SymbolTable {
    /// Access of `symbol` when named through the class `qualifying`.
    ///
    /// Each base clause on the path restricts access to the most
    /// restrictive of the clause and the member. A static member or an
    /// enumerator reachable along several paths takes the least restrictive
    /// one. `None` when `symbol` is not a member of `qualifying` or its bases.
    pub fn get_visibility(
        &self,
        symbol: SymbolId,
        qualifying: SymbolId,
    ) -> Result<Option<Visibility>> {
        self.visibility_through(symbol, qualifying, &mut FxHashSet::default())
    }

    fn visibility_through(
        &self,
        symbol: SymbolId,
        qualifying: SymbolId,
        seen: &mut FxHashSet<SymbolId>,
    ) -> Result<Option<Visibility>> {
        let sym = self.symbol(symbol)?;
        let qualifying = self.resolve_forward(qualifying);
        if sym.containing == Some(qualifying) || !self.kind_of(qualifying).is_class_like() {
            return Ok(Some(sym.visibility));
        }
        if !seen.insert(qualifying) {
            return Ok(None);
        }

        let member_access = sym.visibility;
        let shared = sym.type_info.is_static() || sym.is(TypeKind::Enumerator);
        let container = sym.containing;
        let parents = self.symbol(qualifying)?.parents().to_vec();

        let mut result: Option<Visibility> = None;
        for clause in parents {
            let Some(parent) = self.parent_scope(clause.parent) else {
                continue;
            };
            let through = if Some(parent) == container {
                Some(clause.visibility.most_restrictive(member_access))
            } else {
                self.visibility_through(symbol, parent, seen)?
                    .map(|v| clause.visibility.most_restrictive(v))
            };
            let Some(v) = through else {
                continue;
            };
            if !shared {
                return Ok(Some(v));
            }
            result = Some(result.map_or(v, |r| r.least_restrictive(v)));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use crate::table::SymbolTable;
    use cppsym_core::{SymbolId, TypeFlags, TypeKind, Visibility};

    fn class(table: &mut SymbolTable, name: &str) -> SymbolId {
        let root = table.root();
        let id = table.new_class(name, TypeKind::Class).unwrap();
        table.add_symbol(root, id).unwrap();
        id
    }

    #[test]
    fn direct_member_keeps_its_access() {
        let mut table = SymbolTable::cpp();
        let a = class(&mut table, "A");
        let x = table.new_symbol("x", TypeKind::Int);
        table.set_visibility(x, Visibility::Protected).unwrap();
        table.add_symbol(a, x).unwrap();
        assert_eq!(table.get_visibility(x, a).unwrap(), Some(Visibility::Protected));
    }

    #[test]
    fn base_clause_restricts_access() {
        let mut table = SymbolTable::cpp();
        let a = class(&mut table, "A");
        let b = class(&mut table, "B");
        let c = class(&mut table, "C");
        table.add_parent_with(b, a, false, Visibility::Protected).unwrap();
        table.add_parent(c, b).unwrap();
        let x = table.new_symbol("x", TypeKind::Int);
        table.add_symbol(a, x).unwrap();

        assert_eq!(table.get_visibility(x, b).unwrap(), Some(Visibility::Protected));
        assert_eq!(table.get_visibility(x, c).unwrap(), Some(Visibility::Protected));
    }

    #[test]
    fn static_member_takes_least_restrictive_path() {
        let mut table = SymbolTable::cpp();
        let a = class(&mut table, "A");
        let b = class(&mut table, "B");
        let c = class(&mut table, "C");
        let d = class(&mut table, "D");
        table.add_parent_with(b, a, false, Visibility::Private).unwrap();
        table.add_parent(c, a).unwrap();
        table.add_parent(d, b).unwrap();
        table.add_parent(d, c).unwrap();
        let s = table.new_symbol("s", TypeKind::Int);
        table.set_flags(s, TypeFlags::STATIC).unwrap();
        table.add_symbol(a, s).unwrap();

        assert_eq!(table.get_visibility(s, d).unwrap(), Some(Visibility::Public));
    }

    #[test]
    fn unrelated_class_has_no_access_path() {
        let mut table = SymbolTable::cpp();
        let a = class(&mut table, "A");
        let b = class(&mut table, "B");
        let x = table.new_symbol("x", TypeKind::Int);
        table.add_symbol(a, x).unwrap();
        assert_eq!(table.get_visibility(x, b).unwrap(), None);
    }
}
