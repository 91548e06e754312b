//! Lookup through base classes.

use cppsym_core::{Result, SymbolId, SymbolTableError, TypeInfo, TypeKind, Visibility};
use rustc_hash::FxHashSet;

use super::{Found, LookupData};
use crate::table::SymbolTable;

impl SymbolTable {
    /// Search the bases of `class`, depth first, merging what each base
    /// path finds.
    pub(crate) fn lookup_in_parents(
        &self,
        data: &mut LookupData,
        class: SymbolId,
    ) -> Result<Option<Found>> {
        let parents = self.symbol(class)?.parents().to_vec();
        if parents.is_empty() {
            return Ok(None);
        }

        data.inheritance_chain.insert(class);
        let mut result: Option<Found> = None;

        for clause in &parents {
            let Some(parent) = self.parent_scope(clause.parent) else {
                continue;
            };
            if clause.is_virtual && !data.visited.insert(parent) {
                continue;
            }
            if data.inheritance_chain.contains(&parent) {
                return Err(SymbolTableError::CircularInheritance {
                    class: self.name(parent).to_string(),
                });
            }

            let mut found = self.lookup_in_contained(data, parent)?;
            if found.is_none() {
                found = self.lookup_in_parents(data, parent)?;
            }
            if let Some(found) = found {
                result = match result {
                    None => Some(found),
                    Some(previous) => Some(self.combine_inherited(data, previous, found)?),
                };
            }
        }

        data.inheritance_chain.remove(&class);
        Ok(result)
    }

    /// Results from two base paths are one result only when they are the
    /// same declarations and those are static members, enumerators or types.
    fn combine_inherited(&self, data: &LookupData, a: Found, b: Found) -> Result<Found> {
        let mut ids_a = a.ids();
        let mut ids_b = b.ids();
        ids_a.sort();
        ids_b.sort();
        let shareable = ids_a.iter().all(|&id| {
            self.get(id).is_some_and(|s| {
                s.type_info.is_static() || s.is(TypeKind::Enumerator) || s.kind().is_elaborated()
            })
        });
        if ids_a == ids_b && shareable {
            Ok(a)
        } else {
            Err(SymbolTableError::ambiguous(data.name.clone()))
        }
    }

    /// The class a base clause names, looking through forward declarations,
    /// typedefs and deferred instances. Dependent bases have no scope yet.
    pub(crate) fn parent_scope(&self, parent: SymbolId) -> Option<SymbolId> {
        let id = self.resolve_forward(parent);
        let sym = self.get(id)?;
        if sym.is(TypeKind::TemplateParameter) {
            return None;
        }
        if sym.is_deferred_instance() {
            let scope = self.lookup_target(id);
            return (scope != id).then_some(scope);
        }
        if sym.is(TypeKind::Type) {
            let flat = self.flatten(&TypeInfo::of_symbol(id));
            return flat
                .type_symbol
                .filter(|&s| s != id && flat.ptr_ops.is_empty())
                .and_then(|s| self.parent_scope(s));
        }
        sym.kind().is_class_like().then_some(id)
    }

    /// Inheritance distance from `derived` to `base`: `Some(0)` for the same
    /// class, `Some(1)` for a direct base, `None` when unrelated.
    ///
    /// With `require_public`, a path through a non-public base clause is a
    /// [`SymbolTableError::BadVisibility`] error.
    pub fn has_base_class(
        &self,
        derived: SymbolId,
        base: SymbolId,
        require_public: bool,
    ) -> Result<Option<u32>> {
        let base = self.resolve_forward(base);
        self.base_distance(derived, base, require_public, &mut FxHashSet::default())
    }

    fn base_distance(
        &self,
        derived: SymbolId,
        base: SymbolId,
        require_public: bool,
        seen: &mut FxHashSet<SymbolId>,
    ) -> Result<Option<u32>> {
        let derived = self.resolve_forward(derived);
        if derived == base {
            return Ok(Some(0));
        }
        if !seen.insert(derived) {
            return Ok(None);
        }
        let parents = self.symbol(derived)?.parents().to_vec();
        for clause in parents {
            let Some(parent) = self.parent_scope(clause.parent) else {
                continue;
            };
            let distance = if parent == base {
                Some(1)
            } else {
                self.base_distance(parent, base, require_public, seen)?
                    .map(|n| n + 1)
            };
            if let Some(n) = distance {
                if require_public && clause.visibility != Visibility::Public {
                    return Err(SymbolTableError::BadVisibility {
                        name: self.name(base).to_string(),
                    });
                }
                return Ok(Some(n));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use crate::table::SymbolTable;
    use cppsym_core::{SymbolId, SymbolTableError, TypeFlags, TypeKind, Visibility};

    fn class(table: &mut SymbolTable, name: &str) -> SymbolId {
        let root = table.root();
        let id = table.new_class(name, TypeKind::Class).unwrap();
        table.add_symbol(root, id).unwrap();
        id
    }

    #[test]
    fn member_found_in_base() {
        let mut table = SymbolTable::cpp();
        let a = class(&mut table, "A");
        let b = class(&mut table, "B");
        table.add_parent(b, a).unwrap();
        let x = table.new_symbol("x", TypeKind::Int);
        table.add_symbol(a, x).unwrap();

        assert_eq!(table.lookup(b, "x").unwrap(), Some(x));
        assert_eq!(table.qualified_lookup(b, "x").unwrap(), Some(x));
    }

    #[test]
    fn circular_inheritance_is_reported() {
        let mut table = SymbolTable::cpp();
        let a = class(&mut table, "A");
        let b = class(&mut table, "B");
        table.add_parent(a, b).unwrap();
        table.add_parent(b, a).unwrap();

        let err = table.lookup(a, "missing").unwrap_err();
        assert!(matches!(err, SymbolTableError::CircularInheritance { .. }));
    }

    #[test]
    fn virtual_diamond_is_not_ambiguous() {
        let mut table = SymbolTable::cpp();
        let a = class(&mut table, "A");
        let b = class(&mut table, "B");
        let c = class(&mut table, "C");
        let d = class(&mut table, "D");
        table.add_parent_with(b, a, true, Visibility::Public).unwrap();
        table.add_parent_with(c, a, true, Visibility::Public).unwrap();
        table.add_parent(d, b).unwrap();
        table.add_parent(d, c).unwrap();
        let m = table.new_symbol("m", TypeKind::Int);
        table.add_symbol(a, m).unwrap();

        assert_eq!(table.lookup(d, "m").unwrap(), Some(m));
    }

    #[test]
    fn static_member_through_diamond() {
        let mut table = SymbolTable::cpp();
        let a = class(&mut table, "A");
        let b = class(&mut table, "B");
        let c = class(&mut table, "C");
        let d = class(&mut table, "D");
        table.add_parent(b, a).unwrap();
        table.add_parent(c, a).unwrap();
        table.add_parent(d, b).unwrap();
        table.add_parent(d, c).unwrap();
        let s = table.new_symbol("s", TypeKind::Int);
        table.set_flags(s, TypeFlags::STATIC).unwrap();
        table.add_symbol(a, s).unwrap();
        let m = table.new_symbol("m", TypeKind::Int);
        table.add_symbol(a, m).unwrap();

        assert_eq!(table.lookup(d, "s").unwrap(), Some(s));
        assert!(matches!(
            table.lookup(d, "m"),
            Err(SymbolTableError::Ambiguous { .. })
        ));
    }

    #[test]
    fn base_class_distance() {
        let mut table = SymbolTable::cpp();
        let a = class(&mut table, "A");
        let b = class(&mut table, "B");
        let c = class(&mut table, "C");
        let other = class(&mut table, "Other");
        table.add_parent(b, a).unwrap();
        table.add_parent_with(c, b, false, Visibility::Private).unwrap();

        assert_eq!(table.has_base_class(a, a, false).unwrap(), Some(0));
        assert_eq!(table.has_base_class(b, a, false).unwrap(), Some(1));
        assert_eq!(table.has_base_class(c, a, false).unwrap(), Some(2));
        assert_eq!(table.has_base_class(c, other, false).unwrap(), None);
        assert!(matches!(
            table.has_base_class(c, a, true),
            Err(SymbolTableError::BadVisibility { .. })
        ));
    }
}
