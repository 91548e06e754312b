//! Argument-dependent lookup.

use cppsym_core::{Result, SymbolId, TypeInfo, TypeKind};
use rustc_hash::FxHashSet;
use tracing::trace;

use super::LookupData;
use crate::table::SymbolTable;

impl SymbolTable {
    /// Scopes whose members are candidates for a call with `args`.
    ///
    /// A class argument contributes itself, its enclosing scope and every
    /// base class with its enclosing scope. A union or enumeration
    /// contributes its enclosing scope.
    pub fn associated_scopes(&self, args: &[TypeInfo]) -> FxHashSet<SymbolId> {
        let mut scopes = FxHashSet::default();
        for arg in args {
            let flat = self.flatten(arg);
            let Some(id) = flat.type_symbol.filter(|_| flat.kind == TypeKind::Type) else {
                continue;
            };
            let Some(sym) = self.get(id) else {
                continue;
            };
            match sym.kind() {
                TypeKind::Class | TypeKind::Struct => {
                    self.add_class_and_bases(id, &mut scopes);
                }
                TypeKind::Union | TypeKind::Enumeration => {
                    if let Some(c) = sym.containing {
                        scopes.insert(c);
                    }
                }
                _ => {}
            }
        }
        scopes
    }

    fn add_class_and_bases(&self, class: SymbolId, scopes: &mut FxHashSet<SymbolId>) {
        if !scopes.insert(class) {
            return;
        }
        if let Some(c) = self.containing(class) {
            scopes.insert(c);
        }
        let parents: Vec<SymbolId> = self
            .get(class)
            .map(|s| s.parents().iter().map(|p| p.parent).collect())
            .unwrap_or_default();
        for parent in parents {
            if let Some(base) = self.parent_scope(parent) {
                self.add_class_and_bases(base, scopes);
            }
        }
    }

    /// Add the contained declarations of the associated scopes the ordinary
    /// walk did not reach. Skipped when ordinary lookup found a class member.
    pub(crate) fn lookup_associated(&self, data: &mut LookupData) -> Result<()> {
        if data.associated.is_empty() {
            return Ok(());
        }
        if data.found.as_ref().is_some_and(|f| self.found_in_class(f)) {
            return Ok(());
        }
        let mut scopes: Vec<SymbolId> = data.associated.iter().copied().collect();
        scopes.sort();
        for scope in scopes {
            if !data.associated.contains(&scope) {
                continue;
            }
            trace!(scope = %scope, name = %data.name, "argument-dependent lookup");
            let found = self.lookup_in_contained(data, scope)?;
            let previous = data.found.take();
            data.found = self.merge(data, previous, found)?;
        }
        Ok(())
    }
}
