//! Name lookup.
//!
//! This module implements the Scope Resolver: unqualified and qualified
//! lookup through contained declarations, using-directives, base classes
//! and enclosing scopes.
//!
//! ## Algorithm
//!
//! 1. Search the declarations contained in the current scope
//! 2. Search namespaces nominated by using-directives that apply here
//! 3. Search base classes when the scope is a class
//! 4. Move to the enclosing scope and repeat
//!
//! Lookup stops at the first scope level where a matching declaration is
//! found, which is what gives inner declarations their hiding behaviour.
//! Nothing found is `Ok(None)`; a name that resolves to several unrelated
//! declarations is [`SymbolTableError::Ambiguous`].

mod adl;
mod parents;
mod scope;
pub mod visibility;

use cppsym_core::{Result, Symbol, SymbolId, SymbolTableError, TypeInfo, TypeKind};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::table::SymbolTable;

// ============================================================================
// TypeFilter
// ============================================================================

/// The kinds of declaration a lookup accepts. Empty accepts everything.
///
/// A `Class` entry also accepts structs and unions, and a kind accepts a
/// template whose templated declaration has that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeFilter {
    kinds: Vec<TypeKind>,
}

impl TypeFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of(kind: TypeKind) -> Self {
        Self { kinds: vec![kind] }
    }

    #[must_use]
    pub fn with(mut self, kind: TypeKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    pub fn is_any(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn contains(&self, kind: TypeKind) -> bool {
        self.kinds.contains(&kind)
    }

    fn accepts_kind(&self, kind: TypeKind) -> bool {
        self.contains(kind)
            || (self.contains(TypeKind::Class) && matches!(kind, TypeKind::Struct | TypeKind::Union))
    }

    pub(crate) fn accepts(&self, table: &SymbolTable, symbol: &Symbol) -> bool {
        if self.is_any() || self.accepts_kind(symbol.kind()) {
            return true;
        }
        if symbol.is(TypeKind::Template) {
            return symbol
                .template()
                .and_then(|t| t.templated)
                .is_some_and(|templated| self.accepts_kind(table.kind_of(templated)));
        }
        false
    }
}

// ============================================================================
// LookupData
// ============================================================================

/// What a lookup found: one declaration, or an overload set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Found {
    One(SymbolId),
    Overloads(Vec<SymbolId>),
}

impl Found {
    pub(crate) fn ids(&self) -> Vec<SymbolId> {
        match self {
            Found::One(id) => vec![*id],
            Found::Overloads(ids) => ids.clone(),
        }
    }

    fn first(&self) -> Option<SymbolId> {
        match self {
            Found::One(id) => Some(*id),
            Found::Overloads(ids) => ids.first().copied(),
        }
    }
}

/// State of one lookup as it walks the scope graph.
#[derive(Debug, Clone)]
pub(crate) struct LookupData {
    pub name: String,
    pub filter: TypeFilter,
    pub qualified: bool,
    pub ignore_using_directives: bool,
    pub using_directives_only: bool,
    pub for_friendship: bool,
    pub for_definition: bool,
    pub for_user_defined_conversion: bool,
    /// Call arguments; `None` when the lookup is not a call.
    pub args: Option<Vec<TypeInfo>>,
    /// Explicit template arguments of a call such as `f<int>(x)`.
    pub template_args: Option<Vec<TypeInfo>>,
    pub found: Option<Found>,
    /// Namespaces already searched through using-directives.
    pub visited: FxHashSet<SymbolId>,
    pub inheritance_chain: FxHashSet<SymbolId>,
    /// Nominated namespaces waiting for the walk to reach a given scope.
    pub pending: FxHashMap<SymbolId, Vec<SymbolId>>,
    /// Scopes still to search for argument-dependent lookup.
    pub associated: FxHashSet<SymbolId>,
    pub stop_at: Option<SymbolId>,
    /// The scope the lookup started from.
    pub origin: SymbolId,
}

impl LookupData {
    pub(crate) fn new(name: impl Into<String>, filter: TypeFilter, origin: SymbolId) -> Self {
        Self {
            name: name.into(),
            filter,
            qualified: false,
            ignore_using_directives: false,
            using_directives_only: false,
            for_friendship: false,
            for_definition: false,
            for_user_defined_conversion: false,
            args: None,
            template_args: None,
            found: None,
            visited: FxHashSet::default(),
            inheritance_chain: FxHashSet::default(),
            pending: FxHashMap::default(),
            associated: FxHashSet::default(),
            stop_at: None,
            origin,
        }
    }

    pub(crate) fn qualified(mut self) -> Self {
        self.qualified = true;
        self
    }

    pub(crate) fn with_args(mut self, args: &[TypeInfo]) -> Self {
        self.args = Some(args.to_vec());
        self
    }
}

// ============================================================================
// Entry points
// ============================================================================

impl SymbolTable {
    /// Unqualified lookup of `name` from `scope`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn lookup(&mut self, scope: SymbolId, name: &str) -> Result<Option<SymbolId>> {
        self.lookup_filtered(scope, name, TypeFilter::any())
    }

    pub fn lookup_filtered(
        &mut self,
        scope: SymbolId,
        name: &str,
        filter: TypeFilter,
    ) -> Result<Option<SymbolId>> {
        let mut data = LookupData::new(name, filter, scope);
        self.lookup_scope(&mut data, scope)?;
        let found = self.resolve_ambiguities(&data)?;
        match found {
            Some(id) => self.within_template_scope(scope, id).map(Some),
            None => Ok(None),
        }
    }

    /// Lookup restricted to one kind, reaching types hidden by objects or
    /// functions of the same name (`struct stat`).
    pub fn elaborated_lookup(
        &mut self,
        scope: SymbolId,
        kind: TypeKind,
        name: &str,
    ) -> Result<Option<SymbolId>> {
        self.lookup_filtered(scope, name, TypeFilter::of(kind))
    }

    /// `Scope::name`: only `scope`, its bases and the namespaces its own
    /// using-directives nominate.
    pub fn qualified_lookup(&mut self, scope: SymbolId, name: &str) -> Result<Option<SymbolId>> {
        self.qualified_lookup_filtered(scope, name, TypeFilter::any())
    }

    pub fn qualified_lookup_filtered(
        &mut self,
        scope: SymbolId,
        name: &str,
        filter: TypeFilter,
    ) -> Result<Option<SymbolId>> {
        let mut data = LookupData::new(name, filter, scope).qualified();
        self.lookup_scope(&mut data, scope)?;
        self.resolve_ambiguities(&data)
    }

    /// The name before a `::`: namespaces, classes and templates only.
    pub fn lookup_nested_name_specifier(
        &mut self,
        scope: SymbolId,
        name: &str,
    ) -> Result<Option<SymbolId>> {
        let filter = TypeFilter::of(TypeKind::Namespace)
            .with(TypeKind::Class)
            .with(TypeKind::Enumeration)
            .with(TypeKind::Template)
            .with(TypeKind::Type);
        let mut data = LookupData::new(name, filter, scope);
        self.lookup_scope(&mut data, scope)?;
        let Some(found) = self.resolve_ambiguities(&data)? else {
            return Ok(None);
        };
        // A typedef naming a class qualifies like the class itself.
        let sym = self.symbol(found)?;
        if sym.is(TypeKind::Type) {
            if !sym.type_info.has_flag(cppsym_core::TypeFlags::TYPEDEF) {
                return Ok(None);
            }
            let flat = self.flatten(&TypeInfo::of_symbol(found));
            return Ok(flat
                .type_symbol
                .filter(|&s| flat.ptr_ops.is_empty() && self.kind_of(s).is_elaborated()));
        }
        self.within_template_scope(scope, found).map(Some)
    }

    /// A declaration of `name` directly in `scope`, for attaching a definition.
    pub fn lookup_member_for_definition(
        &mut self,
        scope: SymbolId,
        name: &str,
    ) -> Result<Option<SymbolId>> {
        let mut data = LookupData::new(name, TypeFilter::any(), scope).qualified();
        data.for_definition = true;
        data.ignore_using_directives = true;
        self.lookup_scope(&mut data, scope)?;
        match data.found {
            Some(Found::One(id)) => Ok(Some(id)),
            Some(Found::Overloads(ids)) if ids.len() == 1 => Ok(ids.first().copied()),
            Some(Found::Overloads(_)) => Err(SymbolTableError::UnableToResolveFunction {
                name: name.to_string(),
            }),
            None => Ok(None),
        }
    }

    /// The function declared directly in `scope` whose parameter list is
    /// exactly `params`. A function template yields its templated function.
    pub fn lookup_method_for_definition(
        &mut self,
        scope: SymbolId,
        name: &str,
        params: &[TypeInfo],
    ) -> Result<Option<SymbolId>> {
        let mut data = LookupData::new(name, TypeFilter::of(TypeKind::Function), scope).qualified();
        data.for_definition = true;
        data.ignore_using_directives = true;
        self.lookup_scope(&mut data, scope)?;
        let Some(found) = data.found else {
            return Ok(None);
        };
        let wanted: Vec<TypeInfo> = match params {
            [only] if only.is_plain_void() => Vec::new(),
            _ => params.to_vec(),
        };
        for id in found.ids() {
            let function = match self.symbol(id)?.template() {
                Some(t) => match t.templated {
                    Some(f) => f,
                    None => continue,
                },
                None => id,
            };
            let declared = self.parameter_types(function);
            let matches = declared.len() == wanted.len()
                && declared.iter().zip(&wanted).all(|(a, b)| {
                    self.types_equal(&self.adjusted_parameter(a), &self.adjusted_parameter(b))
                });
            if matches {
                return Ok(Some(function));
            }
        }
        Ok(None)
    }

    /// Lookup for a friend declaration: invisible declarations count, and
    /// the search stops at the nearest enclosing non-namespace scope.
    pub fn lookup_for_friendship(&mut self, scope: SymbolId, name: &str) -> Result<Option<SymbolId>> {
        let in_class = self.kind_of(scope).is_class_like();
        let mut enclosing = self.containing(scope);
        while let Some(e) = enclosing {
            let kind = self.kind_of(e);
            let keep_going = if in_class {
                !kind.is_class_like()
            } else {
                kind == TypeKind::Namespace
            };
            if !keep_going {
                break;
            }
            enclosing = self.containing(e);
        }

        let mut data = LookupData::new(name, TypeFilter::any(), scope);
        data.for_friendship = true;
        data.stop_at = enclosing;
        self.lookup_scope(&mut data, scope)?;
        self.resolve_ambiguities(&data)
    }

    /// The constructor of `class` selected by `args`.
    pub fn lookup_constructor(
        &mut self,
        class: SymbolId,
        args: &[TypeInfo],
    ) -> Result<Option<SymbolId>> {
        let class = self.resolve_forward(class);
        let constructors = self
            .symbol(class)?
            .class()
            .map(|c| c.constructors.clone())
            .unwrap_or_default();
        if constructors.is_empty() {
            return Ok(None);
        }
        let name = self.name(class).to_string();
        let data = LookupData::new(name, TypeFilter::of(TypeKind::Constructor), class).with_args(args);
        self.resolve_function(&data, constructors)
    }

    /// `name(args...)` from `scope`, including argument-dependent lookup.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn unqualified_function_lookup(
        &mut self,
        scope: SymbolId,
        name: &str,
        args: &[TypeInfo],
    ) -> Result<Option<SymbolId>> {
        let mut data = LookupData::new(name, TypeFilter::of(TypeKind::Function), scope).with_args(args);
        data.associated = self.associated_scopes(args);
        self.lookup_scope(&mut data, scope)?;
        self.lookup_associated(&mut data)?;
        self.resolve_ambiguities(&data)
    }

    /// `this->name(args...)` from inside a member of `scope`.
    pub fn member_function_lookup(
        &mut self,
        scope: SymbolId,
        name: &str,
        args: &[TypeInfo],
    ) -> Result<Option<SymbolId>> {
        let mut data = LookupData::new(name, TypeFilter::of(TypeKind::Function), scope).with_args(args);
        self.lookup_scope(&mut data, scope)?;
        self.resolve_ambiguities(&data)
    }

    /// `Scope::name(args...)`.
    pub fn qualified_function_lookup(
        &mut self,
        scope: SymbolId,
        name: &str,
        args: &[TypeInfo],
    ) -> Result<Option<SymbolId>> {
        let mut data = LookupData::new(name, TypeFilter::of(TypeKind::Function), scope)
            .qualified()
            .with_args(args);
        self.lookup_scope(&mut data, scope)?;
        self.resolve_ambiguities(&data)
    }

    /// Reduce what a lookup found to a single declaration.
    ///
    /// A lone object or type is returned as is. An overload set needs call
    /// arguments to choose from, unless it has exactly one member.
    pub(crate) fn resolve_ambiguities(&mut self, data: &LookupData) -> Result<Option<SymbolId>> {
        match &data.found {
            None => Ok(None),
            Some(Found::One(id)) => Ok(Some(*id)),
            Some(Found::Overloads(functions)) => match &data.args {
                Some(_) => self.resolve_function(data, functions.clone()),
                None if functions.len() == 1 => Ok(functions.first().copied()),
                None => {
                    debug!(name = %data.name, candidates = functions.len(), "unresolved overload set");
                    Err(SymbolTableError::UnableToResolveFunction {
                        name: data.name.clone(),
                    })
                }
            },
        }
    }

    /// Whether the first declaration found is a class member.
    pub(crate) fn found_in_class(&self, found: &Found) -> bool {
        found
            .first()
            .and_then(|id| self.containing(id))
            .is_some_and(|c| self.kind_of(c).is_class_like())
    }
}
