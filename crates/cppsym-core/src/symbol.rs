//! Symbols and their kind-specific payloads.
//!
//! A [`Symbol`] is one declared entity. Everything that differs between
//! kinds of declaration lives in [`SymbolData`]:
//!
//! | Declaration | `TypeInfo::kind` | `SymbolData` |
//! |-------------|------------------|--------------|
//! | object, typedef, enumerator, parameter | various | `Plain` |
//! | namespace, block, linkage spec | `Namespace`, `Block`, `Linkage` | `Scope` |
//! | class, struct, union, enum | `Class` .. `Enumeration` | `Class` |
//! | function, constructor | `Function`, `Constructor` | `Function` |
//! | template, partial specialization | `Template` | `Template` |
//! | deferred template-id `A<T>` | `Type` | `DeferredInstance` |
//!
//! Concrete template instances are ordinary symbols of the instantiated
//! kind carrying [`InstanceInfo`].

use rustc_hash::FxHashMap;

use crate::{SymbolId, TypeInfo, TypeKind};

// ============================================================================
// Visibility
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    #[inline]
    pub fn most_restrictive(self, other: Visibility) -> Visibility {
        self.max(other)
    }

    #[inline]
    pub fn least_restrictive(self, other: Visibility) -> Visibility {
        self.min(other)
    }
}

// ============================================================================
// Scopes
// ============================================================================

/// Declarations owned by a scope, in insertion order, with a name index.
///
/// A name maps to every declaration of that name in the scope: one entry
/// normally, several for overloaded functions or a class hidden by an object.
#[derive(Debug, Clone, Default)]
pub struct ScopeData {
    pub contents: Vec<SymbolId>,
    pub names: FxHashMap<String, Vec<SymbolId>>,
}

impl ScopeData {
    pub fn lookup(&self, name: &str) -> &[SymbolId] {
        self.names.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn insert(&mut self, name: &str, id: SymbolId) {
        self.contents.push(id);
        self.names.entry(name.to_string()).or_default().push(id);
    }

    /// Adds a name binding without taking part in `contents` (enumerators
    /// seen from the enclosing scope, for instance).
    pub fn alias(&mut self, name: &str, id: SymbolId) {
        self.names.entry(name.to_string()).or_default().push(id);
    }

    /// Reverses the most recent [`ScopeData::insert`] or [`ScopeData::alias`] of `id`.
    pub fn remove(&mut self, name: &str, id: SymbolId) {
        if let Some(pos) = self.contents.iter().rposition(|&c| c == id) {
            self.contents.remove(pos);
        }
        if let Some(entries) = self.names.get_mut(name) {
            if let Some(pos) = entries.iter().rposition(|&e| e == id) {
                entries.remove(pos);
            }
            if entries.is_empty() {
                self.names.remove(name);
            }
        }
    }
}

/// A base-class clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    /// The base: a class, a template parameter or a deferred instance.
    pub parent: SymbolId,
    pub is_virtual: bool,
    pub visibility: Visibility,
    /// Position of this base in the base-specifier list.
    pub offset: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ClassData {
    pub scope: ScopeData,
    pub parents: Vec<ParentRef>,
    pub constructors: Vec<SymbolId>,
    pub friends: Vec<SymbolId>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionData {
    /// Parameters, the implicit `this` and body declarations.
    pub scope: ScopeData,
    pub params: Vec<SymbolId>,
    pub return_type: Option<TypeInfo>,
    pub has_var_args: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    /// Holds the template parameters by name.
    pub scope: ScopeData,
    pub params: Vec<SymbolId>,
    /// The class or function declared under this template header.
    pub templated: Option<SymbolId>,
    /// Set on partial specializations: the primary template.
    pub specialization_of: Option<SymbolId>,
    /// Argument pattern of a partial specialization, e.g. `<T, T*, I>`.
    pub pattern: Vec<TypeInfo>,
    pub specializations: Vec<SymbolId>,
    /// `template<> ...` declarations keyed by their argument list.
    pub explicit_specializations: Vec<(Vec<TypeInfo>, SymbolId)>,
    /// Out-of-class definitions written with their own parameter names:
    /// definition symbol -> (definition parameter, declared parameter).
    pub definition_params: FxHashMap<SymbolId, Vec<(SymbolId, SymbolId)>>,
}

impl TemplateData {
    pub fn is_specialization(&self) -> bool {
        self.specialization_of.is_some()
    }
}

/// Records which template produced an instance and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub template: SymbolId,
    pub args: Vec<TypeInfo>,
    /// Parameter to argument bindings used for substitution.
    pub argument_map: Vec<(SymbolId, TypeInfo)>,
}

impl InstanceInfo {
    pub fn argument_for(&self, param: SymbolId) -> Option<&TypeInfo> {
        self.argument_map
            .iter()
            .find(|(p, _)| *p == param)
            .map(|(_, arg)| arg)
    }
}

#[derive(Debug, Clone)]
pub enum SymbolData {
    Plain,
    Scope(ScopeData),
    Class(ClassData),
    Function(FunctionData),
    Template(TemplateData),
    /// A template-id whose arguments depend on enclosing template parameters.
    DeferredInstance { template: SymbolId, args: Vec<TypeInfo> },
}

impl SymbolData {
    /// The payload a fresh declaration of `kind` starts with.
    pub fn for_kind(kind: TypeKind) -> Self {
        match kind {
            TypeKind::Namespace | TypeKind::Block | TypeKind::Linkage => {
                SymbolData::Scope(ScopeData::default())
            }
            k if k.is_elaborated() => SymbolData::Class(ClassData::default()),
            k if k.is_function_like() => SymbolData::Function(FunctionData::default()),
            TypeKind::Template => SymbolData::Template(TemplateData::default()),
            _ => SymbolData::Plain,
        }
    }
}

// ============================================================================
// Symbol
// ============================================================================

#[derive(Debug, Clone)]
pub struct Symbol {
    /// Empty for unnamed declarations.
    pub name: String,
    pub type_info: TypeInfo,
    pub containing: Option<SymbolId>,
    /// Nesting depth below the root scope.
    pub depth: u32,
    pub is_forward: bool,
    /// For forward declarations: the declaration that completed it.
    pub definition: Option<SymbolId>,
    /// Friend declarations introduced before the entity is declared.
    pub is_invisible: bool,
    pub visibility: Visibility,
    /// Set on the copies introduced by a using-declaration.
    pub using_of: Option<SymbolId>,
    pub is_template_member: bool,
    /// The declaration this symbol was cloned from during instantiation.
    pub instantiated_from: Option<SymbolId>,
    pub instance: Option<InstanceInfo>,
    pub data: SymbolData,
}

impl Symbol {
    pub fn new(name: impl Into<String>, type_info: TypeInfo) -> Self {
        let data = SymbolData::for_kind(type_info.kind);
        Self {
            name: name.into(),
            type_info,
            containing: None,
            depth: 0,
            is_forward: false,
            definition: None,
            is_invisible: false,
            visibility: Visibility::Public,
            using_of: None,
            is_template_member: false,
            instantiated_from: None,
            instance: None,
            data,
        }
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.type_info.kind
    }

    #[inline]
    pub fn is(&self, kind: TypeKind) -> bool {
        self.type_info.kind == kind
    }

    #[inline]
    pub fn is_between(&self, lo: TypeKind, hi: TypeKind) -> bool {
        self.type_info.kind.is_between(lo, hi)
    }

    /// The name index of a scope-bearing symbol.
    pub fn scope(&self) -> Option<&ScopeData> {
        match &self.data {
            SymbolData::Scope(scope) => Some(scope),
            SymbolData::Class(class) => Some(&class.scope),
            SymbolData::Function(function) => Some(&function.scope),
            SymbolData::Template(template) => Some(&template.scope),
            SymbolData::Plain | SymbolData::DeferredInstance { .. } => None,
        }
    }

    pub fn scope_mut(&mut self) -> Option<&mut ScopeData> {
        match &mut self.data {
            SymbolData::Scope(scope) => Some(scope),
            SymbolData::Class(class) => Some(&mut class.scope),
            SymbolData::Function(function) => Some(&mut function.scope),
            SymbolData::Template(template) => Some(&mut template.scope),
            SymbolData::Plain | SymbolData::DeferredInstance { .. } => None,
        }
    }

    pub fn class(&self) -> Option<&ClassData> {
        match &self.data {
            SymbolData::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn class_mut(&mut self) -> Option<&mut ClassData> {
        match &mut self.data {
            SymbolData::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn function(&self) -> Option<&FunctionData> {
        match &self.data {
            SymbolData::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn function_mut(&mut self) -> Option<&mut FunctionData> {
        match &mut self.data {
            SymbolData::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn template(&self) -> Option<&TemplateData> {
        match &self.data {
            SymbolData::Template(template) => Some(template),
            _ => None,
        }
    }

    pub fn template_mut(&mut self) -> Option<&mut TemplateData> {
        match &mut self.data {
            SymbolData::Template(template) => Some(template),
            _ => None,
        }
    }

    /// Template and arguments of a deferred instance.
    pub fn deferred(&self) -> Option<(SymbolId, &[TypeInfo])> {
        match &self.data {
            SymbolData::DeferredInstance { template, args } => Some((*template, args.as_slice())),
            _ => None,
        }
    }

    pub fn parents(&self) -> &[ParentRef] {
        self.class().map(|c| c.parents.as_slice()).unwrap_or(&[])
    }

    pub fn params(&self) -> &[SymbolId] {
        if let Some(function) = self.function() {
            &function.params
        } else if let Some(template) = self.template() {
            &template.params
        } else {
            &[]
        }
    }

    pub fn is_deferred_instance(&self) -> bool {
        matches!(self.data, SymbolData::DeferredInstance { .. })
    }
}
