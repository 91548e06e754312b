//! The `SymbolTable` facade.
//!
//! A [`SymbolTable`] owns the [`SymbolRegistry`] of one translation unit
//! together with its configuration. Every semantic operation (lookup,
//! overload resolution, template instantiation) is an inherent method,
//! spread over the modules of this crate by concern.

use cppsym_core::{
    PtrOp, Result, Symbol, SymbolId, SymbolTableError, TypeFlags, TypeInfo, TypeKind, Visibility,
};
use cppsym_registry::SymbolRegistry;
use tracing::debug;

use crate::config::SymbolTableConfig;

/// Symbol table for one translation unit.
///
/// # Example
///
/// ```
/// use cppsym_core::TypeKind;
/// use cppsym_semantics::SymbolTable;
///
/// let mut table = SymbolTable::cpp();
/// let root = table.root();
/// let x = table.new_symbol("x", TypeKind::Int);
/// table.add_symbol(root, x).unwrap();
/// assert_eq!(table.lookup(root, "x").unwrap(), Some(x));
/// ```
pub struct SymbolTable {
    pub(crate) registry: SymbolRegistry,
    pub(crate) config: SymbolTableConfig,
    /// Nesting of instantiations currently in progress.
    pub(crate) instantiation_depth: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new(SymbolTableConfig::default())
    }
}

impl SymbolTable {
    pub fn new(config: SymbolTableConfig) -> Self {
        debug!(language = ?config.language, "creating symbol table");
        Self {
            registry: SymbolRegistry::new(),
            config,
            instantiation_depth: 0,
        }
    }

    pub fn cpp() -> Self {
        Self::new(SymbolTableConfig::cpp())
    }

    pub fn c() -> Self {
        Self::new(SymbolTableConfig::c())
    }

    pub fn config(&self) -> &SymbolTableConfig {
        &self.config
    }

    /// The compilation unit: an unnamed namespace.
    #[inline]
    pub fn root(&self) -> SymbolId {
        self.registry.root()
    }

    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    #[inline]
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.registry.get(id)
    }

    #[inline]
    pub fn symbol(&self, id: SymbolId) -> Result<&Symbol> {
        self.registry.symbol(id)
    }

    /// The name of `id`, empty for unknown ids.
    pub fn name(&self, id: SymbolId) -> &str {
        self.get(id).map(|s| s.name.as_str()).unwrap_or("")
    }

    // ==========================================================================
    // Symbol factories
    // ==========================================================================

    /// A new, undeclared symbol of `kind`.
    pub fn new_symbol(&mut self, name: impl Into<String>, kind: TypeKind) -> SymbolId {
        self.new_symbol_with(name, TypeInfo::new(kind))
    }

    pub fn new_symbol_with(&mut self, name: impl Into<String>, info: TypeInfo) -> SymbolId {
        self.registry.create(Symbol::new(name, info))
    }

    /// `typedef <target> name;`
    ///
    /// A typedef of a builtin keeps the builtin kind, so flattening reaches
    /// it without another hop.
    pub fn new_typedef(&mut self, name: impl Into<String>, target: TypeInfo) -> SymbolId {
        self.new_symbol_with(name, target.with_flags(TypeFlags::TYPEDEF))
    }

    pub fn new_namespace(&mut self, name: impl Into<String>) -> SymbolId {
        self.new_symbol(name, TypeKind::Namespace)
    }

    /// A class, struct, union or enumeration.
    pub fn new_class(&mut self, name: impl Into<String>, kind: TypeKind) -> Result<SymbolId> {
        let name = name.into();
        if !kind.is_elaborated() {
            return Err(SymbolTableError::BadTypeInfo { name });
        }
        Ok(self.new_symbol(name, kind))
    }

    pub fn new_function(&mut self, name: impl Into<String>) -> SymbolId {
        self.new_symbol(name, TypeKind::Function)
    }

    pub fn new_constructor(&mut self, name: impl Into<String>) -> SymbolId {
        self.new_symbol(name, TypeKind::Constructor)
    }

    pub fn new_template(&mut self, name: impl Into<String>) -> SymbolId {
        self.new_symbol(name, TypeKind::Template)
    }

    /// A template parameter. `param_kind` is `TypeName` for a type
    /// parameter, `Template` for a template template parameter and the
    /// value type for a non-type parameter.
    pub fn new_template_parameter(
        &mut self,
        name: impl Into<String>,
        param_kind: TypeKind,
    ) -> SymbolId {
        let info = TypeInfo::new(TypeKind::TemplateParameter).with_template_param_kind(param_kind);
        let mut symbol = Symbol::new(name, info);
        if param_kind == TypeKind::Template {
            symbol.data = cppsym_core::SymbolData::Template(Default::default());
        }
        self.registry.create(symbol)
    }

    pub fn new_forward_declaration(&mut self, name: impl Into<String>, kind: TypeKind) -> SymbolId {
        let mut symbol = Symbol::new(name, TypeInfo::new(kind));
        symbol.is_forward = true;
        self.registry.create(symbol)
    }

    // ==========================================================================
    // Journaled edits
    // ==========================================================================

    pub fn set_type_info(&mut self, id: SymbolId, info: TypeInfo) -> Result<()> {
        self.registry.modify(id, |s| s.type_info = info)
    }

    /// Adds `flags` to the symbol's type.
    pub fn set_flags(&mut self, id: SymbolId, flags: TypeFlags) -> Result<()> {
        self.registry.modify(id, |s| s.type_info.flags |= flags)
    }

    pub fn set_type_symbol(&mut self, id: SymbolId, target: SymbolId) -> Result<()> {
        self.registry.modify(id, |s| s.type_info.type_symbol = Some(target))
    }

    pub fn add_ptr_op(&mut self, id: SymbolId, op: PtrOp) -> Result<()> {
        self.registry.modify(id, |s| s.type_info.ptr_ops.push(op))
    }

    pub fn set_visibility(&mut self, id: SymbolId, visibility: Visibility) -> Result<()> {
        self.registry.modify(id, |s| s.visibility = visibility)
    }

    pub fn set_return_type(&mut self, function: SymbolId, info: TypeInfo) -> Result<()> {
        let name = self.name(function).to_string();
        self.registry
            .modify(function, |s| s.function_mut().map(|f| f.return_type = Some(info)))?
            .ok_or(SymbolTableError::BadTypeInfo { name })
    }

    pub fn set_has_var_args(&mut self, function: SymbolId, has_var_args: bool) -> Result<()> {
        let name = self.name(function).to_string();
        self.registry
            .modify(function, |s| {
                s.function_mut().map(|f| f.has_var_args = has_var_args)
            })?
            .ok_or(SymbolTableError::BadTypeInfo { name })
    }

    // ==========================================================================
    // Transactions
    // ==========================================================================

    pub fn set_mark(&mut self) -> cppsym_core::Mark {
        self.registry.set_mark()
    }

    pub fn roll_back(&mut self, mark: cppsym_core::Mark) -> bool {
        self.registry.roll_back(mark)
    }

    pub fn commit(&mut self, mark: cppsym_core::Mark) -> bool {
        self.registry.commit(mark)
    }

    // ==========================================================================
    // Small queries shared across modules
    // ==========================================================================

    pub(crate) fn kind_of(&self, id: SymbolId) -> TypeKind {
        self.get(id).map(Symbol::kind).unwrap_or_default()
    }

    pub(crate) fn containing(&self, id: SymbolId) -> Option<SymbolId> {
        self.get(id).and_then(|s| s.containing)
    }

    /// The declaration a symbol introduced by a using-declaration stands for.
    pub(crate) fn using_origin(&self, id: SymbolId) -> SymbolId {
        let mut current = id;
        while let Some(next) = self.get(current).and_then(|s| s.using_of) {
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_class_rejects_non_elaborated_kind() {
        let mut table = SymbolTable::cpp();
        assert!(table.new_class("A", TypeKind::Struct).is_ok());
        let err = table.new_class("f", TypeKind::Function).unwrap_err();
        assert!(matches!(err, SymbolTableError::BadTypeInfo { .. }));
    }

    #[test]
    fn template_template_parameter_has_parameter_list() {
        let mut table = SymbolTable::cpp();
        let tt = table.new_template_parameter("TT", TypeKind::Template);
        let t = table.new_template_parameter("T", TypeKind::TypeName);
        assert!(table.symbol(tt).unwrap().template().is_some());
        assert!(table.symbol(t).unwrap().template().is_none());
        assert_eq!(
            table.symbol(t).unwrap().type_info.template_param_kind,
            Some(TypeKind::TypeName)
        );
    }

    #[test]
    fn edits_roll_back() {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        let f = table.new_function("f");
        table.add_symbol(root, f).unwrap();

        let mark = table.set_mark();
        table.set_return_type(f, TypeInfo::new(TypeKind::Int)).unwrap();
        table.set_visibility(f, Visibility::Private).unwrap();
        assert!(table.roll_back(mark));

        let sym = table.symbol(f).unwrap();
        assert!(sym.function().unwrap().return_type.is_none());
        assert_eq!(sym.visibility, Visibility::Public);
    }

    #[test]
    fn return_type_needs_function() {
        let mut table = SymbolTable::cpp();
        let x = table.new_symbol("x", TypeKind::Int);
        assert!(table.set_return_type(x, TypeInfo::new(TypeKind::Int)).is_err());
    }
}
