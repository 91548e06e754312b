//! Declarations.
//!
//! Everything that adds to the symbol graph goes through here, so that the
//! redeclaration rules, implicit members and language gates are applied
//! before the journaled registry mutation.

use cppsym_core::{
    ParentRef, PtrOp, PtrOpKind, Result, SymbolId, SymbolTableError, TypeFlags, TypeInfo, TypeKind,
    Visibility,
};
use tracing::debug;

use crate::lookup::{LookupData, TypeFilter};
use crate::table::SymbolTable;

/// The outcome of a using-declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingDeclaration {
    /// The declarations the name referred to at the point of declaration.
    pub referenced: Vec<SymbolId>,
    /// Their copies in the declaring scope.
    pub declared: Vec<SymbolId>,
}

impl SymbolTable {
    /// Declare `id` in `scope`.
    ///
    /// Fails with `InvalidOverload` when the declaration conflicts with an
    /// existing one of the same name, `RedeclaredTemplateParam` when it
    /// reuses an enclosing template parameter name, and `BadTemplate` for
    /// templates in a place templates cannot be declared.
    pub fn add_symbol(&mut self, scope: SymbolId, id: SymbolId) -> Result<()> {
        let scope = self.lookup_target(scope);
        let (name, kind, is_static, using_of) = {
            let sym = self.symbol(id)?;
            (
                sym.name.clone(),
                sym.kind(),
                sym.type_info.is_static(),
                sym.using_of,
            )
        };
        let scope_kind = self.kind_of(scope);

        if kind == TypeKind::Template {
            self.check_template_placement(scope, id)?;
        }
        if !name.is_empty() {
            self.check_template_parameter_names(scope, &name)?;
            let existing = self
                .symbol(scope)?
                .scope()
                .map(|s| s.lookup(&name).to_vec())
                .unwrap_or_default();
            for previous in existing {
                if !self.is_valid_overload(previous, id)? {
                    return Err(SymbolTableError::InvalidOverload { name });
                }
            }
        }

        if scope_kind == TypeKind::Template && kind != TypeKind::TemplateParameter {
            self.attach_templated(scope, id)?;
        }
        self.registry.add_symbol(scope, id)?;

        if scope_kind == TypeKind::Enumeration && kind == TypeKind::Enumerator {
            if self.symbol(id)?.type_info.type_symbol.is_none() {
                self.set_type_symbol(id, scope)?;
            }
            if let Some(outer) = self.containing(scope) {
                self.registry.alias_symbol(outer, &name, id)?;
            }
        }

        if kind == TypeKind::Function
            && !is_static
            && using_of.is_none()
            && scope_kind.is_class_like()
        {
            self.add_this(id, scope)?;
        }

        debug!(scope = %scope, id = %id, name = %name, kind = ?kind, "declared symbol");
        Ok(())
    }

    /// The implicit `this` of a non-static member function, carrying the
    /// function's cv-qualification on the class.
    fn add_this(&mut self, function: SymbolId, class: SymbolId) -> Result<()> {
        let cv = self.symbol(function)?.type_info.cv_flags();
        let info = TypeInfo::of_symbol(class)
            .with_flags(cv)
            .with_ptr(PtrOp::pointer());
        let this = self.new_symbol_with("this", info);
        self.registry.add_symbol(function, this)
    }

    /// The first declaration in a template becomes its templated symbol.
    fn attach_templated(&mut self, template: SymbolId, id: SymbolId) -> Result<()> {
        let (templated, template_name) = {
            let sym = self.symbol(template)?;
            (sym.template().and_then(|t| t.templated), sym.name.clone())
        };
        if templated.is_some() {
            return Ok(());
        }
        let (name, is_virtual_function) = {
            let sym = self.symbol(id)?;
            (
                sym.name.clone(),
                sym.is(TypeKind::Function) && sym.type_info.has_flag(TypeFlags::VIRTUAL),
            )
        };
        if is_virtual_function
            && self
                .containing(template)
                .is_some_and(|c| self.kind_of(c).is_class_like())
        {
            return Err(SymbolTableError::bad_template(
                name,
                "member function templates cannot be virtual",
            ));
        }
        self.registry.modify(template, |t| {
            if template_name.is_empty() {
                t.name = name;
            }
            if let Some(data) = t.template_mut() {
                data.templated = Some(id);
            }
        })
    }

    /// Templates may only be declared at namespace or class scope, and a
    /// member function template cannot be virtual.
    fn check_template_placement(&self, scope: SymbolId, template: SymbolId) -> Result<()> {
        let name = self.name(template).to_string();
        if !self.config.is_cpp() {
            return Err(SymbolTableError::bad_template(name, "templates require C++"));
        }
        let scope_kind = self.kind_of(scope);
        if scope_kind != TypeKind::Namespace && !scope_kind.is_class_like() {
            return Err(SymbolTableError::bad_template(
                name,
                "a template must be declared at namespace or class scope",
            ));
        }
        let virtual_member = self
            .symbol(template)?
            .template()
            .and_then(|t| t.templated)
            .and_then(|f| self.get(f))
            .is_some_and(|f| f.is(TypeKind::Function) && f.type_info.has_flag(TypeFlags::VIRTUAL));
        if virtual_member && scope_kind.is_class_like() {
            return Err(SymbolTableError::bad_template(
                name,
                "member function templates cannot be virtual",
            ));
        }
        Ok(())
    }

    /// A template parameter name may not be reused anywhere in the template.
    fn check_template_parameter_names(&self, scope: SymbolId, name: &str) -> Result<()> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let Some(sym) = self.get(id) else {
                break;
            };
            if !sym.is(TypeKind::Template) && !sym.is_template_member {
                break;
            }
            if let Some(template) = sym.template()
                && template.params.iter().any(|&p| self.name(p) == name)
            {
                return Err(SymbolTableError::RedeclaredTemplateParam {
                    name: name.to_string(),
                });
            }
            current = sym.containing;
        }
        Ok(())
    }

    // ==========================================================================
    // Redeclaration rules
    // ==========================================================================

    /// Whether `new` may be declared in a scope that already declares
    /// `previous` under the same name.
    fn is_valid_overload(&mut self, previous: SymbolId, new: SymbolId) -> Result<bool> {
        let (p_forward, p_definition, p_invisible, p_kind) = {
            let p = self.symbol(previous)?;
            (p.is_forward, p.definition, p.is_invisible, p.kind())
        };
        let (n_forward, n_kind) = {
            let n = self.symbol(new)?;
            (n.is_forward, n.kind())
        };

        if p_forward {
            if p_definition == Some(new) {
                return Ok(true);
            }
            let completes = p_kind == n_kind
                && !n_forward
                && (p_invisible || !p_kind.is_function_like() || self.has_same_parameters(previous, new));
            if completes {
                self.registry.set_definition(previous, new)?;
                return Ok(true);
            }
        } else if n_forward && p_kind == n_kind {
            let redeclares = !p_kind.is_function_like() || self.has_same_parameters(previous, new);
            if redeclares {
                self.registry.set_definition(new, previous)?;
                return Ok(true);
            }
        }

        let p_object = self.is_object_or_function(previous);
        let n_object = self.is_object_or_function(new);
        if (p_kind.is_elaborated() && n_object) || (n_kind.is_elaborated() && p_object) {
            return Ok(true);
        }

        if p_kind.is_function_like() && n_kind.is_function_like() {
            if !self.has_same_parameters(previous, new) {
                return Ok(true);
            }
            let p = &self.symbol(previous)?.type_info;
            let n = &self.symbol(new)?.type_info;
            if p.is_static() || n.is_static() {
                return Ok(false);
            }
            return Ok(p.cv_flags() != n.cv_flags());
        }

        let p_function = p_kind.is_function_like() || self.is_function_template(previous);
        let n_function = n_kind.is_function_like() || self.is_function_template(new);
        Ok(p_function && n_function)
    }

    /// Objects, functions and function templates: the declarations that
    /// hide a class of the same name.
    fn is_object_or_function(&self, id: SymbolId) -> bool {
        let kind = self.kind_of(id);
        kind == TypeKind::Type
            || kind.is_function_like()
            || kind.is_between(TypeKind::CBool, TypeKind::Enumerator)
            || self.is_function_template(id)
    }

    // ==========================================================================
    // Classes
    // ==========================================================================

    /// `class C : public P`.
    pub fn add_parent(&mut self, class: SymbolId, parent: SymbolId) -> Result<()> {
        self.add_parent_with(class, parent, false, Visibility::Public)
    }

    pub fn add_parent_with(
        &mut self,
        class: SymbolId,
        parent: SymbolId,
        is_virtual: bool,
        visibility: Visibility,
    ) -> Result<()> {
        let offset = self.symbol(class)?.parents().len();
        self.registry.add_parent(
            class,
            ParentRef {
                parent,
                is_virtual,
                visibility,
                offset,
            },
        )?;
        debug!(class = %class, parent = %parent, is_virtual, "added base class");
        Ok(())
    }

    pub fn add_constructor(&mut self, class: SymbolId, constructor: SymbolId) -> Result<()> {
        let class_name = self.name(class).to_string();
        if !self.kind_of(class).is_class_like() {
            return Err(SymbolTableError::BadTypeInfo { name: class_name });
        }
        if self.kind_of(constructor) != TypeKind::Constructor {
            return Err(SymbolTableError::BadTypeInfo {
                name: self.name(constructor).to_string(),
            });
        }
        let existing = self
            .symbol(class)?
            .class()
            .map(|c| c.constructors.clone())
            .unwrap_or_default();
        for previous in existing {
            if !self.is_valid_overload(previous, constructor)? {
                return Err(SymbolTableError::InvalidOverload { name: class_name });
            }
        }
        self.registry.add_constructor(class, constructor)
    }

    /// Synthesize `C(const C&)`.
    pub fn add_copy_constructor(&mut self, class: SymbolId) -> Result<SymbolId> {
        let name = self.name(class).to_string();
        let constructor = self.new_constructor(name);
        let param = TypeInfo::of_symbol(class)
            .with_flags(TypeFlags::CONST)
            .with_ptr(PtrOp::reference());
        self.add_parameter_type(constructor, param)?;
        self.add_constructor(class, constructor)?;
        Ok(constructor)
    }

    pub fn add_friend(&mut self, class: SymbolId, friend: SymbolId) -> Result<()> {
        self.registry.add_friend(class, friend)
    }

    /// `friend <kind> name;` inside `class`.
    ///
    /// An existing declaration becomes the friend. Otherwise an invisible
    /// forward declaration is introduced in the nearest enclosing namespace,
    /// which ordinary lookup ignores until the entity is really declared.
    pub fn declare_friend(&mut self, class: SymbolId, name: &str, kind: TypeKind) -> Result<SymbolId> {
        if let Some(existing) = self.lookup_for_friendship(class, name)? {
            self.add_friend(class, existing)?;
            return Ok(existing);
        }
        let mut namespace = self.containing(class).unwrap_or(self.root());
        while self.kind_of(namespace) != TypeKind::Namespace {
            match self.containing(namespace) {
                Some(outer) => namespace = outer,
                None => break,
            }
        }
        let forward = self.new_forward_declaration(name, kind);
        self.registry.detached_mut(forward)?.is_invisible = true;
        self.add_symbol(namespace, forward)?;
        self.add_friend(class, forward)?;
        Ok(forward)
    }

    pub fn is_friend(&self, class: SymbolId, symbol: SymbolId) -> bool {
        let symbol = self.resolve_forward(symbol);
        self.get(class)
            .and_then(|c| c.class())
            .is_some_and(|c| c.friends.iter().any(|&f| self.resolve_forward(f) == symbol))
    }

    /// `enum E { name }`: declared in the enumeration, visible around it.
    pub fn add_enumerator(&mut self, enumeration: SymbolId, name: &str) -> Result<SymbolId> {
        let info = TypeInfo::new(TypeKind::Enumerator).with_symbol(enumeration);
        let enumerator = self.new_symbol_with(name, info);
        self.add_symbol(enumeration, enumerator)?;
        Ok(enumerator)
    }

    /// Complete the forward declaration `forward` with `definition`.
    pub fn set_forward_definition(&mut self, forward: SymbolId, definition: SymbolId) -> Result<()> {
        if !self.symbol(forward)?.is_forward {
            return Err(SymbolTableError::BadTypeInfo {
                name: self.name(forward).to_string(),
            });
        }
        self.registry.set_definition(forward, definition)
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    pub fn add_parameter(&mut self, function: SymbolId, param: SymbolId) -> Result<()> {
        if !self.kind_of(function).is_function_like() {
            return Err(SymbolTableError::BadTypeInfo {
                name: self.name(function).to_string(),
            });
        }
        let name = self.name(param).to_string();
        if !name.is_empty() {
            self.check_template_parameter_names(function, &name)?;
        }
        self.registry.add_parameter(function, param)
    }

    /// An unnamed parameter of type `info`.
    pub fn add_parameter_type(&mut self, function: SymbolId, info: TypeInfo) -> Result<SymbolId> {
        let param = self.new_symbol_with("", info);
        self.add_parameter(function, param)?;
        Ok(param)
    }

    // ==========================================================================
    // Using
    // ==========================================================================

    /// `using namespace N;` in `scope`.
    pub fn add_using_directive(&mut self, scope: SymbolId, namespace: SymbolId) -> Result<()> {
        let name = self.name(namespace).to_string();
        if !self.config.is_cpp() {
            return Err(SymbolTableError::InvalidUsing {
                name,
                detail: "using-directives require C++".into(),
            });
        }
        let target = self.lookup_target(namespace);
        if self.kind_of(target) != TypeKind::Namespace {
            return Err(SymbolTableError::InvalidUsing {
                name,
                detail: "not a namespace".into(),
            });
        }
        if self.registry.add_using_directive(scope, target) {
            debug!(scope = %scope, namespace = %target, "added using-directive");
        }
        Ok(())
    }

    /// `using Q::name;` in `scope`, or `using ::name` style lookup from
    /// `scope` itself when `qualifying` is `None`.
    ///
    /// Each declaration the name refers to right now is copied into
    /// `scope`. Declarations added to the source later are not seen through
    /// the copies.
    pub fn add_using_declaration(
        &mut self,
        scope: SymbolId,
        qualifying: Option<SymbolId>,
        name: &str,
    ) -> Result<UsingDeclaration> {
        if !self.config.is_cpp() {
            return Err(SymbolTableError::InvalidUsing {
                name: name.to_string(),
                detail: "using-declarations require C++".into(),
            });
        }
        let mut data = LookupData::new(name, TypeFilter::any(), scope);
        match qualifying {
            Some(q) => {
                data.qualified = true;
                self.lookup_scope(&mut data, q)?;
            }
            None => self.lookup_scope(&mut data, scope)?,
        }
        let Some(found) = data.found else {
            return Err(SymbolTableError::InvalidUsing {
                name: name.to_string(),
                detail: "no such declaration".into(),
            });
        };

        let referenced = found.ids();
        let mut declared = Vec::with_capacity(referenced.len());
        for &original in &referenced {
            if !self.ok_to_add_using_declaration(original, scope)? {
                return Err(SymbolTableError::InvalidUsing {
                    name: name.to_string(),
                    detail: "not a member of a base class".into(),
                });
            }
            let origin = self.using_origin(original);
            let existing = self
                .symbol(scope)?
                .scope()
                .map(|s| s.lookup(name).to_vec())
                .unwrap_or_default()
                .into_iter()
                .find(|&e| e != original && self.using_origin(e) == origin);
            if let Some(existing) = existing {
                declared.push(existing);
                continue;
            }

            let mut copy = self.symbol(original)?.clone();
            copy.using_of = Some(original);
            copy.containing = None;
            let id = self.registry.create(copy);
            self.add_symbol(scope, id)?;
            declared.push(id);
        }
        debug!(scope = %scope, name = %name, count = declared.len(), "added using-declaration");
        Ok(UsingDeclaration {
            referenced,
            declared,
        })
    }

    /// Inside a class, a using-declaration must name a member of a base
    /// class. A member of a class template is never eligible.
    pub fn ok_to_add_using_declaration(&self, symbol: SymbolId, context: SymbolId) -> Result<bool> {
        let sym = self.symbol(symbol)?;
        if sym.is_template_member
            && sym
                .containing
                .is_some_and(|c| self.kind_of(c) == TypeKind::Template)
        {
            return Ok(false);
        }
        if !self.kind_of(context).is_class_like() {
            return Ok(true);
        }
        let mut container = sym.containing;
        if sym.is(TypeKind::Enumerator) {
            container = container.and_then(|c| self.containing(c));
        }
        if container.is_some_and(|c| self.kind_of(c) == TypeKind::Union) {
            container = container.and_then(|c| self.containing(c));
        }
        let Some(container) = container else {
            return Ok(false);
        };
        Ok(matches!(self.has_base_class(context, container, false)?, Some(n) if n > 0))
    }

    // ==========================================================================
    // Template declarations
    // ==========================================================================

    /// Add `param` to the parameter list of `template`.
    ///
    /// A non-type parameter declared as an array or a function is adjusted
    /// to the corresponding pointer.
    pub fn add_template_parameter(&mut self, template: SymbolId, param: SymbolId) -> Result<()> {
        let (template_name, has_list) = {
            let t = self.symbol(template)?;
            (t.name.clone(), t.template().is_some())
        };
        if !self.config.is_cpp() {
            return Err(SymbolTableError::bad_template(template_name, "templates require C++"));
        }
        if !has_list {
            return Err(SymbolTableError::BadTypeInfo {
                name: template_name,
            });
        }
        let (name, info) = {
            let p = self.symbol(param)?;
            (p.name.clone(), p.type_info.clone())
        };
        if info.kind != TypeKind::TemplateParameter {
            return Err(SymbolTableError::BadTemplateParameter { name });
        }
        if !name.is_empty() {
            if name == template_name {
                return Err(SymbolTableError::BadTemplateParameter { name });
            }
            let duplicate = self
                .symbol(template)?
                .params()
                .iter()
                .any(|&p| self.name(p) == name);
            if duplicate {
                return Err(SymbolTableError::RedeclaredTemplateParam { name });
            }
        }

        let adjusted = adjust_non_type_parameter(self, &info);
        if adjusted != info {
            self.registry.modify(param, |p| p.type_info = adjusted)?;
        }
        self.registry.add_template_parameter(template, param)
    }
}

/// Array and function non-type parameters decay to pointers.
fn adjust_non_type_parameter(table: &SymbolTable, info: &TypeInfo) -> TypeInfo {
    let mut adjusted = info.clone();
    match info.template_param_kind {
        Some(TypeKind::TypeName) | Some(TypeKind::Template) | None => return adjusted,
        _ => {}
    }
    if let Some(first) = adjusted.ptr_ops.first_mut()
        && first.kind == PtrOpKind::Array
    {
        first.kind = PtrOpKind::Pointer;
        return adjusted;
    }
    let names_function = info.template_param_kind == Some(TypeKind::Function)
        || info
            .type_symbol
            .is_some_and(|s| table.kind_of(s) == TypeKind::Function);
    if names_function && adjusted.ptr_ops.is_empty() {
        adjusted.ptr_ops.push(PtrOp::pointer());
    }
    adjusted
}
