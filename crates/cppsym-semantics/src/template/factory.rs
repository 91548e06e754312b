//! Declarations under `template<...>` headers.
//!
//! The parser opens a [`TemplateFactory`] when it meets a template header,
//! pushes one template per header and one symbol per template-qualified
//! name in the declarator (`A<T>::` in `template<class T> void A<T>::f()`),
//! and finally hands over the declaration. The factory works out which
//! kind of declaration that is:
//!
//! | headers vs qualifiers | declaration |
//! |-----------------------|-------------|
//! | one more header, `template<>` | explicit specialization of a function template |
//! | one more header, nothing declared yet | new primary template |
//! | one more header, forward declaration found | definition of that template |
//! | equal | out-of-class definition of a member |
//! | a `template<>` header matched to a qualifier | explicit specialization of a member |
//!
//! [`TemplateFactory::add_template_id`] covers `name<args>` declarators:
//! partial and explicit specializations of class templates and explicit
//! specializations of function templates.

use cppsym_core::{Result, SymbolId, SymbolTableError, TypeInfo, TypeKind};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::table::SymbolTable;

/// Builder for one declaration under template headers.
#[derive(Debug, Clone)]
pub struct TemplateFactory {
    containing: SymbolId,
    templates: Vec<SymbolId>,
    symbols: Vec<SymbolId>,
    template_ids: FxHashMap<SymbolId, Vec<TypeInfo>>,
}

impl TemplateFactory {
    pub fn new(containing: SymbolId) -> Self {
        Self {
            containing,
            templates: Vec::new(),
            symbols: Vec::new(),
            template_ids: FxHashMap::default(),
        }
    }

    /// The scope the declaration appears in.
    pub fn containing(&self) -> SymbolId {
        self.containing
    }

    /// A `template<...>` header, outermost first.
    pub fn push_template(&mut self, template: SymbolId) {
        self.templates.push(template);
    }

    /// A qualifier of the declarator, outermost first.
    pub fn push_symbol(&mut self, symbol: SymbolId) {
        self.symbols.push(symbol);
    }

    /// A qualifier written as a template-id, such as `A<int>` in
    /// `template<> void A<int>::f()`.
    pub fn push_template_id(&mut self, symbol: SymbolId, args: Vec<TypeInfo>) {
        self.symbols.push(symbol);
        self.template_ids.insert(symbol, args);
    }

    // ==========================================================================
    // Lookups
    // ==========================================================================

    /// Unqualified lookup from the declaration: the headers' parameters,
    /// innermost first, then the enclosing scope.
    pub fn lookup(&self, table: &mut SymbolTable, name: &str) -> Result<Option<SymbolId>> {
        for &template in self.templates.iter().rev() {
            if let Some(found) = table.lookup_member_for_definition(template, name)? {
                return Ok(Some(found));
            }
        }
        table.lookup(self.containing, name)
    }

    /// The declaration `name` completes, in the innermost qualifier (or the
    /// enclosing scope without qualifiers). A template yields its templated
    /// declaration.
    pub fn lookup_member_for_definition(&self, table: &mut SymbolTable, name: &str) -> Result<Option<SymbolId>> {
        let scope = self.last_symbol(table).unwrap_or(self.containing);
        let found = table.lookup_member_for_definition(scope, name)?;
        Ok(found.map(|id| templated_of(table, id).unwrap_or(id)))
    }

    pub fn lookup_method_for_definition(
        &self,
        table: &mut SymbolTable,
        name: &str,
        params: &[TypeInfo],
    ) -> Result<Option<SymbolId>> {
        if let Some(last) = self.last_symbol(table)
            && let Some(found) = table.lookup_method_for_definition(last, name, params)?
        {
            return Ok(Some(found));
        }
        table.lookup_method_for_definition(self.containing, name, params)
    }

    /// The scope a qualifier `name<args>::` refers to while defining
    /// something: the primary template's class when `args` are its own
    /// parameters, a partial specialization's class when they spell its
    /// pattern, otherwise the explicit specialization or instance.
    pub fn lookup_template_id_for_definition(
        &self,
        table: &mut SymbolTable,
        name: &str,
        args: &[TypeInfo],
    ) -> Result<Option<SymbolId>> {
        let scope = self.last_symbol(table).unwrap_or(self.containing);
        let Some(found) = table.lookup_member_for_definition(scope, name)? else {
            return Ok(None);
        };
        let found = if table.symbol(found)?.is(TypeKind::Template) {
            let selected = table.select_template_or_specialization(found, args)?;
            templated_of(table, selected).unwrap_or(selected)
        } else {
            found
        };
        let found = table.resolve_forward(found);
        Ok(table.symbol(found)?.scope().is_some().then_some(found))
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    /// Declare `symbol` under the pushed headers and qualifiers.
    pub fn add_symbol(&mut self, table: &mut SymbolTable, symbol: SymbolId) -> Result<()> {
        let name = table.name(symbol).to_string();
        self.symbols.retain(|&s| owning_template(table, s).is_some());

        let mut explicit_container = None;
        for (i, &qualifier) in self.symbols.iter().enumerate() {
            let Some(&header) = self.templates.get(i) else {
                return Err(SymbolTableError::bad_template(name, "more qualifiers than template headers"));
            };
            if table.symbol(header)?.params().is_empty() {
                explicit_container = Some(qualifier);
            } else if explicit_container.is_some() {
                return Err(SymbolTableError::bad_template(name, "template header inside an explicit specialization"));
            }
        }
        if let Some(container) = explicit_container {
            return self.define_specialized_member(table, container, symbol);
        }

        if self.templates.len() == self.symbols.len() + 1 {
            self.declare_template(table, symbol)
        } else if self.templates.len() == self.symbols.len() {
            self.define_member(table, symbol)
        } else {
            Err(SymbolTableError::bad_template(name, "template headers do not match the declarator"))
        }
    }

    /// Declare `symbol`, written `name<args>`, under the pushed headers.
    ///
    /// With a `template<>` header this is an explicit specialization, with
    /// parameters a partial specialization of a class template.
    pub fn add_template_id(&mut self, table: &mut SymbolTable, symbol: SymbolId, args: Vec<TypeInfo>) -> Result<()> {
        let name = table.name(symbol).to_string();
        let Some(&header) = self.templates.last() else {
            return Err(SymbolTableError::bad_template(name, "template-id declared without a template header"));
        };
        let scope = self.last_symbol(table).unwrap_or(self.containing);
        let is_function = table.symbol(symbol)?.kind().is_function_like();
        let explicit = table.symbol(header)?.params().is_empty();

        if is_function {
            if !explicit {
                return Err(SymbolTableError::bad_template(
                    name,
                    "function templates cannot be partially specialized",
                ));
            }
            table.check_for_template_explicit_specialization(scope, symbol, Some(&args))?;
            return Ok(());
        }

        let primary = match table.lookup_member_for_definition(scope, &name)? {
            Some(found) if table.kind_of(found) == TypeKind::Template => Some(found),
            Some(found) => owning_template(table, found),
            None => None,
        };
        let Some(primary) = primary else {
            return Err(SymbolTableError::bad_template(name, "no primary template"));
        };

        if explicit {
            let args = table.normalize_arguments(primary, &args)?;
            table.add_explicit_specialization(primary, args, symbol)?;
            debug!(template = %primary, symbol = %symbol, "explicit specialization");
            return Ok(());
        }

        // An earlier declaration of the same partial specialization.
        let specializations = table
            .symbol(primary)?
            .template()
            .map(|t| t.specializations.clone())
            .unwrap_or_default();
        for spec in specializations {
            let pattern = table.symbol(spec)?.template().map(|t| t.pattern.clone()).unwrap_or_default();
            let same = pattern.len() == args.len()
                && pattern
                    .iter()
                    .zip(&args)
                    .all(|(p, a)| table.types_equal(&table.flatten(p), &table.flatten(a)));
            if same {
                self.symbols.push(templated_of(table, spec).unwrap_or(spec));
                self.map_definition_parameters(table, symbol)?;
                return table.add_symbol(spec, symbol);
            }
        }

        table.registry.modify(header, |t| {
            t.name = name.clone();
            if let Some(data) = t.template_mut() {
                data.pattern = args;
            }
        })?;
        table.add_symbol(header, symbol)?;
        table.add_specialization(primary, header)?;
        debug!(template = %primary, specialization = %header, "partial specialization");
        Ok(())
    }

    /// One header more than qualifiers: a template declared (or defined)
    /// by this declaration.
    fn declare_template(&mut self, table: &mut SymbolTable, symbol: SymbolId) -> Result<()> {
        let name = table.name(symbol).to_string();
        let header = self.templates[self.symbols.len()];
        let scope = self.last_symbol(table).unwrap_or(self.containing);

        if table.symbol(header)?.params().is_empty() {
            table.check_for_template_explicit_specialization(scope, symbol, None)?;
            return Ok(());
        }

        let Some(previous) = self.find_previous(table, symbol)? else {
            if scope != self.containing {
                return Err(SymbolTableError::bad_template(name, "member template was never declared"));
            }
            table.add_symbol(header, symbol)?;
            table.add_symbol(self.containing, header)?;
            debug!(template = %header, symbol = %symbol, "new template");
            return Ok(());
        };

        let (original_template, original) = if table.symbol(previous)?.is(TypeKind::Template) {
            match templated_of(table, previous) {
                Some(templated) => (previous, templated),
                None => return Err(SymbolTableError::bad_template(name, "template declares nothing")),
            }
        } else {
            match owning_template(table, previous) {
                Some(template) => (template, previous),
                None => return Err(SymbolTableError::bad_template(name, "redeclared as a template")),
            }
        };
        if !table.symbol(original)?.is_forward && !table.symbol(symbol)?.is_forward {
            return Err(SymbolTableError::InvalidOverload { name });
        }
        let expected = table.symbol(original_template)?.params().len();
        if expected != table.symbol(header)?.params().len() {
            return Err(SymbolTableError::bad_template(name, "template parameter lists differ"));
        }

        self.symbols.push(original);
        self.map_definition_parameters(table, symbol)?;
        table.add_symbol(original_template, symbol)?;
        debug!(template = %original_template, symbol = %symbol, "template definition");
        Ok(())
    }

    /// As many headers as qualifiers: `template<class T> void A<T>::f()`.
    fn define_member(&mut self, table: &mut SymbolTable, symbol: SymbolId) -> Result<()> {
        let name = table.name(symbol).to_string();
        let Some(previous) = self.find_previous(table, symbol)? else {
            return Err(SymbolTableError::bad_template(name, "member was never declared"));
        };
        if !table.symbol(previous)?.is_forward {
            return Err(SymbolTableError::InvalidOverload { name });
        }
        let Some(owner) = table.containing(previous) else {
            return Err(SymbolTableError::internal(format!("'{name}' has no scope")));
        };
        self.map_definition_parameters(table, symbol)?;
        table.add_symbol(owner, symbol)?;
        debug!(owner = %owner, symbol = %symbol, "member definition");
        Ok(())
    }

    /// `template<> void A<int>::f()`: the definition replaces the member
    /// of the instance named by the qualifier.
    fn define_specialized_member(&mut self, table: &mut SymbolTable, container: SymbolId, symbol: SymbolId) -> Result<()> {
        let name = table.name(symbol).to_string();
        let scope = table.lookup_target(container);
        let candidates = table
            .symbol(scope)?
            .scope()
            .map(|s| s.lookup(&name).to_vec())
            .unwrap_or_default();
        let is_function = table.kind_of(symbol).is_function_like();
        let previous = candidates.into_iter().find(|&c| {
            let Some(sym) = table.get(c) else {
                return false;
            };
            sym.is_forward && (!is_function || table.has_same_parameters(c, symbol))
        });
        let Some(previous) = previous else {
            return Err(SymbolTableError::bad_template(name, "no member declaration to specialize"));
        };
        table.registry.adopt(scope, symbol)?;
        table.registry.set_definition(previous, symbol)?;
        debug!(
            instance = %scope,
            args = ?self.template_ids.get(&container),
            symbol = %symbol,
            "member explicit specialization"
        );
        Ok(())
    }

    /// The earlier declaration `symbol` completes.
    fn find_previous(&self, table: &mut SymbolTable, symbol: SymbolId) -> Result<Option<SymbolId>> {
        let (name, kind) = {
            let sym = table.symbol(symbol)?;
            (sym.name.clone(), sym.kind())
        };
        match kind {
            TypeKind::Function => {
                let params = table.parameter_types(symbol);
                self.lookup_method_for_definition(table, &name, &params)
            }
            TypeKind::Constructor => {
                let Some(class) = self.last_symbol(table) else {
                    return Ok(None);
                };
                let class = table.resolve_forward(class);
                let constructors = table
                    .symbol(class)?
                    .class()
                    .map(|c| c.constructors.clone())
                    .unwrap_or_default();
                Ok(constructors
                    .into_iter()
                    .find(|&c| table.has_same_parameters(c, symbol)))
            }
            _ => {
                let scope = self.last_symbol(table).unwrap_or(self.containing);
                table.lookup_member_for_definition(scope, &name)
            }
        }
    }

    /// Pair each header's parameters with those of the template the
    /// matching qualifier belongs to, so the definition's parameter names
    /// resolve to the declaration's parameters.
    fn map_definition_parameters(&self, table: &mut SymbolTable, definition: SymbolId) -> Result<()> {
        let name = table.name(definition).to_string();
        if self.templates.len() != self.symbols.len() {
            return Err(SymbolTableError::bad_template(name, "template headers do not match the declarator"));
        }
        for (&header, &qualifier) in self.templates.iter().zip(&self.symbols) {
            let Some(original) = owning_template(table, qualifier) else {
                return Err(SymbolTableError::bad_template(name, "qualifier is not a template"));
            };
            let header_params = table.symbol(header)?.params().to_vec();
            let original_params = table.symbol(original)?.params().to_vec();
            if original_params.len() < header_params.len() {
                return Err(SymbolTableError::bad_template(name, "too many template parameters"));
            }
            let pairs = header_params.into_iter().zip(original_params).collect();
            table.add_definition_parameters(original, definition, pairs)?;
        }
        Ok(())
    }

    /// The innermost qualifier as a scope; a deferred instance stands for
    /// its template's class.
    fn last_symbol(&self, table: &SymbolTable) -> Option<SymbolId> {
        let last = *self.symbols.last()?;
        let sym = table.get(last)?;
        if let Some((template, _)) = sym.deferred() {
            return templated_of(table, template).map(|t| table.resolve_forward(t));
        }
        sym.scope().is_some().then_some(last)
    }
}

/// The template a declaration belongs to: the template declaring it, the
/// template an instance was made from, or the template of a deferred
/// instance.
fn owning_template(table: &SymbolTable, id: SymbolId) -> Option<SymbolId> {
    let sym = table.get(id)?;
    if let Some((template, _)) = sym.deferred() {
        return Some(template);
    }
    if let Some(instance) = &sym.instance {
        return Some(instance.template);
    }
    let containing = sym.containing?;
    table.get(containing)?.is(TypeKind::Template).then_some(containing)
}

fn templated_of(table: &SymbolTable, template: SymbolId) -> Option<SymbolId> {
    table.get(template)?.template()?.templated
}

#[cfg(test)]
mod tests {
    use super::*;
    use cppsym_core::PtrOp;

    fn header(table: &mut SymbolTable, params: &[&str]) -> SymbolId {
        let template = table.new_template("");
        for name in params {
            let p = table.new_template_parameter(*name, TypeKind::TypeName);
            table.add_template_parameter(template, p).unwrap();
        }
        template
    }

    fn param_of(table: &SymbolTable, template: SymbolId, i: usize) -> SymbolId {
        table.symbol(template).unwrap().params()[i]
    }

    #[test]
    fn new_primary_template() {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        let mut factory = table.new_template_factory(root);
        let t = header(&mut table, &["T"]);
        factory.push_template(t);
        assert_eq!(factory.lookup(&mut table, "T").unwrap(), Some(param_of(&table, t, 0)));

        let class = table.new_class("A", TypeKind::Class).unwrap();
        factory.add_symbol(&mut table, class).unwrap();

        let found = table.lookup(root, "A").unwrap().unwrap();
        assert_eq!(found, t);
        assert_eq!(table.name(t), "A");
        assert_eq!(table.symbol(t).unwrap().template().unwrap().templated, Some(class));
    }

    #[test]
    fn definition_completes_forward_template() {
        let mut table = SymbolTable::cpp();
        let root = table.root();

        // template<class T> class A;
        let mut factory = table.new_template_factory(root);
        let first = header(&mut table, &["T"]);
        factory.push_template(first);
        let forward = table.new_forward_declaration("A", TypeKind::Class);
        factory.add_symbol(&mut table, forward).unwrap();

        // template<class U> class A { U value; };
        let mut factory = table.new_template_factory(root);
        let second = header(&mut table, &["U"]);
        factory.push_template(second);
        let class = table.new_class("A", TypeKind::Class).unwrap();
        factory.add_symbol(&mut table, class).unwrap();
        let u = param_of(&table, second, 0);
        let value = table.new_symbol_with("value", TypeInfo::of_symbol(u));
        table.add_symbol(class, value).unwrap();

        assert_eq!(table.resolve_forward(forward), class);
        let instance = table.instantiate(first, &[TypeInfo::new(TypeKind::Int)]).unwrap();
        let value = table.qualified_lookup(instance, "value").unwrap().unwrap();
        assert_eq!(table.symbol(value).unwrap().type_info, TypeInfo::new(TypeKind::Int));
    }

    /// `template<class T> class A { T* get(); };` then
    /// `template<class U> U* A<U>::get() { ... }`.
    #[test]
    fn out_of_class_member_definition() {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        let mut factory = table.new_template_factory(root);
        let template = header(&mut table, &["T"]);
        factory.push_template(template);
        let class = table.new_class("A", TypeKind::Class).unwrap();
        factory.add_symbol(&mut table, class).unwrap();
        let t = param_of(&table, template, 0);
        let declared = table.new_forward_declaration("get", TypeKind::Function);
        table
            .set_return_type(declared, TypeInfo::of_symbol(t).with_ptr(PtrOp::pointer()))
            .unwrap();
        table.add_symbol(class, declared).unwrap();

        let mut factory = table.new_template_factory(root);
        let definition_header = header(&mut table, &["U"]);
        factory.push_template(definition_header);
        let u = param_of(&table, definition_header, 0);
        let owner = factory
            .lookup_template_id_for_definition(&mut table, "A", &[TypeInfo::of_symbol(u)])
            .unwrap()
            .unwrap();
        assert_eq!(owner, class);
        factory.push_symbol(owner);

        let definition = table.new_function("get");
        table
            .set_return_type(definition, TypeInfo::of_symbol(u).with_ptr(PtrOp::pointer()))
            .unwrap();
        factory.add_symbol(&mut table, definition).unwrap();

        assert_eq!(table.resolve_forward(declared), definition);
        // U is visible inside the definition.
        assert_eq!(table.lookup(definition, "U").unwrap(), Some(u));

        let instance = table.instantiate(template, &[TypeInfo::new(TypeKind::Char)]).unwrap();
        let get = table.qualified_lookup(instance, "get").unwrap().unwrap();
        let get = table.resolve_forward(get);
        let ret = table.symbol(get).unwrap().function().unwrap().return_type.clone();
        assert_eq!(ret, Some(TypeInfo::new(TypeKind::Char).with_ptr(PtrOp::pointer())));
    }

    #[test]
    fn redefinition_is_rejected() {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        for expect_ok in [true, false] {
            let mut factory = table.new_template_factory(root);
            let t = header(&mut table, &["T"]);
            factory.push_template(t);
            let class = table.new_class("A", TypeKind::Class).unwrap();
            let result = factory.add_symbol(&mut table, class);
            assert_eq!(result.is_ok(), expect_ok);
        }
    }

    #[test]
    fn partial_and_explicit_class_specializations() {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        let mut factory = table.new_template_factory(root);
        let primary = header(&mut table, &["T"]);
        factory.push_template(primary);
        let class = table.new_class("A", TypeKind::Class).unwrap();
        factory.add_symbol(&mut table, class).unwrap();

        // template<class T> class A<T*> {};
        let mut factory = table.new_template_factory(root);
        let partial = header(&mut table, &["T"]);
        factory.push_template(partial);
        let t = param_of(&table, partial, 0);
        let pointer_class = table.new_class("A", TypeKind::Class).unwrap();
        factory
            .add_template_id(&mut table, pointer_class, vec![TypeInfo::of_symbol(t).with_ptr(PtrOp::pointer())])
            .unwrap();

        // template<> class A<int> {};
        let mut factory = table.new_template_factory(root);
        let empty = header(&mut table, &[]);
        factory.push_template(empty);
        let int_class = table.new_class("A", TypeKind::Class).unwrap();
        factory
            .add_template_id(&mut table, int_class, vec![TypeInfo::new(TypeKind::Int)])
            .unwrap();

        let int = TypeInfo::new(TypeKind::Int);
        assert_eq!(table.lookup_template_id(root, "A", std::slice::from_ref(&int)).unwrap(), Some(int_class));

        let from_partial = table
            .lookup_template_id(root, "A", &[int.clone().with_ptr(PtrOp::pointer())])
            .unwrap()
            .unwrap();
        assert_eq!(table.symbol(from_partial).unwrap().instantiated_from, Some(pointer_class));

        let from_primary = table
            .lookup_template_id(root, "A", &[TypeInfo::new(TypeKind::Char)])
            .unwrap()
            .unwrap();
        assert_eq!(table.symbol(from_primary).unwrap().instantiated_from, Some(class));
    }

    #[test]
    fn explicit_function_specialization_deduces_arguments() {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        // template<class T> void f(T);
        let mut factory = table.new_template_factory(root);
        let primary = header(&mut table, &["T"]);
        factory.push_template(primary);
        let t = param_of(&table, primary, 0);
        let f = table.new_function("f");
        table.add_parameter_type(f, TypeInfo::of_symbol(t)).unwrap();
        factory.add_symbol(&mut table, f).unwrap();

        // template<> void f(int);
        let mut factory = table.new_template_factory(root);
        let empty = header(&mut table, &[]);
        factory.push_template(empty);
        let special = table.new_function("f");
        table.add_parameter_type(special, TypeInfo::new(TypeKind::Int)).unwrap();
        factory.add_symbol(&mut table, special).unwrap();

        let explicit = &table.symbol(primary).unwrap().template().unwrap().explicit_specializations;
        assert_eq!(explicit.len(), 1);
        assert_eq!(explicit[0], (vec![TypeInfo::new(TypeKind::Int)], special));
    }

    #[test]
    fn explicit_member_specialization_replaces_the_instance_member() {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        let mut factory = table.new_template_factory(root);
        let template = header(&mut table, &["T"]);
        factory.push_template(template);
        let class = table.new_class("A", TypeKind::Class).unwrap();
        factory.add_symbol(&mut table, class).unwrap();
        let declared = table.new_forward_declaration("f", TypeKind::Function);
        table.add_symbol(class, declared).unwrap();

        // template<> void A<int>::f() {}
        let mut factory = table.new_template_factory(root);
        let empty = header(&mut table, &[]);
        factory.push_template(empty);
        let int = vec![TypeInfo::new(TypeKind::Int)];
        let instance = factory
            .lookup_template_id_for_definition(&mut table, "A", &int)
            .unwrap()
            .unwrap();
        factory.push_template_id(instance, int);
        let definition = table.new_function("f");
        factory.add_symbol(&mut table, definition).unwrap();

        let member = table.qualified_lookup(instance, "f").unwrap().unwrap();
        assert_eq!(table.resolve_forward(member), definition);
        // The template itself is untouched.
        assert_eq!(table.resolve_forward(declared), declared);
    }
}
