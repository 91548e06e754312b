//! Integration tests for the symbol table, driven the way a parser drives it.
//!
//! Each section builds a small translation unit through the public API and
//! checks one observable property of lookup, overload resolution, templates
//! or transactions.

use cppsym::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn int() -> TypeInfo {
    TypeInfo::new(TypeKind::Int)
}

fn class(table: &mut SymbolTable, scope: SymbolId, name: &str) -> SymbolId {
    let id = table.new_class(name, TypeKind::Class).unwrap();
    table.add_symbol(scope, id).unwrap();
    id
}

fn function(table: &mut SymbolTable, scope: SymbolId, name: &str, params: &[TypeInfo]) -> SymbolId {
    let f = table.new_function(name);
    for p in params {
        table.add_parameter_type(f, p.clone()).unwrap();
    }
    table.add_symbol(scope, f).unwrap();
    f
}

// =============================================================================
// Scope resolution
// =============================================================================

#[test]
fn inner_declaration_hides_outer_in_either_order() {
    init_tracing();
    for inner_first in [false, true] {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        let outer = table.new_namespace("outer");
        table.add_symbol(root, outer).unwrap();
        let inner = table.new_namespace("inner");
        table.add_symbol(outer, inner).unwrap();

        let (outer_x, inner_x) = if inner_first {
            let i = table.new_symbol("x", TypeKind::Int);
            table.add_symbol(inner, i).unwrap();
            let o = table.new_symbol("x", TypeKind::Char);
            table.add_symbol(outer, o).unwrap();
            (o, i)
        } else {
            let o = table.new_symbol("x", TypeKind::Char);
            table.add_symbol(outer, o).unwrap();
            let i = table.new_symbol("x", TypeKind::Int);
            table.add_symbol(inner, i).unwrap();
            (o, i)
        };

        assert_eq!(table.lookup(inner, "x").unwrap(), Some(inner_x));
        assert_eq!(table.lookup(outer, "x").unwrap(), Some(outer_x));
        assert_eq!(table.lookup(root, "x").unwrap(), None);
    }
}

/// `struct A { m }; struct B : A {}; struct C : A {}; struct D : B, C {};`
fn diamond(table: &mut SymbolTable, b_before_c: bool) -> (SymbolId, SymbolId) {
    let root = table.root();
    let a = class(table, root, "A");
    let b = class(table, root, "B");
    let c = class(table, root, "C");
    let d = class(table, root, "D");
    table.add_parent(b, a).unwrap();
    table.add_parent(c, a).unwrap();
    if b_before_c {
        table.add_parent(d, b).unwrap();
        table.add_parent(d, c).unwrap();
    } else {
        table.add_parent(d, c).unwrap();
        table.add_parent(d, b).unwrap();
    }
    (a, d)
}

#[test]
fn non_static_member_through_diamond_is_ambiguous() {
    for b_before_c in [true, false] {
        let mut table = SymbolTable::cpp();
        let (a, d) = diamond(&mut table, b_before_c);
        let m = table.new_symbol("m", TypeKind::Int);
        table.add_symbol(a, m).unwrap();

        let err = table.lookup(d, "m").unwrap_err();
        assert_eq!(err.reason(), Reason::Ambiguous);
    }
}

#[test]
fn static_member_and_enumerator_through_diamond_are_not_ambiguous() {
    for b_before_c in [true, false] {
        let mut table = SymbolTable::cpp();
        let (a, d) = diamond(&mut table, b_before_c);

        let s = table.new_symbol("s", TypeKind::Int);
        table.set_flags(s, TypeFlags::STATIC).unwrap();
        table.add_symbol(a, s).unwrap();
        assert_eq!(table.lookup(d, "s").unwrap(), Some(s));

        let e = table.new_class("E", TypeKind::Enumeration).unwrap();
        table.add_symbol(a, e).unwrap();
        let red = table.add_enumerator(e, "red").unwrap();
        assert_eq!(table.lookup(d, "red").unwrap(), Some(red));
    }
}

#[test]
fn using_directive_brings_in_namespace_members() {
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let n = table.new_namespace("N");
    table.add_symbol(root, n).unwrap();
    let x = table.new_symbol("x", TypeKind::Int);
    table.add_symbol(n, x).unwrap();
    let f = table.new_function("f");
    table.add_symbol(root, f).unwrap();

    assert_eq!(table.lookup(f, "x").unwrap(), None);
    table.add_using_directive(f, n).unwrap();
    assert_eq!(table.lookup(f, "x").unwrap(), Some(x));
}

#[test]
fn using_declaration_is_a_snapshot() {
    init_tracing();
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let a = table.new_namespace("A");
    table.add_symbol(root, a).unwrap();
    let b = table.new_namespace("B");
    table.add_symbol(root, b).unwrap();
    let char_arg = TypeInfo::new(TypeKind::Char);

    let f_int = function(&mut table, a, "f", &[int()]);
    let first = table.add_using_declaration(b, Some(a), "f").unwrap();
    assert_eq!(first.referenced, vec![f_int]);

    let f_char = function(&mut table, a, "f", &[char_arg.clone()]);
    let found = table
        .qualified_function_lookup(b, "f", std::slice::from_ref(&char_arg))
        .unwrap()
        .unwrap();
    assert_eq!(found, first.declared[0]);
    assert_eq!(table.symbol(found).unwrap().using_of, Some(f_int));

    // A fresh using-declaration sees the overload added since.
    let second = table.add_using_declaration(b, Some(a), "f").unwrap();
    assert_eq!(second.referenced.len(), 2);
    let found = table
        .qualified_function_lookup(b, "f", &[char_arg])
        .unwrap()
        .unwrap();
    assert_eq!(table.symbol(found).unwrap().using_of, Some(f_char));
}

#[test]
fn argument_dependent_lookup_finds_function_in_class_namespace() {
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let n = table.new_namespace("N");
    table.add_symbol(root, n).unwrap();
    let s = class(&mut table, n, "S");
    let g = function(&mut table, n, "g", &[TypeInfo::of_symbol(s)]);

    assert_eq!(
        table.unqualified_function_lookup(root, "g", &[TypeInfo::of_symbol(s)]).unwrap(),
        Some(g)
    );
}

// =============================================================================
// Overload resolution
// =============================================================================

#[test]
fn each_candidate_better_on_one_argument_is_ambiguous() {
    init_tracing();
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let const_int_ptr = int().with_flags(TypeFlags::CONST).with_ptr(PtrOp::pointer());
    let short = int().with_flags(TypeFlags::SHORT);
    let long = int().with_flags(TypeFlags::LONG);
    let f1 = function(&mut table, root, "f", &[const_int_ptr.clone(), short.clone()]);
    let f2 = function(&mut table, root, "f", &[int().with_ptr(PtrOp::pointer()), int()]);

    let i = table.new_symbol("i", TypeKind::Int);
    table.add_symbol(root, i).unwrap();
    let address_of_i = TypeInfo::of_symbol(i).with_operator(OperatorExpression::AddressOf);

    let err = table
        .unqualified_function_lookup(root, "f", &[address_of_i.clone(), short])
        .unwrap_err();
    assert_eq!(err.reason(), Reason::Ambiguous);
    assert_eq!(
        table.unqualified_function_lookup(root, "f", &[address_of_i, long.clone()]).unwrap(),
        Some(f2)
    );
    assert_eq!(
        table.unqualified_function_lookup(root, "f", &[const_int_ptr, long]).unwrap(),
        Some(f1)
    );
}

#[test]
fn overload_set_without_arguments_is_unresolved() {
    let mut table = SymbolTable::cpp();
    let root = table.root();
    function(&mut table, root, "f", &[int()]);
    function(&mut table, root, "f", &[TypeInfo::new(TypeKind::Double)]);

    let err = table.lookup(root, "f").unwrap_err();
    assert_eq!(err.reason(), Reason::UnableToResolveFunction);
}

#[test]
fn single_candidate_still_needs_convertible_arguments() {
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let double = TypeInfo::new(TypeKind::Double);
    let int_ptr = int().with_ptr(PtrOp::pointer());

    function(&mut table, root, "f", &[int_ptr.clone()]);
    assert_eq!(
        table.unqualified_function_lookup(root, "f", std::slice::from_ref(&double)).unwrap(),
        None
    );

    // struct A { A(int*); }; void g(A); void g(char*);
    let a = class(&mut table, root, "A");
    let from_ptr = table.new_constructor("A");
    table.add_parameter_type(from_ptr, int_ptr.clone()).unwrap();
    table.add_constructor(a, from_ptr).unwrap();
    let g_a = function(&mut table, root, "g", &[TypeInfo::of_symbol(a)]);
    function(
        &mut table,
        root,
        "g",
        &[TypeInfo::new(TypeKind::Char).with_ptr(PtrOp::pointer())],
    );

    assert_eq!(table.unqualified_function_lookup(root, "g", &[double]).unwrap(), None);
    assert_eq!(
        table.unqualified_function_lookup(root, "g", &[int_ptr]).unwrap(),
        Some(g_a)
    );
}

#[test]
fn function_template_competes_with_plain_function() {
    let mut table = SymbolTable::cpp();
    let root = table.root();

    // template<class T> void f(T*);
    let mut factory = table.new_template_factory(root);
    let header = table.new_template("");
    let t = table.new_template_parameter("T", TypeKind::TypeName);
    table.add_template_parameter(header, t).unwrap();
    factory.push_template(header);
    let templated = table.new_function("f");
    table
        .add_parameter_type(templated, TypeInfo::of_symbol(t).with_ptr(PtrOp::pointer()))
        .unwrap();
    factory.add_symbol(&mut table, templated).unwrap();

    // void f(int*);
    let plain = function(&mut table, root, "f", &[int().with_ptr(PtrOp::pointer())]);

    let int_ptr = int().with_ptr(PtrOp::pointer());
    assert_eq!(
        table.unqualified_function_lookup(root, "f", &[int_ptr]).unwrap(),
        Some(plain)
    );

    let char_ptr = TypeInfo::new(TypeKind::Char).with_ptr(PtrOp::pointer());
    let chosen = table
        .unqualified_function_lookup(root, "f", &[char_ptr])
        .unwrap()
        .unwrap();
    let instance = table.symbol(chosen).unwrap().instance.clone().unwrap();
    assert_eq!(instance.template, header);
    assert_eq!(instance.args, vec![TypeInfo::new(TypeKind::Char)]);
}

// =============================================================================
// Templates
// =============================================================================

/// A template header with the given parameters.
fn header(table: &mut SymbolTable, params: &[(&str, TypeKind)]) -> SymbolId {
    let template = table.new_template("");
    for &(name, kind) in params {
        let p = table.new_template_parameter(name, kind);
        table.add_template_parameter(template, p).unwrap();
    }
    template
}

fn param(table: &SymbolTable, template: SymbolId, i: usize) -> TypeInfo {
    TypeInfo::of_symbol(table.symbol(template).unwrap().params()[i])
}

fn ptr(info: TypeInfo) -> TypeInfo {
    info.with_ptr(PtrOp::pointer())
}

fn value(n: u32) -> TypeInfo {
    int().with_literal(n.to_string())
}

/// Declare `template<params> class A<pattern> {}` and return the class.
fn specialize(
    table: &mut SymbolTable,
    params: &[(&str, TypeKind)],
    pattern: impl Fn(&SymbolTable, SymbolId) -> Vec<TypeInfo>,
) -> SymbolId {
    let root = table.root();
    let mut factory = table.new_template_factory(root);
    let h = header(table, params);
    factory.push_template(h);
    let class = table.new_class("A", TypeKind::Class).unwrap();
    let args = pattern(table, h);
    factory.add_template_id(table, class, args).unwrap();
    class
}

#[test]
fn most_specialized_partial_specialization_is_selected() {
    init_tracing();
    let mut table = SymbolTable::cpp();
    let root = table.root();

    // template<class T1, class T2, int I> class A {};
    let mut factory = table.new_template_factory(root);
    let primary = header(
        &mut table,
        &[("T1", TypeKind::TypeName), ("T2", TypeKind::TypeName), ("I", TypeKind::Int)],
    );
    factory.push_template(primary);
    let primary_class = table.new_class("A", TypeKind::Class).unwrap();
    factory.add_symbol(&mut table, primary_class).unwrap();

    // #2: template<class T, int I> class A<T, T*, I> {};
    let two = specialize(&mut table, &[("T", TypeKind::TypeName), ("I", TypeKind::Int)], |t, h| {
        vec![param(t, h, 0), ptr(param(t, h, 0)), param(t, h, 1)]
    });
    // #3: template<class T1, class T2, int I> class A<T1*, T2, I> {};
    let three = specialize(
        &mut table,
        &[("T1", TypeKind::TypeName), ("T2", TypeKind::TypeName), ("I", TypeKind::Int)],
        |t, h| vec![ptr(param(t, h, 0)), param(t, h, 1), param(t, h, 2)],
    );
    // #4: template<class T> class A<int, T*, 5> {};
    let four = specialize(&mut table, &[("T", TypeKind::TypeName)], |t, h| {
        vec![int(), ptr(param(t, h, 0)), value(5)]
    });
    // #5: template<class T1, class T2, int I> class A<T1, T2*, I> {};
    let five = specialize(
        &mut table,
        &[("T1", TypeKind::TypeName), ("T2", TypeKind::TypeName), ("I", TypeKind::Int)],
        |t, h| vec![param(t, h, 0), ptr(param(t, h, 1)), param(t, h, 2)],
    );

    let char_type = TypeInfo::new(TypeKind::Char);
    let mut source_of = |args: Vec<TypeInfo>| {
        let instance = table.lookup_template_id(root, "A", &args)?.unwrap();
        Ok::<_, SymbolTableError>(table.symbol(instance)?.instantiated_from)
    };

    assert_eq!(source_of(vec![int(), int(), value(1)]).unwrap(), Some(primary_class));
    assert_eq!(source_of(vec![int(), ptr(int()), value(1)]).unwrap(), Some(two));
    assert_eq!(source_of(vec![int(), ptr(char_type.clone()), value(5)]).unwrap(), Some(four));
    assert_eq!(source_of(vec![int(), ptr(char_type), value(1)]).unwrap(), Some(five));
    assert_eq!(source_of(vec![ptr(int()), int(), value(3)]).unwrap(), Some(three));

    let err = source_of(vec![ptr(int()), ptr(int()), value(2)]).unwrap_err();
    assert_eq!(err.reason(), Reason::Ambiguous);
}

#[test]
fn instantiation_is_idempotent() {
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let mut factory = table.new_template_factory(root);
    let h = header(&mut table, &[("T", TypeKind::TypeName), ("U", TypeKind::TypeName)]);
    factory.push_template(h);
    let class = table.new_class("Pair", TypeKind::Class).unwrap();
    factory.add_symbol(&mut table, class).unwrap();
    let first = table.new_symbol_with("first", param(&table, h, 0));
    table.add_symbol(class, first).unwrap();

    let alias = table.new_typedef("Int", int());
    table.add_symbol(root, alias).unwrap();

    let args = vec![int(), ptr(TypeInfo::new(TypeKind::Char))];
    let one = table.lookup_template_id(root, "Pair", &args).unwrap().unwrap();
    let two = table.lookup_template_id(root, "Pair", &args).unwrap().unwrap();
    assert_eq!(one, two);

    let through_typedef = vec![TypeInfo::of_symbol(alias), ptr(TypeInfo::new(TypeKind::Char))];
    let three = table.lookup_template_id(root, "Pair", &through_typedef).unwrap().unwrap();
    assert_eq!(one, three);

    let member = table.qualified_lookup(one, "first").unwrap().unwrap();
    assert_eq!(table.symbol(member).unwrap().type_info, int());
}

#[test]
fn instance_inherits_from_instantiated_base() {
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let base = class(&mut table, root, "Base");
    let value_member = table.new_symbol("value", TypeKind::Int);
    table.add_symbol(base, value_member).unwrap();

    // template<class T> class D : public T {};
    let mut factory = table.new_template_factory(root);
    let h = header(&mut table, &[("T", TypeKind::TypeName)]);
    factory.push_template(h);
    let derived = table.new_class("D", TypeKind::Class).unwrap();
    factory.add_symbol(&mut table, derived).unwrap();
    let t = table.symbol(h).unwrap().params()[0];
    table.add_parent(derived, t).unwrap();

    let instance = table
        .lookup_template_id(root, "D", &[TypeInfo::of_symbol(base)])
        .unwrap()
        .unwrap();
    assert_eq!(table.symbol(instance).unwrap().parents()[0].parent, base);
    assert_eq!(table.lookup(instance, "value").unwrap(), Some(value_member));
}

#[test]
fn local_class_is_rejected_as_template_argument() {
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let mut factory = table.new_template_factory(root);
    let h = header(&mut table, &[("T", TypeKind::TypeName)]);
    factory.push_template(h);
    let class_a = table.new_class("A", TypeKind::Class).unwrap();
    factory.add_symbol(&mut table, class_a).unwrap();

    let f = function(&mut table, root, "f", &[]);
    let local = class(&mut table, f, "Local");
    let err = table
        .lookup_template_id(f, "A", &[TypeInfo::of_symbol(local)])
        .unwrap_err();
    assert_eq!(err.reason(), Reason::BadTemplateArgument);
}

#[test]
fn dependent_member_type_resolves_with_its_enclosing_instance() {
    let mut table = SymbolTable::cpp();
    let root = table.root();

    // template<class T> class A {};
    let mut factory = table.new_template_factory(root);
    let h = header(&mut table, &[("T", TypeKind::TypeName)]);
    factory.push_template(h);
    let class_a = table.new_class("A", TypeKind::Class).unwrap();
    factory.add_symbol(&mut table, class_a).unwrap();

    // template<class U> class B { A<U> a; };
    let mut factory = table.new_template_factory(root);
    let h = header(&mut table, &[("U", TypeKind::TypeName)]);
    factory.push_template(h);
    let class_b = table.new_class("B", TypeKind::Class).unwrap();
    factory.add_symbol(&mut table, class_b).unwrap();
    let u = param(&table, h, 0);
    let a_of_u = table.lookup_template_id(class_b, "A", &[u]).unwrap().unwrap();
    assert!(table.symbol(a_of_u).unwrap().is_deferred_instance());
    let member = table.new_symbol_with("a", TypeInfo::of_symbol(a_of_u));
    table.add_symbol(class_b, member).unwrap();

    let b_int = table.lookup_template_id(root, "B", &[int()]).unwrap().unwrap();
    let a_int = table.lookup_template_id(root, "A", &[int()]).unwrap().unwrap();
    let member = table.qualified_lookup(b_int, "a").unwrap().unwrap();
    assert_eq!(table.symbol(member).unwrap().type_info.type_symbol, Some(a_int));
}

// =============================================================================
// Transactions
// =============================================================================

#[test]
fn rollback_undoes_declarations() {
    init_tracing();
    let mut table = SymbolTable::cpp();
    let root = table.root();

    let mark = table.set_mark();
    let s = table.new_symbol("s", TypeKind::Int);
    table.add_symbol(root, s).unwrap();
    assert_eq!(table.lookup(root, "s").unwrap(), Some(s));
    assert!(table.roll_back(mark));
    assert_eq!(table.lookup(root, "s").unwrap(), None);
    assert!(!table.roll_back(mark));
}

#[test]
fn rollback_undoes_parents_and_directives() {
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let a = class(&mut table, root, "A");
    let b = class(&mut table, root, "B");
    let x = table.new_symbol("x", TypeKind::Int);
    table.add_symbol(a, x).unwrap();
    let n = table.new_namespace("N");
    table.add_symbol(root, n).unwrap();
    let y = table.new_symbol("y", TypeKind::Int);
    table.add_symbol(n, y).unwrap();
    let f = function(&mut table, root, "f", &[]);

    let mark = table.set_mark();
    table.add_parent(b, a).unwrap();
    table.add_using_directive(f, n).unwrap();
    assert_eq!(table.lookup(b, "x").unwrap(), Some(x));
    assert_eq!(table.lookup(f, "y").unwrap(), Some(y));

    assert!(table.roll_back(mark));
    assert_eq!(table.lookup(b, "x").unwrap(), None);
    assert_eq!(table.lookup(f, "y").unwrap(), None);
    assert!(table.symbol(b).unwrap().parents().is_empty());
}

#[test]
fn rollback_forgets_instances_made_inside_the_transaction() {
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let mut factory = table.new_template_factory(root);
    let h = header(&mut table, &[("T", TypeKind::TypeName)]);
    factory.push_template(h);
    let class_a = table.new_class("A", TypeKind::Class).unwrap();
    factory.add_symbol(&mut table, class_a).unwrap();

    let mark = table.set_mark();
    let inside = table.lookup_template_id(root, "A", &[int()]).unwrap().unwrap();
    assert!(table.roll_back(mark));

    let after = table.lookup_template_id(root, "A", &[int()]).unwrap().unwrap();
    assert_ne!(inside, after);
}

#[test]
fn commit_folds_into_the_enclosing_transaction() {
    let mut table = SymbolTable::cpp();
    let root = table.root();

    let outer = table.set_mark();
    let inner = table.set_mark();
    let s = table.new_symbol("s", TypeKind::Int);
    table.add_symbol(root, s).unwrap();
    assert!(table.commit(inner));
    assert!(!table.roll_back(inner));
    assert_eq!(table.lookup(root, "s").unwrap(), Some(s));

    assert!(table.roll_back(outer));
    assert_eq!(table.lookup(root, "s").unwrap(), None);
}
