//! Performance benchmarks for the symbol table.
//!
//! - Lookup: deep namespace nesting, wide scopes and inheritance chains
//! - Overload resolution: growing overload sets
//! - Templates: fresh and cached instantiation, partial specialization
//!   selection
//!
//! ## Profiling
//!
//! Run with the `profile-with-puffin` feature to collect scope timings from
//! the instrumented lookup and instantiation paths:
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- instantiate
//! ```

use cppsym::prelude::*;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

#[cfg(feature = "profiling")]
fn end_profiling_frame() {
    profiling::finish_frame!();
}

#[cfg(not(feature = "profiling"))]
fn end_profiling_frame() {}

fn int() -> TypeInfo {
    TypeInfo::new(TypeKind::Int)
}

/// `namespace n0 { namespace n1 { ... int x; } }` with `x` at the root.
fn nested_namespaces(depth: usize) -> (SymbolTable, SymbolId) {
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let x = table.new_symbol("x", TypeKind::Int);
    table.add_symbol(root, x).unwrap();
    let mut scope = root;
    for i in 0..depth {
        let ns = table.new_namespace(format!("n{i}"));
        table.add_symbol(scope, ns).unwrap();
        scope = ns;
    }
    (table, scope)
}

/// A linear chain `C0 <- C1 <- ... <- Cn` with `m` declared in `C0`.
fn inheritance_chain(length: usize) -> (SymbolTable, SymbolId) {
    let mut table = SymbolTable::cpp();
    let root = table.root();
    let mut previous = None;
    let mut last = root;
    for i in 0..length {
        let class = table.new_class(format!("C{i}"), TypeKind::Class).unwrap();
        table.add_symbol(root, class).unwrap();
        match previous {
            Some(base) => table.add_parent(class, base).unwrap(),
            None => {
                let m = table.new_symbol("m", TypeKind::Int);
                table.add_symbol(class, m).unwrap();
            }
        }
        previous = Some(class);
        last = class;
    }
    (table, last)
}

fn lookup_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for depth in [4, 32, 128] {
        let (mut table, innermost) = nested_namespaces(depth);
        group.bench_with_input(BenchmarkId::new("nested_namespaces", depth), &depth, |b, _| {
            b.iter(|| black_box(table.lookup(black_box(innermost), "x").unwrap()));
        });
    }

    for width in [16, 1024] {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        for i in 0..width {
            let s = table.new_symbol(format!("s{i}"), TypeKind::Int);
            table.add_symbol(root, s).unwrap();
        }
        let name = format!("s{}", width / 2);
        group.bench_with_input(BenchmarkId::new("wide_scope", width), &width, |b, _| {
            b.iter(|| black_box(table.lookup(root, black_box(&name)).unwrap()));
        });
    }

    for length in [4, 32] {
        let (mut table, derived) = inheritance_chain(length);
        group.bench_with_input(BenchmarkId::new("inheritance_chain", length), &length, |b, _| {
            b.iter(|| black_box(table.lookup(black_box(derived), "m").unwrap()));
        });
    }

    group.finish();
}

fn overload_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("overload");
    let kinds = [
        TypeKind::Char,
        TypeKind::Int,
        TypeKind::Float,
        TypeKind::Double,
        TypeKind::Bool,
        TypeKind::WChar,
    ];

    for count in [2, 6] {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        for kind in kinds.iter().take(count) {
            let f = table.new_function("f");
            table.add_parameter_type(f, TypeInfo::new(*kind)).unwrap();
            table.add_parameter_type(f, int().with_ptr(PtrOp::pointer())).unwrap();
            table.add_symbol(root, f).unwrap();
        }
        let args = [
            TypeInfo::new(TypeKind::Char),
            int().with_ptr(PtrOp::pointer()),
        ];
        group.bench_with_input(BenchmarkId::new("candidates", count), &count, |b, _| {
            b.iter(|| {
                black_box(
                    table
                        .unqualified_function_lookup(root, "f", black_box(&args))
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

/// `template<class T> class Box { T value; T* next(); };` with
/// `template<class T> class Box<T*>` beside it.
fn box_template() -> SymbolTable {
    let mut table = SymbolTable::cpp();
    let root = table.root();

    let mut factory = table.new_template_factory(root);
    let header = table.new_template("");
    let t = table.new_template_parameter("T", TypeKind::TypeName);
    table.add_template_parameter(header, t).unwrap();
    factory.push_template(header);
    let class = table.new_class("Box", TypeKind::Class).unwrap();
    factory.add_symbol(&mut table, class).unwrap();
    let value = table.new_symbol_with("value", TypeInfo::of_symbol(t));
    table.add_symbol(class, value).unwrap();
    let next = table.new_function("next");
    table
        .set_return_type(next, TypeInfo::of_symbol(t).with_ptr(PtrOp::pointer()))
        .unwrap();
    table.add_symbol(class, next).unwrap();

    let mut factory = table.new_template_factory(root);
    let header = table.new_template("");
    let u = table.new_template_parameter("U", TypeKind::TypeName);
    table.add_template_parameter(header, u).unwrap();
    factory.push_template(header);
    let spec = table.new_class("Box", TypeKind::Class).unwrap();
    factory
        .add_template_id(&mut table, spec, vec![TypeInfo::of_symbol(u).with_ptr(PtrOp::pointer())])
        .unwrap();

    table
}

fn template_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("templates");

    group.bench_function("instantiate", |b| {
        b.iter_batched(
            box_template,
            |mut table| {
                let root = table.root();
                let instance = table.lookup_template_id(root, "Box", &[int()]).unwrap();
                end_profiling_frame();
                black_box(instance)
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function("cached_instance", |b| {
        let mut table = box_template();
        let root = table.root();
        table.lookup_template_id(root, "Box", &[int()]).unwrap();
        b.iter(|| black_box(table.lookup_template_id(root, "Box", black_box(&[int()])).unwrap()));
    });

    group.bench_function("partial_specialization", |b| {
        let args = [int().with_ptr(PtrOp::pointer())];
        b.iter_batched(
            box_template,
            |mut table| {
                let root = table.root();
                let instance = table.lookup_template_id(root, "Box", &args).unwrap();
                end_profiling_frame();
                black_box(instance)
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn transaction_benchmarks(c: &mut Criterion) {
    c.bench_function("transactions/declare_and_roll_back", |b| {
        let mut table = SymbolTable::cpp();
        let root = table.root();
        b.iter(|| {
            let mark = table.set_mark();
            for i in 0..16 {
                let s = table.new_symbol(format!("t{i}"), TypeKind::Int);
                table.add_symbol(root, s).unwrap();
            }
            black_box(table.roll_back(mark))
        });
    });
}

criterion_group!(
    benches,
    lookup_benchmarks,
    overload_benchmarks,
    template_benchmarks,
    transaction_benchmarks
);
criterion_main!(benches);
