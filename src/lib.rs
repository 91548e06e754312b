//! cppsym: a semantic symbol table for C and C++ front ends.
//!
//! The parser drives a [`SymbolTable`] as it reads declarations: it creates
//! symbols, declares them into scopes, and asks the table to resolve names,
//! pick overloads and instantiate templates. Every mutation can be undone
//! through transaction marks.
//!
//! ```
//! use cppsym::prelude::*;
//!
//! let mut table = SymbolTable::cpp();
//! let root = table.root();
//!
//! let ns = table.new_namespace("N");
//! table.add_symbol(root, ns).unwrap();
//! let f = table.new_function("f");
//! table.add_parameter_type(f, TypeInfo::new(TypeKind::Int)).unwrap();
//! table.add_symbol(ns, f).unwrap();
//!
//! let found = table
//!     .qualified_function_lookup(ns, "f", &[TypeInfo::new(TypeKind::Char)])
//!     .unwrap();
//! assert_eq!(found, Some(f));
//! ```
//!
//! ## Crates
//!
//! - [`core`]: ids, type descriptors, symbols and errors
//! - [`registry`]: symbol storage, the undo journal and the instance cache
//! - [`semantics`]: lookup, overload resolution and templates

pub use cppsym_core as core;
pub use cppsym_registry as registry;
pub use cppsym_semantics as semantics;

pub use cppsym_core::{
    Mark, Reason, Result, Symbol, SymbolId, SymbolTableError, TypeFlags, TypeInfo, TypeKind,
};
pub use cppsym_semantics::{Language, SymbolTable, SymbolTableConfig, TemplateFactory};

/// The types a parser needs to drive a [`SymbolTable`].
pub mod prelude {
    pub use cppsym_core::{
        Mark, OperatorExpression, PtrOp, PtrOpKind, Reason, Result, SymbolId, SymbolTableError,
        TypeFlags, TypeInfo, TypeKind, Visibility,
    };
    pub use cppsym_semantics::{
        Cost, Language, Rank, SymbolTable, SymbolTableConfig, TemplateFactory, TypeFilter,
        UsingDeclaration,
    };
}
