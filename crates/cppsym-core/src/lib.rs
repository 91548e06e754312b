//! Core value types for the cppsym symbol table.
//!
//! ## Modules
//!
//! - [`ids`]: `SymbolId` arena handles and transaction `Mark`s
//! - [`type_info`]: type descriptors (`TypeInfo`, `TypeKind`, `TypeFlags`, `PtrOp`)
//! - [`symbol`]: declarations and their kind-specific payloads
//! - [`error`]: `SymbolTableError` and its `Reason` codes

pub mod error;
pub mod ids;
pub mod symbol;
pub mod type_info;

pub use error::{Reason, Result, SymbolTableError};
pub use ids::{Mark, SymbolId};
pub use symbol::{
    ClassData, FunctionData, InstanceInfo, ParentRef, ScopeData, Symbol, SymbolData, TemplateData,
    Visibility,
};
pub use type_info::{OperatorExpression, PtrOp, PtrOpKind, TypeFlags, TypeInfo, TypeKind};
