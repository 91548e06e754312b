//! Symbol storage for cppsym.
//!
//! ## Components
//!
//! - [`SymbolRegistry`]: the symbol arena and all journaled mutations
//! - [`UsingGraph`]: `using namespace` directives between scopes
//! - [`TemplateInstanceCache`]: instances keyed by template and arguments
//! - [`Journal`]: the undo log behind marks, rollback and commit

pub mod cache;
pub mod journal;
pub mod registry;
pub mod using_graph;

pub use cache::TemplateInstanceCache;
pub use journal::{Command, Journal};
pub use registry::SymbolRegistry;
pub use using_graph::UsingGraph;
