//! C/C++ symbol table semantics.
//!
//! [`SymbolTable`] answers the questions a C/C++ front end asks while it
//! parses: what a name refers to, which overload a call selects, and what a
//! template-id instantiates to.
//!
//! ## Modules
//!
//! - [`config`]: language and limits for one table
//! - [`table`]: the `SymbolTable` facade, symbol factories and transactions
//! - `declare`: declarations and the redeclaration rules
//! - `lookup`: unqualified, qualified and argument-dependent name lookup
//! - `conversion`: implicit conversion sequences and their ranking
//! - `overload`: overload resolution over a candidate set
//! - `template`: deduction, specialization selection and instantiation
//! - `types`: canonical type forms and type identity

pub mod config;
pub mod table;

mod conversion;
mod declare;
mod lookup;
mod overload;
mod template;
mod types;

pub use config::{Language, SymbolTableConfig};
pub use conversion::{Cost, Rank, UserDefined};
pub use declare::UsingDeclaration;
pub use lookup::TypeFilter;
pub use table::SymbolTable;
pub use template::TemplateFactory;
