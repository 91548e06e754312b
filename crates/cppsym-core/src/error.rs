//! Symbol table errors.
//!
//! A lookup that finds nothing is not an error: it returns `Ok(None)`.
//! [`SymbolTableError`] means a declaration was found or supplied but
//! cannot be used: it is ambiguous, ill-formed or violates a rule.

use thiserror::Error;

/// The stable reason code of a [`SymbolTableError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    Ambiguous,
    CircularInheritance,
    BadTemplateArgument,
    BadTemplate,
    BadTemplateParameter,
    RedeclaredTemplateParam,
    UnableToResolveFunction,
    InvalidOverload,
    InvalidUsing,
    BadVisibility,
    BadTypeInfo,
    InternalError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolTableError {
    /// More than one declaration matches and none is preferred.
    #[error("ambiguous reference to '{name}'")]
    Ambiguous { name: String },

    #[error("circular inheritance through '{class}'")]
    CircularInheritance { class: String },

    #[error("invalid template argument for '{template}': {detail}")]
    BadTemplateArgument { template: String, detail: String },

    #[error("invalid template '{name}': {detail}")]
    BadTemplate { name: String, detail: String },

    #[error("invalid template parameter '{name}'")]
    BadTemplateParameter { name: String },

    #[error("template parameter '{name}' redeclared in template scope")]
    RedeclaredTemplateParam { name: String },

    /// Several overloads and no argument list to choose between them.
    #[error("unable to resolve overloaded function '{name}'")]
    UnableToResolveFunction { name: String },

    #[error("invalid redeclaration of '{name}'")]
    InvalidOverload { name: String },

    #[error("invalid using-declaration of '{name}': {detail}")]
    InvalidUsing { name: String, detail: String },

    #[error("'{name}' is not accessible")]
    BadVisibility { name: String },

    #[error("malformed type for '{name}'")]
    BadTypeInfo { name: String },

    #[error("internal symbol table error: {detail}")]
    InternalError { detail: String },
}

impl SymbolTableError {
    pub fn reason(&self) -> Reason {
        match self {
            SymbolTableError::Ambiguous { .. } => Reason::Ambiguous,
            SymbolTableError::CircularInheritance { .. } => Reason::CircularInheritance,
            SymbolTableError::BadTemplateArgument { .. } => Reason::BadTemplateArgument,
            SymbolTableError::BadTemplate { .. } => Reason::BadTemplate,
            SymbolTableError::BadTemplateParameter { .. } => Reason::BadTemplateParameter,
            SymbolTableError::RedeclaredTemplateParam { .. } => Reason::RedeclaredTemplateParam,
            SymbolTableError::UnableToResolveFunction { .. } => Reason::UnableToResolveFunction,
            SymbolTableError::InvalidOverload { .. } => Reason::InvalidOverload,
            SymbolTableError::InvalidUsing { .. } => Reason::InvalidUsing,
            SymbolTableError::BadVisibility { .. } => Reason::BadVisibility,
            SymbolTableError::BadTypeInfo { .. } => Reason::BadTypeInfo,
            SymbolTableError::InternalError { .. } => Reason::InternalError,
        }
    }

    pub fn ambiguous(name: impl Into<String>) -> Self {
        SymbolTableError::Ambiguous { name: name.into() }
    }

    pub fn bad_template(name: impl Into<String>, detail: impl Into<String>) -> Self {
        SymbolTableError::BadTemplate {
            name: name.into(),
            detail: detail.into(),
        }
    }

    pub fn bad_argument(template: impl Into<String>, detail: impl Into<String>) -> Self {
        SymbolTableError::BadTemplateArgument {
            template: template.into(),
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        SymbolTableError::InternalError {
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SymbolTableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SymbolTableError::ambiguous("m");
        assert_eq!(err.to_string(), "ambiguous reference to 'm'");
    }

    #[test]
    fn reason_codes() {
        assert_eq!(
            SymbolTableError::bad_template("A", "no match").reason(),
            Reason::BadTemplate
        );
        assert_eq!(
            SymbolTableError::RedeclaredTemplateParam { name: "T".into() }.reason(),
            Reason::RedeclaredTemplateParam
        );
    }
}
