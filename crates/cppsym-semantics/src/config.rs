//! Symbol table configuration.

/// Source language of the translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    C,
    #[default]
    Cpp,
}

/// Settings fixed for the lifetime of a [`SymbolTable`](crate::SymbolTable).
///
/// # Example
///
/// ```
/// use cppsym_semantics::{Language, SymbolTableConfig};
///
/// let config = SymbolTableConfig::cpp().with_max_instantiation_depth(16);
/// assert_eq!(config.language, Language::Cpp);
/// assert!(config.using_directives_enabled());
/// assert!(!SymbolTableConfig::c().using_directives_enabled());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTableConfig {
    pub language: Language,
    /// Honour `using namespace` during lookup. Always off for C.
    pub using_directives: bool,
    /// Nesting limit for instantiations triggered by other instantiations.
    pub max_instantiation_depth: usize,
}

impl Default for SymbolTableConfig {
    fn default() -> Self {
        Self::cpp()
    }
}

impl SymbolTableConfig {
    pub const DEFAULT_MAX_INSTANTIATION_DEPTH: usize = 64;

    pub fn cpp() -> Self {
        Self {
            language: Language::Cpp,
            using_directives: true,
            max_instantiation_depth: Self::DEFAULT_MAX_INSTANTIATION_DEPTH,
        }
    }

    pub fn c() -> Self {
        Self {
            language: Language::C,
            using_directives: false,
            max_instantiation_depth: Self::DEFAULT_MAX_INSTANTIATION_DEPTH,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_using_directives(mut self, enabled: bool) -> Self {
        self.using_directives = enabled;
        self
    }

    pub fn with_max_instantiation_depth(mut self, depth: usize) -> Self {
        self.max_instantiation_depth = depth;
        self
    }

    #[inline]
    pub fn is_cpp(&self) -> bool {
        self.language == Language::Cpp
    }

    #[inline]
    pub fn using_directives_enabled(&self) -> bool {
        self.is_cpp() && self.using_directives
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_cpp() {
        let config = SymbolTableConfig::default();
        assert!(config.is_cpp());
        assert_eq!(
            config.max_instantiation_depth,
            SymbolTableConfig::DEFAULT_MAX_INSTANTIATION_DEPTH
        );
    }

    #[test]
    fn c_language_ignores_directive_switch() {
        let config = SymbolTableConfig::c().with_using_directives(true);
        assert!(!config.using_directives_enabled());
    }

    #[test]
    fn directives_can_be_disabled_for_cpp() {
        let config = SymbolTableConfig::cpp().with_using_directives(false);
        assert!(!config.using_directives_enabled());
    }
}
