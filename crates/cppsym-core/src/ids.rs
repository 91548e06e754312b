//! Identifier types for symbols stored in the symbol arena.
//!
//! Every declaration known to a symbol table lives in one arena and is
//! referred to by a [`SymbolId`]. Containing scopes, parent classes,
//! bound type symbols and template bookkeeping all hold ids rather than
//! references, so the symbol graph can contain cycles freely.

use std::fmt;

/// Identifies a symbol in a symbol table's arena.
///
/// Ids are allocated sequentially and never reused, so an id stays valid
/// for the lifetime of the table even if the declaration it names is
/// rolled back (it simply becomes unreachable from any scope).
///
/// # Example
///
/// ```
/// use cppsym_core::SymbolId;
///
/// let id = SymbolId::new(3);
/// assert_eq!(id.index(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Create a new symbol ID with the given index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the underlying index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Position of this symbol in the arena's backing vector.
    #[inline]
    pub const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym_{}", self.0)
    }
}

impl From<u32> for SymbolId {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}

impl From<SymbolId> for u32 {
    fn from(id: SymbolId) -> Self {
        id.0
    }
}

/// Handle returned by `set_mark`, identifying a point in the undo log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mark(u32);

impl Mark {
    #[inline]
    pub const fn new(serial: u32) -> Self {
        Self(serial)
    }

    #[inline]
    pub const fn serial(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mark_{}", self.0)
    }
}
