//! Dependency sources: the file that currently owns a declaration.

use std::cmp::Ordering;

use crate::intern::SymbolTable;
use crate::Symbol;

/// An immutable identifier for the compilation unit hosting a declaration.
///
/// Absence is a legal state, modeled as `Option<DepSource>` at use sites: a
/// declaration referenced before its defining file has been read is an
/// "expatriate" and has no source yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepSource(Symbol);

impl DepSource {
    /// Interns a file path (or other unit identifier) as a source.
    pub fn new(table: &mut SymbolTable, path: &str) -> Self {
        DepSource(table.intern(path))
    }

    /// The interned path handle.
    pub fn symbol(self) -> Symbol {
        self.0
    }

    /// The file path this source names.
    pub fn path(self, table: &SymbolTable) -> &str {
        table.resolve(self.0)
    }

    /// Total order by path string.
    pub fn cmp_using(self, other: DepSource, table: &SymbolTable) -> Ordering {
        table.cmp_symbols(self.0, other.0)
    }

    /// Human-readable rendering for diagnostics.
    pub fn describe(self, table: &SymbolTable) -> String {
        table.resolve(self.0).to_owned()
    }
}
