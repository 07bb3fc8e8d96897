//! Interned string handles for names, file paths, and fingerprints.
//!
//! Every string that enters the dependency engine (declaration names, source
//! file identifiers, fingerprint hex digests) is deduplicated through a
//! [`SymbolTable`], which hands out cheap `Copy` handles. Equality and hashing
//! of keys, sources, and fingerprints then compare a `u32` instead of text.
//!
//! The table is an owned value, not a global: the driver creates one per
//! invocation and threads `&SymbolTable` (or `&mut` for interning) through the
//! graph API. Ordering functions take the table explicitly because a handle's
//! integer value reflects insertion order, not lexicographic order.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexSet;

/// An interned string handle. Compares and hashes by integer identity.
///
/// Only meaningful relative to the [`SymbolTable`] that produced it. Handles
/// are never persisted directly; persisted forms resolve back to strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(u32);

impl Symbol {
    /// Returns the raw table index.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Deduplicating string table.
///
/// Backed by an [`IndexSet`] so that a string's handle is its stable insertion
/// index. Lookup and interning are O(1); resolving is an index access.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    strings: IndexSet<String>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        SymbolTable {
            strings: IndexSet::new(),
        }
    }

    /// Interns `text`, returning the existing handle if it was seen before.
    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(index) = self.strings.get_index_of(text) {
            return Symbol(index as u32);
        }
        let (index, _) = self.strings.insert_full(text.to_owned());
        Symbol(index as u32)
    }

    /// Resolves a handle back to its string.
    ///
    /// # Panics
    ///
    /// Panics if `sym` was not produced by this table; mixing handles across
    /// tables is a programming defect, not a recoverable condition.
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.strings
            .get_index(sym.as_u32() as usize)
            .unwrap_or_else(|| panic!("symbol {sym} is foreign to this table"))
    }

    /// Compares two handles by their resolved strings.
    pub fn cmp_symbols(&self, a: Symbol, b: Symbol) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.resolve(a).cmp(self.resolve(b))
    }

    /// Number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns `true` if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates() {
        let mut table = SymbolTable::new();
        let a = table.intern("foo");
        let b = table.intern("bar");
        let c = table.intern("foo");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn resolve_roundtrip() {
        let mut table = SymbolTable::new();
        let sym = table.intern("swim");
        assert_eq!(table.resolve(sym), "swim");
    }

    #[test]
    fn cmp_is_lexicographic_not_insertion_order() {
        let mut table = SymbolTable::new();
        let z = table.intern("zebra");
        let a = table.intern("aardvark");
        // z was interned first, so its integer handle is smaller...
        assert!(z.as_u32() < a.as_u32());
        // ...but the table compares by string.
        assert_eq!(table.cmp_symbols(z, a), Ordering::Greater);
        assert_eq!(table.cmp_symbols(a, z), Ordering::Less);
        assert_eq!(table.cmp_symbols(a, a), Ordering::Equal);
    }

    #[test]
    #[should_panic(expected = "foreign to this table")]
    fn foreign_symbol_panics() {
        let mut other = SymbolTable::new();
        let sym = other.intern("elsewhere");
        let empty = SymbolTable::new();
        let _ = empty.resolve(sym);
    }
}
