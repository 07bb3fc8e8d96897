//! Content fingerprints for declarations.
//!
//! A fingerprint is the interned blake3 digest of a declaration's defining
//! text. Equal fingerprints across compilations mean "unchanged" -- this is
//! the signal the whole invalidation engine exists to compare. Interning the
//! hex digest keeps the fingerprint itself a cheap `Copy` handle.

use std::cmp::Ordering;

use crate::intern::SymbolTable;
use crate::Symbol;

/// An interned content hash of a declaration's defining text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(Symbol);

impl Fingerprint {
    /// Fingerprints the given defining text with blake3 and interns the
    /// resulting hex digest.
    pub fn of_text(table: &mut SymbolTable, text: &str) -> Self {
        let digest = blake3::hash(text.as_bytes());
        Fingerprint(table.intern(&digest.to_hex()))
    }

    /// Wraps an already-computed hex digest, e.g. from persisted state.
    pub fn from_hex(table: &mut SymbolTable, hex: &str) -> Self {
        Fingerprint(table.intern(hex))
    }

    /// The interned digest handle.
    pub fn symbol(self) -> Symbol {
        self.0
    }

    /// The hex digest string.
    pub fn hex(self, table: &SymbolTable) -> &str {
        table.resolve(self.0)
    }

    /// Total order by interned-string (digest) order.
    pub fn cmp_using(self, other: Fingerprint, table: &SymbolTable) -> Ordering {
        table.cmp_symbols(self.0, other.0)
    }
}
