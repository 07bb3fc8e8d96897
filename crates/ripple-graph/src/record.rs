//! Per-file dependency records, the input to integration.
//!
//! The compiler front end emits raw dependency information per compiled file;
//! an excluded collaborator parses it into these structured records. One
//! record per declaration the file defines.

use ripple_core::{DepKey, Fingerprint};

/// One freshly-compiled declaration of a file: its key, the fingerprint of
/// its defining text, and the keys it uses.
#[derive(Debug, Clone)]
pub struct DeclRecord {
    /// What the declaration is.
    pub key: DepKey,
    /// Content hash of the defining text. `None` when the front end could not
    /// attribute defining text to the declaration.
    pub fingerprint: Option<Fingerprint>,
    /// Keys this declaration depends on.
    pub uses: Vec<DepKey>,
}

impl DeclRecord {
    pub fn new(key: DepKey, fingerprint: Option<Fingerprint>) -> Self {
        DeclRecord {
            key,
            fingerprint,
            uses: Vec::new(),
        }
    }

    /// Builder-style attachment of the uses list.
    pub fn with_uses(mut self, uses: Vec<DepKey>) -> Self {
        self.uses = uses;
        self
    }
}
