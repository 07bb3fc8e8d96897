//! Core error types for ripple-core.

use thiserror::Error;

use crate::key::DepKey;

/// Errors produced by the core data model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The expat soundness invariant failed: a node without an owning source
    /// carries a fingerprint. Surfaced by [`verify`](crate::DepNode::verify);
    /// construction and mutation paths abort instead (see [`crate::DepNode`]).
    #[error("expatriate node carries a fingerprint: {key:?}")]
    ExpatFingerprint { key: DepKey },
}
