//! Graph error types.
//!
//! Two classes, mirroring the engine's error policy: index inconsistencies
//! found by [`verify`](crate::DepGraph::verify) are programming defects that
//! the caller should treat as fatal, while malformed input and corrupt
//! persisted state are recoverable by falling back to a conservative full
//! rebuild -- rebuilding too much is always acceptable, rebuilding too little
//! never is.

use thiserror::Error;

use ripple_core::CoreError;

/// Errors produced by the dependency graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A file's record list names the same key twice. The caller should treat
    /// the file as fully changed.
    #[error("duplicate declaration '{key}' in records for {file}")]
    DuplicateDecl { key: String, file: String },

    /// Persisted graph state failed validation on load. The caller should
    /// discard it and rebuild everything.
    #[error("corrupt persisted graph: {reason}")]
    CorruptState { reason: String },

    /// A persisted edge references a node index outside the node list.
    #[error("persisted edge references node {index}, but only {len} nodes were loaded")]
    DanglingEdge { index: u32, len: usize },

    /// An internal index disagrees with the node arena.
    #[error("graph index inconsistency: {reason}")]
    InconsistentIndex { reason: String },

    /// A node-level invariant failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Reading or writing persisted state failed.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted state could not be encoded or decoded.
    #[error("serialization failure: {0}")]
    Json(#[from] serde_json::Error),
}
