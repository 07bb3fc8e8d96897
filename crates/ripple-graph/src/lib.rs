//! Per-invocation dependency graph for an incremental compilation driver.
//!
//! After a source edit, the driver recompiles the edited files, parses each
//! file's per-declaration dependency records into [`DeclRecord`]s, and feeds
//! them through [`DepGraph::integrate`]. Integration updates the node/edge
//! universe and returns the directly changed nodes; [`DepGraph::trace`]
//! expands that seed transitively along def-use edges, and the owning sources
//! of every traced node form the next compilation wave.
//!
//! Integration and tracing are separate, non-overlapping phases: both take
//! `&mut self`, so a driver that compiles files in parallel must funnel the
//! resulting records through one integration at a time.

pub mod error;
pub mod graph;
pub mod handle;
pub mod persist;
pub mod record;
pub mod trace;

// Re-export commonly used types
pub use error::GraphError;
pub use graph::DepGraph;
pub use handle::NodeHandle;
pub use persist::SavedGraph;
pub use record::DeclRecord;
pub use trace::TraceResult;
