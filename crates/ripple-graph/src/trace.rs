//! Tracing: expand a changed-node seed into the affected-file set.
//!
//! A breadth-first worklist walk over def->user edges. Each node's traced
//! flag is the cycle guard: it flips at most once per invocation, so the walk
//! terminates on any finite graph, cycles included, and no recursion depth is
//! involved. Order affects only diagnostics, never the result set.

use std::collections::{HashSet, VecDeque};

use petgraph::graph::NodeIndex;
use tracing::debug;

use ripple_core::{DepSource, SymbolTable};

use crate::graph::DepGraph;
use crate::handle::NodeHandle;

/// The outcome of one tracing pass.
#[derive(Debug)]
pub struct TraceResult {
    /// Every node newly marked traced by this pass, in visit order.
    pub traced: Vec<NodeHandle>,
    /// The owning sources among them. Expats propagate the walk but own no
    /// file, so they contribute nothing here.
    pub sources: HashSet<DepSource>,
}

impl DepGraph {
    /// Expands `seed` transitively along def->user edges, marking every
    /// reached node traced. Nodes already traced by an earlier pass in this
    /// invocation are neither re-expanded nor re-reported.
    pub fn trace(&mut self, seed: &[NodeHandle]) -> TraceResult {
        let mut traced = Vec::new();
        let mut sources = HashSet::new();
        let mut frontier = VecDeque::new();

        for &handle in seed {
            if let Some(node) = self.arena.node_weight_mut(handle.into()) {
                if node.mark_traced() {
                    frontier.push_back(handle);
                }
            }
        }

        while let Some(handle) = frontier.pop_front() {
            traced.push(handle);
            if let Some(source) = self.arena[NodeIndex::from(handle)].source() {
                sources.insert(source);
            }
            for user in self.users_of(handle) {
                let node = self
                    .arena
                    .node_weight_mut(user.into())
                    .expect("edge endpoints are live nodes");
                if node.mark_traced() {
                    frontier.push_back(user);
                }
            }
        }

        debug!(
            seed = seed.len(),
            traced = traced.len(),
            sources = sources.len(),
            "tracing pass complete"
        );
        TraceResult { traced, sources }
    }

    /// Traces from `seed` and returns the files that must be recompiled,
    /// sorted by path for deterministic dispatch order.
    pub fn invalidated_sources(
        &mut self,
        seed: &[NodeHandle],
        table: &SymbolTable,
    ) -> Vec<DepSource> {
        let result = self.trace(seed);
        let mut sources: Vec<DepSource> = result.sources.into_iter().collect();
        sources.sort_by(|a, b| a.cmp_using(*b, table));
        sources
    }

    /// Resets every traced flag. Test- and debug-facing; a real driver starts
    /// each invocation with a freshly loaded (untraced) graph instead.
    pub fn reset_tracing(&mut self) {
        let nodes: Vec<_> = self.arena.node_indices().collect();
        for idx in nodes {
            if let Some(node) = self.arena.node_weight_mut(idx) {
                node.mark_untraced();
            }
        }
    }
}
