//! Cross-invocation persistence of the dependency graph.
//!
//! The persisted form carries exactly the durable parts of each node -- key,
//! source, fingerprint -- plus the def-use edge list. The traced flag has no
//! representation at all: "have I already scheduled this file in this
//! invocation" is invocation-scoped, and every restored node starts untraced.
//!
//! Interned handles are table-relative, so the saved form resolves everything
//! to strings and re-interns on load. Nodes are emitted in the node total
//! order and edges as sorted index pairs into that list, giving byte-stable
//! output for diffing and golden tests.
//!
//! Loading rejects, never repairs, state that violates the soundness
//! invariant or references missing nodes; the driver reacts by discarding the
//! graph and rebuilding everything, which is safe where a repaired-but-wrong
//! graph would not be.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ripple_core::{Aspect, DepKey, DepNode, DepSource, Designator, Fingerprint, SymbolTable};

use crate::error::GraphError;
use crate::graph::DepGraph;
use crate::handle::NodeHandle;

/// Persisted aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavedAspect {
    Interface,
    Implementation,
}

/// Persisted designator, names resolved to strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SavedDesignator {
    TopLevel { name: String },
    Nominal { name: String },
    Member { container: String, member: String },
}

/// Persisted node: identity plus fingerprint. No traced flag, by design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNode {
    pub aspect: SavedAspect,
    pub designator: SavedDesignator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// The serializable form of a [`DepGraph`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGraph {
    /// Nodes in total order.
    pub nodes: Vec<SavedNode>,
    /// Def-use edges as `(definition, user)` indexes into `nodes`.
    pub edges: Vec<(u32, u32)>,
}

impl SavedGraph {
    /// Captures a graph into its persisted form.
    pub fn capture(graph: &DepGraph, table: &SymbolTable) -> SavedGraph {
        let mut indices: Vec<NodeIndex<u32>> = graph.arena.node_indices().collect();
        indices.sort_by(|&a, &b| graph.arena[a].cmp_using(&graph.arena[b], table));

        let position: HashMap<NodeIndex<u32>, u32> = indices
            .iter()
            .enumerate()
            .map(|(pos, &idx)| (idx, pos as u32))
            .collect();

        let nodes = indices
            .iter()
            .map(|&idx| saved_node(&graph.arena[idx], table))
            .collect();

        let mut edges: Vec<(u32, u32)> = graph
            .arena
            .edge_indices()
            .filter_map(|edge| graph.arena.edge_endpoints(edge))
            .map(|(def, user)| (position[&def], position[&user]))
            .collect();
        edges.sort_unstable();

        SavedGraph { nodes, edges }
    }

    /// Rebuilds a graph, re-interning all strings into `table`. Every node
    /// comes back untraced.
    pub fn restore(&self, table: &mut SymbolTable) -> Result<DepGraph, GraphError> {
        let mut graph = DepGraph::new();
        let mut handles: Vec<NodeHandle> = Vec::with_capacity(self.nodes.len());

        for saved in &self.nodes {
            if saved.source.is_none() && saved.fingerprint.is_some() {
                return Err(GraphError::CorruptState {
                    reason: format!(
                        "expatriate node carries a fingerprint: {:?}",
                        saved.designator
                    ),
                });
            }
            if let Some(hex) = saved.fingerprint.as_deref() {
                // blake3 hex digest, as emitted by capture. Anything else
                // would poison later diagnostics.
                if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(GraphError::CorruptState {
                        reason: format!("malformed fingerprint {hex:?}"),
                    });
                }
            }
            let key = restored_key(saved, table);
            let source = saved
                .source
                .as_deref()
                .map(|path| DepSource::new(table, path));
            let fingerprint = saved
                .fingerprint
                .as_deref()
                .map(|hex| Fingerprint::from_hex(table, hex));
            if graph.contains_identity(key, source) {
                return Err(GraphError::CorruptState {
                    reason: format!("duplicate node identity: {}", key.describe(table)),
                });
            }
            handles.push(graph.insert_node(DepNode::new(key, source, fingerprint)));
        }

        for &(def, user) in &self.edges {
            let def = *handles
                .get(def as usize)
                .ok_or(GraphError::DanglingEdge {
                    index: def,
                    len: handles.len(),
                })?;
            let user = *handles
                .get(user as usize)
                .ok_or(GraphError::DanglingEdge {
                    index: user,
                    len: handles.len(),
                })?;
            graph.connect(def, user);
        }

        graph.verify()?;
        debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "restored dependency graph"
        );
        Ok(graph)
    }

    /// Writes the persisted form as pretty JSON.
    pub fn save_to(&self, path: &Path) -> Result<(), GraphError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reads a persisted form back. I/O and parse failures surface as
    /// [`GraphError`] so the driver can degrade to a full rebuild.
    pub fn load_from(path: &Path) -> Result<SavedGraph, GraphError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

fn saved_node(node: &DepNode, table: &SymbolTable) -> SavedNode {
    let key = node.key();
    let aspect = match key.aspect {
        Aspect::Interface => SavedAspect::Interface,
        Aspect::Implementation => SavedAspect::Implementation,
    };
    let designator = match key.designator {
        Designator::TopLevel { name } => SavedDesignator::TopLevel {
            name: table.resolve(name).to_owned(),
        },
        Designator::Nominal { name } => SavedDesignator::Nominal {
            name: table.resolve(name).to_owned(),
        },
        Designator::Member { container, member } => SavedDesignator::Member {
            container: table.resolve(container).to_owned(),
            member: table.resolve(member).to_owned(),
        },
    };
    SavedNode {
        aspect,
        designator,
        source: node.source().map(|s| s.path(table).to_owned()),
        fingerprint: node.fingerprint().map(|f| f.hex(table).to_owned()),
    }
}

fn restored_key(saved: &SavedNode, table: &mut SymbolTable) -> DepKey {
    let aspect = match saved.aspect {
        SavedAspect::Interface => Aspect::Interface,
        SavedAspect::Implementation => Aspect::Implementation,
    };
    match &saved.designator {
        SavedDesignator::TopLevel { name } => DepKey::top_level(aspect, table.intern(name)),
        SavedDesignator::Nominal { name } => DepKey::nominal(aspect, table.intern(name)),
        SavedDesignator::Member { container, member } => {
            DepKey::member(aspect, table.intern(container), table.intern(member))
        }
    }
}
