//! Stable handle for nodes in the dependency graph arena.
//!
//! A [`NodeHandle`] is a newtype over the arena's `u32` index. Nodes are
//! referenced from many edge-index entries and must mutate in place while
//! being observed everywhere, so all access goes through the arena by handle,
//! never through duplicated node copies.

use std::fmt;

use petgraph::graph::NodeIndex;

/// Stable node handle. Maps to a petgraph `NodeIndex<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub u32);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NodeIndex<u32>> for NodeHandle {
    fn from(idx: NodeIndex<u32>) -> Self {
        NodeHandle(idx.index() as u32)
    }
}

impl From<NodeHandle> for NodeIndex<u32> {
    fn from(handle: NodeHandle) -> Self {
        NodeIndex::new(handle.0 as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_to_node_index_roundtrip() {
        let idx = NodeIndex::<u32>::new(42);
        let handle = NodeHandle::from(idx);
        assert_eq!(handle.0, 42);

        let back: NodeIndex<u32> = handle.into();
        assert_eq!(back.index(), 42);
    }

    #[test]
    fn handle_display() {
        assert_eq!(format!("{}", NodeHandle(7)), "7");
    }
}
