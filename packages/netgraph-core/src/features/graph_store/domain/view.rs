// Published view: the committed, externally observable snapshot of a store.

use ahash::AHashMap;

use super::GraphId;
use crate::shared::models::{EdgeKey, EdgeRef, NodeKey, NodeRef};

/// Ordered node/edge lists of the last commit.
///
/// Immutable once built; commits swap in a whole new view. Order is the raw
/// store's insertion order and stays stable until an entity is removed.
#[derive(Debug, Clone, Default)]
pub struct PublishedView {
    revision: u64,
    nodes: Vec<NodeRef>,
    edges: Vec<EdgeRef>,
    node_index: AHashMap<NodeKey, usize>,
    edge_index: AHashMap<EdgeKey, usize>,
}

impl PublishedView {
    pub fn empty(revision: u64) -> Self {
        Self {
            revision,
            ..Self::default()
        }
    }

    pub(crate) fn from_parts(revision: u64, nodes: Vec<NodeRef>, edges: Vec<(EdgeKey, EdgeRef)>) -> Self {
        let node_index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.key().clone(), i))
            .collect();
        let mut edge_index = AHashMap::with_capacity(edges.len());
        let mut edge_list = Vec::with_capacity(edges.len());
        for (i, (key, edge)) in edges.into_iter().enumerate() {
            edge_index.insert(key, i);
            edge_list.push(edge);
        }
        Self {
            revision,
            nodes,
            edges: edge_list,
            node_index,
            edge_index,
        }
    }

    /// Commit counter; bumps on every non-empty commit and on clears
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeRef] {
        &self.edges
    }

    pub fn node(&self, key: &NodeKey) -> Option<&NodeRef> {
        self.node_index.get(key).map(|&i| &self.nodes[i])
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&EdgeRef> {
        self.edge_index.get(key).map(|&i| &self.edges[i])
    }

    pub fn index_of_node(&self, key: &NodeKey) -> Option<usize> {
        self.node_index.get(key).copied()
    }

    pub fn index_of_edge(&self, key: &EdgeKey) -> Option<usize> {
        self.edge_index.get(key).copied()
    }

    pub fn contains_node(&self, key: &NodeKey) -> bool {
        self.node_index.contains_key(key)
    }

    pub fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.edge_index.contains_key(key)
    }

    /// Edge keys with their positions
    pub fn edge_keys(&self) -> impl Iterator<Item = (&EdgeKey, usize)> {
        self.edge_index.iter().map(|(k, &i)| (k, i))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Delta applied by one commit (or clear), delivered to view listeners.
#[derive(Debug, Clone)]
pub struct ViewChange {
    pub graph: GraphId,
    pub revision: u64,
    pub cleared: bool,
    pub added_nodes: Vec<NodeRef>,
    pub removed_nodes: Vec<NodeRef>,
    pub added_edges: Vec<EdgeRef>,
    pub removed_edges: Vec<EdgeRef>,
}

impl ViewChange {
    pub fn is_empty(&self) -> bool {
        !self.cleared
            && self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
    }

    /// Anything left the view
    pub fn has_removals(&self) -> bool {
        self.cleared || !self.removed_nodes.is_empty() || !self.removed_edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{BidirectionalEdge, Node};
    use std::net::Ipv4Addr;

    #[test]
    fn test_indices_follow_list_order() {
        let a = Node::host(Ipv4Addr::new(10, 0, 0, 1));
        let b = Node::host(Ipv4Addr::new(10, 0, 0, 2));
        let e = BidirectionalEdge::shared(a.clone(), b.clone());
        let view = PublishedView::from_parts(3, vec![a.clone(), b.clone()], vec![(e.key(), e.clone())]);

        assert_eq!(view.revision(), 3);
        assert_eq!(view.index_of_node(a.key()), Some(0));
        assert_eq!(view.index_of_node(b.key()), Some(1));
        assert_eq!(view.index_of_edge(&e.key()), Some(0));
        assert!(view.node(&NodeKey::cloud("internet")).is_none());
        assert!(!view.is_empty());
    }

    #[test]
    fn test_change_emptiness() {
        let change = ViewChange {
            graph: GraphId::next(),
            revision: 1,
            cleared: false,
            added_nodes: vec![],
            removed_nodes: vec![],
            added_edges: vec![],
            removed_edges: vec![],
        };
        assert!(change.is_empty());
        assert!(!change.has_removals());

        let cleared = ViewChange {
            cleared: true,
            ..change
        };
        assert!(!cleared.is_empty());
        assert!(cleared.has_removals());
    }
}
