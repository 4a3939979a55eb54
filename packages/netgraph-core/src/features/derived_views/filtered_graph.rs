//! FilteredGraph - root graph minus a hidden-node mask

use ahash::AHashSet;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::derived_store;
use crate::errors::Result;
use crate::features::graph_store::infrastructure::WeakGraph;
use crate::features::graph_store::{
    GraphStats, GraphView, NetworkGraph, PublishedView, ViewChange, ViewListener,
};
use crate::shared::models::{EdgeKey, EdgeRef, Node, NodeKey, NodeRef};

struct FilterState {
    root: Arc<dyn GraphView>,
    target: WeakGraph,
    hidden: Mutex<AHashSet<NodeKey>>,
}

impl FilterState {
    fn schedule_recompute(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let posted = self.root.store().publisher().execute(move || {
            if let Some(state) = weak.upgrade() {
                state.recompute();
            }
        });
        if let Err(e) = posted {
            warn!(error = %e, "Filter recomputation not scheduled");
        }
    }

    /// Visible nodes and the edges whose endpoints are both visible
    fn visible(&self, root: &PublishedView) -> (Vec<NodeRef>, Vec<EdgeRef>) {
        let hidden = self.hidden.lock().clone();
        let nodes: Vec<NodeRef> = root
            .nodes()
            .iter()
            .filter(|n| !hidden.contains(n.key()))
            .cloned()
            .collect();
        let present: AHashSet<&NodeKey> = nodes.iter().map(|n| n.key()).collect();
        let edges: Vec<EdgeRef> = root
            .edges()
            .iter()
            .filter(|e| {
                let key = e.key();
                let (low, high) = key.endpoints();
                present.contains(low) && present.contains(high)
            })
            .cloned()
            .collect();
        (nodes, edges)
    }

    fn recompute(&self) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let root = self.root.published();
        let (nodes, edges) = self.visible(&root);
        debug!(
            graph = %target.id(),
            root_revision = root.revision(),
            nodes = nodes.len(),
            edges = edges.len(),
            "Filter recomputed"
        );
        target.sync_raw(&nodes, &edges);
    }
}

impl ViewListener for FilterState {
    fn on_view_changed(&self, _change: &ViewChange) {
        self.recompute();
    }
}

/// Live subgraph of a root graph with some nodes hidden.
///
/// Follows the root's published view and its own hidden set. Index lookups
/// and grouping come from the root, so serialized references stay stable.
#[derive(Clone)]
pub struct FilteredGraph {
    graph: NetworkGraph,
    state: Arc<FilterState>,
}

impl FilteredGraph {
    pub fn new<V>(root: V) -> Result<Self>
    where
        V: GraphView + 'static,
    {
        let root: Arc<dyn GraphView> = Arc::new(root);
        let graph = derived_store(root.as_ref(), "filtered")?;
        let state = Arc::new(FilterState {
            root: Arc::clone(&root),
            target: graph.downgrade(),
            hidden: Mutex::new(AHashSet::new()),
        });

        let listener: Arc<dyn ViewListener> = state.clone();
        root.store().add_view_listener(Arc::downgrade(&listener));
        state.schedule_recompute();

        Ok(Self { graph, state })
    }

    pub fn root(&self) -> &Arc<dyn GraphView> {
        &self.state.root
    }

    /// Hide nodes; their edges disappear with them on the next recompute
    pub fn hide<I>(&self, keys: I)
    where
        I: IntoIterator<Item = NodeKey>,
    {
        let changed = {
            let mut hidden = self.state.hidden.lock();
            keys.into_iter().fold(false, |changed, key| hidden.insert(key) || changed)
        };
        if changed {
            self.state.schedule_recompute();
        }
    }

    pub fn unhide<I>(&self, keys: I)
    where
        I: IntoIterator<Item = NodeKey>,
    {
        let changed = {
            let mut hidden = self.state.hidden.lock();
            keys.into_iter().fold(false, |changed, key| hidden.remove(&key) || changed)
        };
        if changed {
            self.state.schedule_recompute();
        }
    }

    /// Replace the whole hidden set
    pub fn set_hidden<I>(&self, keys: I)
    where
        I: IntoIterator<Item = NodeKey>,
    {
        let keys: AHashSet<NodeKey> = keys.into_iter().collect();
        let changed = {
            let mut hidden = self.state.hidden.lock();
            if *hidden == keys {
                false
            } else {
                *hidden = keys;
                true
            }
        };
        if changed {
            self.state.schedule_recompute();
        }
    }

    /// Hidden keys, sorted
    pub fn hidden(&self) -> Vec<NodeKey> {
        let mut keys: Vec<NodeKey> = self.state.hidden.lock().iter().cloned().collect();
        keys.sort();
        keys
    }

    pub fn is_hidden(&self, key: &NodeKey) -> bool {
        self.state.hidden.lock().contains(key)
    }

    pub fn published_nodes(&self) -> Vec<NodeRef> {
        self.graph.published_nodes()
    }

    pub fn published_edges(&self) -> Vec<EdgeRef> {
        self.graph.published_edges()
    }

    /// Commit this view now and wait for it
    pub fn flush(&self) -> Result<()> {
        self.graph.flush()
    }

    pub fn stats(&self) -> GraphStats {
        self.graph.stats()
    }
}

impl GraphView for FilteredGraph {
    fn store(&self) -> &NetworkGraph {
        &self.graph
    }

    fn index_of_node(&self, key: &NodeKey) -> Option<usize> {
        self.state.root.index_of_node(key)
    }

    fn index_of_edge(&self, key: &EdgeKey) -> Option<usize> {
        self.state.root.index_of_edge(key)
    }

    fn groups(&self, node: &Node) -> BTreeMap<String, String> {
        self.state.root.groups(node)
    }
}

impl fmt::Debug for FilteredGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredGraph")
            .field("graph", &self.graph)
            .field("root", &self.state.root.id())
            .field("hidden", &self.state.hidden.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::shared::models::BidirectionalEdge;
    use std::net::Ipv4Addr;

    fn host(last: u8) -> NodeRef {
        Node::host(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_hidden_node_and_its_edges_leave_the_view() {
        let root = NetworkGraph::new(GraphConfig::immediate().name("root")).unwrap();
        root.add_edge(BidirectionalEdge::shared(host(1), host(2)));
        root.add_edge(BidirectionalEdge::shared(host(2), host(3)));
        root.flush().unwrap();

        let filtered = FilteredGraph::new(root.clone()).unwrap();
        filtered.flush().unwrap();
        assert_eq!(filtered.published_nodes().len(), 3);
        assert_eq!(filtered.published_edges().len(), 2);

        filtered.hide([host(3).key().clone()]);
        filtered.flush().unwrap();
        assert_eq!(filtered.published_nodes().len(), 2);
        assert_eq!(filtered.published_edges().len(), 1);
        assert_eq!(filtered.hidden(), vec![host(3).key().clone()]);

        filtered.unhide([host(3).key().clone()]);
        filtered.flush().unwrap();
        assert_eq!(filtered.published_edges().len(), 2);
    }

    #[test]
    fn test_index_lookups_delegate_to_root() {
        let root = NetworkGraph::new(GraphConfig::immediate().name("root")).unwrap();
        root.add_node(host(1));
        let b = root.add_node(host(2));
        root.flush().unwrap();

        let filtered = FilteredGraph::new(root.clone()).unwrap();
        filtered.hide([host(1).key().clone()]);
        filtered.flush().unwrap();

        assert_eq!(filtered.published().index_of_node(b.key()), Some(0));
        assert_eq!(filtered.index_of_node(b.key()), Some(1));
    }
}
