//! NeighborhoodGraph - nodes within `radius` hops of a center node
//!
//! Growth is incremental: a root commit that only adds entities, or a larger
//! radius, extends the view with a fresh traversal. Anything that can shrink
//! the result (root removals, a clear, a smaller radius) resets the view's
//! raw store to a full retraversal.

use ahash::{AHashMap, AHashSet};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::derived_store;
use crate::errors::{GraphError, Result};
use crate::features::graph_store::infrastructure::WeakGraph;
use crate::features::graph_store::{
    GraphStats, GraphView, NetworkGraph, PublishedView, ViewChange, ViewListener,
};
use crate::shared::models::{EdgeKey, EdgeRef, Node, NodeKey, NodeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Extend,
    Rebuild,
}

fn check_radius(radius: usize) -> Result<()> {
    if radius < 1 {
        return Err(GraphError::invalid_argument(format!(
            "Neighborhood radius must be at least 1, got {}",
            radius
        )));
    }
    Ok(())
}

/// Breadth-first traversal over the published edges of `view`.
///
/// Returns visited nodes and traversed edges in discovery order. Empty when
/// the center is not published. Edges pointing at unpublished nodes are
/// skipped.
pub(crate) fn traverse(view: &PublishedView, center: &NodeKey, radius: usize) -> (Vec<NodeRef>, Vec<EdgeRef>) {
    let Some(start) = view.node(center) else {
        return (Vec::new(), Vec::new());
    };

    let mut adjacency: AHashMap<NodeKey, Vec<&EdgeRef>> = AHashMap::new();
    for edge in view.edges() {
        let key = edge.key();
        let (low, high) = key.endpoints();
        adjacency.entry(low.clone()).or_default().push(edge);
        adjacency.entry(high.clone()).or_default().push(edge);
    }

    let mut visited: AHashSet<NodeKey> = AHashSet::new();
    let mut traversed: AHashSet<EdgeKey> = AHashSet::new();
    let mut nodes = vec![Arc::clone(start)];
    let mut edges = Vec::new();
    visited.insert(center.clone());

    let mut frontier = vec![center.clone()];
    for _ in 0..radius {
        let mut next = Vec::new();
        for key in &frontier {
            for edge in adjacency.get(key).into_iter().flatten() {
                let Some(other_key) = edge.other(key).map(|n| n.key().clone()) else {
                    continue;
                };
                let Some(other) = view.node(&other_key) else {
                    continue;
                };
                if traversed.insert(edge.key()) {
                    edges.push(Arc::clone(edge));
                }
                if visited.insert(other_key.clone()) {
                    nodes.push(Arc::clone(other));
                    next.push(other_key);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    (nodes, edges)
}

struct NeighborhoodState {
    root: Arc<dyn GraphView>,
    target: WeakGraph,
    center: NodeKey,
    radius: AtomicUsize,
}

impl NeighborhoodState {
    fn schedule(self: &Arc<Self>, pass: Pass) {
        let weak = Arc::downgrade(self);
        let posted = self.root.store().publisher().execute(move || {
            if let Some(state) = weak.upgrade() {
                state.run(pass);
            }
        });
        if let Err(e) = posted {
            warn!(error = %e, "Neighborhood traversal not scheduled");
        }
    }

    fn run(&self, pass: Pass) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let radius = self.radius.load(Ordering::Acquire);
        let root = self.root.published();
        let (nodes, edges) = traverse(&root, &self.center, radius);
        debug!(
            graph = %target.id(),
            center = %self.center,
            radius,
            ?pass,
            nodes = nodes.len(),
            edges = edges.len(),
            "Neighborhood traversed"
        );

        match pass {
            Pass::Extend => target.extend_raw(&nodes, &edges),
            Pass::Rebuild => target.sync_raw(&nodes, &edges),
        }
    }
}

impl ViewListener for NeighborhoodState {
    fn on_view_changed(&self, change: &ViewChange) {
        if change.has_removals() {
            self.run(Pass::Rebuild);
        } else if !change.is_empty() {
            self.run(Pass::Extend);
        }
    }
}

/// Bounded-radius subgraph around a center node of a live root graph.
#[derive(Clone)]
pub struct NeighborhoodGraph {
    graph: NetworkGraph,
    state: Arc<NeighborhoodState>,
}

impl NeighborhoodGraph {
    /// Fails with `InvalidArgument` when `radius` is 0
    pub fn new<V>(root: V, center: NodeKey, radius: usize) -> Result<Self>
    where
        V: GraphView + 'static,
    {
        check_radius(radius)?;
        let root: Arc<dyn GraphView> = Arc::new(root);
        let graph = derived_store(root.as_ref(), "neighborhood")?;
        let state = Arc::new(NeighborhoodState {
            root: Arc::clone(&root),
            target: graph.downgrade(),
            center,
            radius: AtomicUsize::new(radius),
        });

        let listener: Arc<dyn ViewListener> = state.clone();
        root.store().add_view_listener(Arc::downgrade(&listener));
        state.schedule(Pass::Rebuild);

        Ok(Self { graph, state })
    }

    pub fn center(&self) -> &NodeKey {
        &self.state.center
    }

    pub fn radius(&self) -> usize {
        self.state.radius.load(Ordering::Acquire)
    }

    /// Change the radius; a smaller radius rebuilds the view from scratch
    pub fn set_radius(&self, radius: usize) -> Result<()> {
        check_radius(radius)?;
        let previous = self.state.radius.swap(radius, Ordering::AcqRel);
        if radius < previous {
            self.state.schedule(Pass::Rebuild);
        } else if radius > previous {
            self.state.schedule(Pass::Extend);
        }
        Ok(())
    }

    pub fn published_nodes(&self) -> Vec<NodeRef> {
        self.graph.published_nodes()
    }

    pub fn published_edges(&self) -> Vec<EdgeRef> {
        self.graph.published_edges()
    }

    pub fn flush(&self) -> Result<()> {
        self.graph.flush()
    }

    pub fn stats(&self) -> GraphStats {
        self.graph.stats()
    }
}

impl GraphView for NeighborhoodGraph {
    fn store(&self) -> &NetworkGraph {
        &self.graph
    }

    fn groups(&self, node: &Node) -> BTreeMap<String, String> {
        self.state.root.groups(node)
    }
}

impl fmt::Debug for NeighborhoodGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeighborhoodGraph")
            .field("graph", &self.graph)
            .field("center", &self.state.center)
            .field("radius", &self.radius())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::errors::ErrorKind;
    use crate::shared::models::BidirectionalEdge;
    use std::net::Ipv4Addr;

    fn host(last: u8) -> NodeRef {
        Node::host(Ipv4Addr::new(10, 0, 0, last))
    }

    /// 1 - 2 - 3 - 4
    fn chain() -> NetworkGraph {
        let g = NetworkGraph::new(GraphConfig::immediate().name("chain")).unwrap();
        for i in 1..4 {
            g.add_edge(BidirectionalEdge::shared(host(i), host(i + 1)));
        }
        g.flush().unwrap();
        g
    }

    fn keys(nodes: &[NodeRef]) -> Vec<NodeKey> {
        let mut keys: Vec<NodeKey> = nodes.iter().map(|n| n.key().clone()).collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_radius_zero_rejected() {
        let err = NeighborhoodGraph::new(chain(), host(1).key().clone(), 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_traverse_respects_radius() {
        let g = chain();
        let (nodes, edges) = traverse(&g.published(), host(1).key(), 2);
        assert_eq!(keys(&nodes), keys(&[host(1), host(2), host(3)]));
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn test_traverse_unknown_center_is_empty() {
        let g = chain();
        let (nodes, edges) = traverse(&g.published(), host(9).key(), 3);
        assert!(nodes.is_empty());
        assert!(edges.is_empty());
    }

    #[test]
    fn test_radius_change_grows_and_shrinks() {
        let root = chain();
        let view = NeighborhoodGraph::new(root.clone(), host(1).key().clone(), 1).unwrap();
        view.flush().unwrap();
        assert_eq!(keys(&view.published_nodes()), keys(&[host(1), host(2)]));

        view.set_radius(3).unwrap();
        view.flush().unwrap();
        assert_eq!(view.published_nodes().len(), 4);

        view.set_radius(1).unwrap();
        view.flush().unwrap();
        assert_eq!(keys(&view.published_nodes()), keys(&[host(1), host(2)]));
        assert!(view.set_radius(0).is_err());
        assert_eq!(view.radius(), 1);
    }
}
