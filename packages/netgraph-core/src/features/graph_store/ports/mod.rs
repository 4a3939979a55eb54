//! Ports - Interface definitions for the graph store
//!
//! Consumers (renderers, serializers, derived views) talk to a store only
//! through these traits; none of them reach into the raw store.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::features::graph_store::domain::{GraphEvent, GraphId, PublishedView, ViewChange};
use crate::features::graph_store::infrastructure::NetworkGraph;
use crate::shared::models::{EdgeKey, Node, NodeKey};

/// Receives store notifications (cleared, node dirtied, grouping invalidated)
///
/// Handlers run on the thread that raised the event and must not block.
pub trait GraphEventHandler: Send + Sync {
    fn handle(&self, event: &GraphEvent);
}

impl<F> GraphEventHandler for F
where
    F: Fn(&GraphEvent) + Send + Sync,
{
    fn handle(&self, event: &GraphEvent) {
        self(event)
    }
}

/// Receives published-view deltas. Always called on the publisher thread.
pub trait ViewListener: Send + Sync {
    fn on_view_changed(&self, change: &ViewChange);
}

/// Runs on the publisher thread right before a commit snapshots the raw store
pub trait CommitHook: Send + Sync {
    fn before_commit(&self, graph: &NetworkGraph);
}

/// Read surface shared by every graph flavor
///
/// # Implementors
/// - `NetworkGraph`
/// - `LogicalGraph`
/// - `FilteredGraph`
/// - `NeighborhoodGraph`
pub trait GraphView: Send + Sync {
    /// Store backing this view
    fn store(&self) -> &NetworkGraph;

    fn id(&self) -> GraphId {
        self.store().id()
    }

    fn name(&self) -> &str {
        self.store().name()
    }

    /// Last committed snapshot
    fn published(&self) -> Arc<PublishedView> {
        self.store().published()
    }

    /// Stable integer reference used by serializers
    fn index_of_node(&self, key: &NodeKey) -> Option<usize> {
        self.store().published().index_of_node(key)
    }

    fn index_of_edge(&self, key: &EdgeKey) -> Option<usize> {
        self.store().published().index_of_edge(key)
    }

    /// Attribute map used for grouping and tabular display
    fn groups(&self, node: &Node) -> BTreeMap<String, String> {
        node.attributes()
    }
}

impl<V: GraphView + ?Sized> GraphView for Arc<V> {
    fn store(&self) -> &NetworkGraph {
        (**self).store()
    }

    fn id(&self) -> GraphId {
        (**self).id()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn published(&self) -> Arc<PublishedView> {
        (**self).published()
    }

    fn index_of_node(&self, key: &NodeKey) -> Option<usize> {
        (**self).index_of_node(key)
    }

    fn index_of_edge(&self, key: &EdgeKey) -> Option<usize> {
        (**self).index_of_edge(key)
    }

    fn groups(&self, node: &Node) -> BTreeMap<String, String> {
        (**self).groups(node)
    }
}
