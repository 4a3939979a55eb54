// Graph identity, notifications and statistics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::shared::models::NodeKey;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a store instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(u64);

impl GraphId {
    pub fn next() -> Self {
        GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Notifications raised by a store. Each carries the originating store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    /// Raw store and published view were emptied
    Cleared { graph: GraphId },
    /// A published node's title, subtitle or annotations changed
    NodeDirtied { graph: GraphId, node: NodeKey },
    /// Subnet assignments changed and have been recomputed
    GroupingInvalidated { graph: GraphId },
}

impl GraphEvent {
    pub fn graph(&self) -> GraphId {
        match self {
            GraphEvent::Cleared { graph }
            | GraphEvent::NodeDirtied { graph, .. }
            | GraphEvent::GroupingInvalidated { graph } => *graph,
        }
    }
}

/// Point-in-time counters for a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub graph: GraphId,
    pub name: String,
    pub raw_nodes: usize,
    pub raw_edges: usize,
    pub published_nodes: usize,
    pub published_edges: usize,
    pub revision: u64,
    pub commits: u64,
    pub refresh_requests: u64,
}

impl GraphStats {
    /// Raw and published sizes agree
    pub fn is_converged(&self) -> bool {
        self.raw_nodes == self.published_nodes && self.raw_edges == self.published_edges
    }
}
