/*
 * Netgraph Core - live network topology graph
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Topology model (Node, BidirectionalEdge, ConnectionDetails)
 * - features/    : Vertical slices (graph_store → subnet → derived_views)
 * - config/      : Presets and versioned YAML configuration
 *
 * Concurrency:
 * - Ingestion threads write the raw store under one mutex per graph
 * - One publisher thread per graph family commits and recomputes views
 * - Readers load the published view lock-free
 */

#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::type_complexity)] // Partition tuples in the commit diff

pub mod config;
pub mod errors;
pub mod features;
pub mod shared;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{GraphConfig, NetgraphConfig, SubnetConfig};
pub use errors::{ErrorKind, GraphError, Result};
pub use features::derived_views::{FilteredGraph, NeighborhoodGraph};
pub use features::graph_store::{
    GraphEvent, GraphEventHandler, GraphId, GraphStats, GraphView, NetworkGraph, PublishedView,
    Publisher, SubscriptionId, ViewChange, ViewListener,
};
pub use features::subnet::{CidrPartition, LogicalGraph, PartitionChange};
pub use shared::models::{
    BidirectionalEdge, Cached, ConnectionDetails, ConnectionSnapshot, EdgeKey, EdgeRef,
    FrameRecord, Node, NodeKey, NodeKind, NodeRef,
};
