//! Derived views over a live root graph
//!
//! Each view owns a store fed from the root's published view on the root's
//! publisher thread, so it never observes uncommitted root state.

pub mod filtered_graph;
pub mod neighborhood_graph;

pub use filtered_graph::FilteredGraph;
pub use neighborhood_graph::NeighborhoodGraph;

use crate::config::GraphConfig;
use crate::errors::Result;
use crate::features::graph_store::{GraphView, NetworkGraph};

/// Store for a view of `root`: same publisher and commit interval
fn derived_store(root: &dyn GraphView, suffix: &str) -> Result<NetworkGraph> {
    let config = GraphConfig::default()
        .name(format!("{}/{}", root.name(), suffix))
        .commit_interval_ms(root.store().config().commit_interval_ms);
    NetworkGraph::with_publisher(config, root.store().publisher().clone())
}
