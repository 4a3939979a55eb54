//! Feature modules
//!
//! - graph_store    - raw store, publisher, commit pipeline, events
//! - subnet         - CIDR partition and `LogicalGraph`
//! - derived_views  - `FilteredGraph` and `NeighborhoodGraph`

pub mod derived_views;
pub mod graph_store;
pub mod subnet;
