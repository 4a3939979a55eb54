//! Topology data model: nodes, edges and per-direction traffic.

pub mod cache_cell;
pub mod connection;
pub mod edge;
pub mod node;

pub use cache_cell::{CacheCell, Cached};
pub use connection::{
    ConnectionDetails, ConnectionSnapshot, FrameRecord, DEFAULT_FRAME_BUCKET_CAPACITY,
};
pub use edge::{BidirectionalEdge, EdgeKey, EdgeRef};
pub use node::{DirtyObserver, Node, NodeKey, NodeKind, NodeRef, ATTR_KIND, ATTR_NETWORK};
