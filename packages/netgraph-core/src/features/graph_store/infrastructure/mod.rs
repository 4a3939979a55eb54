//! Graph store infrastructure: publisher thread, commit scheduling, events

mod commit_scheduler;
pub mod event_bus;
pub mod network_graph;
pub mod publisher;

pub use event_bus::EventBus;
pub use network_graph::NetworkGraph;
pub(crate) use network_graph::WeakGraph;
pub use publisher::Publisher;
