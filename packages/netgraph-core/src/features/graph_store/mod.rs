//! Graph Store - the authoritative node/edge store and its publish pipeline
//!
//! Writers mutate a raw store under a single mutex; a dedicated publisher
//! thread periodically diffs it against the published view consumers read.

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{GraphEvent, GraphId, GraphStats, PublishedView, SubscriptionId, ViewChange};
pub use infrastructure::{EventBus, NetworkGraph, Publisher};
pub use ports::{CommitHook, GraphEventHandler, GraphView, ViewListener};
