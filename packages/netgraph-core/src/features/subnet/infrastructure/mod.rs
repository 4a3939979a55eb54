pub mod logical_graph;

pub use logical_graph::LogicalGraph;
