//! Subnet grouping
//!
//! `LogicalGraph` keeps a non-overlapping CIDR partition next to its store
//! and, when enabled, creates `addr/prefix` ranges for new hosts right before
//! each commit.

pub mod domain;
pub mod infrastructure;

pub use domain::{CidrPartition, PartitionChange};
pub use infrastructure::LogicalGraph;
