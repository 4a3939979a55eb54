//! netgraph-storage - Topology snapshots
//!
//! Captures the raw store of any graph view (root, logical or derived) into a
//! self-contained JSON document and restores it into a fresh graph.
//!
//! ## Format
//!
//! - Nodes carry their full identity, labels and annotations
//! - Edges reference nodes by position in the `nodes` array
//! - Traffic is stored per direction with frames bucketed by import source
//!
//! ## Usage
//!
//! ```rust,ignore
//! use netgraph_storage::TopologySnapshot;
//!
//! TopologySnapshot::capture(&graph).write_to_file("capture.json")?;
//!
//! let snapshot = TopologySnapshot::read_from_file("capture.json")?;
//! snapshot.restore_into(&other)?;
//! other.flush()?;
//! ```

pub mod domain;
pub mod error;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{EdgeRecord, NodeRecord, TopologySnapshot, SNAPSHOT_FORMAT_VERSION};
