//! Domain layer for topology snapshots
//!
//! # Domain Models
//!
//! - `TopologySnapshot`: every raw node and edge of a graph, with traffic
//! - `NodeRecord`: identity, labels and annotations of one node
//! - `EdgeRecord`: endpoint references (indices into `nodes`) and both
//!   traffic directions
//!
//! Snapshots read the raw store, so uncommitted entities are included.
//!
//! # Examples
//!
//! ```rust,ignore
//! use netgraph_storage::TopologySnapshot;
//!
//! let snapshot = TopologySnapshot::capture(&graph);
//! let json = snapshot.to_json()?;
//!
//! let restored = TopologySnapshot::from_json(&json)?;
//! restored.restore_into(&fresh_graph)?;
//! ```

use chrono::{DateTime, Utc};
use netgraph_core::{
    BidirectionalEdge, ConnectionSnapshot, GraphView, NetworkGraph, Node, NodeKey,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

use crate::{Result, StorageError};

/// Current snapshot layout version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub key: NodeKey,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Position in the published view at capture time, if published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Index into `TopologySnapshot::nodes`
    pub source: usize,
    pub destination: usize,
    pub to_destination: ConnectionSnapshot,
    pub to_source: ConnectionSnapshot,
}

/// Serializable copy of a graph's raw store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub version: u32,
    pub graph: String,
    pub captured_at: DateTime<Utc>,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl TopologySnapshot {
    /// Copy every raw node and edge of `view`
    pub fn capture<V: GraphView + ?Sized>(view: &V) -> Self {
        let store = view.store();
        let raw_nodes = store.raw_nodes();
        let positions: HashMap<NodeKey, usize> = raw_nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.key().clone(), i))
            .collect();

        let nodes: Vec<NodeRecord> = raw_nodes
            .iter()
            .map(|node| NodeRecord {
                key: node.key().clone(),
                title: node.title(),
                subtitle: node.subtitle(),
                annotations: node.annotations(),
                published_index: view.index_of_node(node.key()),
            })
            .collect();

        // Edges whose endpoint vanished between the two raw reads are skipped
        let edges: Vec<EdgeRecord> = store
            .raw_edges()
            .iter()
            .filter_map(|edge| {
                let source = *positions.get(&edge.source_key())?;
                let destination = *positions.get(&edge.destination_key())?;
                Some(EdgeRecord {
                    source,
                    destination,
                    to_destination: edge.to_destination().snapshot(),
                    to_source: edge.to_source().snapshot(),
                })
            })
            .collect();

        debug!(
            graph = %view.id(),
            nodes = nodes.len(),
            edges = edges.len(),
            "Captured topology snapshot"
        );

        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            graph: view.name().to_string(),
            captured_at: Utc::now(),
            nodes,
            edges,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let snapshot: Self = serde_json::from_reader(reader)?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    fn check_version(&self) -> Result<()> {
        if self.version != SNAPSHOT_FORMAT_VERSION {
            return Err(StorageError::serialization(format!(
                "Unsupported snapshot version {} (supported: {})",
                self.version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Add the snapshot's nodes, edges and traffic to `graph`.
    ///
    /// Everything is validated before the graph is touched. Nodes already in
    /// the graph are reused; traffic is appended to the canonical edges.
    pub fn restore_into(&self, graph: &NetworkGraph) -> Result<()> {
        for (i, record) in self.nodes.iter().enumerate() {
            if !record.key.is_complete() {
                return Err(StorageError::unknown_node(format!(
                    "node #{} has an incomplete identity {:?}",
                    i, record.key
                )));
            }
        }
        for (i, record) in self.edges.iter().enumerate() {
            for endpoint in [record.source, record.destination] {
                if endpoint >= self.nodes.len() {
                    return Err(StorageError::unknown_node(format!(
                        "edge #{} references node #{}",
                        i, endpoint
                    )));
                }
            }
        }

        let nodes: Vec<_> = self
            .nodes
            .iter()
            .map(|record| {
                let node = Node::shared(record.key.clone());
                node.set_title(record.title.clone());
                node.set_subtitle(record.subtitle.clone());
                for (key, value) in &record.annotations {
                    node.annotate(key.clone(), value.clone());
                }
                graph.add_node(node)
            })
            .collect();

        for record in &self.edges {
            let source = &nodes[record.source];
            let destination = &nodes[record.destination];
            let edge = graph.add_edge(BidirectionalEdge::shared(source.clone(), destination.clone()));
            if let Some(details) = edge.details_from(source.key()) {
                details.absorb(&record.to_destination);
            }
            if let Some(details) = edge.details_from(destination.key()) {
                details.absorb(&record.to_source);
            }
        }

        info!(
            graph = %graph.id(),
            source = %self.graph,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "Restored topology snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgraph_core::{FrameRecord, GraphConfig};
    use std::net::Ipv4Addr;

    fn graph(name: &str) -> NetworkGraph {
        NetworkGraph::new(GraphConfig::immediate().name(name)).unwrap()
    }

    #[test]
    fn test_capture_references_nodes_by_index() {
        let g = graph("capture");
        let a = g.add_node(Node::host(Ipv4Addr::new(10, 0, 0, 1)));
        let b = g.add_node(Node::host(Ipv4Addr::new(10, 0, 0, 2)));
        g.record_traffic(a.clone(), b.clone(), a.key(), "pcap", FrameRecord::new("TCP", 1, 100))
            .unwrap();

        let snapshot = TopologySnapshot::capture(&g);
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.edges.len(), 1);
        assert_eq!(snapshot.edges[0].source, 0);
        assert_eq!(snapshot.edges[0].destination, 1);
        assert_eq!(snapshot.edges[0].to_destination.total_bytes, 100);
        assert!(snapshot.nodes[0].published_index.is_none());

        g.flush().unwrap();
        let published = TopologySnapshot::capture(&g);
        assert_eq!(published.nodes[1].published_index, Some(1));
    }

    #[test]
    fn test_rejects_dangling_edge_reference() {
        let g = graph("dangling");
        let a = g.add_node(Node::host(Ipv4Addr::new(10, 0, 0, 1)));
        g.add_node(Node::host(Ipv4Addr::new(10, 0, 0, 2)));
        g.add_edge(BidirectionalEdge::shared(a, Node::host(Ipv4Addr::new(10, 0, 0, 2))));

        let mut snapshot = TopologySnapshot::capture(&g);
        snapshot.edges[0].destination = 7;

        let target = graph("target");
        let err = snapshot.restore_into(&target).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::UnknownNode);
        assert_eq!(target.raw_node_count(), 0);
    }

    #[test]
    fn test_rejects_incomplete_identity() {
        let json = r#"{
            "version": 1,
            "graph": "broken",
            "captured_at": "2024-01-01T00:00:00Z",
            "nodes": [{ "key": { "cloud": "" }, "title": "?" }],
            "edges": []
        }"#;
        let snapshot = TopologySnapshot::from_json(json).unwrap();
        let err = snapshot.restore_into(&graph("target")).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::UnknownNode);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let json = r#"{"version": 9, "graph": "g", "captured_at": "2024-01-01T00:00:00Z", "nodes": [], "edges": []}"#;
        let err = TopologySnapshot::from_json(json).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Serialization);
        assert!(err.message.contains("version 9"));
    }
}
