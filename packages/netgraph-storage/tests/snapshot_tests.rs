//! Snapshot capture and restore against live graphs

use netgraph_core::{
    BidirectionalEdge, FilteredGraph, FrameRecord, GraphConfig, GraphView, NetworkGraph, Node,
    NodeKey, NodeRef,
};
use netgraph_storage::{ErrorKind, TopologySnapshot};
use pretty_assertions::assert_eq;
use std::net::Ipv4Addr;

fn graph(name: &str) -> NetworkGraph {
    NetworkGraph::new(GraphConfig::immediate().name(name)).unwrap()
}

fn lan(last: u8) -> NodeRef {
    Node::host(Ipv4Addr::new(10, 0, 0, last))
}

fn sorted_keys(g: &NetworkGraph) -> Vec<NodeKey> {
    let mut keys: Vec<NodeKey> = g.published_nodes().iter().map(|n| n.key().clone()).collect();
    keys.sort();
    keys
}

/// Two hosts talking both ways, a labelled switch port and a cloud
fn populated() -> NetworkGraph {
    let g = graph("capture");
    let a = g.add_node(lan(1));
    let b = g.add_node(lan(2));
    a.set_title("gateway");
    a.annotate("vendor", "acme");

    g.record_traffic(a.clone(), b.clone(), a.key(), "pcap", FrameRecord::new("TCP", 1, 400))
        .unwrap();
    g.record_traffic(a.clone(), b.clone(), b.key(), "pcap", FrameRecord::new("UDP", 2, 60))
        .unwrap();
    g.record_traffic(
        a.clone(),
        b.clone(),
        b.key(),
        "netflow",
        FrameRecord::new("UDP", 3, 40).with_ports(53, 5353),
    )
    .unwrap();

    let port = g.add_node(Node::shared(NodeKey::switch_port("core-1", "ge-0/0/1")));
    port.set_subtitle(Some("uplink".to_string()));
    let cloud = g.add_node(Node::shared(NodeKey::cloud("internet")));
    g.add_edge(BidirectionalEdge::shared(port, cloud));
    g.flush().unwrap();
    g
}

#[test]
fn test_json_roundtrip_restores_topology_and_traffic() {
    let source = populated();
    let json = TopologySnapshot::capture(&source).to_json().unwrap();

    let target = graph("restored");
    TopologySnapshot::from_json(&json)
        .unwrap()
        .restore_into(&target)
        .unwrap();
    target.flush().unwrap();

    assert_eq!(sorted_keys(&target), sorted_keys(&source));
    assert_eq!(target.published_edges().len(), 2);

    let gateway = target.node(lan(1).key()).unwrap();
    assert_eq!(gateway.title(), "gateway");
    assert_eq!(gateway.annotation("vendor").as_deref(), Some("acme"));
    let port = target
        .node(&NodeKey::switch_port("core-1", "ge-0/0/1"))
        .unwrap();
    assert_eq!(port.subtitle().as_deref(), Some("uplink"));

    let edge = target.edge(&BidirectionalEdge::new(lan(1), lan(2)).key()).unwrap();
    assert_eq!(edge.total_bytes(), 500);
    let from_a = edge.details_from(lan(1).key()).unwrap();
    let from_b = edge.details_from(lan(2).key()).unwrap();
    assert_eq!(from_a.total_bytes(), 400);
    assert_eq!(from_b.total_bytes(), 100);
    assert_eq!(from_b.sources(), vec!["netflow".to_string(), "pcap".to_string()]);
}

#[test]
fn test_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("topology.json");

    let source = populated();
    let snapshot = TopologySnapshot::capture(&source);
    snapshot.write_to_file(&path).unwrap();

    let loaded = TopologySnapshot::read_from_file(&path).unwrap();
    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.graph, "capture");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TopologySnapshot::read_from_file(dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IO);
}

#[test]
fn test_restore_into_populated_graph_merges() {
    let source = populated();
    let snapshot = TopologySnapshot::capture(&source);

    let target = graph("merge");
    let existing = target.add_node(lan(1));
    snapshot.restore_into(&target).unwrap();
    target.flush().unwrap();

    // The existing canonical instance is kept
    assert!(std::sync::Arc::ptr_eq(&target.node(lan(1).key()).unwrap(), &existing));
    assert_eq!(target.raw_node_count(), 4);
}

#[test]
fn test_capture_of_filtered_view_keeps_root_indices() {
    let root = populated();
    let filtered = FilteredGraph::new(root.clone()).unwrap();
    filtered.hide([lan(1).key().clone()]);
    filtered.flush().unwrap();

    let snapshot = TopologySnapshot::capture(&filtered);
    assert_eq!(snapshot.nodes.len(), 3);
    assert_eq!(snapshot.edges.len(), 1);
    for record in &snapshot.nodes {
        assert_eq!(record.published_index, root.index_of_node(&record.key));
    }
}

#[test]
fn test_malformed_json_is_serialization_error() {
    let err = TopologySnapshot::from_json("{ not json").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Serialization);
}
