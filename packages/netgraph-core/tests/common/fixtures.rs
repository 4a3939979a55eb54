//! Topology fixtures

use netgraph_core::{BidirectionalEdge, EdgeRef, GraphConfig, NetworkGraph, Node, NodeKey, NodeRef};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

pub fn host(a: u8, b: u8, c: u8, d: u8) -> NodeRef {
    Node::host(Ipv4Addr::new(a, b, c, d))
}

/// 10.0.0.<last>
pub fn lan(last: u8) -> NodeRef {
    host(10, 0, 0, last)
}

pub fn lan_key(last: u8) -> NodeKey {
    NodeKey::host(Ipv4Addr::new(10, 0, 0, last))
}

pub fn edge(a: NodeRef, b: NodeRef) -> EdgeRef {
    BidirectionalEdge::shared(a, b)
}

/// Store committing as soon as it is asked to
pub fn immediate_graph(name: &str) -> NetworkGraph {
    NetworkGraph::new(GraphConfig::immediate().name(name)).expect("graph")
}

/// Sorted keys of a node list
pub fn sorted_keys(nodes: &[NodeRef]) -> Vec<NodeKey> {
    let mut keys: Vec<NodeKey> = nodes.iter().map(|n| n.key().clone()).collect();
    keys.sort();
    keys
}

/// Poll `condition` every 5ms until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
