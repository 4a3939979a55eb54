//! Concurrent ingestion against one store

mod common;

use common::*;
use netgraph_core::{FrameRecord, GraphConfig, NetworkGraph, NodeRef};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const WRITERS: usize = 8;

#[test]
fn concurrent_writers_share_canonical_instances() {
    init_tracing();
    let graph = NetworkGraph::new(GraphConfig::default().name("writers").commit_interval_ms(5)).unwrap();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let graph = graph.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut seen: Vec<NodeRef> = Vec::new();
                for i in 1..=50u8 {
                    let link = graph.add_edge(edge(lan(i), lan(i % 50 + 1)));
                    seen.push(link.source());
                }
                seen
            })
        })
        .collect();

    let results: Vec<Vec<NodeRef>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    graph.flush().unwrap();

    assert_eq!(graph.raw_node_count(), 50);
    assert_eq!(graph.raw_edge_count(), 50);
    for nodes in &results {
        for node in nodes {
            let canonical = graph.node(node.key()).unwrap();
            assert!(Arc::ptr_eq(node, &canonical));
        }
    }
    assert!(graph.stats().is_converged());
}

#[test]
fn concurrent_frames_on_one_edge_are_conserved() {
    let graph = immediate_graph("frames");
    let a = graph.add_node(lan(1));
    let b = graph.add_node(lan(2));
    graph.add_edge(edge(a.clone(), b.clone()));

    let handles: Vec<_> = (0..WRITERS)
        .map(|t| {
            let graph = graph.clone();
            let (a, b) = (a.clone(), b.clone());
            thread::spawn(move || {
                let origin = if t % 2 == 0 { a.key().clone() } else { b.key().clone() };
                for i in 0..250u64 {
                    graph
                        .record_traffic(a.clone(), b.clone(), &origin, &format!("pcap-{}", t), FrameRecord::new("TCP", i, 4))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let link = graph.edges_involving(a.key()).pop().unwrap();
    assert_eq!(link.to_destination().total_bytes(), 4000);
    assert_eq!(link.to_source().total_bytes(), 4000);
    assert_eq!(link.to_destination().frame_count() + link.to_source().frame_count(), 2000);
    let snapshot = link.to_destination().snapshot();
    assert_eq!(snapshot.total_bytes, 4000);
    assert_eq!(snapshot.frames.len(), WRITERS / 2);
}

#[test]
fn readers_never_see_dangling_edges() {
    let graph = NetworkGraph::new(GraphConfig::default().name("readers").commit_interval_ms(1)).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let graph = graph.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut checks = 0usize;
            while !done.load(Ordering::Acquire) {
                let view = graph.published();
                for e in view.edges() {
                    assert!(view.contains_node(&e.source_key()));
                    assert!(view.contains_node(&e.destination_key()));
                }
                checks += 1;
            }
            checks
        })
    };

    for round in 0..20u8 {
        for i in 1..=20u8 {
            graph.add_edge(edge(host(10, round, 0, i), host(10, round, 1, i)));
        }
        if round % 3 == 0 {
            graph.remove_nodes((1..=20u8).map(|i| lan_key(i)));
            graph.remove_nodes((1..=10u8).map(|i| host(10, round, 0, i).key().clone()));
        }
    }
    graph.flush().unwrap();
    done.store(true, Ordering::Release);
    assert!(reader.join().unwrap() > 0);
    assert!(graph.stats().is_converged());
}

#[test]
fn clear_racing_with_writers_keeps_raw_store_consistent() {
    init_tracing();
    let graph = NetworkGraph::new(GraphConfig::default().name("clear-race").commit_interval_ms(2)).unwrap();

    let writers: Vec<_> = (0..4u8)
        .map(|t| {
            let graph = graph.clone();
            thread::spawn(move || {
                for i in 0..200u8 {
                    graph.add_edge(edge(host(10, t, 0, i), host(10, t, 1, i)));
                }
            })
        })
        .collect();
    for _ in 0..5 {
        graph.clear_topology().unwrap();
    }
    for writer in writers {
        writer.join().unwrap();
    }
    graph.flush().unwrap();

    let nodes: Vec<_> = graph.raw_nodes().iter().map(|n| n.key().clone()).collect();
    for e in graph.raw_edges() {
        assert!(nodes.contains(&e.source_key()));
        assert!(nodes.contains(&e.destination_key()));
    }
    assert!(graph.stats().is_converged());
}
