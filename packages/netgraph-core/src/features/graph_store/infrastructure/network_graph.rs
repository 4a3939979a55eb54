//! NetworkGraph - identity-deduplicating node/edge store
//!
//! Two representations per store:
//! - raw store: key → canonical instance, one mutex over nodes and edges,
//!   authoritative, written by ingestion threads
//! - published view: ordered snapshot of the last commit, swapped in whole by
//!   the publisher thread and read without locking
//!
//! Mutations only touch the raw store and request a commit. Commits are
//! rate limited by [`CommitScheduler`] and applied on the [`Publisher`] as a
//! set difference against the current published view.

use ahash::{AHashMap, AHashSet};
use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

use super::commit_scheduler::CommitScheduler;
use super::event_bus::EventBus;
use super::publisher::Publisher;
use crate::config::{GraphConfig, Validatable};
use crate::errors::{GraphError, Result};
use crate::features::graph_store::domain::{
    GraphEvent, GraphId, GraphStats, PublishedView, SubscriptionId, ViewChange,
};
use crate::features::graph_store::ports::{CommitHook, GraphEventHandler, GraphView, ViewListener};
use crate::shared::models::{
    BidirectionalEdge, DirtyObserver, EdgeKey, EdgeRef, FrameRecord, NodeKey, NodeRef,
};

// ═══════════════════════════════════════════════════════════════════════════
// Raw store
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct Entry<T> {
    seq: u64,
    value: T,
}

#[derive(Debug, Default)]
struct RawStore {
    next_seq: u64,
    nodes: AHashMap<NodeKey, Entry<NodeRef>>,
    edges: AHashMap<EdgeKey, Entry<EdgeRef>>,
}

impl RawStore {
    fn bump(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn insert_node(&mut self, node: NodeRef) -> NodeRef {
        if let Some(existing) = self.nodes.get(node.key()) {
            return Arc::clone(&existing.value);
        }
        let seq = self.bump();
        self.nodes.insert(
            node.key().clone(),
            Entry {
                seq,
                value: Arc::clone(&node),
            },
        );
        node
    }

    /// Endpoints are canonicalized first; the passed edge is rewritten in place
    fn insert_edge(&mut self, edge: EdgeRef) -> EdgeRef {
        let source = edge.source();
        let canonical_source = self.insert_node(Arc::clone(&source));
        if !Arc::ptr_eq(&source, &canonical_source) {
            edge.set_source(canonical_source);
        }

        let destination = edge.destination();
        let canonical_destination = self.insert_node(Arc::clone(&destination));
        if !Arc::ptr_eq(&destination, &canonical_destination) {
            edge.set_destination(canonical_destination);
        }

        let key = edge.key();
        if let Some(existing) = self.edges.get(&key) {
            return Arc::clone(&existing.value);
        }
        let seq = self.bump();
        self.edges.insert(
            key,
            Entry {
                seq,
                value: Arc::clone(&edge),
            },
        );
        edge
    }

    /// Removes the node and every incident edge
    fn remove_node(&mut self, key: &NodeKey) -> bool {
        if self.nodes.remove(key).is_none() {
            return false;
        }
        self.edges.retain(|edge_key, _| !edge_key.involves(key));
        true
    }

    fn nodes_in_order(&self) -> Vec<NodeRef> {
        let mut entries: Vec<&Entry<NodeRef>> = self.nodes.values().collect();
        entries.sort_unstable_by_key(|e| e.seq);
        entries.into_iter().map(|e| Arc::clone(&e.value)).collect()
    }

    fn edges_in_order(&self) -> Vec<(EdgeKey, EdgeRef)> {
        let mut entries: Vec<(&EdgeKey, &Entry<EdgeRef>)> = self.edges.iter().collect();
        entries.sort_unstable_by_key(|(_, e)| e.seq);
        entries
            .into_iter()
            .map(|(k, e)| (k.clone(), Arc::clone(&e.value)))
            .collect()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Store
// ═══════════════════════════════════════════════════════════════════════════

pub(crate) struct GraphCore {
    id: GraphId,
    config: GraphConfig,
    raw: Mutex<RawStore>,
    published: ArcSwap<PublishedView>,
    publisher: Publisher,
    scheduler: CommitScheduler,
    events: Arc<EventBus>,
    view_listeners: Mutex<Vec<Weak<dyn ViewListener>>>,
    commit_hook: RwLock<Option<Arc<dyn CommitHook>>>,
}

/// Non-owning handle for tasks queued on the publisher
#[derive(Clone)]
pub(crate) struct WeakGraph(Weak<GraphCore>);

impl WeakGraph {
    pub(crate) fn upgrade(&self) -> Option<NetworkGraph> {
        self.0.upgrade().map(|core| NetworkGraph { core })
    }
}

/// Live topology store. Cheap to clone; clones share the same store.
///
/// # Example
/// ```ignore
/// use netgraph_core::{GraphConfig, NetworkGraph, Node};
/// use std::net::Ipv4Addr;
///
/// let graph = NetworkGraph::new(GraphConfig::immediate().name("capture"))?;
/// let a = graph.add_node(Node::host(Ipv4Addr::new(10, 0, 0, 1)));
/// graph.refresh();
/// ```
#[derive(Clone)]
pub struct NetworkGraph {
    core: Arc<GraphCore>,
}

impl NetworkGraph {
    /// Create a store with its own publisher thread
    pub fn new(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        let publisher = Publisher::spawn(config.name.clone())?;
        Self::with_publisher(config, publisher)
    }

    /// Create a store sharing an existing publisher (derived views)
    pub fn with_publisher(config: GraphConfig, publisher: Publisher) -> Result<Self> {
        config.validate()?;
        let id = GraphId::next();
        info!(
            graph = %id,
            name = %config.name,
            interval_ms = config.commit_interval_ms,
            publisher = %publisher.name(),
            "Graph store created"
        );

        Ok(Self {
            core: Arc::new(GraphCore {
                id,
                scheduler: CommitScheduler::new(config.commit_interval()),
                config,
                raw: Mutex::new(RawStore::default()),
                published: ArcSwap::from_pointee(PublishedView::empty(0)),
                publisher,
                events: Arc::new(EventBus::new(id)),
                view_listeners: Mutex::new(Vec::new()),
                commit_hook: RwLock::new(None),
            }),
        })
    }

    pub fn id(&self) -> GraphId {
        self.core.id
    }

    pub fn name(&self) -> &str {
        &self.core.config.name
    }

    pub fn config(&self) -> &GraphConfig {
        &self.core.config
    }

    pub fn publisher(&self) -> &Publisher {
        &self.core.publisher
    }

    pub(crate) fn downgrade(&self) -> WeakGraph {
        WeakGraph(Arc::downgrade(&self.core))
    }

    // ───────────────────────────────────────────────────────────────────────
    // Mutations (raw store)
    // ───────────────────────────────────────────────────────────────────────

    /// Insert `node` unless an equal node exists. Returns the canonical instance.
    pub fn add_node(&self, node: NodeRef) -> NodeRef {
        let canonical = self.core.raw.lock().insert_node(node);
        self.refresh();
        canonical
    }

    /// Insert `edge` unless an equal edge exists. Returns the canonical instance.
    ///
    /// Both endpoints go through `add_node` first. If an endpoint already
    /// exists under another instance, the passed edge is rewritten to point
    /// at the canonical node.
    pub fn add_edge(&self, edge: EdgeRef) -> EdgeRef {
        let canonical = self.core.raw.lock().insert_edge(edge);
        self.refresh();
        canonical
    }

    /// Remove nodes and their incident edges from the raw store.
    /// The published view changes on the next commit.
    pub fn remove_nodes<I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = NodeKey>,
    {
        let removed = {
            let mut raw = self.core.raw.lock();
            keys.into_iter().filter(|key| raw.remove_node(key)).count()
        };
        if removed > 0 {
            self.refresh();
        }
        removed
    }

    /// Remove edges from the raw store; endpoints stay
    pub fn remove_edges<I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = EdgeKey>,
    {
        let removed = {
            let mut raw = self.core.raw.lock();
            keys.into_iter()
                .filter(|key| raw.edges.remove(key).is_some())
                .count()
        };
        if removed > 0 {
            self.refresh();
        }
        removed
    }

    /// Add (or find) the edge `a`–`b` and record a frame sent by `origin`
    pub fn record_traffic(
        &self,
        a: NodeRef,
        b: NodeRef,
        origin: &NodeKey,
        source: &str,
        frame: FrameRecord,
    ) -> Result<EdgeRef> {
        if a.key() != origin && b.key() != origin {
            return Err(GraphError::invalid_argument(format!(
                "Frame origin {} is not an endpoint of ({},{})",
                origin,
                a.key(),
                b.key()
            )));
        }
        let edge = self.add_edge(BidirectionalEdge::shared(a, b));
        edge.record_frame(origin, source, frame);
        Ok(edge)
    }

    /// Make the raw store hold exactly `nodes` and `edges` (by instance).
    ///
    /// Entries already present keep their insertion position.
    pub(crate) fn sync_raw(&self, nodes: &[NodeRef], edges: &[EdgeRef]) {
        {
            let mut raw = self.core.raw.lock();

            let wanted_nodes: AHashMap<&NodeKey, &NodeRef> =
                nodes.iter().map(|n| (n.key(), n)).collect();
            raw.nodes.retain(|key, entry| {
                wanted_nodes
                    .get(key)
                    .is_some_and(|n| Arc::ptr_eq(n, &entry.value))
            });

            let wanted_edges: AHashMap<EdgeKey, &EdgeRef> =
                edges.iter().map(|e| (e.key(), e)).collect();
            let live_nodes: AHashSet<NodeKey> = raw.nodes.keys().cloned().collect();
            raw.edges.retain(|key, entry| {
                let (low, high) = key.endpoints();
                live_nodes.contains(low)
                    && live_nodes.contains(high)
                    && wanted_edges
                        .get(key)
                        .is_some_and(|e| Arc::ptr_eq(e, &entry.value))
            });

            for node in nodes {
                raw.insert_node(Arc::clone(node));
            }
            for edge in edges {
                raw.insert_edge(Arc::clone(edge));
            }
        }
        self.refresh();
    }

    /// Add many nodes and edges under one lock, with a single refresh
    pub(crate) fn extend_raw(&self, nodes: &[NodeRef], edges: &[EdgeRef]) {
        {
            let mut raw = self.core.raw.lock();
            for node in nodes {
                raw.insert_node(Arc::clone(node));
            }
            for edge in edges {
                raw.insert_edge(Arc::clone(edge));
            }
        }
        self.refresh();
    }

    // ───────────────────────────────────────────────────────────────────────
    // Raw queries
    // ───────────────────────────────────────────────────────────────────────

    /// Raw-store edges touching `key`, in insertion order
    pub fn edges_involving(&self, key: &NodeKey) -> Vec<EdgeRef> {
        let raw = self.core.raw.lock();
        let mut hits: Vec<&Entry<EdgeRef>> = raw
            .edges
            .iter()
            .filter(|(edge_key, _)| edge_key.involves(key))
            .map(|(_, entry)| entry)
            .collect();
        hits.sort_unstable_by_key(|e| e.seq);
        hits.into_iter().map(|e| Arc::clone(&e.value)).collect()
    }

    /// Canonical raw node for `key`
    pub fn node(&self, key: &NodeKey) -> Option<NodeRef> {
        self.core.raw.lock().nodes.get(key).map(|e| Arc::clone(&e.value))
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<EdgeRef> {
        self.core.raw.lock().edges.get(key).map(|e| Arc::clone(&e.value))
    }

    /// Every raw node regardless of commit state, in insertion order
    pub fn raw_nodes(&self) -> Vec<NodeRef> {
        self.core.raw.lock().nodes_in_order()
    }

    pub fn raw_edges(&self) -> Vec<EdgeRef> {
        self.core
            .raw
            .lock()
            .edges_in_order()
            .into_iter()
            .map(|(_, edge)| edge)
            .collect()
    }

    pub fn raw_node_count(&self) -> usize {
        self.core.raw.lock().nodes.len()
    }

    pub fn raw_edge_count(&self) -> usize {
        self.core.raw.lock().edges.len()
    }

    /// Raw nodes not yet in the published view
    pub fn pending_nodes(&self) -> Vec<NodeRef> {
        let published = self.published();
        self.raw_nodes()
            .into_iter()
            .filter(|n| !published.contains_node(n.key()))
            .collect()
    }

    // ───────────────────────────────────────────────────────────────────────
    // Published view
    // ───────────────────────────────────────────────────────────────────────

    pub fn published(&self) -> Arc<PublishedView> {
        self.core.published.load_full()
    }

    pub fn published_nodes(&self) -> Vec<NodeRef> {
        self.published().nodes().to_vec()
    }

    pub fn published_edges(&self) -> Vec<EdgeRef> {
        self.published().edges().to_vec()
    }

    pub fn index_of_node(&self, key: &NodeKey) -> Option<usize> {
        self.published().index_of_node(key)
    }

    pub fn index_of_edge(&self, key: &EdgeKey) -> Option<usize> {
        self.published().index_of_edge(key)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Commit pipeline
    // ───────────────────────────────────────────────────────────────────────

    /// Request a commit. Never blocks.
    ///
    /// Requests within one commit interval coalesce into a single commit at
    /// the end of the window.
    pub fn refresh(&self) {
        if !self.core.scheduler.request() {
            trace!(graph = %self.core.id, "Refresh coalesced");
            return;
        }

        let weak = self.downgrade();
        let scheduled = self
            .core
            .publisher
            .schedule_after(self.core.scheduler.interval(), move || {
                if let Some(graph) = weak.upgrade() {
                    graph.commit();
                }
            });

        if let Err(e) = scheduled {
            self.core.scheduler.cancel();
            warn!(graph = %self.core.id, error = %e, "Commit could not be scheduled");
        }
    }

    /// Commit now on the publisher and wait for it.
    ///
    /// An already armed commit stays armed, so refreshes after a flush still
    /// coalesce into that window.
    pub fn flush(&self) -> Result<()> {
        let weak = self.downgrade();
        self.core.publisher.run_sync(move || {
            if let Some(graph) = weak.upgrade() {
                graph.publish_pending();
            }
        })
    }

    /// Scheduled commit: releases the armed window, then publishes.
    /// Publisher thread only.
    pub(crate) fn commit(&self) {
        self.core.scheduler.begin_commit();
        self.publish_pending();
    }

    /// Diff the raw store against the published view and publish the delta
    fn publish_pending(&self) {
        debug_assert!(self.core.publisher.is_current());

        let hook = self.core.commit_hook.read().clone();
        if let Some(hook) = hook {
            hook.before_commit(self);
        }

        let (raw_nodes, raw_edges) = {
            let raw = self.core.raw.lock();
            (raw.nodes_in_order(), raw.edges_in_order())
        };
        let current = self.core.published.load_full();

        let raw_node_map: AHashMap<&NodeKey, &NodeRef> =
            raw_nodes.iter().map(|n| (n.key(), n)).collect();
        let raw_edge_map: AHashMap<&EdgeKey, &EdgeRef> =
            raw_edges.iter().map(|(k, e)| (k, e)).collect();

        // An instance replaced under the same key counts as remove + add
        let (kept_nodes, removed_nodes): (Vec<NodeRef>, Vec<NodeRef>) =
            current.nodes().iter().cloned().partition(|n| {
                raw_node_map
                    .get(n.key())
                    .is_some_and(|r| Arc::ptr_eq(r, n))
            });
        let (kept_edges, removed_edges): (Vec<(EdgeKey, EdgeRef)>, Vec<(EdgeKey, EdgeRef)>) = current
            .edges()
            .iter()
            .map(|e| (e.key(), Arc::clone(e)))
            .partition(|(k, e)| raw_edge_map.get(k).is_some_and(|r| Arc::ptr_eq(r, e)));

        let added_nodes: Vec<NodeRef> = raw_nodes
            .iter()
            .filter(|n| !current.node(n.key()).is_some_and(|p| Arc::ptr_eq(p, n)))
            .cloned()
            .collect();
        let added_edges: Vec<(EdgeKey, EdgeRef)> = raw_edges
            .iter()
            .filter(|(k, e)| !current.edge(k).is_some_and(|p| Arc::ptr_eq(p, e)))
            .cloned()
            .collect();

        self.core.scheduler.record_commit();

        if removed_nodes.is_empty()
            && removed_edges.is_empty()
            && added_nodes.is_empty()
            && added_edges.is_empty()
        {
            trace!(graph = %self.core.id, "Commit found nothing to publish");
            return;
        }

        let revision = current.revision() + 1;
        let mut nodes = kept_nodes;
        nodes.extend(added_nodes.iter().cloned());
        let mut edges = kept_edges;
        edges.extend(added_edges.iter().cloned());
        self.core
            .published
            .store(Arc::new(PublishedView::from_parts(revision, nodes, edges)));

        let observer = self.dirty_observer();
        for node in &removed_nodes {
            node.detach_observer(&observer);
        }
        for node in &added_nodes {
            node.flag_dirty();
            node.attach_observer(observer.clone());
        }

        debug!(
            graph = %self.core.id,
            revision,
            added_nodes = added_nodes.len(),
            removed_nodes = removed_nodes.len(),
            added_edges = added_edges.len(),
            removed_edges = removed_edges.len(),
            "Committed"
        );

        self.notify_view_listeners(&ViewChange {
            graph: self.core.id,
            revision,
            cleared: false,
            added_nodes,
            removed_nodes,
            added_edges: added_edges.into_iter().map(|(_, e)| e).collect(),
            removed_edges: removed_edges.into_iter().map(|(_, e)| e).collect(),
        });
    }

    /// Empty the raw store and the published view, then raise `Cleared`.
    ///
    /// Writers racing with the clear may re-add entities right after it;
    /// the raw store stays consistent either way.
    pub fn clear_topology(&self) -> Result<()> {
        {
            let mut raw = self.core.raw.lock();
            debug!(
                graph = %self.core.id,
                nodes = raw.nodes.len(),
                edges = raw.edges.len(),
                "Clearing raw store"
            );
            raw.clear();
        }

        let weak = self.downgrade();
        self.core.publisher.run_sync(move || {
            if let Some(graph) = weak.upgrade() {
                graph.publish_cleared();
            }
        })?;
        info!(graph = %self.core.id, name = %self.name(), "Topology cleared");
        Ok(())
    }

    fn publish_cleared(&self) {
        let previous = self.core.published.load_full();
        let revision = previous.revision() + 1;
        self.core
            .published
            .store(Arc::new(PublishedView::empty(revision)));

        let observer = self.dirty_observer();
        for node in previous.nodes() {
            node.detach_observer(&observer);
        }

        self.notify_view_listeners(&ViewChange {
            graph: self.core.id,
            revision,
            cleared: true,
            added_nodes: Vec::new(),
            removed_nodes: previous.nodes().to_vec(),
            added_edges: Vec::new(),
            removed_edges: previous.edges().to_vec(),
        });
        self.core.events.emit(GraphEvent::Cleared { graph: self.core.id });
    }

    // ───────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ───────────────────────────────────────────────────────────────────────

    pub fn subscribe<H>(&self, handler: H) -> SubscriptionId
    where
        H: GraphEventHandler + 'static,
    {
        self.core.events.subscribe(Arc::new(handler))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.core.events.unsubscribe(id)
    }

    pub(crate) fn emit(&self, event: GraphEvent) {
        self.core.events.emit(event);
    }

    /// Register for published-view deltas. Dropped listeners are pruned.
    pub fn add_view_listener(&self, listener: Weak<dyn ViewListener>) {
        self.core.view_listeners.lock().push(listener);
    }

    pub(crate) fn set_commit_hook(&self, hook: Arc<dyn CommitHook>) {
        let mut slot = self.core.commit_hook.write();
        if slot.is_some() {
            warn!(graph = %self.core.id, "Replacing existing commit hook");
        }
        *slot = Some(hook);
    }

    fn dirty_observer(&self) -> Weak<dyn DirtyObserver> {
        let observer: Arc<dyn DirtyObserver> = self.core.events.clone();
        Arc::downgrade(&observer)
    }

    fn notify_view_listeners(&self, change: &ViewChange) {
        let listeners: Vec<Arc<dyn ViewListener>> = {
            let mut guard = self.core.view_listeners.lock();
            guard.retain(|weak| weak.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.on_view_changed(change);
        }
    }

    pub fn stats(&self) -> GraphStats {
        let (raw_nodes, raw_edges) = {
            let raw = self.core.raw.lock();
            (raw.nodes.len(), raw.edges.len())
        };
        let published = self.published();
        GraphStats {
            graph: self.core.id,
            name: self.core.config.name.clone(),
            raw_nodes,
            raw_edges,
            published_nodes: published.node_count(),
            published_edges: published.edge_count(),
            revision: published.revision(),
            commits: self.core.scheduler.commits(),
            refresh_requests: self.core.scheduler.requests(),
        }
    }
}

impl GraphView for NetworkGraph {
    fn store(&self) -> &NetworkGraph {
        self
    }
}

impl fmt::Debug for NetworkGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkGraph")
            .field("id", &self.core.id)
            .field("name", &self.core.config.name)
            .field("revision", &self.published().revision())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::Node;
    use parking_lot::Mutex as PlMutex;
    use std::net::Ipv4Addr;

    fn graph() -> NetworkGraph {
        NetworkGraph::new(GraphConfig::immediate().name("unit")).unwrap()
    }

    fn host(last: u8) -> NodeRef {
        Node::host(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_add_node_dedups() {
        let g = graph();
        let first = g.add_node(host(1));
        let second = g.add_node(host(1));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(g.raw_node_count(), 1);
    }

    #[test]
    fn test_add_edge_rewrites_endpoints_to_canonical() {
        let g = graph();
        let canonical = g.add_node(host(1));
        let stray = host(1);
        let edge = BidirectionalEdge::shared(Arc::clone(&stray), host(2));

        let stored = g.add_edge(Arc::clone(&edge));
        assert!(Arc::ptr_eq(&stored, &edge));
        assert!(Arc::ptr_eq(&edge.source(), &canonical));
        assert_eq!(g.raw_node_count(), 2);

        let duplicate = BidirectionalEdge::shared(host(2), host(1));
        assert!(Arc::ptr_eq(&g.add_edge(duplicate), &edge));
        assert_eq!(g.raw_edge_count(), 1);
    }

    #[test]
    fn test_remove_nodes_cascades_edges() {
        let g = graph();
        g.add_edge(BidirectionalEdge::shared(host(1), host(2)));
        g.add_edge(BidirectionalEdge::shared(host(2), host(3)));
        assert_eq!(g.remove_nodes([host(2).key().clone()]), 1);
        assert_eq!(g.raw_node_count(), 2);
        assert_eq!(g.raw_edge_count(), 0);
    }

    #[test]
    fn test_flush_publishes_raw_state() {
        let g = graph();
        let a = g.add_node(host(1));
        g.add_node(host(2));
        g.flush().unwrap();

        let view = g.published();
        assert_eq!(view.node_count(), 2);
        assert_eq!(view.index_of_node(a.key()), Some(0));
        assert!(a.is_dirty());
        assert!(g.stats().is_converged());
    }

    #[test]
    fn test_instance_replacement_republishes() {
        let g = graph();
        let first = g.add_node(host(1));
        g.flush().unwrap();

        g.remove_nodes([first.key().clone()]);
        let second = g.add_node(host(1));
        g.flush().unwrap();

        let published = g.published();
        assert_eq!(published.node_count(), 1);
        assert!(Arc::ptr_eq(&published.nodes()[0], &second));
    }

    #[test]
    fn test_dirtying_published_node_emits_event() {
        let g = graph();
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        g.subscribe(move |event: &GraphEvent| sink.lock().push(event.clone()));

        let a = g.add_node(host(1));
        a.set_title("gateway");
        assert!(seen.lock().is_empty());

        g.flush().unwrap();
        a.set_title("router");
        assert_eq!(
            *seen.lock(),
            vec![GraphEvent::NodeDirtied {
                graph: g.id(),
                node: a.key().clone()
            }]
        );
    }

    #[test]
    fn test_unpublished_node_detaches_from_events() {
        let g = graph();
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        g.subscribe(move |event: &GraphEvent| sink.lock().push(event.clone()));

        let a = g.add_node(host(1));
        g.flush().unwrap();
        assert_eq!(a.observer_count(), 1);

        g.remove_nodes([a.key().clone()]);
        g.flush().unwrap();
        assert_eq!(a.observer_count(), 0);
        a.set_title("gone");
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_cleared_nodes_detach_from_events() {
        let g = graph();
        let a = g.add_node(host(1));
        let b = g.add_node(host(2));
        g.flush().unwrap();
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        g.subscribe(move |event: &GraphEvent| sink.lock().push(event.clone()));

        g.clear_topology().unwrap();
        assert_eq!(a.observer_count(), 0);
        assert_eq!(b.observer_count(), 0);
        a.annotate("role", "dns");
        assert_eq!(*seen.lock(), vec![GraphEvent::Cleared { graph: g.id() }]);
    }

    #[test]
    fn test_record_traffic_rejects_foreign_origin() {
        let g = graph();
        let err = g
            .record_traffic(host(1), host(2), host(3).key(), "pcap", FrameRecord::new("TCP", 1, 10))
            .unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::InvalidArgument);
        assert_eq!(g.raw_edge_count(), 0);
    }

    #[test]
    fn test_sync_raw_keeps_matching_entries() {
        let g = graph();
        let a = host(1);
        let b = host(2);
        let c = host(3);
        let ab = BidirectionalEdge::shared(Arc::clone(&a), Arc::clone(&b));
        g.sync_raw(&[Arc::clone(&a), Arc::clone(&b)], &[Arc::clone(&ab)]);
        g.sync_raw(&[Arc::clone(&b), Arc::clone(&c)], &[]);

        let keys: Vec<NodeKey> = g.raw_nodes().iter().map(|n| n.key().clone()).collect();
        assert_eq!(keys, vec![b.key().clone(), c.key().clone()]);
        assert_eq!(g.raw_edge_count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = NetworkGraph::new(GraphConfig::immediate().name("")).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Config);
    }
}
