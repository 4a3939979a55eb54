//! Per-store notification fan-out

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::features::graph_store::domain::{GraphEvent, GraphId, SubscriptionId};
use crate::features::graph_store::ports::GraphEventHandler;
use crate::shared::models::{DirtyObserver, NodeKey};

/// Delivers [`GraphEvent`]s to subscribers.
///
/// Handlers are invoked outside the subscriber lock, so a handler may
/// subscribe or unsubscribe without deadlocking.
pub struct EventBus {
    graph: GraphId,
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, Arc<dyn GraphEventHandler>)>>,
}

impl EventBus {
    pub fn new(graph: GraphId) -> Self {
        Self {
            graph,
            next_id: AtomicU64::new(1),
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, handler: Arc<dyn GraphEventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, handler));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn emit(&self, event: GraphEvent) {
        let handlers: Vec<Arc<dyn GraphEventHandler>> =
            self.handlers.lock().iter().map(|(_, h)| Arc::clone(h)).collect();
        trace!(graph = %self.graph, ?event, handlers = handlers.len(), "Emitting graph event");
        for handler in handlers {
            handler.handle(&event);
        }
    }
}

impl DirtyObserver for EventBus {
    fn node_dirtied(&self, key: &NodeKey) {
        self.emit(GraphEvent::NodeDirtied {
            graph: self.graph,
            node: key.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_subscribers_until_unsubscribed() {
        let graph = GraphId::next();
        let bus = EventBus::new(graph);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = bus.subscribe(Arc::new(move |event: &GraphEvent| sink.lock().push(event.clone())));

        bus.emit(GraphEvent::Cleared { graph });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(GraphEvent::GroupingInvalidated { graph });

        assert_eq!(*seen.lock(), vec![GraphEvent::Cleared { graph }]);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_dirty_observer_emits_node_dirtied() {
        let graph = GraphId::next();
        let bus = EventBus::new(graph);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(Arc::new(move |event: &GraphEvent| sink.lock().push(event.clone())));

        let key = NodeKey::cloud("internet");
        bus.node_dirtied(&key);
        assert_eq!(*seen.lock(), vec![GraphEvent::NodeDirtied { graph, node: key }]);
    }
}
