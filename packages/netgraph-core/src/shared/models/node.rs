//! Topology nodes
//!
//! A node is a shared, mutable reference object (`NodeRef = Arc<Node>`) whose
//! equality and hash depend only on its [`NodeKey`]. Title, annotations, the
//! dirty flag and the cached network assignment can all change while the node
//! sits in a store's hash map.

use ipnet::IpNet;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::cache_cell::{CacheCell, Cached};

/// Shared handle to a canonical node
pub type NodeRef = Arc<Node>;

/// Attribute key holding the node variant
pub const ATTR_KIND: &str = "kind";
/// Attribute key holding the containing CIDR range
pub const ATTR_NETWORK: &str = "network";

// ═══════════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════════

/// Node variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Host,
    SwitchPort,
    Cloud,
    PanDevice,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Host => "host",
            NodeKind::SwitchPort => "switch_port",
            NodeKind::Cloud => "cloud",
            NodeKind::PanDevice => "pan_device",
        }
    }
}

/// Stable identity of a node.
///
/// String components must be non-empty; the constructors panic otherwise,
/// since an incomplete key would corrupt deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKey {
    /// IP host
    Host(IpAddr),
    /// Port on a managed switch
    SwitchPort { switch: String, port: String },
    /// Aggregate for traffic leaving the observed network
    Cloud(String),
    /// Personal-area-network device (Bluetooth, Zigbee, ...)
    PanDevice(String),
}

impl NodeKey {
    pub fn host(addr: impl Into<IpAddr>) -> Self {
        NodeKey::Host(addr.into())
    }

    pub fn switch_port(switch: impl Into<String>, port: impl Into<String>) -> Self {
        let key = NodeKey::SwitchPort {
            switch: switch.into(),
            port: port.into(),
        };
        key.assert_complete();
        key
    }

    pub fn cloud(name: impl Into<String>) -> Self {
        let key = NodeKey::Cloud(name.into());
        key.assert_complete();
        key
    }

    pub fn pan_device(id: impl Into<String>) -> Self {
        let key = NodeKey::PanDevice(id.into());
        key.assert_complete();
        key
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeKey::Host(_) => NodeKind::Host,
            NodeKey::SwitchPort { .. } => NodeKind::SwitchPort,
            NodeKey::Cloud(_) => NodeKind::Cloud,
            NodeKey::PanDevice(_) => NodeKind::PanDevice,
        }
    }

    /// Address used for subnet grouping
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            NodeKey::Host(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            NodeKey::Host(_) => true,
            NodeKey::SwitchPort { switch, port } => !switch.is_empty() && !port.is_empty(),
            NodeKey::Cloud(name) => !name.is_empty(),
            NodeKey::PanDevice(id) => !id.is_empty(),
        }
    }

    fn assert_complete(&self) {
        assert!(self.is_complete(), "incomplete node identity: {:?}", self);
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Host(addr) => write!(f, "{}", addr),
            NodeKey::SwitchPort { switch, port } => write!(f, "{}:{}", switch, port),
            NodeKey::Cloud(name) => write!(f, "{}", name),
            NodeKey::PanDevice(id) => write!(f, "{}", id),
        }
    }
}

impl From<IpAddr> for NodeKey {
    fn from(addr: IpAddr) -> Self {
        NodeKey::Host(addr)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Dirty notification
// ═══════════════════════════════════════════════════════════════════════════

/// Receives a callback whenever an attached node is dirtied.
pub trait DirtyObserver: Send + Sync {
    fn node_dirtied(&self, key: &NodeKey);
}

// ═══════════════════════════════════════════════════════════════════════════
// Node
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Labels {
    title: String,
    subtitle: Option<String>,
}

pub struct Node {
    key: NodeKey,
    labels: RwLock<Labels>,
    annotations: RwLock<BTreeMap<String, String>>,
    dirty: AtomicBool,
    network: CacheCell<Option<IpNet>>,
    observers: Mutex<Vec<Weak<dyn DirtyObserver>>>,
}

impl Node {
    /// New node titled after its key.
    ///
    /// # Panics
    /// If `key` has an empty component.
    pub fn new(key: NodeKey) -> Self {
        key.assert_complete();
        let title = key.to_string();
        Self {
            key,
            labels: RwLock::new(Labels {
                title,
                subtitle: None,
            }),
            annotations: RwLock::new(BTreeMap::new()),
            dirty: AtomicBool::new(false),
            network: CacheCell::new(),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn shared(key: NodeKey) -> NodeRef {
        Arc::new(Self::new(key))
    }

    pub fn host(addr: impl Into<IpAddr>) -> NodeRef {
        Self::shared(NodeKey::host(addr))
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn kind(&self) -> NodeKind {
        self.key.kind()
    }

    pub fn address(&self) -> Option<IpAddr> {
        self.key.address()
    }

    pub fn title(&self) -> String {
        self.labels.read().title.clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        let changed = {
            let mut labels = self.labels.write();
            if labels.title == title {
                false
            } else {
                labels.title = title;
                true
            }
        };
        if changed {
            self.mark_dirty();
        }
    }

    pub fn subtitle(&self) -> Option<String> {
        self.labels.read().subtitle.clone()
    }

    pub fn set_subtitle(&self, subtitle: Option<String>) {
        let changed = {
            let mut labels = self.labels.write();
            if labels.subtitle == subtitle {
                false
            } else {
                labels.subtitle = subtitle;
                true
            }
        };
        if changed {
            self.mark_dirty();
        }
    }

    pub fn annotate(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let previous = self.annotations.write().insert(key, value.clone());
        if previous.as_deref() != Some(value.as_str()) {
            self.mark_dirty();
        }
    }

    pub fn remove_annotation(&self, key: &str) -> Option<String> {
        let removed = self.annotations.write().remove(key);
        if removed.is_some() {
            self.mark_dirty();
        }
        removed
    }

    pub fn annotation(&self, key: &str) -> Option<String> {
        self.annotations.read().get(key).cloned()
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.annotations.read().clone()
    }

    /// Cached network assignment
    pub fn network(&self) -> Cached<Option<IpNet>> {
        self.network.state()
    }

    pub(crate) fn network_cell(&self) -> &CacheCell<Option<IpNet>> {
        &self.network
    }

    /// Grouping attributes: annotations, `kind`, and `network` once computed.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        let mut attrs = self.annotations();
        attrs.insert(ATTR_KIND.to_string(), self.kind().as_str().to_string());
        if let Some(Some(net)) = self.network.peek() {
            attrs.insert(ATTR_NETWORK.to_string(), net.to_string());
        }
        attrs
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Read and clear the dirty flag (renderer side)
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Set the dirty flag and notify every attached store.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);

        let observers: Vec<Arc<dyn DirtyObserver>> = {
            let mut guard = self.observers.lock();
            guard.retain(|weak| weak.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in observers {
            observer.node_dirtied(&self.key);
        }
    }

    /// Set the dirty flag without notifying (used by commits).
    pub(crate) fn flag_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub(crate) fn attach_observer(&self, observer: Weak<dyn DirtyObserver>) {
        let mut guard = self.observers.lock();
        guard.retain(|weak| weak.strong_count() > 0);
        if !guard.iter().any(|existing| Weak::ptr_eq(existing, &observer)) {
            guard.push(observer);
        }
    }

    pub(crate) fn detach_observer(&self, observer: &Weak<dyn DirtyObserver>) {
        self.observers
            .lock()
            .retain(|weak| weak.strong_count() > 0 && !Weak::ptr_eq(weak, observer));
    }

    pub(crate) fn observer_count(&self) -> usize {
        let mut guard = self.observers.lock();
        guard.retain(|weak| weak.strong_count() > 0);
        guard.len()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("key", &self.key)
            .field("title", &self.labels.read().title)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}
