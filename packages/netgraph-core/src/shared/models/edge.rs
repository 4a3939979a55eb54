//! Undirected topology edges
//!
//! `(a, b)` and `(b, a)` are the same edge. Equality, hash and the display
//! form depend only on endpoint identities, never on the traffic recorded in
//! the two [`ConnectionDetails`].

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::connection::{ConnectionDetails, FrameRecord};
use super::node::{NodeKey, NodeRef};

/// Shared handle to a canonical edge
pub type EdgeRef = Arc<BidirectionalEdge>;

/// Canonical value form of an unordered endpoint pair (smaller key first).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    low: NodeKey,
    high: NodeKey,
}

impl EdgeKey {
    pub fn new(a: NodeKey, b: NodeKey) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn endpoints(&self) -> (&NodeKey, &NodeKey) {
        (&self.low, &self.high)
    }

    pub fn involves(&self, key: &NodeKey) -> bool {
        &self.low == key || &self.high == key
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display_pair(&self.low, &self.high))
    }
}

fn identity_hash(key: &NodeKey) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

fn display_pair(a: &NodeKey, b: &NodeKey) -> String {
    let (a, b) = (a.to_string(), b.to_string());
    if a <= b {
        format!("({},{})", a, b)
    } else {
        format!("({},{})", b, a)
    }
}

#[derive(Debug, Clone)]
struct Endpoints {
    source: NodeRef,
    destination: NodeRef,
}

/// Connection between two nodes with per-direction traffic.
pub struct BidirectionalEdge {
    endpoints: RwLock<Endpoints>,
    to_destination: ConnectionDetails,
    to_source: ConnectionDetails,
}

impl BidirectionalEdge {
    pub fn new(source: NodeRef, destination: NodeRef) -> Self {
        Self {
            endpoints: RwLock::new(Endpoints {
                source,
                destination,
            }),
            to_destination: ConnectionDetails::new(),
            to_source: ConnectionDetails::new(),
        }
    }

    pub fn shared(source: NodeRef, destination: NodeRef) -> EdgeRef {
        Arc::new(Self::new(source, destination))
    }

    pub fn source(&self) -> NodeRef {
        self.endpoints.read().source.clone()
    }

    pub fn destination(&self) -> NodeRef {
        self.endpoints.read().destination.clone()
    }

    pub fn source_key(&self) -> NodeKey {
        self.endpoints.read().source.key().clone()
    }

    pub fn destination_key(&self) -> NodeKey {
        self.endpoints.read().destination.key().clone()
    }

    pub fn key(&self) -> EdgeKey {
        let ends = self.endpoints.read();
        EdgeKey::new(ends.source.key().clone(), ends.destination.key().clone())
    }

    /// Replace the source with the store's canonical instance.
    ///
    /// # Panics
    /// If `node` has a different identity; swapping identities would change
    /// the hash of an edge that may already be a map key.
    pub fn set_source(&self, node: NodeRef) {
        let mut ends = self.endpoints.write();
        assert_eq!(ends.source.key(), node.key(), "set_source must keep the endpoint identity");
        ends.source = node;
    }

    /// Replace the destination with the store's canonical instance.
    ///
    /// # Panics
    /// If `node` has a different identity.
    pub fn set_destination(&self, node: NodeRef) {
        let mut ends = self.endpoints.write();
        assert_eq!(
            ends.destination.key(),
            node.key(),
            "set_destination must keep the endpoint identity"
        );
        ends.destination = node;
    }

    pub fn involves(&self, key: &NodeKey) -> bool {
        let ends = self.endpoints.read();
        ends.source.key() == key || ends.destination.key() == key
    }

    /// The endpoint opposite `key`, if `key` is an endpoint
    pub fn other(&self, key: &NodeKey) -> Option<NodeRef> {
        let ends = self.endpoints.read();
        if ends.source.key() == key {
            Some(ends.destination.clone())
        } else if ends.destination.key() == key {
            Some(ends.source.clone())
        } else {
            None
        }
    }

    /// `hash(source) ^ hash(destination)`
    pub fn hash_code(&self) -> u64 {
        let ends = self.endpoints.read();
        identity_hash(ends.source.key()) ^ identity_hash(ends.destination.key())
    }

    /// Equality against a possibly absent edge
    pub fn same_as(&self, other: Option<&BidirectionalEdge>) -> bool {
        other.is_some_and(|edge| self == edge)
    }

    /// Traffic flowing source → destination
    pub fn to_destination(&self) -> &ConnectionDetails {
        &self.to_destination
    }

    /// Traffic flowing destination → source
    pub fn to_source(&self) -> &ConnectionDetails {
        &self.to_source
    }

    /// Aggregator for traffic leaving `origin`
    pub fn details_from(&self, origin: &NodeKey) -> Option<&ConnectionDetails> {
        let ends = self.endpoints.read();
        if ends.source.key() == origin {
            Some(&self.to_destination)
        } else if ends.destination.key() == origin {
            Some(&self.to_source)
        } else {
            None
        }
    }

    /// Record a frame sent by `origin`. Returns `false` if `origin` is not an endpoint.
    pub fn record_frame(&self, origin: &NodeKey, source: &str, frame: FrameRecord) -> bool {
        match self.details_from(origin) {
            Some(details) => {
                details.record_frame(source, frame);
                true
            }
            None => false,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.to_destination.total_bytes() + self.to_source.total_bytes()
    }

    /// Display attributes for tabular views
    pub fn attributes(&self) -> BTreeMap<String, String> {
        let mut protocols = self.to_destination.protocols();
        protocols.extend(self.to_source.protocols());

        let mut attrs = BTreeMap::new();
        attrs.insert(
            "protocols".to_string(),
            protocols.into_iter().collect::<Vec<_>>().join(","),
        );
        attrs.insert(
            "bytes_to_destination".to_string(),
            self.to_destination.total_bytes().to_string(),
        );
        attrs.insert(
            "bytes_to_source".to_string(),
            self.to_source.total_bytes().to_string(),
        );
        attrs
    }
}

impl PartialEq for BidirectionalEdge {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let (a, b) = {
            let ends = self.endpoints.read();
            (ends.source.key().clone(), ends.destination.key().clone())
        };
        let ends = other.endpoints.read();
        let (c, d) = (ends.source.key(), ends.destination.key());
        (&a == c && &b == d) || (&a == d && &b == c)
    }
}

impl Eq for BidirectionalEdge {}

impl Hash for BidirectionalEdge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl fmt::Display for BidirectionalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ends = self.endpoints.read();
        write!(f, "{}", display_pair(ends.source.key(), ends.destination.key()))
    }
}

impl fmt::Debug for BidirectionalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidirectionalEdge")
            .field("edge", &self.to_string())
            .field("to_destination", &self.to_destination.total_bytes())
            .field("to_source", &self.to_source.total_bytes())
            .finish()
    }
}
