//! LogicalGraph - a store that groups hosts into CIDR subnets
//!
//! The partition is owned here and exposed through `add_subnet`,
//! `remove_subnet` and `subscribe_partition`; management surfaces subscribe
//! instead of holding the list.

use ipnet::IpNet;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::{GraphConfig, SubnetConfig, Validatable};
use crate::errors::Result;
use crate::features::graph_store::{
    CommitHook, GraphEvent, GraphView, NetworkGraph, SubscriptionId,
};
use crate::features::subnet::domain::{CidrPartition, PartitionChange};
use crate::shared::models::{Cached, Node, NodeRef};

type PartitionHandler = Arc<dyn Fn(&PartitionChange) + Send + Sync>;

struct SubnetManager {
    config: SubnetConfig,
    partition: Arc<RwLock<CidrPartition>>,
    handlers: Mutex<Vec<(SubscriptionId, PartitionHandler)>>,
    next_handler: AtomicU64,
}

impl SubnetManager {
    fn prefix_for(&self, addr: &IpAddr) -> u8 {
        match addr {
            IpAddr::V4(_) => self.config.ipv4_prefix,
            IpAddr::V6(_) => self.config.ipv6_prefix,
        }
    }

    /// Invalidate affected nodes, tell subscribers, then recompute on the publisher
    fn partition_changed(&self, graph: &NetworkGraph, change: PartitionChange) {
        if change.is_empty() {
            return;
        }

        let affected: Vec<NodeRef> = graph
            .raw_nodes()
            .into_iter()
            .filter(|node| {
                let Some(addr) = node.address() else {
                    return false;
                };
                node.network_cell().invalidate_if(|state| match state {
                    Cached::Computed(Some(_)) => change.removed.iter().any(|net| net.contains(&addr)),
                    Cached::Computed(None) => !change.added.is_empty(),
                    // Unresolved hosts inside a new range
                    Cached::Unset => change.added.iter().any(|net| net.contains(&addr)),
                })
            })
            .collect();

        debug!(
            graph = %graph.id(),
            added = change.added.len(),
            removed = change.removed.len(),
            invalidated = affected.len(),
            "Subnet partition changed"
        );

        let handlers: Vec<PartitionHandler> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            handler(&change);
        }

        let partition = Arc::clone(&self.partition);
        let weak = graph.downgrade();
        let posted = graph.publisher().execute(move || {
            let Some(graph) = weak.upgrade() else {
                return;
            };
            for node in &affected {
                resolve_network(&partition, node);
                node.mark_dirty();
            }
            graph.emit(GraphEvent::GroupingInvalidated { graph: graph.id() });
        });
        if let Err(e) = posted {
            warn!(graph = %graph.id(), error = %e, "Grouping recomputation not scheduled");
        }
    }
}

impl CommitHook for SubnetManager {
    /// Propose `addr/prefix` ranges for new, never-assigned hosts
    fn before_commit(&self, graph: &NetworkGraph) {
        if !self.config.dynamic_subnets {
            return;
        }

        let mut proposals = BTreeSet::new();
        for node in graph.pending_nodes() {
            if !node.network_cell().is_unset() {
                continue;
            }
            let Some(addr) = node.address() else {
                continue;
            };
            match IpNet::new(addr, self.prefix_for(&addr)) {
                Ok(net) => {
                    proposals.insert(net.trunc());
                }
                Err(e) => warn!(%addr, error = %e, "Invalid subnet prefix"),
            }
        }
        if proposals.is_empty() {
            return;
        }

        let added: Vec<IpNet> = {
            let mut partition = self.partition.write();
            proposals
                .into_iter()
                .filter(|net| {
                    let inserted = partition.insert(*net);
                    if !inserted {
                        trace!(%net, "Subnet proposal overlaps an existing range");
                    }
                    inserted
                })
                .collect()
        };
        if !added.is_empty() {
            debug!(graph = %graph.id(), subnets = ?added, "Created dynamic subnets");
            self.partition_changed(graph, PartitionChange::added(added));
        }
    }
}

fn resolve_network(partition: &RwLock<CidrPartition>, node: &Node) -> Option<IpNet> {
    node.network_cell()
        .get_or_compute(|| node.address().and_then(|addr| partition.read().containing(addr)))
}

/// Store with a CIDR partition and optional dynamic subnet creation.
///
/// Derefs to the underlying [`NetworkGraph`] for mutations and commits.
#[derive(Clone)]
pub struct LogicalGraph {
    graph: NetworkGraph,
    subnets: Arc<SubnetManager>,
}

impl LogicalGraph {
    pub fn new(config: GraphConfig, subnets: SubnetConfig) -> Result<Self> {
        subnets.validate()?;
        let graph = NetworkGraph::new(config)?;
        let manager = Arc::new(SubnetManager {
            config: subnets,
            partition: Arc::new(RwLock::new(CidrPartition::new())),
            handlers: Mutex::new(Vec::new()),
            next_handler: AtomicU64::new(1),
        });
        graph.set_commit_hook(manager.clone());

        Ok(Self {
            graph,
            subnets: manager,
        })
    }

    pub fn subnet_config(&self) -> &SubnetConfig {
        &self.subnets.config
    }

    /// Add a range by hand. Returns false (and changes nothing) on overlap.
    pub fn add_subnet(&self, net: IpNet) -> bool {
        let net = net.trunc();
        let inserted = self.subnets.partition.write().insert(net);
        if inserted {
            self.subnets
                .partition_changed(&self.graph, PartitionChange::added(vec![net]));
        } else {
            trace!(%net, "Subnet rejected");
        }
        inserted
    }

    pub fn remove_subnet(&self, net: &IpNet) -> bool {
        let net = net.trunc();
        let removed = self.subnets.partition.write().remove(&net);
        if removed {
            self.subnets
                .partition_changed(&self.graph, PartitionChange::removed(vec![net]));
        }
        removed
    }

    /// Current ranges in ascending order
    pub fn subnets(&self) -> Vec<IpNet> {
        self.subnets.partition.read().iter().copied().collect()
    }

    pub fn partition(&self) -> CidrPartition {
        self.subnets.partition.read().clone()
    }

    /// Called synchronously on every partition change
    pub fn subscribe_partition<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&PartitionChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.subnets.next_handler.fetch_add(1, Ordering::Relaxed));
        let handler: PartitionHandler = Arc::new(handler);
        self.subnets.handlers.lock().push((id, handler));
        id
    }

    pub fn unsubscribe_partition(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.subnets.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// The node's subnet, computed on first read and cached until invalidated
    pub fn network_of(&self, node: &Node) -> Option<IpNet> {
        resolve_network(&self.subnets.partition, node)
    }
}

impl Deref for LogicalGraph {
    type Target = NetworkGraph;

    fn deref(&self) -> &NetworkGraph {
        &self.graph
    }
}

impl GraphView for LogicalGraph {
    fn store(&self) -> &NetworkGraph {
        &self.graph
    }

    fn groups(&self, node: &Node) -> BTreeMap<String, String> {
        self.network_of(node);
        node.attributes()
    }
}

impl fmt::Debug for LogicalGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalGraph")
            .field("graph", &self.graph)
            .field("subnets", &self.subnets.partition.read().len())
            .field("dynamic", &self.subnets.config.dynamic_subnets)
            .finish()
    }
}
