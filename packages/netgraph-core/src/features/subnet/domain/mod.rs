//! Subnet partition: an ordered set of non-overlapping CIDR ranges

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Non-overlapping CIDR ranges.
///
/// CIDR ranges either nest or are disjoint, so rejecting containment in both
/// directions keeps every host in at most one range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidrPartition {
    ranges: BTreeSet<IpNet>,
}

impl CidrPartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `net` (host bits cleared). Returns false if it overlaps an existing range.
    pub fn insert(&mut self, net: IpNet) -> bool {
        let net = net.trunc();
        if self.conflict(&net).is_some() {
            return false;
        }
        self.ranges.insert(net)
    }

    pub fn remove(&mut self, net: &IpNet) -> bool {
        self.ranges.remove(&net.trunc())
    }

    /// Existing range that contains or is contained by `net`
    pub fn conflict(&self, net: &IpNet) -> Option<IpNet> {
        self.ranges
            .iter()
            .find(|&existing| existing.contains(net) || net.contains(existing))
            .copied()
    }

    /// The unique range holding `addr`
    pub fn containing(&self, addr: IpAddr) -> Option<IpNet> {
        self.ranges.iter().find(|net| net.contains(&addr)).copied()
    }

    pub fn contains_range(&self, net: &IpNet) -> bool {
        self.ranges.contains(&net.trunc())
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpNet> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Ranges added to or removed from a partition in one step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionChange {
    pub added: Vec<IpNet>,
    pub removed: Vec<IpNet>,
}

impl PartitionChange {
    pub fn added(added: Vec<IpNet>) -> Self {
        Self {
            added,
            removed: Vec::new(),
        }
    }

    pub fn removed(removed: Vec<IpNet>) -> Self {
        Self {
            added: Vec::new(),
            removed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::net::Ipv4Addr;

    fn net(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    #[test]
    fn test_insert_rejects_nested_ranges() {
        let mut partition = CidrPartition::new();
        assert!(partition.insert(net("10.0.0.0/16")));
        assert!(!partition.insert(net("10.0.1.0/24")));
        assert!(!partition.insert(net("10.0.0.0/8")));
        assert!(partition.insert(net("10.1.0.0/16")));
        assert_eq!(partition.conflict(&net("10.0.9.0/24")), Some(net("10.0.0.0/16")));
        assert_eq!(partition.len(), 2);
    }

    #[test]
    fn test_insert_truncates_host_bits() {
        let mut partition = CidrPartition::new();
        assert!(partition.insert(net("192.168.1.5/24")));
        assert!(partition.contains_range(&net("192.168.1.0/24")));
        assert!(!partition.insert(net("192.168.1.0/24")));
    }

    #[test]
    fn test_containing_and_remove() {
        let mut partition = CidrPartition::new();
        partition.insert(net("172.16.0.0/12"));
        partition.insert(net("fd00::/64"));
        let addr = IpAddr::V4(Ipv4Addr::new(172, 20, 1, 1));
        assert_eq!(partition.containing(addr), Some(net("172.16.0.0/12")));
        assert_eq!(partition.containing("fd00::1".parse().unwrap()), Some(net("fd00::/64")));

        assert!(partition.remove(&net("172.16.0.0/12")));
        assert!(!partition.remove(&net("172.16.0.0/12")));
        assert_eq!(partition.containing(addr), None);
    }

    fn v4_net() -> impl Strategy<Value = IpNet> {
        (any::<u32>(), 8u8..=30).prop_map(|(bits, prefix)| {
            IpNet::new(IpAddr::V4(Ipv4Addr::from(bits)), prefix)
                .map(|n| n.trunc())
                .unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_ranges_never_nest(nets in prop::collection::vec(v4_net(), 0..64)) {
            let mut partition = CidrPartition::new();
            for n in nets {
                partition.insert(n);
            }
            let ranges: Vec<IpNet> = partition.iter().copied().collect();
            for (i, a) in ranges.iter().enumerate() {
                for b in &ranges[i + 1..] {
                    prop_assert!(!a.contains(b) && !b.contains(a), "{} overlaps {}", a, b);
                }
            }
        }
    }
}
