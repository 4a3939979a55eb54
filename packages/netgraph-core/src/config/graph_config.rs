//! Graph and subnet configuration sections plus the versioned YAML document.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::error::{ConfigError, ConfigResult};
use super::validation::{check_range, Validatable};

/// Supported YAML schema versions
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Default commit window (at most one commit per second)
pub const DEFAULT_COMMIT_INTERVAL_MS: u64 = 1_000;

/// Upper bound on the commit window
pub const MAX_COMMIT_INTERVAL_MS: u64 = 60_000;

// ═══════════════════════════════════════════════════════════════════════════
// Graph store
// ═══════════════════════════════════════════════════════════════════════════

/// Settings for a single graph store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Display name, also used for the publisher thread
    pub name: String,
    /// Rate-limit window for commits. `0` commits as soon as the publisher is free.
    pub commit_interval_ms: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::interactive()
    }
}

impl GraphConfig {
    /// One commit per second, suited to a live renderer
    pub fn interactive() -> Self {
        Self {
            name: "topology".to_string(),
            commit_interval_ms: DEFAULT_COMMIT_INTERVAL_MS,
        }
    }

    /// No coalescing window
    pub fn immediate() -> Self {
        Self {
            name: "topology".to_string(),
            commit_interval_ms: 0,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn commit_interval_ms(mut self, ms: u64) -> Self {
        self.commit_interval_ms = ms;
        self
    }

    pub fn commit_interval(&self) -> Duration {
        Duration::from_millis(self.commit_interval_ms)
    }
}

impl Validatable for GraphConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Custom("graph.name must not be empty".to_string()));
        }
        check_range(
            self.config_name(),
            "commit_interval_ms",
            self.commit_interval_ms,
            0,
            MAX_COMMIT_INTERVAL_MS,
            "Longer windows leave the renderer showing stale topology.",
        )
    }

    fn config_name(&self) -> &'static str {
        "graph"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Subnet grouping
// ═══════════════════════════════════════════════════════════════════════════

/// Dynamic CIDR subnet creation for [`LogicalGraph`](crate::features::subnet::LogicalGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubnetConfig {
    /// Create a subnet for every newly seen address not covered by an existing range
    pub dynamic_subnets: bool,
    /// Prefix length for dynamically created IPv4 ranges
    pub ipv4_prefix: u8,
    /// Prefix length for dynamically created IPv6 ranges
    pub ipv6_prefix: u8,
}

impl Default for SubnetConfig {
    fn default() -> Self {
        Self {
            dynamic_subnets: false,
            ipv4_prefix: 24,
            ipv6_prefix: 64,
        }
    }
}

impl SubnetConfig {
    /// Dynamic creation enabled with the given IPv4 prefix
    pub fn dynamic(ipv4_prefix: u8) -> Self {
        Self {
            dynamic_subnets: true,
            ipv4_prefix,
            ..Self::default()
        }
    }
}

impl Validatable for SubnetConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            self.config_name(),
            "ipv4_prefix",
            self.ipv4_prefix,
            1,
            32,
            "A /0 range would swallow every host.",
        )?;
        check_range(
            self.config_name(),
            "ipv6_prefix",
            self.ipv6_prefix,
            1,
            128,
            "A /0 range would swallow every host.",
        )
    }

    fn config_name(&self) -> &'static str {
        "subnets"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Document
// ═══════════════════════════════════════════════════════════════════════════

/// Versioned YAML document
///
/// ```yaml
/// version: 1
/// graph:
///   name: lab
///   commit_interval_ms: 500
/// subnets:
///   dynamic_subnets: true
///   ipv4_prefix: 24
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetgraphConfig {
    pub version: u32,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub subnets: SubnetConfig,
}

impl Default for NetgraphConfig {
    fn default() -> Self {
        Self {
            version: 1,
            graph: GraphConfig::default(),
            subnets: SubnetConfig::default(),
        }
    }
}

/// Raw form used to tell a missing version apart from a wrong one
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NetgraphConfigDocument {
    version: Option<u32>,
    #[serde(default)]
    graph: GraphConfig,
    #[serde(default)]
    subnets: SubnetConfig,
}

impl NetgraphConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let doc: NetgraphConfigDocument = serde_yaml::from_str(yaml)?;
        let version = doc.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let config = Self {
            version,
            graph: doc.graph,
            subnets: doc.subnets,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self).map_err(ConfigError::Yaml)
    }
}

impl Validatable for NetgraphConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.graph.validate()?;
        self.subnets.validate()
    }
}
