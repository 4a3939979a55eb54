//! Configuration
//!
//! Two levels, mirroring how the graph is used:
//! - Presets (`GraphConfig::interactive()`, `GraphConfig::immediate()`) for code
//! - A versioned YAML document (`NetgraphConfig::from_yaml_file`) for deployments
//!
//! ```rust,ignore
//! use netgraph_core::config::{NetgraphConfig, GraphConfig, SubnetConfig};
//!
//! let config = NetgraphConfig::from_yaml_file("netgraph.yaml")?;
//! let graph = LogicalGraph::new(config.graph, config.subnets)?;
//! ```

pub mod error;
pub mod graph_config;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use graph_config::{
    GraphConfig, NetgraphConfig, SubnetConfig, DEFAULT_COMMIT_INTERVAL_MS,
    MAX_COMMIT_INTERVAL_MS,
};
pub use validation::Validatable;
