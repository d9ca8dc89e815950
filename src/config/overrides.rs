//! # Per-node configuration overrides.
//!
//! A cluster-wide JSON document lets operators tune individual nodes:
//!
//! ```json
//! {
//!   "nodeconfig": [
//!     { "name": "gpu-node-1", "devicesplitcount": 4, "devicememoryscaling": 1.5, "migstrategy": "mixed" }
//!   ]
//! }
//! ```
//!
//! The entry whose `name` equals the configured node name is applied on top of
//! the flags. Fields that are absent leave the flag value untouched.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Config;
use crate::error::ConfigError;
use crate::strategy::StrategyName;

/// Override entry for a single node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    #[serde(default, rename = "devicememoryscaling")]
    pub device_memory_scaling: Option<f64>,
    #[serde(default, rename = "devicesplitcount")]
    pub device_split_count: Option<u32>,
    #[serde(default, rename = "migstrategy")]
    pub mig_strategy: Option<StrategyName>,
}

/// The whole override document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeOverrides {
    #[serde(default, rename = "nodeconfig")]
    pub nodes: Vec<NodeConfig>,
}

impl NodeOverrides {
    /// Reads overrides from `path`. A missing file yields `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })
    }

    /// Returns the entry for `node`, if any.
    pub fn for_node(&self, node: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.name == node)
    }
}

impl Config {
    /// Applies the override entry matching `self.device.node_name`.
    ///
    /// Returns `true` if an entry matched. An empty node name never matches.
    pub fn apply_node_overrides(&mut self, overrides: &NodeOverrides) -> bool {
        if self.device.node_name.is_empty() {
            return false;
        }
        let Some(node) = overrides.for_node(&self.device.node_name) else {
            return false;
        };

        if let Some(scaling) = node.device_memory_scaling {
            self.device.memory_scaling = scaling;
        }
        if let Some(count) = node.device_split_count {
            self.device.split_count = count;
        }
        if let Some(strategy) = &node.mig_strategy {
            self.strategy = strategy.clone();
        }
        true
    }
}
