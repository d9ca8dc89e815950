//! # Supervisor configuration.
//!
//! [`Config`] is captured once at startup and passed by value into the
//! [`Supervisor`](crate::Supervisor); nothing re-reads it across restart cycles.
//!
//! Sources, in order of precedence:
//! 1. [`CliArgs`] (flags, with environment fallbacks);
//! 2. per-node overrides from a JSON file ([`Config::apply_node_overrides`]);
//! 3. [`Config::default`].
//!
//! ## Sentinel values
//! - `start_timeout = 0s` → `start()` is not bounded

mod cli;
mod overrides;

use std::path::PathBuf;
use std::time::Duration;

use crate::policies::BackoffPolicy;
use crate::strategy::StrategyName;

pub use cli::CliArgs;
pub use overrides::{NodeConfig, NodeOverrides};

/// Node agent's well-known device-plugin directory.
pub const DEFAULT_PLUGIN_DIR: &str = "/var/lib/kubelet/device-plugins/";

/// Node agent's registration socket, inside [`DEFAULT_PLUGIN_DIR`].
pub const DEFAULT_AGENT_SOCKET: &str = "kubelet.sock";

/// Device partitioning knobs handed to strategy resolvers.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceSettings {
    /// Number of virtual slots each physical device is split into.
    pub split_count: u32,
    /// Memory block size factor (1 = 1MB blocks).
    pub memory_factor: u32,
    /// Ratio applied to advertised compute cores.
    pub cores_scaling: f64,
    /// Ratio applied to advertised device memory.
    pub memory_scaling: f64,
    /// Name of the node this daemon runs on.
    pub node_name: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            split_count: 2,
            memory_factor: 1,
            cores_scaling: 1.0,
            memory_scaling: 1.0,
            node_name: String::new(),
        }
    }
}

/// Global configuration for the supervisor.
#[derive(Clone, Debug)]
pub struct Config {
    /// Device-grouping strategy used for every cycle.
    pub strategy: StrategyName,

    /// If hardware init fails: `true` → `run` returns an error; `false` → block forever.
    pub fail_on_init_error: bool,

    /// Directory watched for the node agent's socket.
    pub plugin_dir: PathBuf,

    /// File name of the node agent's socket inside `plugin_dir`.
    pub agent_socket: String,

    /// Partitioning knobs passed through to resolvers.
    pub device: DeviceSettings,

    /// Bound on each plugin `start()` (`0s` = unbounded).
    pub start_timeout: Duration,

    /// Delay before a plugin-failure restart.
    pub restart_backoff: BackoffPolicy,

    /// Capacity of the event bus ring buffer (min 1).
    pub bus_capacity: usize,
}

impl Config {
    /// Full path of the socket whose creation signals an agent restart.
    pub fn agent_socket_path(&self) -> PathBuf {
        self.plugin_dir.join(&self.agent_socket)
    }

    /// Returns the start bound as an `Option` (`None` = unbounded).
    #[inline]
    pub fn start_timeout(&self) -> Option<Duration> {
        if self.start_timeout == Duration::ZERO {
            None
        } else {
            Some(self.start_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `strategy = "none"`
    /// - `fail_on_init_error = true`
    /// - `plugin_dir = /var/lib/kubelet/device-plugins/`, `agent_socket = kubelet.sock`
    /// - `start_timeout = 0s` (unbounded)
    /// - `restart_backoff = BackoffPolicy::default()`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            strategy: StrategyName::default(),
            fail_on_init_error: true,
            plugin_dir: PathBuf::from(DEFAULT_PLUGIN_DIR),
            agent_socket: DEFAULT_AGENT_SOCKET.to_string(),
            device: DeviceSettings::default(),
            start_timeout: Duration::ZERO,
            restart_backoff: BackoffPolicy::default(),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn socket_path_joins_dir() {
        let cfg = Config::default();
        assert_eq!(
            cfg.agent_socket_path(),
            Path::new("/var/lib/kubelet/device-plugins/kubelet.sock")
        );
    }

    #[test]
    fn zero_timeout_is_unbounded() {
        let mut cfg = Config::default();
        assert_eq!(cfg.start_timeout(), None);
        cfg.start_timeout = Duration::from_secs(5);
        assert_eq!(cfg.start_timeout(), Some(Duration::from_secs(5)));
    }
}
