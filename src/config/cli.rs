//! Command-line flags for daemons built on the supervisor.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use super::{Config, DeviceSettings, DEFAULT_AGENT_SOCKET, DEFAULT_PLUGIN_DIR};
use crate::strategy::StrategyName;

/// Flags of the accelerator device-plugin daemon.
#[derive(Parser, Debug, Clone)]
#[command(name = "device-plugin", about = "vGPU device-plugin supervisor")]
pub struct CliArgs {
    /// The desired strategy for exposing partitioned devices [none | single | mixed]
    #[arg(long, default_value = "none")]
    pub mig_strategy: String,

    /// Fail if an error is encountered during initialization, otherwise block indefinitely
    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub fail_on_init_error: bool,

    /// The number of virtual devices each physical device is split into
    #[arg(long, default_value_t = 2)]
    pub device_split_count: u32,

    /// Memory block size factor (1 = 1MB blocks)
    #[arg(long, default_value_t = 1)]
    pub gpu_memory_factor: u32,

    /// Ratio for device cores scaling
    #[arg(long, default_value_t = 1.0)]
    pub device_cores_scaling: f64,

    /// Node name
    #[arg(long, env = "NODE_NAME", default_value = "")]
    pub node_name: String,

    /// Directory containing the node agent's registration socket
    #[arg(long, default_value = DEFAULT_PLUGIN_DIR)]
    pub plugin_dir: PathBuf,

    /// Upper bound for each plugin registration in milliseconds (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    pub start_timeout_ms: u64,

    /// Optional JSON file with per-node overrides
    #[arg(long, env = "NODE_CONFIG")]
    pub node_config: Option<PathBuf>,
}

impl CliArgs {
    /// Captures the flags into an immutable [`Config`].
    ///
    /// Per-node overrides are not applied here; see [`Config::apply_node_overrides`].
    pub fn into_config(self) -> Config {
        Config {
            strategy: StrategyName::new(self.mig_strategy),
            fail_on_init_error: self.fail_on_init_error,
            plugin_dir: self.plugin_dir,
            agent_socket: DEFAULT_AGENT_SOCKET.to_string(),
            device: DeviceSettings {
                split_count: self.device_split_count,
                memory_factor: self.gpu_memory_factor,
                cores_scaling: self.device_cores_scaling,
                node_name: self.node_name,
                ..DeviceSettings::default()
            },
            start_timeout: Duration::from_millis(self.start_timeout_ms),
            ..Config::default()
        }
    }
}
