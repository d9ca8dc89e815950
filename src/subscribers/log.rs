//! # LogWriter: renders supervisor events through `tracing`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  cycle=1 state=BuildingPlugins
//! INFO  cycle=1 plugins=2 retrieved plugins
//! INFO  cycle=1 plugin="volcano.sh/vgpu-number" registered with node agent
//! WARN  cycle=2 plugin="volcano.sh/vgpu-number" err="connection refused" could not contact node agent, retrying
//! INFO  path="/var/lib/kubelet/device-plugins/kubelet.sock" created, restarting
//! INFO  signal=SIGTERM received signal, shutting down
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let cycle = e.cycle.unwrap_or_default();
        let plugin = e.plugin.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::HardwareInitFailed => {
                warn!(err = reason, "failed to initialize hardware access");
                info!("if this is an accelerator node, check that the container runtime exposes the driver");
                info!("if this is not an accelerator node, restrict the daemon with a toleration or node selector");
            }
            EventKind::HardwareShutdown => info!(result = reason, "hardware access shut down"),
            EventKind::StateChanged => debug!(cycle, state = ?e.state, "state changed"),
            EventKind::PluginsResolved => {
                info!(cycle, plugins = e.count.unwrap_or_default(), "retrieved plugins")
            }
            EventKind::PluginSkipped => debug!(cycle, plugin, "no devices, skipping plugin"),
            EventKind::PluginStarting => {
                debug!(cycle, plugin, devices = e.count.unwrap_or_default(), "starting plugin")
            }
            EventKind::PluginStarted => info!(cycle, plugin, "registered with node agent"),
            EventKind::PluginStartFailed => {
                warn!(cycle, plugin, err = reason, "could not contact node agent, retrying");
            }
            EventKind::StartTimedOut => {
                warn!(cycle, plugin, timeout_ms = e.timeout_ms.unwrap_or_default(), "plugin start timed out");
            }
            EventKind::PluginStopped => debug!(cycle, plugin, "plugin stopped"),
            EventKind::NoDevices => info!(cycle, "no devices found, waiting indefinitely"),
            EventKind::RestartDelayed => {
                info!(cycle, delay_ms = e.delay_ms.unwrap_or_default(), "restart delayed after plugin failure");
            }
            EventKind::AgentRestartDetected => info!(path = reason, "agent socket created, restarting"),
            EventKind::ReloadRequested => info!(signal = ?e.signal, "received reload signal, restarting"),
            EventKind::ShutdownRequested => info!(signal = ?e.signal, "received signal, shutting down"),
            EventKind::WatchError => warn!(err = reason, "filesystem watcher error"),
            EventKind::SubscriberOverflow => warn!(subscriber = plugin, reason, "subscriber dropped event"),
            EventKind::SubscriberPanicked => error!(subscriber = plugin, info = reason, "subscriber panicked"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
