//! Supervisor phases and the triggers that move it between them.

use crate::watch::Signal;

/// Phase of the supervisor.
///
/// ```text
/// Initializing ─► BuildingPlugins ─► Starting ─► Serving ─┬─► Restarting ─► BuildingPlugins ...
///                                                         └─► Draining (terminal)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Hardware access is being set up.
    Initializing,
    /// The resolver is building this cycle's plugin set.
    BuildingPlugins,
    /// Plugins are being started, in order.
    Starting,
    /// Waiting for the next restart trigger.
    Serving,
    /// The previous cycle's plugins are being stopped.
    Restarting,
    /// A terminating signal arrived; plugins are stopped and the loop exits.
    Draining,
}

/// What woke the supervisor out of [`RunState::Serving`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RestartTrigger {
    /// A plugin failed to start this cycle.
    PluginFailure,
    /// The node agent's socket was created.
    AgentRestartDetected,
    /// A reload signal arrived.
    ReloadSignal,
    /// A terminating signal arrived.
    FatalSignal(Signal),
    /// The filesystem watcher reported an error.
    WatchError(String),
}

impl RestartTrigger {
    /// `true` if the trigger starts a new cycle.
    pub fn restarts(&self) -> bool {
        matches!(
            self,
            RestartTrigger::PluginFailure
                | RestartTrigger::AgentRestartDetected
                | RestartTrigger::ReloadSignal
        )
    }
}
