//! # Runtime events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Hardware events**: initialization failure and final shutdown
//! - **Cycle events**: state transitions, resolution, per-plugin start/stop
//! - **Trigger events**: whatever woke the supervisor out of `Serving`
//! - **Subscriber events**: fan-out overflow and panics
//!
//! The [`Event`] struct carries additional metadata such as timestamps, plugin name,
//! cycle number, reasons and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use vgpu_supervisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::PluginStartFailed)
//!     .with_plugin("volcano.sh/vgpu-number")
//!     .with_cycle(3)
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::PluginStartFailed);
//! assert_eq!(ev.plugin.as_deref(), Some("volcano.sh/vgpu-number"));
//! assert_eq!(ev.cycle, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::RunState;
use crate::watch::Signal;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Hardware ===
    /// Hardware-access initialization failed.
    ///
    /// Sets: `reason` (library status).
    HardwareInitFailed,

    /// Hardware-access shutdown returned.
    ///
    /// Sets: `reason` (`"success"` or the library status).
    HardwareShutdown,

    // === Cycle ===
    /// The supervisor moved to a new [`RunState`].
    ///
    /// Sets: `state`, `cycle` (except for `Initializing`).
    StateChanged,

    /// The resolver produced the plugin set for a cycle.
    ///
    /// Sets: `cycle`, `count` (number of plugins).
    PluginsResolved,

    /// A plugin owns no devices and was not started.
    ///
    /// Sets: `plugin`, `cycle`.
    PluginSkipped,

    /// `start()` is about to be called on a plugin.
    ///
    /// Sets: `plugin`, `cycle`, `count` (devices owned).
    PluginStarting,

    /// A plugin registered with the node agent.
    ///
    /// Sets: `plugin`, `cycle`.
    PluginStarted,

    /// A plugin failed to start; the rest of the cycle is abandoned.
    ///
    /// Sets: `plugin`, `cycle`, `reason`.
    PluginStartFailed,

    /// A plugin's `start()` exceeded the configured bound (followed by `PluginStartFailed`).
    ///
    /// Sets: `plugin`, `cycle`, `timeout_ms`.
    StartTimedOut,

    /// `stop()` returned for a plugin.
    ///
    /// Sets: `plugin`, `cycle` (the cycle that built the plugin).
    PluginStopped,

    /// The start pass finished with nothing started.
    ///
    /// Sets: `cycle`.
    NoDevices,

    /// The plugin-failure restart is held back by the backoff policy.
    ///
    /// Sets: `cycle`, `delay_ms`.
    RestartDelayed,

    // === Triggers ===
    /// The agent socket was created: the node agent restarted.
    ///
    /// Sets: `reason` (socket path).
    AgentRestartDetected,

    /// A reload signal arrived.
    ///
    /// Sets: `signal`.
    ReloadRequested,

    /// A terminating signal arrived; the supervisor drains and exits.
    ///
    /// Sets: `signal`.
    ShutdownRequested,

    /// The filesystem watcher reported an error (advisory).
    ///
    /// Sets: `reason`.
    WatchError,

    // === Subscribers ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `plugin` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `plugin` (subscriber name), `reason`.
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Restart cycle number (starting from 1).
    pub cycle: Option<u64>,
    /// Plugin (or subscriber) name, if applicable.
    pub plugin: Option<Arc<str>>,
    /// Human-readable reason (errors, paths, statuses).
    pub reason: Option<Arc<str>>,
    /// Supervisor state, for `StateChanged`.
    pub state: Option<RunState>,
    /// Signal that caused the event.
    pub signal: Option<Signal>,
    /// Plugin or device count.
    pub count: Option<usize>,
    /// Start timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Restart delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            cycle: None,
            plugin: None,
            reason: None,
            state: None,
            signal: None,
            count: None,
            timeout_ms: None,
            delay_ms: None,
        }
    }

    /// Creates a `StateChanged` event.
    #[inline]
    pub fn state_changed(state: RunState) -> Self {
        let mut ev = Event::new(EventKind::StateChanged);
        ev.state = Some(state);
        ev
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a plugin name.
    #[inline]
    pub fn with_plugin(mut self, plugin: impl Into<Arc<str>>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    /// Attaches a cycle number.
    #[inline]
    pub fn with_cycle(mut self, cycle: u64) -> Self {
        self.cycle = Some(cycle);
        self
    }

    /// Attaches a signal.
    #[inline]
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a restart delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_plugin(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_plugin(subscriber)
            .with_reason(info)
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::NoDevices);
        let b = Event::new(EventKind::NoDevices);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn durations_saturate() {
        let ev = Event::new(EventKind::RestartDelayed).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }
}
