//! # Start and stop individual plugins.
//!
//! ```text
//! start_plugin:
//!   plugin.start() → Ok(())  → publish PluginStarted
//!                  → Err(e)  → publish PluginStartFailed
//!   bound exceeded → drop start future → publish StartTimedOut
//!                                      → publish PluginStartFailed (timeout)
//!
//! stop_all:
//!   for each plugin in order: plugin.stop().await → publish PluginStopped
//! ```
//!
//! ## Rules
//! - Publishes **exactly one** terminal event per start: `PluginStarted` or `PluginStartFailed`
//! - `stop_all` stops every member, started or not; `Plugin::stop` is idempotent

use std::time::Duration;
use tokio::time;

use crate::{
    error::PluginError,
    events::{Bus, Event, EventKind},
    plugins::{Plugin, PluginSet},
};

/// Calls `plugin.start()`, bounded by `timeout` if set.
pub(crate) async fn start_plugin(
    plugin: &dyn Plugin,
    timeout: Option<Duration>,
    cycle: u64,
    bus: &Bus,
) -> Result<(), PluginError> {
    let res = match timeout {
        Some(dur) => match time::timeout(dur, plugin.start()).await {
            Ok(r) => r,
            Err(_elapsed) => {
                bus.publish(
                    Event::new(EventKind::StartTimedOut)
                        .with_plugin(plugin.name())
                        .with_cycle(cycle)
                        .with_timeout(dur),
                );
                Err(PluginError::Timeout { timeout: dur })
            }
        },
        None => plugin.start().await,
    };

    let ev = match &res {
        Ok(()) => Event::new(EventKind::PluginStarted),
        Err(e) => Event::new(EventKind::PluginStartFailed).with_reason(e.to_string()),
    };
    bus.publish(ev.with_plugin(plugin.name()).with_cycle(cycle));
    res
}

/// Stops every plugin of `set`, in order, waiting for each.
pub(crate) async fn stop_all(set: &PluginSet, cycle: u64, bus: &Bus) {
    for plugin in set.iter() {
        plugin.stop().await;
        bus.publish(
            Event::new(EventKind::PluginStopped)
                .with_plugin(plugin.name())
                .with_cycle(cycle),
        );
    }
}
