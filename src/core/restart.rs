//! # RestartLoop: the restart-supervision state machine.
//!
//! One iteration of the loop is one restart cycle:
//!
//! ```text
//! loop {
//!   ├─► Restarting:      stop_all(previous set)          (skipped on cycle 1)
//!   ├─► BuildingPlugins: resolver.resolve(strategy, device settings, cache)
//!   │                      └─ Err ─► return RuntimeError::Resolve
//!   ├─► Starting:        for plugin in set:
//!   │                      ├─ no devices ─► skip
//!   │                      ├─ start() Ok ─► started += 1
//!   │                      └─ start() Err ─► StartOutcome{ failed }, abandon the rest
//!   └─► Serving:         select! {
//!                          signal SIGHUP            ─► continue
//!                          signal other             ─► Draining: stop_all, return Ok
//!                          fs Create(agent socket)  ─► continue
//!                          fs other                 ─► ignored
//!                          fs error                 ─► WatchError, logged, keep waiting
//!                          failure delay elapsed    ─► continue   (only if failed)
//!                        }
//! }
//! ```
//!
//! ## Rules
//! - Stop of cycle N completes before resolve of cycle N+1 (at most one live set)
//! - Starts are sequential; the first failure ends the start pass
//! - The failure signal is a per-cycle value, never carried into the next cycle
//! - After a fatal signal no channel is polled again

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use tokio::{sync::watch, time};

use super::runner::{start_plugin, stop_all};
use super::state::{RestartTrigger, RunState};
use crate::{
    config::Config,
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    plugins::PluginSet,
    services::DeviceCache,
    strategy::Resolver,
    watch::{FsWatcher, SignalWatcher},
};

/// Result of one start pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StartOutcome {
    /// Plugins that registered successfully.
    pub started: usize,
    /// Whether a plugin failed and the pass was abandoned.
    pub failed: bool,
}

/// Drives restart cycles until a terminating signal or a fatal resolver error.
pub(crate) struct RestartLoop<'a> {
    cfg: &'a Config,
    resolver: &'a dyn Resolver,
    cache: &'a dyn DeviceCache,
    bus: &'a Bus,
    state: &'a watch::Sender<RunState>,
    socket: PathBuf,
    cycle: u64,
    failures: u32,
}

impl<'a> RestartLoop<'a> {
    pub(crate) fn new(
        cfg: &'a Config,
        resolver: &'a dyn Resolver,
        cache: &'a dyn DeviceCache,
        bus: &'a Bus,
        state: &'a watch::Sender<RunState>,
    ) -> Self {
        Self {
            cfg,
            resolver,
            cache,
            bus,
            state,
            socket: cfg.agent_socket_path(),
            cycle: 0,
            failures: 0,
        }
    }

    /// Runs cycles until drained (`Ok`) or the resolver fails (`Err`).
    pub(crate) async fn run(
        mut self,
        fs: &mut FsWatcher,
        signals: &mut SignalWatcher,
    ) -> Result<(), RuntimeError> {
        let mut plugins = PluginSet::default();

        loop {
            self.cycle += 1;
            if self.cycle > 1 {
                self.set_state(RunState::Restarting);
                stop_all(&plugins, self.cycle - 1, self.bus).await;
            }

            self.set_state(RunState::BuildingPlugins);
            plugins = self
                .resolver
                .resolve(&self.cfg.strategy, &self.cfg.device, self.cache)
                .map_err(RuntimeError::Resolve)?;
            self.bus.publish(
                Event::new(EventKind::PluginsResolved)
                    .with_cycle(self.cycle)
                    .with_count(plugins.len()),
            );

            self.set_state(RunState::Starting);
            let outcome = self.start_all(&plugins).await;
            if outcome.started == 0 {
                self.bus
                    .publish(Event::new(EventKind::NoDevices).with_cycle(self.cycle));
            }

            let retry_in = self.next_retry(outcome);
            self.set_state(RunState::Serving);

            let trigger = self.wait_for_trigger(retry_in, fs, signals).await;
            if !trigger.restarts() {
                self.set_state(RunState::Draining);
                stop_all(&plugins, self.cycle, self.bus).await;
                return Ok(());
            }
        }
    }

    /// Starts plugins in order; stops at the first failure.
    async fn start_all(&self, plugins: &PluginSet) -> StartOutcome {
        let mut started = 0;

        for plugin in plugins.iter() {
            let devices = plugin.devices().len();
            if devices == 0 {
                self.bus.publish(
                    Event::new(EventKind::PluginSkipped)
                        .with_plugin(plugin.name())
                        .with_cycle(self.cycle),
                );
                continue;
            }

            self.bus.publish(
                Event::new(EventKind::PluginStarting)
                    .with_plugin(plugin.name())
                    .with_cycle(self.cycle)
                    .with_count(devices),
            );
            if start_plugin(plugin.as_ref(), self.cfg.start_timeout(), self.cycle, self.bus)
                .await
                .is_err()
            {
                return StartOutcome {
                    started,
                    failed: true,
                };
            }
            started += 1;
        }

        StartOutcome {
            started,
            failed: false,
        }
    }

    /// Delay before the plugin-failure trigger fires, or `None` if nothing failed.
    fn next_retry(&mut self, outcome: StartOutcome) -> Option<Duration> {
        if !outcome.failed {
            self.failures = 0;
            return None;
        }
        let delay = self.cfg.restart_backoff.next(self.failures);
        self.failures = self.failures.saturating_add(1);

        if !delay.is_zero() {
            self.bus.publish(
                Event::new(EventKind::RestartDelayed)
                    .with_cycle(self.cycle)
                    .with_delay(delay),
            );
        }
        Some(delay)
    }

    /// Blocks until a trigger that ends `Serving`.
    ///
    /// Watch errors are reported and absorbed here. Closed sources are skipped;
    /// with every source closed and no pending failure this waits forever.
    async fn wait_for_trigger(
        &self,
        retry_in: Option<Duration>,
        fs: &mut FsWatcher,
        signals: &mut SignalWatcher,
    ) -> RestartTrigger {
        let failure = async move {
            match retry_in {
                Some(delay) if !delay.is_zero() => time::sleep(delay).await,
                Some(_) => {}
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(failure);

        loop {
            match self.next_trigger(failure.as_mut(), fs, signals).await {
                RestartTrigger::WatchError(reason) => {
                    self.bus.publish(
                        Event::new(EventKind::WatchError)
                            .with_cycle(self.cycle)
                            .with_reason(reason),
                    );
                }
                trigger => return trigger,
            }
        }
    }

    /// Waits for the next trigger from any source, signals first.
    ///
    /// Filesystem events other than the creation of the agent socket are dropped.
    async fn next_trigger<F: Future<Output = ()>>(
        &self,
        mut failure: Pin<&mut F>,
        fs: &mut FsWatcher,
        signals: &mut SignalWatcher,
    ) -> RestartTrigger {
        loop {
            tokio::select! {
                biased;

                Some(sig) = signals.recv() => {
                    let kind = if sig.is_reload() {
                        EventKind::ReloadRequested
                    } else {
                        EventKind::ShutdownRequested
                    };
                    self.bus
                        .publish(Event::new(kind).with_signal(sig).with_cycle(self.cycle));

                    return if sig.is_reload() {
                        RestartTrigger::ReloadSignal
                    } else {
                        RestartTrigger::FatalSignal(sig)
                    };
                }
                Some(ev) = fs.events.recv() => {
                    if ev.is_create_of(&self.socket) {
                        self.bus.publish(
                            Event::new(EventKind::AgentRestartDetected)
                                .with_cycle(self.cycle)
                                .with_reason(self.socket.display().to_string()),
                        );
                        return RestartTrigger::AgentRestartDetected;
                    }
                }
                Some(err) = fs.errors.recv() => return RestartTrigger::WatchError(err.to_string()),
                _ = failure.as_mut() => return RestartTrigger::PluginFailure,
            }
        }
    }

    fn set_state(&self, state: RunState) {
        self.state.send_replace(state);
        self.bus
            .publish(Event::state_changed(state).with_cycle(self.cycle));
    }
}
