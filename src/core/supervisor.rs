//! # Supervisor: hardware lifetime, background services and the restart loop.
//!
//! ## High-level architecture
//! ```text
//! Supervisor::run()
//!   ├─► Initializing:  hardware.init()
//!   │       └─ Err ─► publish HardwareInitFailed
//!   │                  ├─ fail_on_init_error ─► return RuntimeError::HardwareInit
//!   │                  └─ otherwise          ─► block forever
//!   ├─► FsWatcher::new(plugin_dir), SignalWatcher::new(WATCHED)
//!   ├─► cache.start(), register.start()
//!   ├─► RestartLoop::run()           (until Draining or resolver error)
//!   ├─► register.stop(), cache.stop(), fs.close(), hardware.shutdown()
//!   └─► drain: listener forwards what is queued, SubscriberSet::shutdown()
//!
//! Event flow:
//!   RestartLoop ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//! ```
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use vgpu_supervisor::{Config, DeviceCache, Hardware, LogWriter, StrategyTable, Supervisor};
//!
//! # async fn demo(hw: Arc<dyn Hardware>, cache: Arc<dyn DeviceCache>, table: StrategyTable) -> Result<(), vgpu_supervisor::RuntimeError> {
//! let sup = Supervisor::builder(Config::default(), hw, cache, Arc::new(table))
//!     .with_subscribers(vec![Arc::new(LogWriter::new())])
//!     .build();
//! sup.run().await
//! # }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::SupervisorBuilder;
use super::restart::RestartLoop;
use super::state::RunState;
use crate::{
    config::Config,
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    hardware::{Hardware, HardwareSession},
    services::{DeviceCache, Service},
    strategy::Resolver,
    subscribers::SubscriberSet,
    watch::{FsWatcher, Signal, SignalWatcher},
};

/// Owns the collaborators and drives restart cycles.
///
/// A supervisor runs once: when [`run`](Self::run) returns, every event published so
/// far has been handed to the subscribers and their workers have finished.
pub struct Supervisor {
    pub(super) cfg: Config,
    pub(super) bus: Bus,
    pub(super) hardware: Arc<dyn Hardware>,
    pub(super) cache: Arc<dyn DeviceCache>,
    pub(super) register: Option<Arc<dyn Service>>,
    pub(super) resolver: Arc<dyn Resolver>,
    pub(super) state: watch::Sender<RunState>,
    pub(super) listener: Mutex<Option<JoinHandle<()>>>,
    pub(super) stop: CancellationToken,
}

impl Supervisor {
    /// Starts building a supervisor around its required collaborators.
    pub fn builder(
        cfg: Config,
        hardware: Arc<dyn Hardware>,
        cache: Arc<dyn DeviceCache>,
        resolver: Arc<dyn Resolver>,
    ) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, hardware, cache, resolver)
    }

    /// Configuration captured at build time.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Receiver of every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Watch channel of the current [`RunState`].
    pub fn state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Runs until a terminating signal drains the plugins (`Ok`) or a
    /// fatal-at-startup condition occurs (`Err`).
    ///
    /// Watches `Config::plugin_dir` and [`Signal::WATCHED`].
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let result = self.run_watched().await;
        self.drain_subscribers().await;
        result
    }

    /// Like [`run`](Self::run), with caller-provided trigger sources.
    pub async fn run_with(
        &self,
        fs: FsWatcher,
        signals: SignalWatcher,
    ) -> Result<(), RuntimeError> {
        let result = match self.open_hardware().await {
            Ok(session) => {
                let result = self.serve(fs, signals).await;
                session.close();
                result
            }
            Err(e) => Err(e),
        };
        self.drain_subscribers().await;
        result
    }

    async fn run_watched(&self) -> Result<(), RuntimeError> {
        let session = self.open_hardware().await?;

        let fs = FsWatcher::new(&self.cfg.plugin_dir).map_err(RuntimeError::Watch)?;
        let signals =
            SignalWatcher::new(&Signal::WATCHED).map_err(RuntimeError::SignalRegistration)?;

        let result = self.serve(fs, signals).await;
        session.close();
        result
    }

    /// Forwards bus events to `set` until `stop` fires and the bus is empty,
    /// then shuts the set down.
    pub(super) fn subscriber_listener(
        bus: &Bus,
        set: SubscriberSet,
        stop: CancellationToken,
    ) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
            set.shutdown().await;
        })
    }

    /// Hands every published event to the subscribers and waits for their workers.
    async fn drain_subscribers(&self) {
        self.stop.cancel();
        let listener = self.listener.lock().await.take();
        if let Some(handle) = listener {
            let _ = handle.await;
        }
    }

    /// Initializes hardware access, applying the fail-fast policy on error.
    ///
    /// Without fail-fast this never returns on error.
    async fn open_hardware(&self) -> Result<HardwareSession<'_>, RuntimeError> {
        self.state.send_replace(RunState::Initializing);
        self.bus.publish(Event::state_changed(RunState::Initializing));

        match HardwareSession::open(self.hardware.as_ref(), self.bus.clone()) {
            Ok(session) => Ok(session),
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::HardwareInitFailed).with_reason(e.message.clone()),
                );
                if self.cfg.fail_on_init_error {
                    return Err(RuntimeError::HardwareInit(e));
                }
                let never = std::future::pending::<Infallible>().await;
                match never {}
            }
        }
    }

    /// Runs background services around the restart loop and tears everything down.
    async fn serve(
        &self,
        mut fs: FsWatcher,
        mut signals: SignalWatcher,
    ) -> Result<(), RuntimeError> {
        self.cache.start().await;
        if let Some(register) = &self.register {
            register.start().await;
        }

        let result = RestartLoop::new(
            &self.cfg,
            self.resolver.as_ref(),
            self.cache.as_ref(),
            &self.bus,
            &self.state,
        )
        .run(&mut fs, &mut signals)
        .await;

        if let Some(register) = &self.register {
            register.stop().await;
        }
        self.cache.stop().await;
        drop(signals);
        if let Err(e) = fs.close() {
            self.bus
                .publish(Event::new(EventKind::WatchError).with_reason(e.to_string()));
        }
        result
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}
