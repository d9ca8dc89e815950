//! # vgpu-supervisor
//!
//! **vgpu-supervisor** is the restart-supervision core of a vGPU device-plugin agent.
//!
//! It owns the lifetime of the hardware-access library, resolves the configured
//! partitioning strategy into a set of plugin endpoints, starts them, and restarts the
//! whole set whenever a plugin fails, the node agent restarts, or a reload signal
//! arrives. A terminating signal drains the set and ends the process cleanly.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌────────────┐   ┌──────────────┐   ┌─────────────┐   ┌───────────────┐
//!   │  Hardware  │   │ DeviceCache  │   │  Resolver   │   │ FsWatcher +   │
//!   │ init/shut  │   │ (background) │   │ (strategy)  │   │ SignalWatcher │
//!   └─────┬──────┘   └──────┬───────┘   └──────┬──────┘   └───────┬───────┘
//!         ▼                 ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                           │
//! │  - HardwareSession (shutdown exactly once after a successful init)    │
//! │  - RestartLoop (resolve → start → serve → restart | drain)            │
//! │  - Bus (broadcast events) → SubscriberSet (per-subscriber queues)     │
//! └───────────────────────────────────┬───────────────────────────────────┘
//!                                     ▼
//!                     ┌───────────────┼───────────────┐
//!                     ▼               ▼               ▼
//!                  Plugin #1       Plugin #2       Plugin #N
//!                  start/stop      start/stop      start/stop
//! ```
//!
//! ### Lifecycle
//! ```text
//! Initializing ─► BuildingPlugins ─► Starting ─► Serving
//!                       ▲                           │
//!                       │    PluginFailure          │
//!                       │    AgentRestartDetected   │
//!                       └──── ReloadSignal ◄────────┤
//!                           (via Restarting)        │
//!                                                   └─ FatalSignal ─► Draining
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                        |
//! |-------------------|-----------------------------------------------------------|-------------------------------------------|
//! | **Supervision**   | Hardware lifetime, restart cycles, teardown order.        | [`Supervisor`], [`RunState`]              |
//! | **Plugins**       | Endpoints advertising devices to the node agent.          | [`Plugin`], [`PluginSet`], [`Device`]     |
//! | **Strategies**    | Turn a strategy name into the plugin set of a cycle.      | [`Resolver`], [`StrategyTable`]           |
//! | **Triggers**      | Agent-socket and OS-signal sources.                       | [`FsWatcher`], [`SignalWatcher`]          |
//! | **Subscriber API**| Hook into supervisor events (logging, metrics).           | [`Subscribe`], [`LogWriter`]              |
//! | **Policies**      | Restart pacing after plugin failures.                     | [`BackoffPolicy`]                         |
//! | **Configuration** | Flags, environment and per-node overrides.                | [`Config`], [`CliArgs`], [`NodeOverrides`]|
//! | **Errors**        | Typed errors for startup and plugin registration.         | [`RuntimeError`], [`PluginError`]         |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use vgpu_supervisor::{
//!     Config, DeviceCache, Hardware, LogWriter, MigStrategy, PluginSet, StrategyTable,
//!     Subscribe, Supervisor,
//! };
//!
//! async fn serve(
//!     hardware: Arc<dyn Hardware>,
//!     cache: Arc<dyn DeviceCache>,
//! ) -> Result<(), vgpu_supervisor::RuntimeError> {
//!     let cfg = Config::default();
//!     let table = StrategyTable::new()
//!         .with(MigStrategy::None, |_settings, _cache| Ok(PluginSet::default()));
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let sup = Supervisor::builder(cfg, hardware, cache, Arc::new(table))
//!         .with_subscribers(subs)
//!         .build();
//!
//!     sup.run().await
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod hardware;
mod plugins;
mod policies;
mod services;
mod strategy;
mod subscribers;
mod watch;

// ---- Public re-exports ----

pub use config::{
    CliArgs, Config, DeviceSettings, NodeConfig, NodeOverrides, DEFAULT_AGENT_SOCKET,
    DEFAULT_PLUGIN_DIR,
};
pub use self::core::{RestartTrigger, RunState, Supervisor, SupervisorBuilder};
pub use error::{ConfigError, HardwareError, PluginError, ResolveError, RuntimeError, WatchError};
pub use events::{Bus, Event, EventKind};
pub use hardware::Hardware;
pub use plugins::{Device, Plugin, PluginRef, PluginSet};
pub use policies::BackoffPolicy;
pub use services::{DeviceCache, Service};
pub use strategy::{MigStrategy, Resolver, StrategyName, StrategyTable};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use watch::{FsEvent, FsOp, FsWatcher, Signal, SignalWatcher};
