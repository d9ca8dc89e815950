//! # Restart-trigger sources.
//!
//! Both watchers are created once, before the first restart cycle, and outlive
//! every cycle.
//!
//! - [`FsWatcher`] - the node agent's plugin directory; socket creation means the agent restarted
//! - [`SignalWatcher`] - OS signals as a single channel

mod fs;
mod signals;

pub use fs::{FsEvent, FsOp, FsWatcher};
pub use signals::{Signal, SignalWatcher};
