//! Restart pacing.
//!
//! ## Contents
//! - [`BackoffPolicy`] how long a plugin-failure restart is held back
//!
//! ## Quick wiring
//! ```text
//! Config { restart_backoff: BackoffPolicy, .. }
//!      └─► core::restart::RestartLoop uses:
//!           - restart_backoff.next(consecutive_failures) to delay the PluginFailure trigger
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=30s.
//! - `BackoffPolicy::immediate()` restarts with no delay.

mod backoff;

pub use backoff::BackoffPolicy;
