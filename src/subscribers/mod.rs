//! # Event subscribers.
//!
//! ```text
//! RestartLoop ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                                      │
//!                                                        ┌─────────────┼──────────┐
//!                                                        ▼             ▼          ▼
//!                                                    LogWriter      Metrics    Custom
//! ```
//!
//! - [`Subscribe`] the extension trait
//! - [`SubscriberSet`] per-subscriber queues and workers
//! - [`LogWriter`] built-in `tracing` renderer

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
