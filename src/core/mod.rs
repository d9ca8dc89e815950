//! Runtime core: hardware lifetime and restart supervision.
//!
//! The only public API from this module is [`Supervisor`] (built through
//! [`SupervisorBuilder`]) plus the [`RunState`] / [`RestartTrigger`] vocabulary.
//!
//! Internal modules:
//! - [`runner`]: starts one plugin with an optional bound, stops a whole set;
//! - [`restart`]: the restart loop (resolve, start, serve, restart or drain);
//! - [`supervisor`]: hardware session, background services, teardown order;
//! - [`state`]: phases and triggers.

mod builder;
mod restart;
mod runner;
mod state;
mod supervisor;

#[cfg(test)]
mod tests;

pub use builder::SupervisorBuilder;
pub use state::{RestartTrigger, RunState};
pub use supervisor::Supervisor;
