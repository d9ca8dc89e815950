//! # Long-running background collaborators.
//!
//! The device cache and the device register run for the whole life of the process.
//! The supervisor starts them once, before the first cycle, and stops them once,
//! after the last one. They are never restarted by a cycle.

use async_trait::async_trait;

use crate::plugins::Device;

/// A background component with a start/stop lifecycle.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Human-readable name (for logs).
    fn name(&self) -> &str;

    /// Starts background work. Returns once the component is running.
    async fn start(&self);

    /// Stops background work.
    async fn stop(&self);
}

/// Device-state cache consulted by strategy resolvers.
///
/// Must be safe for concurrent reads while its own background work runs.
pub trait DeviceCache: Service {
    /// Snapshot of the currently known devices.
    fn devices(&self) -> Vec<Device>;
}
