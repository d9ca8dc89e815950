//! # Plugin endpoint contract.
//!
//! A [`Plugin`] advertises a subset of devices to the node agent. `start` performs the
//! registration handshake and begins serving; `stop` tears it down.
//!
//! # Example
//! ```
//! use async_trait::async_trait;
//! use vgpu_supervisor::{Device, Plugin, PluginError};
//!
//! struct Whole { devices: Vec<Device> }
//!
//! #[async_trait]
//! impl Plugin for Whole {
//!     fn name(&self) -> &str { "volcano.sh/vgpu-number" }
//!     fn devices(&self) -> Vec<Device> { self.devices.clone() }
//!     async fn start(&self) -> Result<(), PluginError> { Ok(()) }
//!     async fn stop(&self) {}
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PluginError;

/// A device (physical or virtual) served by a plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    /// Stable device identifier (UUID or virtual slot id).
    pub id: String,
}

impl Device {
    /// Creates a device with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// # One resource-advertisement endpoint.
///
/// ### Contract
/// - `stop` must be idempotent and safe on an endpoint that was never started.
/// - `start` may block for as long as the registration handshake takes; the
///   supervisor bounds it only when `Config::start_timeout` is set.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Resource name advertised to the node agent.
    fn name(&self) -> &str;

    /// Devices this endpoint serves. Endpoints with none are never started.
    fn devices(&self) -> Vec<Device>;

    /// Registers with the node agent and begins serving.
    async fn start(&self) -> Result<(), PluginError>;

    /// Stops serving. Idempotent.
    async fn stop(&self);
}

/// Shared handle to a plugin endpoint.
pub type PluginRef = Arc<dyn Plugin>;
