//! # Plugin endpoints.
//!
//! - [`Plugin`] - trait implemented by resource-advertisement endpoints
//! - [`PluginRef`] - shared handle (`Arc<dyn Plugin>`)
//! - [`PluginSet`] - ordered set rebuilt on every restart cycle
//! - [`Device`] - a device served by a plugin

mod plugin;
mod set;

pub use plugin::{Device, Plugin, PluginRef};
pub use set::PluginSet;
