//! # Device-grouping strategies.
//!
//! - [`StrategyName`] - configured name, fixed for the life of the process
//! - [`MigStrategy`] - parsed strategy (`none | single | mixed`)
//! - [`Resolver`] - turns a name and the device cache into a [`PluginSet`](crate::PluginSet)
//! - [`StrategyTable`] - resolver backed by per-strategy builder closures

mod name;
mod resolver;

pub use name::{MigStrategy, StrategyName};
pub use resolver::{Resolver, StrategyTable};
