//! # Strategy resolvers.
//!
//! A [`Resolver`] turns the configured [`StrategyName`] and the live device cache into
//! the [`PluginSet`] for one cycle. It is called once per restart cycle, after the
//! previous set has been stopped.
//!
//! [`StrategyTable`] is a closure-backed resolver: each [`MigStrategy`] maps to a
//! builder that receives the configured [`DeviceSettings`] and the cache.
//!
//! ## Example
//! ```rust
//! use vgpu_supervisor::{MigStrategy, PluginSet, StrategyTable};
//!
//! let table = StrategyTable::new()
//!     .with(MigStrategy::None, |_settings, _cache| Ok(PluginSet::default()));
//!
//! assert!(table.supports(MigStrategy::None));
//! assert!(!table.supports(MigStrategy::Mixed));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DeviceSettings;
use crate::error::ResolveError;
use crate::plugins::PluginSet;
use crate::services::DeviceCache;
use crate::strategy::{MigStrategy, StrategyName};

/// Builds the plugin set for a strategy.
///
/// Must fail with a descriptive error for unrecognized strategy names.
/// `settings` is `Config::device`, after any per-node overrides.
pub trait Resolver: Send + Sync + 'static {
    fn resolve(
        &self,
        strategy: &StrategyName,
        settings: &DeviceSettings,
        cache: &dyn DeviceCache,
    ) -> Result<PluginSet, ResolveError>;
}

type BuildFn =
    dyn Fn(&DeviceSettings, &dyn DeviceCache) -> Result<PluginSet, ResolveError> + Send + Sync;

/// Resolver dispatching on [`MigStrategy`] to registered builder closures.
#[derive(Default)]
pub struct StrategyTable {
    builders: HashMap<MigStrategy, Arc<BuildFn>>,
}

impl StrategyTable {
    /// Creates an empty table; every strategy is unsupported until registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the builder for `strategy`.
    pub fn with<F>(mut self, strategy: MigStrategy, f: F) -> Self
    where
        F: Fn(&DeviceSettings, &dyn DeviceCache) -> Result<PluginSet, ResolveError>
            + Send
            + Sync
            + 'static,
    {
        self.builders.insert(strategy, Arc::new(f));
        self
    }

    /// Returns `true` if a builder is registered for `strategy`.
    pub fn supports(&self, strategy: MigStrategy) -> bool {
        self.builders.contains_key(&strategy)
    }
}

impl Resolver for StrategyTable {
    fn resolve(
        &self,
        strategy: &StrategyName,
        settings: &DeviceSettings,
        cache: &dyn DeviceCache,
    ) -> Result<PluginSet, ResolveError> {
        let parsed = MigStrategy::try_from(strategy)?;
        let build = self
            .builders
            .get(&parsed)
            .ok_or_else(|| ResolveError::Unsupported {
                strategy: parsed.to_string(),
            })?;
        build(settings, cache)
    }
}
