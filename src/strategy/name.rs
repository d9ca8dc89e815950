//! # Strategy names.
//!
//! [`StrategyName`] is the configured string, captured once at startup.
//! [`MigStrategy`] is the parsed form understood by [`StrategyTable`](crate::StrategyTable).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Configured device-grouping strategy name.
///
/// Kept as the raw string so that an unknown name surfaces as a resolver error
/// when the first cycle is built.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyName(String);

impl StrategyName {
    /// Wraps a strategy name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as configured.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StrategyName {
    /// Returns `"none"`.
    fn default() -> Self {
        Self::new(MigStrategy::None.as_str())
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StrategyName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// How partitionable accelerators are exposed to the node agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MigStrategy {
    /// Whole devices only; partitioning is ignored.
    None,
    /// All partitions on a node share one resource name.
    Single,
    /// Each partition profile gets its own resource name.
    Mixed,
}

impl MigStrategy {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MigStrategy::None => "none",
            MigStrategy::Single => "single",
            MigStrategy::Mixed => "mixed",
        }
    }
}

impl fmt::Display for MigStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigStrategy {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(MigStrategy::None),
            "single" => Ok(MigStrategy::Single),
            "mixed" => Ok(MigStrategy::Mixed),
            other => Err(ResolveError::UnknownStrategy {
                name: other.to_string(),
            }),
        }
    }
}

impl TryFrom<&StrategyName> for MigStrategy {
    type Error = ResolveError;

    fn try_from(name: &StrategyName) -> Result<Self, Self::Error> {
        name.as_str().parse()
    }
}
