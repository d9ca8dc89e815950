//! Error types used by the supervisor runtime and its collaborators.
//!
//! - [`RuntimeError`]: conditions that end [`Supervisor::run`](crate::Supervisor::run).
//! - [`PluginError`]: a plugin endpoint failed to register with the node agent.
//! - [`ResolveError`]: the strategy resolver could not produce a plugin set.
//! - [`HardwareError`]: the hardware-access library reported a failure.
//! - [`WatchError`]: the filesystem watcher reported a failure.
//! - [`ConfigError`]: per-node override file could not be read.
//!
//! The enums provide `as_label` (stable snake_case, for logs) and `as_message`.

use std::time::Duration;
use thiserror::Error;

/// # Errors that terminate the supervisor.
///
/// Only fatal-at-startup conditions end up here; everything that happens while
/// serving is absorbed by the restart loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Hardware-access initialization failed and fail-fast is enabled.
    #[error("failed to initialize hardware access: {0}")]
    HardwareInit(#[source] HardwareError),

    /// The configured strategy could not be resolved into a plugin set.
    #[error("error creating plugin strategy: {0}")]
    Resolve(#[source] ResolveError),

    /// The filesystem watcher could not be created.
    #[error("failed to create FS watcher: {0}")]
    Watch(#[source] WatchError),

    /// OS signal listeners could not be registered.
    #[error("failed to register signal handlers: {0}")]
    SignalRegistration(#[source] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use vgpu_supervisor::{HardwareError, RuntimeError};
    ///
    /// let err = RuntimeError::HardwareInit(HardwareError::new("driver not loaded"));
    /// assert_eq!(err.as_label(), "runtime_hardware_init");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::HardwareInit(_) => "runtime_hardware_init",
            RuntimeError::Resolve(_) => "runtime_resolve",
            RuntimeError::Watch(_) => "runtime_watch",
            RuntimeError::SignalRegistration(_) => "runtime_signal_registration",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::HardwareInit(e) => format!("hardware init: {e}"),
            RuntimeError::Resolve(e) => format!("resolve: {}", e.as_message()),
            RuntimeError::Watch(e) => format!("watch: {e}"),
            RuntimeError::SignalRegistration(e) => format!("signals: {e}"),
        }
    }
}

/// # Errors produced by a plugin endpoint's `start`.
///
/// Every variant is recoverable: the supervisor answers it with a full restart cycle.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PluginError {
    /// The registration handshake with the node agent failed.
    #[error("registration failed: {error}")]
    Registration {
        /// The underlying error message.
        error: String,
    },

    /// `start` did not finish within the configured bound.
    #[error("start timed out after {timeout:?}")]
    Timeout {
        /// The bound that was exceeded.
        timeout: Duration,
    },
}

impl PluginError {
    /// Shorthand for [`PluginError::Registration`].
    pub fn registration(error: impl Into<String>) -> Self {
        PluginError::Registration {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PluginError::Registration { .. } => "plugin_registration",
            PluginError::Timeout { .. } => "plugin_timeout",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            PluginError::Registration { error } => format!("registration: {error}"),
            PluginError::Timeout { timeout } => format!("timeout: {timeout:?}"),
        }
    }
}

/// # Errors produced while turning a strategy name into a plugin set.
///
/// These indicate misconfiguration and are never retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The strategy name is not one of the known strategies.
    #[error("unknown strategy: {name:?}")]
    UnknownStrategy {
        /// The name as configured.
        name: String,
    },

    /// The strategy is known but this resolver has no builder for it.
    #[error("unsupported strategy: {strategy}")]
    Unsupported {
        /// Canonical strategy name.
        strategy: String,
    },

    /// The builder for the strategy failed.
    #[error("strategy {strategy} failed to build plugins: {error}")]
    Build {
        /// Canonical strategy name.
        strategy: String,
        /// The underlying error message.
        error: String,
    },
}

impl ResolveError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use vgpu_supervisor::ResolveError;
    ///
    /// let err = ResolveError::UnknownStrategy { name: "triple".into() };
    /// assert_eq!(err.as_label(), "resolve_unknown_strategy");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ResolveError::UnknownStrategy { .. } => "resolve_unknown_strategy",
            ResolveError::Unsupported { .. } => "resolve_unsupported",
            ResolveError::Build { .. } => "resolve_build",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ResolveError::UnknownStrategy { name } => {
                format!("unknown strategy {name:?}; expected one of none, single, mixed")
            }
            ResolveError::Unsupported { strategy } => {
                format!("strategy {strategy} has no plugin builder")
            }
            ResolveError::Build { strategy, error } => format!("{strategy}: {error}"),
        }
    }
}

/// A failure status reported by the hardware-access library.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HardwareError {
    /// Description of the failure, as reported by the library.
    pub message: String,
}

impl HardwareError {
    /// Creates a new error with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure reported by the filesystem watcher.
#[derive(Error, Debug)]
#[error("inotify: {0}")]
pub struct WatchError(#[from] pub notify::Error);

/// Errors produced while loading per-node configuration overrides.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The override file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path to the file.
        path: String,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The override file is not valid JSON of the expected shape.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path to the file.
        path: String,
        /// The decoding error.
        #[source]
        source: serde_json::Error,
    },
}
