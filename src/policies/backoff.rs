//! # Restart pacing after plugin failures.
//!
//! [`BackoffPolicy`] decides how long the supervisor holds a `PluginFailure`
//! trigger before the next restart cycle. The delay for the `n`-th consecutive
//! failing cycle (0-indexed) is `first × factor^n`, clamped to `max`.
//!
//! Other triggers (agent restart, signals) are not delayed; they stay live while
//! the failure delay is pending.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use vgpu_supervisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

/// Delay policy applied between a failing cycle and the restart it triggers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failing cycle.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth per consecutive failing cycle (`>= 1.0` recommended).
    pub factor: f64,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `first = 100ms`;
    /// - `factor = 2.0`;
    /// - `max = 30s`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Policy that restarts immediately after every failure.
    pub const fn immediate() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::ZERO,
            factor: 1.0,
        }
    }

    /// Computes the delay for the given number of prior consecutive failures.
    ///
    /// Non-finite or negative intermediate values collapse to `max`.
    pub fn next(&self, failures: u32) -> Duration {
        let exp = failures.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}
