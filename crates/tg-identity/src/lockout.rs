//! Account lockout after repeated failed sign-ins.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lockout configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger a lockout. Zero disables lockout.
    pub max_failures: u32,
    /// How long a lockout lasts.
    pub duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            duration: Duration::minutes(5),
        }
    }
}

impl LockoutPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_failures: u32, duration: Duration) -> Self {
        Self {
            max_failures,
            duration,
        }
    }

    /// Returns `true` if lockout is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.max_failures > 0
    }
}

/// Failed sign-in tracking for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    /// Consecutive failed attempts since the last success or lockout.
    pub failed_count: u32,
    /// End of the current lockout, if any.
    pub lockout_end: Option<DateTime<Utc>>,
}

impl LockoutState {
    /// Returns `true` while a lockout is in effect.
    #[must_use]
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout_end.is_some_and(|end| end > now)
    }

    /// Records a failed attempt.
    ///
    /// Returns `true` if this failure started a lockout. The counter restarts
    /// once a lockout begins.
    pub fn register_failure(&mut self, policy: &LockoutPolicy, now: DateTime<Utc>) -> bool {
        if !policy.is_enabled() {
            return false;
        }

        self.failed_count += 1;
        if self.failed_count >= policy.max_failures {
            self.failed_count = 0;
            self.lockout_end = Some(now + policy.duration);
            return true;
        }
        false
    }

    /// Clears failures after a successful sign-in.
    pub fn reset(&mut self) {
        self.failed_count = 0;
        self.lockout_end = None;
    }
}
