// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconnect backoff.

use std::time::Duration;

/// Exponential backoff configuration for push reconnection.
///
/// `delay(attempt) = min(initial_delay * multiplier^attempt, max_delay)`.
/// Retries are unbounded; only an authentication failure stops them.
///
/// # Examples
///
/// ```
/// use openevse_lib::push::ReconnectPolicy;
/// use std::time::Duration;
///
/// let policy = ReconnectPolicy::default();
/// assert_eq!(policy.delay(0), Duration::from_secs(15));
/// assert_eq!(policy.delay(1), Duration::from_secs(30));
/// assert_eq!(policy.delay(10), Duration::from_secs(300));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
}

impl ReconnectPolicy {
    /// Default delay before the first reconnection attempt.
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(15);
    /// Default growth factor between attempts.
    pub const DEFAULT_MULTIPLIER: f64 = 2.0;
    /// Default upper bound on the delay.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(300);

    /// Creates a policy with the default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
            multiplier: Self::DEFAULT_MULTIPLIER,
            max_delay: Self::DEFAULT_MAX_DELAY,
        }
    }

    /// Sets the delay before the first reconnection attempt.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the growth factor. Values below 1.0 are treated as 1.0.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the upper bound on the delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Returns the initial delay.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Returns the growth factor.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Returns the maximum delay.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Returns the wait before reconnection attempt number `attempt` (0-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = if self.multiplier.is_finite() {
            self.multiplier.max(1.0)
        } else {
            1.0
        };
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        if capped.is_finite() {
            Duration::from_secs_f64(capped.max(0.0))
        } else {
            self.max_delay
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new()
    }
}
