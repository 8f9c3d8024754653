// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Options of a convergence run.

use std::time::Duration;

use crate::error::ValueError;
use crate::state::Tolerances;
use crate::types::Transition;

use super::CancelToken;

/// Delay between two attempts.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use lightsync_lib::controller::RetryStrategy;
///
/// let strategy = RetryStrategy::exponential()
///     .with_base(Duration::from_secs(1))
///     .with_max(Duration::from_secs(5));
///
/// assert_eq!(strategy.delay_for_retry(0), Duration::from_secs(1));
/// assert_eq!(strategy.delay_for_retry(2), Duration::from_secs(4));
/// assert_eq!(strategy.delay_for_retry(3), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryStrategy {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `base * multiplier^n`, capped at `max`, where `n` is the zero-based
    /// retry index.
    Exponential {
        /// Delay before the first retry.
        base: Duration,
        /// Growth factor between retries.
        multiplier: f64,
        /// Upper bound of any delay.
        max: Duration,
    },
}

impl RetryStrategy {
    /// Default fixed delay.
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);
    /// Default exponential growth factor.
    pub const DEFAULT_MULTIPLIER: f64 = 2.0;
    /// Default exponential cap.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

    /// Creates a fixed-delay strategy.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self::Fixed(delay)
    }

    /// Creates an exponential strategy with default settings
    /// (2 s base, factor 2, 30 s cap).
    #[must_use]
    pub const fn exponential() -> Self {
        Self::Exponential {
            base: Self::DEFAULT_DELAY,
            multiplier: Self::DEFAULT_MULTIPLIER,
            max: Self::DEFAULT_MAX_DELAY,
        }
    }

    /// Sets the base delay of an exponential strategy, or the delay of a
    /// fixed one.
    #[must_use]
    pub fn with_base(self, delay: Duration) -> Self {
        match self {
            Self::Fixed(_) => Self::Fixed(delay),
            Self::Exponential {
                multiplier, max, ..
            } => Self::Exponential {
                base: delay,
                multiplier,
                max,
            },
        }
    }

    /// Sets the growth factor. No effect on a fixed strategy.
    #[must_use]
    pub fn with_multiplier(self, multiplier: f64) -> Self {
        match self {
            Self::Fixed(_) => self,
            Self::Exponential { base, max, .. } => Self::Exponential {
                base,
                multiplier,
                max,
            },
        }
    }

    /// Sets the cap. No effect on a fixed strategy.
    #[must_use]
    pub fn with_max(self, max: Duration) -> Self {
        match self {
            Self::Fixed(_) => self,
            Self::Exponential {
                base, multiplier, ..
            } => Self::Exponential {
                base,
                multiplier,
                max,
            },
        }
    }

    /// Calculates the delay before retry number `retry` (zero-based).
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential {
                base,
                multiplier,
                max,
            } => {
                if base.is_zero() {
                    return Duration::ZERO;
                }
                let factor = multiplier.powi(i32::try_from(retry).unwrap_or(i32::MAX));
                Duration::try_from_secs_f64(base.as_secs_f64() * factor)
                    .unwrap_or(max)
                    .min(max)
            }
        }
    }

    fn validate(&self) -> Result<(), ValueError> {
        if let Self::Exponential { multiplier, .. } = self
            && !(multiplier.is_finite() && *multiplier >= 1.0)
        {
            return Err(ValueError::InvalidOption {
                name: "retry_strategy",
                reason: format!("multiplier must be finite and at least 1, got {multiplier}"),
            });
        }
        Ok(())
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Fixed(Self::DEFAULT_DELAY)
    }
}

/// Validated options of one [`ensure_state`](super::Controller::ensure_state)
/// call.
///
/// Built with [`EnsureOptions::builder`]; `EnsureOptions::default()` gives
/// the default settings:
///
/// | Option                  | Default          |
/// |-------------------------|------------------|
/// | `skip_verification`     | `false`          |
/// | `tolerances`            | 3% / 10 / 150 K  |
/// | `max_attempts`          | 3                |
/// | `retry_strategy`        | fixed 2 s        |
/// | `overall_timeout`       | 60 s             |
/// | `settle_delay`          | 2 s              |
/// | `transition`            | none             |
/// | `transition_on_retry`   | `false`          |
/// | `verify_before_dispatch`| `true`           |
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use lightsync_lib::controller::{EnsureOptions, RetryStrategy};
///
/// let options = EnsureOptions::builder()
///     .max_attempts(5)
///     .retry_strategy(RetryStrategy::exponential())
///     .overall_timeout(Duration::from_secs(30))
///     .build()
///     .unwrap();
/// assert_eq!(options.max_attempts(), 5);
///
/// assert!(EnsureOptions::builder().max_attempts(0).build().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct EnsureOptions {
    skip_verification: bool,
    tolerances: Tolerances,
    max_attempts: u32,
    retry_strategy: RetryStrategy,
    overall_timeout: Duration,
    settle_delay: Duration,
    transition: Option<Transition>,
    transition_on_retry: bool,
    verify_before_dispatch: bool,
    cancel: Option<CancelToken>,
}

impl EnsureOptions {
    /// Default attempt budget.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Default overall timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
    /// Default delay between a dispatch and the following verification.
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

    /// Creates a builder initialized with the default settings.
    #[must_use]
    pub fn builder() -> EnsureOptionsBuilder {
        EnsureOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Returns true if the run dispatches once and never verifies.
    #[must_use]
    pub fn skip_verification(&self) -> bool {
        self.skip_verification
    }

    /// Returns the verification tolerances.
    #[must_use]
    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Returns the maximum number of dispatch attempts.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay strategy between attempts.
    #[must_use]
    pub fn retry_strategy(&self) -> &RetryStrategy {
        &self.retry_strategy
    }

    /// Returns the overall time budget of a run.
    #[must_use]
    pub fn overall_timeout(&self) -> Duration {
        self.overall_timeout
    }

    /// Returns the wait between a dispatch and its verification.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Returns the call-level transition.
    #[must_use]
    pub fn transition(&self) -> Option<Transition> {
        self.transition
    }

    /// Returns true if retries keep the transitions of the first attempt.
    #[must_use]
    pub fn transition_on_retry(&self) -> bool {
        self.transition_on_retry
    }

    /// Returns true if targets are checked before the first dispatch.
    #[must_use]
    pub fn verify_before_dispatch(&self) -> bool {
        self.verify_before_dispatch
    }

    /// Returns the cancellation token, if any.
    #[must_use]
    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }
}

impl Default for EnsureOptions {
    fn default() -> Self {
        Self {
            skip_verification: false,
            tolerances: Tolerances::default(),
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_strategy: RetryStrategy::default(),
            overall_timeout: Self::DEFAULT_TIMEOUT,
            settle_delay: Self::DEFAULT_SETTLE_DELAY,
            transition: None,
            transition_on_retry: false,
            verify_before_dispatch: true,
            cancel: None,
        }
    }
}

/// Builder for [`EnsureOptions`].
#[derive(Debug, Clone)]
pub struct EnsureOptionsBuilder {
    options: EnsureOptions,
}

impl EnsureOptionsBuilder {
    /// Dispatches once without verifying (fire-and-forget).
    ///
    /// The run always finishes as converged; ids whose send failed are still
    /// listed in [`OperationResult::failed_ids`](super::OperationResult).
    #[must_use]
    pub fn skip_verification(mut self, skip: bool) -> Self {
        self.options.skip_verification = skip;
        self
    }

    /// Sets the verification tolerances.
    #[must_use]
    pub fn tolerances(mut self, tolerances: Tolerances) -> Self {
        self.options.tolerances = tolerances;
        self
    }

    /// Sets the maximum number of dispatch attempts (at least 1).
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.options.max_attempts = attempts;
        self
    }

    /// Sets the delay strategy between attempts.
    #[must_use]
    pub fn retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.options.retry_strategy = strategy;
        self
    }

    /// Sets the overall time budget (non-zero).
    #[must_use]
    pub fn overall_timeout(mut self, timeout: Duration) -> Self {
        self.options.overall_timeout = timeout;
        self
    }

    /// Sets the wait between a dispatch and its verification.
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.options.settle_delay = delay;
        self
    }

    /// Sets the call-level transition.
    #[must_use]
    pub fn transition(mut self, transition: Transition) -> Self {
        self.options.transition = Some(transition);
        self
    }

    /// Keeps transitions on retries instead of applying them instantly.
    #[must_use]
    pub fn transition_on_retry(mut self, enabled: bool) -> Self {
        self.options.transition_on_retry = enabled;
        self
    }

    /// Enables or disables the check before the first dispatch.
    #[must_use]
    pub fn verify_before_dispatch(mut self, enabled: bool) -> Self {
        self.options.verify_before_dispatch = enabled;
        self
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.options.cancel = Some(token);
        self
    }

    /// Validates and returns the options.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidOption` if `max_attempts` is zero,
    /// `overall_timeout` is zero, or an exponential multiplier is below 1
    /// or not finite.
    pub fn build(self) -> Result<EnsureOptions, ValueError> {
        let options = self.options;

        if options.max_attempts == 0 {
            return Err(ValueError::InvalidOption {
                name: "max_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if options.overall_timeout.is_zero() {
            return Err(ValueError::InvalidOption {
                name: "overall_timeout",
                reason: "must be greater than zero".into(),
            });
        }
        options.retry_strategy.validate()?;

        Ok(options)
    }
}
