// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Convergence controller.
//!
//! [`Controller::ensure_state`] is the single entry point: it resolves the
//! membership list, then repeats dispatch, settle and verification until
//! every reachable target matches, the attempt budget or the overall timeout
//! runs out, or the run is cancelled.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use lightsync_lib::controller::{Controller, EnsureOptions, Outcome};
//! use lightsync_lib::target::{Overrides, TargetDefaults};
//! use lightsync_lib::provider::InMemoryProvider;
//! use lightsync_lib::types::{Brightness, DeviceId, Kelvin};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> lightsync_lib::Result<()> {
//! let fleet = InMemoryProvider::new();
//! fleet.add_light("light.desk");
//! fleet.add_light("light.shelf");
//!
//! let controller = Controller::new(fleet.clone());
//! let defaults = TargetDefaults::new()
//!     .with_brightness(Brightness::new(70)?)
//!     .with_color_temp(Kelvin::WARM);
//! let options = EnsureOptions::builder()
//!     .settle_delay(Duration::from_millis(10))
//!     .build()?;
//!
//! let members = [DeviceId::from("light.desk"), DeviceId::from("light.shelf")];
//! let result = controller
//!     .ensure_state(&members, &Overrides::new(), &defaults, &options)
//!     .await?;
//!
//! assert_eq!(result.outcome, Outcome::Converged);
//! assert_eq!(fleet.command_count(), 1);
//! # Ok(())
//! # }
//! ```

mod cancel;
mod machine;
mod options;
mod result;

use std::time::Duration;

use tracing::Instrument;

pub use cancel::{CancelHandle, CancelToken};
pub use machine::{Convergence, Phase, Step};
pub use options::{EnsureOptions, EnsureOptionsBuilder, RetryStrategy};
pub use result::{OperationResult, Outcome, RunId};

use crate::dispatch::dispatch;
use crate::error::{Error, Result};
use crate::provider::{CommandSender, Directory, StateReader};
use crate::state::verify;
use crate::target::{Overrides, Target, TargetDefaults, resolve};
use crate::types::DeviceId;

/// Drives devices towards a desired state.
///
/// The controller owns its provider; wrap the provider in an `Arc` (or use a
/// cloneable one such as [`InMemoryProvider`](crate::provider::InMemoryProvider))
/// to share it.
#[derive(Debug, Clone)]
pub struct Controller<P> {
    provider: P,
}

impl<P> Controller<P>
where
    P: Directory + CommandSender + StateReader + Sync,
{
    /// Creates a controller over a provider.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Returns the provider.
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Ensures every device of `members` reaches its target state.
    ///
    /// Groups in `members` are expanded; each target is built from
    /// `defaults` with the device's entry in `overrides` applied on top.
    /// Convergence problems (failed sends, devices that never match,
    /// timeouts, cancellation) are reported in the returned
    /// [`OperationResult`], not as errors.
    ///
    /// # Errors
    ///
    /// Returns `Error::Resolution` if `members` is empty or contains no
    /// controllable device.
    pub async fn ensure_state(
        &self,
        members: &[DeviceId],
        overrides: &Overrides,
        defaults: &TargetDefaults,
        options: &EnsureOptions,
    ) -> Result<OperationResult> {
        let run_id = RunId::new();
        let span = tracing::info_span!("ensure_state", %run_id);

        async {
            let resolution = resolve(members, overrides, defaults, &self.provider)?;
            let result = self
                .converge(run_id, resolution.targets, resolution.skipped, options)
                .await;
            Ok::<_, Error>(result)
        }
        .instrument(span)
        .await
    }

    async fn converge(
        &self,
        run_id: RunId,
        targets: Vec<Target>,
        skipped: Vec<DeviceId>,
        options: &EnsureOptions,
    ) -> OperationResult {
        let started = tokio::time::Instant::now();
        let cancel = options.cancel_token();
        let tolerances = options.tolerances();

        tracing::info!(
            %run_id,
            targets = targets.len(),
            skipped = skipped.len(),
            max_attempts = options.max_attempts(),
            "Starting convergence run"
        );

        let mut machine = Convergence::new(targets, options);
        let mut step = machine.start();

        let outcome = loop {
            step = match step {
                Step::PreCheck => {
                    let targets = machine.verification_targets();
                    let report = verify(&self.provider, &targets, tolerances).await;
                    machine.on_prechecked(&report)
                }
                Step::Dispatch => {
                    if cancel.is_some_and(CancelToken::is_cancelled) {
                        machine.cancel()
                    } else {
                        let (targets, transition) = machine.dispatch_plan();
                        tracing::debug!(
                            %run_id,
                            attempt = machine.attempts() + 1,
                            pending = targets.len(),
                            "Dispatching"
                        );
                        let report = dispatch(&self.provider, &targets, transition).await;
                        machine.on_dispatched(&report)
                    }
                }
                Step::Verify { settle } => {
                    if pause(settle, cancel).await {
                        let targets = machine.verification_targets();
                        let report = verify(&self.provider, &targets, tolerances).await;
                        machine.on_verified(&report, started.elapsed())
                    } else {
                        machine.cancel()
                    }
                }
                Step::Backoff(delay) => {
                    tracing::debug!(
                        %run_id,
                        attempt = machine.attempts(),
                        pending = machine.pending_ids().len(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Retrying after delay"
                    );
                    if pause(delay, cancel).await {
                        machine.on_backoff_elapsed(started.elapsed())
                    } else {
                        machine.cancel()
                    }
                }
                Step::Finish(outcome) => break outcome,
            };
        };

        let result = machine.into_result(run_id, skipped, started.elapsed());

        if outcome == Outcome::Converged {
            tracing::info!(%run_id, attempts = result.attempts_used, "{result}");
        } else {
            tracing::warn!(
                %run_id,
                attempts = result.attempts_used,
                failed = result.failed_ids.len(),
                "{result}"
            );
        }

        result
    }
}

/// Sleeps for `duration`. Returns false if cancellation ended the wait.
async fn pause(duration: Duration, cancel: Option<&CancelToken>) -> bool {
    let Some(token) = cancel else {
        tokio::time::sleep(duration).await;
        return true;
    };

    if token.is_cancelled() {
        return false;
    }

    tokio::select! {
        () = tokio::time::sleep(duration) => true,
        () = token.cancelled() => false,
    }
}
