// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Convergence state machine.
//!
//! [`Convergence`] holds the bookkeeping of one run and decides what happens
//! next. It performs no I/O and never sleeps: the driver in
//! [`Controller`](super::Controller) executes each [`Step`] and feeds the
//! observations back.
//!
//! ```text
//! Init ──► Dispatching ──► Verifying ──► Converged
//!  │           ▲               │
//!  │           │               ├──► Exhausted
//!  │           └── Retrying ◄──┤
//!  │                  │        └──► TimedOut
//!  └──► Converged     └──► TimedOut
//!
//! Any non-terminal phase ──► Cancelled
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use crate::dispatch::DispatchReport;
use crate::error::SendError;
use crate::state::{VerificationReport, VerificationResult};
use crate::target::Target;
use crate::types::{DeviceId, Transition};

use super::{EnsureOptions, OperationResult, Outcome, RetryStrategy, RunId};

/// Current phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Targets resolved, nothing sent yet.
    Init,
    /// Commands are about to be sent.
    Dispatching,
    /// Waiting for devices to settle, then reading their state.
    Verifying,
    /// Waiting before the next attempt.
    Retrying,
    /// The run is over.
    Finished(Outcome),
}

/// Next action for the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Verify every target before sending anything.
    PreCheck,
    /// Send commands for [`Convergence::dispatch_plan`].
    Dispatch,
    /// Wait `settle`, then verify [`Convergence::verification_targets`].
    Verify {
        /// Time to let devices apply the commands.
        settle: Duration,
    },
    /// Wait before retrying.
    Backoff(Duration),
    /// Stop with the given outcome.
    Finish(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pending,
    Succeeded,
    Unavailable,
    Failed,
}

/// Bookkeeping and transition logic of one run.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use lightsync_lib::controller::{Convergence, EnsureOptions, Outcome, Step};
/// use lightsync_lib::dispatch::DispatchReport;
/// use lightsync_lib::state::{VerificationReport, VerificationResult};
/// use lightsync_lib::target::Target;
/// use lightsync_lib::types::DeviceId;
///
/// let options = EnsureOptions::builder().verify_before_dispatch(false).build().unwrap();
/// let mut run = Convergence::new(vec![Target::new("a")], &options);
///
/// assert_eq!(run.start(), Step::Dispatch);
///
/// let sent = DispatchReport { sent: vec!["a".into()], failed: vec![], commands: 1 };
/// assert!(matches!(run.on_dispatched(&sent), Step::Verify { .. }));
///
/// let report: VerificationReport = [(DeviceId::from("a"), VerificationResult::Success)]
///     .into_iter()
///     .collect();
/// assert_eq!(
///     run.on_verified(&report, Duration::from_secs(2)),
///     Step::Finish(Outcome::Converged)
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Convergence {
    targets: Vec<Target>,
    status: HashMap<DeviceId, Status>,
    send_errors: HashMap<DeviceId, SendError>,
    failed_this_attempt: HashSet<DeviceId>,
    attempts: u32,
    phase: Phase,

    max_attempts: u32,
    overall_timeout: Duration,
    settle_delay: Duration,
    retry_strategy: RetryStrategy,
    transition: Option<Transition>,
    transition_on_retry: bool,
    skip_verification: bool,
    verify_before_dispatch: bool,
}

impl Convergence {
    /// Creates a run over resolved targets.
    #[must_use]
    pub fn new(targets: Vec<Target>, options: &EnsureOptions) -> Self {
        let status = targets
            .iter()
            .map(|t| (t.id.clone(), Status::Pending))
            .collect();

        Self {
            targets,
            status,
            send_errors: HashMap::new(),
            failed_this_attempt: HashSet::new(),
            attempts: 0,
            phase: Phase::Init,
            max_attempts: options.max_attempts(),
            overall_timeout: options.overall_timeout(),
            settle_delay: options.settle_delay(),
            retry_strategy: *options.retry_strategy(),
            transition: options.transition(),
            transition_on_retry: options.transition_on_retry(),
            skip_verification: options.skip_verification(),
            verify_before_dispatch: options.verify_before_dispatch(),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the number of dispatch passes so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the ids still waiting to converge, in target order.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<DeviceId> {
        self.ids_with(Status::Pending)
    }

    /// Returns the first step of the run.
    ///
    /// A pre-check is requested unless it is disabled or verification is
    /// skipped altogether.
    pub fn start(&mut self) -> Step {
        if self.verify_before_dispatch && !self.skip_verification {
            Step::PreCheck
        } else {
            self.phase = Phase::Dispatching;
            Step::Dispatch
        }
    }

    /// Records the pre-check.
    ///
    /// Targets that already match leave the pending set, and so do
    /// unavailable ones: neither is sent a command.
    pub fn on_prechecked(&mut self, report: &VerificationReport) -> Step {
        for (id, result) in report.iter() {
            let Some(status) = self.status.get_mut(id) else {
                continue;
            };
            match result {
                VerificationResult::Success => *status = Status::Succeeded,
                VerificationResult::Unavailable => *status = Status::Unavailable,
                VerificationResult::Pending(_) => {}
            }
        }

        if self.has_pending() {
            self.phase = Phase::Dispatching;
            Step::Dispatch
        } else {
            tracing::debug!("All targets already in place");
            self.finish(Outcome::Converged)
        }
    }

    /// Returns the targets to send and the call-level transition to use.
    ///
    /// Transitions only apply to the first attempt unless transitions on
    /// retry are enabled; later attempts apply instantly.
    #[must_use]
    pub fn dispatch_plan(&self) -> (Vec<Target>, Option<Transition>) {
        let keep_transitions = self.attempts == 0 || self.transition_on_retry;

        let targets = self
            .targets
            .iter()
            .filter(|t| self.status.get(&t.id) == Some(&Status::Pending))
            .map(|t| {
                let mut target = t.clone();
                if !keep_transitions {
                    target.transition = None;
                }
                target
            })
            .collect();

        let transition = if keep_transitions {
            self.transition
        } else {
            None
        };

        (targets, transition)
    }

    /// Records a dispatch pass.
    pub fn on_dispatched(&mut self, report: &DispatchReport) -> Step {
        self.attempts += 1;
        self.failed_this_attempt.clear();

        for id in &report.sent {
            self.send_errors.remove(id);
        }
        for (id, error) in &report.failed {
            self.send_errors.insert(id.clone(), error.clone());
            self.failed_this_attempt.insert(id.clone());
        }

        if self.skip_verification {
            for (id, status) in &mut self.status {
                if *status == Status::Pending {
                    *status = if self.failed_this_attempt.contains(id) {
                        Status::Failed
                    } else {
                        Status::Succeeded
                    };
                }
            }
            if !report.is_clean() {
                tracing::warn!(
                    failed = report.failed.len(),
                    "Some commands were not delivered, finishing without verification"
                );
            }
            return self.finish(Outcome::Converged);
        }

        self.phase = Phase::Verifying;
        Step::Verify {
            settle: self.settle_delay,
        }
    }

    /// Returns the targets to read after the settle delay.
    ///
    /// Targets whose command failed in the last pass are not read; they stay
    /// pending.
    #[must_use]
    pub fn verification_targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .filter(|t| {
                self.status.get(&t.id) == Some(&Status::Pending)
                    && !self.failed_this_attempt.contains(&t.id)
            })
            .cloned()
            .collect()
    }

    /// Records a verification pass and decides whether to stop or retry.
    ///
    /// `elapsed` is the time since the run started.
    pub fn on_verified(&mut self, report: &VerificationReport, elapsed: Duration) -> Step {
        for (id, result) in report.iter() {
            if self.failed_this_attempt.contains(id) {
                continue;
            }
            if let Some(status) = self.status.get_mut(id)
                && *status == Status::Pending
            {
                match result {
                    VerificationResult::Success => *status = Status::Succeeded,
                    VerificationResult::Unavailable => *status = Status::Unavailable,
                    VerificationResult::Pending(_) => {}
                }
            }
        }

        if !self.has_pending() {
            return self.finish(Outcome::Converged);
        }
        if self.attempts >= self.max_attempts {
            return self.finish(Outcome::Exhausted);
        }
        if elapsed >= self.overall_timeout {
            return self.finish(Outcome::TimedOut);
        }

        self.phase = Phase::Retrying;
        Step::Backoff(self.retry_strategy.delay_for_retry(self.attempts - 1))
    }

    /// Records the end of the backoff wait.
    pub fn on_backoff_elapsed(&mut self, elapsed: Duration) -> Step {
        if elapsed >= self.overall_timeout {
            return self.finish(Outcome::TimedOut);
        }
        self.phase = Phase::Dispatching;
        Step::Dispatch
    }

    /// Stops the run as cancelled.
    pub fn cancel(&mut self) -> Step {
        self.finish(Outcome::Cancelled)
    }

    /// Builds the caller-facing result.
    ///
    /// Targets still pending are reported as failed.
    #[must_use]
    pub fn into_result(
        self,
        run_id: RunId,
        skipped_ids: Vec<DeviceId>,
        elapsed: Duration,
    ) -> OperationResult {
        let outcome = match self.phase {
            Phase::Finished(outcome) => outcome,
            _ => Outcome::Cancelled,
        };

        let failed_ids: Vec<DeviceId> = self
            .targets
            .iter()
            .filter(|t| {
                matches!(
                    self.status.get(&t.id),
                    Some(Status::Pending | Status::Failed)
                )
            })
            .map(|t| t.id.clone())
            .collect();

        let send_errors: BTreeMap<DeviceId, SendError> = self
            .send_errors
            .iter()
            .filter(|(id, _)| failed_ids.contains(id))
            .map(|(id, e)| (id.clone(), e.clone()))
            .collect();

        OperationResult {
            run_id,
            outcome,
            success: outcome == Outcome::Converged,
            verified: !self.skip_verification,
            succeeded_ids: self.ids_with(Status::Succeeded),
            failed_ids,
            unavailable_ids: self.ids_with(Status::Unavailable),
            skipped_ids,
            send_errors,
            attempts_used: self.attempts,
            elapsed,
        }
    }

    fn finish(&mut self, outcome: Outcome) -> Step {
        self.phase = Phase::Finished(outcome);
        Step::Finish(outcome)
    }

    fn has_pending(&self) -> bool {
        self.status.values().any(|s| *s == Status::Pending)
    }

    fn ids_with(&self, wanted: Status) -> Vec<DeviceId> {
        self.targets
            .iter()
            .filter(|t| self.status.get(&t.id) == Some(&wanted))
            .map(|t| t.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Mismatch;

    fn options() -> EnsureOptions {
        EnsureOptions::builder()
            .verify_before_dispatch(false)
            .build()
            .unwrap()
    }

    fn run(ids: &[&str], options: &EnsureOptions) -> Convergence {
        Convergence::new(ids.iter().map(|id| Target::new(*id)).collect(), options)
    }

    fn sent(ids: &[&str]) -> DispatchReport {
        DispatchReport {
            sent: ids.iter().map(|id| DeviceId::from(*id)).collect(),
            failed: vec![],
            commands: 1,
        }
    }

    fn report(results: &[(&str, VerificationResult)]) -> VerificationReport {
        results
            .iter()
            .map(|(id, r)| (DeviceId::from(*id), *r))
            .collect()
    }

    const PENDING: VerificationResult = VerificationResult::Pending(Mismatch::State);

    #[test]
    fn precheck_requested_by_default() {
        let mut run = run(&["a"], &EnsureOptions::default());
        assert_eq!(run.start(), Step::PreCheck);
        assert_eq!(run.phase(), Phase::Init);
    }

    #[test]
    fn precheck_converged_fleet_finishes_without_attempts() {
        let mut run = run(&["a", "b"], &EnsureOptions::default());
        run.start();
        let step = run.on_prechecked(&report(&[
            ("a", VerificationResult::Success),
            ("b", VerificationResult::Success),
        ]));
        assert_eq!(step, Step::Finish(Outcome::Converged));

        let result = run.into_result(RunId::new(), vec![], Duration::ZERO);
        assert_eq!(result.attempts_used, 0);
        assert!(result.success);
    }

    #[test]
    fn precheck_settles_unavailable_and_keeps_mismatched_pending() {
        let mut run = run(&["a", "b", "c"], &EnsureOptions::default());
        run.start();
        let step = run.on_prechecked(&report(&[
            ("a", VerificationResult::Success),
            ("b", VerificationResult::Unavailable),
            ("c", PENDING),
        ]));
        assert_eq!(step, Step::Dispatch);
        assert_eq!(run.pending_ids(), [DeviceId::from("c")]);
        assert_eq!(run.dispatch_plan().0.len(), 1);
    }

    #[test]
    fn precheck_with_only_unavailable_left_finishes() {
        let mut run = run(&["a", "b"], &EnsureOptions::default());
        run.start();
        let step = run.on_prechecked(&report(&[
            ("a", VerificationResult::Success),
            ("b", VerificationResult::Unavailable),
        ]));
        assert_eq!(step, Step::Finish(Outcome::Converged));

        let result = run.into_result(RunId::new(), vec![], Duration::ZERO);
        assert_eq!(result.attempts_used, 0);
        assert_eq!(result.unavailable_ids, [DeviceId::from("b")]);
        assert!(result.success);
    }

    #[test]
    fn converges_on_first_verification() {
        let mut run = run(&["a"], &options());
        assert_eq!(run.start(), Step::Dispatch);
        assert_eq!(
            run.on_dispatched(&sent(&["a"])),
            Step::Verify {
                settle: Duration::from_secs(2)
            }
        );
        assert_eq!(run.phase(), Phase::Verifying);

        let step = run.on_verified(
            &report(&[("a", VerificationResult::Success)]),
            Duration::from_secs(2),
        );
        assert_eq!(step, Step::Finish(Outcome::Converged));
        assert_eq!(run.phase(), Phase::Finished(Outcome::Converged));
    }

    #[test]
    fn retries_only_pending_targets() {
        let mut run = run(&["a", "b"], &options());
        run.start();
        run.on_dispatched(&sent(&["a", "b"]));
        let step = run.on_verified(
            &report(&[("a", VerificationResult::Success), ("b", PENDING)]),
            Duration::from_secs(2),
        );
        assert_eq!(step, Step::Backoff(Duration::from_secs(2)));
        assert_eq!(run.phase(), Phase::Retrying);

        assert_eq!(run.on_backoff_elapsed(Duration::from_secs(4)), Step::Dispatch);
        let (targets, _) = run.dispatch_plan();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id.as_str(), "b");
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let options = EnsureOptions::builder()
            .verify_before_dispatch(false)
            .max_attempts(2)
            .build()
            .unwrap();
        let mut run = run(&["a"], &options);
        run.start();

        run.on_dispatched(&sent(&["a"]));
        let step = run.on_verified(&report(&[("a", PENDING)]), Duration::from_secs(2));
        assert!(matches!(step, Step::Backoff(_)));
        run.on_backoff_elapsed(Duration::from_secs(4));

        run.on_dispatched(&sent(&["a"]));
        let step = run.on_verified(&report(&[("a", PENDING)]), Duration::from_secs(6));
        assert_eq!(step, Step::Finish(Outcome::Exhausted));

        let result = run.into_result(RunId::new(), vec![], Duration::from_secs(6));
        assert_eq!(result.attempts_used, 2);
        assert_eq!(result.failed_ids, [DeviceId::from("a")]);
        assert!(!result.success);
    }

    #[test]
    fn exhaustion_is_checked_before_timeout() {
        let options = EnsureOptions::builder()
            .verify_before_dispatch(false)
            .max_attempts(1)
            .overall_timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        let mut run = run(&["a"], &options);
        run.start();
        run.on_dispatched(&sent(&["a"]));
        let step = run.on_verified(&report(&[("a", PENDING)]), Duration::from_secs(5));
        assert_eq!(step, Step::Finish(Outcome::Exhausted));
    }

    #[test]
    fn times_out_after_verification() {
        let options = EnsureOptions::builder()
            .verify_before_dispatch(false)
            .max_attempts(10)
            .overall_timeout(Duration::from_secs(3))
            .build()
            .unwrap();
        let mut run = run(&["a"], &options);
        run.start();
        run.on_dispatched(&sent(&["a"]));
        let step = run.on_verified(&report(&[("a", PENDING)]), Duration::from_secs(3));
        assert_eq!(step, Step::Finish(Outcome::TimedOut));
    }

    #[test]
    fn times_out_after_backoff() {
        let options = EnsureOptions::builder()
            .verify_before_dispatch(false)
            .overall_timeout(Duration::from_secs(3))
            .build()
            .unwrap();
        let mut run = run(&["a"], &options);
        run.start();
        run.on_dispatched(&sent(&["a"]));
        run.on_verified(&report(&[("a", PENDING)]), Duration::from_secs(2));
        assert_eq!(
            run.on_backoff_elapsed(Duration::from_secs(4)),
            Step::Finish(Outcome::TimedOut)
        );
        assert_eq!(run.attempts(), 1);
    }

    #[test]
    fn unavailable_targets_are_settled() {
        let mut run = run(&["a", "b"], &options());
        run.start();
        run.on_dispatched(&sent(&["a", "b"]));
        let step = run.on_verified(
            &report(&[
                ("a", VerificationResult::Success),
                ("b", VerificationResult::Unavailable),
            ]),
            Duration::from_secs(2),
        );
        assert_eq!(step, Step::Finish(Outcome::Converged));

        let result = run.into_result(RunId::new(), vec![], Duration::from_secs(2));
        assert_eq!(result.unavailable_ids, [DeviceId::from("b")]);
        assert!(result.failed_ids.is_empty());
    }

    #[test]
    fn send_failures_stay_pending_without_verification() {
        let mut run = run(&["a", "b"], &options());
        run.start();
        let report_with_failure = DispatchReport {
            sent: vec!["a".into()],
            failed: vec![("b".into(), SendError::Rejected("busy".into()))],
            commands: 2,
        };
        run.on_dispatched(&report_with_failure);

        let to_verify: Vec<_> = run.verification_targets().into_iter().map(|t| t.id).collect();
        assert_eq!(to_verify, [DeviceId::from("a")]);

        // A stale read for "b" must not settle it
        let step = run.on_verified(
            &report(&[
                ("a", VerificationResult::Success),
                ("b", VerificationResult::Success),
            ]),
            Duration::from_secs(2),
        );
        assert!(matches!(step, Step::Backoff(_)));
        assert_eq!(run.pending_ids(), [DeviceId::from("b")]);

        // Retry succeeds: the stored error is cleared
        run.on_backoff_elapsed(Duration::from_secs(4));
        run.on_dispatched(&sent(&["b"]));
        run.on_verified(&report(&[("b", VerificationResult::Success)]), Duration::from_secs(6));
        let result = run.into_result(RunId::new(), vec![], Duration::from_secs(6));
        assert!(result.success);
        assert!(result.send_errors.is_empty());
    }

    #[test]
    fn fire_and_forget_clean() {
        let options = EnsureOptions::builder().skip_verification(true).build().unwrap();
        let mut run = run(&["a", "b"], &options);
        assert_eq!(run.start(), Step::Dispatch);
        assert_eq!(
            run.on_dispatched(&sent(&["a", "b"])),
            Step::Finish(Outcome::Converged)
        );

        let result = run.into_result(RunId::new(), vec![], Duration::ZERO);
        assert!(result.success);
        assert!(!result.verified);
        assert_eq!(result.succeeded_ids.len(), 2);
    }

    #[test]
    fn fire_and_forget_with_failures() {
        let options = EnsureOptions::builder().skip_verification(true).build().unwrap();
        let mut run = run(&["a", "b"], &options);
        run.start();
        let step = run.on_dispatched(&DispatchReport {
            sent: vec!["a".into()],
            failed: vec![("b".into(), SendError::Timeout(Duration::from_secs(1)))],
            commands: 2,
        });
        assert_eq!(step, Step::Finish(Outcome::Converged));

        let result = run.into_result(RunId::new(), vec![], Duration::ZERO);
        assert!(result.success);
        assert_eq!(result.succeeded_ids, [DeviceId::from("a")]);
        assert_eq!(result.failed_ids, [DeviceId::from("b")]);
        assert!(result.send_errors.contains_key("b"));
        assert!(!result.verified);
    }

    #[test]
    fn transitions_only_on_first_attempt() {
        let transition = Transition::from_secs_f32(2.0).unwrap();
        let options = EnsureOptions::builder()
            .verify_before_dispatch(false)
            .transition(transition)
            .build()
            .unwrap();
        let targets = vec![Target::new("a").with_transition(transition)];
        let mut run = Convergence::new(targets, &options);
        run.start();

        let (first, call) = run.dispatch_plan();
        assert_eq!(call, Some(transition));
        assert_eq!(first[0].transition, Some(transition));

        run.on_dispatched(&sent(&["a"]));
        run.on_verified(&report(&[("a", PENDING)]), Duration::from_secs(2));
        run.on_backoff_elapsed(Duration::from_secs(4));

        let (retry, call) = run.dispatch_plan();
        assert_eq!(call, None);
        assert_eq!(retry[0].transition, None);
    }

    #[test]
    fn transitions_kept_on_retry_when_enabled() {
        let transition = Transition::from_secs_f32(2.0).unwrap();
        let options = EnsureOptions::builder()
            .verify_before_dispatch(false)
            .transition(transition)
            .transition_on_retry(true)
            .build()
            .unwrap();
        let mut run = run(&["a"], &options);
        run.start();
        run.on_dispatched(&sent(&["a"]));
        run.on_verified(&report(&[("a", PENDING)]), Duration::from_secs(2));
        run.on_backoff_elapsed(Duration::from_secs(4));

        assert_eq!(run.dispatch_plan().1, Some(transition));
    }

    #[test]
    fn cancelled_run_reports_pending_as_failed() {
        let mut run = run(&["a"], &options());
        run.start();
        assert_eq!(run.cancel(), Step::Finish(Outcome::Cancelled));

        let skipped = vec![DeviceId::from("switch.x")];
        let result = run.into_result(RunId::new(), skipped.clone(), Duration::ZERO);
        assert_eq!(result.outcome, Outcome::Cancelled);
        assert_eq!(result.failed_ids, [DeviceId::from("a")]);
        assert_eq!(result.skipped_ids, skipped);
        assert_eq!(result.attempts_used, 0);
    }

    #[test]
    fn exponential_backoff_grows_between_attempts() {
        let options = EnsureOptions::builder()
            .verify_before_dispatch(false)
            .max_attempts(4)
            .retry_strategy(RetryStrategy::exponential())
            .build()
            .unwrap();
        let mut run = run(&["a"], &options);
        run.start();

        let mut delays = Vec::new();
        for attempt in 1..=3u64 {
            run.on_dispatched(&sent(&["a"]));
            if let Step::Backoff(delay) =
                run.on_verified(&report(&[("a", PENDING)]), Duration::from_secs(attempt))
            {
                delays.push(delay.as_secs());
            }
            run.on_backoff_elapsed(Duration::from_secs(attempt));
        }
        assert_eq!(delays, [2, 4, 8]);
    }
}
