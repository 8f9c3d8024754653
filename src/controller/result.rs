// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outcome of a convergence run.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::SendError;
use crate::types::DeviceId;

/// Unique identifier of one convergence run.
///
/// Every log line emitted during a run carries it, and it is returned in the
/// [`OperationResult`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new unique run identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunId({})", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every reachable target matched (or, without verification, every
    /// command was delivered).
    Converged,
    /// The attempt budget ran out with targets still pending.
    Exhausted,
    /// The overall timeout elapsed with targets still pending.
    TimedOut,
    /// The run was cancelled.
    Cancelled,
}

impl Outcome {
    /// Returns the outcome as a lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::Exhausted => "exhausted",
            Self::TimedOut => "timed out",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`ensure_state`](super::Controller::ensure_state).
///
/// Id lists follow the order in which the resolver produced the targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    /// Identifier of the run.
    pub run_id: RunId,
    /// How the run ended.
    pub outcome: Outcome,
    /// True only when the outcome is [`Outcome::Converged`].
    pub success: bool,
    /// False when verification was skipped.
    pub verified: bool,
    /// Targets that reached their state.
    pub succeeded_ids: Vec<DeviceId>,
    /// Targets that did not reach their state.
    pub failed_ids: Vec<DeviceId>,
    /// Targets whose state could not be read.
    pub unavailable_ids: Vec<DeviceId>,
    /// Members dropped during resolution.
    pub skipped_ids: Vec<DeviceId>,
    /// Last send error of each failed target whose command failed.
    #[serde(serialize_with = "serialize_errors")]
    pub send_errors: BTreeMap<DeviceId, SendError>,
    /// Number of dispatch passes performed.
    pub attempts_used: u32,
    /// Wall time of the run.
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl OperationResult {
    /// Returns the total number of targets of the run.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.succeeded_ids.len() + self.failed_ids.len() + self.unavailable_ids.len()
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} succeeded, {} failed, {} unavailable",
            self.outcome,
            self.succeeded_ids.len(),
            self.failed_ids.len(),
            self.unavailable_ids.len(),
        )?;
        if !self.skipped_ids.is_empty() {
            write!(f, ", {} skipped", self.skipped_ids.len())?;
        }
        let plural = if self.attempts_used == 1 { "" } else { "s" };
        write!(
            f,
            " after {} attempt{plural} ({:.1}s)",
            self.attempts_used,
            self.elapsed.as_secs_f64()
        )?;
        if !self.verified {
            f.write_str(", unverified")?;
        }
        Ok(())
    }
}

fn serialize_errors<S: Serializer>(
    errors: &BTreeMap<DeviceId, SendError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(errors.iter().map(|(id, e)| (id, e.to_string())))
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}
