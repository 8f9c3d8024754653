// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command dispatch.
//!
//! One dispatch pass turns a list of targets into batched commands and sends
//! them all at once:
//!
//! - every target that should be off is covered by a single `turn_off`
//!   command carrying the call-level transition
//! - targets that should be on are grouped by identical parameters (see
//!   [`group`](crate::command::group)) and each group gets one `turn_on`
//!   command

use futures::future::join_all;

use crate::command::{CommandKind, CommandParams, group};
use crate::error::SendError;
use crate::provider::CommandSender;
use crate::target::Target;
use crate::types::{DeviceId, LogicalState, Transition};

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Ids covered by a command that was delivered.
    pub sent: Vec<DeviceId>,
    /// Ids covered by a command that failed, with the failure.
    pub failed: Vec<(DeviceId, SendError)>,
    /// Number of commands issued.
    pub commands: usize,
}

impl DispatchReport {
    /// Returns true if every command was delivered.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns true if the send for `id` failed in this pass.
    #[must_use]
    pub fn has_failed(&self, id: &DeviceId) -> bool {
        self.failed.iter().any(|(failed, _)| failed == id)
    }
}

/// Sends the commands that drive `targets` towards their logical state and
/// settings.
///
/// All commands run concurrently and are joined before returning. A failed
/// send is recorded against every id of its command; other commands are
/// unaffected.
///
/// # Examples
///
/// ```
/// use lightsync_lib::dispatch::dispatch;
/// use lightsync_lib::provider::InMemoryProvider;
/// use lightsync_lib::target::Target;
/// use lightsync_lib::types::LogicalState;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fleet = InMemoryProvider::new();
/// for id in ["a", "b", "c"] {
///     fleet.add_light(id);
/// }
///
/// let targets = [
///     Target::new("a"),
///     Target::new("b"),
///     Target::new("c").with_state(LogicalState::Off),
/// ];
/// let report = dispatch(&fleet, &targets, None).await;
///
/// assert_eq!(report.commands, 2);
/// assert!(report.is_clean());
/// # }
/// ```
pub async fn dispatch<S: CommandSender + ?Sized>(
    sender: &S,
    targets: &[Target],
    call_transition: Option<Transition>,
) -> DispatchReport {
    let mut batches: Vec<(CommandKind, Vec<DeviceId>, CommandParams)> = Vec::new();

    let off_ids: Vec<DeviceId> = targets
        .iter()
        .filter(|t| t.logical_state == LogicalState::Off)
        .map(|t| t.id.clone())
        .collect();
    if !off_ids.is_empty() {
        batches.push((
            CommandKind::TurnOff,
            off_ids,
            CommandParams::turn_off(call_transition),
        ));
    }

    batches.extend(
        group(targets, call_transition)
            .into_iter()
            .filter(|g| g.state == LogicalState::On)
            .map(|g| (CommandKind::TurnOn, g.ids, g.params)),
    );

    for (kind, ids, params) in &batches {
        tracing::debug!(
            command = %kind,
            devices = ids.len(),
            params = %params.to_json(),
            "Sending command"
        );
    }

    let results = join_all(
        batches
            .iter()
            .map(|(kind, ids, params)| sender.send(*kind, ids, params)),
    )
    .await;

    let mut report = DispatchReport {
        commands: batches.len(),
        ..DispatchReport::default()
    };

    for ((kind, ids, _), result) in batches.into_iter().zip(results) {
        match result {
            Ok(()) => report.sent.extend(ids),
            Err(e) => {
                tracing::warn!(command = %kind, devices = ids.len(), error = %e, "Command failed");
                report
                    .failed
                    .extend(ids.into_iter().map(|id| (id, e.clone())));
            }
        }
    }

    report
}
