// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Settings grouping: batching targets that share command parameters.

use std::collections::HashMap;

use crate::target::Target;
use crate::types::{DeviceId, LogicalState, Transition};

use super::CommandParams;

/// Targets that can be driven by one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsGroup {
    /// Logical state shared by every member.
    pub state: LogicalState,
    /// Parameters shared by every member.
    pub params: CommandParams,
    /// Member ids, in input order.
    pub ids: Vec<DeviceId>,
}

/// Partitions targets into the fewest groups with identical parameters.
///
/// The grouping key is the logical state plus the target's
/// [`CommandParams`]: brightness, active color, effect and effective
/// transition (the target's own transition, else `call_transition`).
/// Targets with different logical states never share a group.
///
/// Groups are returned in first-seen order.
///
/// # Examples
///
/// ```
/// use lightsync_lib::command::group;
/// use lightsync_lib::target::Target;
/// use lightsync_lib::types::Brightness;
///
/// let targets = [
///     Target::new("light.a"),
///     Target::new("light.b").with_brightness(Brightness::new(50).unwrap()),
///     Target::new("light.c"),
/// ];
/// let groups = group(&targets, None);
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0].ids.len(), 2);
/// ```
#[must_use]
pub fn group(targets: &[Target], call_transition: Option<Transition>) -> Vec<SettingsGroup> {
    let mut groups: Vec<SettingsGroup> = Vec::new();
    let mut index: HashMap<(LogicalState, CommandParams), usize> = HashMap::new();

    for target in targets {
        let params = CommandParams::for_target(target, call_transition);
        let key = (target.logical_state, params);

        if let Some(&i) = index.get(&key) {
            groups[i].ids.push(target.id.clone());
        } else {
            let (state, params) = key.clone();
            index.insert(key, groups.len());
            groups.push(SettingsGroup {
                state,
                params,
                ids: vec![target.id.clone()],
            });
        }
    }

    groups
}
