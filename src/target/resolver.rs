// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Expansion of membership lists into targets.

use std::collections::HashSet;

use crate::error::ResolutionError;
use crate::provider::{Directory, Entry};
use crate::types::DeviceId;

use super::{Overrides, Target, TargetDefaults, merge};

/// Output of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// One target per controllable device, in first-seen order.
    pub targets: Vec<Target>,
    /// Identifiers dropped during expansion: unknown ids and devices that
    /// are not controllable.
    pub skipped: Vec<DeviceId>,
}

/// Expands a membership list into one [`Target`] per controllable device.
///
/// Groups are expanded depth-first, including nested groups. A group is
/// expanded at most once, so cyclic group graphs terminate. Devices reached
/// through several paths appear once. Each target is built with [`merge`]
/// from `defaults` and the device's entry in `overrides`.
///
/// # Errors
///
/// Returns `ResolutionError::EmptyMembership` if `members` is empty and
/// `ResolutionError::NoControllableDevices` if expansion leaves no
/// controllable device.
///
/// # Examples
///
/// ```
/// use lightsync_lib::provider::InMemoryProvider;
/// use lightsync_lib::target::{resolve, Overrides, TargetDefaults};
/// use lightsync_lib::types::DeviceId;
///
/// let fleet = InMemoryProvider::new();
/// fleet.add_light("light.a");
/// fleet.add_light("light.b");
/// fleet.add_group("group.all", ["light.a", "light.b"]);
///
/// let members = [DeviceId::from("group.all"), DeviceId::from("light.a")];
/// let resolution = resolve(&members, &Overrides::new(), &TargetDefaults::new(), &fleet).unwrap();
/// assert_eq!(resolution.targets.len(), 2);
/// ```
pub fn resolve<D: Directory + ?Sized>(
    members: &[DeviceId],
    overrides: &Overrides,
    defaults: &TargetDefaults,
    directory: &D,
) -> Result<Resolution, ResolutionError> {
    if members.is_empty() {
        return Err(ResolutionError::EmptyMembership);
    }

    let (devices, skipped) = expand(members, directory);

    if devices.is_empty() {
        tracing::warn!(skipped = skipped.len(), "No controllable devices found");
        return Err(ResolutionError::NoControllableDevices { skipped });
    }

    tracing::debug!(
        devices = devices.len(),
        skipped = skipped.len(),
        "Expanded membership list"
    );

    let targets = devices
        .into_iter()
        .map(|id| {
            let override_ = overrides.get(id.as_str());
            merge(id, defaults, override_)
        })
        .collect();

    Ok(Resolution { targets, skipped })
}

fn expand<D: Directory + ?Sized>(
    members: &[DeviceId],
    directory: &D,
) -> (Vec<DeviceId>, Vec<DeviceId>) {
    let mut devices = Vec::new();
    let mut skipped = Vec::new();
    let mut seen_devices = HashSet::new();
    let mut seen_skipped = HashSet::new();
    let mut visited_groups = HashSet::new();

    // Reversed so that popping yields members in their original order
    let mut stack: Vec<DeviceId> = members.iter().rev().cloned().collect();

    while let Some(id) = stack.pop() {
        match directory.entry(&id) {
            Some(Entry::Controllable) => {
                if seen_devices.insert(id.clone()) {
                    devices.push(id);
                }
            }
            Some(Entry::Group(children)) => {
                if visited_groups.insert(id.clone()) {
                    tracing::debug!(group = %id, members = children.len(), "Expanding group");
                    stack.extend(children.into_iter().rev());
                } else {
                    tracing::debug!(group = %id, "Group already expanded, skipping");
                }
            }
            Some(Entry::Other) | None => {
                tracing::debug!(id = %id, "Skipping non-controllable entry");
                if seen_skipped.insert(id.clone()) {
                    skipped.push(id);
                }
            }
        }
    }

    (devices, skipped)
}
