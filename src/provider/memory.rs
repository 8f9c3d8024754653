// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simulated device fleet.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::Capabilities;
use crate::command::{CommandKind, CommandParams};
use crate::error::SendError;
use crate::state::{BrightnessReading, Snapshot};
use crate::target::ColorSetting;
use crate::types::{Brightness, DeviceId, LogicalState};

use super::{CommandSender, Directory, Entry, StateReader};

/// How a simulated device reacts to commands and reads.
///
/// The default behavior is a well-behaved device: reachable, accepting
/// every command and reporting exactly what it was told.
///
/// # Examples
///
/// ```
/// use lightsync_lib::provider::DeviceBehavior;
///
/// // Drops the next two commands, then reports brightness 5 points high
/// let behavior = DeviceBehavior::new()
///     .with_ignored_commands(2)
///     .with_brightness_offset(5);
/// assert!(behavior.reachable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBehavior {
    /// Whether reads return a usable snapshot.
    pub reachable: bool,
    /// Number of upcoming sends addressing this device that fail.
    pub failing_sends: u32,
    /// Number of upcoming commands the device accepts but does not apply.
    pub ignored_commands: u32,
    /// Offset added to every brightness the device applies.
    pub brightness_offset: i8,
}

impl DeviceBehavior {
    /// Creates a well-behaved device.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the device unreachable.
    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Makes the next `count` sends addressing the device fail.
    #[must_use]
    pub fn with_failing_sends(mut self, count: u32) -> Self {
        self.failing_sends = count;
        self
    }

    /// Makes the device silently drop the next `count` commands.
    ///
    /// Use `u32::MAX` for a device that never applies anything.
    #[must_use]
    pub fn with_ignored_commands(mut self, count: u32) -> Self {
        self.ignored_commands = count;
        self
    }

    /// Sets the offset between commanded and applied brightness.
    #[must_use]
    pub fn with_brightness_offset(mut self, offset: i8) -> Self {
        self.brightness_offset = offset;
        self
    }
}

impl Default for DeviceBehavior {
    fn default() -> Self {
        Self {
            reachable: true,
            failing_sends: 0,
            ignored_commands: 0,
            brightness_offset: 0,
        }
    }
}

/// A command recorded by [`InMemoryProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCommand {
    /// Command kind.
    pub kind: CommandKind,
    /// Addressed devices, in the order given by the sender.
    pub ids: Vec<DeviceId>,
    /// Command parameters.
    pub params: CommandParams,
    /// Whether the send reported success.
    pub delivered: bool,
}

#[derive(Debug, Default)]
struct Fleet {
    entries: HashMap<DeviceId, Entry>,
    snapshots: HashMap<DeviceId, Snapshot>,
    behaviors: HashMap<DeviceId, DeviceBehavior>,
    log: Vec<SentCommand>,
    latency: Duration,
}

impl Fleet {
    fn observe(&self, id: &DeviceId) -> Option<Snapshot> {
        let snapshot = self.snapshots.get(id)?;
        let reachable = self.behaviors.get(id).is_none_or(|b| b.reachable);
        if reachable {
            Some(snapshot.clone())
        } else {
            Some(Snapshot::unreachable().with_capabilities(snapshot.capabilities))
        }
    }

    fn send(
        &mut self,
        kind: CommandKind,
        ids: &[DeviceId],
        params: &CommandParams,
    ) -> Result<(), SendError> {
        let result = self.deliver(kind, ids, params);
        self.log.push(SentCommand {
            kind,
            ids: ids.to_vec(),
            params: params.clone(),
            delivered: result.is_ok(),
        });
        result
    }

    fn deliver(
        &mut self,
        kind: CommandKind,
        ids: &[DeviceId],
        params: &CommandParams,
    ) -> Result<(), SendError> {
        if let Some(unknown) = ids.iter().find(|id| !self.snapshots.contains_key(*id)) {
            return Err(SendError::Unreachable(unknown.clone()));
        }

        // One failing device fails the whole batch
        let mut failing = None;
        for id in ids {
            if let Some(behavior) = self.behaviors.get_mut(id)
                && behavior.failing_sends > 0
            {
                behavior.failing_sends -= 1;
                failing.get_or_insert_with(|| id.clone());
            }
        }
        if let Some(id) = failing {
            return Err(SendError::Rejected(format!("{id} refused {kind}")));
        }

        for id in ids {
            let behavior = self.behaviors.entry(id.clone()).or_default();
            if !behavior.reachable {
                continue;
            }
            if behavior.ignored_commands > 0 {
                behavior.ignored_commands -= 1;
                continue;
            }
            let offset = behavior.brightness_offset;
            if let Some(snapshot) = self.snapshots.get_mut(id) {
                apply(snapshot, kind, params, offset);
            }
        }

        Ok(())
    }
}

fn apply(snapshot: &mut Snapshot, kind: CommandKind, params: &CommandParams, offset: i8) {
    let caps = snapshot.capabilities;

    match kind {
        CommandKind::TurnOff => {
            snapshot.logical_state = LogicalState::Off;
            snapshot.brightness = None;
            snapshot.color = None;
            snapshot.effect = None;
        }
        CommandKind::TurnOn => {
            snapshot.logical_state = LogicalState::On;
            if caps.brightness {
                let commanded = params.brightness.unwrap_or(Brightness::MAX);
                let applied = (i16::from(commanded.value()) + i16::from(offset)).clamp(0, 100);
                let applied = Brightness::clamped(u8::try_from(applied).unwrap_or(0));
                snapshot.brightness = Some(BrightnessReading::Percent(applied));
            }
            match params.color {
                Some(color @ ColorSetting::Rgb(_)) if caps.rgb => snapshot.color = Some(color),
                Some(color @ ColorSetting::ColorTemp(_)) if caps.color_temp => {
                    snapshot.color = Some(color);
                }
                _ => {}
            }
            if caps.effects && params.effect.is_some() {
                snapshot.effect.clone_from(&params.effect);
            }
        }
    }
}

/// In-memory device fleet implementing every provider trait.
///
/// Commands mutate the stored snapshots according to each device's
/// [`DeviceBehavior`], and every send is recorded in a command log.
/// Clones share the same fleet.
///
/// # Examples
///
/// ```
/// use lightsync_lib::Capabilities;
/// use lightsync_lib::provider::{DeviceBehavior, InMemoryProvider};
///
/// let fleet = InMemoryProvider::new();
/// fleet.add_light("light.desk");
/// fleet.add_light_with("light.plug", Capabilities::on_off());
/// fleet.add_other("switch.fan");
/// fleet.add_group("group.office", ["light.desk", "light.plug", "switch.fan"]);
/// fleet.set_behavior("light.desk", DeviceBehavior::new().with_failing_sends(1));
///
/// assert!(fleet.snapshot("light.desk").is_some());
/// assert!(fleet.commands().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    fleet: Arc<RwLock<Fleet>>,
}

impl InMemoryProvider {
    /// Creates an empty fleet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a delay applied to every send before it takes effect.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.fleet.write().latency = latency;
        self
    }

    // =========================================================================
    // Fleet setup
    // =========================================================================

    /// Adds a full-color light, initially off.
    pub fn add_light(&self, id: impl Into<DeviceId>) {
        self.add_light_with(id, Capabilities::default());
    }

    /// Adds a light with the given capabilities, initially off.
    pub fn add_light_with(&self, id: impl Into<DeviceId>, capabilities: Capabilities) {
        let id = id.into();
        let mut fleet = self.fleet.write();
        fleet.entries.insert(id.clone(), Entry::Controllable);
        fleet
            .snapshots
            .insert(id, Snapshot::off().with_capabilities(capabilities));
    }

    /// Adds a device the controller cannot drive.
    pub fn add_other(&self, id: impl Into<DeviceId>) {
        self.fleet.write().entries.insert(id.into(), Entry::Other);
    }

    /// Adds a group. Members may be lights, other devices or groups.
    pub fn add_group<I, M>(&self, id: impl Into<DeviceId>, members: I)
    where
        I: IntoIterator<Item = M>,
        M: Into<DeviceId>,
    {
        let members = members.into_iter().map(Into::into).collect();
        self.fleet
            .write()
            .entries
            .insert(id.into(), Entry::Group(members));
    }

    /// Replaces the stored state of a light, capabilities included.
    ///
    /// Unknown ids are registered as lights.
    pub fn set_snapshot(&self, id: impl Into<DeviceId>, snapshot: Snapshot) {
        let id = id.into();
        let mut fleet = self.fleet.write();
        fleet.entries.insert(id.clone(), Entry::Controllable);
        fleet.snapshots.insert(id, snapshot);
    }

    /// Sets how a device reacts to commands.
    pub fn set_behavior(&self, id: impl Into<DeviceId>, behavior: DeviceBehavior) {
        self.fleet.write().behaviors.insert(id.into(), behavior);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Returns the stored state of a light, ignoring reachability.
    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<Snapshot> {
        self.fleet.read().snapshots.get(id).cloned()
    }

    /// Returns every command sent so far, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<SentCommand> {
        self.fleet.read().log.clone()
    }

    /// Returns the number of commands sent so far.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.fleet.read().log.len()
    }

    /// Returns the number of commands that addressed a device.
    #[must_use]
    pub fn commands_for(&self, id: &str) -> usize {
        self.fleet
            .read()
            .log
            .iter()
            .filter(|c| c.ids.iter().any(|i| i.as_str() == id))
            .count()
    }

    /// Clears the command log.
    pub fn clear_commands(&self) {
        self.fleet.write().log.clear();
    }
}

impl Directory for InMemoryProvider {
    fn entry(&self, id: &DeviceId) -> Option<Entry> {
        self.fleet.read().entries.get(id).cloned()
    }
}

impl CommandSender for InMemoryProvider {
    fn send(
        &self,
        kind: CommandKind,
        ids: &[DeviceId],
        params: &CommandParams,
    ) -> impl Future<Output = Result<(), SendError>> + Send {
        let fleet = Arc::clone(&self.fleet);
        let ids = ids.to_vec();
        let params = params.clone();

        async move {
            let latency = fleet.read().latency;
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            fleet.write().send(kind, &ids, &params)
        }
    }
}

impl StateReader for InMemoryProvider {
    fn get(&self, id: &DeviceId) -> impl Future<Output = Option<Snapshot>> + Send {
        let snapshot = self.fleet.read().observe(id);
        std::future::ready(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;
    use crate::types::{Kelvin, RgbColor};

    fn on_params(target: &Target) -> CommandParams {
        CommandParams::for_target(target, None)
    }

    #[tokio::test]
    async fn turn_on_applies_parameters() {
        let fleet = InMemoryProvider::new();
        fleet.add_light("a");

        let target = Target::new("a")
            .with_brightness(Brightness::new(40).unwrap())
            .with_rgb_color(RgbColor::new(1, 2, 3))
            .with_effect("fire");
        fleet
            .send(CommandKind::TurnOn, &[target.id.clone()], &on_params(&target))
            .await
            .unwrap();

        let snapshot = fleet.get(&target.id).await.unwrap();
        assert_eq!(snapshot.logical_state, LogicalState::On);
        assert_eq!(snapshot.brightness_pct(), Some(Brightness::new(40).unwrap()));
        assert_eq!(snapshot.color, Some(ColorSetting::Rgb(RgbColor::new(1, 2, 3))));
        assert_eq!(snapshot.effect.as_deref(), Some("fire"));
        assert_eq!(fleet.command_count(), 1);
    }

    #[tokio::test]
    async fn unsupported_features_are_not_applied() {
        let fleet = InMemoryProvider::new();
        fleet.add_light_with("plug", Capabilities::on_off());

        let target = Target::new("plug").with_color_temp(Kelvin::WARM);
        fleet
            .send(CommandKind::TurnOn, &[target.id.clone()], &on_params(&target))
            .await
            .unwrap();

        let snapshot = fleet.snapshot("plug").unwrap();
        assert_eq!(snapshot.logical_state, LogicalState::On);
        assert_eq!(snapshot.brightness, None);
        assert_eq!(snapshot.color, None);
    }

    #[tokio::test]
    async fn failing_device_fails_whole_batch_once() {
        let fleet = InMemoryProvider::new();
        fleet.add_light("a");
        fleet.add_light("b");
        fleet.set_behavior("b", DeviceBehavior::new().with_failing_sends(1));

        let ids = [DeviceId::from("a"), DeviceId::from("b")];
        let params = CommandParams::default();

        let err = fleet.send(CommandKind::TurnOn, &ids, &params).await;
        assert!(matches!(err, Err(SendError::Rejected(_))));
        assert_eq!(fleet.snapshot("a").unwrap().logical_state, LogicalState::Off);

        fleet.send(CommandKind::TurnOn, &ids, &params).await.unwrap();
        assert_eq!(fleet.snapshot("a").unwrap().logical_state, LogicalState::On);

        let log = fleet.commands();
        assert!(!log[0].delivered);
        assert!(log[1].delivered);
    }

    #[tokio::test]
    async fn unknown_id_is_unreachable() {
        let fleet = InMemoryProvider::new();
        let ids = [DeviceId::from("ghost")];
        let result = fleet
            .send(CommandKind::TurnOff, &ids, &CommandParams::default())
            .await;
        assert_eq!(result, Err(SendError::Unreachable(DeviceId::from("ghost"))));
        assert!(fleet.get(&ids[0]).await.is_none());
    }

    #[tokio::test]
    async fn ignored_commands_and_offset() {
        let fleet = InMemoryProvider::new();
        fleet.add_light("a");
        fleet.set_behavior(
            "a",
            DeviceBehavior::new()
                .with_ignored_commands(1)
                .with_brightness_offset(-7),
        );

        let target = Target::new("a").with_brightness(Brightness::new(50).unwrap());
        let ids = [target.id.clone()];

        fleet.send(CommandKind::TurnOn, &ids, &on_params(&target)).await.unwrap();
        assert_eq!(fleet.snapshot("a").unwrap().logical_state, LogicalState::Off);

        fleet.send(CommandKind::TurnOn, &ids, &on_params(&target)).await.unwrap();
        assert_eq!(
            fleet.snapshot("a").unwrap().brightness_pct(),
            Some(Brightness::new(43).unwrap())
        );
    }

    #[tokio::test]
    async fn unreachable_device_reads_as_unreachable() {
        let fleet = InMemoryProvider::new();
        fleet.add_light_with("a", Capabilities::dimmable());
        fleet.set_behavior("a", DeviceBehavior::new().unreachable());

        let snapshot = fleet.get(&DeviceId::from("a")).await.unwrap();
        assert!(!snapshot.reachable);
        assert_eq!(snapshot.capabilities, Capabilities::dimmable());
    }

    #[test]
    fn directory_entries() {
        let fleet = InMemoryProvider::new();
        fleet.add_light("a");
        fleet.add_other("sensor");
        fleet.add_group("g", ["a", "sensor"]);

        assert_eq!(fleet.entry(&DeviceId::from("a")), Some(Entry::Controllable));
        assert_eq!(fleet.entry(&DeviceId::from("sensor")), Some(Entry::Other));
        assert_eq!(
            fleet.entry(&DeviceId::from("g")),
            Some(Entry::Group(vec![DeviceId::from("a"), DeviceId::from("sensor")]))
        );
        assert_eq!(fleet.entry(&DeviceId::from("nope")), None);
    }

    #[test]
    fn clones_share_the_fleet() {
        let fleet = InMemoryProvider::new();
        let clone = fleet.clone();
        clone.add_light("a");
        assert!(fleet.snapshot("a").is_some());
    }
}
