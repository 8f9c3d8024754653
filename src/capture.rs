// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capture of the current device state as overrides.
//!
//! Capturing a scene and replaying it later through
//! [`Controller::ensure_state`](crate::controller::Controller::ensure_state)
//! restores the captured state; replaying it right away sends nothing.

use futures::future::join_all;

use crate::provider::StateReader;
use crate::state::Snapshot;
use crate::target::{ColorSetting, Overrides, TargetOverride};
use crate::types::{Brightness, DeviceId, LogicalState};

/// Reads the current state of `ids` and turns each into a [`TargetOverride`].
///
/// Lights that are on keep their brightness, active color and effect; lights
/// that are off only record the off state. Devices without a snapshot or
/// that are unreachable are left out.
///
/// # Examples
///
/// ```
/// use lightsync_lib::capture::capture_overrides;
/// use lightsync_lib::provider::InMemoryProvider;
/// use lightsync_lib::state::Snapshot;
/// use lightsync_lib::types::{Brightness, DeviceId, LogicalState};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fleet = InMemoryProvider::new();
/// fleet.set_snapshot("light.a", Snapshot::on().with_brightness(Brightness::new(35).unwrap()));
/// fleet.set_snapshot("light.b", Snapshot::off());
///
/// let ids = [DeviceId::from("light.a"), DeviceId::from("light.b")];
/// let overrides = capture_overrides(&fleet, &ids).await;
///
/// assert_eq!(overrides.get("light.a").unwrap().brightness.unwrap().value(), 35);
/// assert_eq!(overrides.get("light.b").unwrap().logical_state, Some(LogicalState::Off));
/// # }
/// ```
pub async fn capture_overrides<R: StateReader + ?Sized>(reader: &R, ids: &[DeviceId]) -> Overrides {
    let snapshots = join_all(ids.iter().map(|id| reader.get(id))).await;

    let mut overrides = Overrides::new();
    for (id, snapshot) in ids.iter().zip(snapshots) {
        match snapshot {
            Some(snapshot) if snapshot.reachable => {
                overrides.insert(id.clone(), to_override(&snapshot));
            }
            _ => tracing::debug!(%id, "No state to capture"),
        }
    }

    tracing::debug!(captured = overrides.len(), requested = ids.len(), "Captured state");
    overrides
}

fn to_override(snapshot: &Snapshot) -> TargetOverride {
    let captured = TargetOverride::new().with_state(snapshot.logical_state);
    if snapshot.logical_state == LogicalState::Off {
        return captured;
    }

    // A missing reading is what verification sees as 0%
    let captured = if snapshot.capabilities.brightness {
        captured.with_brightness(snapshot.brightness_pct().unwrap_or(Brightness::MIN))
    } else {
        captured
    };
    let captured = match snapshot.color {
        Some(ColorSetting::Rgb(rgb)) => captured.with_rgb_color(rgb),
        Some(ColorSetting::ColorTemp(kelvin)) => captured.with_color_temp(kelvin),
        None => captured,
    };
    match &snapshot.effect {
        Some(effect) => captured.with_effect(effect.clone()),
        None => captured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Capabilities;
    use crate::provider::{DeviceBehavior, InMemoryProvider};
    use crate::types::{Kelvin, RgbColor};

    #[tokio::test]
    async fn captures_active_settings() {
        let fleet = InMemoryProvider::new();
        fleet.set_snapshot(
            "rgb",
            Snapshot::on()
                .with_raw_brightness(51)
                .with_rgb_color(RgbColor::new(0, 0, 255))
                .with_effect("pulse"),
        );
        fleet.set_snapshot("cct", Snapshot::on().with_color_temp(Kelvin::COOL));

        let ids = [DeviceId::from("rgb"), DeviceId::from("cct")];
        let overrides = capture_overrides(&fleet, &ids).await;

        let rgb = overrides.get("rgb").unwrap();
        assert_eq!(rgb.logical_state, Some(LogicalState::On));
        assert_eq!(rgb.brightness, Some(Brightness::new(20).unwrap()));
        assert_eq!(rgb.rgb_color, Some(RgbColor::new(0, 0, 255)));
        assert_eq!(rgb.color_temp, None);
        assert_eq!(rgb.effect.as_deref(), Some("pulse"));

        let cct = overrides.get("cct").unwrap();
        assert_eq!(cct.color_temp, Some(Kelvin::COOL));
        assert_eq!(cct.brightness, None);
    }

    #[tokio::test]
    async fn skips_unreachable_and_unknown() {
        let fleet = InMemoryProvider::new();
        fleet.add_light("offline");
        fleet.set_behavior("offline", DeviceBehavior::new().unreachable());

        let ids = [DeviceId::from("offline"), DeviceId::from("ghost")];
        assert!(capture_overrides(&fleet, &ids).await.is_empty());
    }

    #[tokio::test]
    async fn brightness_ignored_without_support() {
        let fleet = InMemoryProvider::new();
        fleet.set_snapshot(
            "plug",
            Snapshot::on()
                .with_brightness(Brightness::MAX)
                .with_capabilities(Capabilities::on_off()),
        );

        let overrides = capture_overrides(&fleet, &[DeviceId::from("plug")]).await;
        assert_eq!(overrides.get("plug").unwrap().brightness, None);
    }

    #[tokio::test]
    async fn missing_brightness_reading_is_captured_as_minimum() {
        let fleet = InMemoryProvider::new();
        fleet.set_snapshot("bulb", Snapshot::on().with_rgb_color(RgbColor::new(255, 0, 0)));

        let overrides = capture_overrides(&fleet, &[DeviceId::from("bulb")]).await;
        assert_eq!(overrides.get("bulb").unwrap().brightness, Some(Brightness::MIN));
    }
}
