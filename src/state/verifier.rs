// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Comparison of reported device state against targets.

use std::collections::HashMap;
use std::fmt;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::provider::StateReader;
use crate::target::{ColorSetting, Target};
use crate::types::{Brightness, DeviceId, LogicalState};

use super::Snapshot;

/// Accepted deviation between a target and the reported state.
///
/// All bounds are inclusive: a reading exactly `tolerance` away from the
/// target matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Brightness tolerance in percentage points.
    pub brightness_pct: u8,
    /// RGB tolerance, per channel (0-255 scale).
    pub rgb: u8,
    /// Color temperature tolerance in Kelvin.
    pub kelvin: u16,
}

impl Tolerances {
    /// Default brightness tolerance (percentage points).
    pub const DEFAULT_BRIGHTNESS_PCT: u8 = 3;
    /// Default RGB tolerance (per channel).
    pub const DEFAULT_RGB: u8 = 10;
    /// Default color temperature tolerance (Kelvin).
    pub const DEFAULT_KELVIN: u16 = 150;

    /// Sets the brightness tolerance.
    #[must_use]
    pub fn with_brightness_pct(mut self, tolerance: u8) -> Self {
        self.brightness_pct = tolerance;
        self
    }

    /// Sets the RGB tolerance.
    #[must_use]
    pub fn with_rgb(mut self, tolerance: u8) -> Self {
        self.rgb = tolerance;
        self
    }

    /// Sets the color temperature tolerance.
    #[must_use]
    pub fn with_kelvin(mut self, tolerance: u16) -> Self {
        self.kelvin = tolerance;
        self
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            brightness_pct: Self::DEFAULT_BRIGHTNESS_PCT,
            rgb: Self::DEFAULT_RGB,
            kelvin: Self::DEFAULT_KELVIN,
        }
    }
}

/// Which part of the reported state disagrees with the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mismatch {
    /// Wrong on/off state.
    State,
    /// Brightness outside tolerance.
    Brightness,
    /// Color outside tolerance, or no color reported.
    Color,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::State => "wrong state",
            Self::Brightness => "wrong brightness",
            Self::Color => "wrong color",
        })
    }
}

/// Outcome of checking one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationResult {
    /// The device matches its target.
    Success,
    /// The device cannot report its state. Not retried.
    Unavailable,
    /// The device does not match its target yet.
    Pending(Mismatch),
}

impl VerificationResult {
    /// Returns true if the target no longer needs commands.
    ///
    /// Both `Success` and `Unavailable` settle a target.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending(_))
    }
}

/// Compares a snapshot against a target.
///
/// Pure function: the logical state must match exactly; an `Off` target
/// compares nothing else. For `On` targets brightness and the target's active
/// color are compared within `tolerances`, skipping anything the device's
/// capabilities say it cannot do. A missing brightness reading counts as 0%.
///
/// # Examples
///
/// ```
/// use lightsync_lib::state::{evaluate, Mismatch, Snapshot, Tolerances, VerificationResult};
/// use lightsync_lib::target::Target;
/// use lightsync_lib::types::Brightness;
///
/// let target = Target::new("light.a").with_brightness(Brightness::new(50).unwrap());
/// let tolerances = Tolerances::default().with_brightness_pct(3);
///
/// let close = Snapshot::on().with_brightness(Brightness::new(53).unwrap());
/// assert_eq!(evaluate(&target, Some(&close), &tolerances), VerificationResult::Success);
///
/// let far = Snapshot::on().with_brightness(Brightness::new(54).unwrap());
/// assert_eq!(
///     evaluate(&target, Some(&far), &tolerances),
///     VerificationResult::Pending(Mismatch::Brightness)
/// );
///
/// assert_eq!(evaluate(&target, None, &tolerances), VerificationResult::Unavailable);
/// ```
#[must_use]
pub fn evaluate(
    target: &Target,
    snapshot: Option<&Snapshot>,
    tolerances: &Tolerances,
) -> VerificationResult {
    let Some(snapshot) = snapshot.filter(|s| s.reachable) else {
        return VerificationResult::Unavailable;
    };

    if snapshot.logical_state != target.logical_state {
        return VerificationResult::Pending(Mismatch::State);
    }

    if target.logical_state == LogicalState::Off {
        return VerificationResult::Success;
    }

    let caps = snapshot.capabilities;

    if caps.brightness {
        let actual = snapshot.brightness_pct().unwrap_or(Brightness::MIN);
        if !target.brightness.within(actual, tolerances.brightness_pct) {
            return VerificationResult::Pending(Mismatch::Brightness);
        }
    }

    let color_ok = match target.color {
        None => true,
        Some(ColorSetting::Rgb(_)) if !caps.rgb => true,
        Some(ColorSetting::ColorTemp(_)) if !caps.color_temp => true,
        Some(ColorSetting::Rgb(expected)) => snapshot
            .color
            .and_then(|c| c.rgb())
            .is_some_and(|actual| expected.distance(&actual) <= tolerances.rgb),
        Some(ColorSetting::ColorTemp(expected)) => snapshot
            .color
            .and_then(|c| c.color_temp())
            .is_some_and(|actual| expected.within(actual, tolerances.kelvin)),
    };

    if color_ok {
        VerificationResult::Success
    } else {
        VerificationResult::Pending(Mismatch::Color)
    }
}

/// Per-target verification outcomes of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    results: HashMap<DeviceId, VerificationResult>,
}

impl VerificationReport {
    /// Returns the result for a device.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<VerificationResult> {
        self.results.get(id).copied()
    }

    /// Returns the number of checked targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if no target was checked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterates over `(id, result)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, VerificationResult)> {
        self.results.iter().map(|(id, r)| (id, *r))
    }

    /// Counts results matching a predicate.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&VerificationResult) -> bool) -> usize {
        self.results.values().filter(|r| predicate(r)).count()
    }
}

impl FromIterator<(DeviceId, VerificationResult)> for VerificationReport {
    fn from_iter<I: IntoIterator<Item = (DeviceId, VerificationResult)>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

/// Reads the current state of every target and classifies it.
///
/// Snapshots are read concurrently. Verification never sends commands.
pub async fn verify<R: StateReader + ?Sized>(
    reader: &R,
    targets: &[Target],
    tolerances: &Tolerances,
) -> VerificationReport {
    let snapshots = join_all(targets.iter().map(|t| reader.get(&t.id))).await;

    let report: VerificationReport = targets
        .iter()
        .zip(snapshots)
        .map(|(target, snapshot)| {
            let result = evaluate(target, snapshot.as_ref(), tolerances);
            if let VerificationResult::Pending(mismatch) = result {
                tracing::debug!(id = %target.id, %mismatch, "Target not reached");
            }
            (target.id.clone(), result)
        })
        .collect();

    tracing::debug!(
        matched = report.count(|r| *r == VerificationResult::Success),
        unavailable = report.count(|r| *r == VerificationResult::Unavailable),
        pending = report.count(|r| !r.is_settled()),
        "Verified targets"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Capabilities;
    use crate::types::{Kelvin, RgbColor};

    fn pct(value: u8) -> Brightness {
        Brightness::new(value).unwrap()
    }

    fn check(target: &Target, snapshot: &Snapshot) -> VerificationResult {
        evaluate(target, Some(snapshot), &Tolerances::default())
    }

    #[test]
    fn unreachable_is_unavailable() {
        let target = Target::new("a");
        assert_eq!(
            check(&target, &Snapshot::unreachable()),
            VerificationResult::Unavailable
        );
    }

    #[test]
    fn off_target_compares_state_only() {
        let target = Target::new("a").with_state(LogicalState::Off);
        assert_eq!(check(&target, &Snapshot::off()), VerificationResult::Success);
        assert_eq!(
            check(&target, &Snapshot::on().with_brightness(pct(100))),
            VerificationResult::Pending(Mismatch::State)
        );
    }

    #[test]
    fn on_target_with_light_off() {
        let target = Target::new("a");
        assert_eq!(
            check(&target, &Snapshot::off()),
            VerificationResult::Pending(Mismatch::State)
        );
    }

    #[test]
    fn brightness_tolerance_boundary() {
        let target = Target::new("a").with_brightness(pct(50));
        let tol = Tolerances::default().with_brightness_pct(5);

        for actual in [45, 50, 55] {
            let snapshot = Snapshot::on().with_brightness(pct(actual));
            assert_eq!(
                evaluate(&target, Some(&snapshot), &tol),
                VerificationResult::Success,
                "{actual}% should match"
            );
        }
        for actual in [44, 56] {
            let snapshot = Snapshot::on().with_brightness(pct(actual));
            assert_eq!(
                evaluate(&target, Some(&snapshot), &tol),
                VerificationResult::Pending(Mismatch::Brightness),
                "{actual}% should not match"
            );
        }
    }

    #[test]
    fn raw_brightness_is_converted() {
        let target = Target::new("a").with_brightness(pct(50));
        assert_eq!(
            check(&target, &Snapshot::on().with_raw_brightness(128)),
            VerificationResult::Success
        );
    }

    #[test]
    fn missing_brightness_counts_as_zero() {
        let low = Target::new("a").with_brightness(pct(2));
        assert_eq!(check(&low, &Snapshot::on()), VerificationResult::Success);

        let high = Target::new("a").with_brightness(pct(80));
        assert_eq!(
            check(&high, &Snapshot::on()),
            VerificationResult::Pending(Mismatch::Brightness)
        );
    }

    #[test]
    fn brightness_skipped_for_on_off_lights() {
        let target = Target::new("a").with_brightness(pct(80));
        let snapshot = Snapshot::on().with_capabilities(Capabilities::on_off());
        assert_eq!(check(&target, &snapshot), VerificationResult::Success);
    }

    #[test]
    fn rgb_tolerance_per_channel() {
        let target = Target::new("a").with_rgb_color(RgbColor::new(200, 100, 50));

        let close = Snapshot::on()
            .with_brightness(pct(100))
            .with_rgb_color(RgbColor::new(210, 90, 55));
        assert_eq!(check(&target, &close), VerificationResult::Success);

        let far = Snapshot::on()
            .with_brightness(pct(100))
            .with_rgb_color(RgbColor::new(200, 100, 61));
        assert_eq!(
            check(&target, &far),
            VerificationResult::Pending(Mismatch::Color)
        );
    }

    #[test]
    fn missing_color_reading_is_a_mismatch() {
        let target = Target::new("a").with_color_temp(Kelvin::WARM);
        let snapshot = Snapshot::on().with_brightness(pct(100));
        assert_eq!(
            check(&target, &snapshot),
            VerificationResult::Pending(Mismatch::Color)
        );

        // Reporting the other mode does not count either
        let snapshot = snapshot.with_rgb_color(RgbColor::white());
        assert_eq!(
            check(&target, &snapshot),
            VerificationResult::Pending(Mismatch::Color)
        );
    }

    #[test]
    fn kelvin_tolerance() {
        let target = Target::new("a").with_color_temp(Kelvin::new(3000).unwrap());
        let base = Snapshot::on().with_brightness(pct(100));

        let ok = base.clone().with_color_temp(Kelvin::new(3150).unwrap());
        assert_eq!(check(&target, &ok), VerificationResult::Success);

        let off = base.with_color_temp(Kelvin::new(3151).unwrap());
        assert_eq!(
            check(&target, &off),
            VerificationResult::Pending(Mismatch::Color)
        );
    }

    #[test]
    fn unsupported_color_mode_is_not_compared() {
        let target = Target::new("a").with_rgb_color(RgbColor::new(255, 0, 0));
        let snapshot = Snapshot::on()
            .with_brightness(pct(100))
            .with_color_temp(Kelvin::WARM)
            .with_capabilities(Capabilities::cct_light());
        assert_eq!(check(&target, &snapshot), VerificationResult::Success);
    }

    #[test]
    fn settled_results() {
        assert!(VerificationResult::Success.is_settled());
        assert!(VerificationResult::Unavailable.is_settled());
        assert!(!VerificationResult::Pending(Mismatch::Color).is_settled());
    }

    #[tokio::test]
    async fn verify_classifies_every_target() {
        use crate::provider::{DeviceBehavior, InMemoryProvider};

        let fleet = InMemoryProvider::new();
        fleet.set_snapshot("on", Snapshot::on().with_brightness(Brightness::MAX));
        fleet.add_light("off");
        fleet.add_light("offline");
        fleet.set_behavior("offline", DeviceBehavior::new().unreachable());

        let targets = [
            Target::new("on"),
            Target::new("off"),
            Target::new("offline"),
            Target::new("ghost"),
        ];
        let report = verify(&fleet, &targets, &Tolerances::default()).await;

        assert_eq!(report.len(), 4);
        assert_eq!(report.get("on"), Some(VerificationResult::Success));
        assert_eq!(
            report.get("off"),
            Some(VerificationResult::Pending(Mismatch::State))
        );
        assert_eq!(report.count(|r| *r == VerificationResult::Unavailable), 2);
        assert_eq!(report.count(|r| !r.is_settled()), 1);
        assert_eq!(fleet.command_count(), 0);
    }
}
