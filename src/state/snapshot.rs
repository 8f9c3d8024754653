// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point-in-time device state.

use serde::{Deserialize, Serialize};

use crate::Capabilities;
use crate::target::ColorSetting;
use crate::types::{Brightness, Kelvin, LogicalState, RgbColor};

/// Brightness as reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrightnessReading {
    /// Percentage scale (0-100).
    Percent(Brightness),
    /// Raw device scale (0-255).
    Raw(u8),
}

impl BrightnessReading {
    /// Returns the reading as a percentage.
    #[must_use]
    pub fn percent(&self) -> Brightness {
        match self {
            Self::Percent(pct) => *pct,
            Self::Raw(raw) => Brightness::from_raw(*raw),
        }
    }
}

/// State of a device as returned by a
/// [`StateReader`](crate::provider::StateReader).
///
/// All readings are optional because devices do not always report every
/// attribute (an off light typically reports no brightness or color).
///
/// # Examples
///
/// ```
/// use lightsync_lib::state::Snapshot;
/// use lightsync_lib::types::{Kelvin, LogicalState};
///
/// let snapshot = Snapshot::on()
///     .with_raw_brightness(128)
///     .with_color_temp(Kelvin::WARM);
///
/// assert_eq!(snapshot.logical_state, LogicalState::On);
/// assert_eq!(snapshot.brightness_pct().unwrap().value(), 50);
/// assert!(snapshot.reachable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Reported on/off state.
    pub logical_state: LogicalState,
    /// Reported brightness.
    pub brightness: Option<BrightnessReading>,
    /// Reported active color.
    pub color: Option<ColorSetting>,
    /// Reported effect.
    pub effect: Option<String>,
    /// Whether the device can currently report its state.
    pub reachable: bool,
    /// What the device supports.
    pub capabilities: Capabilities,
}

impl Snapshot {
    /// Creates a reachable snapshot with the given state and no readings.
    #[must_use]
    pub fn new(logical_state: LogicalState) -> Self {
        Self {
            logical_state,
            brightness: None,
            color: None,
            effect: None,
            reachable: true,
            capabilities: Capabilities::default(),
        }
    }

    /// Creates a reachable snapshot of a light that is on.
    #[must_use]
    pub fn on() -> Self {
        Self::new(LogicalState::On)
    }

    /// Creates a reachable snapshot of a light that is off.
    #[must_use]
    pub fn off() -> Self {
        Self::new(LogicalState::Off)
    }

    /// Creates a snapshot of a device that cannot report its state.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::off()
        }
    }

    /// Sets the brightness reading as a percentage.
    #[must_use]
    pub fn with_brightness(mut self, brightness: Brightness) -> Self {
        self.brightness = Some(BrightnessReading::Percent(brightness));
        self
    }

    /// Sets the brightness reading on the raw 0-255 scale.
    #[must_use]
    pub fn with_raw_brightness(mut self, raw: u8) -> Self {
        self.brightness = Some(BrightnessReading::Raw(raw));
        self
    }

    /// Sets the color reading to an RGB color.
    #[must_use]
    pub fn with_rgb_color(mut self, rgb: RgbColor) -> Self {
        self.color = Some(ColorSetting::Rgb(rgb));
        self
    }

    /// Sets the color reading to a color temperature.
    #[must_use]
    pub fn with_color_temp(mut self, kelvin: Kelvin) -> Self {
        self.color = Some(ColorSetting::ColorTemp(kelvin));
        self
    }

    /// Sets the effect reading.
    #[must_use]
    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }

    /// Sets the device capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Returns the brightness reading as a percentage.
    #[must_use]
    pub fn brightness_pct(&self) -> Option<Brightness> {
        self.brightness.map(|b| b.percent())
    }
}
