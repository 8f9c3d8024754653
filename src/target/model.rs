// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Desired end state of a single light.

use serde::{Deserialize, Serialize};

use crate::types::{Brightness, DeviceId, Kelvin, LogicalState, RgbColor, Transition};

/// Active color setting of a target.
///
/// Lights are driven either by an RGB color or by a white color temperature,
/// never both at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSetting {
    /// RGB color mode.
    Rgb(RgbColor),
    /// Color temperature mode.
    ColorTemp(Kelvin),
}

impl ColorSetting {
    /// Returns the RGB color if this is the RGB mode.
    #[must_use]
    pub const fn rgb(&self) -> Option<RgbColor> {
        match self {
            Self::Rgb(rgb) => Some(*rgb),
            Self::ColorTemp(_) => None,
        }
    }

    /// Returns the color temperature if this is the color temperature mode.
    #[must_use]
    pub const fn color_temp(&self) -> Option<Kelvin> {
        match self {
            Self::Rgb(_) => None,
            Self::ColorTemp(kelvin) => Some(*kelvin),
        }
    }
}

/// One device's fully resolved desired end state.
///
/// Targets are built by the [resolver](crate::target::resolve) and stay
/// unchanged for the whole run.
///
/// # Examples
///
/// ```
/// use lightsync_lib::target::Target;
/// use lightsync_lib::types::{Brightness, Kelvin, LogicalState};
///
/// let target = Target::new("light.desk")
///     .with_brightness(Brightness::new(40).unwrap())
///     .with_color_temp(Kelvin::WARM);
/// assert_eq!(target.logical_state, LogicalState::On);
/// assert_eq!(target.color.and_then(|c| c.color_temp()), Some(Kelvin::WARM));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Device identifier, unique within a run.
    pub id: DeviceId,
    /// Desired on/off state.
    pub logical_state: LogicalState,
    /// Desired brightness.
    pub brightness: Brightness,
    /// Desired color, if any.
    pub color: Option<ColorSetting>,
    /// Desired effect name, if any.
    pub effect: Option<String>,
    /// Device-specific transition; the call-level transition applies when
    /// absent.
    pub transition: Option<Transition>,
}

impl Target {
    /// Creates an "on at full brightness" target for a device.
    #[must_use]
    pub fn new(id: impl Into<DeviceId>) -> Self {
        Self {
            id: id.into(),
            logical_state: LogicalState::On,
            brightness: Brightness::MAX,
            color: None,
            effect: None,
            transition: None,
        }
    }

    /// Sets the desired logical state.
    #[must_use]
    pub fn with_state(mut self, state: LogicalState) -> Self {
        self.logical_state = state;
        self
    }

    /// Sets the desired brightness.
    #[must_use]
    pub fn with_brightness(mut self, brightness: Brightness) -> Self {
        self.brightness = brightness;
        self
    }

    /// Sets an RGB color, replacing any color temperature.
    #[must_use]
    pub fn with_rgb_color(mut self, rgb: RgbColor) -> Self {
        self.color = Some(ColorSetting::Rgb(rgb));
        self
    }

    /// Sets a color temperature, replacing any RGB color.
    #[must_use]
    pub fn with_color_temp(mut self, kelvin: Kelvin) -> Self {
        self.color = Some(ColorSetting::ColorTemp(kelvin));
        self
    }

    /// Sets an effect.
    #[must_use]
    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }

    /// Sets a device-specific transition.
    #[must_use]
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Returns the transition to use given the call-level default.
    #[must_use]
    pub fn effective_transition(&self, call_transition: Option<Transition>) -> Option<Transition> {
        self.transition.or(call_transition)
    }
}

/// Call-level values for every non-identity target field.
///
/// # Examples
///
/// ```
/// use lightsync_lib::target::TargetDefaults;
/// use lightsync_lib::types::{Brightness, RgbColor};
///
/// let defaults = TargetDefaults::new()
///     .with_brightness(Brightness::new(80).unwrap())
///     .with_rgb_color(RgbColor::new(255, 0, 0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetDefaults {
    /// Default on/off state.
    #[serde(rename = "state")]
    pub logical_state: LogicalState,
    /// Default brightness.
    #[serde(rename = "brightness_pct")]
    pub brightness: Brightness,
    /// Default color.
    pub color: Option<ColorSetting>,
    /// Default effect.
    pub effect: Option<String>,
    /// Default per-device transition. Usually left empty in favor of the
    /// call-level transition in the run options.
    pub transition: Option<Transition>,
}

impl TargetDefaults {
    /// Creates defaults: on, full brightness, no color, no effect.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default logical state.
    #[must_use]
    pub fn with_state(mut self, state: LogicalState) -> Self {
        self.logical_state = state;
        self
    }

    /// Sets the default brightness.
    #[must_use]
    pub fn with_brightness(mut self, brightness: Brightness) -> Self {
        self.brightness = brightness;
        self
    }

    /// Sets the default RGB color.
    #[must_use]
    pub fn with_rgb_color(mut self, rgb: RgbColor) -> Self {
        self.color = Some(ColorSetting::Rgb(rgb));
        self
    }

    /// Sets the default color temperature.
    #[must_use]
    pub fn with_color_temp(mut self, kelvin: Kelvin) -> Self {
        self.color = Some(ColorSetting::ColorTemp(kelvin));
        self
    }

    /// Sets the default effect.
    #[must_use]
    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }

    /// Sets the default per-device transition.
    #[must_use]
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = Some(transition);
        self
    }
}

/// Per-device partial target: every field is optional.
///
/// The JSON field names follow the service-call vocabulary of light
/// platforms; `color_temperature_kelvin` is accepted as an alias of
/// `color_temp_kelvin`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetOverride {
    /// Override of the logical state.
    #[serde(rename = "state", skip_serializing_if = "Option::is_none")]
    pub logical_state: Option<LogicalState>,
    /// Override of the brightness.
    #[serde(rename = "brightness_pct", skip_serializing_if = "Option::is_none")]
    pub brightness: Option<Brightness>,
    /// Override of the RGB color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<RgbColor>,
    /// Override of the color temperature.
    #[serde(
        rename = "color_temp_kelvin",
        alias = "color_temperature_kelvin",
        skip_serializing_if = "Option::is_none"
    )]
    pub color_temp: Option<Kelvin>,
    /// Override of the effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    /// Override of the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
}

impl TargetOverride {
    /// Creates an empty override.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the logical state.
    #[must_use]
    pub fn with_state(mut self, state: LogicalState) -> Self {
        self.logical_state = Some(state);
        self
    }

    /// Overrides the brightness.
    #[must_use]
    pub fn with_brightness(mut self, brightness: Brightness) -> Self {
        self.brightness = Some(brightness);
        self
    }

    /// Overrides the RGB color.
    #[must_use]
    pub fn with_rgb_color(mut self, rgb: RgbColor) -> Self {
        self.rgb_color = Some(rgb);
        self
    }

    /// Overrides the color temperature.
    #[must_use]
    pub fn with_color_temp(mut self, kelvin: Kelvin) -> Self {
        self.color_temp = Some(kelvin);
        self
    }

    /// Overrides the effect.
    #[must_use]
    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }

    /// Overrides the transition.
    #[must_use]
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Returns the color mode named by this override, if any.
    ///
    /// RGB wins when both color fields are present.
    #[must_use]
    pub fn color(&self) -> Option<ColorSetting> {
        self.rgb_color
            .map(ColorSetting::Rgb)
            .or(self.color_temp.map(ColorSetting::ColorTemp))
    }
}

/// Builds a target by taking each field from the override when present and
/// from the defaults otherwise.
///
/// Color is merged as a whole: an override naming either color mode
/// replaces the default color mode, so a target never inherits an RGB color
/// and a color temperature from two different sources.
///
/// # Examples
///
/// ```
/// use lightsync_lib::target::{merge, TargetDefaults, TargetOverride};
/// use lightsync_lib::types::{Brightness, DeviceId, Kelvin, RgbColor};
///
/// let defaults = TargetDefaults::new().with_rgb_color(RgbColor::new(255, 0, 0));
/// let over = TargetOverride::new()
///     .with_brightness(Brightness::new(50).unwrap())
///     .with_color_temp(Kelvin::WARM);
///
/// let target = merge(DeviceId::from("light.a"), &defaults, Some(&over));
/// assert_eq!(target.brightness.value(), 50);
/// assert_eq!(target.color.and_then(|c| c.rgb()), None);
/// assert_eq!(target.color.and_then(|c| c.color_temp()), Some(Kelvin::WARM));
/// ```
#[must_use]
pub fn merge(
    id: DeviceId,
    defaults: &TargetDefaults,
    override_: Option<&TargetOverride>,
) -> Target {
    let Some(o) = override_ else {
        return Target {
            id,
            logical_state: defaults.logical_state,
            brightness: defaults.brightness,
            color: defaults.color,
            effect: defaults.effect.clone(),
            transition: defaults.transition,
        };
    };

    Target {
        id,
        logical_state: o.logical_state.unwrap_or(defaults.logical_state),
        brightness: o.brightness.unwrap_or(defaults.brightness),
        color: o.color().or(defaults.color),
        effect: o.effect.clone().or_else(|| defaults.effect.clone()),
        transition: o.transition.or(defaults.transition),
    }
}
