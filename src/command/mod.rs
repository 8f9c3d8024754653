// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Commands sent to lights.
//!
//! A command is a [`CommandKind`] (turn on or turn off) plus the
//! [`CommandParams`] that go with it, addressed to a batch of devices.
//! [`group`] computes the batches.
//!
//! # Examples
//!
//! ```
//! use lightsync_lib::command::{CommandKind, CommandParams};
//! use lightsync_lib::target::Target;
//! use lightsync_lib::types::{Brightness, RgbColor};
//!
//! let target = Target::new("light.a")
//!     .with_brightness(Brightness::new(60).unwrap())
//!     .with_rgb_color(RgbColor::new(255, 0, 0));
//! let params = CommandParams::for_target(&target, None);
//!
//! assert_eq!(CommandKind::from(target.logical_state), CommandKind::TurnOn);
//! assert_eq!(
//!     params.to_json(),
//!     serde_json::json!({"brightness_pct": 60, "rgb_color": [255, 0, 0]})
//! );
//! ```

mod grouping;

use std::fmt;

use serde_json::{Map, Value};

pub use grouping::{SettingsGroup, group};

use crate::target::{ColorSetting, Target};
use crate::types::{Brightness, LogicalState, Transition};

/// Kind of command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Turn on, applying the command parameters.
    TurnOn,
    /// Turn off. Only the transition parameter is meaningful.
    TurnOff,
}

impl CommandKind {
    /// Returns the service name of the command.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogicalState> for CommandKind {
    fn from(state: LogicalState) -> Self {
        match state {
            LogicalState::On => Self::TurnOn,
            LogicalState::Off => Self::TurnOff,
        }
    }
}

/// Parameters carried by a command.
///
/// Two targets with equal parameters (and equal logical state) can be driven
/// by a single batched command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CommandParams {
    /// Brightness to apply. `None` for turn-off commands.
    pub brightness: Option<Brightness>,
    /// Color to apply.
    pub color: Option<ColorSetting>,
    /// Effect to apply.
    pub effect: Option<String>,
    /// Fade duration. Never holds a zero transition.
    pub transition: Option<Transition>,
}

impl CommandParams {
    /// Builds the turn-on parameters for a target.
    ///
    /// The target's own transition takes precedence over `call_transition`;
    /// a zero transition is dropped.
    #[must_use]
    pub fn for_target(target: &Target, call_transition: Option<Transition>) -> Self {
        Self {
            brightness: Some(target.brightness),
            color: target.color,
            effect: target.effect.clone(),
            transition: target
                .effective_transition(call_transition)
                .filter(|t| !t.is_instant()),
        }
    }

    /// Builds turn-off parameters.
    #[must_use]
    pub fn turn_off(transition: Option<Transition>) -> Self {
        Self {
            transition: transition.filter(|t| !t.is_instant()),
            ..Self::default()
        }
    }

    /// Returns the parameters as service-call data.
    ///
    /// Keys: `brightness_pct`, `rgb_color` or `color_temp_kelvin`, `effect`,
    /// `transition` (seconds). Absent parameters are omitted.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut data = Map::new();

        if let Some(brightness) = self.brightness {
            data.insert("brightness_pct".into(), brightness.value().into());
        }
        match self.color {
            Some(ColorSetting::Rgb(rgb)) => {
                data.insert("rgb_color".into(), Value::from(rgb.channels().to_vec()));
            }
            Some(ColorSetting::ColorTemp(kelvin)) => {
                data.insert("color_temp_kelvin".into(), kelvin.value().into());
            }
            None => {}
        }
        if let Some(effect) = &self.effect {
            data.insert("effect".into(), effect.clone().into());
        }
        if let Some(transition) = self.transition {
            data.insert("transition".into(), transition.as_secs_f32().into());
        }

        Value::Object(data)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{Kelvin, RgbColor};

    fn secs(value: f32) -> Transition {
        Transition::from_secs_f32(value).unwrap()
    }

    #[test]
    fn params_brightness_only() {
        let params = CommandParams::for_target(&Target::new("light.a"), None);
        assert_eq!(params.to_json(), json!({"brightness_pct": 100}));
    }

    #[test]
    fn params_with_color_temp_and_effect() {
        let target = Target::new("light.a")
            .with_color_temp(Kelvin::WARM)
            .with_effect("candle");
        let params = CommandParams::for_target(&target, None);
        assert_eq!(
            params.to_json(),
            json!({"brightness_pct": 100, "color_temp_kelvin": 2700, "effect": "candle"})
        );
    }

    #[test]
    fn params_transition_precedence() {
        let target = Target::new("light.a").with_transition(secs(3.0));
        let params = CommandParams::for_target(&target, Some(secs(1.0)));
        assert_eq!(params.transition, Some(secs(3.0)));

        let params = CommandParams::for_target(&Target::new("light.a"), Some(secs(1.0)));
        assert_eq!(params.transition, Some(secs(1.0)));
    }

    #[test]
    fn params_zero_transition_excluded() {
        let params = CommandParams::for_target(&Target::new("light.a"), Some(Transition::INSTANT));
        assert_eq!(params.transition, None);
        assert!(params.to_json().get("transition").is_none());

        assert_eq!(CommandParams::turn_off(Some(Transition::INSTANT)).transition, None);
    }

    #[test]
    fn turn_off_params_carry_only_transition() {
        let params = CommandParams::turn_off(Some(secs(2.0)));
        assert_eq!(params.to_json(), json!({"transition": 2.0}));
    }

    #[test]
    fn rgb_serializes_as_list() {
        let target = Target::new("light.a").with_rgb_color(RgbColor::new(0, 128, 255));
        let data = CommandParams::for_target(&target, None).to_json();
        assert_eq!(data["rgb_color"], json!([0, 128, 255]));
    }

    #[test]
    fn command_kind_from_state() {
        assert_eq!(CommandKind::from(LogicalState::Off), CommandKind::TurnOff);
        assert_eq!(CommandKind::TurnOn.to_string(), "turn_on");
    }
}
