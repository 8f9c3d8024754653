// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logical on/off state of a light.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Desired or reported logical state of a light.
///
/// # Examples
///
/// ```
/// use lightsync_lib::types::LogicalState;
///
/// let state: LogicalState = " ON ".parse().unwrap();
/// assert_eq!(state, LogicalState::On);
/// assert_eq!(LogicalState::Off.as_str(), "off");
/// assert!("toggle".parse::<LogicalState>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalState {
    /// The light is on.
    #[default]
    On,
    /// The light is off.
    Off,
}

impl LogicalState {
    /// Returns the lowercase string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// Returns true for [`LogicalState::On`].
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for LogicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ => Err(ValueError::InvalidLogicalState(s.to_string())),
        }
    }
}

impl From<bool> for LogicalState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}
