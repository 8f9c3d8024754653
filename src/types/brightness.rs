// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brightness type for dimmable lights.
//!
//! Brightness is always handled as a percentage (0-100). Devices that report
//! the raw 0-255 scale are converted with [`Brightness::from_raw`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Brightness level as a percentage (0-100).
///
/// # Examples
///
/// ```
/// use lightsync_lib::types::Brightness;
///
/// let dim = Brightness::new(75).unwrap();
/// assert_eq!(dim.value(), 75);
///
/// assert_eq!(Brightness::from_raw(128).value(), 50);
/// assert!(Brightness::new(101).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Brightness(u8);

impl Brightness {
    /// Minimum brightness (0%).
    pub const MIN: Self = Self(0);

    /// Maximum brightness (100%).
    pub const MAX: Self = Self(100);

    /// Creates a new brightness value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: u32::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a brightness value, clamping to the valid range.
    #[must_use]
    pub const fn clamped(value: u8) -> Self {
        if value > 100 { Self(100) } else { Self(value) }
    }

    /// Converts a raw 0-255 device brightness to a percentage.
    ///
    /// Rounds to the nearest percent, so 255 is 100% and 128 is 50%.
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        // (raw * 100 + 127) / 255 rounds half up and stays within 0..=100
        let pct = (u16::from(raw) * 100 + 127) / 255;
        Self::clamped(u8::try_from(pct).unwrap_or(100))
    }

    /// Returns the brightness percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns true if `other` lies within `tolerance` percentage points.
    ///
    /// Both bounds are inclusive.
    #[must_use]
    pub fn within(&self, other: Self, tolerance: u8) -> bool {
        self.0.abs_diff(other.0) <= tolerance
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Self::MAX
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for Brightness {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Brightness> for u8 {
    fn from(value: Brightness) -> Self {
        value.0
    }
}
