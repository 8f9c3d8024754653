// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color temperature in Kelvin.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Color temperature in Kelvin (1000-12000).
///
/// Lower values are warmer (more orange), higher values are cooler (bluer).
///
/// - 2000K - Candlelight
/// - 2700K - Warm white
/// - 4000K - Neutral white
/// - 6500K - Cool daylight
///
/// # Examples
///
/// ```
/// use lightsync_lib::types::Kelvin;
///
/// let ct = Kelvin::new(2700).unwrap();
/// assert_eq!(ct.value(), 2700);
/// assert_eq!(ct.to_mireds(), 370);
///
/// assert!(Kelvin::new(500).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u16", into = "u16")]
pub struct Kelvin(u16);

impl Kelvin {
    /// Lowest accepted color temperature.
    pub const MIN: u16 = 1000;

    /// Highest accepted color temperature.
    pub const MAX: u16 = 12000;

    /// Warm white (2700K).
    pub const WARM: Self = Self(2700);

    /// Neutral white (4000K).
    pub const NEUTRAL: Self = Self(4000);

    /// Cool daylight (6500K).
    pub const COOL: Self = Self(6500);

    /// Creates a new color temperature.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value is outside [1000, 12000].
    pub fn new(value: u16) -> Result<Self, ValueError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValueError::OutOfRange {
                min: u32::from(Self::MIN),
                max: u32::from(Self::MAX),
                actual: u32::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Returns the color temperature in Kelvin.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }

    /// Returns the approximate color temperature in mireds.
    #[must_use]
    pub fn to_mireds(&self) -> u16 {
        // Kelvin >= 1000, so the quotient is at most 1000
        u16::try_from(1_000_000 / u32::from(self.0)).unwrap_or(u16::MAX)
    }

    /// Creates a color temperature from a mired value.
    ///
    /// # Errors
    ///
    /// Returns error if the resulting Kelvin value is outside the valid range.
    pub fn from_mireds(mireds: u16) -> Result<Self, ValueError> {
        if mireds == 0 {
            return Err(ValueError::OutOfRange {
                min: u32::from(Self::MIN),
                max: u32::from(Self::MAX),
                actual: 0,
            });
        }
        let kelvin = 1_000_000 / u32::from(mireds);
        let kelvin = u16::try_from(kelvin).map_err(|_| ValueError::OutOfRange {
            min: u32::from(Self::MIN),
            max: u32::from(Self::MAX),
            actual: kelvin,
        })?;
        Self::new(kelvin)
    }

    /// Returns true if `other` lies within `tolerance` Kelvin.
    #[must_use]
    pub fn within(&self, other: Self, tolerance: u16) -> bool {
        self.0.abs_diff(other.0) <= tolerance
    }
}

impl fmt::Display for Kelvin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}K", self.0)
    }
}

impl TryFrom<u16> for Kelvin {
    type Error = ValueError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Kelvin> for u16 {
    fn from(value: Kelvin) -> Self {
        value.0
    }
}
