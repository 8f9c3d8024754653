// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transition duration for fades between light states.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Fade duration applied by the device when it changes state.
///
/// Serialized as floating point seconds. Unlike a plain `f32`, a
/// `Transition` is hashable, so it can take part in settings grouping.
///
/// # Examples
///
/// ```
/// use lightsync_lib::types::Transition;
///
/// let fade = Transition::from_secs_f32(1.5).unwrap();
/// assert_eq!(fade.as_secs_f32(), 1.5);
/// assert!(!fade.is_instant());
///
/// assert!(Transition::from_secs_f32(-1.0).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "f32", into = "f32")]
pub struct Transition(Duration);

impl Transition {
    /// No fade.
    pub const INSTANT: Self = Self(Duration::ZERO);

    /// Creates a transition from a duration.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// Creates a transition from seconds.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidTransition` for negative, NaN or infinite
    /// values.
    pub fn from_secs_f32(seconds: f32) -> Result<Self, ValueError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(ValueError::InvalidTransition(seconds));
        }
        Duration::try_from_secs_f32(seconds)
            .map(Self)
            .map_err(|_| ValueError::InvalidTransition(seconds))
    }

    /// Returns the transition as a duration.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.0
    }

    /// Returns the transition in seconds.
    #[must_use]
    pub fn as_secs_f32(&self) -> f32 {
        self.0.as_secs_f32()
    }

    /// Returns true if the transition has zero length.
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.as_secs_f32())
    }
}

impl From<Duration> for Transition {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl TryFrom<f32> for Transition {
    type Error = ValueError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::from_secs_f32(value)
    }
}

impl From<Transition> for f32 {
    fn from(value: Transition) -> Self {
        value.as_secs_f32()
    }
}
