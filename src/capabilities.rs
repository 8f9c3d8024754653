// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light capabilities.
//!
//! A device that cannot apply a setting cannot be expected to report it
//! back. The verifier consults the capabilities carried by each
//! [`Snapshot`](crate::state::Snapshot) and skips comparisons the device
//! cannot satisfy, so such devices still converge instead of exhausting
//! every retry.

use serde::{Deserialize, Serialize};

/// Capabilities of a light.
///
/// # Examples
///
/// ```
/// use lightsync_lib::Capabilities;
///
/// // Default: a fully featured color light
/// let caps = Capabilities::default();
/// assert!(caps.rgb && caps.color_temp);
///
/// // Tunable white bulb
/// let cct = Capabilities::cct_light();
/// assert!(cct.color_temp);
/// assert!(!cct.rgb);
///
/// let caps = Capabilities::builder().brightness(true).rgb(true).build();
/// assert!(!caps.color_temp);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
// Each boolean represents an independent device feature flag that cannot be
// meaningfully combined into an enum or state machine.
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// Supports brightness control.
    pub brightness: bool,

    /// Supports color temperature control.
    pub color_temp: bool,

    /// Supports RGB (or HS) color control.
    pub rgb: bool,

    /// Supports named effects.
    pub effects: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::rgbcct_light()
    }
}

impl Capabilities {
    /// Creates capabilities for a plain on/off light.
    #[must_use]
    pub const fn on_off() -> Self {
        Self {
            brightness: false,
            color_temp: false,
            rgb: false,
            effects: false,
        }
    }

    /// Creates capabilities for a dimmable white light.
    #[must_use]
    pub const fn dimmable() -> Self {
        Self {
            brightness: true,
            ..Self::on_off()
        }
    }

    /// Creates capabilities for a CCT-only light (warm/cool white).
    #[must_use]
    pub const fn cct_light() -> Self {
        Self {
            brightness: true,
            color_temp: true,
            rgb: false,
            effects: false,
        }
    }

    /// Creates capabilities for an RGB light without white channels.
    #[must_use]
    pub const fn rgb_light() -> Self {
        Self {
            brightness: true,
            color_temp: false,
            rgb: true,
            effects: true,
        }
    }

    /// Creates capabilities for an RGBCCT light.
    #[must_use]
    pub const fn rgbcct_light() -> Self {
        Self {
            brightness: true,
            color_temp: true,
            rgb: true,
            effects: true,
        }
    }

    /// Returns a builder starting from an on/off light.
    #[must_use]
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::default()
    }
}

/// Builder for [`Capabilities`].
#[derive(Debug, Clone)]
pub struct CapabilitiesBuilder {
    inner: Capabilities,
}

impl Default for CapabilitiesBuilder {
    fn default() -> Self {
        Self {
            inner: Capabilities::on_off(),
        }
    }
}

impl CapabilitiesBuilder {
    /// Sets brightness support.
    #[must_use]
    pub fn brightness(mut self, supported: bool) -> Self {
        self.inner.brightness = supported;
        self
    }

    /// Sets color temperature support.
    #[must_use]
    pub fn color_temp(mut self, supported: bool) -> Self {
        self.inner.color_temp = supported;
        self
    }

    /// Sets RGB support.
    #[must_use]
    pub fn rgb(mut self, supported: bool) -> Self {
        self.inner.rgb = supported;
        self
    }

    /// Sets effect support.
    #[must_use]
    pub fn effects(mut self, supported: bool) -> Self {
        self.inner.effects = supported;
        self
    }

    /// Builds the capabilities.
    #[must_use]
    pub fn build(self) -> Capabilities {
        self.inner
    }
}
