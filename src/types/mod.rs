// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for light control.
//!
//! Each type ensures values are within their valid ranges at construction
//! time, so targets, snapshots and command parameters never carry an
//! out-of-range value.
//!
//! # Types
//!
//! - [`DeviceId`] - Opaque device or group identifier
//! - [`LogicalState`] - On/Off
//! - [`Brightness`] - Brightness level (0-100%)
//! - [`RgbColor`] - RGB color (0-255 per channel)
//! - [`Kelvin`] - Color temperature in Kelvin (1000-12000)
//! - [`Transition`] - Fade duration in seconds

mod brightness;
mod device_id;
mod kelvin;
mod rgb_color;
mod state;
mod transition;

pub use brightness::Brightness;
pub use device_id::DeviceId;
pub use kelvin::Kelvin;
pub use rgb_color::RgbColor;
pub use state::LogicalState;
pub use transition::Transition;
