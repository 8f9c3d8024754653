// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Targets: the desired end state of each light.
//!
//! A run starts from a membership list (lights and/or groups), call-level
//! [`TargetDefaults`] and per-device [`Overrides`]. [`resolve`] flattens the
//! membership list through a [`Directory`](crate::provider::Directory) and
//! produces one [`Target`] per controllable light.

mod model;
mod overrides;
mod resolver;

pub use model::{ColorSetting, Target, TargetDefaults, TargetOverride, merge};
pub use overrides::Overrides;
pub use resolver::{Resolution, resolve};
