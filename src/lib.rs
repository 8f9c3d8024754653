// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `LightSync` Lib - Convergent state control for fleets of lights.
//!
//! Given a desired state for a set of lights (on/off, brightness, color,
//! color temperature, effect, transition), this library sends the fewest
//! batched commands that reach it, reads the devices back, and retries the
//! ones that did not get there until everything matches, the attempt budget
//! or the timeout runs out, or the caller cancels.
//!
//! The library does not talk to hardware. The application plugs in a
//! provider implementing [`Directory`](provider::Directory),
//! [`CommandSender`](provider::CommandSender) and
//! [`StateReader`](provider::StateReader);
//! [`InMemoryProvider`](provider::InMemoryProvider) simulates a fleet for
//! tests and demos.
//!
//! # Features
//!
//! - **Group expansion**: nested groups are flattened, cycles are tolerated,
//!   duplicates are removed
//! - **Batching**: one command per distinct set of parameters, one command
//!   for everything that should be off
//! - **Verification**: state read back and compared within tolerances,
//!   unreachable devices reported instead of retried
//! - **Retries**: fixed or exponential backoff, overall timeout,
//!   cooperative cancellation
//! - **Scenes**: capture the current state as overrides and replay it later
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use lightsync_lib::controller::{Controller, EnsureOptions};
//! use lightsync_lib::provider::InMemoryProvider;
//! use lightsync_lib::target::{Overrides, TargetDefaults};
//! use lightsync_lib::types::{Brightness, DeviceId, LogicalState, RgbColor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> lightsync_lib::Result<()> {
//! let fleet = InMemoryProvider::new();
//! fleet.add_light("light.sofa");
//! fleet.add_light("light.tv");
//! fleet.add_light("light.hall");
//! fleet.add_group("group.living_room", ["light.sofa", "light.tv"]);
//!
//! let controller = Controller::new(fleet.clone());
//!
//! // Everything at 40% red, except the hall which turns off
//! let defaults = TargetDefaults::new()
//!     .with_brightness(Brightness::new(40)?)
//!     .with_rgb_color(RgbColor::new(255, 0, 0));
//! let overrides = Overrides::from_json(r#"[{"entity_id": "light.hall", "state": "off"}]"#)?;
//! let options = EnsureOptions::builder()
//!     .settle_delay(Duration::from_millis(10))
//!     .build()?;
//!
//! let members = [DeviceId::from("group.living_room"), DeviceId::from("light.hall")];
//! let result = controller.ensure_state(&members, &overrides, &defaults, &options).await?;
//!
//! assert!(result.success);
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

mod capabilities;
pub mod capture;
pub mod command;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod provider;
pub mod state;
pub mod target;
pub mod types;

pub use capabilities::{Capabilities, CapabilitiesBuilder};
pub use capture::capture_overrides;
pub use controller::{
    CancelHandle, CancelToken, Controller, EnsureOptions, OperationResult, Outcome, RetryStrategy,
};
pub use error::{Error, ParseError, ResolutionError, Result, SendError, ValueError};
pub use provider::{CommandSender, Directory, Entry, InMemoryProvider, StateReader};
pub use state::{Snapshot, Tolerances, VerificationResult};
pub use target::{Overrides, Target, TargetDefaults, TargetOverride};
pub use types::{Brightness, DeviceId, Kelvin, LogicalState, RgbColor, Transition};
