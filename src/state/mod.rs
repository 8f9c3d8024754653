// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state snapshots and verification.
//!
//! - [`Snapshot`] - State reported by a device at one point in time
//! - [`evaluate`] - Pure comparison of a snapshot against a target
//! - [`verify`] - Reads snapshots for many targets and classifies each

mod snapshot;
mod verifier;

pub use snapshot::{BrightnessReading, Snapshot};
pub use verifier::{
    Mismatch, Tolerances, VerificationReport, VerificationResult, evaluate, verify,
};
