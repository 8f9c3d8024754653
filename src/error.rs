// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `LightSync` library.
//!
//! Only structural problems are raised as errors: an unusable membership list,
//! invalid option values, or malformed override input. Everything that can go
//! wrong for an individual device during a run (a failed send, a device that
//! never reaches its target) is reported through
//! [`OperationResult`](crate::controller::OperationResult) instead.

use std::time::Duration;

use thiserror::Error;

use crate::types::DeviceId;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The membership list could not be turned into targets.
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while parsing caller input.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Errors raised while expanding a membership list into targets.
///
/// These are fatal for a run: no command is sent when resolution fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The membership list was empty.
    #[error("no entities provided")]
    EmptyMembership,

    /// Expansion produced no controllable device.
    #[error("no controllable devices found ({} skipped)", skipped.len())]
    NoControllableDevices {
        /// Identifiers that were dropped during expansion.
        skipped: Vec<DeviceId>,
    },
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u32,
        /// Maximum allowed value.
        max: u32,
        /// The actual value that was provided.
        actual: u32,
    },

    /// An invalid logical state string was provided.
    #[error("invalid state '{0}', must be 'on' or 'off'")]
    InvalidLogicalState(String),

    /// A hex color string could not be parsed.
    #[error("invalid hex color: {0}")]
    InvalidHexColor(String),

    /// A transition duration was negative or not finite.
    #[error("invalid transition: {0}")]
    InvalidTransition(f32),

    /// A controller option failed validation.
    #[error("invalid option {name}: {reason}")]
    InvalidOption {
        /// The option name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Errors related to parsing caller-supplied input.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the input.
    #[error("missing field: {0}")]
    MissingField(String),
}

/// Failure reported by a [`CommandSender`](crate::provider::CommandSender).
///
/// Send errors are recoverable: the controller records them against every
/// device the command addressed and retries those devices on the next attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Connection to the device or its hub failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The command was rejected.
    #[error("command rejected: {0}")]
    Rejected(String),

    /// The provider did not confirm the command in time.
    #[error("command timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// The addressed device cannot currently receive commands.
    #[error("device unreachable: {0}")]
    Unreachable(DeviceId),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 0,
            max: 100,
            actual: 150,
        };
        assert_eq!(err.to_string(), "value 150 is out of range [0, 100]");
    }

    #[test]
    fn error_from_resolution_error() {
        let err: Error = ResolutionError::EmptyMembership.into();
        assert!(matches!(
            err,
            Error::Resolution(ResolutionError::EmptyMembership)
        ));
    }

    #[test]
    fn no_controllable_devices_display() {
        let err = ResolutionError::NoControllableDevices {
            skipped: vec![DeviceId::from("switch.fan"), DeviceId::from("sensor.door")],
        };
        assert_eq!(err.to_string(), "no controllable devices found (2 skipped)");
    }

    #[test]
    fn send_error_display() {
        let err = SendError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "command timed out after 1500 ms");

        let err = SendError::Unreachable(DeviceId::from("light.porch"));
        assert_eq!(err.to_string(), "device unreachable: light.porch");
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::MissingField("entity_id".to_string());
        assert_eq!(err.to_string(), "missing field: entity_id");
    }
}
