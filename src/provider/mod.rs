// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collaborator interfaces the controller calls out to.
//!
//! The controller never talks to hardware itself. The surrounding
//! application supplies:
//!
//! - [`Directory`]: what an identifier refers to (a controllable light, some
//!   other kind of device, or a group)
//! - [`CommandSender`]: sends batched on/off commands
//! - [`StateReader`]: returns the current [`Snapshot`] of a device
//!
//! [`InMemoryProvider`] implements all three over a simulated fleet and is
//! what the crate's own tests run against.

mod memory;

use std::future::Future;
use std::sync::Arc;

pub use memory::{DeviceBehavior, InMemoryProvider, SentCommand};

use crate::command::{CommandKind, CommandParams};
use crate::error::SendError;
use crate::state::Snapshot;
use crate::types::DeviceId;

/// What an identifier refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A light the controller can drive.
    Controllable,
    /// A device of another kind (switch, sensor, ...), ignored by the
    /// controller.
    Other,
    /// A group, expanded into its members.
    Group(Vec<DeviceId>),
}

/// Resolves identifiers to [`Entry`] values.
pub trait Directory {
    /// Looks up an identifier. Returns `None` for unknown identifiers.
    fn entry(&self, id: &DeviceId) -> Option<Entry>;
}

/// Sends commands to devices.
///
/// Implementations must be safe to call concurrently for disjoint id sets:
/// the dispatcher issues every command of a pass at the same time.
pub trait CommandSender {
    /// Sends one command addressing all `ids` at once.
    ///
    /// # Errors
    ///
    /// Returns `SendError` if the command could not be delivered. The
    /// controller treats the error as applying to every id in the batch.
    fn send(
        &self,
        kind: CommandKind,
        ids: &[DeviceId],
        params: &CommandParams,
    ) -> impl Future<Output = Result<(), SendError>> + Send;
}

/// Reads current device state.
pub trait StateReader {
    /// Returns the current snapshot of a device, or `None` if the device has
    /// no known state.
    fn get(&self, id: &DeviceId) -> impl Future<Output = Option<Snapshot>> + Send;
}

impl<T: Directory + ?Sized> Directory for Arc<T> {
    fn entry(&self, id: &DeviceId) -> Option<Entry> {
        (**self).entry(id)
    }
}

impl<T: CommandSender + Send + Sync> CommandSender for Arc<T> {
    fn send(
        &self,
        kind: CommandKind,
        ids: &[DeviceId],
        params: &CommandParams,
    ) -> impl Future<Output = Result<(), SendError>> + Send {
        (**self).send(kind, ids, params)
    }
}

impl<T: StateReader + Send + Sync> StateReader for Arc<T> {
    fn get(&self, id: &DeviceId) -> impl Future<Output = Option<Snapshot>> + Send {
        (**self).get(id)
    }
}
