// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device override map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::types::DeviceId;

use super::TargetOverride;

/// Per-device overrides keyed by device id.
///
/// Built from a sequence of `(id, override)` pairs; when an id appears more
/// than once the last entry wins.
///
/// # Examples
///
/// ```
/// use lightsync_lib::target::{Overrides, TargetOverride};
/// use lightsync_lib::types::Brightness;
///
/// let overrides: Overrides = [
///     ("light.a", TargetOverride::new().with_brightness(Brightness::new(10).unwrap())),
///     ("light.a", TargetOverride::new().with_brightness(Brightness::new(20).unwrap())),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(overrides.len(), 1);
/// assert_eq!(overrides.get("light.a").unwrap().brightness.unwrap().value(), 20);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    entries: HashMap<DeviceId, TargetOverride>,
}

#[derive(Serialize, Deserialize)]
struct OverrideEntry {
    entity_id: Option<DeviceId>,
    #[serde(flatten)]
    fields: TargetOverride,
}

impl Overrides {
    /// Creates an empty override map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an override, replacing any previous override for the id.
    pub fn insert(&mut self, id: impl Into<DeviceId>, override_: TargetOverride) {
        self.entries.insert(id.into(), override_);
    }

    /// Returns the override for a device.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TargetOverride> {
        self.entries.get(id)
    }

    /// Returns the number of devices with an override.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no overrides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(id, override)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &TargetOverride)> {
        self.entries.iter()
    }

    /// Parses a JSON list of per-device targets.
    ///
    /// Each element is an object carrying an `entity_id` plus any
    /// [`TargetOverride`] fields:
    ///
    /// ```
    /// use lightsync_lib::target::Overrides;
    ///
    /// let overrides = Overrides::from_json(r#"[
    ///     {"entity_id": "light.a", "brightness_pct": 50},
    ///     {"entity_id": "light.b", "state": "off"}
    /// ]"#).unwrap();
    /// assert_eq!(overrides.len(), 2);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` for malformed JSON or invalid field values,
    /// and `ParseError::MissingField` when an element has no `entity_id`.
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        let entries: Vec<OverrideEntry> = serde_json::from_str(json)?;

        let mut overrides = Self::new();
        for entry in entries {
            let id = entry
                .entity_id
                .ok_or_else(|| ParseError::MissingField("entity_id".to_string()))?;
            overrides.insert(id, entry.fields);
        }
        Ok(overrides)
    }

    /// Serializes the overrides as a JSON list accepted by
    /// [`from_json`](Self::from_json), sorted by id.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, ParseError> {
        let mut entries: Vec<OverrideEntry> = self
            .entries
            .iter()
            .map(|(id, fields)| OverrideEntry {
                entity_id: Some(id.clone()),
                fields: fields.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));

        Ok(serde_json::to_string_pretty(&entries)?)
    }
}

impl<K: Into<DeviceId>> FromIterator<(K, TargetOverride)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (K, TargetOverride)>>(iter: I) -> Self {
        let mut overrides = Self::new();
        for (id, override_) in iter {
            overrides.insert(id, override_);
        }
        overrides
    }
}
