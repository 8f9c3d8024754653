// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for membership resolution and batching.

use lightsync_lib::command::group;
use lightsync_lib::controller::{Controller, EnsureOptions};
use lightsync_lib::provider::InMemoryProvider;
use lightsync_lib::target::{Overrides, TargetDefaults, resolve};
use lightsync_lib::types::{Brightness, DeviceId, Kelvin};
use lightsync_lib::{Error, ResolutionError};

fn members(ids: &[&str]) -> Vec<DeviceId> {
    ids.iter().map(|id| DeviceId::from(*id)).collect()
}

fn house() -> InMemoryProvider {
    let fleet = InMemoryProvider::new();
    for id in ["light.kitchen", "light.sofa", "light.tv", "light.bed"] {
        fleet.add_light(id);
    }
    fleet.add_other("switch.kettle");
    fleet.add_group("group.living", ["light.sofa", "light.tv"]);
    fleet.add_group("group.downstairs", ["light.kitchen", "group.living", "switch.kettle"]);
    fleet.add_group("group.house", ["group.downstairs", "light.bed", "group.house"]);
    fleet
}

// ============================================================================
// Resolver
// ============================================================================

mod resolver {
    use super::*;

    #[test]
    fn scenario_two_devices_two_groups() {
        let fleet = InMemoryProvider::new();
        fleet.add_light("dev1");
        fleet.add_light("dev2");

        let defaults = TargetDefaults::new().with_brightness(Brightness::MAX);
        let overrides =
            Overrides::from_json(r#"[{"entity_id": "dev2", "brightness_pct": 50}]"#).unwrap();

        let resolution = resolve(&members(&["dev1", "dev2"]), &overrides, &defaults, &fleet).unwrap();

        assert_eq!(resolution.targets.len(), 2);
        assert_eq!(resolution.targets[0].id.as_str(), "dev1");
        assert_eq!(resolution.targets[0].brightness.value(), 100);
        assert_eq!(resolution.targets[1].id.as_str(), "dev2");
        assert_eq!(resolution.targets[1].brightness.value(), 50);

        assert_eq!(group(&resolution.targets, None).len(), 2);
    }

    #[test]
    fn nested_and_cyclic_groups_flatten_once() {
        let fleet = house();
        let resolution = resolve(
            &members(&["group.house", "light.tv"]),
            &Overrides::new(),
            &TargetDefaults::new(),
            &fleet,
        )
        .unwrap();

        let ids: Vec<&str> = resolution.targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["light.kitchen", "light.sofa", "light.tv", "light.bed"]);
        assert_eq!(resolution.skipped, members(&["switch.kettle"]));
    }

    #[test]
    fn color_temperature_alias_in_overrides() {
        let fleet = house();
        let overrides = Overrides::from_json(
            r#"[{"entity_id": "light.bed", "color_temperature_kelvin": 2700}]"#,
        )
        .unwrap();

        let resolution = resolve(
            &members(&["light.bed"]),
            &overrides,
            &TargetDefaults::new(),
            &fleet,
        )
        .unwrap();
        assert_eq!(
            resolution.targets[0].color.and_then(|c| c.color_temp()),
            Some(Kelvin::WARM)
        );
    }
}

// ============================================================================
// Controller errors
// ============================================================================

mod controller {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn empty_membership_is_an_error() {
        let controller = Controller::new(house());
        let err = controller
            .ensure_state(&[], &Overrides::new(), &TargetDefaults::new(), &EnsureOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Resolution(ResolutionError::EmptyMembership)
        ));
        assert_eq!(controller.provider().command_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn only_uncontrollable_members_is_an_error() {
        let controller = Controller::new(house());
        let err = controller
            .ensure_state(
                &members(&["switch.kettle", "light.unknown"]),
                &Overrides::new(),
                &TargetDefaults::new(),
                &EnsureOptions::default(),
            )
            .await
            .unwrap_err();

        match err {
            Error::Resolution(ResolutionError::NoControllableDevices { skipped }) => {
                assert_eq!(skipped, members(&["switch.kettle", "light.unknown"]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn skipped_members_are_reported() {
        let controller = Controller::new(house());
        let result = controller
            .ensure_state(
                &members(&["group.downstairs"]),
                &Overrides::new(),
                &TargetDefaults::new(),
                &EnsureOptions::default(),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.target_count(), 3);
        assert_eq!(result.skipped_ids, members(&["switch.kettle"]));
    }
}
