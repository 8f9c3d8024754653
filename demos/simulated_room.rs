// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Demo: drive a simulated living room to an evening scene.
//!
//! The room has a flaky lamp that drops its first command and a ceiling
//! light that is offline, so the run shows batching, a retry and an
//! unavailable device in one go.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --example simulated_room
//! ```

use std::time::Duration;

use lightsync_lib::controller::{Controller, EnsureOptions, RetryStrategy};
use lightsync_lib::provider::{DeviceBehavior, InMemoryProvider};
use lightsync_lib::target::{Overrides, TargetDefaults};
use lightsync_lib::types::{Brightness, DeviceId, Kelvin, Transition};
use lightsync_lib::{Capabilities, capture_overrides};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let room = InMemoryProvider::new().with_latency(Duration::from_millis(50));
    room.add_light("light.sofa");
    room.add_light("light.reading");
    room.add_light_with("light.ceiling", Capabilities::cct_light());
    room.add_light_with("light.plug", Capabilities::on_off());
    room.add_other("switch.tv");
    room.add_group(
        "group.living_room",
        ["light.sofa", "light.reading", "light.ceiling", "light.plug", "switch.tv"],
    );

    room.set_behavior("light.reading", DeviceBehavior::new().with_ignored_commands(1));
    room.set_behavior("light.ceiling", DeviceBehavior::new().unreachable());

    let controller = Controller::new(room.clone());
    let members = [DeviceId::from("group.living_room")];

    let defaults = TargetDefaults::new()
        .with_brightness(Brightness::new(40)?)
        .with_color_temp(Kelvin::WARM);
    let overrides = Overrides::from_json(
        r#"[
            {"entity_id": "light.reading", "brightness_pct": 80, "color_temp_kelvin": 4000},
            {"entity_id": "light.plug", "state": "off"}
        ]"#,
    )?;
    let options = EnsureOptions::builder()
        .transition(Transition::from_secs_f32(1.0)?)
        .settle_delay(Duration::from_millis(300))
        .retry_strategy(RetryStrategy::exponential().with_base(Duration::from_millis(200)))
        .build()?;

    println!("Applying evening scene...");
    let result = controller
        .ensure_state(&members, &overrides, &defaults, &options)
        .await?;
    println!("{result}");
    println!("{}", serde_json::to_string_pretty(&result)?);

    println!("\nCommands sent:");
    for command in room.commands() {
        println!(
            "  {} {:?} {} (delivered: {})",
            command.kind,
            command.ids.iter().map(DeviceId::as_str).collect::<Vec<_>>(),
            command.params.to_json(),
            command.delivered
        );
    }

    println!("\nCapturing the scene and applying it again...");
    room.clear_commands();
    let ids = [
        DeviceId::from("light.sofa"),
        DeviceId::from("light.reading"),
        DeviceId::from("light.plug"),
    ];
    let scene = capture_overrides(&room, &ids).await;
    println!("{}", scene.to_json()?);

    let replay = controller
        .ensure_state(&ids, &scene, &TargetDefaults::new(), &options)
        .await?;
    println!("{replay}");
    println!("Commands sent on replay: {}", room.command_count());

    Ok(())
}
