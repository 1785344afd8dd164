// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Headless demo of the clustered lighting lane.
//!
//! ```text
//! RUST_LOG=info cargo run -p sandbox [-- path/to/cluster_config.json]
//! ```

use anyhow::{Context, Result};
use strata_core::math::{degrees_to_radians, LinearRgba, Mat4, Vec3};
use strata_core::renderer::light::{DirectionalLight, PointLight, SpotLight};
use strata_core::renderer::{Camera, ClusterConfig, GraphicsDevice, PerspectiveProjection};
use strata_infra::WgpuDevice;
use strata_lanes::ClusteredLightingLane;

const FRAMES: u32 = 8;

fn load_config() -> Result<ClusterConfig> {
    match std::env::args().nth(1) {
        Some(path) => ClusterConfig::from_file(&path)
            .with_context(|| format!("failed to load cluster configuration from {path}")),
        None => Ok(ClusterConfig::with_decals()),
    }
}

fn populate(lane: &ClusteredLightingLane) {
    let mut lights = lane.lights();
    lights.add_directional(DirectionalLight::default());
    for i in 0..24 {
        let angle = i as f32 / 24.0 * std::f32::consts::TAU;
        lights.add_point(
            Vec3::new(angle.cos() * 12.0, 1.0, -20.0 + angle.sin() * 12.0),
            PointLight {
                color: LinearRgba::rgb(1.0, 0.6, 0.3),
                intensity: 2.0,
                radius: 6.0,
            },
        );
    }
    lights.add_spot(
        Vec3::new(0.0, 8.0, -10.0),
        SpotLight {
            direction: Vec3::new(0.0, -1.0, 0.0),
            ..Default::default()
        },
    );
    lights.set_ambient(LinearRgba::rgb(0.02, 0.02, 0.03));
    lights.set_fog(LinearRgba::rgb(0.5, 0.55, 0.6), 150.0, 0.01);
    drop(lights);

    if let Some(mut decals) = lane.decals() {
        for i in 0..4 {
            let transform = Mat4::from_translation(Vec3::new(i as f32 * 3.0 - 4.5, 0.0, -15.0))
                * Mat4::from_scale(Vec3::new(2.0, 0.5, 2.0));
            decals.add(transform, LinearRgba::WHITE, i);
        }
    }
}

fn run_frames(
    lane: &ClusteredLightingLane,
    device: &WgpuDevice,
    camera: &mut Camera,
    frames: u32,
) -> Result<()> {
    for frame in 0..frames {
        let angle = frame as f32 * 0.1;
        camera.look_at(
            Vec3::new(angle.sin() * 5.0, 2.0, angle.cos() * 5.0),
            Vec3::new(0.0, 0.0, -20.0),
            Vec3::Y,
        );
        let mut encoder = device.create_command_encoder(Some("Sandbox Frame"));
        lane.pre_render(device, encoder.as_mut(), camera)?;
        device.submit_command_buffer(encoder.finish());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let device = WgpuDevice::headless().context("failed to create a headless wgpu device")?;
    let info = device.get_adapter_info();
    log::info!(
        "Running on \"{}\" ({}, {:?})",
        info.name,
        info.backend_type,
        info.device_type
    );

    let (width, height) = (1920, 1080);
    let lane = ClusteredLightingLane::new(config);
    populate(&lane);
    lane.initialize(&device, width, height)?;

    let mut camera = Camera::new(PerspectiveProjection {
        fov_y_radians: degrees_to_radians(70.0),
        ..Default::default()
    });
    camera.set_viewport(width, height);
    run_frames(&lane, &device, &mut camera, FRAMES)?;

    // A resize forces one rebuild, then the cache holds again.
    lane.resize(&device, 1280, 720)?;
    camera.set_viewport(1280, 720);
    run_frames(&lane, &device, &mut camera, FRAMES)?;

    let stats = lane.stats();
    log::info!(
        "Grid {:?}: {} builds, {} culls, {} reallocations, {} lights, {} decals",
        lane.grid(),
        stats.build_dispatches,
        stats.cull_dispatches,
        stats.buffer_reallocations,
        stats.lights_submitted,
        stats.decals_submitted,
    );
    log::info!(
        "VRAM: {} KiB in use, {} KiB peak",
        device.vram_usage_bytes() / 1024,
        device.vram_peak_bytes() / 1024
    );

    lane.shutdown(&device);
    device.poll_device_blocking();
    Ok(())
}
