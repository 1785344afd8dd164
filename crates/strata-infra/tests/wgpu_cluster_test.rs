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

//! Runs the clustered lane on a real wgpu device and reads the results back.
//!
//! Skipped when the machine has no adapter.

use strata_core::math::{LinearRgba, Vec3};
use strata_core::renderer::light::{DirectionalLight, PointLight};
use strata_core::renderer::{Camera, ClusterAabb, ClusterConfig, GraphicsDevice};
use strata_infra::WgpuDevice;
use strata_lanes::ClusteredLightingLane;

fn device() -> Option<WgpuDevice> {
    let _ = env_logger::builder().is_test(true).try_init();
    match WgpuDevice::headless() {
        Ok(device) => Some(device),
        Err(e) => {
            eprintln!("skipping: {e}");
            None
        }
    }
}

fn run_frame(lane: &ClusteredLightingLane, device: &WgpuDevice, camera: &Camera) {
    let mut encoder = device.create_command_encoder(Some("Test Frame"));
    lane.pre_render(device, encoder.as_mut(), camera).unwrap();
    device.submit_command_buffer(encoder.finish());
}

#[test]
fn directional_light_reaches_every_cluster() {
    let Some(device) = device() else { return };
    if !device.supports_feature("compute_shaders") {
        return;
    }

    let config = ClusterConfig::default();
    let lane = ClusteredLightingLane::new(config);
    {
        let mut lights = lane.lights();
        lights.add_directional(DirectionalLight::default());
        // Behind the camera, touches nothing.
        lights.add_point(
            Vec3::new(0.0, 0.0, 50.0),
            PointLight {
                color: LinearRgba::WHITE,
                intensity: 1.0,
                radius: 2.0,
            },
        );
    }
    lane.initialize(&device, 256, 128).unwrap();
    run_frame(&lane, &device, &Camera::default());

    let grid = lane.grid();
    let buckets = config.buckets_per_cluster() as usize;
    let data = device
        .read_buffer_blocking(lane.data_grid_buffer(true).unwrap().buffer)
        .unwrap();
    let words: &[u32] = bytemuck::cast_slice(&data);
    assert_eq!(words.len(), grid.total_clusters() as usize * buckets);
    for cluster in words.chunks(buckets) {
        assert_eq!(cluster[0], 0b01);
        assert!(cluster[1..].iter().all(|&b| b == 0));
    }

    let aabbs = device
        .read_buffer_blocking(lane.clusters_buffer(true).unwrap().buffer)
        .unwrap();
    let aabbs: &[ClusterAabb] = bytemuck::cast_slice(&aabbs);
    assert!(aabbs
        .iter()
        .all(|a| (0..3).all(|i| a.min_bounds[i] <= a.max_bounds[i])));

    lane.shutdown(&device);
    device.poll_device_blocking();
    assert_eq!(device.vram_usage_bytes(), 0);
    assert!(device.vram_peak_bytes() > 0);
}

#[test]
fn resize_recompiles_on_the_device() {
    let Some(device) = device() else { return };
    if !device.supports_feature("compute_shaders") {
        return;
    }

    let lane = ClusteredLightingLane::with_decals();
    lane.initialize(&device, 640, 360).unwrap();
    let camera = Camera::default();
    run_frame(&lane, &device, &camera);

    lane.resize(&device, 1280, 720).unwrap();
    run_frame(&lane, &device, &camera);
    assert_eq!(lane.stats().build_dispatches, 2);
    assert_eq!(lane.stats().cull_dispatches, 2);

    lane.shutdown(&device);
}
