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

//! Integration tests for the clustered lighting lane against a recording device.

use std::collections::HashMap;
use std::mem::size_of;
use std::sync::{Arc, Mutex};

use strata_core::lane::{ClusterBufferViews, Lane, LaneContext, LaneError, Ref, RenderTargetSize, Slot};
use strata_core::math::{LinearRgba, Mat4, Vec3};
use strata_core::renderer::api::*;
use strata_core::renderer::light::{GpuClusterLight, PointLight};
use strata_core::renderer::{
    Camera, PerspectiveProjection, ClusterAabb, ClusterConfig, ClusterConfigError, ClusterGrid, CommandEncoder,
    ComputePass, GraphicsDevice, ResourceError,
};
use strata_lanes::{ClusterError, ClusteredLightingLane};

// --- Recording device ---

#[derive(Debug, Default)]
struct Recorder {
    next_id: usize,
    /// Live buffers by id: label and size.
    buffers: HashMap<usize, (String, u64)>,
    /// Every buffer ever created, in order.
    created_buffers: Vec<(String, u64)>,
    /// Labels of destroyed buffers, in order.
    destroyed_buffers: Vec<String>,
    shader_sources: HashMap<usize, String>,
    /// Pipeline id to label and compiled source.
    pipelines: HashMap<u64, (String, String)>,
    layout_entries: Vec<usize>,
    bind_groups_created: usize,
    live_bind_groups: usize,
    live_pipelines: usize,
    live_layouts: usize,
    live_shaders: usize,
    /// Pipeline label and workgroup counts of every dispatch.
    dispatches: Vec<(String, [u32; 3])>,
    pass_labels: Vec<String>,
    /// Buffers with this label fail to allocate.
    failing_buffer: Option<String>,
}

impl Recorder {
    fn id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    fn dispatch_count(&self, pipeline: &str) -> usize {
        self.dispatches.iter().filter(|(l, _)| l == pipeline).count()
    }

    fn created(&self, label: &str) -> Vec<u64> {
        self.created_buffers
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, s)| *s)
            .collect()
    }

    fn live(&self, label: &str) -> Option<u64> {
        self.buffers
            .values()
            .find(|(l, _)| l == label)
            .map(|(_, s)| *s)
    }

    fn source_of(&self, pipeline: &str) -> Option<String> {
        self.pipelines
            .values()
            .find(|(l, _)| l == pipeline)
            .map(|(_, s)| s.clone())
    }
}

#[derive(Debug, Clone, Default)]
struct MockGraphicsDevice {
    state: Arc<Mutex<Recorder>>,
    info: GraphicsAdapterInfo,
}

impl MockGraphicsDevice {
    fn with_limits(invocations: u32, storage: u64) -> Self {
        Self {
            info: GraphicsAdapterInfo {
                name: "Mock Adapter".to_string(),
                max_compute_invocations_per_workgroup: invocations,
                max_storage_buffer_binding_size: storage,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn rec(&self) -> std::sync::MutexGuard<'_, Recorder> {
        self.state.lock().unwrap()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let mut rec = self.rec();
        let id = rec.id();
        let ShaderSourceData::Wgsl(source) = &descriptor.source;
        rec.shader_sources.insert(id, source.to_string());
        rec.live_shaders += 1;
        Ok(ShaderModuleId(id))
    }

    fn destroy_shader_module(&self, _id: ShaderModuleId) -> Result<(), ResourceError> {
        self.rec().live_shaders -= 1;
        Ok(())
    }

    fn create_pipeline_layout(
        &self,
        _descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        let mut rec = self.rec();
        rec.live_layouts += 1;
        Ok(PipelineLayoutId(rec.id()))
    }

    fn destroy_pipeline_layout(&self, _id: PipelineLayoutId) -> Result<(), ResourceError> {
        self.rec().live_layouts -= 1;
        Ok(())
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        let mut rec = self.rec();
        let id = rec.id() as u64;
        let label = descriptor.label.as_deref().unwrap_or_default().to_string();
        let source = rec
            .shader_sources
            .get(&descriptor.shader_module.0)
            .cloned()
            .ok_or(ResourceError::NotFound)?;
        rec.pipelines.insert(id, (label, source));
        rec.live_pipelines += 1;
        Ok(ComputePipelineId(id))
    }

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError> {
        let mut rec = self.rec();
        rec.pipelines.remove(&id.0).ok_or(ResourceError::NotFound)?;
        rec.live_pipelines -= 1;
        Ok(())
    }

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let mut rec = self.rec();
        rec.layout_entries.push(descriptor.entries.len());
        rec.live_layouts += 1;
        Ok(BindGroupLayoutId(rec.id()))
    }

    fn create_bind_group(
        &self,
        _descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let mut rec = self.rec();
        rec.bind_groups_created += 1;
        rec.live_bind_groups += 1;
        Ok(BindGroupId(rec.id()))
    }

    fn destroy_bind_group_layout(&self, _id: BindGroupLayoutId) -> Result<(), ResourceError> {
        self.rec().live_layouts -= 1;
        Ok(())
    }

    fn destroy_bind_group(&self, _id: BindGroupId) -> Result<(), ResourceError> {
        self.rec().live_bind_groups -= 1;
        Ok(())
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let mut rec = self.rec();
        let label = descriptor.label.as_deref().unwrap_or_default().to_string();
        if rec.failing_buffer.as_deref() == Some(label.as_str()) {
            return Err(ResourceError::BackendError(format!("out of memory for {label}")));
        }
        let id = rec.id();
        rec.created_buffers.push((label.clone(), descriptor.size));
        rec.buffers.insert(id, (label, descriptor.size));
        Ok(BufferId(id))
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        _data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        self.create_buffer(descriptor)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut rec = self.rec();
        let (label, _) = rec.buffers.remove(&id.0).ok_or(ResourceError::NotFound)?;
        rec.destroyed_buffers.push(label);
        Ok(())
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let rec = self.rec();
        let (_, size) = rec.buffers.get(&id.0).ok_or(ResourceError::NotFound)?;
        if offset + data.len() as u64 > *size {
            return Err(ResourceError::OutOfBounds {
                buffer: id,
                offset,
                len: data.len() as u64,
                size: *size,
            });
        }
        Ok(())
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(MockCommandEncoder {
            state: self.state.clone(),
        })
    }

    fn submit_command_buffer(&self, _command_buffer: CommandBufferId) {}

    fn get_adapter_info(&self) -> GraphicsAdapterInfo {
        self.info.clone()
    }

    fn supports_feature(&self, _feature_name: &str) -> bool {
        false
    }
}

struct MockCommandEncoder {
    state: Arc<Mutex<Recorder>>,
}

impl CommandEncoder for MockCommandEncoder {
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'encoder>,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder> {
        self.state
            .lock()
            .unwrap()
            .pass_labels
            .push(descriptor.label.unwrap_or_default().to_string());
        Box::new(MockComputePass {
            state: self.state.clone(),
            pipeline: None,
        })
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        CommandBufferId(0)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

struct MockComputePass {
    state: Arc<Mutex<Recorder>>,
    pipeline: Option<ComputePipelineId>,
}

impl<'pass> ComputePass<'pass> for MockComputePass {
    fn set_pipeline(&mut self, pipeline: &ComputePipelineId) {
        self.pipeline = Some(*pipeline);
    }

    fn set_bind_group(&mut self, _index: u32, _bind_group: &BindGroupId, _offsets: &[u32]) {}

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        let mut rec = self.state.lock().unwrap();
        let label = self
            .pipeline
            .and_then(|p| rec.pipelines.get(&p.0).map(|(l, _)| l.clone()))
            .unwrap_or_default();
        rec.dispatches.push((label, [x, y, z]));
    }
}

// --- Helpers ---

const BUILD: &str = "Cluster Build Pipeline";
const CULL: &str = "Cluster Cull Pipeline";

fn sixteen_slices() -> ClusterConfig {
    ClusterConfig::default().with_slices_z(16)
}

fn frame(lane: &ClusteredLightingLane, device: &MockGraphicsDevice, camera: &Camera) -> Result<(), ClusterError> {
    let mut encoder = device.create_command_encoder(Some("Frame"));
    lane.pre_render(device, encoder.as_mut(), camera)
}

// --- Tests ---

#[test]
fn initialize_sizes_buffers_from_the_grid() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(sixteen_slices());
    lane.initialize(&device, 1920, 1080).unwrap();

    let grid = lane.grid();
    assert_eq!((grid.tiles_x, grid.tiles_y, grid.slices_z), (30, 17, 16));
    assert_eq!(grid.total_clusters(), 8160);

    let rec = device.rec();
    assert_eq!(
        rec.live("Cluster AABBs"),
        Some(8160 * size_of::<ClusterAabb>() as u64)
    );
    // 4 bytes per bucket, 256 / 16 buckets per cluster.
    assert_eq!(rec.live("Cluster Data Grid"), Some(8160 * 16 * 4));
    assert_eq!(rec.layout_entries, vec![2, 5]);
    assert!(lane.is_initialized());
}

#[test]
fn invalid_config_fails_before_any_allocation() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(ClusterConfig::default().with_slices_z(30));

    let err = lane.initialize(&device, 1920, 1080).unwrap_err();
    assert!(matches!(
        err,
        ClusterError::Config(ClusterConfigError::SlicesNotDivisible {
            slices_z: 30,
            threads_z: 4
        })
    ));
    assert!(device.rec().created_buffers.is_empty());
    assert!(!lane.is_initialized());
}

#[test]
fn zero_sized_target_is_rejected() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::default();
    assert!(matches!(
        lane.initialize(&device, 0, 720),
        Err(ClusterError::InvalidTargetSize { width: 0, height: 720 })
    ));
    assert!(device.rec().created_buffers.is_empty());
}

#[test]
fn adapter_limits_are_checked() {
    let device = MockGraphicsDevice::with_limits(32, 0);
    let lane = ClusteredLightingLane::default();
    assert!(matches!(
        lane.initialize(&device, 1280, 720),
        Err(ClusterError::WorkgroupTooLarge { invocations: 64, .. })
    ));

    let device = MockGraphicsDevice::with_limits(256, 1024);
    assert!(matches!(
        lane.initialize(&device, 1280, 720),
        Err(ClusterError::BufferTooLarge { .. })
    ));
    assert!(device.rec().created_buffers.is_empty());
}

#[test]
fn build_runs_once_per_projection() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(sixteen_slices());
    lane.initialize(&device, 1920, 1080).unwrap();
    let mut camera = Camera::default();

    for _ in 0..5 {
        frame(&lane, &device, &camera).unwrap();
    }
    assert_eq!(device.rec().dispatch_count(BUILD), 1);
    assert_eq!(device.rec().dispatch_count(CULL), 5);

    // View changes keep the AABBs.
    camera.look_at(Vec3::new(0.0, 3.0, 8.0), Vec3::ZERO, Vec3::Y);
    frame(&lane, &device, &camera).unwrap();
    assert_eq!(device.rec().dispatch_count(BUILD), 1);

    camera.set_fov_y(1.2);
    frame(&lane, &device, &camera).unwrap();
    assert_eq!(device.rec().dispatch_count(BUILD), 2);
    assert_eq!(device.rec().dispatch_count(CULL), 7);

    let stats = lane.stats();
    assert_eq!((stats.build_dispatches, stats.cull_dispatches), (2, 7));
}

#[test]
fn swapping_cameras_rebuilds_the_clusters() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(sixteen_slices());
    lane.initialize(&device, 1920, 1080).unwrap();

    frame(&lane, &device, &Camera::default()).unwrap();
    let narrow = Camera::new(PerspectiveProjection {
        fov_y_radians: 1.5,
        z_far: 50.0,
        ..Default::default()
    });
    frame(&lane, &device, &narrow).unwrap();
    assert_eq!(device.rec().dispatch_count(BUILD), 2);

    // Clones of one camera that changed separately.
    let base = Camera::default();
    let mut left = base.clone();
    let mut right = base;
    left.set_fov_y(0.9);
    right.set_fov_y(1.1);
    frame(&lane, &device, &left).unwrap();
    frame(&lane, &device, &right).unwrap();
    frame(&lane, &device, &right).unwrap();
    assert_eq!(device.rec().dispatch_count(BUILD), 4);
    assert_eq!(device.rec().dispatch_count(CULL), 5);
}

#[test]
fn build_and_cull_use_separate_passes() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(sixteen_slices());
    lane.initialize(&device, 1920, 1080).unwrap();
    frame(&lane, &device, &Camera::default()).unwrap();

    let rec = device.rec();
    assert_eq!(rec.pass_labels, vec!["Cluster Build", "Cluster Cull"]);
    // 30x17x16 clusters over 4x4x4 workgroups.
    assert_eq!(rec.dispatches[0], (BUILD.to_string(), [8, 5, 4]));
    assert_eq!(rec.dispatches[1], (CULL.to_string(), [8, 5, 4]));
}

#[test]
fn resize_reallocates_and_forces_a_rebuild() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(sixteen_slices());
    lane.initialize(&device, 1920, 1080).unwrap();
    let camera = Camera::default();
    frame(&lane, &device, &camera).unwrap();

    lane.resize(&device, 1280, 720).unwrap();
    assert_eq!(lane.grid().total_clusters(), 3840);
    {
        let rec = device.rec();
        assert_eq!(
            rec.created("Cluster AABBs"),
            vec![8160 * 32, 3840 * 32]
        );
        assert_eq!(rec.live("Cluster AABBs"), Some(3840 * 32));
        assert_eq!(rec.live("Cluster Data Grid"), Some(3840 * 16 * 4));
    }
    assert_eq!(lane.stats().buffer_reallocations, 1);

    // Same projection generation, the grid still has to be rebuilt.
    frame(&lane, &device, &camera).unwrap();
    assert_eq!(device.rec().dispatch_count(BUILD), 2);
}

#[test]
fn resize_to_the_same_grid_keeps_buffers_but_rebuilds() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(sixteen_slices());
    lane.initialize(&device, 1920, 1080).unwrap();
    let camera = Camera::default();
    frame(&lane, &device, &camera).unwrap();

    // 1900 still rounds up to 30 tiles.
    lane.resize(&device, 1900, 1080).unwrap();
    assert_eq!(device.rec().created("Cluster AABBs").len(), 1);
    assert_eq!(lane.screen_size(), (1900, 1080));

    frame(&lane, &device, &camera).unwrap();
    assert_eq!(device.rec().dispatch_count(BUILD), 2);
}

#[test]
fn oversized_targets_are_rejected() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(ClusterConfig::default().with_texel_size(1));
    assert!(matches!(
        lane.initialize(&device, 16384, 16384),
        Err(ClusterError::InvalidTargetSize { width: 16384, height: 16384 })
    ));
    assert!(device.rec().created_buffers.is_empty());
    assert!(!lane.is_initialized());

    lane.initialize(&device, 640, 480).unwrap();
    let grid = lane.grid();
    assert!(matches!(
        lane.resize(&device, 16384, 16384),
        Err(ClusterError::InvalidTargetSize { .. })
    ));
    assert!(lane.is_initialized());
    assert_eq!(lane.grid(), grid);
    assert_eq!(lane.screen_size(), (640, 480));
    frame(&lane, &device, &Camera::default()).unwrap();
}

#[test]
fn failed_resize_releases_everything() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(sixteen_slices());
    lane.initialize(&device, 1920, 1080).unwrap();
    let camera = Camera::default();
    frame(&lane, &device, &camera).unwrap();

    device.rec().failing_buffer = Some("Cluster AABBs".to_string());
    assert!(matches!(
        lane.resize(&device, 1280, 720),
        Err(ClusterError::Resource(ResourceError::BackendError(_)))
    ));
    assert!(!lane.is_initialized());
    assert!(lane.clusters_buffer(true).is_none());
    {
        let rec = device.rec();
        assert!(rec.buffers.is_empty());
        assert_eq!(rec.live_bind_groups, 0);
        assert_eq!(rec.live_pipelines, 0);
        assert_eq!(rec.live_layouts, 0);
        assert_eq!(rec.live_shaders, 0);
    }

    let dispatches = device.rec().dispatches.len();
    assert!(matches!(
        frame(&lane, &device, &camera),
        Err(ClusterError::NotInitialized)
    ));
    assert_eq!(device.rec().dispatches.len(), dispatches);

    device.rec().failing_buffer = None;
    lane.initialize(&device, 1280, 720).unwrap();
    frame(&lane, &device, &camera).unwrap();
    assert_eq!(lane.grid().total_clusters(), 3840);
}

#[test]
fn zero_sized_resize_is_ignored() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::default();
    lane.initialize(&device, 1280, 720).unwrap();
    let grid = lane.grid();

    lane.resize(&device, 0, 0).unwrap();
    assert_eq!(lane.grid(), grid);
    assert_eq!(lane.screen_size(), (1280, 720));
}

#[test]
fn shaders_are_compiled_with_the_live_grid() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(sixteen_slices());
    lane.initialize(&device, 1920, 1080).unwrap();

    let cull = device.rec().source_of(CULL).unwrap();
    assert!(cull.contains("const CLUSTERS_X: u32 = 30u;"));
    assert!(cull.contains("const CLUSTERS_Y: u32 = 17u;"));
    assert!(cull.contains("const CLUSTERS_Z: u32 = 16u;"));
    assert!(cull.contains("const CLUSTERED_NUM_BUCKETS: u32 = 16u;"));
    let defines = lane.shader_defines().unwrap();
    assert_eq!(defines.clusters_x, lane.grid().tiles_x);

    lane.resize(&device, 1280, 720).unwrap();
    let rec = device.rec();
    let build = rec.source_of(BUILD).unwrap();
    assert!(build.contains("const CLUSTERS_X: u32 = 20u;"));
    assert!(build.contains("const CLUSTERS_Y: u32 = 12u;"));
    // Old pipelines are gone.
    assert_eq!(rec.pipelines.len(), 2);
}

#[test]
fn lifecycle_errors() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::default();
    let camera = Camera::default();

    assert!(matches!(
        frame(&lane, &device, &camera),
        Err(ClusterError::NotInitialized)
    ));
    assert!(matches!(
        lane.resize(&device, 800, 600),
        Err(ClusterError::NotInitialized)
    ));

    lane.initialize(&device, 800, 600).unwrap();
    assert!(matches!(
        lane.initialize(&device, 800, 600),
        Err(ClusterError::AlreadyInitialized)
    ));

    lane.shutdown(&device);
    assert!(matches!(
        frame(&lane, &device, &camera),
        Err(ClusterError::NotInitialized)
    ));
}

#[test]
fn degenerate_camera_is_reported() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::default();
    lane.initialize(&device, 800, 600).unwrap();

    let mut camera = Camera::default();
    camera.set_clip_planes(5.0, 1.0);
    assert!(matches!(
        frame(&lane, &device, &camera),
        Err(ClusterError::DegenerateCamera)
    ));
    assert!(device.rec().dispatches.is_empty());
}

#[test]
fn shutdown_releases_everything_in_order() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::with_decals();
    lane.initialize(&device, 1280, 720).unwrap();
    frame(&lane, &device, &Camera::default()).unwrap();

    lane.shutdown(&device);
    lane.shutdown(&device);

    let rec = device.rec();
    assert!(rec.buffers.is_empty());
    assert_eq!(rec.live_bind_groups, 0);
    assert_eq!(rec.live_pipelines, 0);
    assert_eq!(rec.live_layouts, 0);
    assert_eq!(rec.live_shaders, 0);

    let pos = |label: &str| rec.destroyed_buffers.iter().position(|l| l == label).unwrap();
    assert!(pos("Cluster Lights") < pos("Cluster AABBs"));
    assert!(pos("Cluster Decals") < pos("Cluster AABBs"));
    assert!(pos("Cluster Decals") < pos("Cluster Data Grid"));
    assert_eq!(rec.destroyed_buffers.len(), 7);

    drop(rec);
    assert!(!lane.is_initialized());
    assert!(lane.clusters_buffer(true).is_none());
}

#[test]
fn growing_the_light_list_rebinds_the_cull_stage() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::default();
    lane.lights().add_point(Vec3::ZERO, PointLight::default());
    lane.initialize(&device, 1280, 720).unwrap();
    let camera = Camera::default();
    frame(&lane, &device, &camera).unwrap();
    let bind_groups = device.rec().bind_groups_created;

    // Capacity 1 still fits after a move.
    let _ = lane.lights().get_mut(strata_lanes::LightId(0));
    frame(&lane, &device, &camera).unwrap();
    assert_eq!(device.rec().bind_groups_created, bind_groups);

    for i in 0..3 {
        lane.lights().add_point(Vec3::new(i as f32, 0.0, -5.0), PointLight::default());
    }
    frame(&lane, &device, &camera).unwrap();
    let rec = device.rec();
    assert_eq!(rec.created("Cluster Lights"), vec![64, 4 * 64]);
    assert_eq!(rec.bind_groups_created, bind_groups + 2);
    assert_eq!(rec.live_bind_groups, 2);
    drop(rec);
    assert_eq!(lane.stats().lights_submitted, 4);
}

#[test]
fn adding_one_light_per_frame_grows_geometrically() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::default();
    lane.lights().add_point(Vec3::ZERO, PointLight::default());
    lane.initialize(&device, 1280, 720).unwrap();
    let camera = Camera::default();
    frame(&lane, &device, &camera).unwrap();

    for i in 0..8 {
        lane.lights().add_point(Vec3::new(i as f32, 0.0, -5.0), PointLight::default());
        frame(&lane, &device, &camera).unwrap();
    }
    let record = size_of::<GpuClusterLight>() as u64;
    assert_eq!(
        device.rec().created("Cluster Lights"),
        vec![record, 2 * record, 4 * record, 8 * record, 16 * record]
    );
    assert_eq!(lane.lights().capacity(), 16);
    assert_eq!(lane.stats().lights_submitted, 9);
}

#[test]
fn over_capacity_lights_are_counted() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(ClusterConfig::default().with_max_lights_per_cluster(64));
    for i in 0..80 {
        lane.lights().add_point(Vec3::new(i as f32, 0.0, -5.0), PointLight::default());
    }
    lane.initialize(&device, 640, 480).unwrap();
    frame(&lane, &device, &Camera::default()).unwrap();

    let stats = lane.stats();
    assert_eq!(stats.lights_submitted, 80);
    assert_eq!(stats.lights_over_capacity, 16);
}

#[test]
fn decal_variant_doubles_the_grid_stride() {
    let device = MockGraphicsDevice::default();
    let lane = ClusteredLightingLane::new(ClusterConfig::with_decals().with_slices_z(16));
    lane.initialize(&device, 1920, 1080).unwrap();

    {
        let rec = device.rec();
        assert_eq!(rec.live("Cluster Data Grid"), Some(8160 * 16 * 8));
        assert_eq!(rec.layout_entries, vec![2, 7]);
        let cull = rec.source_of(CULL).unwrap();
        assert!(cull.contains("array<vec2<u32>>"));
        assert!(cull.contains("const CLUSTER_WITH_DECALS: bool = true;"));
    }

    let transform = Mat4::from_translation(Vec3::new(0.0, 0.0, -4.0));
    for i in 0..20 {
        lane.decals()
            .unwrap()
            .add(transform, LinearRgba::WHITE, i);
    }
    frame(&lane, &device, &Camera::default()).unwrap();
    assert_eq!(lane.stats().decals_submitted, 20);
    // Grown in steps of 16 records of 112 bytes.
    assert_eq!(device.rec().live("Cluster Decals"), Some(32 * 112));
}

#[test]
fn runs_through_the_lane_interface() {
    let device = MockGraphicsDevice::default();
    let shared: Arc<dyn GraphicsDevice> = Arc::new(device.clone());
    let lane: Box<dyn Lane> = Box::new(ClusteredLightingLane::new(sixteen_slices()));

    let mut ctx = LaneContext::new();
    ctx.insert(shared.clone());
    ctx.insert(RenderTargetSize {
        width: 1920,
        height: 1080,
    });
    lane.on_initialize(&mut ctx).unwrap();
    assert_eq!(lane.strategy_name(), "ClusteredLighting");
    assert!(lane.estimate_cost(&ctx) > 0.5);

    let camera = Camera::default();
    let mut encoder = shared.create_command_encoder(Some("Frame"));
    {
        let mut frame_ctx = LaneContext::new();
        frame_ctx.insert(shared.clone());
        frame_ctx.insert(RenderTargetSize {
            width: 1280,
            height: 720,
        });
        frame_ctx.insert(Ref::new(&camera));
        frame_ctx.insert(Slot::new(encoder.as_mut()));
        lane.execute(&mut frame_ctx).unwrap();

        let views = frame_ctx.get::<ClusterBufferViews>().unwrap();
        assert!(views.clusters.is_read_only());
        assert!(views.data_grid.is_read_only());
    }

    let concrete = lane
        .as_any()
        .downcast_ref::<ClusteredLightingLane>()
        .unwrap();
    assert_eq!(concrete.grid(), ClusterGrid::compute(1280, 720, &sixteen_slices()));
    assert_eq!(device.rec().dispatch_count(CULL), 1);

    lane.on_shutdown(&mut ctx);
    assert!(device.rec().buffers.is_empty());
}

#[test]
fn lane_reports_missing_context() {
    let lane = ClusteredLightingLane::default();
    let mut ctx = LaneContext::new();
    assert!(matches!(
        lane.on_initialize(&mut ctx),
        Err(LaneError::InvalidContext { .. })
    ));

    let device = MockGraphicsDevice::default();
    ctx.insert(Arc::new(device) as Arc<dyn GraphicsDevice>);
    assert!(matches!(
        lane.execute(&mut ctx),
        Err(LaneError::InvalidContext { .. })
    ));
}
