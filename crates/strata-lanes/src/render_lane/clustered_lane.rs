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

//! Clustered light culling lane.
//!
//! The frustum is partitioned into the cells of a [`ClusterGrid`]. Two compute
//! stages run on it:
//!
//! 1. **Build**: one view-space AABB per cluster. Depends only on the projection
//!    and the grid, so it is dispatched only when the camera's projection
//!    generation differs from the one in the [`ProjectionCache`].
//! 2. **Cull**: per cluster, the bitmask buckets of the lights (and decals) that
//!    overlap its AABB. Lights move freely, so it is dispatched every frame.
//!
//! Each stage is recorded in its own compute pass. The pass boundary is what
//! makes the backend order the AABB writes of the build before the reads of the
//! cull.
//!
//! # Lifecycle
//!
//! ```text
//! initialize(w, h) -> [ resize(w, h) | pre_render(camera) ]* -> shutdown()
//! ```
//!
//! Both variants ([`ClusterVariant::LightsOnly`], [`ClusterVariant::WithDecals`])
//! are this one type; the variant only changes the data grid stride, the cull
//! shader and the presence of the [`DecalManager`].

use std::borrow::Cow;
use std::fmt::Debug;
use std::mem::size_of;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use strata_core::lane::{
    ClusterBufferViews, Lane, LaneContext, LaneError, LaneKind, Ref, RenderTargetSize, Slot,
};
use strata_core::renderer::api::{
    command::{
        BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutDescriptor,
        BindGroupLayoutEntry, BindGroupLayoutId, ComputePassDescriptor, ComputePipelineDescriptor,
        ComputePipelineId,
    },
    core::{ShaderModuleDescriptor, ShaderModuleId, ShaderSourceData},
    pipeline::{PipelineLayoutDescriptor, PipelineLayoutId},
    resource::{BufferDescriptor, BufferId, BufferView},
};
use strata_core::renderer::cluster::{
    ClusterCameraUniforms, ClusterConfig, ClusterGrid, ClusterShaderDefines, ClusterVariant,
};
use strata_core::renderer::{Camera, CommandEncoder, GraphicsDevice, ResourceError};

use super::decal_manager::DecalManager;
use super::error::ClusterError;
use super::light_manager::LightManager;
use super::projection_cache::ProjectionCache;
use super::shaders;

// --- Cost Estimation Constants ---

/// Fixed overhead of recording the cull pass.
const COMPUTE_PASS_OVERHEAD: f32 = 0.5;

/// Cost per cluster visited by the cull pass.
const PER_CLUSTER_COST: f32 = 0.00005;

/// Cost per light-cluster intersection test.
const LIGHT_CLUSTER_TEST_COST: f32 = 0.000002;

/// Counters of the clustered lighting lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterStats {
    /// Build dispatches recorded since initialization.
    pub build_dispatches: u64,
    /// Cull dispatches recorded since initialization.
    pub cull_dispatches: u64,
    /// Times the cluster and data grid buffers were reallocated by a resize.
    pub buffer_reallocations: u64,
    /// Lights uploaded for the last frame.
    pub lights_submitted: u32,
    /// Decals uploaded for the last frame.
    pub decals_submitted: u32,
    /// Lights whose index is past the per-cluster capacity. The cull shader
    /// drops them in every cluster, so this is a lower bound of dropped lights.
    pub lights_over_capacity: u32,
    /// Same as `lights_over_capacity`, for decals.
    pub decals_over_capacity: u32,
}

/// Buffers of the collaborators the cull bind group was created with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CullInputs {
    lights: Option<BufferId>,
    light_constants: Option<BufferId>,
    decals: Option<BufferId>,
    decal_constants: Option<BufferId>,
}

/// GPU handles owned by the lane. Every field is `None` outside of
/// `initialize` .. `shutdown`.
#[derive(Debug, Default)]
struct ClusterGpuResources {
    initialized: bool,
    grid: ClusterGrid,
    screen_size: (u32, u32),
    defines: Option<ClusterShaderDefines>,

    camera_buffer: Option<BufferId>,
    clusters_buffer: Option<BufferId>,
    data_grid_buffer: Option<BufferId>,

    build_layout: Option<BindGroupLayoutId>,
    cull_layout: Option<BindGroupLayoutId>,
    build_pipeline_layout: Option<PipelineLayoutId>,
    cull_pipeline_layout: Option<PipelineLayoutId>,

    build_shader: Option<ShaderModuleId>,
    cull_shader: Option<ShaderModuleId>,
    build_pipeline: Option<ComputePipelineId>,
    cull_pipeline: Option<ComputePipelineId>,

    build_bind_group: Option<BindGroupId>,
    cull_bind_group: Option<BindGroupId>,
    cull_inputs: CullInputs,

    cache: ProjectionCache,
    stats: ClusterStats,
    over_capacity_warned: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn release<I: Copy + Debug>(
    slot: &mut Option<I>,
    what: &str,
    destroy: impl FnOnce(I) -> Result<(), ResourceError>,
) {
    if let Some(id) = slot.take() {
        if let Err(e) = destroy(id) {
            log::warn!("ClusteredLightingLane: failed to destroy {what} {id:?}: {e}");
        }
    }
}

/// The clustered light (and decal) culling stage of the frame.
///
/// All methods take `&self`; GPU state sits behind a mutex so the lane can be
/// driven through the [`Lane`] trait. Lock order is resources, then lights,
/// then decals.
#[derive(Debug)]
pub struct ClusteredLightingLane {
    config: ClusterConfig,
    resources: Mutex<ClusterGpuResources>,
    lights: Mutex<LightManager>,
    decals: Option<Mutex<DecalManager>>,
}

impl Default for ClusteredLightingLane {
    fn default() -> Self {
        Self::new(ClusterConfig::default())
    }
}

impl ClusteredLightingLane {
    /// Creates an uninitialized lane. The configuration is validated by
    /// [`initialize`](Self::initialize).
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            config,
            resources: Mutex::new(ClusterGpuResources::default()),
            lights: Mutex::new(LightManager::new()),
            decals: config
                .variant
                .has_decals()
                .then(|| Mutex::new(DecalManager::new())),
        }
    }

    /// Default layout, lights only.
    pub fn lights_only() -> Self {
        Self::new(ClusterConfig::lights_only())
    }

    /// Default layout, lights and decals.
    pub fn with_decals() -> Self {
        Self::new(ClusterConfig::with_decals())
    }

    /// The configuration the lane was created with.
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Lights only, or lights and decals.
    pub fn variant(&self) -> ClusterVariant {
        self.config.variant
    }

    /// The light collaborator.
    pub fn lights(&self) -> MutexGuard<'_, LightManager> {
        lock(&self.lights)
    }

    /// The decal collaborator, present in the decal variant only.
    pub fn decals(&self) -> Option<MutexGuard<'_, DecalManager>> {
        self.decals.as_ref().map(lock)
    }

    /// Whether `initialize` succeeded and `shutdown` has not run since.
    pub fn is_initialized(&self) -> bool {
        lock(&self.resources).initialized
    }

    /// The current grid. Empty before initialization.
    pub fn grid(&self) -> ClusterGrid {
        lock(&self.resources).grid
    }

    /// The render target size the grid was computed for.
    pub fn screen_size(&self) -> (u32, u32) {
        lock(&self.resources).screen_size
    }

    /// The constants the current pipelines were compiled with.
    pub fn shader_defines(&self) -> Option<ClusterShaderDefines> {
        lock(&self.resources).defines
    }

    /// Counters since initialization.
    pub fn stats(&self) -> ClusterStats {
        lock(&self.resources).stats
    }

    /// The per-cluster AABB buffer, through its read-only or read-write view.
    pub fn clusters_buffer(&self, read_only: bool) -> Option<BufferView> {
        lock(&self.resources)
            .clusters_buffer
            .map(|b| view(b, read_only))
    }

    /// The per-cluster bucket buffer, through its read-only or read-write view.
    pub fn data_grid_buffer(&self, read_only: bool) -> Option<BufferView> {
        lock(&self.resources)
            .data_grid_buffer
            .map(|b| view(b, read_only))
    }

    // --- State machine ---

    /// Creates every GPU resource for a `width` x `height` target.
    ///
    /// The configuration is validated before the first device call. On failure
    /// everything created so far is released.
    pub fn initialize(
        &self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
    ) -> Result<(), ClusterError> {
        let mut res = lock(&self.resources);
        if res.initialized {
            return Err(ClusterError::AlreadyInitialized);
        }
        self.config.validate()?;
        if width == 0 || height == 0 {
            return Err(ClusterError::InvalidTargetSize { width, height });
        }
        let grid = self.grid_for(width, height)?;
        self.check_adapter(device, &grid)?;

        log::info!(
            "ClusteredLightingLane: initializing {}x{}x{} clusters for {width}x{height} ({:?})",
            grid.tiles_x,
            grid.tiles_y,
            grid.slices_z,
            self.config.variant,
        );

        if let Err(e) = self.create_resources(&mut res, device, grid, (width, height)) {
            log::error!("ClusteredLightingLane: initialization failed: {e}");
            self.release_all(&mut res, device);
            return Err(e);
        }
        res.initialized = true;
        Ok(())
    }

    /// Adapts the grid to a new target size.
    ///
    /// Zero dimensions are ignored. The projection cache is invalidated on every
    /// accepted call, so the next frame rebuilds the AABBs. Buffers are
    /// reallocated when the cluster count changes; pipelines and bind groups are
    /// recreated whenever the grid changes.
    ///
    /// A rejected size leaves the lane untouched. A backend failure while
    /// recreating resources releases everything and leaves the lane
    /// uninitialized.
    pub fn resize(
        &self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
    ) -> Result<(), ClusterError> {
        let mut res = lock(&self.resources);
        if !res.initialized {
            return Err(ClusterError::NotInitialized);
        }
        if width == 0 || height == 0 {
            log::warn!("ClusteredLightingLane: ignoring resize to {width}x{height}");
            return Ok(());
        }

        let old = res.grid;
        let grid = self.grid_for(width, height)?;
        if grid != old {
            self.check_adapter(device, &grid)?;
        }

        res.screen_size = (width, height);
        res.cache.invalidate();
        if grid == old {
            log::debug!("ClusteredLightingLane: resize to {width}x{height} keeps the grid");
            return Ok(());
        }

        res.grid = grid;
        if let Err(e) = self.recreate_for_grid(&mut res, device, old) {
            log::error!("ClusteredLightingLane: resize to {width}x{height} failed: {e}");
            self.release_all(&mut res, device);
            return Err(e);
        }

        log::info!(
            "ClusteredLightingLane: resized to {width}x{height}, grid {}x{}x{} ({} clusters)",
            grid.tiles_x,
            grid.tiles_y,
            grid.slices_z,
            grid.total_clusters(),
        );
        Ok(())
    }

    /// Records the frame's cluster work into `encoder`.
    ///
    /// Uploads the collaborators, writes the camera block, records the build
    /// dispatch if the projection generation changed and always records the
    /// cull dispatch.
    pub fn pre_render(
        &self,
        device: &dyn GraphicsDevice,
        encoder: &mut dyn CommandEncoder,
        camera: &Camera,
    ) -> Result<(), ClusterError> {
        let mut res = lock(&self.resources);
        let (true, Some(build_pipeline), Some(cull_pipeline), Some(build_bg), Some(camera_buffer)) = (
            res.initialized,
            res.build_pipeline,
            res.cull_pipeline,
            res.build_bind_group,
            res.camera_buffer,
        ) else {
            return Err(ClusterError::NotInitialized);
        };

        let lights_submitted = {
            let mut lights = lock(&self.lights);
            lights.bind_uniforms(device)?;
            lights.uploaded_count()
        };
        let decals_submitted = match &self.decals {
            Some(decals) => {
                let mut decals = lock(decals);
                decals.bind_uniforms(device)?;
                decals.uploaded_count()
            }
            None => 0,
        };
        if res.cull_bind_group.is_none() || self.cull_inputs() != res.cull_inputs {
            log::debug!("ClusteredLightingLane: collaborator buffers changed, rebinding");
            self.create_bind_groups(&mut res, device)?;
        }
        let Some(cull_bg) = res.cull_bind_group else {
            return Err(ClusterError::NotInitialized);
        };
        self.track_capacity(&mut res, lights_submitted, decals_submitted);

        let (width, height) = res.screen_size;
        let uniforms = ClusterCameraUniforms::from_camera(camera, width, height)
            .ok_or(ClusterError::DegenerateCamera)?;
        device.write_buffer(camera_buffer, 0, bytemuck::bytes_of(&uniforms))?;

        let [x, y, z] = res.grid.dispatch_size(&self.config);

        if res.cache.take_rebuild(camera.projection_generation()) {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor::labeled("Cluster Build"));
            pass.set_pipeline(&build_pipeline);
            pass.set_bind_group(0, &build_bg, &[]);
            pass.dispatch_workgroups(x, y, z);
            drop(pass);
            res.stats.build_dispatches += 1;
            log::debug!(
                "ClusteredLightingLane: rebuilt clusters for projection generation {}",
                camera.projection_generation()
            );
        }

        {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor::labeled("Cluster Cull"));
            pass.set_pipeline(&cull_pipeline);
            pass.set_bind_group(0, &cull_bg, &[]);
            pass.dispatch_workgroups(x, y, z);
        }
        res.stats.cull_dispatches += 1;
        Ok(())
    }

    /// Releases every GPU resource: collaborators first, then the cluster
    /// buffers, bind groups, pipelines, layouts and shader modules.
    ///
    /// Safe to call repeatedly and before `initialize`.
    pub fn shutdown(&self, device: &dyn GraphicsDevice) {
        let mut res = lock(&self.resources);
        let was_initialized = res.initialized;
        self.release_all(&mut res, device);
        if was_initialized {
            log::info!("ClusteredLightingLane: shut down");
        }
    }

    // --- Resource management ---

    /// The grid for a target, rejecting sizes whose cluster count does not fit
    /// the `u32` indices of the shaders.
    fn grid_for(&self, width: u32, height: u32) -> Result<ClusterGrid, ClusterError> {
        let grid = ClusterGrid::compute(width, height, &self.config);
        if grid.checked_total_clusters().is_none() {
            log::error!(
                "ClusteredLightingLane: {width}x{height} needs {} clusters",
                grid.total_clusters()
            );
            return Err(ClusterError::InvalidTargetSize { width, height });
        }
        Ok(grid)
    }

    /// Swaps the grid-dependent resources after `res.grid` changed from `old`.
    fn recreate_for_grid(
        &self,
        res: &mut ClusterGpuResources,
        device: &dyn GraphicsDevice,
        old: ClusterGrid,
    ) -> Result<(), ClusterError> {
        if res.grid.total_clusters() != old.total_clusters() {
            self.release_grid_buffers(res, device);
            self.allocate_grid_buffers(res, device)?;
            res.stats.buffer_reallocations += 1;
        }
        self.release_pipelines(res, device);
        self.create_pipelines(res, device)?;
        self.create_bind_groups(res, device)
    }

    fn check_adapter(&self, device: &dyn GraphicsDevice, grid: &ClusterGrid) -> Result<(), ClusterError> {
        let info = device.get_adapter_info();
        let invocations = self.config.thread_group_size();
        if !info.supports_workgroup(invocations) {
            return Err(ClusterError::WorkgroupTooLarge {
                adapter: info.name,
                invocations,
            });
        }
        for (buffer, size) in [
            ("cluster", grid.cluster_buffer_size()),
            ("data grid", grid.data_grid_buffer_size(&self.config)),
        ] {
            if !info.supports_storage_binding(size) {
                return Err(ClusterError::BufferTooLarge {
                    buffer,
                    size,
                    adapter: info.name,
                });
            }
        }
        Ok(())
    }

    fn create_resources(
        &self,
        res: &mut ClusterGpuResources,
        device: &dyn GraphicsDevice,
        grid: ClusterGrid,
        screen_size: (u32, u32),
    ) -> Result<(), ClusterError> {
        lock(&self.lights).init(device)?;
        if let Some(decals) = &self.decals {
            lock(decals).init(device)?;
        }

        res.grid = grid;
        res.screen_size = screen_size;
        res.camera_buffer = Some(device.create_buffer(&BufferDescriptor::uniform(
            "Cluster Camera Uniforms",
            size_of::<ClusterCameraUniforms>() as u64,
        ))?);
        self.allocate_grid_buffers(res, device)?;
        self.create_layouts(res, device)?;
        self.create_pipelines(res, device)?;
        self.create_bind_groups(res, device)?;
        res.cache.invalidate();
        Ok(())
    }

    fn allocate_grid_buffers(
        &self,
        res: &mut ClusterGpuResources,
        device: &dyn GraphicsDevice,
    ) -> Result<(), ClusterError> {
        let cluster_size = res.grid.cluster_buffer_size();
        let data_grid_size = res.grid.data_grid_buffer_size(&self.config);
        res.clusters_buffer =
            Some(device.create_buffer(&BufferDescriptor::storage("Cluster AABBs", cluster_size))?);
        res.data_grid_buffer = Some(
            device.create_buffer(&BufferDescriptor::storage("Cluster Data Grid", data_grid_size))?,
        );
        log::debug!(
            "ClusteredLightingLane: cluster buffer {cluster_size} B, data grid {data_grid_size} B"
        );
        Ok(())
    }

    fn create_layouts(
        &self,
        res: &mut ClusterGpuResources,
        device: &dyn GraphicsDevice,
    ) -> Result<(), ClusterError> {
        let build_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Cluster Build Layout"),
            entries: &[
                // 0: Camera
                BindGroupLayoutEntry::compute_uniform(0),
                // 1: Cluster AABBs (write)
                BindGroupLayoutEntry::compute_storage(1, false),
            ],
        })?;
        res.build_layout = Some(build_layout);

        let mut cull_entries = vec![
            // 0: Camera
            BindGroupLayoutEntry::compute_uniform(0),
            // 1: Cluster AABBs (read)
            BindGroupLayoutEntry::compute_storage(1, true),
            // 2: Light constants
            BindGroupLayoutEntry::compute_uniform(2),
            // 3: Lights
            BindGroupLayoutEntry::compute_storage(3, true),
            // 4: Data grid (write)
            BindGroupLayoutEntry::compute_storage(4, false),
        ];
        if self.config.variant.has_decals() {
            // 5: Decal constants, 6: Decals
            cull_entries.push(BindGroupLayoutEntry::compute_uniform(5));
            cull_entries.push(BindGroupLayoutEntry::compute_storage(6, true));
        }
        let cull_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Cluster Cull Layout"),
            entries: &cull_entries,
        })?;
        res.cull_layout = Some(cull_layout);

        res.build_pipeline_layout = Some(device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(Cow::Borrowed("Cluster Build Pipeline Layout")),
            bind_group_layouts: &[build_layout],
        })?);
        res.cull_pipeline_layout = Some(device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(Cow::Borrowed("Cluster Cull Pipeline Layout")),
            bind_group_layouts: &[cull_layout],
        })?);
        Ok(())
    }

    /// Compiles both stages against the current grid.
    fn create_pipelines(
        &self,
        res: &mut ClusterGpuResources,
        device: &dyn GraphicsDevice,
    ) -> Result<(), ClusterError> {
        let defines = ClusterShaderDefines::new(&res.grid, &self.config);

        let build_shader = device.create_shader_module(&ShaderModuleDescriptor {
            label: Some("Cluster Build Shader"),
            source: ShaderSourceData::Wgsl(Cow::Owned(shaders::compose_build(&defines))),
        })?;
        res.build_shader = Some(build_shader);
        res.build_pipeline = Some(device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some(Cow::Borrowed("Cluster Build Pipeline")),
            layout: res.build_pipeline_layout,
            shader_module: build_shader,
            entry_point: Cow::Borrowed(shaders::BUILD_ENTRY_POINT),
        })?);

        let cull_shader = device.create_shader_module(&ShaderModuleDescriptor {
            label: Some("Cluster Cull Shader"),
            source: ShaderSourceData::Wgsl(Cow::Owned(shaders::compose_cull(
                &defines,
                self.config.variant,
            ))),
        })?;
        res.cull_shader = Some(cull_shader);
        res.cull_pipeline = Some(device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some(Cow::Borrowed("Cluster Cull Pipeline")),
            layout: res.cull_pipeline_layout,
            shader_module: cull_shader,
            entry_point: Cow::Borrowed(shaders::CULL_ENTRY_POINT),
        })?);

        res.defines = Some(defines);
        Ok(())
    }

    fn cull_inputs(&self) -> CullInputs {
        let (lights, light_constants) = {
            let lights = lock(&self.lights);
            (lights.buffer(), lights.uniform_buffer())
        };
        let (decals, decal_constants) = match &self.decals {
            Some(decals) => {
                let decals = lock(decals);
                (decals.buffer(), decals.uniform_buffer())
            }
            None => (None, None),
        };
        CullInputs {
            lights,
            light_constants,
            decals,
            decal_constants,
        }
    }

    /// (Re)creates both bind groups from the current buffers.
    fn create_bind_groups(
        &self,
        res: &mut ClusterGpuResources,
        device: &dyn GraphicsDevice,
    ) -> Result<(), ClusterError> {
        self.release_bind_groups(res, device);

        let (
            Some(camera),
            Some(clusters),
            Some(data_grid),
            Some(build_layout),
            Some(cull_layout),
        ) = (
            res.camera_buffer,
            res.clusters_buffer,
            res.data_grid_buffer,
            res.build_layout,
            res.cull_layout,
        )
        else {
            return Err(ClusterError::NotInitialized);
        };
        let inputs = self.cull_inputs();
        let (Some(lights), Some(light_constants)) = (inputs.lights, inputs.light_constants) else {
            return Err(ClusterError::NotInitialized);
        };

        res.build_bind_group = Some(device.create_bind_group(&BindGroupDescriptor {
            label: Some("Cluster Build Bind Group"),
            layout: build_layout,
            entries: &[
                BindGroupEntry::whole_buffer(0, camera),
                BindGroupEntry::whole_buffer(1, clusters),
            ],
        })?);

        let mut entries = vec![
            BindGroupEntry::whole_buffer(0, camera),
            BindGroupEntry::whole_buffer(1, clusters),
            BindGroupEntry::whole_buffer(2, light_constants),
            BindGroupEntry::whole_buffer(3, lights),
            BindGroupEntry::whole_buffer(4, data_grid),
        ];
        if self.config.variant.has_decals() {
            let (Some(decals), Some(decal_constants)) = (inputs.decals, inputs.decal_constants)
            else {
                return Err(ClusterError::NotInitialized);
            };
            entries.push(BindGroupEntry::whole_buffer(5, decal_constants));
            entries.push(BindGroupEntry::whole_buffer(6, decals));
        }
        res.cull_bind_group = Some(device.create_bind_group(&BindGroupDescriptor {
            label: Some("Cluster Cull Bind Group"),
            layout: cull_layout,
            entries: &entries,
        })?);
        res.cull_inputs = inputs;
        Ok(())
    }

    fn track_capacity(&self, res: &mut ClusterGpuResources, lights: u32, decals: u32) {
        let max = self.config.max_lights_per_cluster;
        let stats = &mut res.stats;
        stats.lights_submitted = lights;
        stats.decals_submitted = decals;
        stats.lights_over_capacity = lights.saturating_sub(max);
        stats.decals_over_capacity = decals.saturating_sub(max);

        let over = stats.lights_over_capacity + stats.decals_over_capacity;
        if over == 0 {
            res.over_capacity_warned = false;
        } else if !res.over_capacity_warned {
            log::warn!(
                "ClusteredLightingLane: {lights} lights and {decals} decals exceed the per-cluster capacity of {max}, {over} will be ignored"
            );
            res.over_capacity_warned = true;
        }
    }

    fn release_grid_buffers(&self, res: &mut ClusterGpuResources, device: &dyn GraphicsDevice) {
        release(&mut res.clusters_buffer, "cluster buffer", |id| {
            device.destroy_buffer(id)
        });
        release(&mut res.data_grid_buffer, "data grid buffer", |id| {
            device.destroy_buffer(id)
        });
    }

    fn release_bind_groups(&self, res: &mut ClusterGpuResources, device: &dyn GraphicsDevice) {
        release(&mut res.build_bind_group, "bind group", |id| {
            device.destroy_bind_group(id)
        });
        release(&mut res.cull_bind_group, "bind group", |id| {
            device.destroy_bind_group(id)
        });
        res.cull_inputs = CullInputs::default();
    }

    fn release_pipelines(&self, res: &mut ClusterGpuResources, device: &dyn GraphicsDevice) {
        release(&mut res.build_pipeline, "compute pipeline", |id| {
            device.destroy_compute_pipeline(id)
        });
        release(&mut res.cull_pipeline, "compute pipeline", |id| {
            device.destroy_compute_pipeline(id)
        });
        release(&mut res.build_shader, "shader module", |id| {
            device.destroy_shader_module(id)
        });
        release(&mut res.cull_shader, "shader module", |id| {
            device.destroy_shader_module(id)
        });
        res.defines = None;
    }

    fn release_all(&self, res: &mut ClusterGpuResources, device: &dyn GraphicsDevice) {
        lock(&self.lights).shutdown(device);
        if let Some(decals) = &self.decals {
            lock(decals).shutdown(device);
        }

        self.release_grid_buffers(res, device);
        release(&mut res.camera_buffer, "camera buffer", |id| {
            device.destroy_buffer(id)
        });
        self.release_bind_groups(res, device);
        release(&mut res.build_pipeline, "compute pipeline", |id| {
            device.destroy_compute_pipeline(id)
        });
        release(&mut res.cull_pipeline, "compute pipeline", |id| {
            device.destroy_compute_pipeline(id)
        });
        release(&mut res.build_pipeline_layout, "pipeline layout", |id| {
            device.destroy_pipeline_layout(id)
        });
        release(&mut res.cull_pipeline_layout, "pipeline layout", |id| {
            device.destroy_pipeline_layout(id)
        });
        release(&mut res.build_layout, "bind group layout", |id| {
            device.destroy_bind_group_layout(id)
        });
        release(&mut res.cull_layout, "bind group layout", |id| {
            device.destroy_bind_group_layout(id)
        });
        release(&mut res.build_shader, "shader module", |id| {
            device.destroy_shader_module(id)
        });
        release(&mut res.cull_shader, "shader module", |id| {
            device.destroy_shader_module(id)
        });

        res.initialized = false;
        res.defines = None;
        res.grid = ClusterGrid::default();
        res.cache.invalidate();
        res.over_capacity_warned = false;
    }

    /// Lane cost for `clusters` cells and `lights` active lights.
    fn cull_cost(clusters: u64, lights: usize) -> f32 {
        let clusters = clusters as f32;
        COMPUTE_PASS_OVERHEAD
            + clusters * PER_CLUSTER_COST
            + clusters * lights as f32 * LIGHT_CLUSTER_TEST_COST
    }
}

fn view(buffer: BufferId, read_only: bool) -> BufferView {
    if read_only {
        BufferView::read_only(buffer)
    } else {
        BufferView::read_write(buffer)
    }
}

fn lane_error(e: ClusterError) -> LaneError {
    match e {
        ClusterError::NotInitialized => LaneError::NotInitialized,
        other => LaneError::ExecutionFailed(Box::new(other)),
    }
}

impl Lane for ClusteredLightingLane {
    fn strategy_name(&self) -> &'static str {
        match self.config.variant {
            ClusterVariant::LightsOnly => "ClusteredLighting",
            ClusterVariant::WithDecals => "ClusteredLightingDecals",
        }
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Render
    }

    fn estimate_cost(&self, ctx: &LaneContext) -> f32 {
        let mut clusters = self.grid().total_clusters();
        if clusters == 0 {
            if let Some(size) = ctx.get::<RenderTargetSize>() {
                clusters = ClusterGrid::compute(size.width, size.height, &self.config).total_clusters();
            }
        }
        let mut elements = self.lights().active_count();
        if let Some(decals) = self.decals() {
            elements += decals.count();
        }
        Self::cull_cost(clusters, elements)
    }

    fn on_initialize(&self, ctx: &mut LaneContext) -> Result<(), LaneError> {
        let device = ctx
            .get::<Arc<dyn GraphicsDevice>>()
            .ok_or(LaneError::missing("Arc<dyn GraphicsDevice>"))?
            .clone();
        let size = *ctx
            .get::<RenderTargetSize>()
            .ok_or(LaneError::missing("RenderTargetSize"))?;
        self.initialize(device.as_ref(), size.width, size.height)
            .map_err(|e| LaneError::InitializationFailed(Box::new(e)))
    }

    fn execute(&self, ctx: &mut LaneContext) -> Result<(), LaneError> {
        let device = ctx
            .get::<Arc<dyn GraphicsDevice>>()
            .ok_or(LaneError::missing("Arc<dyn GraphicsDevice>"))?
            .clone();

        if let Some(size) = ctx.get::<RenderTargetSize>().copied() {
            if (size.width, size.height) != self.screen_size() {
                self.resize(device.as_ref(), size.width, size.height)
                    .map_err(lane_error)?;
            }
        }

        {
            let camera = ctx
                .get::<Ref<Camera>>()
                .ok_or(LaneError::missing("Ref<Camera>"))?
                .get();
            let encoder = ctx
                .get::<Slot<dyn CommandEncoder>>()
                .ok_or(LaneError::missing("Slot<dyn CommandEncoder>"))?
                .get();
            self.pre_render(device.as_ref(), encoder, camera)
                .map_err(lane_error)?;
        }

        if let (Some(clusters), Some(data_grid)) =
            (self.clusters_buffer(true), self.data_grid_buffer(true))
        {
            ctx.insert(ClusterBufferViews {
                clusters,
                data_grid,
            });
        }
        Ok(())
    }

    fn on_shutdown(&self, ctx: &mut LaneContext) {
        if let Some(device) = ctx.get::<Arc<dyn GraphicsDevice>>() {
            self.shutdown(device.as_ref());
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
