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

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use wgpu::util::DeviceExt;

use strata_core::renderer::api::command::{self as api_cmd, BindingResource};
use strata_core::renderer::api::resource as api_buf;
use strata_core::renderer::traits::CommandEncoder;
use strata_core::renderer::{
    BindGroupDescriptor, BindGroupId, BindGroupLayoutDescriptor, BindGroupLayoutId,
    ComputePipelineDescriptor, ComputePipelineId, GraphicsAdapterInfo, GraphicsDevice,
    PipelineError, PipelineLayoutDescriptor, PipelineLayoutId, ResourceError, ShaderError,
    ShaderModuleDescriptor, ShaderModuleId, ShaderSourceData,
};

use crate::graphics::wgpu::command::WgpuCommandEncoder;
use crate::graphics::wgpu::conversions::{from_wgpu_backend, from_wgpu_device_type, IntoWgpu};

use super::context::WgpuGraphicsContext;

#[derive(Debug)]
struct WgpuShaderModuleEntry {
    wgpu_module: Arc<wgpu::ShaderModule>,
}

#[derive(Debug)]
pub(crate) struct WgpuComputePipelineEntry {
    pub(crate) wgpu_pipeline: Arc<wgpu::ComputePipeline>,
}

#[derive(Debug)]
pub(crate) struct WgpuBufferEntry {
    pub(crate) wgpu_buffer: Arc<wgpu::Buffer>,
    pub(crate) size: u64, // To track VRAM accurately on destruction
}

/// The internal, non-clonable state of the WgpuDevice.
#[derive(Debug)]
pub struct WgpuDeviceInternal {
    context: Arc<Mutex<WgpuGraphicsContext>>,
    shader_modules: Mutex<HashMap<ShaderModuleId, WgpuShaderModuleEntry>>,
    compute_pipelines: Mutex<HashMap<ComputePipelineId, WgpuComputePipelineEntry>>,
    pipeline_layouts: Mutex<HashMap<PipelineLayoutId, Arc<wgpu::PipelineLayout>>>,
    bind_group_layouts: Mutex<HashMap<BindGroupLayoutId, Arc<wgpu::BindGroupLayout>>>,
    bind_groups: Mutex<HashMap<BindGroupId, Arc<wgpu::BindGroup>>>,
    buffers: Mutex<HashMap<api_buf::BufferId, WgpuBufferEntry>>,

    next_shader_id: AtomicUsize,
    next_compute_pipeline_id: AtomicU64,
    next_pipeline_layout_id: AtomicUsize,
    next_bind_group_layout_id: AtomicUsize,
    next_bind_group_id: AtomicUsize,
    next_buffer_id: AtomicUsize,

    // VRAM Tracking
    vram_allocated_bytes: AtomicU64,
    vram_peak_bytes: AtomicU64,

    /// Command buffers that have been finished but not yet submitted.
    pending_command_buffers: Mutex<HashMap<api_cmd::CommandBufferId, wgpu::CommandBuffer>>,
    /// A thread-safe counter to generate unique command buffer IDs.
    command_buffer_id_counter: AtomicU64,
}

/// A clonable, thread-safe handle to the wgpu graphics device.
///
/// It wraps the actual device state (`WgpuDeviceInternal`) in an Arc,
/// allowing it to be shared across threads and with command encoders.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

fn lookup<K: Eq + Hash, V: Clone>(map: &Mutex<HashMap<K, V>>, key: &K) -> Option<V> {
    map.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
        .cloned()
}

impl WgpuDevice {
    pub fn new(context: Arc<Mutex<WgpuGraphicsContext>>) -> Self {
        Self {
            internal: Arc::new(WgpuDeviceInternal {
                context,
                shader_modules: Mutex::new(HashMap::new()),
                compute_pipelines: Mutex::new(HashMap::new()),
                pipeline_layouts: Mutex::new(HashMap::new()),
                bind_group_layouts: Mutex::new(HashMap::new()),
                bind_groups: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                next_shader_id: AtomicUsize::new(0),
                next_compute_pipeline_id: AtomicU64::new(0),
                next_pipeline_layout_id: AtomicUsize::new(0),
                next_bind_group_layout_id: AtomicUsize::new(0),
                next_bind_group_id: AtomicUsize::new(0),
                next_buffer_id: AtomicUsize::new(0),
                vram_allocated_bytes: AtomicU64::new(0),
                vram_peak_bytes: AtomicU64::new(0),
                pending_command_buffers: Mutex::new(HashMap::new()),
                command_buffer_id_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a device on a new headless context, blocking on adapter selection.
    pub fn headless() -> anyhow::Result<Self> {
        let context =
            WgpuGraphicsContext::new_headless_blocking(wgpu::PowerPreference::HighPerformance)?;
        Ok(Self::new(Arc::new(Mutex::new(context))))
    }

    /// Helper function to execute an operation with the wgpu::Device locked.
    fn with_wgpu_device<F, R>(&self, operation: F) -> Result<R, ResourceError>
    where
        F: FnOnce(&wgpu::Device) -> Result<R, ResourceError>,
    {
        let context_guard = lock(&self.internal.context, "context")?;
        operation(&context_guard.device)
    }

    /// Runs `operation` inside a validation error scope and returns the first
    /// validation error it raised, as text.
    fn validated<R>(
        device: &wgpu::Device,
        operation: impl FnOnce() -> R,
    ) -> (R, Option<String>) {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let result = operation();
        let error = pollster::block_on(device.pop_error_scope());
        (result, error.map(|e| e.to_string()))
    }

    fn track_allocation(&self, size: u64) {
        let current = self
            .internal
            .vram_allocated_bytes
            .fetch_add(size, Ordering::Relaxed)
            + size;
        self.internal
            .vram_peak_bytes
            .fetch_max(current, Ordering::Relaxed);
    }

    /// Bytes currently allocated in buffers created through this device.
    pub fn vram_usage_bytes(&self) -> u64 {
        self.internal.vram_allocated_bytes.load(Ordering::Relaxed)
    }

    /// Highest value [`vram_usage_bytes`](Self::vram_usage_bytes) has reached.
    pub fn vram_peak_bytes(&self) -> u64 {
        self.internal.vram_peak_bytes.load(Ordering::Relaxed)
    }

    /// Retrieves a reference-counted pointer to the internal wgpu compute pipeline.
    /// Returns `None` if the ID is invalid.
    pub fn get_wgpu_compute_pipeline(
        &self,
        id: ComputePipelineId,
    ) -> Option<Arc<wgpu::ComputePipeline>> {
        let pipelines = self
            .internal
            .compute_pipelines
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pipelines
            .get(&id)
            .map(|entry| Arc::clone(&entry.wgpu_pipeline))
    }

    /// Retrieves a reference-counted pointer to the internal wgpu bind group.
    pub fn get_wgpu_bind_group(&self, id: BindGroupId) -> Option<Arc<wgpu::BindGroup>> {
        lookup(&self.internal.bind_groups, &id)
    }

    /// Retrieves a reference-counted pointer to the internal wgpu buffer.
    /// Returns `None` if the ID is invalid.
    pub fn get_wgpu_buffer(&self, id: api_buf::BufferId) -> Option<Arc<wgpu::Buffer>> {
        let buffers = self
            .internal
            .buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        buffers.get(&id).map(|entry| Arc::clone(&entry.wgpu_buffer))
    }

    /// Polls the underlying wgpu::Device in a blocking manner.
    /// Used at shutdown so pending work completes before resources are destroyed.
    pub fn poll_device_blocking(&self) {
        if let Ok(context_guard) = self.internal.context.lock() {
            if let Err(e) = context_guard.device.poll(wgpu::PollType::Wait) {
                log::warn!("Failed to poll device during shutdown: {:?}", e);
            }
        } else {
            log::error!("WgpuDevice context mutex was poisoned during shutdown poll.");
        }
    }

    /// Copies a buffer into a staging buffer and blocks until its bytes are
    /// readable on the CPU.
    ///
    /// The buffer must have been created with `COPY_SRC`.
    pub fn read_buffer_blocking(&self, id: api_buf::BufferId) -> Result<Vec<u8>, ResourceError> {
        let source = self.get_wgpu_buffer(id).ok_or(ResourceError::NotFound)?;
        let size = source.size();
        let context = lock(&self.internal.context, "context")?;

        let staging = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Strata Readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Strata Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(&source, 0, &staging, 0, size);
        context.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        context
            .device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| ResourceError::BackendError(format!("Device poll failed: {e}")))?;
        receiver
            .recv()
            .map_err(|e| ResourceError::BackendError(format!("Readback callback lost: {e}")))?
            .map_err(|e| ResourceError::BackendError(format!("Buffer mapping failed: {e}")))?;

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(data)
    }

    /// (crate-internal) Registers a finished wgpu::CommandBuffer, storing it
    /// in a map and returning an abstract ID for it.
    pub(crate) fn register_command_buffer(
        &self,
        buffer: wgpu::CommandBuffer,
    ) -> api_cmd::CommandBufferId {
        let new_id = api_cmd::CommandBufferId(
            self.internal
                .command_buffer_id_counter
                .fetch_add(1, Ordering::SeqCst),
        );
        self.internal
            .pending_command_buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(new_id, buffer);
        new_id
    }
}

impl GraphicsDevice for WgpuDevice {
    // --- Shader Module Operations ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let wgpu_source = match &descriptor.source {
            ShaderSourceData::Wgsl(cow_str) => wgpu::ShaderSource::Wgsl(cow_str.clone()),
        };
        let label = descriptor.label;

        let wgpu_module = self.with_wgpu_device(|device| {
            log::debug!("WgpuDevice: Creating wgpu::ShaderModule with label: {label:?}");
            let (module, error) = Self::validated(device, || {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label,
                    source: wgpu_source,
                })
            });
            match error {
                Some(details) => Err(ShaderError::CompilationError {
                    label: label.unwrap_or_default().to_string(),
                    details,
                }
                .into()),
                None => Ok(Arc::new(module)),
            }
        })?;

        let id = ShaderModuleId(self.internal.next_shader_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.shader_modules, "shader_modules")?
            .insert(id, WgpuShaderModuleEntry { wgpu_module });

        log::info!(
            "WgpuDevice: Created shader module '{}' with ID: {:?}",
            label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        if lock(&self.internal.shader_modules, "shader_modules")?
            .remove(&id)
            .is_some()
        {
            log::debug!("WgpuDevice: Destroyed shader module with ID: {id:?}");
            Ok(())
        } else {
            Err(ShaderError::NotFound { id }.into())
        }
    }

    // --- Pipeline Operations ---

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        let bind_group_layouts = {
            let layouts = lock(&self.internal.bind_group_layouts, "bind_group_layouts")?;
            descriptor
                .bind_group_layouts
                .iter()
                .map(|id| {
                    layouts.get(id).cloned().ok_or_else(|| {
                        PipelineError::LayoutCreationFailed(format!(
                            "bind group layout {id:?} not found"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        let refs: Vec<&wgpu::BindGroupLayout> =
            bind_group_layouts.iter().map(|l| l.as_ref()).collect();

        let layout = self.with_wgpu_device(|device| {
            Ok(device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: descriptor.label.as_deref(),
                bind_group_layouts: &refs,
                push_constant_ranges: &[],
            }))
        })?;

        let id = PipelineLayoutId(
            self.internal
                .next_pipeline_layout_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.pipeline_layouts, "pipeline_layouts")?.insert(id, Arc::new(layout));
        log::debug!(
            "WgpuDevice: Created pipeline layout '{}' with ID: {:?}",
            descriptor.label.as_deref().unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), ResourceError> {
        lock(&self.internal.pipeline_layouts, "pipeline_layouts")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        let pipeline_label = descriptor.label.as_deref().map(str::to_string);
        let module = lock(&self.internal.shader_modules, "shader_modules")?
            .get(&descriptor.shader_module)
            .map(|entry| Arc::clone(&entry.wgpu_module))
            .ok_or_else(|| PipelineError::InvalidShaderModuleForPipeline {
                id: descriptor.shader_module,
                pipeline_label: pipeline_label.clone(),
            })?;
        let layout = match descriptor.layout {
            Some(id) => Some(lookup(&self.internal.pipeline_layouts, &id).ok_or_else(|| {
                PipelineError::LayoutCreationFailed(format!("pipeline layout {id:?} not found"))
            })?),
            None => None,
        };

        let pipeline = self.with_wgpu_device(|device| {
            let (pipeline, error) = Self::validated(device, || {
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: descriptor.label.as_deref(),
                    layout: layout.as_deref(),
                    module: &module,
                    entry_point: Some(descriptor.entry_point.as_ref()),
                    compilation_options: Default::default(),
                    cache: None,
                })
            });
            match error {
                Some(details) => Err(PipelineError::CompilationFailed {
                    label: pipeline_label.clone(),
                    details,
                }
                .into()),
                None => Ok(Arc::new(pipeline)),
            }
        })?;

        let id = ComputePipelineId(
            self.internal
                .next_compute_pipeline_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.compute_pipelines, "compute_pipelines")?.insert(
            id,
            WgpuComputePipelineEntry {
                wgpu_pipeline: pipeline,
            },
        );
        log::info!(
            "WgpuDevice: Created compute pipeline '{}' with ID: {:?}",
            pipeline_label.as_deref().unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError> {
        if lock(&self.internal.compute_pipelines, "compute_pipelines")?
            .remove(&id)
            .is_some()
        {
            log::debug!("WgpuDevice: Destroyed compute pipeline with ID: {id:?}");
            Ok(())
        } else {
            Err(PipelineError::InvalidComputePipeline { id }.into())
        }
    }

    // --- Bind Group Operations ---

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> =
            descriptor.entries.iter().map(|entry| entry.into_wgpu()).collect();
        let layout = self.with_wgpu_device(|device| {
            Ok(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: descriptor.label,
                entries: &entries,
            }))
        })?;

        let id = BindGroupLayoutId(
            self.internal
                .next_bind_group_layout_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.bind_group_layouts, "bind_group_layouts")?
            .insert(id, Arc::new(layout));
        Ok(id)
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let layout = lookup(&self.internal.bind_group_layouts, &descriptor.layout)
            .ok_or(ResourceError::NotFound)?;

        // Resolve every buffer first so the wgpu entries can borrow them.
        let buffers = descriptor
            .entries
            .iter()
            .map(|entry| match entry.resource {
                BindingResource::Buffer(binding) => self
                    .get_wgpu_buffer(binding.buffer)
                    .map(|buffer| (entry.binding, buffer, binding))
                    .ok_or(ResourceError::NotFound),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .map(|(binding, buffer, range)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: range.offset,
                    size: range.size,
                }),
            })
            .collect();

        let bind_group = self.with_wgpu_device(|device| {
            Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: descriptor.label,
                layout: &layout,
                entries: &entries,
            }))
        })?;

        let id = BindGroupId(
            self.internal
                .next_bind_group_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.bind_groups, "bind_groups")?.insert(id, Arc::new(bind_group));
        log::debug!(
            "WgpuDevice: Created bind group '{}' with ID: {:?}",
            descriptor.label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_bind_group_layout(&self, id: BindGroupLayoutId) -> Result<(), ResourceError> {
        lock(&self.internal.bind_group_layouts, "bind_group_layouts")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        lock(&self.internal.bind_groups, "bind_groups")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    // --- Buffer Operations ---

    fn create_buffer(
        &self,
        descriptor: &api_buf::BufferDescriptor,
    ) -> Result<api_buf::BufferId, ResourceError> {
        let wgpu_buffer = self.with_wgpu_device(|device| {
            Ok(device.create_buffer(&wgpu::BufferDescriptor {
                label: descriptor.label.as_deref(),
                size: descriptor.size,
                usage: descriptor.usage.into_wgpu(),
                mapped_at_creation: descriptor.mapped_at_creation,
            }))
        })?;
        let id = api_buf::BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        self.track_allocation(descriptor.size);

        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                size: descriptor.size,
            },
        );

        log::info!(
            "WgpuDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size
        );
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &api_buf::BufferDescriptor,
        data: &[u8],
    ) -> Result<api_buf::BufferId, ResourceError> {
        let wgpu_buffer = self.with_wgpu_device(|device| {
            Ok(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: descriptor.label.as_deref(),
                contents: data,
                usage: descriptor.usage.into_wgpu(),
            }))
        })?;
        let id = api_buf::BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        let buffer_size = data.len() as u64;
        self.track_allocation(buffer_size);

        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                size: buffer_size,
            },
        );

        log::info!(
            "WgpuDevice: Created buffer '{}' with initial data. ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            buffer_size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: api_buf::BufferId) -> Result<(), ResourceError> {
        let entry = lock(&self.internal.buffers, "buffers")?
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        self.internal
            .vram_allocated_bytes
            .fetch_sub(entry.size, Ordering::Relaxed);
        log::debug!("WgpuDevice: Destroyed buffer with ID: {id:?}");
        Ok(())
    }

    fn write_buffer(
        &self,
        id: api_buf::BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        // 1. Get the resources
        let buffer = self.get_wgpu_buffer(id).ok_or(ResourceError::NotFound)?;

        // 2. Check the bounds
        let size = buffer.size();
        if offset + data.len() as u64 > size {
            return Err(ResourceError::OutOfBounds {
                buffer: id,
                offset,
                len: data.len() as u64,
                size,
            });
        }

        // 3. Write directly
        let context = lock(&self.internal.context, "context")?;
        context.queue.write_buffer(&buffer, offset, data);
        log::trace!(
            "WgpuDevice: Wrote {} bytes to buffer ID: {:?} at offset {}",
            data.len(),
            id,
            offset
        );
        Ok(())
    }

    // --- Commands ---

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        let context_guard = self
            .internal
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let encoder = context_guard
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label });

        Box::new(WgpuCommandEncoder {
            encoder,
            device: self.clone(),
        })
    }

    fn submit_command_buffer(&self, command_buffer_id: api_cmd::CommandBufferId) {
        let buffer = self
            .internal
            .pending_command_buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&command_buffer_id);

        if let Some(buffer) = buffer {
            let context_guard = self
                .internal
                .context
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            context_guard.queue.submit(std::iter::once(buffer));
        } else {
            log::error!(
                "Attempted to submit a CommandBufferId ({:?}) that does not exist.",
                command_buffer_id
            );
        }
    }

    // --- Capabilities ---

    fn get_adapter_info(&self) -> GraphicsAdapterInfo {
        let context_guard = self
            .internal
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        GraphicsAdapterInfo {
            name: context_guard.adapter_name.clone(),
            backend_type: from_wgpu_backend(context_guard.adapter_backend),
            device_type: from_wgpu_device_type(context_guard.adapter_device_type),
            max_compute_invocations_per_workgroup: context_guard
                .device_limits
                .max_compute_invocations_per_workgroup,
            max_storage_buffer_binding_size: context_guard
                .device_limits
                .max_storage_buffer_binding_size as u64,
        }
    }

    fn supports_feature(&self, feature_name: &str) -> bool {
        let context_guard = self
            .internal
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match feature_name {
            "gpu_timestamps" => context_guard
                .active_device_features
                .contains(wgpu::Features::TIMESTAMP_QUERY),
            "compute_shaders" => context_guard
                .adapter
                .get_downlevel_capabilities()
                .flags
                .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS),
            _ => {
                log::warn!(
                    "WgpuDevice: Unsupported feature_name query in supports_feature: {feature_name}"
                );
                false
            }
        }
    }
}
