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

//! The light list the cull stage reads.
//!
//! Lights are edited on the CPU and uploaded by [`LightManager::bind_uniforms`]
//! at most once per frame. The storage buffer only grows; when it does, its
//! [`BufferId`] changes and bind groups referencing it must be recreated.

use std::mem::size_of;

use strata_core::math::{LinearRgba, Vec3};
use strata_core::renderer::api::resource::{BufferDescriptor, BufferId};
use strata_core::renderer::light::{
    DirectionalLight, FogType, GpuClusterLight, LightConstants, PointLight, SpotLight,
};
use strata_core::renderer::GraphicsDevice;

use super::error::ClusterError;

const LIGHT_STRIDE: u64 = size_of::<GpuClusterLight>() as u64;

/// At least doubles, so a list growing by one light per frame reallocates
/// a logarithmic number of times.
fn grown_capacity(current: usize, needed: usize) -> usize {
    needed.max(current.saturating_mul(2)).max(1)
}

/// Stable handle of a light in a [`LightManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub u64);

/// A light and where it sits in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// A point light at `position`.
    Point {
        /// World position.
        position: Vec3,
        /// Parameters.
        light: PointLight,
    },
    /// A spot light at `position`.
    Spot {
        /// World position.
        position: Vec3,
        /// Parameters.
        light: SpotLight,
    },
    /// A directional light.
    Directional(DirectionalLight),
}

impl Light {
    /// The packed GPU record.
    pub fn to_gpu(&self) -> GpuClusterLight {
        match self {
            Light::Point { position, light } => GpuClusterLight::point(*position, light),
            Light::Spot { position, light } => GpuClusterLight::spot(*position, light),
            Light::Directional(light) => GpuClusterLight::directional(light),
        }
    }
}

#[derive(Debug, Clone)]
struct LightEntry {
    id: LightId,
    light: Light,
    active: bool,
}

/// Owns the light storage buffer and the [`LightConstants`] uniform.
#[derive(Debug)]
pub struct LightManager {
    lights: Vec<LightEntry>,
    next_id: u64,
    constants: LightConstants,
    storage: Option<BufferId>,
    uniform: Option<BufferId>,
    capacity: usize,
    uploaded: u32,
    dirty: bool,
}

impl Default for LightManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LightManager {
    /// An empty manager with lighting enabled and no fog.
    pub fn new() -> Self {
        Self {
            lights: Vec::new(),
            next_id: 0,
            constants: LightConstants::default(),
            storage: None,
            uniform: None,
            capacity: 0,
            uploaded: 0,
            dirty: true,
        }
    }

    fn push(&mut self, light: Light) -> LightId {
        let id = LightId(self.next_id);
        self.next_id += 1;
        self.lights.push(LightEntry {
            id,
            light,
            active: true,
        });
        self.dirty = true;
        id
    }

    /// Adds a point light.
    pub fn add_point(&mut self, position: Vec3, light: PointLight) -> LightId {
        self.push(Light::Point { position, light })
    }

    /// Adds a spot light.
    pub fn add_spot(&mut self, position: Vec3, light: SpotLight) -> LightId {
        self.push(Light::Spot { position, light })
    }

    /// Adds a directional light.
    pub fn add_directional(&mut self, light: DirectionalLight) -> LightId {
        self.push(Light::Directional(light))
    }

    /// Removes a light. Indices of the following lights shift down.
    pub fn remove(&mut self, id: LightId) -> bool {
        let before = self.lights.len();
        self.lights.retain(|e| e.id != id);
        let removed = self.lights.len() != before;
        self.dirty |= removed;
        removed
    }

    /// Removes every light.
    pub fn clear(&mut self) {
        if !self.lights.is_empty() {
            self.lights.clear();
            self.dirty = true;
        }
    }

    /// Mutable access to a light. Marks the manager dirty.
    pub fn get_mut(&mut self, id: LightId) -> Option<&mut Light> {
        let entry = self.lights.iter_mut().find(|e| e.id == id)?;
        self.dirty = true;
        Some(&mut entry.light)
    }

    /// The light with `id`.
    pub fn get(&self, id: LightId) -> Option<&Light> {
        self.lights.iter().find(|e| e.id == id).map(|e| &e.light)
    }

    /// Inactive lights stay registered but are not uploaded.
    pub fn set_active(&mut self, id: LightId, active: bool) -> bool {
        match self.lights.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                if entry.active != active {
                    entry.active = active;
                    self.dirty = true;
                }
                true
            }
            None => false,
        }
    }

    /// Registered lights, active or not.
    pub fn count(&self) -> usize {
        self.lights.len()
    }

    /// Lights that will be uploaded.
    pub fn active_count(&self) -> usize {
        self.lights.iter().filter(|e| e.active).count()
    }

    /// Sets the ambient color.
    pub fn set_ambient(&mut self, color: LinearRgba) {
        self.constants.ambient = color.to_array();
        self.dirty = true;
    }

    /// Sets the fog color, end distance and density. Negative values disable it.
    pub fn set_fog(&mut self, color: LinearRgba, end: f32, density: f32) {
        self.constants.fog_color = color.to_array();
        self.constants.fog_settings[1] = density;
        self.constants.fog_settings[2] = end;
        self.dirty = true;
    }

    /// Sets how fog grows with distance.
    pub fn set_fog_type(&mut self, fog_type: FogType) {
        self.constants.fog_settings[0] = fog_type as u32 as f32;
        self.dirty = true;
    }

    /// Enables or disables lighting as a whole.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.constants.settings[0] = enabled as u32;
        self.dirty = true;
    }

    /// Whether lighting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.constants.settings[0] != 0
    }

    /// The constants as they will be uploaded, light count excluded.
    pub fn constants(&self) -> &LightConstants {
        &self.constants
    }

    /// Whether CPU-side data changed since the last upload.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The storage buffer, once initialized.
    pub fn buffer(&self) -> Option<BufferId> {
        self.storage
    }

    /// The constants buffer, once initialized.
    pub fn uniform_buffer(&self) -> Option<BufferId> {
        self.uniform
    }

    /// Records the storage buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lights in the buffer after the last upload.
    pub fn uploaded_count(&self) -> u32 {
        self.uploaded
    }

    /// Creates the GPU buffers. A second call is a no-op.
    pub fn init(&mut self, device: &dyn GraphicsDevice) -> Result<(), ClusterError> {
        if self.storage.is_some() {
            log::warn!("LightManager: already initialized");
            return Ok(());
        }
        let capacity = self.active_count().max(1);
        let uniform = device.create_buffer(&BufferDescriptor::uniform(
            "Cluster Light Constants",
            size_of::<LightConstants>() as u64,
        ))?;
        let storage = match device.create_buffer(&BufferDescriptor::storage(
            "Cluster Lights",
            capacity as u64 * LIGHT_STRIDE,
        )) {
            Ok(id) => id,
            Err(e) => {
                let _ = device.destroy_buffer(uniform);
                return Err(e.into());
            }
        };
        self.uniform = Some(uniform);
        self.storage = Some(storage);
        self.capacity = capacity;
        self.dirty = true;
        log::debug!("LightManager: initialized with capacity {capacity}");
        Ok(())
    }

    /// Uploads lights and constants if anything changed.
    ///
    /// Returns `true` when the storage buffer was reallocated.
    pub fn bind_uniforms(&mut self, device: &dyn GraphicsDevice) -> Result<bool, ClusterError> {
        let (Some(storage), Some(uniform)) = (self.storage, self.uniform) else {
            return Err(ClusterError::NotInitialized);
        };
        if !self.dirty {
            return Ok(false);
        }

        let packed: Vec<GpuClusterLight> = self
            .lights
            .iter()
            .filter(|e| e.active)
            .map(|e| e.light.to_gpu())
            .collect();

        let mut reallocated = false;
        let mut target = storage;
        if packed.len() > self.capacity {
            let capacity = grown_capacity(self.capacity, packed.len());
            let grown = device.create_buffer(&BufferDescriptor::storage(
                "Cluster Lights",
                capacity as u64 * LIGHT_STRIDE,
            ))?;
            if let Err(e) = device.destroy_buffer(storage) {
                log::warn!("LightManager: failed to release old light buffer: {e}");
            }
            log::debug!("LightManager: light buffer grown to {capacity} records");
            self.storage = Some(grown);
            self.capacity = capacity;
            target = grown;
            reallocated = true;
        }

        if !packed.is_empty() {
            device.write_buffer(target, 0, bytemuck::cast_slice(&packed))?;
        }

        let mut constants = self.constants;
        constants.settings[1] = packed.len() as u32;
        device.write_buffer(uniform, 0, bytemuck::bytes_of(&constants))?;

        self.uploaded = packed.len() as u32;
        self.dirty = false;
        Ok(reallocated)
    }

    /// Releases both buffers. Safe to call repeatedly.
    pub fn shutdown(&mut self, device: &dyn GraphicsDevice) {
        for id in [self.storage.take(), self.uniform.take()].into_iter().flatten() {
            if let Err(e) = device.destroy_buffer(id) {
                log::warn!("LightManager: failed to destroy buffer {id:?}: {e}");
            }
        }
        self.capacity = 0;
        self.uploaded = 0;
        self.dirty = true;
    }
}
