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

//! The decal list the cull stage reads in the decal variant.
//!
//! Decals are boxes projected onto the scene: the unit cube of their local space,
//! placed by a local to world transform. The storage buffer grows in blocks of
//! [`DECAL_CAPACITY_STEP`] records.

use std::mem::size_of;

use strata_core::math::{LinearRgba, Mat4};
use strata_core::renderer::api::resource::{BufferDescriptor, BufferId};
use strata_core::renderer::light::{DecalConstants, GpuDecal};
use strata_core::renderer::GraphicsDevice;

use super::error::ClusterError;

/// Records added to the decal buffer each time it grows.
pub const DECAL_CAPACITY_STEP: usize = 16;

const DECAL_STRIDE: u64 = size_of::<GpuDecal>() as u64;

/// Stable handle of a decal in a [`DecalManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecalId(pub u64);

/// A projected decal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decal {
    /// Local to world transform of the projection box.
    pub transform: Mat4,
    /// Tint.
    pub color: LinearRgba,
    /// Layer of the decal atlas.
    pub atlas_index: u32,
}

/// Owns the decal storage buffer and the [`DecalConstants`] uniform.
#[derive(Debug)]
pub struct DecalManager {
    decals: Vec<(DecalId, Decal)>,
    next_id: u64,
    storage: Option<BufferId>,
    uniform: Option<BufferId>,
    capacity: usize,
    uploaded: u32,
    dirty: bool,
}

impl Default for DecalManager {
    fn default() -> Self {
        Self::new()
    }
}

fn grown_capacity(needed: usize) -> usize {
    needed.div_ceil(DECAL_CAPACITY_STEP).max(1) * DECAL_CAPACITY_STEP
}

impl DecalManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self {
            decals: Vec::new(),
            next_id: 0,
            storage: None,
            uniform: None,
            capacity: 0,
            uploaded: 0,
            dirty: true,
        }
    }

    /// Adds a decal.
    pub fn add(&mut self, transform: Mat4, color: LinearRgba, atlas_index: u32) -> DecalId {
        let id = DecalId(self.next_id);
        self.next_id += 1;
        self.decals.push((
            id,
            Decal {
                transform,
                color,
                atlas_index,
            },
        ));
        self.dirty = true;
        id
    }

    /// Removes a decal.
    pub fn remove(&mut self, id: DecalId) -> bool {
        let before = self.decals.len();
        self.decals.retain(|(d, _)| *d != id);
        let removed = self.decals.len() != before;
        self.dirty |= removed;
        removed
    }

    /// Removes every decal.
    pub fn clear(&mut self) {
        if !self.decals.is_empty() {
            self.decals.clear();
            self.dirty = true;
        }
    }

    /// Mutable access to a decal. Marks the manager dirty.
    pub fn get_mut(&mut self, id: DecalId) -> Option<&mut Decal> {
        let (_, decal) = self.decals.iter_mut().find(|(d, _)| *d == id)?;
        self.dirty = true;
        Some(decal)
    }

    /// Registered decals.
    pub fn count(&self) -> usize {
        self.decals.len()
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

    /// Decals in the buffer after the last upload.
    pub fn uploaded_count(&self) -> u32 {
        self.uploaded
    }

    /// Creates the GPU buffers. A second call is a no-op.
    pub fn init(&mut self, device: &dyn GraphicsDevice) -> Result<(), ClusterError> {
        if self.storage.is_some() {
            log::warn!("DecalManager: already initialized");
            return Ok(());
        }
        let capacity = grown_capacity(self.decals.len());
        let uniform = device.create_buffer(&BufferDescriptor::uniform(
            "Cluster Decal Constants",
            size_of::<DecalConstants>() as u64,
        ))?;
        let storage = match device.create_buffer(&BufferDescriptor::storage(
            "Cluster Decals",
            capacity as u64 * DECAL_STRIDE,
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
        Ok(())
    }

    /// Uploads decals and constants if anything changed.
    ///
    /// Decals with a singular transform are skipped. Returns `true` when the
    /// storage buffer was reallocated.
    pub fn bind_uniforms(&mut self, device: &dyn GraphicsDevice) -> Result<bool, ClusterError> {
        let (Some(storage), Some(uniform)) = (self.storage, self.uniform) else {
            return Err(ClusterError::NotInitialized);
        };
        if !self.dirty {
            return Ok(false);
        }

        let packed: Vec<GpuDecal> = self
            .decals
            .iter()
            .filter_map(|(id, d)| {
                let gpu = GpuDecal::new(&d.transform, d.color, d.atlas_index);
                if gpu.is_none() {
                    log::warn!("DecalManager: decal {id:?} has a singular transform, skipped");
                }
                gpu
            })
            .collect();

        let mut reallocated = false;
        let mut target = storage;
        if packed.len() > self.capacity {
            let capacity = grown_capacity(packed.len());
            log::warn!("DecalManager: resizing decal buffer to {capacity} records");
            let grown = device.create_buffer(&BufferDescriptor::storage(
                "Cluster Decals",
                capacity as u64 * DECAL_STRIDE,
            ))?;
            if let Err(e) = device.destroy_buffer(storage) {
                log::warn!("DecalManager: failed to release old decal buffer: {e}");
            }
            self.storage = Some(grown);
            self.capacity = capacity;
            target = grown;
            reallocated = true;
        }

        if !packed.is_empty() {
            device.write_buffer(target, 0, bytemuck::cast_slice(&packed))?;
        }
        let constants = DecalConstants {
            settings: [packed.len() as u32, 0, 0, 0],
        };
        device.write_buffer(uniform, 0, bytemuck::bytes_of(&constants))?;

        self.uploaded = packed.len() as u32;
        self.dirty = false;
        Ok(reallocated)
    }

    /// Releases both buffers. Safe to call repeatedly.
    pub fn shutdown(&mut self, device: &dyn GraphicsDevice) {
        for id in [self.storage.take(), self.uniform.take()].into_iter().flatten() {
            if let Err(e) = device.destroy_buffer(id) {
                log::warn!("DecalManager: failed to destroy buffer {id:?}: {e}");
            }
        }
        self.capacity = 0;
        self.uploaded = 0;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::math::Vec3;

    #[test]
    fn capacity_grows_in_blocks_of_sixteen() {
        assert_eq!(grown_capacity(0), 16);
        assert_eq!(grown_capacity(16), 16);
        assert_eq!(grown_capacity(17), 32);
        assert_eq!(grown_capacity(40), 48);
    }

    #[test]
    fn edits_mark_dirty() {
        let mut decals = DecalManager::new();
        let id = decals.add(Mat4::IDENTITY, LinearRgba::WHITE, 0);
        decals.dirty = false;

        decals.get_mut(id).unwrap().transform = Mat4::from_translation(Vec3::X);
        assert!(decals.is_dirty());

        decals.dirty = false;
        assert!(!decals.remove(DecalId(42)));
        assert!(!decals.is_dirty());
        assert!(decals.remove(id));
        assert_eq!(decals.count(), 0);
    }
}
