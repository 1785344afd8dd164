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

//! Adapter and device information.

use crate::renderer::api::util::enums::{GraphicsBackendType, RendererDeviceType};

/// Backend-agnostic description of the adapter a device was created on.
#[derive(Debug, Clone, Default)]
pub struct GraphicsAdapterInfo {
    /// Adapter name as reported by the driver.
    pub name: String,
    /// The graphics API backend in use.
    pub backend_type: GraphicsBackendType,
    /// The physical type of the adapter.
    pub device_type: RendererDeviceType,
    /// Upper bound on `x * y * z` of a compute workgroup. `0` when unknown.
    pub max_compute_invocations_per_workgroup: u32,
    /// Largest storage buffer binding in bytes. `0` when unknown.
    pub max_storage_buffer_binding_size: u64,
}

impl GraphicsAdapterInfo {
    /// `true` if a workgroup of `invocations` threads fits the adapter limits.
    ///
    /// Unknown limits accept everything.
    pub fn supports_workgroup(&self, invocations: u32) -> bool {
        self.max_compute_invocations_per_workgroup == 0
            || invocations <= self.max_compute_invocations_per_workgroup
    }

    /// `true` if a storage binding of `size` bytes fits the adapter limits.
    pub fn supports_storage_binding(&self, size: u64) -> bool {
        self.max_storage_buffer_binding_size == 0 || size <= self.max_storage_buffer_binding_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_limits_accept_everything() {
        let info = GraphicsAdapterInfo::default();
        assert!(info.supports_workgroup(1024));
        assert!(info.supports_storage_binding(u64::MAX));
    }

    #[test]
    fn known_limits_are_enforced() {
        let info = GraphicsAdapterInfo {
            max_compute_invocations_per_workgroup: 256,
            max_storage_buffer_binding_size: 128 << 20,
            ..Default::default()
        };
        assert!(info.supports_workgroup(64));
        assert!(!info.supports_workgroup(512));
        assert!(!info.supports_storage_binding(256 << 20));
    }
}
