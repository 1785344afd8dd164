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

//! Shader constants derived from the grid and configuration.
//!
//! Every shader that reads or writes cluster data is compiled with the same
//! prelude, generated here. Building the prelude from the live [`ClusterGrid`]
//! is what keeps the GPU indexing identical to the CPU descriptor.

use std::fmt::Write;

use super::{config::ClusterConfig, grid::ClusterGrid};

/// The constant set injected into clustered shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClusterShaderDefines {
    /// Invocations per workgroup.
    pub thread_group_size: u32,
    /// Workgroup width.
    pub clusters_x_threads: u32,
    /// Workgroup height.
    pub clusters_y_threads: u32,
    /// Workgroup depth.
    pub clusters_z_threads: u32,
    /// Tiles along X.
    pub clusters_x: u32,
    /// Tiles along Y.
    pub clusters_y: u32,
    /// Depth slices.
    pub clusters_z: u32,
    /// Light index capacity of one cluster.
    pub max_lights_per_cluster: u32,
    /// Tile size in pixels.
    pub cluster_texel_size: u32,
    /// 32-bit buckets per cluster.
    pub clustered_num_buckets: u32,
    /// Whether decal buckets are present.
    pub with_decals: bool,
}

impl ClusterShaderDefines {
    /// Captures the constants for `grid` built with `config`.
    pub fn new(grid: &ClusterGrid, config: &ClusterConfig) -> Self {
        Self {
            thread_group_size: config.thread_group_size(),
            clusters_x_threads: config.threads_x,
            clusters_y_threads: config.threads_y,
            clusters_z_threads: config.threads_z,
            clusters_x: grid.tiles_x,
            clusters_y: grid.tiles_y,
            clusters_z: grid.slices_z,
            max_lights_per_cluster: config.max_lights_per_cluster,
            cluster_texel_size: config.texel_size,
            clustered_num_buckets: config.buckets_per_cluster(),
            with_decals: config.variant.has_decals(),
        }
    }

    /// The unsigned constants by shader name, in prelude order.
    pub fn entries(&self) -> [(&'static str, u32); 10] {
        [
            ("THREAD_GROUP_SIZE", self.thread_group_size),
            ("CLUSTERS_X_THREADS", self.clusters_x_threads),
            ("CLUSTERS_Y_THREADS", self.clusters_y_threads),
            ("CLUSTERS_Z_THREADS", self.clusters_z_threads),
            ("CLUSTERS_X", self.clusters_x),
            ("CLUSTERS_Y", self.clusters_y),
            ("CLUSTERS_Z", self.clusters_z),
            ("MAX_LIGHTS_PER_CLUSTER", self.max_lights_per_cluster),
            ("CLUSTER_TEXTEL_SIZE", self.cluster_texel_size),
            ("CLUSTERED_NUM_BUCKETS", self.clustered_num_buckets),
        ]
    }

    /// Looks up an unsigned constant by its shader name.
    pub fn get(&self, name: &str) -> Option<u32> {
        self.entries()
            .into_iter()
            .find_map(|(n, v)| (n == name).then_some(v))
    }

    /// WGSL `const` declarations to prepend to a clustered shader.
    pub fn to_wgsl_prelude(&self) -> String {
        let mut out = String::with_capacity(512);
        for (name, value) in self.entries() {
            // Writing into a String cannot fail.
            let _ = writeln!(out, "const {name}: u32 = {value}u;");
        }
        let _ = writeln!(out, "const CLUSTER_WITH_DECALS: bool = {};", self.with_decals);
        out
    }
}
