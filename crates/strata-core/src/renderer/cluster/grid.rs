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

//! Cluster grid dimensions and the per-cluster bounding box record.

use bytemuck::{Pod, Zeroable};

use super::config::ClusterConfig;

/// The view-space bounding box of one cluster, as written by the build stage.
///
/// `w` of both bounds is padding so the record matches the WGSL `vec4<f32>` layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ClusterAabb {
    /// Minimum corner (`xyz`), `w` unused.
    pub min_bounds: [f32; 4],
    /// Maximum corner (`xyz`), `w` unused.
    pub max_bounds: [f32; 4],
}

/// Tile and slice counts of the cluster grid for one screen size.
///
/// Computed by [`ClusterGrid::compute`] on initialization and on every resize,
/// immutable in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClusterGrid {
    /// Screen-space tiles along X.
    pub tiles_x: u32,
    /// Screen-space tiles along Y.
    pub tiles_y: u32,
    /// Depth slices.
    pub slices_z: u32,
}

impl ClusterGrid {
    /// Derives the grid for a `width` x `height` pixel target.
    ///
    /// Pure and deterministic. A zero dimension yields an empty grid.
    pub const fn compute(width: u32, height: u32, config: &ClusterConfig) -> Self {
        Self {
            tiles_x: width.div_ceil(config.texel_size),
            tiles_y: height.div_ceil(config.texel_size),
            slices_z: config.slices_z,
        }
    }

    /// `tiles_x * tiles_y * slices_z`, computed in 64 bits. Saturates at `u64::MAX`.
    #[inline]
    pub const fn total_clusters(&self) -> u64 {
        (self.tiles_x as u64 * self.tiles_y as u64).saturating_mul(self.slices_z as u64)
    }

    /// The cluster count as the `u32` the shaders index with, `None` if it does not fit.
    #[inline]
    pub const fn checked_total_clusters(&self) -> Option<u32> {
        let total = self.total_clusters();
        if total > u32::MAX as u64 {
            None
        } else {
            Some(total as u32)
        }
    }

    /// `true` if the grid has no cluster.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.total_clusters() == 0
    }

    /// Workgroup counts for the build and cull dispatches.
    #[inline]
    pub const fn dispatch_size(&self, config: &ClusterConfig) -> [u32; 3] {
        [
            self.tiles_x.div_ceil(config.threads_x),
            self.tiles_y.div_ceil(config.threads_y),
            self.slices_z.div_ceil(config.threads_z),
        ]
    }

    /// Linear index of a cluster, X fastest then Y then Z.
    #[inline]
    pub const fn cluster_index(&self, x: u32, y: u32, z: u32) -> u32 {
        x + y * self.tiles_x + z * self.tiles_x * self.tiles_y
    }

    /// Bytes of the cluster AABB buffer.
    #[inline]
    pub const fn cluster_buffer_size(&self) -> u64 {
        (std::mem::size_of::<ClusterAabb>() as u64).saturating_mul(self.total_clusters())
    }

    /// Bytes of the data grid buffer: `stride * buckets_per_cluster * total_clusters`.
    #[inline]
    pub const fn data_grid_buffer_size(&self, config: &ClusterConfig) -> u64 {
        config
            .element_stride()
            .saturating_mul(config.buckets_per_cluster() as u64)
            .saturating_mul(self.total_clusters())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sixteen_slices() -> ClusterConfig {
        ClusterConfig::default().with_slices_z(16)
    }

    #[test]
    fn aabb_matches_gpu_layout() {
        assert_eq!(std::mem::size_of::<ClusterAabb>(), 32);
        assert_eq!(std::mem::align_of::<ClusterAabb>(), 4);
    }

    #[test]
    fn full_hd_grid() {
        let grid = ClusterGrid::compute(1920, 1080, &sixteen_slices());
        assert_eq!((grid.tiles_x, grid.tiles_y, grid.slices_z), (30, 17, 16));
        assert_eq!(grid.total_clusters(), 8160);
    }

    #[test]
    fn hd_grid_after_resize() {
        let grid = ClusterGrid::compute(1280, 720, &sixteen_slices());
        assert_eq!((grid.tiles_x, grid.tiles_y), (20, 12));
        assert_eq!(grid.total_clusters(), 3840);
    }

    #[test]
    fn compute_is_deterministic() {
        let cfg = ClusterConfig::default();
        for (w, h) in [(1, 1), (63, 65), (800, 600), (3840, 2160)] {
            assert_eq!(
                ClusterGrid::compute(w, h, &cfg),
                ClusterGrid::compute(w, h, &cfg)
            );
        }
        assert!(ClusterGrid::compute(0, 600, &cfg).is_empty());
    }

    #[test]
    fn dispatch_rounds_up_per_axis() {
        let cfg = sixteen_slices();
        let grid = ClusterGrid::compute(1920, 1080, &cfg);
        // 30 / 4 -> 8, 17 / 4 -> 5, 16 / 4 -> 4
        assert_eq!(grid.dispatch_size(&cfg), [8, 5, 4]);
    }

    #[test]
    fn buffer_sizes() {
        let cfg = sixteen_slices();
        let grid = ClusterGrid::compute(1920, 1080, &cfg);
        assert_eq!(grid.cluster_buffer_size(), 32 * 8160);
        // 256 / 16 = 16 buckets of 4 bytes.
        assert_eq!(grid.data_grid_buffer_size(&cfg), 4 * 16 * 8160);

        let decals = cfg.with_variant(super::super::ClusterVariant::WithDecals);
        assert_eq!(grid.data_grid_buffer_size(&decals), 8 * 16 * 8160);
    }

    #[test]
    fn cluster_index_is_x_major() {
        let grid = ClusterGrid {
            tiles_x: 4,
            tiles_y: 3,
            slices_z: 2,
        };
        assert_eq!(grid.cluster_index(0, 0, 0), 0);
        assert_eq!(grid.cluster_index(1, 0, 0), 1);
        assert_eq!(grid.cluster_index(0, 1, 0), 4);
        assert_eq!(grid.cluster_index(3, 2, 1) as u64, grid.total_clusters() - 1);
    }

    #[test]
    fn huge_targets_do_not_overflow() {
        let cfg = ClusterConfig::default().with_texel_size(1);
        let grid = ClusterGrid::compute(16384, 16384, &cfg);
        assert_eq!(grid.total_clusters(), 16384 * 16384 * 32);
        assert_eq!(grid.checked_total_clusters(), None);
        assert_eq!(grid.cluster_buffer_size(), 16384 * 16384 * 32 * 32);
        assert!(grid.data_grid_buffer_size(&cfg) > u32::MAX as u64);

        let saturated = ClusterGrid {
            tiles_x: u32::MAX,
            tiles_y: u32::MAX,
            slices_z: u32::MAX,
        };
        assert_eq!(saturated.total_clusters(), u64::MAX);
        assert_eq!(saturated.cluster_buffer_size(), u64::MAX);
    }

    #[test]
    fn checked_total_fits_common_targets() {
        let grid = ClusterGrid::compute(3840, 2160, &ClusterConfig::default());
        assert_eq!(grid.checked_total_clusters(), Some(60 * 34 * 32));
    }
}
