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

//! Validated clustering configuration.

use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::{
    BITS_PER_BUCKET, CLUSTERS_X_THREADS, CLUSTERS_Y_THREADS, CLUSTERS_Z, CLUSTERS_Z_THREADS,
    CLUSTER_TEXEL_SIZE, MAX_LIGHTS_PER_CLUSTER,
};

/// Which references the data grid stores per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterVariant {
    /// One `u32` light bucket per slot.
    #[default]
    LightsOnly,
    /// A `vec2<u32>` per slot: light bucket, decal bucket.
    WithDecals,
}

impl ClusterVariant {
    /// Size in bytes of one data grid element.
    #[inline]
    pub const fn element_stride(&self) -> u64 {
        match self {
            ClusterVariant::LightsOnly => 4,
            ClusterVariant::WithDecals => 8,
        }
    }

    /// `true` when decals are culled alongside lights.
    #[inline]
    pub const fn has_decals(&self) -> bool {
        matches!(self, ClusterVariant::WithDecals)
    }
}

/// Grid and thread-group layout shared by the CPU and the clustered shaders.
///
/// The defaults reproduce the fixed constants of the module
/// ([`CLUSTER_TEXEL_SIZE`], [`CLUSTERS_Z`], ...). Every instance must pass
/// [`validate`](Self::validate) before GPU resources are created from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Lights only, or lights and decals.
    pub variant: ClusterVariant,
    /// Side of a screen-space tile in pixels.
    pub texel_size: u32,
    /// Number of depth slices.
    pub slices_z: u32,
    /// Workgroup width.
    pub threads_x: u32,
    /// Workgroup height.
    pub threads_y: u32,
    /// Workgroup depth. Must divide `slices_z`.
    pub threads_z: u32,
    /// Light index capacity of one cluster.
    pub max_lights_per_cluster: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            variant: ClusterVariant::LightsOnly,
            texel_size: CLUSTER_TEXEL_SIZE,
            slices_z: CLUSTERS_Z,
            threads_x: CLUSTERS_X_THREADS,
            threads_y: CLUSTERS_Y_THREADS,
            threads_z: CLUSTERS_Z_THREADS,
            max_lights_per_cluster: MAX_LIGHTS_PER_CLUSTER,
        }
    }
}

impl ClusterConfig {
    /// Default layout, lights only.
    pub fn lights_only() -> Self {
        Self::default()
    }

    /// Default layout, lights and decals.
    pub fn with_decals() -> Self {
        Self {
            variant: ClusterVariant::WithDecals,
            ..Self::default()
        }
    }

    /// Replaces the variant.
    pub fn with_variant(mut self, variant: ClusterVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Replaces the tile size.
    pub fn with_texel_size(mut self, texel_size: u32) -> Self {
        self.texel_size = texel_size;
        self
    }

    /// Replaces the number of depth slices.
    pub fn with_slices_z(mut self, slices_z: u32) -> Self {
        self.slices_z = slices_z;
        self
    }

    /// Replaces the workgroup dimensions.
    pub fn with_threads(mut self, x: u32, y: u32, z: u32) -> Self {
        self.threads_x = x;
        self.threads_y = y;
        self.threads_z = z;
        self
    }

    /// Replaces the per-cluster light capacity.
    pub fn with_max_lights_per_cluster(mut self, max: u32) -> Self {
        self.max_lights_per_cluster = max;
        self
    }

    /// Checks every invariant the shaders rely on.
    ///
    /// Must be called before any GPU allocation; a failure is a setup error and
    /// the clustered path cannot run with this configuration.
    pub fn validate(&self) -> Result<(), ClusterConfigError> {
        let sizes = [
            ("texel_size", self.texel_size),
            ("slices_z", self.slices_z),
            ("threads_x", self.threads_x),
            ("threads_y", self.threads_y),
            ("threads_z", self.threads_z),
            ("max_lights_per_cluster", self.max_lights_per_cluster),
        ];
        if let Some(&(field, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(ClusterConfigError::ZeroSize { field });
        }

        if self.slices_z % self.threads_z != 0 {
            return Err(ClusterConfigError::SlicesNotDivisible {
                slices_z: self.slices_z,
                threads_z: self.threads_z,
            });
        }

        let max = self.max_lights_per_cluster;
        if max % self.slices_z != 0 {
            return Err(ClusterConfigError::CapacityNotDivisible {
                max_lights_per_cluster: max,
                slices_z: self.slices_z,
            });
        }
        if max % BITS_PER_BUCKET != 0 {
            return Err(ClusterConfigError::CapacityNotWordAligned {
                max_lights_per_cluster: max,
            });
        }

        let bit_capacity = self.buckets_per_cluster() as u64 * BITS_PER_BUCKET as u64;
        if bit_capacity < max as u64 {
            return Err(ClusterConfigError::BucketCapacityTooSmall {
                bit_capacity,
                max_lights_per_cluster: max,
            });
        }

        Ok(())
    }

    /// 32-bit buckets stored per cluster (`CLUSTERED_NUM_BUCKETS`).
    #[inline]
    pub const fn buckets_per_cluster(&self) -> u32 {
        self.max_lights_per_cluster / self.slices_z
    }

    /// Size in bytes of one data grid element.
    #[inline]
    pub const fn element_stride(&self) -> u64 {
        self.variant.element_stride()
    }

    /// Invocations per workgroup.
    #[inline]
    pub const fn thread_group_size(&self) -> u32 {
        self.threads_x * self.threads_y * self.threads_z
    }

    /// Parses a configuration from JSON. Missing fields take their default.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading cluster config {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("parsing cluster config {}", path.display()))
    }

    /// Saves the configuration as pretty JSON.
    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing cluster config {}", path.display()))?;
        Ok(())
    }
}

/// A configuration the clustered shaders cannot run with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterConfigError {
    /// A dimension or capacity is zero.
    ZeroSize {
        /// The offending field.
        field: &'static str,
    },
    /// The workgroup depth does not divide the number of slices.
    SlicesNotDivisible {
        /// Configured slices.
        slices_z: u32,
        /// Configured workgroup depth.
        threads_z: u32,
    },
    /// The light capacity does not divide evenly into per-slice buckets.
    CapacityNotDivisible {
        /// Configured capacity.
        max_lights_per_cluster: u32,
        /// Configured slices.
        slices_z: u32,
    },
    /// The light capacity is not a multiple of 32.
    CapacityNotWordAligned {
        /// Configured capacity.
        max_lights_per_cluster: u32,
    },
    /// The buckets of one cluster hold fewer bits than light slots.
    BucketCapacityTooSmall {
        /// Bits available per cluster.
        bit_capacity: u64,
        /// Configured capacity.
        max_lights_per_cluster: u32,
    },
}

impl fmt::Display for ClusterConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterConfigError::ZeroSize { field } => {
                write!(f, "cluster config field '{field}' must be non-zero")
            }
            ClusterConfigError::SlicesNotDivisible {
                slices_z,
                threads_z,
            } => write!(
                f,
                "slices_z ({slices_z}) must be a multiple of the workgroup depth ({threads_z})"
            ),
            ClusterConfigError::CapacityNotDivisible {
                max_lights_per_cluster,
                slices_z,
            } => write!(
                f,
                "max_lights_per_cluster ({max_lights_per_cluster}) must be a multiple of slices_z ({slices_z})"
            ),
            ClusterConfigError::CapacityNotWordAligned {
                max_lights_per_cluster,
            } => write!(
                f,
                "max_lights_per_cluster ({max_lights_per_cluster}) must be a multiple of 32"
            ),
            ClusterConfigError::BucketCapacityTooSmall {
                bit_capacity,
                max_lights_per_cluster,
            } => write!(
                f,
                "cluster buckets hold {bit_capacity} bits, fewer than max_lights_per_cluster ({max_lights_per_cluster})"
            ),
        }
    }
}

impl std::error::Error for ClusterConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_for_both_variants() {
        assert!(ClusterConfig::lights_only().validate().is_ok());
        assert!(ClusterConfig::with_decals().validate().is_ok());
        assert_eq!(ClusterConfig::default().buckets_per_cluster(), 8);
        assert_eq!(ClusterConfig::default().thread_group_size(), 64);
    }

    #[test]
    fn strides_follow_the_variant() {
        assert_eq!(ClusterConfig::lights_only().element_stride(), 4);
        assert_eq!(ClusterConfig::with_decals().element_stride(), 8);
        assert!(ClusterVariant::WithDecals.has_decals());
    }

    #[test]
    fn slices_must_divide_by_workgroup_depth() {
        let cfg = ClusterConfig::default().with_slices_z(30);
        assert_eq!(
            cfg.validate(),
            Err(ClusterConfigError::SlicesNotDivisible {
                slices_z: 30,
                threads_z: 4
            })
        );
        let ok = ClusterConfig::default()
            .with_slices_z(16)
            .with_threads(8, 8, 1);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let cfg = ClusterConfig::default().with_texel_size(0);
        assert_eq!(
            cfg.validate(),
            Err(ClusterConfigError::ZeroSize {
                field: "texel_size"
            })
        );
        let cfg = ClusterConfig::default().with_threads(4, 4, 0);
        assert!(matches!(
            cfg.validate(),
            Err(ClusterConfigError::ZeroSize { field: "threads_z" })
        ));
    }

    #[test]
    fn capacity_must_split_into_buckets() {
        let cfg = ClusterConfig::default().with_max_lights_per_cluster(200);
        assert!(matches!(
            cfg.validate(),
            Err(ClusterConfigError::CapacityNotDivisible { .. })
        ));

        let cfg = ClusterConfig::default()
            .with_slices_z(16)
            .with_max_lights_per_cluster(48);
        assert!(matches!(
            cfg.validate(),
            Err(ClusterConfigError::CapacityNotWordAligned { .. })
        ));
    }

    #[test]
    fn too_many_slices_starve_the_bit_capacity() {
        // 256 / 64 = 4 buckets, 128 bits for 256 lights.
        let cfg = ClusterConfig::default().with_slices_z(64);
        assert_eq!(
            cfg.validate(),
            Err(ClusterConfigError::BucketCapacityTooSmall {
                bit_capacity: 128,
                max_lights_per_cluster: 256
            })
        );
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg = ClusterConfig::from_json(r#"{ "variant": "with_decals", "slices_z": 16 }"#)
            .unwrap();
        assert_eq!(cfg.variant, ClusterVariant::WithDecals);
        assert_eq!(cfg.slices_z, 16);
        assert_eq!(cfg.texel_size, CLUSTER_TEXEL_SIZE);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "strata_cluster_config_{}.json",
            std::process::id()
        ));
        let cfg = ClusterConfig::with_decals().with_texel_size(32);
        cfg.to_file(&path).unwrap();
        let loaded = ClusterConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = ClusterConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.json"));
    }
}
