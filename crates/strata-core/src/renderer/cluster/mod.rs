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

//! Data structures for clustered light culling.
//!
//! The view frustum is split into `tiles_x * tiles_y` screen tiles of
//! [`CLUSTER_TEXEL_SIZE`] pixels and `slices_z` exponential depth slices. A build
//! pass writes one [`ClusterAabb`] per cell; a cull pass writes, per cell, bitmask
//! buckets of the lights (and decals) overlapping it.
//!
//! # Data grid layout
//!
//! Each cluster owns `max_lights_per_cluster / slices_z` 32-bit buckets; bit `i`
//! of the cluster's bucket `i / 32` is set when light `i` touches the cluster.
//! The decal variant interleaves a second bucket per element for decals.

pub mod config;
pub mod defines;
pub mod grid;
pub mod uniforms;

pub use self::config::{ClusterConfig, ClusterConfigError, ClusterVariant};
pub use self::defines::ClusterShaderDefines;
pub use self::grid::{ClusterAabb, ClusterGrid};
pub use self::uniforms::ClusterCameraUniforms;

/// Side of a screen-space cluster tile in pixels.
pub const CLUSTER_TEXEL_SIZE: u32 = 64;
/// Number of depth slices.
pub const CLUSTERS_Z: u32 = 32;
/// Workgroup width of the cluster stages.
pub const CLUSTERS_X_THREADS: u32 = 4;
/// Workgroup height of the cluster stages.
pub const CLUSTERS_Y_THREADS: u32 = 4;
/// Workgroup depth of the cluster stages.
pub const CLUSTERS_Z_THREADS: u32 = 4;
/// Invocations per workgroup.
pub const THREAD_GROUP_SIZE: u32 = CLUSTERS_X_THREADS * CLUSTERS_Y_THREADS * CLUSTERS_Z_THREADS;
/// Light index capacity of one cluster.
pub const MAX_LIGHTS_PER_CLUSTER: u32 = 256;
/// Bits in one data grid bucket.
pub const BITS_PER_BUCKET: u32 = 32;
