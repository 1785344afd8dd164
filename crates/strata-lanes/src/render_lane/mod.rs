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

//! Rendering lanes.
//!
//! [`ClusteredLightingLane`] partitions the view frustum into clusters and
//! records, per cluster, which lights and decals can touch it. Shading passes
//! downstream read the results through [`ClusterBufferViews`](strata_core::lane::ClusterBufferViews).

mod clustered_lane;
mod decal_manager;
mod error;
mod light_manager;
mod projection_cache;
pub mod shaders;

pub use clustered_lane::*;
pub use decal_manager::*;
pub use error::*;
pub use light_manager::*;
pub use projection_cache::*;
