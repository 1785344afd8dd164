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

//! Backend-agnostic rendering contracts for the clustered lighting core.
//!
//! This module defines the "common language" of the GPU side: resource handles
//! and descriptors (`api`), the [`GraphicsDevice`] and [`CommandEncoder`] traits a
//! backend implements, the error hierarchy, and the cluster-specific data layouts.
//! Concrete backends live in `strata-infra`; the lanes in `strata-lanes` only ever
//! talk to these traits.

pub mod api;
pub mod camera;
pub mod cluster;
pub mod error;
pub mod light;
pub mod traits;

pub use self::api::*;
pub use self::camera::{Camera, PerspectiveProjection};
pub use self::cluster::{
    ClusterAabb, ClusterCameraUniforms, ClusterConfig, ClusterConfigError, ClusterGrid,
    ClusterShaderDefines, ClusterVariant,
};
pub use self::error::{PipelineError, RenderError, ResourceError, ShaderError};
pub use self::light::{
    DecalConstants, DirectionalLight, FogType, GpuClusterLight, GpuDecal, LightConstants,
    LightKind, PointLight, SpotLight,
};
pub use self::traits::{CommandEncoder, ComputePass, GraphicsDevice};
