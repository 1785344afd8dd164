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

//! Built-in WGSL sources of the clustered lighting stages.
//!
//! The files are fragments: none of them compiles alone. [`compose_build`] and
//! [`compose_cull`] assemble a complete module as
//!
//! ```text
//! constant prelude  +  cluster_common  +  stage fragments
//! ```
//!
//! where the prelude comes from [`ClusterShaderDefines::to_wgsl_prelude`], so the
//! grid constants a pipeline is compiled with are always the ones of the grid it
//! is dispatched over.

use strata_core::renderer::cluster::{ClusterShaderDefines, ClusterVariant};

/// Shared structs, the camera binding and the intersection helpers.
pub const CLUSTER_COMMON_WGSL: &str = include_str!("cluster_common.wgsl");

/// Build stage: writes one view-space AABB per cluster.
pub const CLUSTER_BUILD_WGSL: &str = include_str!("cluster_build.wgsl");

/// Light bindings and the bucket gathering loop of the cull stage.
pub const CLUSTER_LIGHTS_WGSL: &str = include_str!("cluster_lights.wgsl");

/// Cull stage entry point for the lights-only data grid.
pub const CLUSTER_CULL_WGSL: &str = include_str!("cluster_cull.wgsl");

/// Cull stage entry point for the lights-and-decals data grid.
pub const CLUSTER_CULL_DECALS_WGSL: &str = include_str!("cluster_cull_decals.wgsl");

/// Entry point of the build module.
pub const BUILD_ENTRY_POINT: &str = "cs_build";

/// Entry point of the cull module.
pub const CULL_ENTRY_POINT: &str = "cs_cull";

fn compose(defines: &ClusterShaderDefines, fragments: &[&str]) -> String {
    let mut source = defines.to_wgsl_prelude();
    source.push('\n');
    source.push_str(CLUSTER_COMMON_WGSL);
    for fragment in fragments {
        source.push('\n');
        source.push_str(fragment);
    }
    source
}

/// The complete build module for `defines`.
pub fn compose_build(defines: &ClusterShaderDefines) -> String {
    compose(defines, &[CLUSTER_BUILD_WGSL])
}

/// The complete cull module for `defines` and `variant`.
pub fn compose_cull(defines: &ClusterShaderDefines, variant: ClusterVariant) -> String {
    let entry = match variant {
        ClusterVariant::LightsOnly => CLUSTER_CULL_WGSL,
        ClusterVariant::WithDecals => CLUSTER_CULL_DECALS_WGSL,
    };
    compose(defines, &[CLUSTER_LIGHTS_WGSL, entry])
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::cluster::{ClusterConfig, ClusterGrid};

    fn defines(config: &ClusterConfig) -> ClusterShaderDefines {
        ClusterShaderDefines::new(&ClusterGrid::compute(1920, 1080, config), config)
    }

    #[test]
    fn build_module_has_prelude_and_entry_point() {
        let src = compose_build(&defines(&ClusterConfig::default()));
        assert!(src.starts_with("const THREAD_GROUP_SIZE: u32 = 64u;"));
        assert!(src.contains("const CLUSTERS_X: u32 = 30u;"));
        assert!(src.contains(&format!("fn {BUILD_ENTRY_POINT}(")));
        assert!(src.contains("struct ClusterAabb"));
    }

    #[test]
    fn cull_module_matches_the_variant() {
        let lights = compose_cull(&defines(&ClusterConfig::lights_only()), ClusterVariant::LightsOnly);
        assert!(lights.contains("array<u32>;"));
        assert!(!lights.contains("decal_constants"));
        assert!(lights.contains(&format!("fn {CULL_ENTRY_POINT}(")));

        let cfg = ClusterConfig::with_decals();
        let decals = compose_cull(&defines(&cfg), ClusterVariant::WithDecals);
        assert!(decals.contains("array<vec2<u32>>;"));
        assert!(decals.contains("@binding(6)"));
        assert!(decals.contains("const CLUSTER_WITH_DECALS: bool = true;"));
    }

    #[test]
    fn fragments_use_only_prelude_constants() {
        for name in ["CLUSTERS_X", "CLUSTERS_Z", "CLUSTERED_NUM_BUCKETS", "MAX_LIGHTS_PER_CLUSTER"] {
            assert!(!CLUSTER_COMMON_WGSL.contains(&format!("const {name}")));
        }
        assert!(CLUSTER_BUILD_WGSL.contains("@workgroup_size(CLUSTERS_X_THREADS"));
    }
}
