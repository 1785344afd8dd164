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

//! Compute pipeline handles and descriptors.
//!
//! The cluster build and light cull stages are both compute pipelines.

use std::borrow::Cow;

use crate::renderer::api::{core::shader::ShaderModuleId, pipeline::layout::PipelineLayoutId};

/// An opaque handle to a compiled compute pipeline state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputePipelineId(pub u64);

/// A descriptor used to create a [`ComputePipelineId`].
#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor<'a> {
    /// An optional debug label for the compute pipeline.
    pub label: Option<Cow<'a, str>>,
    /// The pipeline layout. `None` lets the backend infer it from the shader.
    pub layout: Option<PipelineLayoutId>,
    /// The compiled compute shader module.
    pub shader_module: ShaderModuleId,
    /// The name of the entry point function in the compute shader.
    pub entry_point: Cow<'a, str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_with_explicit_layout() {
        let descriptor = ComputePipelineDescriptor {
            label: Some(Cow::Borrowed("cluster_build")),
            layout: Some(PipelineLayoutId(3)),
            shader_module: ShaderModuleId(7),
            entry_point: Cow::Borrowed("cs_build_clusters"),
        };

        assert_eq!(descriptor.label.as_deref(), Some("cluster_build"));
        assert_eq!(descriptor.layout, Some(PipelineLayoutId(3)));
        assert_eq!(descriptor.entry_point, "cs_build_clusters");
        assert!(ComputePipelineId(1) < ComputePipelineId(2));
    }
}
