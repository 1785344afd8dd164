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

//! Small enums shared across the rendering API.

use std::fmt;

/// The graphics API a device runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GraphicsBackendType {
    /// Vulkan.
    Vulkan,
    /// Metal.
    Metal,
    /// Direct3D 12.
    Dx12,
    /// OpenGL / GLES.
    OpenGL,
    /// Browser WebGPU.
    WebGpu,
    /// Anything else, including the no-op backends used in tests.
    #[default]
    Unknown,
}

impl fmt::Display for GraphicsBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GraphicsBackendType::Vulkan => "Vulkan",
            GraphicsBackendType::Metal => "Metal",
            GraphicsBackendType::Dx12 => "DirectX 12",
            GraphicsBackendType::OpenGL => "OpenGL",
            GraphicsBackendType::WebGpu => "WebGPU",
            GraphicsBackendType::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// The physical type of the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RendererDeviceType {
    /// GPU integrated with the CPU.
    IntegratedGpu,
    /// Dedicated GPU.
    DiscreteGpu,
    /// Virtualized GPU.
    VirtualGpu,
    /// Software rasterizer.
    Cpu,
    /// Unknown.
    #[default]
    Unknown,
}

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
    /// Compute stage.
    Compute,
}
