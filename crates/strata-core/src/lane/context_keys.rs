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

//! Context key types for [`LaneContext`](super::LaneContext).
//!
//! Owners insert these newtypes before calling a lane; lanes may insert their
//! outputs for the passes that follow.
//!
//! | Key                     | Direction | Meaning                                  |
//! |-------------------------|-----------|------------------------------------------|
//! | [`RenderTargetSize`]    | in        | Pixel size of the frame being rendered    |
//! | [`ClusterBufferViews`]  | out       | Read-only cluster outputs for shading     |
//!
//! The device (`Arc<dyn GraphicsDevice>`), the encoder (`Slot<dyn CommandEncoder>`)
//! and the camera (`Ref<Camera>`) are inserted directly by type.

use crate::renderer::api::resource::BufferView;

/// Size of the render target in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Read-only views of the cluster outputs, written by the clustered lane after
/// `execute()` for the shading pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterBufferViews {
    /// Per-cluster AABBs.
    pub clusters: BufferView,
    /// Per-cluster light (and decal) buckets.
    pub data_grid: BufferView,
}
