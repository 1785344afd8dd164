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

//! Errors of the clustered lighting lane and its collaborators.

use strata_core::renderer::{ClusterConfigError, ResourceError};
use thiserror::Error;

/// Failure of a clustered lighting operation.
///
/// Every variant is fatal for the frame: the caller is expected to stop
/// rendering through the clustered path rather than retry.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The configuration breaks an invariant the shaders depend on.
    #[error("invalid cluster configuration: {0}")]
    Config(#[from] ClusterConfigError),

    /// The render target has a zero dimension, or needs more clusters than a
    /// `u32` index can address.
    #[error("invalid render target size {width}x{height}")]
    InvalidTargetSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// The adapter cannot run the configured workgroup.
    #[error("adapter '{adapter}' does not support {invocations} invocations per workgroup")]
    WorkgroupTooLarge {
        /// Adapter name.
        adapter: String,
        /// `threads_x * threads_y * threads_z`.
        invocations: u32,
    },

    /// A cluster buffer exceeds the adapter's storage binding limit.
    #[error("{buffer} buffer of {size} bytes exceeds the storage binding limit of '{adapter}'")]
    BufferTooLarge {
        /// Which buffer.
        buffer: &'static str,
        /// Requested size in bytes.
        size: u64,
        /// Adapter name.
        adapter: String,
    },

    /// `initialize` was called on an initialized lane.
    #[error("clustered lighting is already initialized")]
    AlreadyInitialized,

    /// A stage was requested before `initialize` succeeded.
    #[error("clustered lighting is not initialized")]
    NotInitialized,

    /// The camera projection cannot be inverted.
    #[error("camera projection is degenerate")]
    DegenerateCamera,

    /// The backend failed to create, write or destroy a resource.
    #[error("graphics resource error: {0}")]
    Resource(#[from] ResourceError),
}
