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

use crate::renderer::api::command::{
    BindGroupId, CommandBufferId, ComputePassDescriptor, ComputePipelineId,
};
use std::any::Any;

/// An active compute pass, used for recording dispatch commands.
///
/// The pass ends when the object is dropped.
pub trait ComputePass<'pass> {
    /// Sets the pipeline used by subsequent dispatches.
    fn set_pipeline(&mut self, pipeline: &ComputePipelineId);

    /// Binds a bind group at `@group(index)`.
    fn set_bind_group(&mut self, index: u32, bind_group: &BindGroupId, offsets: &[u32]);

    /// Dispatches `x * y * z` workgroups.
    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32);
}

/// Records a sequence of GPU commands into a [`CommandBufferId`].
///
/// Only one pass can be open at a time since the pass borrows the encoder mutably.
/// Passes recorded one after the other execute in recording order, and storage
/// writes of an earlier pass are visible to later passes.
pub trait CommandEncoder {
    /// Begins a new compute pass.
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'encoder>,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder>;

    /// Finalizes the recording.
    ///
    /// Consumes the encoder; the returned id is submitted through the device.
    fn finish(self: Box<Self>) -> CommandBufferId;

    /// Returns a mutable reference to the underlying trait object as `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
