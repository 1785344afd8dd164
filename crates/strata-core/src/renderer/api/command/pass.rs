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

//! Descriptors for compute passes.

/// A descriptor for a compute pass.
///
/// Each pass boundary is also a synchronization point: storage writes recorded in
/// one pass are visible to reads in the next pass of the same encoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComputePassDescriptor<'a> {
    /// An optional debug label for the compute pass.
    pub label: Option<&'a str>,
}

impl<'a> ComputePassDescriptor<'a> {
    /// A labelled pass.
    pub const fn labeled(label: &'a str) -> Self {
        Self { label: Some(label) }
    }
}
