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

//! Typed views over storage buffers.
//!
//! A storage buffer is bound either for writing (`read_write`, the unordered-access
//! view) or for reading (`read`, the shader-resource view). The two views of one
//! buffer share the same [`BufferId`]; the access mode decides the binding type the
//! consumer must declare.

use super::buffer::BufferId;
use crate::renderer::api::command::BufferBindingType;

/// How a shader may touch a buffer through a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferAccess {
    /// `var<storage, read>`.
    ReadOnly,
    /// `var<storage, read_write>`.
    ReadWrite,
}

/// One access mode over a storage buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferView {
    /// The underlying buffer.
    pub buffer: BufferId,
    /// The access mode granted by this view.
    pub access: BufferAccess,
}

impl BufferView {
    /// The read-only view of `buffer`.
    pub const fn read_only(buffer: BufferId) -> Self {
        Self {
            buffer,
            access: BufferAccess::ReadOnly,
        }
    }

    /// The read-write view of `buffer`.
    pub const fn read_write(buffer: BufferId) -> Self {
        Self {
            buffer,
            access: BufferAccess::ReadWrite,
        }
    }

    /// `true` for the read-only view.
    pub const fn is_read_only(&self) -> bool {
        matches!(self.access, BufferAccess::ReadOnly)
    }

    /// The layout binding type a consumer must declare for this view.
    pub const fn binding_type(&self) -> BufferBindingType {
        BufferBindingType::Storage {
            read_only: self.is_read_only(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_share_the_buffer() {
        let ro = BufferView::read_only(BufferId(3));
        let rw = BufferView::read_write(BufferId(3));
        assert_eq!(ro.buffer, rw.buffer);
        assert_ne!(ro, rw);
        assert_eq!(ro.binding_type(), BufferBindingType::Storage { read_only: true });
        assert_eq!(rw.binding_type(), BufferBindingType::Storage { read_only: false });
    }
}
