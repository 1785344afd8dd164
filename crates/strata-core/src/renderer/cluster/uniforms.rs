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

//! Camera uniform block shared by the build and cull stages.

use bytemuck::{Pod, Zeroable};

use crate::math::Mat4;
use crate::renderer::camera::Camera;

/// Camera data bound at `@group(0) @binding(0)` of both cluster stages.
///
/// The layout must match `ClusterCamera` in `cluster_common.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ClusterCameraUniforms {
    /// World to view.
    pub view: [[f32; 4]; 4],
    /// View to clip.
    pub projection: [[f32; 4]; 4],
    /// Clip to view, used to unproject tile corners.
    pub inverse_projection: [[f32; 4]; 4],
    /// Render target size in pixels.
    pub screen_size: [f32; 2],
    /// `1 / screen_size`.
    pub inverse_screen_size: [f32; 2],
    /// Near plane distance.
    pub z_near: f32,
    /// Far plane distance.
    pub z_far: f32,
    /// Pads the block to 16 bytes.
    pub _padding: [f32; 2],
}

impl ClusterCameraUniforms {
    /// Packs the camera for a `width` x `height` target.
    ///
    /// Returns `None` if the camera projection is degenerate.
    pub fn from_camera(camera: &Camera, width: u32, height: u32) -> Option<Self> {
        let projection = camera.projection_matrix()?;
        let inverse_projection = projection.inverse()?;
        Some(Self::from_matrices(
            camera.view_matrix(),
            projection,
            inverse_projection,
            [width, height],
            camera.projection().z_near,
            camera.projection().z_far,
        ))
    }

    /// Packs explicit matrices.
    pub fn from_matrices(
        view: Mat4,
        projection: Mat4,
        inverse_projection: Mat4,
        screen: [u32; 2],
        z_near: f32,
        z_far: f32,
    ) -> Self {
        let w = screen[0].max(1) as f32;
        let h = screen[1].max(1) as f32;
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            inverse_projection: inverse_projection.to_cols_array_2d(),
            screen_size: [w, h],
            inverse_screen_size: [1.0 / w, 1.0 / h],
            z_near,
            z_far,
            _padding: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::camera::PerspectiveProjection;
    use approx::assert_relative_eq;

    #[test]
    fn block_is_16_byte_sized() {
        assert_eq!(std::mem::size_of::<ClusterCameraUniforms>(), 224);
        assert_eq!(std::mem::size_of::<ClusterCameraUniforms>() % 16, 0);
    }

    #[test]
    fn packs_screen_and_planes() {
        let camera = Camera::new(PerspectiveProjection {
            z_near: 0.5,
            z_far: 300.0,
            ..Default::default()
        });
        let u = ClusterCameraUniforms::from_camera(&camera, 1920, 1080).unwrap();
        assert_eq!(u.screen_size, [1920.0, 1080.0]);
        assert_relative_eq!(u.inverse_screen_size[0], 1.0 / 1920.0);
        assert_eq!((u.z_near, u.z_far), (0.5, 300.0));
        assert_eq!(u.view, Mat4::IDENTITY.to_cols_array_2d());
    }

    #[test]
    fn degenerate_camera_has_no_uniforms() {
        let mut camera = Camera::default();
        camera.set_clip_planes(0.0, 10.0);
        assert!(ClusterCameraUniforms::from_camera(&camera, 800, 600).is_none());
    }
}
