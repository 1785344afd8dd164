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

//! The camera consumed by the clustering stages.
//!
//! Cluster bounds depend only on the projection, so the camera stamps every
//! projection it takes with a [`Camera::projection_generation`]. Stamps come from
//! one process-wide counter: two cameras, or two clones that changed separately,
//! never share a stamp for different projections. Consumers compare stamps
//! instead of comparing matrices float by float.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::math::{degrees_to_radians, Mat4, Vec3};

/// Parameters of a right-handed perspective projection with `[0, 1]` depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveProjection {
    /// Vertical field of view in radians.
    pub fov_y_radians: f32,
    /// Width divided by height.
    pub aspect_ratio: f32,
    /// Distance to the near plane. Must be positive.
    pub z_near: f32,
    /// Distance to the far plane. Must exceed `z_near`.
    pub z_far: f32,
}

impl Default for PerspectiveProjection {
    fn default() -> Self {
        Self {
            fov_y_radians: degrees_to_radians(60.0),
            aspect_ratio: 16.0 / 9.0,
            z_near: 0.1,
            z_far: 1000.0,
        }
    }
}

impl PerspectiveProjection {
    /// The projection matrix, `None` for degenerate parameters.
    pub fn matrix(&self) -> Option<Mat4> {
        Mat4::perspective_rh_zo(
            self.fov_y_radians,
            self.aspect_ratio,
            self.z_near,
            self.z_far,
        )
    }
}

static NEXT_PROJECTION_GENERATION: AtomicU64 = AtomicU64::new(0);

fn next_projection_generation() -> u64 {
    NEXT_PROJECTION_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// A perspective camera with a process-unique projection stamp.
///
/// Clones share the stamp until one of them changes its projection.
#[derive(Debug, Clone)]
pub struct Camera {
    projection: PerspectiveProjection,
    view: Mat4,
    position: Vec3,
    projection_generation: u64,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(PerspectiveProjection::default())
    }
}

impl Camera {
    /// A camera at the origin looking down `-Z`.
    pub fn new(projection: PerspectiveProjection) -> Self {
        Self {
            projection,
            view: Mat4::IDENTITY,
            position: Vec3::ZERO,
            projection_generation: next_projection_generation(),
        }
    }

    /// Current projection parameters.
    pub fn projection(&self) -> &PerspectiveProjection {
        &self.projection
    }

    /// Stamp of the current projection, replaced on every real projection change.
    pub fn projection_generation(&self) -> u64 {
        self.projection_generation
    }

    /// Replaces the projection. Takes a new stamp only if a value differs.
    pub fn set_projection(&mut self, projection: PerspectiveProjection) {
        if projection != self.projection {
            self.projection = projection;
            self.projection_generation = next_projection_generation();
        }
    }

    /// Sets the vertical field of view in radians.
    pub fn set_fov_y(&mut self, fov_y_radians: f32) {
        self.set_projection(PerspectiveProjection {
            fov_y_radians,
            ..self.projection
        });
    }

    /// Sets the near and far clip distances.
    pub fn set_clip_planes(&mut self, z_near: f32, z_far: f32) {
        self.set_projection(PerspectiveProjection {
            z_near,
            z_far,
            ..self.projection
        });
    }

    /// Sets the aspect ratio.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.set_projection(PerspectiveProjection {
            aspect_ratio,
            ..self.projection
        });
    }

    /// Derives the aspect ratio from a viewport. Zero-sized viewports are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.set_aspect_ratio(width as f32 / height as f32);
    }

    /// Replaces the view matrix. Does not touch the projection generation.
    pub fn set_view(&mut self, view: Mat4) {
        self.view = view;
        if let Some(inv) = view.inverse() {
            self.position = inv.cols[3].truncate();
        }
    }

    /// Points the camera from `eye` at `target`.
    ///
    /// Returns `false` and keeps the previous view when the orientation is degenerate.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) -> bool {
        match Mat4::look_at_rh(eye, target, up) {
            Some(view) => {
                self.view = view;
                self.position = eye;
                true
            }
            None => false,
        }
    }

    /// World to view transform.
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// World-space position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// View to clip transform, `None` for degenerate parameters.
    pub fn projection_matrix(&self) -> Option<Mat4> {
        self.projection.matrix()
    }

    /// Clip to view transform.
    pub fn inverse_projection(&self) -> Option<Mat4> {
        self.projection_matrix()?.inverse()
    }
}
