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

//! Defines the column-major [`Mat4`] used for camera and decal transforms.

use super::{Vec3, Vec4, EPSILON};
use std::ops::Mul;

/// A 4x4 column-major matrix.
///
/// The memory layout matches what WGSL expects for `mat4x4<f32>`, so
/// [`to_cols_array_2d`](Mat4::to_cols_array_2d) can be uploaded as is.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Mat4 {
    /// The columns of the matrix. `cols[3]` holds the translation of an affine transform.
    pub cols: [Vec4; 4],
}

impl Mat4 {
    /// The identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };

    /// Creates a matrix from four columns.
    #[inline]
    pub const fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Creates a matrix from a column-major `[[f32; 4]; 4]`.
    #[inline]
    pub fn from_cols_array_2d(m: &[[f32; 4]; 4]) -> Self {
        let col = |c: &[f32; 4]| Vec4::new(c[0], c[1], c[2], c[3]);
        Self::from_cols(col(&m[0]), col(&m[1]), col(&m[2]), col(&m[3]))
    }

    /// A translation matrix.
    #[inline]
    pub const fn from_translation(t: Vec3) -> Self {
        Self::from_cols(Vec4::X, Vec4::Y, Vec4::Z, Vec4::from_vec3(t, 1.0))
    }

    /// A non-uniform scale matrix.
    #[inline]
    pub const fn from_scale(s: Vec3) -> Self {
        Self::from_cols(
            Vec4::new(s.x, 0.0, 0.0, 0.0),
            Vec4::new(0.0, s.y, 0.0, 0.0),
            Vec4::new(0.0, 0.0, s.z, 0.0),
            Vec4::W,
        )
    }

    /// Right-handed perspective projection mapping depth to `[0, 1]`.
    ///
    /// Returns `None` when the parameters cannot describe a frustum
    /// (non-positive near plane, far not beyond near, degenerate fov or aspect).
    pub fn perspective_rh_zo(
        fov_y_radians: f32,
        aspect_ratio: f32,
        z_near: f32,
        z_far: f32,
    ) -> Option<Self> {
        if z_near <= 0.0 || z_far <= z_near || aspect_ratio <= 0.0 || fov_y_radians <= 0.0 {
            return None;
        }
        let f = 1.0 / (0.5 * fov_y_radians).tan();
        let range = z_far / (z_near - z_far);

        Some(Self::from_cols(
            Vec4::new(f / aspect_ratio, 0.0, 0.0, 0.0),
            Vec4::new(0.0, f, 0.0, 0.0),
            Vec4::new(0.0, 0.0, range, -1.0),
            Vec4::new(0.0, 0.0, range * z_near, 0.0),
        ))
    }

    /// Right-handed view matrix looking from `eye` towards `target`.
    ///
    /// Returns `None` if `eye == target` or `up` is parallel to the view direction.
    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let forward = target - eye;
        if forward.length_squared() < EPSILON * EPSILON {
            return None;
        }
        let f = forward.normalize();
        let side = f.cross(up);
        if side.length_squared() < EPSILON * EPSILON {
            return None;
        }
        let s = side.normalize();
        let u = s.cross(f);

        Some(Self::from_cols(
            Vec4::new(s.x, u.x, -f.x, 0.0),
            Vec4::new(s.y, u.y, -f.y, 0.0),
            Vec4::new(s.z, u.z, -f.z, 0.0),
            Vec4::new(-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0),
        ))
    }

    /// Row `index` of the matrix.
    #[inline]
    pub fn row(&self, index: usize) -> Vec4 {
        let pick = |c: &Vec4| c.to_array()[index];
        Vec4::new(
            pick(&self.cols[0]),
            pick(&self.cols[1]),
            pick(&self.cols[2]),
            pick(&self.cols[3]),
        )
    }

    /// General inverse, `None` for a singular matrix.
    ///
    /// Expands along 2x2 sub-determinants, so each one is computed once.
    pub fn inverse(&self) -> Option<Self> {
        let [a, b, c, d] = self.cols.map(Vec4::to_array);

        let s0 = a[0] * b[1] - b[0] * a[1];
        let s1 = a[0] * b[2] - b[0] * a[2];
        let s2 = a[0] * b[3] - b[0] * a[3];
        let s3 = a[1] * b[2] - b[1] * a[2];
        let s4 = a[1] * b[3] - b[1] * a[3];
        let s5 = a[2] * b[3] - b[2] * a[3];

        let c5 = c[2] * d[3] - d[2] * c[3];
        let c4 = c[1] * d[3] - d[1] * c[3];
        let c3 = c[1] * d[2] - d[1] * c[2];
        let c2 = c[0] * d[3] - d[0] * c[3];
        let c1 = c[0] * d[2] - d[0] * c[2];
        let c0 = c[0] * d[1] - d[0] * c[1];

        let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv = 1.0 / det;

        // Element (row r, column k) of the inverse lands in cols[k][r].
        let col0 = Vec4::new(
            (b[1] * c5 - b[2] * c4 + b[3] * c3) * inv,
            (-a[1] * c5 + a[2] * c4 - a[3] * c3) * inv,
            (d[1] * s5 - d[2] * s4 + d[3] * s3) * inv,
            (-c[1] * s5 + c[2] * s4 - c[3] * s3) * inv,
        );
        let col1 = Vec4::new(
            (-b[0] * c5 + b[2] * c2 - b[3] * c1) * inv,
            (a[0] * c5 - a[2] * c2 + a[3] * c1) * inv,
            (-d[0] * s5 + d[2] * s2 - d[3] * s1) * inv,
            (c[0] * s5 - c[2] * s2 + c[3] * s1) * inv,
        );
        let col2 = Vec4::new(
            (b[0] * c4 - b[1] * c2 + b[3] * c0) * inv,
            (-a[0] * c4 + a[1] * c2 - a[3] * c0) * inv,
            (d[0] * s4 - d[1] * s2 + d[3] * s0) * inv,
            (-c[0] * s4 + c[1] * s2 - c[3] * s0) * inv,
        );
        let col3 = Vec4::new(
            (-b[0] * c3 + b[1] * c1 - b[2] * c0) * inv,
            (a[0] * c3 - a[1] * c1 + a[2] * c0) * inv,
            (-d[0] * s3 + d[1] * s1 - d[2] * s0) * inv,
            (c[0] * s3 - c[1] * s1 + c[2] * s0) * inv,
        );

        Some(Self::from_cols(col0, col1, col2, col3).transpose())
    }

    /// Swaps rows and columns.
    #[inline]
    pub fn transpose(&self) -> Self {
        Self::from_cols(self.row(0), self.row(1), self.row(2), self.row(3))
    }

    /// Transforms a point (`w = 1`), without perspective division.
    #[inline]
    pub fn transform_point3(&self, p: Vec3) -> Vec3 {
        (*self * Vec4::from_vec3(p, 1.0)).truncate()
    }

    /// The columns as nested arrays, ready for a uniform upload.
    #[inline]
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        self.cols.map(Vec4::to_array)
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Mat4) -> Self {
        Self {
            cols: rhs.cols.map(|c| self * c),
        }
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    #[inline]
    fn mul(self, rhs: Vec4) -> Vec4 {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z + self.cols[3] * rhs.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::FRAC_PI_4;
    use approx::assert_relative_eq;

    fn assert_mat_eq(a: &Mat4, b: &Mat4) {
        for (ca, cb) in a.to_cols_array_2d().iter().zip(b.to_cols_array_2d().iter()) {
            for (x, y) in ca.iter().zip(cb.iter()) {
                assert_relative_eq!(x, y, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn perspective_maps_near_and_far_to_unit_depth() {
        let proj = Mat4::perspective_rh_zo(FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0).unwrap();

        let near = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn perspective_rejects_degenerate_frusta() {
        assert!(Mat4::perspective_rh_zo(FRAC_PI_4, 1.0, 0.0, 10.0).is_none());
        assert!(Mat4::perspective_rh_zo(FRAC_PI_4, 1.0, 10.0, 1.0).is_none());
        assert!(Mat4::perspective_rh_zo(FRAC_PI_4, 0.0, 0.1, 10.0).is_none());
    }

    #[test]
    fn inverse_of_projection_round_trips() {
        let proj = Mat4::perspective_rh_zo(1.0, 1.5, 0.5, 250.0).unwrap();
        let inv = proj.inverse().unwrap();
        assert_mat_eq(&(proj * inv), &Mat4::IDENTITY);
        assert_mat_eq(&(inv * proj), &Mat4::IDENTITY);
    }

    #[test]
    fn inverse_of_affine_transform() {
        let m = Mat4::from_translation(Vec3::new(1.0, -2.0, 3.0))
            * Mat4::from_scale(Vec3::new(2.0, 4.0, 0.5));
        let inv = m.inverse().unwrap();
        let p = Vec3::new(0.25, 7.0, -1.0);
        let back = inv.transform_point3(m.transform_point3(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-5);
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let m = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(m.inverse().is_none());
    }

    #[test]
    fn look_at_moves_target_onto_negative_z() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y).unwrap();
        let target = view.transform_point3(Vec3::ZERO);
        assert_relative_eq!(target.z, -5.0, epsilon = 1e-5);
        assert!(Mat4::look_at_rh(Vec3::ZERO, Vec3::ZERO, Vec3::Y).is_none());
        assert!(Mat4::look_at_rh(Vec3::ZERO, Vec3::Y, Vec3::Y).is_none());
    }
}
