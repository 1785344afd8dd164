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

//! Light and decal descriptions, and the GPU records the cull stage reads.
//!
//! The `*Light` structs are what callers hand to the light manager. The `Gpu*`
//! records and `*Constants` blocks are their packed, shader-facing form; their
//! layouts must match `cluster_common.wgsl`.

use bytemuck::{Pod, Zeroable};

use crate::math::{degrees_to_radians, LinearRgba, Mat4, Vec3};

/// A light infinitely far away, lighting every cluster.
///
/// ```
/// use strata_core::renderer::light::DirectionalLight;
/// use strata_core::math::{Vec3, LinearRgba};
///
/// let sun = DirectionalLight {
///     direction: Vec3::new(-0.5, -1.0, -0.3).normalize(),
///     color: LinearRgba::rgb(1.0, 0.95, 0.8),
///     intensity: 1.0,
/// };
/// assert!(sun.direction.length() > 0.99);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// The direction the light travels (normalized).
    pub direction: Vec3,
    /// The color of the light in linear RGB space.
    pub color: LinearRgba,
    /// Intensity multiplier.
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, -0.5).normalize(),
            color: LinearRgba::WHITE,
            intensity: 1.0,
        }
    }
}

/// A light radiating from a point up to `radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// The color of the light in linear RGB space.
    pub color: LinearRgba,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Distance beyond which the light has no effect. This is the culling sphere.
    pub radius: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: LinearRgba::WHITE,
            intensity: 1.0,
            radius: 5.0,
        }
    }
}

/// A cone light.
///
/// Cone angles are full apertures in **degrees**; the GPU record stores half-angles
/// in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    /// The direction the cone points (normalized).
    pub direction: Vec3,
    /// The color of the light in linear RGB space.
    pub color: LinearRgba,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Reach of the cone. Culled as a sphere of this radius.
    pub radius: f32,
    /// Aperture of the fully lit inner cone, in degrees.
    pub penumbra_degrees: f32,
    /// Aperture of the outer cone, in degrees.
    pub umbra_degrees: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, 0.0),
            color: LinearRgba::WHITE,
            intensity: 1.0,
            radius: 10.0,
            penumbra_degrees: 30.0,
            umbra_degrees: 45.0,
        }
    }
}

/// Discriminant of a packed light, shared with the shader.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// [`PointLight`].
    Point = 1,
    /// [`SpotLight`].
    Spot = 2,
    /// [`DirectionalLight`].
    Directional = 3,
}

/// One light in the storage buffer read by the cull and shading stages.
///
/// 64 bytes, four `vec4` rows.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GpuClusterLight {
    /// World position, `w = 1`.
    pub position: [f32; 4],
    /// World direction, `w = 1`. Unused for point lights.
    pub direction: [f32; 4],
    /// Linear color.
    pub color: [f32; 3],
    /// Intensity multiplier.
    pub intensity: f32,
    /// Culling radius. Ignored for directional lights.
    pub radius: f32,
    /// Inner half-angle in radians (spot only).
    pub penumbra: f32,
    /// Outer half-angle in radians (spot only).
    pub umbra: f32,
    /// A [`LightKind`] discriminant.
    pub kind: u32,
}

impl GpuClusterLight {
    /// Packs a point light at `position`.
    pub fn point(position: Vec3, light: &PointLight) -> Self {
        Self {
            position: [position.x, position.y, position.z, 1.0],
            direction: [0.0, 0.0, 0.0, 1.0],
            color: rgb(light.color),
            intensity: light.intensity,
            radius: light.radius,
            penumbra: 0.0,
            umbra: 0.0,
            kind: LightKind::Point as u32,
        }
    }

    /// Packs a spot light at `position`.
    pub fn spot(position: Vec3, light: &SpotLight) -> Self {
        let d = light.direction.normalize();
        Self {
            position: [position.x, position.y, position.z, 1.0],
            direction: [d.x, d.y, d.z, 1.0],
            color: rgb(light.color),
            intensity: light.intensity,
            radius: light.radius,
            penumbra: degrees_to_radians(light.penumbra_degrees) / 2.0,
            umbra: degrees_to_radians(light.umbra_degrees) / 2.0,
            kind: LightKind::Spot as u32,
        }
    }

    /// Packs a directional light.
    pub fn directional(light: &DirectionalLight) -> Self {
        let d = light.direction.normalize();
        Self {
            position: [0.0, 0.0, 0.0, 1.0],
            direction: [d.x, d.y, d.z, 1.0],
            color: rgb(light.color),
            intensity: light.intensity,
            radius: 0.0,
            penumbra: 0.0,
            umbra: 0.0,
            kind: LightKind::Directional as u32,
        }
    }
}

#[inline]
fn rgb(c: LinearRgba) -> [f32; 3] {
    [c.r, c.g, c.b]
}

/// How fog density grows with distance.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FogType {
    /// Linear ramp up to the fog end.
    Linear = 0,
    /// Exponential falloff driven by density.
    #[default]
    Exponential = 1,
}

/// Global light settings bound next to the light buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightConstants {
    /// `x`: lighting enabled (0/1), `y`: number of lights in the buffer.
    pub settings: [u32; 4],
    /// Ambient color.
    pub ambient: [f32; 4],
    /// Fog color.
    pub fog_color: [f32; 4],
    /// `x`: [`FogType`], `y`: density, `z`: end distance. Negative values disable fog.
    pub fog_settings: [f32; 4],
}

impl Default for LightConstants {
    fn default() -> Self {
        Self {
            settings: [1, 0, 0, 0],
            ambient: [0.01, 0.01, 0.01, 1.0],
            fog_color: [0.0; 4],
            fog_settings: [FogType::Exponential as u32 as f32, -1.0, -1.0, 0.0],
        }
    }
}

/// One decal in the storage buffer.
///
/// A decal projects onto the unit cube `[-0.5, 0.5]^3` of its local space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuDecal {
    /// World to decal-local transform.
    pub world_to_local: [[f32; 4]; 4],
    /// Tint.
    pub color: [f32; 4],
    /// World bounding sphere: center `xyz`, radius `w`.
    pub bounds: [f32; 4],
    /// `x`: atlas index, rest reserved.
    pub data: [u32; 4],
}

impl GpuDecal {
    /// Packs a decal from its local to world `transform`.
    ///
    /// Returns `None` if the transform is singular (a flattened decal).
    pub fn new(transform: &Mat4, color: LinearRgba, atlas_index: u32) -> Option<Self> {
        let world_to_local = transform.inverse()?;
        let center = transform.cols[3].truncate();
        // Half the sum of the edge lengths bounds every corner of the projected cube.
        let radius = 0.5
            * (transform.cols[0].truncate().length()
                + transform.cols[1].truncate().length()
                + transform.cols[2].truncate().length());
        Some(Self {
            world_to_local: world_to_local.to_cols_array_2d(),
            color: color.to_array(),
            bounds: [center.x, center.y, center.z, radius],
            data: [atlas_index, 0, 0, 0],
        })
    }
}

/// Global decal settings: `settings.x` is the decal count.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct DecalConstants {
    /// `x`: number of decals in the buffer.
    pub settings: [u32; 4],
}
