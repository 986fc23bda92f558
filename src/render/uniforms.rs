use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::lighting::{DirectionalLight, Light, LightColor, PointLight, SpotLight};

pub const MAX_POINT_LIGHTS: usize = 4;
pub const MAX_SPOT_LIGHTS: usize = 4;

fn vec4(v: Vec3, w: f32) -> [f32; 4] {
    v.extend(w).to_array()
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuDirectionalLight {
    pub direction: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
}

impl GpuDirectionalLight {
    fn new(light: &DirectionalLight) -> Self {
        let [ambient, diffuse, specular] = colors(&light.color);
        Self {
            direction: vec4(light.direction, 0.0),
            ambient,
            diffuse,
            specular,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuPointLight {
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// constant, linear, quadratic, unused.
    pub attenuation: [f32; 4],
}

impl GpuPointLight {
    fn new(light: &PointLight) -> Self {
        let [ambient, diffuse, specular] = colors(&light.color);
        let a = light.attenuation;
        Self {
            position: vec4(light.position, 1.0),
            ambient,
            diffuse,
            specular,
            attenuation: [a.constant, a.linear, a.quadratic, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuSpotLight {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub attenuation: [f32; 4],
    /// Inner and outer cutoff cosines.
    pub cutoff: [f32; 4],
}

impl GpuSpotLight {
    fn new(light: &SpotLight) -> Self {
        let [ambient, diffuse, specular] = colors(&light.color);
        let a = light.attenuation;
        Self {
            position: vec4(light.position, 1.0),
            direction: vec4(light.direction, 0.0),
            ambient,
            diffuse,
            specular,
            attenuation: [a.constant, a.linear, a.quadratic, 0.0],
            cutoff: [light.inner_cutoff(), light.outer_cutoff(), 0.0, 0.0],
        }
    }
}

fn colors(color: &LightColor) -> [[f32; 4]; 3] {
    [
        vec4(color.ambient, 1.0),
        vec4(color.diffuse, 1.0),
        vec4(color.specular, 1.0),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedLights {
    pub directional: GpuDirectionalLight,
    pub points: [GpuPointLight; MAX_POINT_LIGHTS],
    pub spots: [GpuSpotLight; MAX_SPOT_LIGHTS],
    /// Directional (0 or 1), point and spot counts.
    pub counts: [u32; 4],
    /// Lights that did not fit and were left out.
    pub dropped: usize,
}

pub fn pack_lights(lights: &[Light]) -> PackedLights {
    let mut packed = PackedLights {
        directional: GpuDirectionalLight::default(),
        points: [GpuPointLight::default(); MAX_POINT_LIGHTS],
        spots: [GpuSpotLight::default(); MAX_SPOT_LIGHTS],
        counts: [0; 4],
        dropped: 0,
    };
    for light in lights {
        match light {
            Light::Directional(light) if packed.counts[0] == 0 => {
                packed.directional = GpuDirectionalLight::new(light);
                packed.counts[0] = 1;
            }
            Light::Point(light) if (packed.counts[1] as usize) < MAX_POINT_LIGHTS => {
                packed.points[packed.counts[1] as usize] = GpuPointLight::new(light);
                packed.counts[1] += 1;
            }
            Light::Spot(light) if (packed.counts[2] as usize) < MAX_SPOT_LIGHTS => {
                packed.spots[packed.counts[2] as usize] = GpuSpotLight::new(light);
                packed.counts[2] += 1;
            }
            _ => packed.dropped += 1,
        }
    }
    packed
}

/// Per-frame camera, material and light block (group 0 of the scene,
/// skybox and foliage pipelines).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SceneUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Rotation-only view used by the skybox.
    pub sky_view: [[f32; 4]; 4],
    pub view_position: [f32; 4],
    /// Shininess, bright-pass threshold, unused, unused.
    pub material: [f32; 4],
    pub counts: [u32; 4],
    pub directional: GpuDirectionalLight,
    pub points: [GpuPointLight; MAX_POINT_LIGHTS],
    pub spots: [GpuSpotLight; MAX_SPOT_LIGHTS],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCamera {
    pub view: Mat4,
    pub sky_view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
}

impl SceneUniform {
    pub fn new(camera: &FrameCamera, shininess: f32, threshold: f32, lights: &PackedLights) -> Self {
        Self {
            view: camera.view.to_cols_array_2d(),
            projection: camera.projection.to_cols_array_2d(),
            sky_view: camera.sky_view.to_cols_array_2d(),
            view_position: vec4(camera.position, 1.0),
            material: [shininess, threshold, 0.0, 0.0],
            counts: lights.counts,
            directional: lights.directional,
            points: lights.points,
            spots: lights.spots,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct InstanceUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
}

impl InstanceUniform {
    pub fn new(model: Mat4) -> Self {
        let normal = Mat3::from_mat4(model).inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
        }
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

/// Rounds `size` up to the dynamic offset alignment.
pub fn aligned_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BlurUniform {
    /// Unit texel step: (1, 0) horizontal or (0, 1) vertical.
    pub direction: [f32; 4],
}

impl BlurUniform {
    pub fn new(horizontal: bool) -> Self {
        let direction = if horizontal {
            [1.0, 0.0, 0.0, 0.0]
        } else {
            [0.0, 1.0, 0.0, 0.0]
        };
        Self { direction }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CompositeUniform {
    /// Exposure, bloom flag (0 or 1), unused, unused.
    pub params: [f32; 4],
}

impl CompositeUniform {
    pub fn new(exposure: f32, bloom: bool) -> Self {
        Self {
            params: [exposure, if bloom { 1.0 } else { 0.0 }, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::Attenuation;
    use crate::scene::LightRig;

    #[test]
    fn uniform_sizes_are_vec4_multiples() {
        assert_eq!(std::mem::size_of::<GpuDirectionalLight>(), 64);
        assert_eq!(std::mem::size_of::<GpuPointLight>(), 80);
        assert_eq!(std::mem::size_of::<GpuSpotLight>(), 112);
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<InstanceUniform>(), 112);
    }

    #[test]
    fn rig_packs_into_every_slot_kind() {
        let packed = pack_lights(&LightRig::default().lights());
        assert_eq!(packed.counts, [1, 1, 2, 0]);
        assert_eq!(packed.dropped, 0);
        assert_eq!(packed.points[0].attenuation, [1.0, 0.09, 0.032, 0.0]);
        assert!(packed.spots[0].cutoff[1] <= packed.spots[0].cutoff[0]);
    }

    #[test]
    fn overflowing_lights_are_dropped() {
        let point = Light::Point(PointLight {
            position: Vec3::ZERO,
            color: LightColor::new(Vec3::ZERO, Vec3::ONE, Vec3::ONE),
            attenuation: Attenuation::default(),
        });
        let packed = pack_lights(&vec![point; MAX_POINT_LIGHTS + 2]);
        assert_eq!(packed.counts[1] as usize, MAX_POINT_LIGHTS);
        assert_eq!(packed.dropped, 2);
    }

    #[test]
    fn stride_rounds_to_alignment() {
        assert_eq!(aligned_stride(112, 256), 256);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(300, 256), 512);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let uniform = InstanceUniform::new(Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)));
        assert!((uniform.normal[0][0] - 0.5).abs() < 1e-6);
        assert_eq!(uniform.model[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn blur_and_composite_flags() {
        assert_eq!(BlurUniform::new(true).direction[0], 1.0);
        assert_eq!(BlurUniform::new(false).direction[1], 1.0);
        assert_eq!(CompositeUniform::new(0.5, false).params, [0.5, 0.0, 0.0, 0.0]);
    }
}
