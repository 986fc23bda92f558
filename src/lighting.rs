use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightColor {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl LightColor {
    pub const fn new(ambient: Vec3, diffuse: Vec3, specular: Vec3) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    pub const fn new(constant: f32, linear: f32, quadratic: f32) -> Self {
        Self {
            constant,
            linear,
            quadratic,
        }
    }

    /// `1 / (constant + linear * d + quadratic * d^2)`.
    pub fn factor(&self, distance: f32) -> f32 {
        let denominator =
            self.constant + self.linear * distance + self.quadratic * distance * distance;
        if denominator <= 0.0 {
            return f32::MAX;
        }
        1.0 / denominator
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Self::new(1.0, 0.09, 0.032)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Direction the light travels in (from the light towards the scene).
    pub direction: Vec3,
    pub color: LightColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub color: LightColor,
    pub attenuation: Attenuation,
}

/// Cone light. Cutoffs are stored as cosines of the half angles, so the
/// outer cutoff is always the smaller value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    inner_cutoff: f32,
    outer_cutoff: f32,
    pub color: LightColor,
    pub attenuation: Attenuation,
}

impl SpotLight {
    /// Builds a spot light from half angles in degrees. The wider of the two
    /// angles always becomes the outer cone.
    pub fn from_angles(
        position: Vec3,
        direction: Vec3,
        inner_degrees: f32,
        outer_degrees: f32,
        color: LightColor,
        attenuation: Attenuation,
    ) -> Self {
        let mut spot = Self {
            position,
            direction,
            inner_cutoff: 1.0,
            outer_cutoff: 1.0,
            color,
            attenuation,
        };
        spot.set_cutoffs(
            inner_degrees.to_radians().cos(),
            outer_degrees.to_radians().cos(),
        );
        spot
    }

    /// Sets both cutoff cosines, ordering them so `outer <= inner`.
    pub fn set_cutoffs(&mut self, inner: f32, outer: f32) {
        self.inner_cutoff = inner.max(outer).clamp(-1.0, 1.0);
        self.outer_cutoff = inner.min(outer).clamp(-1.0, 1.0);
    }

    pub fn inner_cutoff(&self) -> f32 {
        self.inner_cutoff
    }

    pub fn outer_cutoff(&self) -> f32 {
        self.outer_cutoff
    }

    /// Edge falloff for a fragment whose light vector makes `cos_theta`
    /// with the spot axis.
    pub fn intensity(&self, cos_theta: f32) -> f32 {
        spot_intensity(cos_theta, self.inner_cutoff, self.outer_cutoff)
    }
}

/// `clamp((cos_theta - outer) / (inner - outer), 0, 1)`.
pub fn spot_intensity(cos_theta: f32, inner: f32, outer: f32) -> f32 {
    let epsilon = inner - outer;
    if epsilon <= f32::EPSILON {
        return if cos_theta >= inner { 1.0 } else { 0.0 };
    }
    ((cos_theta - outer) / epsilon).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Light {
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Light {
    /// Contribution of this light to `fragment` seen from `view_position`.
    pub fn contribution(&self, fragment: &Fragment, view_position: Vec3) -> Vec3 {
        let normal = fragment.normal.normalize_or_zero();
        let view_dir = (view_position - fragment.position).normalize_or_zero();
        match self {
            Light::Directional(light) => {
                let light_dir = (-light.direction).normalize_or_zero();
                phong(&light.color, fragment, normal, light_dir, view_dir)
            }
            Light::Point(light) => {
                let offset = light.position - fragment.position;
                let light_dir = offset.normalize_or_zero();
                let falloff = light.attenuation.factor(offset.length());
                phong(&light.color, fragment, normal, light_dir, view_dir) * falloff
            }
            Light::Spot(light) => {
                let offset = light.position - fragment.position;
                let light_dir = offset.normalize_or_zero();
                let cos_theta = light_dir.dot((-light.direction).normalize_or_zero());
                let intensity = light.intensity(cos_theta);
                if intensity <= 0.0 {
                    return Vec3::ZERO;
                }
                let falloff = light.attenuation.factor(offset.length());
                phong(&light.color, fragment, normal, light_dir, view_dir) * falloff * intensity
            }
        }
    }
}

fn phong(
    color: &LightColor,
    fragment: &Fragment,
    normal: Vec3,
    light_dir: Vec3,
    view_dir: Vec3,
) -> Vec3 {
    let ambient = color.ambient * fragment.albedo;
    let n_dot_l = normal.dot(light_dir);
    if n_dot_l <= 0.0 {
        return ambient;
    }
    let diffuse = color.diffuse * n_dot_l * fragment.albedo;
    let reflected = reflect(-light_dir, normal);
    let spec = reflected.dot(view_dir).max(0.0).powf(fragment.shininess);
    let specular = color.specular * spec * fragment.specular;
    ambient + diffuse + specular
}

fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

pub fn shade(lights: &[Light], fragment: &Fragment, view_position: Vec3) -> Vec3 {
    lights
        .iter()
        .map(|light| light.contribution(fragment, view_position))
        .fold(Vec3::ZERO, |acc, c| acc + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_fragment(normal: Vec3) -> Fragment {
        Fragment {
            position: Vec3::ZERO,
            normal,
            albedo: Vec3::ONE,
            specular: Vec3::ONE,
            shininess: 32.0,
        }
    }

    fn diffuse_only() -> LightColor {
        LightColor::new(Vec3::ZERO, Vec3::ONE, Vec3::ZERO)
    }

    #[test]
    fn attenuation_never_increases_with_distance() {
        let attenuation = Attenuation::new(1.0, 0.09, 0.032);
        let mut previous = attenuation.factor(0.01);
        for step in 1..200 {
            let current = attenuation.factor(step as f32 * 0.5);
            assert!(current <= previous);
            previous = current;
        }
        assert!((attenuation.factor(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn attenuation_without_constant_term_falls_off_near_the_light() {
        let attenuation = Attenuation::new(0.0, 0.09, 0.032);
        let mut previous = attenuation.factor(0.0);
        assert_eq!(previous, f32::MAX);
        for exponent in -70..=-30 {
            let current = attenuation.factor(10f32.powf(exponent as f32 / 10.0));
            assert!(current <= previous, "{current} > {previous}");
            previous = current;
        }
    }

    #[test]
    fn spot_intensity_is_clamped_and_continuous() {
        let inner = 12.5f32.to_radians().cos();
        let outer = 17.5f32.to_radians().cos();
        assert_eq!(spot_intensity(1.0, inner, outer), 1.0);
        assert_eq!(spot_intensity(inner, inner, outer), 1.0);
        assert_eq!(spot_intensity(outer, inner, outer), 0.0);
        assert_eq!(spot_intensity(0.0, inner, outer), 0.0);
        let mid = (inner + outer) * 0.5;
        assert!((spot_intensity(mid, inner, outer) - 0.5).abs() < 1e-4);
        assert!((spot_intensity(inner - 1e-6, inner, outer) - 1.0).abs() < 1e-3);
        assert!(spot_intensity(outer + 1e-6, inner, outer) < 1e-3);
    }

    #[test]
    fn spot_cutoffs_are_ordered() {
        let spot = SpotLight::from_angles(
            Vec3::ZERO,
            Vec3::NEG_Z,
            30.0,
            10.0,
            diffuse_only(),
            Attenuation::default(),
        );
        assert!(spot.outer_cutoff() <= spot.inner_cutoff());
    }

    #[test]
    fn lambertian_surface_facing_directional_light_is_fully_lit() {
        let light = Light::Directional(DirectionalLight {
            direction: Vec3::NEG_Y,
            color: diffuse_only(),
        });
        let fragment = white_fragment(Vec3::Y);
        let color = shade(&[light], &fragment, Vec3::new(0.0, 0.0, 3.0));
        assert!((color - Vec3::ONE).abs().max_element() < 1e-6);
    }

    #[test]
    fn back_facing_fragment_only_gets_ambient() {
        let light = Light::Directional(DirectionalLight {
            direction: Vec3::Y,
            color: LightColor::new(Vec3::splat(0.1), Vec3::ONE, Vec3::ONE),
        });
        let color = light.contribution(&white_fragment(Vec3::Y), Vec3::new(0.0, 1.0, 0.0));
        assert!((color - Vec3::splat(0.1)).abs().max_element() < 1e-6);
    }

    #[test]
    fn point_light_is_attenuated() {
        let attenuation = Attenuation::new(1.0, 0.0, 1.0);
        let light = Light::Point(PointLight {
            position: Vec3::new(0.0, 2.0, 0.0),
            color: diffuse_only(),
            attenuation,
        });
        let color = light.contribution(&white_fragment(Vec3::Y), Vec3::new(0.0, 5.0, 0.0));
        assert!((color.x - 0.2).abs() < 1e-5);
    }

    #[test]
    fn fragment_outside_spot_cone_is_dark() {
        let spot = Light::Spot(SpotLight::from_angles(
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            10.0,
            15.0,
            LightColor::new(Vec3::ONE, Vec3::ONE, Vec3::ONE),
            Attenuation::new(1.0, 0.0, 0.0),
        ));
        let color = spot.contribution(&white_fragment(Vec3::Y), Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(color, Vec3::ZERO);
    }

    #[test]
    fn lights_accumulate_additively() {
        let light = Light::Directional(DirectionalLight {
            direction: Vec3::NEG_Y,
            color: LightColor::new(Vec3::splat(0.25), Vec3::ZERO, Vec3::ZERO),
        });
        let fragment = white_fragment(Vec3::Y);
        let single = shade(&[light], &fragment, Vec3::Y);
        let double = shade(&[light, light], &fragment, Vec3::Y);
        assert!((double - single * 2.0).abs().max_element() < 1e-6);
    }
}
