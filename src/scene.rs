use std::fmt;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::lighting::{
    Attenuation, DirectionalLight, Light, LightColor, PointLight, SpotLight,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelId {
    Field,
    Corn,
    HayBale,
    Tractor,
    Barn,
    HayPile,
    Fence,
    Gate,
    WaterBowl,
    Cow,
    Chicken,
}

impl ModelId {
    pub const ALL: [ModelId; 11] = [
        ModelId::Field,
        ModelId::Corn,
        ModelId::HayBale,
        ModelId::Tractor,
        ModelId::Barn,
        ModelId::HayPile,
        ModelId::Fence,
        ModelId::Gate,
        ModelId::WaterBowl,
        ModelId::Cow,
        ModelId::Chicken,
    ];

    /// Directory name under `objects/` holding the mesh and its maps.
    pub fn asset_name(self) -> &'static str {
        match self {
            ModelId::Field => "field",
            ModelId::Corn => "corn",
            ModelId::HayBale => "hay_bale",
            ModelId::Tractor => "tractor",
            ModelId::Barn => "barn",
            ModelId::HayPile => "hay_pile",
            ModelId::Fence => "fence",
            ModelId::Gate => "gate",
            ModelId::WaterBowl => "water_bowl",
            ModelId::Cow => "cow",
            ModelId::Chicken => "chicken",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.asset_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisAngle {
    pub axis: Axis,
    pub degrees: f32,
}

macro_rules! rot {
    ($axis:ident, $degrees:expr) => {
        AxisAngle {
            axis: Axis::$axis,
            degrees: $degrees,
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub name: &'static str,
    pub model: ModelId,
    pub translation: Vec3,
    /// Applied in order, the first entry outermost.
    pub rotations: &'static [AxisAngle],
    pub scale: f32,
}

const fn place(
    name: &'static str,
    model: ModelId,
    translation: [f32; 3],
    rotations: &'static [AxisAngle],
    scale: f32,
) -> Placement {
    Placement {
        name,
        model,
        translation: Vec3::new(translation[0], translation[1], translation[2]),
        rotations,
        scale,
    }
}

const FENCE_ALONG: &[AxisAngle] = &[rot!(Y, 66.0), rot!(X, -90.0)];
const FENCE_ACROSS: &[AxisAngle] = &[rot!(Y, -25.0), rot!(X, -90.0)];

pub const LAYOUT: &[Placement] = &[
    place("field", ModelId::Field, [0.0, 0.0, 0.0], &[rot!(X, 272.0)], 0.4),
    place(
        "hay bale",
        ModelId::HayBale,
        [22.0, 1.2, -0.8],
        &[rot!(X, 60.0), rot!(Y, -30.0)],
        0.005,
    ),
    place("hay bale 2", ModelId::HayBale, [22.5, 1.0, -1.1], &[rot!(Y, 33.0)], 0.005),
    place("hay bale 3", ModelId::HayBale, [22.75, 1.0, -2.8], &[rot!(Y, -37.0)], 0.005),
    place("tractor", ModelId::Tractor, [22.0, 0.9, -11.0], &[rot!(Y, -6.0)], 0.5),
    place("barn", ModelId::Barn, [11.0, 3.33, -7.0], &[rot!(Y, 85.0)], 5.0),
    place(
        "hay pile",
        ModelId::HayPile,
        [23.5, 1.26, -2.0],
        &[rot!(X, -30.0), rot!(Y, -10.0)],
        0.18,
    ),
    place("fence", ModelId::Fence, [12.5, 1.05, -15.3], FENCE_ALONG, 0.5),
    place("fence 2", ModelId::Fence, [10.55, 1.05, -15.4], FENCE_ALONG, 0.5),
    place("fence 3", ModelId::Fence, [8.6, 1.05, -15.48], FENCE_ALONG, 0.5),
    place("fence 4", ModelId::Fence, [6.03, 1.05, -14.61], FENCE_ACROSS, 0.5),
    place("fence 5", ModelId::Fence, [5.97, 1.05, -13.62], FENCE_ACROSS, 0.5),
    place("fence 6", ModelId::Fence, [8.44, 1.05, -12.5], FENCE_ALONG, 0.5),
    place("fence 7", ModelId::Fence, [10.4, 1.05, -12.4], FENCE_ALONG, 0.5),
    place("fence 8", ModelId::Fence, [12.35, 1.05, -12.3], FENCE_ALONG, 0.5),
    place("fence 9", ModelId::Fence, [11.85, 1.05, -13.32], FENCE_ACROSS, 0.5),
    place(
        "gate",
        ModelId::Gate,
        [12.7, 1.0, -14.93],
        &[rot!(Y, -2.0), rot!(X, -90.0)],
        0.21,
    ),
    place(
        "water bowl",
        ModelId::WaterBowl,
        [8.0, 1.14, -15.8],
        &[rot!(Y, -93.0), rot!(X, -90.0)],
        0.6,
    ),
    place("cow", ModelId::Cow, [9.6, 1.0, -14.2], &[rot!(Y, 120.0)], 0.35),
    place("cow 2", ModelId::Cow, [7.4, 1.0, -13.4], &[rot!(Y, 15.0)], 0.35),
    place("chicken", ModelId::Chicken, [14.2, 1.0, -9.6], &[rot!(Y, -40.0)], 0.08),
    place("chicken 2", ModelId::Chicken, [14.9, 1.0, -10.3], &[rot!(Y, 75.0)], 0.08),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPlacement {
    pub model: ModelId,
    pub origin: Vec3,
    pub rows: u32,
    pub columns: u32,
    pub column_step: Vec3,
    pub row_step: Vec3,
    pub rotations: &'static [AxisAngle],
    pub scale: f32,
}

pub const CORN_FIELD: GridPlacement = GridPlacement {
    model: ModelId::Corn,
    origin: Vec3::new(7.4, 2.64, -19.2),
    rows: 9,
    columns: 30,
    column_step: Vec3::new(1.0, 0.0, 0.082),
    row_step: Vec3::new(0.0, 0.02, -1.3),
    rotations: &[rot!(X, 275.0)],
    scale: 0.04,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInstance {
    pub name: String,
    pub model: ModelId,
    pub translation: Vec3,
    pub rotations: Vec<AxisAngle>,
    pub scale: f32,
}

impl SceneInstance {
    fn from_placement(placement: &Placement) -> Self {
        Self {
            name: placement.name.to_string(),
            model: placement.model,
            translation: placement.translation,
            rotations: placement.rotations.to_vec(),
            scale: placement.scale,
        }
    }

    pub fn rotation(&self) -> Quat {
        self.rotations
            .iter()
            .fold(Quat::IDENTITY, |acc, step| {
                acc * Quat::from_axis_angle(step.axis.unit(), step.degrees.to_radians())
            })
    }

    /// `translate * rotate * scale`.
    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            self.rotation(),
            self.translation,
        )
    }
}

/// Number of quads crossed at each grass anchor.
pub const GRASS_QUADS_PER_ANCHOR: u32 = 3;
const GRASS_ANGLE_STEP: f32 = 60.0;
const GRASS_SIZE: f32 = 0.6;

pub const GRASS_ANCHORS: &[[f32; 3]] = &[
    [3.2, 0.55, -2.1],
    [4.1, 0.6, -3.4],
    [2.5, 0.5, -4.0],
    [5.6, 0.65, -1.7],
    [6.3, 0.7, -4.9],
    [1.4, 0.45, -1.2],
    [18.6, 0.9, -4.3],
    [19.7, 0.95, -6.1],
    [20.8, 0.95, -3.5],
    [13.9, 1.0, -16.4],
    [5.1, 1.0, -16.0],
    [16.4, 1.0, -13.2],
];

pub fn grass_transforms() -> Vec<Mat4> {
    GRASS_ANCHORS
        .iter()
        .flat_map(|anchor| {
            let anchor = Vec3::from_array(*anchor);
            (0..GRASS_QUADS_PER_ANCHOR).map(move |i| {
                let angle = (i as f32 * GRASS_ANGLE_STEP).to_radians();
                Mat4::from_scale_rotation_translation(
                    Vec3::splat(GRASS_SIZE),
                    Quat::from_rotation_y(angle),
                    anchor,
                )
            })
        })
        .collect()
}

pub const SUN: DirectionalLight = DirectionalLight {
    direction: Vec3::new(-0.2, -0.1, -0.3),
    color: LightColor::new(Vec3::splat(0.3), Vec3::splat(0.4), Vec3::splat(0.5)),
};

pub const ORBIT_RADIUS: f32 = 4.0;
pub const ORBIT_HEIGHT: f32 = 4.0;

/// Headlight mounting points in the tractor's local frame, before scale.
const HEADLIGHT_OFFSETS: [Vec3; 2] = [Vec3::new(-1.1, 3.2, -3.9), Vec3::new(1.1, 3.2, -3.9)];
const HEADLIGHT_AIM: Vec3 = Vec3::new(0.0, -0.25, -1.0);

/// Runtime light parameters; the positions of the animated lights are
/// recomputed every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightRig {
    pub sun: DirectionalLight,
    pub orbit: PointLight,
    pub headlights: [SpotLight; 2],
}

impl Default for LightRig {
    fn default() -> Self {
        let headlight = SpotLight::from_angles(
            Vec3::ZERO,
            HEADLIGHT_AIM,
            12.5,
            17.5,
            LightColor::new(Vec3::ZERO, Vec3::new(2.4, 2.2, 1.8), Vec3::splat(1.5)),
            Attenuation::new(1.0, 0.09, 0.032),
        );
        Self {
            sun: SUN,
            orbit: PointLight {
                position: Vec3::new(ORBIT_RADIUS, ORBIT_HEIGHT, 0.0),
                color: LightColor::new(Vec3::ZERO, Vec3::splat(0.6), Vec3::ONE),
                attenuation: Attenuation::new(1.0, 0.09, 0.032),
            },
            headlights: [headlight, headlight],
        }
    }
}

impl LightRig {
    /// Moves the orbiting point light to its position at `time` seconds.
    pub fn animate_orbit(&mut self, time: f32) {
        self.orbit.position = Vec3::new(
            ORBIT_RADIUS * time.cos(),
            ORBIT_HEIGHT,
            ORBIT_RADIUS * time.sin(),
        );
    }

    /// Mounts the headlights on `tractor`.
    pub fn follow(&mut self, tractor: &SceneInstance) {
        let transform = tractor.transform();
        let rotation = tractor.rotation();
        for (light, offset) in self.headlights.iter_mut().zip(HEADLIGHT_OFFSETS) {
            light.position = transform.transform_point3(offset);
            light.direction = rotation * HEADLIGHT_AIM.normalize();
        }
    }

    /// The rig as a flat light list, sun first.
    pub fn lights(&self) -> Vec<Light> {
        let mut lights = vec![Light::Directional(self.sun), Light::Point(self.orbit)];
        lights.extend(self.headlights.iter().copied().map(Light::Spot));
        lights
    }
}

/// Everything that gets drawn, plus the light rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub instances: Vec<SceneInstance>,
    pub lights: LightRig,
}

impl Default for Scene {
    fn default() -> Self {
        Self::farm()
    }
}

impl Scene {
    /// Builds the farm from the layout table and the corn grid.
    pub fn farm() -> Self {
        let mut instances: Vec<SceneInstance> =
            LAYOUT.iter().map(SceneInstance::from_placement).collect();
        instances.extend(expand_grid("corn", &CORN_FIELD));
        let mut scene = Self {
            instances,
            lights: LightRig::default(),
        };
        scene.animate(0.0);
        scene
    }

    pub fn instance(&self, name: &str) -> Option<&SceneInstance> {
        self.instances.iter().find(|instance| instance.name == name)
    }

    pub fn instance_mut(&mut self, name: &str) -> Option<&mut SceneInstance> {
        self.instances.iter_mut().find(|instance| instance.name == name)
    }

    /// Advances the animated lights to `time` seconds.
    pub fn animate(&mut self, time: f32) {
        self.lights.animate_orbit(time);
        if let Some(tractor) = self.instances.iter().find(|i| i.model == ModelId::Tractor) {
            self.lights.follow(tractor);
        }
    }

    /// Distinct models used by the instances, in table order.
    pub fn models(&self) -> Vec<ModelId> {
        let mut models: Vec<ModelId> = Vec::new();
        for instance in &self.instances {
            if !models.contains(&instance.model) {
                models.push(instance.model);
            }
        }
        models
    }

    pub fn count(&self, model: ModelId) -> usize {
        self.instances.iter().filter(|i| i.model == model).count()
    }
}

fn expand_grid(prefix: &str, grid: &GridPlacement) -> Vec<SceneInstance> {
    let mut instances = Vec::with_capacity((grid.rows * grid.columns) as usize);
    for row in 0..grid.rows {
        for column in 0..grid.columns {
            let translation =
                grid.origin + grid.row_step * row as f32 + grid.column_step * column as f32;
            instances.push(SceneInstance {
                name: format!("{prefix} {row}:{column}"),
                model: grid.model,
                translation,
                rotations: grid.rotations.to_vec(),
                scale: grid.scale,
            });
        }
    }
    instances
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-4
    }

    #[test]
    fn farm_contains_full_corn_grid() {
        let scene = Scene::farm();
        assert_eq!(scene.count(ModelId::Corn), 270);
        assert_eq!(scene.count(ModelId::Fence), 9);
        assert_eq!(scene.count(ModelId::HayBale), 3);
        assert_eq!(scene.instances.len(), LAYOUT.len() + 270);
    }

    #[test]
    fn corn_grid_steps_match_rows_and_columns() {
        let scene = Scene::farm();
        let first = scene.instance("corn 0:0").unwrap();
        assert!(approx(first.translation, Vec3::new(7.4, 2.64, -19.2)));
        let shifted = scene.instance("corn 2:5").unwrap();
        assert!(approx(
            shifted.translation,
            Vec3::new(7.4 + 5.0, 2.64 + 0.04, -19.2 - 2.6 + 5.0 * 0.082)
        ));
    }

    #[test]
    fn transform_is_translate_rotate_scale() {
        let instance = SceneInstance {
            name: "probe".into(),
            model: ModelId::Fence,
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotations: vec![rot!(Y, 90.0)],
            scale: 2.0,
        };
        let expected = Mat4::from_translation(instance.translation)
            * Mat4::from_rotation_y(90f32.to_radians())
            * Mat4::from_scale(Vec3::splat(2.0));
        let point = Vec3::new(1.0, 0.0, 0.0);
        assert!(approx(
            instance.transform().transform_point3(point),
            expected.transform_point3(point)
        ));
        assert!(approx(
            instance.transform().transform_point3(point),
            Vec3::new(1.0, 2.0, 1.0)
        ));
    }

    #[test]
    fn rotations_apply_in_table_order() {
        let instance = SceneInstance {
            name: "probe".into(),
            model: ModelId::Fence,
            translation: Vec3::ZERO,
            rotations: FENCE_ALONG.to_vec(),
            scale: 1.0,
        };
        let expected =
            Mat4::from_rotation_y(66f32.to_radians()) * Mat4::from_rotation_x(-90f32.to_radians());
        let point = Vec3::new(0.3, 0.7, -0.2);
        assert!(approx(
            instance.transform().transform_point3(point),
            expected.transform_point3(point)
        ));
    }

    #[test]
    fn orbit_light_circles_origin() {
        let mut rig = LightRig::default();
        rig.animate_orbit(std::f32::consts::FRAC_PI_2);
        assert!(approx(rig.orbit.position, Vec3::new(0.0, 4.0, 4.0)));
    }

    #[test]
    fn headlights_follow_tractor() {
        let mut scene = Scene::farm();
        let before = scene.lights.headlights[0].position;
        scene.instance_mut("tractor").unwrap().translation += Vec3::new(0.0, 0.0, 5.0);
        scene.animate(0.0);
        let after = scene.lights.headlights[0].position;
        assert!(approx(after - before, Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn grass_has_quads_per_anchor() {
        assert_eq!(
            grass_transforms().len(),
            GRASS_ANCHORS.len() * GRASS_QUADS_PER_ANCHOR as usize
        );
    }

    #[test]
    fn light_list_has_every_variant() {
        let lights = Scene::farm().lights.lights();
        assert_eq!(lights.len(), 4);
        assert!(matches!(lights[0], Light::Directional(_)));
        assert!(matches!(lights[1], Light::Point(_)));
        assert!(matches!(lights[2], Light::Spot(_)));
    }
}
