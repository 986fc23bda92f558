macro_rules! scene_common {
    () => {
        r#"
struct DirectionalLight {
    direction: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
}

struct PointLight {
    position: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    attenuation: vec4<f32>,
}

struct SpotLight {
    position: vec4<f32>,
    direction: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    attenuation: vec4<f32>,
    cutoff: vec4<f32>,
}

struct SceneUniform {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    sky_view: mat4x4<f32>,
    view_position: vec4<f32>,
    material: vec4<f32>,
    counts: vec4<u32>,
    directional: DirectionalLight,
    points: array<PointLight, 4>,
    spots: array<SpotLight, 4>,
}

struct InstanceUniform {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
}

@group(0) @binding(0)
var<uniform> scene: SceneUniform;

@group(1) @binding(0)
var<uniform> instance: InstanceUniform;

@group(2) @binding(0)
var diffuse_map: texture_2d<f32>;
@group(2) @binding(1)
var specular_map: texture_2d<f32>;
@group(2) @binding(2)
var material_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct HdrOutput {
    @location(0) color: vec4<f32>,
    @location(1) bright: vec4<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = instance.model * vec4<f32>(input.position, 1.0);
    out.position = scene.projection * scene.view * world_position;
    out.world_pos = world_position.xyz;
    let normal_matrix = mat3x3<f32>(
        instance.normal[0].xyz,
        instance.normal[1].xyz,
        instance.normal[2].xyz
    );
    out.normal = normalize(normal_matrix * input.normal);
    out.uv = input.uv;
    return out;
}
"#
    };
}

macro_rules! fullscreen_vertex {
    () => {
        r#"
struct FullscreenOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_fullscreen(@builtin(vertex_index) vertex_index: u32) -> FullscreenOutput {
    var out: FullscreenOutput;
    let x = f32((vertex_index << 1u) & 2u);
    let y = f32(vertex_index & 2u);
    out.position = vec4<f32>(x * 2.0 - 1.0, y * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(x, 1.0 - y);
    return out;
}
"#
    };
}

/// Lit geometry: Phong over every active light, plus the bright-pass
/// output at location 1.
pub const SCENE: &str = concat!(
    scene_common!(),
    r#"
fn phong(
    ambient: vec3<f32>,
    diffuse: vec3<f32>,
    specular: vec3<f32>,
    normal: vec3<f32>,
    light_dir: vec3<f32>,
    view_dir: vec3<f32>,
    albedo: vec3<f32>,
    gloss: vec3<f32>,
) -> vec3<f32> {
    let ambient_term = ambient * albedo;
    let n_dot_l = dot(normal, light_dir);
    if n_dot_l <= 0.0 {
        return ambient_term;
    }
    let reflected = reflect(-light_dir, normal);
    let spec = pow(max(dot(reflected, view_dir), 0.0), scene.material.x);
    return ambient_term + diffuse * n_dot_l * albedo + specular * spec * gloss;
}

fn attenuation(coefficients: vec4<f32>, distance: f32) -> f32 {
    let denominator = coefficients.x + coefficients.y * distance
        + coefficients.z * distance * distance;
    if denominator <= 0.0 {
        return 0x1.fffffep+127f;
    }
    return 1.0 / denominator;
}

fn spot_intensity(cos_theta: f32, cutoff: vec4<f32>) -> f32 {
    let epsilon = cutoff.x - cutoff.y;
    if epsilon <= 0.0 {
        return select(0.0, 1.0, cos_theta >= cutoff.x);
    }
    return clamp((cos_theta - cutoff.y) / epsilon, 0.0, 1.0);
}

@fragment
fn fs_main(input: VertexOutput) -> HdrOutput {
    let albedo = textureSample(diffuse_map, material_sampler, input.uv).rgb;
    let gloss = textureSample(specular_map, material_sampler, input.uv).rgb;
    let normal = normalize(input.normal);
    let view_dir = normalize(scene.view_position.xyz - input.world_pos);

    var color = vec3<f32>(0.0);
    if scene.counts.x > 0u {
        let sun = scene.directional;
        color += phong(
            sun.ambient.rgb, sun.diffuse.rgb, sun.specular.rgb,
            normal, normalize(-sun.direction.xyz), view_dir, albedo, gloss,
        );
    }
    for (var i = 0u; i < min(scene.counts.y, 4u); i++) {
        let light = scene.points[i];
        let offset = light.position.xyz - input.world_pos;
        let light_dir = normalize(offset);
        color += phong(
            light.ambient.rgb, light.diffuse.rgb, light.specular.rgb,
            normal, light_dir, view_dir, albedo, gloss,
        ) * attenuation(light.attenuation, length(offset));
    }
    for (var i = 0u; i < min(scene.counts.z, 4u); i++) {
        let light = scene.spots[i];
        let offset = light.position.xyz - input.world_pos;
        let light_dir = normalize(offset);
        let intensity = spot_intensity(dot(light_dir, normalize(-light.direction.xyz)), light.cutoff);
        if intensity > 0.0 {
            color += phong(
                light.ambient.rgb, light.diffuse.rgb, light.specular.rgb,
                normal, light_dir, view_dir, albedo, gloss,
            ) * attenuation(light.attenuation, length(offset)) * intensity;
        }
    }

    var out: HdrOutput;
    out.color = vec4<f32>(color, 1.0);
    let luminance = dot(color, vec3<f32>(0.2126, 0.7152, 0.0722));
    out.bright = select(vec4<f32>(0.0, 0.0, 0.0, 1.0), vec4<f32>(color, 1.0), luminance > scene.material.y);
    return out;
}
"#
);

/// Double-sided billboards lit by the sun only. The bright attachment is
/// blended with zero alpha so it keeps what the scene wrote.
pub const FOLIAGE: &str = concat!(
    scene_common!(),
    r#"
@fragment
fn fs_foliage(input: VertexOutput) -> HdrOutput {
    let texel = textureSample(diffuse_map, material_sampler, input.uv);
    if texel.a < 0.1 {
        discard;
    }
    var light = vec3<f32>(1.0);
    if scene.counts.x > 0u {
        let sun = scene.directional;
        let facing = abs(dot(normalize(input.normal), normalize(-sun.direction.xyz)));
        light = sun.ambient.rgb + sun.diffuse.rgb * facing;
    }
    var out: HdrOutput;
    out.color = vec4<f32>(texel.rgb * light, texel.a);
    out.bright = vec4<f32>(0.0);
    return out;
}
"#
);

pub const SKYBOX: &str = r#"
struct SceneUniform {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    sky_view: mat4x4<f32>,
}

@group(0) @binding(0)
var<uniform> scene: SceneUniform;

@group(1) @binding(0)
var sky: texture_cube<f32>;
@group(1) @binding(1)
var sky_sampler: sampler;

struct SkyOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) direction: vec3<f32>,
}

@vertex
fn vs_sky(@location(0) position: vec3<f32>) -> SkyOutput {
    var out: SkyOutput;
    let clip = scene.projection * scene.sky_view * vec4<f32>(position, 1.0);
    out.position = clip.xyww;
    out.direction = position;
    return out;
}

struct HdrOutput {
    @location(0) color: vec4<f32>,
    @location(1) bright: vec4<f32>,
}

@fragment
fn fs_sky(input: SkyOutput) -> HdrOutput {
    var out: HdrOutput;
    out.color = vec4<f32>(textureSample(sky, sky_sampler, input.direction).rgb, 1.0);
    out.bright = vec4<f32>(0.0, 0.0, 0.0, 1.0);
    return out;
}
"#;

/// One 9-tap Gaussian step along `blur.direction`.
pub const BLUR: &str = concat!(
    fullscreen_vertex!(),
    r#"
struct BlurUniform {
    direction: vec4<f32>,
}

@group(0) @binding(0)
var source: texture_2d<f32>;
@group(0) @binding(1)
var source_sampler: sampler;

@group(1) @binding(0)
var<uniform> blur: BlurUniform;

@fragment
fn fs_blur(input: FullscreenOutput) -> @location(0) vec4<f32> {
    var weights = array<f32, 5>(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);
    let texel = blur.direction.xy / vec2<f32>(textureDimensions(source));
    var result = textureSampleLevel(source, source_sampler, input.uv, 0.0).rgb * weights[0];
    for (var i = 1; i < 5; i++) {
        let offset = texel * f32(i);
        result += textureSampleLevel(source, source_sampler, input.uv + offset, 0.0).rgb * weights[i];
        result += textureSampleLevel(source, source_sampler, input.uv - offset, 0.0).rgb * weights[i];
    }
    return vec4<f32>(result, 1.0);
}
"#
);

/// Adds the blurred bright colour when enabled and tone maps.
pub const COMPOSITE: &str = concat!(
    fullscreen_vertex!(),
    r#"
struct CompositeUniform {
    params: vec4<f32>,
}

@group(0) @binding(0)
var scene_color: texture_2d<f32>;
@group(0) @binding(1)
var bloom_color: texture_2d<f32>;
@group(0) @binding(2)
var composite_sampler: sampler;
@group(0) @binding(3)
var<uniform> composite: CompositeUniform;

@fragment
fn fs_composite(input: FullscreenOutput) -> @location(0) vec4<f32> {
    var hdr = textureSample(scene_color, composite_sampler, input.uv).rgb;
    let bloom = textureSample(bloom_color, composite_sampler, input.uv).rgb;
    if composite.params.y > 0.5 {
        hdr += bloom;
    }
    let mapped = min(vec3<f32>(1.0) - exp(-hdr * composite.params.x), vec3<f32>(0.99999994));
    return vec4<f32>(mapped, 1.0);
}
"#
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postprocess::GAUSSIAN_WEIGHTS;
    use crate::render::uniforms::{MAX_POINT_LIGHTS, MAX_SPOT_LIGHTS};

    #[test]
    fn light_arrays_match_packing_limits() {
        assert!(SCENE.contains(&format!("array<PointLight, {MAX_POINT_LIGHTS}>")));
        assert!(SCENE.contains(&format!("array<SpotLight, {MAX_SPOT_LIGHTS}>")));
    }

    #[test]
    fn blur_kernel_matches_cpu_weights() {
        let literal = GAUSSIAN_WEIGHTS
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        assert!(BLUR.contains(&format!("array<f32, 5>({literal})")));
    }

    #[test]
    fn attenuation_guard_matches_cpu_fallback() {
        assert_eq!(f32::from_bits(0x7f7f_ffff), f32::MAX);
        assert!(SCENE.contains("return 0x1.fffffep+127f;"));
    }

    #[test]
    fn every_pass_declares_its_entry_points() {
        for (source, entries) in [
            (SCENE, ["fn vs_main", "fn fs_main"]),
            (FOLIAGE, ["fn vs_main", "fn fs_foliage"]),
            (SKYBOX, ["fn vs_sky", "fn fs_sky"]),
            (BLUR, ["fn vs_fullscreen", "fn fs_blur"]),
            (COMPOSITE, ["fn vs_fullscreen", "fn fs_composite"]),
        ] {
            for entry in entries {
                assert!(source.contains(entry), "missing {entry}");
            }
        }
    }
}
