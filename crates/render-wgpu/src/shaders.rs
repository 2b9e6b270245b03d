/// WGSL shader for every lit surface: instanced meshes, props, and the sun.
pub const SCENE_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    // xyz: position, w: intensity
    sun_position: vec4<f32>,
    sun_color: vec4<f32>,
    // xyz: position, w: intensity
    key_light: vec4<f32>,
    // x: ambient intensity
    ambient: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

// Colour map; a 1x1 white texture for untextured surfaces.
@group(1) @binding(0)
var surface_texture: texture_2d<f32>;
@group(1) @binding(1)
var surface_sampler: sampler;

const AMBIENT_SCALE: f32 = 0.35;
const SUN_FALLOFF: f32 = 0.05;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct InstanceInput {
    @location(3) model_0: vec4<f32>,
    @location(4) model_1: vec4<f32>,
    @location(5) model_2: vec4<f32>,
    @location(6) model_3: vec4<f32>,
    @location(7) color: vec4<f32>,
    // x: emissive
    @location(8) params: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) color: vec4<f32>,
    @location(3) emissive: f32,
    @location(4) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world_pos = model * vec4<f32>(vertex.position, 1.0);
    let world_normal = (model * vec4<f32>(vertex.normal, 0.0)).xyz;

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * world_pos;
    out.world_position = world_pos.xyz;
    out.world_normal = normalize(world_normal);
    out.color = instance.color;
    out.emissive = instance.params.x;
    out.uv = vertex.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    // Sampled before any branch: implicit derivatives need uniform control flow.
    let base = in.color * textureSample(surface_texture, surface_sampler, in.uv);
    if (in.emissive > 0.5) {
        return base;
    }

    let normal = normalize(in.world_normal);

    let to_sun = uniforms.sun_position.xyz - in.world_position;
    let sun_distance = max(length(to_sun), 1e-4);
    let sun_diffuse = max(dot(normal, to_sun / sun_distance), 0.0);
    let sun = uniforms.sun_color.rgb * uniforms.sun_position.w * sun_diffuse
        / (1.0 + SUN_FALLOFF * sun_distance * sun_distance);

    let key_dir = normalize(uniforms.key_light.xyz);
    let key = max(dot(normal, key_dir), 0.0) * uniforms.key_light.w;

    let lighting = vec3<f32>(uniforms.ambient.x * AMBIENT_SCALE + key) + sun;
    return vec4<f32>(base.rgb * lighting, base.a);
}
"#;
