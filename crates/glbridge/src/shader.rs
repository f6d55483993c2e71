//! The single uber-shader every bridge draw goes through.
//!
//! All fixed-function behaviour (transform, per-vertex lighting, two texture
//! stages, fog, alpha test) is selected by uniform flag words at run time, so
//! one pipeline per (topology, depth, blend) combination suffices.

/// Interleaved vertex: position, normal, color, two texcoord sets.
pub const VERTEX_STRIDE: u64 = 56;

pub const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x3, // position
    1 => Float32x3, // normal
    2 => Float32x4, // color
    3 => Float32x2, // texcoord unit 0
    4 => Float32x2, // texcoord unit 1
];

pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// WGSL source. The `Globals` struct must stay byte-compatible with
/// [`crate::uniforms::Globals`].
pub const UBER_SHADER: &str = r#"
struct Globals {
    model_view: mat4x4<f32>,
    projection: mat4x4<f32>,
    texture_matrix: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    scene_ambient: vec4<f32>,
    material_ambient: vec4<f32>,
    material_diffuse: vec4<f32>,
    material_emission: vec4<f32>,
    fog_color: vec4<f32>,
    light_position: array<vec4<f32>, 4>,
    light_ambient: array<vec4<f32>, 4>,
    light_diffuse: array<vec4<f32>, 4>,
    // (fog_start, fog_end, fog_density, alpha_ref)
    fog_params: vec4<f32>,
    // (lighting, light_count, fog_enabled, fog_mode)
    flags0: vec4<u32>,
    // (alpha_test, alpha_func, texenv_unit0, texenv_unit1)
    flags1: vec4<u32>,
    // (unit0_active, unit1_active, sphere_map, 0)
    flags2: vec4<u32>,
}

@group(0) @binding(0) var<uniform> globals: Globals;
@group(0) @binding(1) var tex0: texture_2d<f32>;
@group(0) @binding(2) var samp0: sampler;
@group(0) @binding(3) var tex1: texture_2d<f32>;
@group(0) @binding(4) var samp1: sampler;

struct VsIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
    @location(3) uv0: vec2<f32>,
    @location(4) uv1: vec2<f32>,
}

struct VsOut {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv0: vec2<f32>,
    @location(2) uv1: vec2<f32>,
    @location(3) fog_dist: f32,
}

@vertex
fn vs_main(in: VsIn) -> VsOut {
    var out: VsOut;
    let eye = globals.model_view * vec4<f32>(in.position, 1.0);
    out.clip_position = globals.projection * eye;
    // Plane-based fog distance: depth along the view axis, not radial.
    out.fog_dist = abs(eye.z);

    let n = normalize((globals.normal_matrix * vec4<f32>(in.normal, 0.0)).xyz);

    if (globals.flags0.x != 0u) {
        var rgb = globals.material_emission.rgb
            + globals.scene_ambient.rgb * globals.material_ambient.rgb;
        let count = globals.flags0.y;
        for (var i = 0u; i < count; i = i + 1u) {
            let lp = globals.light_position[i];
            var l: vec3<f32>;
            if (lp.w == 0.0) {
                l = normalize(lp.xyz);
            } else {
                l = normalize(lp.xyz - eye.xyz);
            }
            let ndotl = max(dot(n, l), 0.0);
            rgb = rgb
                + globals.light_ambient[i].rgb * globals.material_ambient.rgb
                + globals.light_diffuse[i].rgb * globals.material_diffuse.rgb * ndotl;
        }
        let lit = vec4<f32>(
            clamp(rgb, vec3<f32>(0.0), vec3<f32>(1.0)),
            globals.material_diffuse.a,
        );
        out.color = lit * in.color;
    } else {
        out.color = in.color;
    }

    out.uv0 = (globals.texture_matrix * vec4<f32>(in.uv0, 0.0, 1.0)).xy;
    if (globals.flags2.z != 0u) {
        let incident = normalize(eye.xyz);
        let r = reflect(incident, n);
        let m = max(2.0 * sqrt(r.x * r.x + r.y * r.y + (r.z + 1.0) * (r.z + 1.0)), 1e-6);
        out.uv1 = vec2<f32>(r.x / m + 0.5, r.y / m + 0.5);
    } else {
        out.uv1 = in.uv1;
    }
    return out;
}

fn apply_env(base: vec4<f32>, texel: vec4<f32>, mode: u32) -> vec4<f32> {
    switch mode {
        case 1u: {
            // ADD: sum color, multiply alpha.
            return vec4<f32>(
                clamp(base.rgb + texel.rgb, vec3<f32>(0.0), vec3<f32>(1.0)),
                base.a * texel.a,
            );
        }
        case 2u: {
            // REPLACE.
            return texel;
        }
        case 3u: {
            // COMBINE with ADD on RGB: fragment alpha passes through.
            return vec4<f32>(
                clamp(base.rgb + texel.rgb, vec3<f32>(0.0), vec3<f32>(1.0)),
                base.a,
            );
        }
        default: {
            // MODULATE.
            return base * texel;
        }
    }
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    var color = in.color;

    if (globals.flags2.x != 0u) {
        color = apply_env(color, textureSample(tex0, samp0, in.uv0), globals.flags1.z);
    }
    if (globals.flags2.y != 0u) {
        color = apply_env(color, textureSample(tex1, samp1, in.uv1), globals.flags1.w);
    }

    if (globals.flags1.x != 0u) {
        let a = color.a;
        let a_ref = globals.fog_params.w;
        var keep = true;
        switch globals.flags1.y {
            case 0u: { keep = false; }
            case 1u: { keep = a < a_ref; }
            // Equality on interpolated alpha uses a small band, not exact
            // float comparison.
            case 2u: { keep = abs(a - a_ref) < 0.001; }
            case 3u: { keep = a <= a_ref; }
            case 4u: { keep = a > a_ref; }
            case 5u: { keep = abs(a - a_ref) >= 0.001; }
            case 6u: { keep = a >= a_ref; }
            default: { keep = true; }
        }
        if (!keep) {
            discard;
        }
    }

    if (globals.flags0.z != 0u) {
        let dist = in.fog_dist;
        let start = globals.fog_params.x;
        let end = globals.fog_params.y;
        let density = globals.fog_params.z;
        var factor: f32;
        switch globals.flags0.w {
            case 1u: { factor = exp(-density * dist); }
            case 2u: {
                let d = density * dist;
                factor = exp(-(d * d));
            }
            default: { factor = (end - dist) / max(end - start, 1e-6); }
        }
        factor = clamp(factor, 0.0, 1.0);
        color = vec4<f32>(mix(globals.fog_color.rgb, color.rgb, factor), color.a);
    }

    return color;
}
"#;
