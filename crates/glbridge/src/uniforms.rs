//! Per-draw uniform block for the uber-shader.
//!
//! A single `Globals` struct carries every piece of fixed-function state the
//! shader consumes. It is rebuilt from the tracked state before each draw and
//! uploaded as one uniform buffer write; the shader branches on the packed
//! flag words rather than using pipeline permutations.

use bytemuck::{Pod, Zeroable};

use crate::math::TransformState;
use crate::state::{FixedFunctionState, FogMode, MAX_LIGHTS, MAX_TEXTURE_UNITS};

/// Must match the `Globals` struct in `shader.rs` field for field.
///
/// Enabled lights are compacted to the front of the arrays so the shader can
/// loop `0..light_count` without per-light enable bits. All `u32` flag words
/// live in `vec4<u32>` slots to satisfy uniform-buffer alignment.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Globals {
    pub model_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub texture_matrix: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub scene_ambient: [f32; 4],
    pub material_ambient: [f32; 4],
    pub material_diffuse: [f32; 4],
    pub material_emission: [f32; 4],
    pub fog_color: [f32; 4],
    /// Eye-space light positions, compacted; `w == 0` marks directional.
    pub light_position: [[f32; 4]; MAX_LIGHTS],
    pub light_ambient: [[f32; 4]; MAX_LIGHTS],
    pub light_diffuse: [[f32; 4]; MAX_LIGHTS],
    /// `(fog_start, fog_end, fog_density, alpha_ref)`.
    pub fog_params: [f32; 4],
    /// `(lighting, light_count, fog_enabled, fog_mode)`.
    pub flags0: [u32; 4],
    /// `(alpha_test, alpha_func, texenv_unit0, texenv_unit1)`.
    pub flags1: [u32; 4],
    /// `(unit0_active, unit1_active, sphere_map, 0)`.
    pub flags2: [u32; 4],
}

pub const GLOBALS_SIZE: usize = std::mem::size_of::<Globals>();

impl Globals {
    /// Snapshots the tracked state into the shader's uniform layout.
    ///
    /// `unit_active` is decided by the bridge per draw: a unit contributes
    /// only when a texture is bound to it and it has a texcoord source
    /// (client array, immediate-mode attribute, or sphere-map generation).
    pub fn build(
        transform: &TransformState,
        state: &FixedFunctionState,
        unit_active: [bool; MAX_TEXTURE_UNITS],
    ) -> Self {
        let mut light_position = [[0.0; 4]; MAX_LIGHTS];
        let mut light_ambient = [[0.0; 4]; MAX_LIGHTS];
        let mut light_diffuse = [[0.0; 4]; MAX_LIGHTS];
        let mut light_count = 0u32;
        for light in state.lights.iter().filter(|l| l.enabled) {
            let slot = light_count as usize;
            light_position[slot] = light.position;
            light_ambient[slot] = light.ambient;
            light_diffuse[slot] = light.diffuse;
            light_count += 1;
        }

        let model_view = *transform.model_view();
        let fog = &state.fog;
        let alpha = &state.alpha_test;
        Self {
            model_view: model_view.to_cols_2d(),
            projection: transform.projection().to_cols_2d(),
            texture_matrix: transform.texture().to_cols_2d(),
            normal_matrix: model_view.normal_matrix().to_cols_2d(),
            scene_ambient: state.scene_ambient,
            material_ambient: state.material.ambient,
            material_diffuse: state.material.diffuse,
            material_emission: state.material.emission,
            fog_color: fog.color,
            light_position,
            light_ambient,
            light_diffuse,
            fog_params: [fog.start, fog.end, fog.density, alpha.reference],
            flags0: [
                u32::from(state.lighting_enabled),
                light_count,
                u32::from(fog.enabled),
                match fog.mode {
                    FogMode::Linear => 0,
                    FogMode::Exp => 1,
                    FogMode::Exp2 => 2,
                },
            ],
            flags1: [
                u32::from(alpha.enabled),
                alpha.func as u32,
                state.texture_env[0].env_mode as u32,
                state.texture_env[1].env_mode as u32,
            ],
            flags2: [
                u32::from(unit_active[0]),
                u32::from(unit_active[1]),
                u32::from(state.sphere_map_enabled()),
                0,
            ],
        }
    }
}
