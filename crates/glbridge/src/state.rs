//! Shadow copy of the legacy fixed-function pipeline state.
//!
//! The bridge tracks everything the uber-shader needs here; capabilities the
//! modern backend handles natively pass straight through untouched.

/// Number of light slots the bridge emulates.
pub const MAX_LIGHTS: usize = 4;

/// Number of texture units the bridge emulates.
pub const MAX_TEXTURE_UNITS: usize = 2;

/// Capabilities the underlying backend owns. The bridge forwards these
/// verbatim and never shadows their values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeCapability {
    DepthTest,
    Blend,
    CullFace,
    ScissorTest,
    StencilTest,
    PolygonOffsetFill,
    Dither,
}

/// Everything `enable`/`disable` can name.
///
/// Tracked variants mutate bridge state; the legacy-only variants
/// (`Normalize` through `Texture1d`) are accepted and ignored because the
/// shader path makes them moot; `Native` forwards to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Lighting,
    Light(u8),
    Fog,
    AlphaTest,
    /// Texturing for the currently active texture unit.
    Texture2d,
    TextureGenS,
    TextureGenT,
    Normalize,
    RescaleNormal,
    ColorMaterial,
    ColorLogicOp,
    LineSmooth,
    LineStipple,
    Texture1d,
    Native(NativeCapability),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightState {
    pub enabled: bool,
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// Eye-space position; `w == 0` means directional. Baked into eye space
    /// when set, never re-derived from a later model-view matrix.
    pub position: [f32; 4],
}

impl LightState {
    fn slot_default(index: usize) -> Self {
        // Light 0 defaults to full-white diffuse/specular, the rest to black,
        // matching the legacy pipeline's initial lighting state.
        let head = if index == 0 { 1.0 } else { 0.0 };
        Self {
            enabled: false,
            ambient: [0.0, 0.0, 0.0, 1.0],
            diffuse: [head, head, head, 1.0],
            specular: [head, head, head, 1.0],
            position: [0.0, 0.0, 1.0, 0.0],
        }
    }
}

/// Per-light property selector for `set_light`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightParam {
    Ambient([f32; 4]),
    Diffuse([f32; 4]),
    Specular([f32; 4]),
    /// Interpreted in object space and transformed by the model-view matrix
    /// active at the call.
    Position([f32; 4]),
}

/// The color-only subset of [`LightParam`]. Positions never reach the state
/// layer directly; the bridge bakes them through the model-view matrix first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightColor {
    Ambient([f32; 4]),
    Diffuse([f32; 4]),
    Specular([f32; 4]),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialState {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emission: [f32; 4],
    pub shininess: f32,
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            ambient: [0.2, 0.2, 0.2, 1.0],
            diffuse: [0.8, 0.8, 0.8, 1.0],
            specular: [0.0, 0.0, 0.0, 1.0],
            emission: [0.0, 0.0, 0.0, 1.0],
            shininess: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaterialParam {
    Ambient([f32; 4]),
    Diffuse([f32; 4]),
    Specular([f32; 4]),
    Emission([f32; 4]),
    Shininess(f32),
    AmbientAndDiffuse([f32; 4]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FogMode {
    #[default]
    Linear,
    Exp,
    Exp2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FogState {
    pub enabled: bool,
    pub mode: FogMode,
    pub start: f32,
    pub end: f32,
    pub density: f32,
    pub color: [f32; 4],
}

impl Default for FogState {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: FogMode::Linear,
            start: 0.0,
            end: 1.0,
            density: 1.0,
            color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FogParam {
    Mode(FogMode),
    Start(f32),
    End(f32),
    Density(f32),
    Color([f32; 4]),
}

/// Alpha-test comparison, in the legacy enumeration order the shader
/// switches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum CompareFunc {
    Never = 0,
    Less = 1,
    Equal = 2,
    LessEqual = 3,
    Greater = 4,
    NotEqual = 5,
    GreaterEqual = 6,
    #[default]
    Always = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct AlphaTestState {
    pub enabled: bool,
    pub func: CompareFunc,
    pub reference: f32,
}

/// How a sampled texel combines with the incoming fragment color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum TexEnvMode {
    #[default]
    Modulate = 0,
    Add = 1,
    Replace = 2,
    /// Legacy COMBINE with ADD on RGB: sums RGB, keeps fragment alpha.
    CombineAdd = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TexGenAxis {
    S,
    T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TexGenMode {
    #[default]
    Off,
    SphereMap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TextureEnvState {
    pub env_mode: TexEnvMode,
    /// Texturing enabled for this unit (the legacy `GL_TEXTURE_2D` bit).
    pub enabled: bool,
}

/// The complete tracked fixed-function state, minus the matrix stacks.
#[derive(Clone, Debug)]
pub struct FixedFunctionState {
    pub lighting_enabled: bool,
    pub scene_ambient: [f32; 4],
    pub lights: [LightState; MAX_LIGHTS],
    pub material: MaterialState,
    pub fog: FogState,
    pub alpha_test: AlphaTestState,
    pub texture_env: [TextureEnvState; MAX_TEXTURE_UNITS],
    pub texgen_s: TexGenMode,
    pub texgen_t: TexGenMode,
    /// Texture unit `set_tex_env`/`set_tex_gen` apply to. Always 0 or 1.
    pub active_texture_unit: usize,
    pub current_color: [f32; 4],
    pub current_normal: [f32; 3],
    pub current_texcoord: [f32; 2],
}

impl Default for FixedFunctionState {
    fn default() -> Self {
        Self {
            lighting_enabled: false,
            scene_ambient: [0.2, 0.2, 0.2, 1.0],
            lights: std::array::from_fn(LightState::slot_default),
            material: MaterialState::default(),
            fog: FogState::default(),
            alpha_test: AlphaTestState::default(),
            texture_env: [TextureEnvState::default(); MAX_TEXTURE_UNITS],
            texgen_s: TexGenMode::Off,
            texgen_t: TexGenMode::Off,
            active_texture_unit: 0,
            current_color: [1.0, 1.0, 1.0, 1.0],
            current_normal: [0.0, 0.0, 1.0],
            current_texcoord: [0.0, 0.0],
        }
    }
}

impl FixedFunctionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a non-positional light property. Out-of-range indices are
    /// ignored, not errors.
    pub fn set_light_color(&mut self, index: usize, color: LightColor) {
        let Some(light) = self.lights.get_mut(index) else {
            return;
        };
        match color {
            LightColor::Ambient(c) => light.ambient = c,
            LightColor::Diffuse(c) => light.diffuse = c,
            LightColor::Specular(c) => light.specular = c,
        }
    }

    pub fn set_light_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(light) = self.lights.get_mut(index) {
            light.enabled = enabled;
        }
    }

    pub fn set_material(&mut self, param: MaterialParam) {
        match param {
            MaterialParam::Ambient(c) => self.material.ambient = c,
            MaterialParam::Diffuse(c) => self.material.diffuse = c,
            MaterialParam::Specular(c) => self.material.specular = c,
            MaterialParam::Emission(c) => self.material.emission = c,
            MaterialParam::Shininess(s) => self.material.shininess = s,
            MaterialParam::AmbientAndDiffuse(c) => {
                self.material.ambient = c;
                self.material.diffuse = c;
            }
        }
    }

    pub fn set_fog(&mut self, param: FogParam) {
        match param {
            FogParam::Mode(m) => self.fog.mode = m,
            FogParam::Start(v) => self.fog.start = v,
            FogParam::End(v) => self.fog.end = v,
            FogParam::Density(v) => self.fog.density = v,
            FogParam::Color(c) => self.fog.color = c,
        }
    }

    pub fn set_alpha_func(&mut self, func: CompareFunc, reference: f32) {
        self.alpha_test.func = func;
        self.alpha_test.reference = reference;
    }

    /// Selects the unit texenv/texgen calls apply to, clamped to the two
    /// supported units.
    pub fn set_active_texture_unit(&mut self, unit: usize) {
        self.active_texture_unit = unit.min(MAX_TEXTURE_UNITS - 1);
    }

    pub fn set_tex_env(&mut self, mode: TexEnvMode) {
        self.texture_env[self.active_texture_unit].env_mode = mode;
    }

    pub fn set_tex_gen(&mut self, axis: TexGenAxis, mode: TexGenMode) {
        match axis {
            TexGenAxis::S => self.texgen_s = mode,
            TexGenAxis::T => self.texgen_t = mode,
        }
    }

    pub fn sphere_map_enabled(&self) -> bool {
        self.texgen_s == TexGenMode::SphereMap || self.texgen_t == TexGenMode::SphereMap
    }

    /// Number of enabled lights (the compacted count uploaded per draw).
    pub fn active_light_count(&self) -> usize {
        self.lights.iter().filter(|l| l.enabled).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_light_is_ignored() {
        let mut state = FixedFunctionState::new();
        state.set_light_enabled(MAX_LIGHTS + 3, true);
        state.set_light_color(MAX_LIGHTS, LightColor::Diffuse([1.0; 4]));
        assert_eq!(state.active_light_count(), 0);
    }

    #[test]
    fn light_color_variants_touch_only_their_field() {
        let mut state = FixedFunctionState::new();
        let before = state.lights[1];
        state.set_light_color(1, LightColor::Ambient([0.1, 0.2, 0.3, 1.0]));
        state.set_light_color(1, LightColor::Specular([0.9; 4]));
        assert_eq!(state.lights[1].ambient, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(state.lights[1].specular, [0.9; 4]);
        assert_eq!(state.lights[1].diffuse, before.diffuse);
        assert_eq!(state.lights[1].position, before.position);
    }

    #[test]
    fn active_unit_clamps_to_supported_range() {
        let mut state = FixedFunctionState::new();
        state.set_active_texture_unit(7);
        assert_eq!(state.active_texture_unit, MAX_TEXTURE_UNITS - 1);
        state.set_tex_env(TexEnvMode::Add);
        assert_eq!(state.texture_env[1].env_mode, TexEnvMode::Add);
        assert_eq!(state.texture_env[0].env_mode, TexEnvMode::Modulate);
    }

    #[test]
    fn ambient_and_diffuse_sets_both() {
        let mut state = FixedFunctionState::new();
        state.set_material(MaterialParam::AmbientAndDiffuse([0.5, 0.25, 0.125, 1.0]));
        assert_eq!(state.material.ambient, [0.5, 0.25, 0.125, 1.0]);
        assert_eq!(state.material.diffuse, [0.5, 0.25, 0.125, 1.0]);
    }
}
