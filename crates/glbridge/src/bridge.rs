//! The legacy-facing entry point.
//!
//! `GlBridge` exposes the stateful fixed-function call surface and translates
//! every draw into a [`DrawSubmission`] for the backend. Per the legacy
//! contract, calls after a successful init do not fail: draw-time problems
//! are logged and the draw is dropped, matching how the original clients
//! treated GL errors they never checked.

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::arrays::{ArrayError, ClientArrays, IndexData, Vertex, VertexDefaults};
use crate::backend::{
    BackendError, DrawSubmission, GlBackend, IndexSlice, NativePrimitive, SamplerDesc, TextureId,
    TextureUpload,
};
use crate::immediate::{ImmediateMode, Primitive};
use crate::math::{Mat4, MatrixMode, TransformState};
use crate::pixels::{self, PixelError, PixelFormat, PixelType};
use crate::state::{
    Capability, CompareFunc, FixedFunctionState, FogParam, LightColor, LightParam, MaterialParam,
    NativeCapability, TexEnvMode, TexGenAxis, TexGenMode, MAX_TEXTURE_UNITS,
};
use crate::uniforms::Globals;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Pixel(#[from] PixelError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub struct GlBridge<B: GlBackend> {
    backend: B,
    transform: TransformState,
    state: FixedFunctionState,
    immediate: ImmediateMode,
    bound_textures: [Option<TextureId>; MAX_TEXTURE_UNITS],
    /// The legacy per-unit `TEXTURE_2D` enable bit.
    texture_2d_enabled: [bool; MAX_TEXTURE_UNITS],
    native_enabled: [bool; NATIVE_CAP_COUNT],
}

const NATIVE_CAP_COUNT: usize = 7;

fn native_index(cap: NativeCapability) -> usize {
    match cap {
        NativeCapability::DepthTest => 0,
        NativeCapability::Blend => 1,
        NativeCapability::CullFace => 2,
        NativeCapability::ScissorTest => 3,
        NativeCapability::StencilTest => 4,
        NativeCapability::PolygonOffsetFill => 5,
        NativeCapability::Dither => 6,
    }
}

impl<B: GlBackend> GlBridge<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            transform: TransformState::new(),
            state: FixedFunctionState::new(),
            immediate: ImmediateMode::new(),
            bound_textures: [None; MAX_TEXTURE_UNITS],
            texture_2d_enabled: [false; MAX_TEXTURE_UNITS],
            native_enabled: [false; NATIVE_CAP_COUNT],
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub fn state(&self) -> &FixedFunctionState {
        &self.state
    }

    // --- matrix stack ---

    pub fn matrix_mode(&mut self, mode: MatrixMode) {
        self.transform.mode = mode;
    }

    pub fn load_identity(&mut self) {
        self.transform.load_identity();
    }

    pub fn load_matrix(&mut self, m: [f32; 16]) {
        self.transform.load_matrix(Mat4::from_cols_array(m));
    }

    pub fn mult_matrix(&mut self, m: [f32; 16]) {
        self.transform.mult_matrix(&Mat4::from_cols_array(m));
    }

    pub fn push_matrix(&mut self) {
        self.transform.push();
    }

    pub fn pop_matrix(&mut self) {
        self.transform.pop();
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.transform.translate(x, y, z);
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.transform.scale(x, y, z);
    }

    pub fn rotate(&mut self, angle_deg: f32, x: f32, y: f32, z: f32) {
        self.transform.rotate(angle_deg, [x, y, z]);
    }

    pub fn ortho(&mut self, l: f64, r: f64, b: f64, t: f64, n: f64, f: f64) {
        self.transform.ortho(l, r, b, t, n, f);
    }

    pub fn frustum(&mut self, l: f64, r: f64, b: f64, t: f64, n: f64, f: f64) {
        self.transform.frustum(l, r, b, t, n, f);
    }

    /// Top of the currently selected matrix stack, column-major.
    pub fn current_matrix(&self) -> [f32; 16] {
        self.transform.current().to_cols_array()
    }

    // --- capabilities ---

    pub fn enable(&mut self, cap: Capability) {
        self.set_capability(cap, true);
    }

    pub fn disable(&mut self, cap: Capability) {
        self.set_capability(cap, false);
    }

    fn set_capability(&mut self, cap: Capability, enabled: bool) {
        match cap {
            Capability::Lighting => self.state.lighting_enabled = enabled,
            Capability::Light(i) => self.state.set_light_enabled(usize::from(i), enabled),
            Capability::Fog => self.state.fog.enabled = enabled,
            Capability::AlphaTest => self.state.alpha_test.enabled = enabled,
            Capability::Texture2d => {
                self.texture_2d_enabled[self.state.active_texture_unit] = enabled;
            }
            Capability::TextureGenS => {
                let mode = if enabled { TexGenMode::SphereMap } else { TexGenMode::Off };
                self.state.set_tex_gen(TexGenAxis::S, mode);
            }
            Capability::TextureGenT => {
                let mode = if enabled { TexGenMode::SphereMap } else { TexGenMode::Off };
                self.state.set_tex_gen(TexGenAxis::T, mode);
            }
            Capability::Normalize
            | Capability::RescaleNormal
            | Capability::ColorMaterial
            | Capability::ColorLogicOp
            | Capability::LineSmooth
            | Capability::LineStipple
            | Capability::Texture1d => {
                // Moot on the shader path; accepted for source compatibility.
                debug!(?cap, enabled, "ignoring legacy-only capability");
            }
            Capability::Native(native) => {
                self.native_enabled[native_index(native)] = enabled;
                self.backend.set_native_capability(native, enabled);
            }
        }
    }

    pub fn is_enabled(&self, cap: Capability) -> bool {
        match cap {
            Capability::Lighting => self.state.lighting_enabled,
            Capability::Light(i) => self
                .state
                .lights
                .get(usize::from(i))
                .is_some_and(|l| l.enabled),
            Capability::Fog => self.state.fog.enabled,
            Capability::AlphaTest => self.state.alpha_test.enabled,
            Capability::Texture2d => self.texture_2d_enabled[self.state.active_texture_unit],
            Capability::TextureGenS => self.state.texgen_s != TexGenMode::Off,
            Capability::TextureGenT => self.state.texgen_t != TexGenMode::Off,
            Capability::Normalize
            | Capability::RescaleNormal
            | Capability::ColorMaterial
            | Capability::ColorLogicOp
            | Capability::LineSmooth
            | Capability::LineStipple
            | Capability::Texture1d => false,
            Capability::Native(native) => self.native_enabled[native_index(native)],
        }
    }

    // --- lighting, fog, alpha test ---

    /// Light positions are transformed by the model-view matrix in effect at
    /// this call, never re-derived later.
    pub fn set_light(&mut self, index: usize, param: LightParam) {
        match param {
            LightParam::Position(p) => {
                let eye = self.transform.model_view().transform4(p);
                if let Some(light) = self.state.lights.get_mut(index) {
                    light.position = eye;
                }
            }
            LightParam::Ambient(c) => self.state.set_light_color(index, LightColor::Ambient(c)),
            LightParam::Diffuse(c) => self.state.set_light_color(index, LightColor::Diffuse(c)),
            LightParam::Specular(c) => self.state.set_light_color(index, LightColor::Specular(c)),
        }
    }

    pub fn set_scene_ambient(&mut self, color: [f32; 4]) {
        self.state.scene_ambient = color;
    }

    pub fn set_material(&mut self, param: MaterialParam) {
        self.state.set_material(param);
    }

    pub fn set_fog(&mut self, param: FogParam) {
        self.state.set_fog(param);
    }

    pub fn alpha_func(&mut self, func: CompareFunc, reference: f32) {
        self.state.set_alpha_func(func, reference.clamp(0.0, 1.0));
    }

    // --- texture units ---

    pub fn active_texture(&mut self, unit: usize) {
        if unit >= MAX_TEXTURE_UNITS {
            warn!(unit, "active_texture beyond supported units, clamping");
        }
        self.state.set_active_texture_unit(unit);
    }

    pub fn tex_env(&mut self, mode: TexEnvMode) {
        self.state.set_tex_env(mode);
    }

    pub fn tex_gen(&mut self, axis: TexGenAxis, mode: TexGenMode) {
        self.state.set_tex_gen(axis, mode);
    }

    /// Binds `texture` to the active unit; `None` unbinds.
    pub fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.bound_textures[self.state.active_texture_unit] = texture;
    }

    // --- current vertex attributes ---

    pub fn set_color(&mut self, color: [f32; 4]) {
        self.state.current_color = color;
    }

    pub fn set_normal(&mut self, normal: [f32; 3]) {
        self.state.current_normal = normal;
    }

    pub fn set_texcoord(&mut self, unit: usize, texcoord: [f32; 2]) {
        if unit >= MAX_TEXTURE_UNITS {
            return;
        }
        // Both units share the current value; the per-batch flag decides
        // which units participate in the draw.
        self.state.current_texcoord = texcoord;
        if self.immediate.in_batch() {
            self.immediate.note_texcoord(unit);
        }
    }

    // --- textures ---

    pub fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        ty: PixelType,
        data: &[u8],
    ) -> Result<TextureId, BridgeError> {
        let converted = pixels::convert_pixels(format, ty, data)?;
        let id = self.backend.create_texture(&TextureUpload {
            width,
            height,
            format: converted.format,
            bytes_per_pixel: converted.bytes_per_pixel,
            data: &converted.data,
        })?;
        Ok(id)
    }

    pub fn update_texture(
        &mut self,
        id: TextureId,
        width: u32,
        height: u32,
        format: PixelFormat,
        ty: PixelType,
        data: &[u8],
    ) -> Result<(), BridgeError> {
        let converted = pixels::convert_pixels(format, ty, data)?;
        self.backend.update_texture(
            id,
            &TextureUpload {
                width,
                height,
                format: converted.format,
                bytes_per_pixel: converted.bytes_per_pixel,
                data: &converted.data,
            },
        )?;
        Ok(())
    }

    pub fn set_sampler(&mut self, id: TextureId, desc: SamplerDesc) -> Result<(), BridgeError> {
        self.backend.set_sampler(id, desc)?;
        Ok(())
    }

    pub fn delete_texture(&mut self, id: TextureId) {
        for bound in &mut self.bound_textures {
            if *bound == Some(id) {
                *bound = None;
            }
        }
        self.backend.delete_texture(id);
    }

    // --- immediate mode ---

    pub fn begin(&mut self, primitive: Primitive) {
        if let Err(err) = self.immediate.begin(primitive) {
            error!(%err, "begin ignored");
        }
    }

    pub fn vertex(&mut self, x: f32, y: f32, z: f32) {
        if !self.immediate.in_batch() {
            debug!("vertex outside begin/end ignored");
            return;
        }
        let tc = self.state.current_texcoord;
        self.immediate.push_vertex(Vertex {
            position: [x, y, z],
            normal: self.state.current_normal,
            color: self.state.current_color,
            texcoord0: tc,
            texcoord1: tc,
        });
    }

    pub fn end(&mut self) {
        let batch = match self.immediate.end() {
            Ok(batch) => batch,
            Err(err) => {
                error!(%err, "end ignored");
                return;
            }
        };
        if !batch.is_empty() {
            let unit_active = [
                self.unit_active(0, batch.used_texcoord[0]),
                self.unit_active(1, batch.used_texcoord[1]),
            ];
            let indices = batch.indices.as_deref().map(IndexSlice::U16);
            self.submit(batch.primitive, &batch.vertices, indices, unit_active);
        }
        self.immediate.recycle(batch.vertices);
    }

    // --- array draws ---

    pub fn draw_arrays(
        &mut self,
        primitive: Primitive,
        first: usize,
        count: usize,
        arrays: &ClientArrays<'_>,
    ) {
        if count == 0 {
            return;
        }
        let vertices = match self.gather(arrays, first, count) {
            Some(v) => v,
            None => return,
        };
        let unit_active = self.array_unit_activity(arrays);
        match triangulated(primitive) {
            Some(native) => {
                let seq: Vec<u32> = (0..count as u32).collect();
                let Some(expanded) = triangulate_indices(primitive, &seq) else {
                    return;
                };
                self.submit_indexed(native, &vertices, expanded, unit_active);
            }
            None => {
                let native = native_primitive(primitive);
                self.submit(native, &vertices, None, unit_active);
            }
        }
    }

    pub fn draw_elements(
        &mut self,
        primitive: Primitive,
        indices: IndexData<'_>,
        arrays: &ClientArrays<'_>,
    ) {
        if indices.is_empty() {
            return;
        }
        let Some(max) = indices.max_index() else {
            return;
        };
        let vertices = match self.gather(arrays, 0, max as usize + 1) {
            Some(v) => v,
            None => return,
        };
        let unit_active = self.array_unit_activity(arrays);
        match triangulated(primitive) {
            Some(native) => {
                let wide = indices.to_u32();
                let Some(expanded) = triangulate_indices(primitive, &wide) else {
                    return;
                };
                self.submit_indexed(native, &vertices, expanded, unit_active);
            }
            None => {
                let native = native_primitive(primitive);
                // Prefer 16-bit indices; fall back to 32-bit only where the
                // backend accepts them.
                if let Some(narrow) = indices.to_u16() {
                    self.submit(native, &vertices, Some(IndexSlice::U16(&narrow)), unit_active);
                } else if self.backend.supports_wide_indices() {
                    let wide = indices.to_u32();
                    self.submit(native, &vertices, Some(IndexSlice::U32(&wide)), unit_active);
                } else {
                    error!(max, "32-bit indices unsupported by backend, dropping draw");
                }
            }
        }
    }

    // --- internals ---

    fn gather(&self, arrays: &ClientArrays<'_>, first: usize, count: usize) -> Option<Vec<Vertex>> {
        let defaults = VertexDefaults {
            normal: self.state.current_normal,
            color: self.state.current_color,
            texcoord: self.state.current_texcoord,
        };
        match arrays.interleave(first, count, &defaults) {
            Ok(v) => Some(v),
            Err(err @ ArrayError::MissingPositions) => {
                warn!(%err, "dropping draw");
                None
            }
            Err(err) => {
                error!(%err, "dropping draw");
                None
            }
        }
    }

    fn array_unit_activity(&self, arrays: &ClientArrays<'_>) -> [bool; 2] {
        [
            self.unit_active(0, arrays.texcoords[0].is_some()),
            self.unit_active(1, arrays.texcoords[1].is_some()),
        ]
    }

    /// A unit contributes when a texture is bound, its enable bit is set and
    /// it has a texcoord source. Sphere-map generation counts as a source for
    /// unit 1.
    fn unit_active(&self, unit: usize, has_texcoords: bool) -> bool {
        let sourced = has_texcoords || (unit == 1 && self.state.sphere_map_enabled());
        self.bound_textures[unit].is_some() && self.texture_2d_enabled[unit] && sourced
    }

    fn submit_indexed(
        &mut self,
        primitive: NativePrimitive,
        vertices: &[Vertex],
        indices: Vec<u32>,
        unit_active: [bool; 2],
    ) {
        if indices.is_empty() {
            return;
        }
        if let Some(narrow) = IndexData::U32(&indices).to_u16() {
            self.submit(primitive, vertices, Some(IndexSlice::U16(&narrow)), unit_active);
        } else if self.backend.supports_wide_indices() {
            self.submit(primitive, vertices, Some(IndexSlice::U32(&indices)), unit_active);
        } else {
            error!("32-bit indices unsupported by backend, dropping draw");
        }
    }

    fn submit(
        &mut self,
        primitive: NativePrimitive,
        vertices: &[Vertex],
        indices: Option<IndexSlice<'_>>,
        unit_active: [bool; 2],
    ) {
        let globals = Globals::build(&self.transform, &self.state, unit_active);
        let submission = DrawSubmission {
            primitive,
            vertices,
            indices,
            globals: &globals,
            textures: self.bound_textures,
        };
        if let Err(err) = self.backend.draw(submission) {
            error!(%err, "draw failed");
        }
    }
}

/// Native topology for topologies that need no index rewriting.
fn native_primitive(primitive: Primitive) -> NativePrimitive {
    match primitive {
        Primitive::Points => NativePrimitive::Points,
        Primitive::Lines => NativePrimitive::Lines,
        Primitive::LineStrip => NativePrimitive::LineStrip,
        Primitive::LineLoop => NativePrimitive::LineLoop,
        Primitive::Triangles => NativePrimitive::Triangles,
        Primitive::TriangleStrip => NativePrimitive::TriangleStrip,
        Primitive::TriangleFan => NativePrimitive::TriangleFan,
        Primitive::Quads | Primitive::QuadStrip | Primitive::Polygon => NativePrimitive::Triangles,
    }
}

fn triangulated(primitive: Primitive) -> Option<NativePrimitive> {
    matches!(
        primitive,
        Primitive::Quads | Primitive::QuadStrip | Primitive::Polygon
    )
    .then_some(NativePrimitive::Triangles)
}

/// Rewrites an index list for the quad/polygon topologies into triangles.
/// Returns `None` for topologies the backend draws natively.
fn triangulate_indices(primitive: Primitive, indices: &[u32]) -> Option<Vec<u32>> {
    let n = indices.len();
    match primitive {
        Primitive::Quads => {
            let mut out = Vec::with_capacity(n / 4 * 6);
            for quad in indices.chunks_exact(4) {
                out.extend_from_slice(&[quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]);
            }
            Some(out)
        }
        Primitive::QuadStrip => {
            let mut out = Vec::new();
            let mut b = 0;
            while b + 4 <= n {
                out.extend_from_slice(&[
                    indices[b],
                    indices[b + 1],
                    indices[b + 2],
                    indices[b + 1],
                    indices[b + 3],
                    indices[b + 2],
                ]);
                b += 2;
            }
            Some(out)
        }
        Primitive::Polygon => {
            let mut out = Vec::new();
            for i in 1..n.saturating_sub(1) {
                out.extend_from_slice(&[indices[0], indices[i], indices[i + 1]]);
            }
            Some(out)
        }
        _ => None,
    }
}
