//! Backend seam between the bridge and the GPU.
//!
//! The bridge never talks to `wgpu` directly; it emits fully resolved draw
//! submissions through [`GlBackend`]. That keeps the translation layer
//! testable without a GPU ([`recording::RecordingBackend`]) while the real
//! renderer lives in [`wgpu_backend::WgpuBackend`].

pub mod recording;
pub mod wgpu_backend;

use thiserror::Error;

use crate::arrays::Vertex;
use crate::state::NativeCapability;
use crate::uniforms::Globals;

/// Backend-allocated texture handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Topologies the backend accepts. Fans and loops are listed here because the
/// legacy API emits them; backends without native support lower them to
/// indexed lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativePrimitive {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexSlice<'a> {
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl IndexSlice<'_> {
    pub fn len(&self) -> usize {
        match self {
            IndexSlice::U16(v) => v.len(),
            IndexSlice::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SamplerDesc {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

/// Pixel data already converted to a backend-supported format.
#[derive(Clone, Copy, Debug)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub bytes_per_pixel: u32,
    pub data: &'a [u8],
}

impl TextureUpload<'_> {
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.bytes_per_pixel as usize
    }
}

/// Everything one draw call needs, resolved to plain data.
#[derive(Clone, Copy, Debug)]
pub struct DrawSubmission<'a> {
    pub primitive: NativePrimitive,
    pub vertices: &'a [Vertex],
    pub indices: Option<IndexSlice<'a>>,
    pub globals: &'a Globals,
    /// Texture bound per unit; `None` units sample the fallback white texel
    /// but are normally flagged inactive in `globals`.
    pub textures: [Option<TextureId>; 2],
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("texture {0:?} is not allocated")]
    UnknownTexture(TextureId),
    #[error("draw submitted before a render target was configured")]
    NoRenderTarget,
    #[error("texture upload size mismatch: expected {expected} bytes, got {actual}")]
    UploadSizeMismatch { expected: usize, actual: usize },
    #[error("32-bit indices are not supported by this backend")]
    WideIndicesUnsupported,
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("no suitable wgpu adapter found")]
    NoAdapter,
    #[error("failed to acquire wgpu device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// The rendering surface the bridge draws through.
pub trait GlBackend {
    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<TextureId, BackendError>;

    /// Replaces the full contents (and possibly size/format) of a texture.
    fn update_texture(
        &mut self,
        id: TextureId,
        upload: &TextureUpload<'_>,
    ) -> Result<(), BackendError>;

    fn set_sampler(&mut self, id: TextureId, desc: SamplerDesc) -> Result<(), BackendError>;

    fn delete_texture(&mut self, id: TextureId);

    /// Whether `IndexSlice::U32` submissions are accepted.
    fn supports_wide_indices(&self) -> bool;

    /// Forwards a capability the backend owns natively.
    fn set_native_capability(&mut self, cap: NativeCapability, enabled: bool);

    fn draw(&mut self, submission: DrawSubmission<'_>) -> Result<(), BackendError>;
}
