//! Fixed-function GL emulation on a programmable-shader backend.
//!
//! `glbridge` gives legacy immediate-mode/stateful rendering code a faithful
//! home on top of `wgpu`. The bridge shadows the classic pipeline state
//! (matrix stacks, lighting, fog, alpha test, two texture stages), resolves
//! every draw into a flat vertex stream plus a uniform snapshot, and hands it
//! to a single uber-shader. Capabilities the modern API still has (depth
//! test, blending, culling) pass through to the backend untouched.
//!
//! ```no_run
//! use glbridge::{GlBridge, Primitive, WgpuBackend};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = WgpuBackend::new_headless().await?;
//! let mut gl = GlBridge::new(backend);
//! gl.ortho(0.0, 640.0, 480.0, 0.0, -1.0, 1.0);
//! gl.begin(Primitive::Quads);
//! gl.set_color([1.0, 0.0, 0.0, 1.0]);
//! gl.vertex(10.0, 10.0, 0.0);
//! gl.vertex(110.0, 10.0, 0.0);
//! gl.vertex(110.0, 110.0, 0.0);
//! gl.vertex(10.0, 110.0, 0.0);
//! gl.end();
//! # Ok(())
//! # }
//! ```

pub mod arrays;
pub mod backend;
pub mod bridge;
pub mod immediate;
pub mod math;
pub mod pixels;
pub mod shader;
pub mod state;
pub mod uniforms;

pub use arrays::{AttribSource, ClientArrays, IndexData, ScalarType, Vertex, VertexDefaults};
pub use backend::recording::RecordingBackend;
pub use backend::wgpu_backend::WgpuBackend;
pub use backend::{
    BackendError, DrawSubmission, FilterMode, GlBackend, IndexSlice, InitError, NativePrimitive,
    SamplerDesc, TextureId, TextureUpload, WrapMode,
};
pub use bridge::{BridgeError, GlBridge};
pub use immediate::Primitive;
pub use math::{Mat4, MatrixMode, TransformState, MATRIX_STACK_DEPTH};
pub use pixels::{convert_pixels, ConvertedPixels, PixelError, PixelFormat, PixelType};
pub use state::{
    Capability, CompareFunc, FogMode, FogParam, LightColor, LightParam, MaterialParam,
    NativeCapability, TexEnvMode, TexGenAxis, TexGenMode, MAX_LIGHTS, MAX_TEXTURE_UNITS,
};
pub use uniforms::Globals;
