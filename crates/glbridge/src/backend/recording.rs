//! A backend that records submissions instead of rendering them.
//!
//! Used throughout the test suite: tests drive the bridge with real call
//! sequences and assert on the recorded draws, uniforms and capability
//! toggles without needing a GPU adapter.

use std::collections::HashMap;

use crate::arrays::Vertex;
use crate::state::NativeCapability;
use crate::uniforms::Globals;

use super::{
    BackendError, DrawSubmission, GlBackend, IndexSlice, NativePrimitive, SamplerDesc, TextureId,
    TextureUpload,
};

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedTexture {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub data: Vec<u8>,
    pub sampler: SamplerDesc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedDraw {
    pub primitive: NativePrimitive,
    pub vertices: Vec<Vertex>,
    /// Indices widened to u32 for uniform inspection.
    pub indices: Option<Vec<u32>>,
    pub index_width_16: bool,
    pub globals: Globals,
    pub textures: [Option<TextureId>; 2],
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_texture: u32,
    pub textures: HashMap<TextureId, RecordedTexture>,
    pub draws: Vec<RecordedDraw>,
    pub capability_events: Vec<(NativeCapability, bool)>,
    wide_indices: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            wide_indices: true,
            ..Self::default()
        }
    }

    /// Mimics a downlevel device that rejects 32-bit index buffers.
    pub fn without_wide_indices() -> Self {
        Self {
            wide_indices: false,
            ..Self::default()
        }
    }

    pub fn last_draw(&self) -> Option<&RecordedDraw> {
        self.draws.last()
    }
}

impl GlBackend for RecordingBackend {
    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<TextureId, BackendError> {
        if upload.data.len() != upload.expected_len() {
            return Err(BackendError::UploadSizeMismatch {
                expected: upload.expected_len(),
                actual: upload.data.len(),
            });
        }
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(
            id,
            RecordedTexture {
                width: upload.width,
                height: upload.height,
                format: upload.format,
                data: upload.data.to_vec(),
                sampler: SamplerDesc::default(),
            },
        );
        Ok(id)
    }

    fn update_texture(
        &mut self,
        id: TextureId,
        upload: &TextureUpload<'_>,
    ) -> Result<(), BackendError> {
        if upload.data.len() != upload.expected_len() {
            return Err(BackendError::UploadSizeMismatch {
                expected: upload.expected_len(),
                actual: upload.data.len(),
            });
        }
        let texture = self
            .textures
            .get_mut(&id)
            .ok_or(BackendError::UnknownTexture(id))?;
        texture.width = upload.width;
        texture.height = upload.height;
        texture.format = upload.format;
        texture.data = upload.data.to_vec();
        Ok(())
    }

    fn set_sampler(&mut self, id: TextureId, desc: SamplerDesc) -> Result<(), BackendError> {
        let texture = self
            .textures
            .get_mut(&id)
            .ok_or(BackendError::UnknownTexture(id))?;
        texture.sampler = desc;
        Ok(())
    }

    fn delete_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }

    fn supports_wide_indices(&self) -> bool {
        self.wide_indices
    }

    fn set_native_capability(&mut self, cap: NativeCapability, enabled: bool) {
        self.capability_events.push((cap, enabled));
    }

    fn draw(&mut self, submission: DrawSubmission<'_>) -> Result<(), BackendError> {
        let (indices, index_width_16) = match submission.indices {
            Some(IndexSlice::U16(v)) => (Some(v.iter().copied().map(u32::from).collect()), true),
            Some(IndexSlice::U32(v)) => {
                if !self.wide_indices {
                    return Err(BackendError::WideIndicesUnsupported);
                }
                (Some(v.to_vec()), false)
            }
            None => (None, false),
        };
        for texture in submission.textures.into_iter().flatten() {
            if !self.textures.contains_key(&texture) {
                return Err(BackendError::UnknownTexture(texture));
            }
        }
        self.draws.push(RecordedDraw {
            primitive: submission.primitive,
            vertices: submission.vertices.to_vec(),
            indices,
            index_width_16,
            globals: *submission.globals,
            textures: submission.textures,
        });
        Ok(())
    }
}
