//! Client vertex arrays and the interleaver that feeds the backend.
//!
//! Legacy draws describe vertices as separate per-attribute pointers with
//! arbitrary strides and scalar types. The bridge gathers whatever arrays are
//! enabled into one tightly packed [`Vertex`] stream, filling disabled
//! attributes from the current-value state, so every draw reaches the backend
//! with the same layout.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// The single interleaved layout uploaded to the backend. Matches
/// [`crate::shader::VERTEX_STRIDE`].
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub texcoord0: [f32; 2],
    pub texcoord1: [f32; 2],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarType {
    F32,
    /// Normalized to `0.0..=1.0` on read.
    U8,
    I16,
}

impl ScalarType {
    pub fn size(self) -> usize {
        match self {
            ScalarType::F32 => 4,
            ScalarType::U8 => 1,
            ScalarType::I16 => 2,
        }
    }
}

/// One client array: a borrowed byte slice plus the layout needed to pull
/// vertex `i` out of it. The borrow only needs to live for the draw call that
/// consumes it.
#[derive(Clone, Copy, Debug)]
pub struct AttribSource<'a> {
    pub data: &'a [u8],
    pub ty: ScalarType,
    /// Scalars per vertex, 1 to 4.
    pub components: usize,
    /// Byte distance between consecutive vertices; 0 means tightly packed.
    pub stride: usize,
}

impl<'a> AttribSource<'a> {
    pub fn new(data: &'a [u8], ty: ScalarType, components: usize, stride: usize) -> Self {
        Self {
            data,
            ty,
            components,
            stride,
        }
    }

    fn effective_stride(&self) -> usize {
        if self.stride == 0 {
            self.components * self.ty.size()
        } else {
            self.stride
        }
    }

    /// Reads vertex `index` into the leading components of `out`, leaving the
    /// rest untouched so callers can pre-load defaults.
    fn fetch(
        &self,
        attrib: &'static str,
        index: usize,
        out: &mut [f32],
    ) -> Result<(), ArrayError> {
        if self.components == 0 || self.components > out.len() {
            return Err(ArrayError::BadComponents {
                attrib,
                components: self.components,
            });
        }
        let base = index * self.effective_stride();
        let needed = base + self.components * self.ty.size();
        if needed > self.data.len() {
            return Err(ArrayError::OutOfBounds {
                attrib,
                index,
                needed,
                len: self.data.len(),
            });
        }
        for c in 0..self.components {
            let at = base + c * self.ty.size();
            out[c] = match self.ty {
                ScalarType::F32 => {
                    let raw: [u8; 4] = self.data[at..at + 4].try_into().unwrap_or([0; 4]);
                    f32::from_le_bytes(raw)
                }
                ScalarType::U8 => f32::from(self.data[at]) / 255.0,
                ScalarType::I16 => {
                    let raw: [u8; 2] = self.data[at..at + 2].try_into().unwrap_or([0; 2]);
                    f32::from(i16::from_le_bytes(raw))
                }
            };
        }
        Ok(())
    }
}

/// Snapshot of the enabled client arrays for one draw. `None` means the
/// attribute falls back to its current value.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientArrays<'a> {
    pub positions: Option<AttribSource<'a>>,
    pub normals: Option<AttribSource<'a>>,
    pub colors: Option<AttribSource<'a>>,
    pub texcoords: [Option<AttribSource<'a>>; 2],
}

/// Current-value attribute state used where no array is enabled.
#[derive(Clone, Copy, Debug)]
pub struct VertexDefaults {
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub texcoord: [f32; 2],
}

impl Default for VertexDefaults {
    fn default() -> Self {
        Self {
            normal: [0.0, 0.0, 1.0],
            color: [1.0, 1.0, 1.0, 1.0],
            texcoord: [0.0, 0.0],
        }
    }
}

impl ClientArrays<'_> {
    /// Gathers vertices `first..first + count` into the interleaved layout.
    pub fn interleave(
        &self,
        first: usize,
        count: usize,
        defaults: &VertexDefaults,
    ) -> Result<Vec<Vertex>, ArrayError> {
        let positions = self.positions.ok_or(ArrayError::MissingPositions)?;
        let mut vertices = Vec::with_capacity(count);
        for i in first..first + count {
            // Position w (if supplied) is dropped; the shader re-homogenises.
            let mut pos = [0.0f32; 4];
            positions.fetch("position", i, &mut pos)?;
            let mut normal = defaults.normal;
            if let Some(src) = &self.normals {
                src.fetch("normal", i, &mut normal)?;
            }
            let mut color = defaults.color;
            if let Some(src) = &self.colors {
                // 3-component color arrays leave the default alpha of 1.0.
                src.fetch("color", i, &mut color)?;
            }
            let mut texcoord0 = defaults.texcoord;
            if let Some(src) = &self.texcoords[0] {
                src.fetch("texcoord0", i, &mut texcoord0)?;
            }
            let mut texcoord1 = defaults.texcoord;
            if let Some(src) = &self.texcoords[1] {
                src.fetch("texcoord1", i, &mut texcoord1)?;
            }
            vertices.push(Vertex {
                position: [pos[0], pos[1], pos[2]],
                normal,
                color,
                texcoord0,
                texcoord1,
            });
        }
        Ok(vertices)
    }
}

/// Borrowed index data in any of the three legacy widths.
#[derive(Clone, Copy, Debug)]
pub enum IndexData<'a> {
    U8(&'a [u8]),
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl IndexData<'_> {
    pub fn len(&self) -> usize {
        match self {
            IndexData::U8(v) => v.len(),
            IndexData::U16(v) => v.len(),
            IndexData::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest index referenced, used to size the gathered vertex range.
    pub fn max_index(&self) -> Option<u32> {
        match self {
            IndexData::U8(v) => v.iter().copied().map(u32::from).max(),
            IndexData::U16(v) => v.iter().copied().map(u32::from).max(),
            IndexData::U32(v) => v.iter().copied().max(),
        }
    }

    /// Narrows/widens to 16-bit indices. `None` when a 32-bit index does not
    /// fit, in which case the caller must keep the wide form.
    pub fn to_u16(&self) -> Option<Vec<u16>> {
        match self {
            IndexData::U8(v) => Some(v.iter().copied().map(u16::from).collect()),
            IndexData::U16(v) => Some(v.to_vec()),
            IndexData::U32(v) => v
                .iter()
                .map(|&i| u16::try_from(i).ok())
                .collect::<Option<Vec<u16>>>(),
        }
    }

    pub fn to_u32(&self) -> Vec<u32> {
        match self {
            IndexData::U8(v) => v.iter().copied().map(u32::from).collect(),
            IndexData::U16(v) => v.iter().copied().map(u32::from).collect(),
            IndexData::U32(v) => v.to_vec(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ArrayError {
    #[error("draw with no position array enabled")]
    MissingPositions,
    #[error("{attrib} array out of bounds: vertex {index} needs {needed} bytes, have {len}")]
    OutOfBounds {
        attrib: &'static str,
        index: usize,
        needed: usize,
        len: usize,
    },
    #[error("unsupported component count {components} for {attrib} array")]
    BadComponents {
        attrib: &'static str,
        components: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_matches_shader_stride() {
        assert_eq!(
            std::mem::size_of::<Vertex>() as u64,
            crate::shader::VERTEX_STRIDE
        );
    }

    #[test]
    fn interleave_fills_missing_attributes_from_defaults() {
        let positions: [f32; 6] = [0.0, 0.0, 0.0, 1.0, 2.0, 3.0];
        let arrays = ClientArrays {
            positions: Some(AttribSource::new(
                bytemuck::cast_slice(&positions),
                ScalarType::F32,
                3,
                0,
            )),
            ..Default::default()
        };
        let defaults = VertexDefaults {
            color: [0.5, 0.5, 0.5, 1.0],
            ..Default::default()
        };
        let verts = arrays.interleave(0, 2, &defaults).unwrap();
        assert_eq!(verts[1].position, [1.0, 2.0, 3.0]);
        assert_eq!(verts[0].color, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(verts[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn u8_colors_normalize_and_respect_stride() {
        // Two RGBA u8 colors padded to an 8-byte stride.
        let colors: [u8; 16] = [255, 0, 0, 255, 9, 9, 9, 9, 0, 255, 0, 255, 9, 9, 9, 9];
        let positions: [f32; 6] = [0.0; 6];
        let arrays = ClientArrays {
            positions: Some(AttribSource::new(
                bytemuck::cast_slice(&positions),
                ScalarType::F32,
                3,
                0,
            )),
            colors: Some(AttribSource::new(&colors, ScalarType::U8, 4, 8)),
            ..Default::default()
        };
        let verts = arrays
            .interleave(0, 2, &VertexDefaults::default())
            .unwrap();
        assert_eq!(verts[0].color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(verts[1].color, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn short_read_is_an_error_not_a_panic() {
        let positions: [f32; 4] = [0.0; 4];
        let arrays = ClientArrays {
            positions: Some(AttribSource::new(
                bytemuck::cast_slice(&positions),
                ScalarType::F32,
                3,
                0,
            )),
            ..Default::default()
        };
        let err = arrays
            .interleave(0, 2, &VertexDefaults::default())
            .unwrap_err();
        assert!(matches!(err, ArrayError::OutOfBounds { index: 1, .. }));
    }

    #[test]
    fn missing_positions_is_rejected() {
        let arrays = ClientArrays::default();
        assert!(matches!(
            arrays.interleave(0, 1, &VertexDefaults::default()),
            Err(ArrayError::MissingPositions)
        ));
    }

    #[test]
    fn index_narrowing() {
        let wide = [0u32, 70_000, 2];
        assert_eq!(IndexData::U32(&wide).to_u16(), None);
        assert_eq!(IndexData::U32(&wide).max_index(), Some(70_000));
        let small = [0u32, 65_535, 2];
        assert_eq!(
            IndexData::U32(&small).to_u16(),
            Some(vec![0u16, 65_535, 2])
        );
        let bytes = [3u8, 1, 2];
        assert_eq!(IndexData::U8(&bytes).to_u16(), Some(vec![3u16, 1, 2]));
    }
}
