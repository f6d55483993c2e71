//! Immediate-mode (`begin`/`vertex`/`end`) batching.
//!
//! Vertices accumulate in a CPU-side buffer between `begin` and `end`; `end`
//! hands back a batch the bridge submits like any array draw. Quad, quad-strip
//! and polygon topologies have no modern equivalent and are triangulated here
//! with 16-bit index lists.

use thiserror::Error;
use tracing::warn;

use crate::arrays::Vertex;
use crate::backend::NativePrimitive;

/// Hard cap on vertices per batch; also keeps every generated index in u16
/// range.
pub const MAX_BATCH_VERTICES: usize = 65_536;

/// Legacy primitive topologies accepted by `begin`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
    Polygon,
}

/// One finished `begin`/`end` pair, ready for submission.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub primitive: NativePrimitive,
    pub vertices: Vec<Vertex>,
    /// Present for the triangulated topologies.
    pub indices: Option<Vec<u16>>,
    /// True when any batch in the pair supplied per-vertex texcoords for the
    /// given unit, so the bridge can judge unit activity.
    pub used_texcoord: [bool; 2],
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.as_ref().is_some_and(Vec::is_empty)
    }
}

#[derive(Debug, Error)]
pub enum ImmediateError {
    #[error("begin called inside an open begin/end pair")]
    AlreadyInBatch,
    #[error("end called with no open begin/end pair")]
    NotInBatch,
}

#[derive(Debug, Default)]
pub struct ImmediateMode {
    current: Option<Primitive>,
    vertices: Vec<Vertex>,
    used_texcoord: [bool; 2],
    overflowed: bool,
}

impl ImmediateMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_batch(&self) -> bool {
        self.current.is_some()
    }

    pub fn begin(&mut self, primitive: Primitive) -> Result<(), ImmediateError> {
        if self.current.is_some() {
            return Err(ImmediateError::AlreadyInBatch);
        }
        self.current = Some(primitive);
        self.vertices.clear();
        self.used_texcoord = [false; 2];
        self.overflowed = false;
        Ok(())
    }

    /// Appends a fully resolved vertex. Past the batch cap vertices are
    /// dropped, with a single warning per batch.
    pub fn push_vertex(&mut self, vertex: Vertex) {
        if self.current.is_none() {
            return;
        }
        if self.vertices.len() >= MAX_BATCH_VERTICES {
            if !self.overflowed {
                warn!(cap = MAX_BATCH_VERTICES, "immediate-mode batch overflow, dropping vertices");
                self.overflowed = true;
            }
            return;
        }
        self.vertices.push(vertex);
    }

    /// Marks that the caller supplied an explicit texcoord for `unit` in this
    /// batch.
    pub fn note_texcoord(&mut self, unit: usize) {
        if let Some(flag) = self.used_texcoord.get_mut(unit) {
            *flag = true;
        }
    }

    pub fn end(&mut self) -> Result<Batch, ImmediateError> {
        let primitive = self.current.take().ok_or(ImmediateError::NotInBatch)?;
        let vertices = std::mem::take(&mut self.vertices);
        let n = vertices.len();
        let (primitive, indices) = match primitive {
            Primitive::Points => (NativePrimitive::Points, None),
            Primitive::Lines => (NativePrimitive::Lines, None),
            Primitive::LineStrip => (NativePrimitive::LineStrip, None),
            Primitive::LineLoop => (NativePrimitive::LineLoop, None),
            Primitive::Triangles => (NativePrimitive::Triangles, None),
            Primitive::TriangleStrip => (NativePrimitive::TriangleStrip, None),
            Primitive::TriangleFan => (NativePrimitive::TriangleFan, None),
            Primitive::Quads => (NativePrimitive::Triangles, Some(quad_indices(n))),
            Primitive::QuadStrip => (NativePrimitive::Triangles, Some(quad_strip_indices(n))),
            Primitive::Polygon => (NativePrimitive::Triangles, Some(fan_indices(n))),
        };
        Ok(Batch {
            primitive,
            vertices,
            indices,
            used_texcoord: self.used_texcoord,
        })
    }

    /// Returns a flushed batch's vertex buffer so its capacity survives to
    /// the next `begin`.
    pub fn recycle(&mut self, mut buffer: Vec<Vertex>) {
        if buffer.capacity() > self.vertices.capacity() {
            buffer.clear();
            self.vertices = buffer;
        }
    }
}

/// Each quad (a, b, c, d) becomes triangles (a, b, c) and (a, c, d).
/// Trailing vertices short of a full quad are dropped.
fn quad_indices(vertex_count: usize) -> Vec<u16> {
    let mut indices = Vec::with_capacity(vertex_count / 4 * 6);
    let mut q = 0;
    while q + 4 <= vertex_count {
        let b = q as u16;
        indices.extend_from_slice(&[b, b + 1, b + 2, b, b + 2, b + 3]);
        q += 4;
    }
    indices
}

/// Quad strips pair vertices; each step of two emits (b, b+1, b+2) and
/// (b+1, b+3, b+2), keeping a consistent winding.
fn quad_strip_indices(vertex_count: usize) -> Vec<u16> {
    let mut indices = Vec::new();
    let mut b = 0;
    while b + 4 <= vertex_count {
        let i = b as u16;
        indices.extend_from_slice(&[i, i + 1, i + 2, i + 1, i + 3, i + 2]);
        b += 2;
    }
    indices
}

/// Convex polygons fan out from the first vertex.
fn fan_indices(vertex_count: usize) -> Vec<u16> {
    let mut indices = Vec::new();
    for i in 1..vertex_count.saturating_sub(1) {
        indices.extend_from_slice(&[0, i as u16, (i + 1) as u16]);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32) -> Vertex {
        Vertex {
            position: [x, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
            color: [1.0; 4],
            texcoord0: [0.0; 2],
            texcoord1: [0.0; 2],
        }
    }

    #[test]
    fn nested_begin_is_rejected() {
        let mut imm = ImmediateMode::new();
        imm.begin(Primitive::Triangles).unwrap();
        assert!(matches!(
            imm.begin(Primitive::Quads),
            Err(ImmediateError::AlreadyInBatch)
        ));
        assert!(matches!(imm.end(), Ok(_)));
        assert!(matches!(imm.end(), Err(ImmediateError::NotInBatch)));
    }

    #[test]
    fn quads_triangulate_in_pairs() {
        let mut imm = ImmediateMode::new();
        imm.begin(Primitive::Quads).unwrap();
        for i in 0..5 {
            imm.push_vertex(vertex(i as f32));
        }
        let batch = imm.end().unwrap();
        assert_eq!(batch.primitive, NativePrimitive::Triangles);
        // The fifth vertex does not complete a quad.
        assert_eq!(batch.indices, Some(vec![0, 1, 2, 0, 2, 3]));
    }

    #[test]
    fn quad_strip_winding() {
        assert_eq!(quad_strip_indices(6), vec![0, 1, 2, 1, 3, 2, 2, 3, 4, 3, 5, 4]);
        assert_eq!(quad_strip_indices(3), Vec::<u16>::new());
    }

    #[test]
    fn polygon_fans_from_first_vertex() {
        assert_eq!(fan_indices(5), vec![0, 1, 2, 0, 2, 3, 0, 3, 4]);
        assert_eq!(fan_indices(2), Vec::<u16>::new());
    }

    #[test]
    fn empty_quad_batch_is_empty() {
        let mut imm = ImmediateMode::new();
        imm.begin(Primitive::Quads).unwrap();
        imm.push_vertex(vertex(0.0));
        let batch = imm.end().unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn overflow_drops_instead_of_growing() {
        let mut imm = ImmediateMode::new();
        imm.begin(Primitive::Points).unwrap();
        for _ in 0..MAX_BATCH_VERTICES + 10 {
            imm.push_vertex(vertex(0.0));
        }
        let batch = imm.end().unwrap();
        assert_eq!(batch.vertices.len(), MAX_BATCH_VERTICES);
    }
}
