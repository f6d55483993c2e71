//! Array draw paths: interleaving, index width policy, quad expansion.

use glbridge::{
    AttribSource, ClientArrays, GlBridge, IndexData, NativePrimitive, Primitive, RecordingBackend,
    ScalarType,
};
use pretty_assertions::assert_eq;

fn positions(slice: &[f32]) -> AttribSource<'_> {
    AttribSource::new(bytemuck::cast_slice(slice), ScalarType::F32, 3, 0)
}

#[test]
fn draw_arrays_interleaves_with_current_values() {
    let mut gl = GlBridge::new(RecordingBackend::new());
    gl.set_color([0.0, 0.0, 1.0, 1.0]);
    let pos: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let arrays = ClientArrays {
        positions: Some(positions(&pos)),
        ..Default::default()
    };
    gl.draw_arrays(Primitive::Triangles, 0, 3, &arrays);

    let draw = gl.backend().last_draw().expect("draw recorded");
    assert_eq!(draw.primitive, NativePrimitive::Triangles);
    assert_eq!(draw.indices, None);
    assert_eq!(draw.vertices[1].position, [1.0, 0.0, 0.0]);
    // Disabled color array falls back to the current color.
    assert_eq!(draw.vertices[0].color, [0.0, 0.0, 1.0, 1.0]);
}

#[test]
fn draw_arrays_quads_expand_to_indexed_triangles() {
    let mut gl = GlBridge::new(RecordingBackend::new());
    let pos: [f32; 12] = [
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
    ];
    let arrays = ClientArrays {
        positions: Some(positions(&pos)),
        ..Default::default()
    };
    gl.draw_arrays(Primitive::Quads, 0, 4, &arrays);

    let draw = gl.backend().last_draw().unwrap();
    assert_eq!(draw.primitive, NativePrimitive::Triangles);
    assert_eq!(draw.indices, Some(vec![0, 1, 2, 0, 2, 3]));
    assert!(draw.index_width_16);
}

#[test]
fn draw_elements_gathers_through_max_index() {
    let mut gl = GlBridge::new(RecordingBackend::new());
    let pos: [f32; 12] = [
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 3.0, 0.0, 0.0,
    ];
    let arrays = ClientArrays {
        positions: Some(positions(&pos)),
        ..Default::default()
    };
    gl.draw_elements(Primitive::Triangles, IndexData::U16(&[0, 2, 3]), &arrays);

    let draw = gl.backend().last_draw().unwrap();
    // Vertices 0..=3 are gathered, indices reference them unchanged.
    assert_eq!(draw.vertices.len(), 4);
    assert_eq!(draw.indices, Some(vec![0, 2, 3]));
}

#[test]
fn wide_indices_narrow_when_they_fit() {
    let mut gl = GlBridge::new(RecordingBackend::new());
    let pos: [f32; 9] = [0.0; 9];
    let arrays = ClientArrays {
        positions: Some(positions(&pos)),
        ..Default::default()
    };
    gl.draw_elements(Primitive::Triangles, IndexData::U32(&[0, 1, 2]), &arrays);

    let draw = gl.backend().last_draw().unwrap();
    assert!(draw.index_width_16);
    assert_eq!(draw.indices, Some(vec![0, 1, 2]));
}

#[test]
fn wide_indices_dropped_on_narrow_backend() {
    let mut gl = GlBridge::new(RecordingBackend::without_wide_indices());
    let count = 70_000usize;
    let pos: Vec<f32> = vec![0.0; count * 3];
    let arrays = ClientArrays {
        positions: Some(positions(&pos)),
        ..Default::default()
    };
    gl.draw_elements(
        Primitive::Triangles,
        IndexData::U32(&[0, 35_000, 69_999]),
        &arrays,
    );
    // Logged and dropped, never a panic or a truncated draw.
    assert!(gl.backend().draws.is_empty());
}

#[test]
fn byte_indices_widen_to_u16() {
    let mut gl = GlBridge::new(RecordingBackend::new());
    let pos: [f32; 9] = [0.0; 9];
    let arrays = ClientArrays {
        positions: Some(positions(&pos)),
        ..Default::default()
    };
    gl.draw_elements(Primitive::Triangles, IndexData::U8(&[2, 1, 0]), &arrays);

    let draw = gl.backend().last_draw().unwrap();
    assert!(draw.index_width_16);
    assert_eq!(draw.indices, Some(vec![2, 1, 0]));
}

#[test]
fn unit_activity_truth_table() {
    use glbridge::{Capability, PixelFormat, PixelType};

    let pos: [f32; 9] = [0.0; 9];
    let tc: [f32; 6] = [0.0; 6];
    for (bind, coords) in [(false, false), (false, true), (true, false), (true, true)] {
        let mut gl = GlBridge::new(RecordingBackend::new());
        if bind {
            let tex = gl
                .create_texture(1, 1, PixelFormat::Rgba, PixelType::U8, &[0, 0, 0, 255])
                .unwrap();
            gl.bind_texture(Some(tex));
            gl.enable(Capability::Texture2d);
        }
        let arrays = ClientArrays {
            positions: Some(positions(&pos)),
            texcoords: [
                coords.then(|| {
                    AttribSource::new(bytemuck::cast_slice(&tc), ScalarType::F32, 2, 0)
                }),
                None,
            ],
            ..Default::default()
        };
        gl.draw_arrays(Primitive::Triangles, 0, 3, &arrays);
        let globals = &gl.backend().last_draw().unwrap().globals;
        let expected = u32::from(bind && coords);
        assert_eq!(globals.flags2[0], expected, "bind={bind} coords={coords}");
        assert_eq!(globals.flags2[1], 0);
    }
}

#[test]
fn missing_positions_drop_the_draw() {
    let mut gl = GlBridge::new(RecordingBackend::new());
    let arrays = ClientArrays::default();
    gl.draw_arrays(Primitive::Triangles, 0, 3, &arrays);
    assert!(gl.backend().draws.is_empty());
}

#[test]
fn out_of_bounds_array_drops_the_draw() {
    let mut gl = GlBridge::new(RecordingBackend::new());
    let pos: [f32; 6] = [0.0; 6];
    let arrays = ClientArrays {
        positions: Some(positions(&pos)),
        ..Default::default()
    };
    gl.draw_arrays(Primitive::Triangles, 0, 3, &arrays);
    assert!(gl.backend().draws.is_empty());
}
