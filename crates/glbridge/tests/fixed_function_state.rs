//! State tracking semantics observable through the uniforms a draw carries.

use glbridge::{
    Capability, CompareFunc, FogMode, FogParam, GlBridge, LightParam, MaterialParam, MatrixMode,
    NativeCapability, Primitive, RecordingBackend,
};
use pretty_assertions::assert_eq;

fn bridge() -> GlBridge<RecordingBackend> {
    GlBridge::new(RecordingBackend::new())
}

/// Draws one untextured triangle so the current uniforms get recorded.
fn flush(gl: &mut GlBridge<RecordingBackend>) {
    gl.begin(Primitive::Triangles);
    gl.vertex(0.0, 0.0, 0.0);
    gl.vertex(1.0, 0.0, 0.0);
    gl.vertex(0.0, 1.0, 0.0);
    gl.end();
}

#[test]
fn light_positions_bake_in_the_model_view_at_set_time() {
    let mut gl = bridge();
    gl.enable(Capability::Lighting);
    gl.enable(Capability::Light(0));

    gl.translate(1.0, 2.0, 3.0);
    gl.set_light(0, LightParam::Position([0.0, 0.0, 0.0, 1.0]));
    // A later matrix change must not move the light.
    gl.load_identity();
    flush(&mut gl);

    let globals = &gl.backend().last_draw().unwrap().globals;
    assert_eq!(globals.light_position[0], [1.0, 2.0, 3.0, 1.0]);
}

#[test]
fn directional_lights_ignore_translation() {
    let mut gl = bridge();
    gl.enable(Capability::Lighting);
    gl.enable(Capability::Light(0));
    gl.translate(5.0, 5.0, 5.0);
    gl.set_light(0, LightParam::Position([0.0, 0.0, 1.0, 0.0]));
    flush(&mut gl);

    let globals = &gl.backend().last_draw().unwrap().globals;
    assert_eq!(globals.light_position[0], [0.0, 0.0, 1.0, 0.0]);
}

#[test]
fn light_compaction_spans_slots() {
    let mut gl = bridge();
    gl.enable(Capability::Lighting);
    gl.enable(Capability::Light(0));
    gl.enable(Capability::Light(3));
    gl.set_light(3, LightParam::Diffuse([0.0, 0.5, 0.0, 1.0]));
    gl.disable(Capability::Light(0));
    flush(&mut gl);

    let globals = &gl.backend().last_draw().unwrap().globals;
    assert_eq!(globals.flags0, [1, 1, 0, 0]);
    assert_eq!(globals.light_diffuse[0], [0.0, 0.5, 0.0, 1.0]);
}

#[test]
fn material_and_scene_ambient_reach_the_uniforms() {
    let mut gl = bridge();
    gl.set_scene_ambient([0.1, 0.2, 0.3, 1.0]);
    gl.set_material(MaterialParam::AmbientAndDiffuse([0.4, 0.5, 0.6, 0.5]));
    gl.set_material(MaterialParam::Emission([0.05, 0.0, 0.0, 1.0]));
    flush(&mut gl);

    let globals = &gl.backend().last_draw().unwrap().globals;
    assert_eq!(globals.scene_ambient, [0.1, 0.2, 0.3, 1.0]);
    assert_eq!(globals.material_ambient, [0.4, 0.5, 0.6, 0.5]);
    assert_eq!(globals.material_diffuse, [0.4, 0.5, 0.6, 0.5]);
    assert_eq!(globals.material_emission, [0.05, 0.0, 0.0, 1.0]);
}

#[test]
fn fog_state_packs_mode_and_params() {
    let mut gl = bridge();
    gl.enable(Capability::Fog);
    gl.set_fog(FogParam::Mode(FogMode::Exp2));
    gl.set_fog(FogParam::Start(10.0));
    gl.set_fog(FogParam::End(100.0));
    gl.set_fog(FogParam::Density(0.02));
    gl.set_fog(FogParam::Color([0.5, 0.5, 0.5, 1.0]));
    flush(&mut gl);

    let globals = &gl.backend().last_draw().unwrap().globals;
    assert_eq!(globals.flags0[2], 1);
    assert_eq!(globals.flags0[3], 2);
    assert_eq!(&globals.fog_params[..3], &[10.0, 100.0, 0.02]);
    assert_eq!(globals.fog_color, [0.5, 0.5, 0.5, 1.0]);
}

#[test]
fn alpha_reference_is_clamped_to_unit_range() {
    let mut gl = bridge();
    gl.enable(Capability::AlphaTest);
    gl.alpha_func(CompareFunc::GreaterEqual, 1.5);
    flush(&mut gl);

    let globals = &gl.backend().last_draw().unwrap().globals;
    assert_eq!(globals.flags1[0], 1);
    assert_eq!(globals.flags1[1], CompareFunc::GreaterEqual as u32);
    assert_eq!(globals.fog_params[3], 1.0);
}

#[test]
fn matrix_ops_feed_the_model_view_uniform() {
    let mut gl = bridge();
    gl.matrix_mode(MatrixMode::Projection);
    gl.ortho(0.0, 640.0, 480.0, 0.0, -1.0, 1.0);
    gl.matrix_mode(MatrixMode::ModelView);
    gl.push_matrix();
    gl.translate(10.0, 20.0, 0.0);
    flush(&mut gl);
    gl.pop_matrix();
    flush(&mut gl);

    let draws = &gl.backend().draws;
    // Column-major translation column.
    assert_eq!(draws[0].globals.model_view[3], [10.0, 20.0, 0.0, 1.0]);
    assert_eq!(draws[1].globals.model_view[3], [0.0, 0.0, 0.0, 1.0]);
    // Ortho landed in the projection slot, not model-view.
    assert_eq!(draws[0].globals.projection[0][0], 2.0 / 640.0);
}

#[test]
fn native_capabilities_forward_untracked() {
    let mut gl = bridge();
    gl.enable(Capability::Native(NativeCapability::DepthTest));
    gl.disable(Capability::Native(NativeCapability::Blend));
    assert!(gl.is_enabled(Capability::Native(NativeCapability::DepthTest)));
    assert!(!gl.is_enabled(Capability::Native(NativeCapability::Blend)));
    assert_eq!(
        gl.backend().capability_events,
        vec![
            (NativeCapability::DepthTest, true),
            (NativeCapability::Blend, false),
        ]
    );
}

#[test]
fn legacy_only_capabilities_are_accepted_and_inert() {
    let mut gl = bridge();
    gl.enable(Capability::Normalize);
    gl.enable(Capability::ColorMaterial);
    assert!(!gl.is_enabled(Capability::Normalize));
    flush(&mut gl);
    assert_eq!(gl.backend().draws.len(), 1);
}

#[test]
fn sphere_map_activates_unit1_without_coords() {
    use glbridge::{PixelFormat, PixelType, TexGenAxis, TexGenMode};

    let mut gl = bridge();
    let tex = gl
        .create_texture(1, 1, PixelFormat::Rgba, PixelType::U8, &[0, 0, 0, 255])
        .unwrap();
    gl.active_texture(1);
    gl.bind_texture(Some(tex));
    gl.enable(Capability::Texture2d);
    gl.tex_gen(TexGenAxis::S, TexGenMode::SphereMap);
    gl.tex_gen(TexGenAxis::T, TexGenMode::SphereMap);
    flush(&mut gl);

    let globals = &gl.backend().last_draw().unwrap().globals;
    assert_eq!(globals.flags2, [0, 1, 1, 0]);
}
