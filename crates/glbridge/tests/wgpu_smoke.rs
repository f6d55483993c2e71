//! End-to-end draw through the real wgpu backend. Skips (with a note) when no
//! adapter is available, e.g. on bare CI runners.

use glbridge::{Capability, GlBridge, NativeCapability, Primitive, WgpuBackend};

#[test]
fn immediate_quad_renders_offscreen() {
    let backend = match pollster::block_on(WgpuBackend::new_headless()) {
        Ok(backend) => backend,
        Err(err) => {
            eprintln!("skipping wgpu smoke test: {err}");
            return;
        }
    };
    let mut gl = GlBridge::new(backend);

    gl.enable(Capability::Native(NativeCapability::DepthTest));
    gl.ortho(0.0, 256.0, 256.0, 0.0, -1.0, 1.0);
    gl.begin(Primitive::Quads);
    gl.set_color([1.0, 0.0, 0.0, 1.0]);
    gl.vertex(16.0, 16.0, 0.0);
    gl.vertex(240.0, 16.0, 0.0);
    gl.vertex(240.0, 240.0, 0.0);
    gl.vertex(16.0, 240.0, 0.0);
    gl.end();

    // A triangle fan exercises the topology lowering path on hardware.
    gl.begin(Primitive::Polygon);
    gl.set_color([0.0, 1.0, 0.0, 0.5]);
    for i in 0..6 {
        let angle = i as f32 * std::f32::consts::TAU / 6.0;
        gl.vertex(128.0 + 64.0 * angle.cos(), 128.0 + 64.0 * angle.sin(), 0.0);
    }
    gl.end();

    gl.backend()
        .device()
        .poll(wgpu::Maintain::Wait);
}
