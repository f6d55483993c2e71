//! Software matrix stacks mirroring the legacy transform state.
//!
//! Matrices are column-major `[f32; 16]`, matching both the legacy API's
//! in-memory layout and WGSL's `mat4x4<f32>` column-major convention, so
//! stack tops can be copied straight into the uniform block.

/// Column-major 4x4 matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4(pub [f32; 16]);

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        Self(m)
    };

    pub fn from_cols_array(m: [f32; 16]) -> Self {
        Self(m)
    }

    pub fn to_cols_array(self) -> [f32; 16] {
        self.0
    }

    /// Column-major 2D array, the layout `bytemuck` uniform fields use.
    pub fn to_cols_2d(self) -> [[f32; 4]; 4] {
        let m = self.0;
        [
            [m[0], m[1], m[2], m[3]],
            [m[4], m[5], m[6], m[7]],
            [m[8], m[9], m[10], m[11]],
            [m[12], m[13], m[14], m[15]],
        ]
    }

    /// `self * rhs` (column-major, column vectors).
    pub fn multiply(&self, rhs: &Mat4) -> Mat4 {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [0.0f32; 16];
        for c in 0..4 {
            for r in 0..4 {
                let mut s = 0.0;
                for k in 0..4 {
                    s += a[k * 4 + r] * b[c * 4 + k];
                }
                out[c * 4 + r] = s;
            }
        }
        Mat4(out)
    }

    /// Transforms a 4-component column vector.
    pub fn transform4(&self, v: [f32; 4]) -> [f32; 4] {
        let m = &self.0;
        let mut out = [0.0f32; 4];
        for r in 0..4 {
            out[r] = m[r] * v[0] + m[4 + r] * v[1] + m[8 + r] * v[2] + m[12 + r] * v[3];
        }
        out
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        let mut m = Self::IDENTITY.0;
        m[12] = x;
        m[13] = y;
        m[14] = z;
        Mat4(m)
    }

    pub fn scaling(x: f32, y: f32, z: f32) -> Mat4 {
        let mut m = Self::IDENTITY.0;
        m[0] = x;
        m[5] = y;
        m[10] = z;
        Mat4(m)
    }

    /// Rotation of `angle_deg` degrees about `axis`. Returns `None` for a
    /// near-zero axis; callers treat that as a no-op rather than dividing by
    /// zero.
    pub fn rotation(angle_deg: f32, axis: [f32; 3]) -> Option<Mat4> {
        let len = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        if len < 1e-7 {
            return None;
        }
        let (x, y, z) = (axis[0] / len, axis[1] / len, axis[2] / len);
        let rad = angle_deg.to_radians();
        let (s, c) = rad.sin_cos();
        let t = 1.0 - c;

        let mut m = Self::IDENTITY.0;
        m[0] = c + x * x * t;
        m[1] = y * x * t + z * s;
        m[2] = z * x * t - y * s;
        m[4] = x * y * t - z * s;
        m[5] = c + y * y * t;
        m[6] = z * y * t + x * s;
        m[8] = x * z * t + y * s;
        m[9] = y * z * t - x * s;
        m[10] = c + z * z * t;
        Some(Mat4(m))
    }

    /// Standard GL orthographic projection.
    pub fn ortho(l: f64, r: f64, b: f64, t: f64, n: f64, f: f64) -> Mat4 {
        let mut m = Self::IDENTITY.0;
        m[0] = (2.0 / (r - l)) as f32;
        m[5] = (2.0 / (t - b)) as f32;
        m[10] = (-2.0 / (f - n)) as f32;
        m[12] = (-(r + l) / (r - l)) as f32;
        m[13] = (-(t + b) / (t - b)) as f32;
        m[14] = (-(f + n) / (f - n)) as f32;
        Mat4(m)
    }

    /// Standard GL perspective frustum.
    pub fn frustum(l: f64, r: f64, b: f64, t: f64, n: f64, f: f64) -> Mat4 {
        let mut m = [0.0f32; 16];
        m[0] = (2.0 * n / (r - l)) as f32;
        m[5] = (2.0 * n / (t - b)) as f32;
        m[8] = ((r + l) / (r - l)) as f32;
        m[9] = ((t + b) / (t - b)) as f32;
        m[10] = (-(f + n) / (f - n)) as f32;
        m[11] = -1.0;
        m[14] = (-2.0 * f * n / (f - n)) as f32;
        Mat4(m)
    }

    /// Normal matrix: inverse-transpose of the upper-left 3x3, widened back
    /// to 4x4 for the uniform block. Falls back to the input for singular
    /// matrices (the eye never sees geometry collapsed to zero volume).
    pub fn normal_matrix(&self) -> Mat4 {
        let m = &self.0;
        // Upper-left 3x3, column-major.
        let a = [m[0], m[1], m[2], m[4], m[5], m[6], m[8], m[9], m[10]];
        let det = a[0] * (a[4] * a[8] - a[5] * a[7]) - a[3] * (a[1] * a[8] - a[2] * a[7])
            + a[6] * (a[1] * a[5] - a[2] * a[4]);
        if det.abs() < 1e-12 {
            let mut out = *self;
            out.0[12] = 0.0;
            out.0[13] = 0.0;
            out.0[14] = 0.0;
            return out;
        }
        let inv_det = 1.0 / det;
        // Inverse is adjugate / det; transposing the inverse of a column-major
        // 3x3 lands the cofactors back in row-major cofactor order.
        let cof = [
            a[4] * a[8] - a[5] * a[7],
            a[5] * a[6] - a[3] * a[8],
            a[3] * a[7] - a[4] * a[6],
            a[2] * a[7] - a[1] * a[8],
            a[0] * a[8] - a[2] * a[6],
            a[1] * a[6] - a[0] * a[7],
            a[1] * a[5] - a[2] * a[4],
            a[2] * a[3] - a[0] * a[5],
            a[0] * a[4] - a[1] * a[3],
        ];
        let mut out = Self::IDENTITY.0;
        for col in 0..3 {
            for row in 0..3 {
                out[col * 4 + row] = cof[col * 3 + row] * inv_det;
            }
        }
        Mat4(out)
    }
}

/// Which stack subsequent matrix operations target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MatrixMode {
    #[default]
    ModelView,
    Projection,
    Texture,
}

pub const MATRIX_STACK_DEPTH: usize = 32;

/// Fixed-depth matrix stack. Never empty: the bottom entry is always valid,
/// push at full depth and pop at depth 1 are no-ops.
#[derive(Clone, Debug)]
pub struct MatrixStack {
    entries: [Mat4; MATRIX_STACK_DEPTH],
    top: usize,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixStack {
    pub fn new() -> Self {
        Self {
            entries: [Mat4::IDENTITY; MATRIX_STACK_DEPTH],
            top: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.top + 1
    }

    pub fn top(&self) -> &Mat4 {
        &self.entries[self.top]
    }

    pub fn top_mut(&mut self) -> &mut Mat4 {
        &mut self.entries[self.top]
    }

    /// Duplicates the top. Silently ignored at full depth.
    pub fn push(&mut self) {
        if self.top + 1 < MATRIX_STACK_DEPTH {
            self.entries[self.top + 1] = self.entries[self.top];
            self.top += 1;
        }
    }

    /// Discards the top. Silently ignored at depth 1.
    pub fn pop(&mut self) {
        if self.top > 0 {
            self.top -= 1;
        }
    }
}

/// The three legacy matrix stacks plus the mode selector.
#[derive(Clone, Debug, Default)]
pub struct TransformState {
    pub mode: MatrixMode,
    model_view: MatrixStack,
    projection: MatrixStack,
    texture: MatrixStack,
}

impl TransformState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack(&self, mode: MatrixMode) -> &MatrixStack {
        match mode {
            MatrixMode::ModelView => &self.model_view,
            MatrixMode::Projection => &self.projection,
            MatrixMode::Texture => &self.texture,
        }
    }

    fn stack_mut(&mut self, mode: MatrixMode) -> &mut MatrixStack {
        match mode {
            MatrixMode::ModelView => &mut self.model_view,
            MatrixMode::Projection => &mut self.projection,
            MatrixMode::Texture => &mut self.texture,
        }
    }

    pub fn current(&self) -> &Mat4 {
        self.stack(self.mode).top()
    }

    pub fn model_view(&self) -> &Mat4 {
        self.model_view.top()
    }

    pub fn projection(&self) -> &Mat4 {
        self.projection.top()
    }

    pub fn texture(&self) -> &Mat4 {
        self.texture.top()
    }

    pub fn load_identity(&mut self) {
        *self.stack_mut(self.mode).top_mut() = Mat4::IDENTITY;
    }

    pub fn load_matrix(&mut self, m: Mat4) {
        *self.stack_mut(self.mode).top_mut() = m;
    }

    /// Post-multiplies the current matrix: `top = top * m`, the legacy
    /// convention where the newest transform applies first to vertices.
    pub fn mult_matrix(&mut self, m: &Mat4) {
        let top = self.stack_mut(self.mode).top_mut();
        *top = top.multiply(m);
    }

    pub fn push(&mut self) {
        self.stack_mut(self.mode).push();
    }

    pub fn pop(&mut self) {
        self.stack_mut(self.mode).pop();
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.mult_matrix(&Mat4::translation(x, y, z));
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.mult_matrix(&Mat4::scaling(x, y, z));
    }

    /// No-op for a near-zero axis.
    pub fn rotate(&mut self, angle_deg: f32, axis: [f32; 3]) {
        if let Some(r) = Mat4::rotation(angle_deg, axis) {
            self.mult_matrix(&r);
        }
    }

    pub fn ortho(&mut self, l: f64, r: f64, b: f64, t: f64, n: f64, f: f64) {
        self.mult_matrix(&Mat4::ortho(l, r, b, t, n, f));
    }

    pub fn frustum(&mut self, l: f64, r: f64, b: f64, t: f64, n: f64, f: f64) {
        self.mult_matrix(&Mat4::frustum(l, r, b, t, n, f));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &Mat4, b: &Mat4) -> bool {
        a.0.iter().zip(b.0.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn multiply_by_identity_is_identity_op() {
        let m = Mat4::translation(1.0, 2.0, 3.0);
        assert!(approx_eq(&m.multiply(&Mat4::IDENTITY), &m));
        assert!(approx_eq(&Mat4::IDENTITY.multiply(&m), &m));
    }

    #[test]
    fn rotation_zero_axis_is_none() {
        assert!(Mat4::rotation(90.0, [0.0, 0.0, 0.0]).is_none());
        assert!(Mat4::rotation(90.0, [1e-9, 0.0, 0.0]).is_none());
    }

    #[test]
    fn rotation_90_about_z_maps_x_to_y() {
        let r = Mat4::rotation(90.0, [0.0, 0.0, 1.0]).unwrap();
        let v = r.transform4([1.0, 0.0, 0.0, 0.0]);
        assert!((v[0]).abs() < 1e-6);
        assert!((v[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normal_matrix_of_uniform_scale_is_inverse_scale() {
        let m = Mat4::scaling(2.0, 2.0, 2.0);
        let n = m.normal_matrix();
        assert!((n.0[0] - 0.5).abs() < 1e-6);
        assert!((n.0[5] - 0.5).abs() < 1e-6);
        assert!((n.0[10] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn normal_matrix_corrects_non_uniform_scale() {
        // For S = diag(2, 1, 1), a normal along +X on a plane facing +X must
        // stay along +X after normalization; inverse-transpose gives 0.5.
        let m = Mat4::scaling(2.0, 1.0, 1.0);
        let n = m.normal_matrix();
        let v = n.transform4([1.0, 0.0, 0.0, 0.0]);
        assert!((v[0] - 0.5).abs() < 1e-6);
        assert!(v[1].abs() < 1e-6);
    }

    #[test]
    fn translate_then_unit_scale_is_pure_translation() {
        let mut t = TransformState::new();
        t.load_identity();
        t.translate(3.0, -1.0, 7.5);
        t.translate(0.0, 2.0, 0.5);
        t.scale(1.0, 1.0, 1.0);
        assert!(approx_eq(t.model_view(), &Mat4::translation(3.0, 1.0, 8.0)));
    }

    #[test]
    fn stack_push_copies_top_and_pop_restores() {
        let mut s = MatrixStack::new();
        *s.top_mut() = Mat4::translation(5.0, 0.0, 0.0);
        s.push();
        assert_eq!(s.depth(), 2);
        assert!(approx_eq(s.top(), &Mat4::translation(5.0, 0.0, 0.0)));
        *s.top_mut() = Mat4::IDENTITY;
        s.pop();
        assert!(approx_eq(s.top(), &Mat4::translation(5.0, 0.0, 0.0)));
    }

    #[test]
    fn stack_never_underflows() {
        let mut s = MatrixStack::new();
        *s.top_mut() = Mat4::translation(1.0, 1.0, 1.0);
        for _ in 0..8 {
            s.pop();
        }
        assert_eq!(s.depth(), 1);
        assert!(approx_eq(s.top(), &Mat4::translation(1.0, 1.0, 1.0)));
    }

    #[test]
    fn stack_push_saturates_at_depth_limit() {
        let mut s = MatrixStack::new();
        for _ in 0..MATRIX_STACK_DEPTH + 4 {
            s.push();
        }
        assert_eq!(s.depth(), MATRIX_STACK_DEPTH);
    }
}
