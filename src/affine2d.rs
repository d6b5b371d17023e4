use std::fmt;
use std::ops::{Index, IndexMut, Mul};

use serde::{Deserialize, Serialize};

use crate::error::{MatrixError, Result};
use crate::matrix3d::Matrix3D;
use crate::scalar::{checked_recip, det2, reuse_or_alloc, row_norm_product, write_rows};
use crate::tolerance::Tolerance;
use crate::vector::Vec3;

/// A 2D affine transform stored as the top two rows of a homogeneous 3x3
/// matrix.
///
/// Points are column vectors, so a point maps as:
///
/// - `x' = m00*x + m01*y + m02`
/// - `y' = m10*x + m11*y + m12`
///
/// Every composing operation (`translate`, `rotate`, `scale`, `shear_*`,
/// `apply`) post-multiplies: the newest operation acts on local coordinates
/// first, which is what a "current transformation matrix" wants.
/// `pre_apply` composes on the other side.
///
/// Not internally synchronized; share across threads only behind a lock.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Affine2D {
    // Row-major; the projective row [0, 0, 1] is implicit.
    m: [[f64; 3]; 2],
}

impl Affine2D {
    pub const LEN: usize = 6;

    pub const fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }
    }

    pub const fn new(m00: f64, m01: f64, m02: f64, m10: f64, m11: f64, m12: f64) -> Self {
        Self {
            m: [[m00, m01, m02], [m10, m11, m12]],
        }
    }

    pub const fn from_rows(m: [[f64; 3]; 2]) -> Self {
        Self { m }
    }

    #[inline]
    pub fn rows(&self) -> &[[f64; 3]; 2] {
        &self.m
    }

    pub fn reset(&mut self) {
        *self = Self::identity();
    }

    pub fn is_identity(&self) -> bool {
        let tol = Tolerance::default();
        self.m
            .iter()
            .flatten()
            .zip(Self::identity().m.iter().flatten())
            .all(|(&a, &b)| tol.is_near(a, b))
    }

    /// Copies the coefficients into `target` as `m00, m01, m02, m10, m11, m12`.
    ///
    /// `target` is reused when it already holds exactly six values; otherwise
    /// a new buffer is allocated. Either way the buffer written is returned.
    pub fn get_into(&self, target: Option<Vec<f64>>) -> Vec<f64> {
        let mut out = reuse_or_alloc(target, Self::LEN);
        for (dst, src) in out.iter_mut().zip(self.m.iter().flatten()) {
            *dst = *src;
        }
        out
    }

    pub fn set_coeffs(&mut self, m00: f64, m01: f64, m02: f64, m10: f64, m11: f64, m12: f64) {
        *self = Self::new(m00, m01, m02, m10, m11, m12);
    }

    /// Overwrites from a flat buffer: six values are taken as-is, sixteen are
    /// read as a 4x4 matrix and must pass the same check as [`Self::set_3d`].
    pub fn set_slice(&mut self, src: &[f64]) -> Result<()> {
        match src.len() {
            Self::LEN => {
                self.set_coeffs(src[0], src[1], src[2], src[3], src[4], src[5]);
                Ok(())
            }
            Matrix3D::LEN => {
                let mut m3 = Matrix3D::identity();
                m3.set_slice(src)?;
                self.set_3d(&m3)
            }
            n => Err(MatrixError::DimensionMismatch(format!(
                "Affine2D expects 6 or 16 values, got {n}"
            ))),
        }
    }

    /// Copies a 3D matrix whose out-of-plane part is identity. Fails without
    /// touching `self` otherwise.
    pub fn set_3d(&mut self, src: &Matrix3D) -> Result<()> {
        *self = Self::try_from(src)?;
        Ok(())
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        let m = &mut self.m;
        m[0][2] += tx * m[0][0] + ty * m[0][1];
        m[1][2] += tx * m[1][0] + ty * m[1][1];
    }

    /// Rotates counter-clockwise by `angle` radians.
    pub fn rotate(&mut self, angle: f64) {
        let (s, c) = angle.sin_cos();
        for row in &mut self.m {
            let (a, b) = (row[0], row[1]);
            row[0] = c * a + s * b;
            row[1] = -s * a + c * b;
        }
    }

    pub fn scale(&mut self, s: f64) {
        self.scale_xy(s, s);
    }

    pub fn scale_xy(&mut self, sx: f64, sy: f64) {
        for row in &mut self.m {
            row[0] *= sx;
            row[1] *= sy;
        }
    }

    pub fn shear_x(&mut self, angle: f64) {
        self.apply(&Self::new(1.0, angle.tan(), 0.0, 0.0, 1.0, 0.0));
    }

    pub fn shear_y(&mut self, angle: f64) {
        self.apply(&Self::new(1.0, 0.0, 0.0, angle.tan(), 1.0, 0.0));
    }

    /// `self = self * src`.
    pub fn apply(&mut self, src: &Affine2D) {
        *self = *self * *src;
    }

    /// `self = src * self`.
    pub fn pre_apply(&mut self, src: &Affine2D) {
        *self = *src * *self;
    }

    /// [`Self::apply`] with the six coefficients given row by row.
    pub fn apply_coeffs(&mut self, m00: f64, m01: f64, m02: f64, m10: f64, m11: f64, m12: f64) {
        self.apply(&Self::new(m00, m01, m02, m10, m11, m12));
    }

    pub fn pre_apply_coeffs(
        &mut self,
        m00: f64,
        m01: f64,
        m02: f64,
        m10: f64,
        m11: f64,
        m12: f64,
    ) {
        self.pre_apply(&Self::new(m00, m01, m02, m10, m11, m12));
    }

    /// Post-multiplies by a 3D matrix that degrades cleanly to 2D.
    pub fn apply_3d(&mut self, src: &Matrix3D) -> Result<()> {
        let src = Self::try_from(src)?;
        self.apply(&src);
        Ok(())
    }

    pub fn pre_apply_3d(&mut self, src: &Matrix3D) -> Result<()> {
        let src = Self::try_from(src)?;
        self.pre_apply(&src);
        Ok(())
    }

    /// Transforms a point (implicit `w = 1`). `z` is passed through, matching
    /// what the lifted 4x4 form of this matrix does.
    #[inline]
    pub fn mult(&self, v: Vec3) -> Vec3 {
        Vec3::new(self.mult_x(v.x, v.y), self.mult_y(v.x, v.y), v.z)
    }

    /// Same as [`Self::mult`], writing into a caller-owned slot.
    #[inline]
    pub fn mult_into(&self, v: Vec3, target: &mut Vec3) {
        *target = self.mult(v);
    }

    #[inline]
    pub fn mult_x(&self, x: f64, y: f64) -> f64 {
        self.m[0][0] * x + self.m[0][1] * y + self.m[0][2]
    }

    #[inline]
    pub fn mult_y(&self, x: f64, y: f64) -> f64 {
        self.m[1][0] * x + self.m[1][1] * y + self.m[1][2]
    }

    /// Transforms a flat `[x, y]` point. `target` is reused when it has
    /// length two.
    pub fn mult_slice(&self, src: &[f64], target: Option<Vec<f64>>) -> Result<Vec<f64>> {
        let &[x, y] = src else {
            return Err(MatrixError::DimensionMismatch(format!(
                "Affine2D transforms 2-element points, got {}",
                src.len()
            )));
        };
        let mut out = reuse_or_alloc(target, 2);
        out[0] = self.mult_x(x, y);
        out[1] = self.mult_y(x, y);
        Ok(out)
    }

    /// Swaps `m01` and `m10`.
    ///
    /// A 2x3 matrix has no transpose of the same shape, so only the 2x2
    /// linear block is transposed and the translation column is left as is.
    pub fn transpose(&mut self) {
        let t = self.m[0][1];
        self.m[0][1] = self.m[1][0];
        self.m[1][0] = t;
    }

    /// Determinant of the 2x2 linear part. Translation does not affect it.
    #[inline]
    pub fn determinant(&self) -> f64 {
        det2(self.m[0][0], self.m[0][1], self.m[1][0], self.m[1][1])
    }

    pub fn invert(&mut self) -> Result<()> {
        self.invert_with(&Tolerance::default())
    }

    /// Inverts in place. On a (near-)singular matrix this returns
    /// [`MatrixError::Singular`] and leaves `self` untouched.
    pub fn invert_with(&mut self, tol: &Tolerance) -> Result<()> {
        let det = self.determinant();
        let Some(inv) = checked_recip(det, self.det_bound(), tol) else {
            log::debug!("Affine2D::invert rejected singular matrix (det {det:e})");
            return Err(MatrixError::Singular { det });
        };

        let [[m00, m01, m02], [m10, m11, m12]] = self.m;
        self.m = [
            [m11 * inv, -m01 * inv, (m01 * m12 - m11 * m02) * inv],
            [-m10 * inv, m00 * inv, (m10 * m02 - m00 * m12) * inv],
        ];
        Ok(())
    }

    /// Hadamard bound of the linear part; the singularity threshold used by
    /// `invert` is relative to it.
    pub fn det_bound(&self) -> f64 {
        row_norm_product(&[&self.m[0][..2], &self.m[1][..2]])
    }
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Affine2D {
    type Output = Affine2D;

    // Product of the two implicit 3x3 matrices; the result is built into a
    // fresh array so neither operand is read after being overwritten.
    fn mul(self, rhs: Affine2D) -> Affine2D {
        let a = &self.m;
        let b = &rhs.m;
        let mut out = [[0.0; 3]; 2];
        for (i, row) in out.iter_mut().enumerate() {
            row[0] = a[i][0] * b[0][0] + a[i][1] * b[1][0];
            row[1] = a[i][0] * b[0][1] + a[i][1] * b[1][1];
            row[2] = a[i][0] * b[0][2] + a[i][1] * b[1][2] + a[i][2];
        }
        Affine2D { m: out }
    }
}

impl Index<(usize, usize)> for Affine2D {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.m[row][col]
    }
}

impl IndexMut<(usize, usize)> for Affine2D {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.m[row][col]
    }
}

impl fmt::Display for Affine2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rows(f, &self.m)
    }
}

// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::test_helpers::{assert_affine_near, assert_affine_near_identity, sample_affine};

    #[test]
    fn identity_law() {
        let m = sample_affine();

        let mut a = m;
        a.apply(&Affine2D::identity());
        assert_affine_near(&a, &m);

        let mut b = Affine2D::identity();
        b.apply(&m);
        assert_affine_near(&b, &m);

        let mut c = m;
        c.pre_apply(&Affine2D::identity());
        assert_affine_near(&c, &m);
    }

    #[test]
    fn rotate_quarter_turn_maps_x_to_y() {
        let mut m = Affine2D::identity();
        m.scale(5.0);
        m.reset();
        m.rotate(FRAC_PI_2);
        let p = m.mult(Vec3::xy(1.0, 0.0));
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn translate_then_rotate_differs_from_rotate_then_translate() {
        let mut tr = Affine2D::identity();
        tr.translate(3.0, -2.0);
        tr.rotate(FRAC_PI_4);

        let mut rt = Affine2D::identity();
        rt.rotate(FRAC_PI_4);
        rt.translate(3.0, -2.0);

        assert!((tr[(0, 2)] - rt[(0, 2)]).abs() > 1e-3 || (tr[(1, 2)] - rt[(1, 2)]).abs() > 1e-3);

        // Post-multiply: the last call acts on the point first.
        let p = tr.mult(Vec3::xy(1.0, 0.0));
        let s = FRAC_PI_4.sin();
        assert_abs_diff_eq!(p.x, 3.0 + s, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, -2.0 + s, epsilon = 1e-12);
    }

    #[test]
    fn translate_accumulates_in_local_frame() {
        let mut m = Affine2D::identity();
        m.scale_xy(2.0, 3.0);
        m.translate(1.0, 1.0);
        assert_eq!(m, Affine2D::new(2.0, 0.0, 2.0, 0.0, 3.0, 3.0));
    }

    #[test]
    fn shear_uses_tangent() {
        let mut m = Affine2D::identity();
        m.shear_x(FRAC_PI_4);
        let p = m.mult(Vec3::xy(0.0, 2.0));
        assert_abs_diff_eq!(p.x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 2.0, epsilon = 1e-12);

        let mut m = Affine2D::identity();
        m.shear_y(FRAC_PI_4);
        let p = m.mult(Vec3::xy(2.0, 0.0));
        assert_abs_diff_eq!(p.x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn pre_apply_composes_on_the_world_side() {
        let mut child = Affine2D::identity();
        child.translate(1.0, 0.0);

        let mut parent = Affine2D::identity();
        parent.rotate(FRAC_PI_2);

        child.pre_apply(&parent);
        let p = child.mult(Vec3::xy(0.0, 0.0));
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn apply_coeffs_matches_apply() {
        let mut a = sample_affine();
        let mut b = a;
        a.apply_coeffs(2.0, 0.5, -1.0, 0.0, 3.0, 4.0);
        b.apply(&Affine2D::new(2.0, 0.5, -1.0, 0.0, 3.0, 4.0));
        assert_eq!(a, b);

        a.pre_apply_coeffs(1.0, 0.0, 7.0, 0.0, 1.0, -7.0);
        b.pre_apply(&Affine2D::new(1.0, 0.0, 7.0, 0.0, 1.0, -7.0));
        assert_eq!(a, b);
    }

    #[test]
    fn apply_3d_accepts_planar_source() {
        let planar = Matrix3D::from(Affine2D::new(2.0, 0.0, 1.0, 0.0, 3.0, -1.0));

        let mut a = sample_affine();
        let mut want = a;
        a.apply_3d(&planar).unwrap();
        want.apply(&Affine2D::new(2.0, 0.0, 1.0, 0.0, 3.0, -1.0));
        assert_affine_near(&a, &want);

        let mut a = sample_affine();
        let mut want = a;
        a.pre_apply_3d(&planar).unwrap();
        want.pre_apply(&Affine2D::new(2.0, 0.0, 1.0, 0.0, 3.0, -1.0));
        assert_affine_near(&a, &want);
    }

    #[test]
    fn apply_3d_rejects_non_planar_source() {
        let mut deep = Matrix3D::identity();
        deep.rotate_x(0.5);

        let mut m = sample_affine();
        let before = m;
        assert!(matches!(m.apply_3d(&deep), Err(MatrixError::DimensionMismatch(_))));
        assert_eq!(m, before);
        assert!(matches!(m.pre_apply_3d(&deep), Err(MatrixError::DimensionMismatch(_))));
        assert_eq!(m, before);
    }

    #[test]
    fn self_apply_uses_original_operand() {
        let mut m = Affine2D::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let copy = m;
        m.apply(&copy);
        // [1 2 3; 4 5 6; 0 0 1]^2
        assert_eq!(m, Affine2D::new(9.0, 12.0, 18.0, 24.0, 33.0, 48.0));
    }

    #[test]
    fn inverse_law() {
        let m = sample_affine();
        let mut inv = m;
        inv.invert().unwrap();

        let mut a = inv;
        a.apply(&m);
        assert_affine_near_identity(&a);

        let mut b = m;
        b.apply(&inv);
        assert_affine_near_identity(&b);
    }

    #[test]
    fn singular_invert_leaves_matrix_untouched() {
        let mut m = Affine2D::new(1.0, 1.0, 5.0, 1.0, 1.0, -2.0);
        let before = m;
        for _ in 0..2 {
            let err = m.invert().unwrap_err();
            assert!(matches!(err, MatrixError::Singular { det } if det == 0.0));
            assert_eq!(m, before);
        }
    }

    #[test]
    fn invert_survives_large_translation() {
        let mut m = Affine2D::identity();
        m.translate(1e9, -1e9);
        m.scale(1e-3);
        let mut inv = m;
        inv.invert().unwrap();
        let p = inv.mult(m.mult(Vec3::xy(4.0, 7.0)));
        assert_abs_diff_eq!(p.x, 4.0, epsilon = 1e-3);
        assert_abs_diff_eq!(p.y, 7.0, epsilon = 1e-3);
    }

    #[test]
    fn determinant_is_multiplicative() {
        let a = sample_affine();
        let mut b = Affine2D::identity();
        b.rotate(0.3);
        b.scale_xy(2.0, -0.5);
        b.shear_x(0.2);

        let mut ab = a;
        ab.apply(&b);
        assert_abs_diff_eq!(
            ab.determinant(),
            a.determinant() * b.determinant(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn determinant_ignores_translation() {
        let mut m = Affine2D::identity();
        m.scale_xy(2.0, 3.0);
        let d = m.determinant();
        m.pre_apply(&Affine2D::new(1.0, 0.0, 40.0, 0.0, 1.0, -9.0));
        assert_eq!(m.determinant(), d);
        assert_eq!(d, 6.0);
    }

    #[test]
    fn get_set_round_trip() {
        let m = sample_affine();
        let buf = m.get_into(None);
        assert_eq!(buf.len(), 6);

        let mut n = Affine2D::identity();
        n.set_slice(&buf).unwrap();
        assert_eq!(n, m);

        // A correctly sized buffer is reused, a wrong one replaced.
        let ptr = buf.as_ptr();
        let buf = n.get_into(Some(buf));
        assert_eq!(buf.as_ptr(), ptr);
        assert_eq!(n.get_into(Some(vec![0.0; 3])).len(), 6);
    }

    #[test]
    fn set_slice_rejects_bad_length() {
        let mut m = sample_affine();
        let before = m;
        let err = m.set_slice(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, MatrixError::DimensionMismatch(_)));
        assert_eq!(m, before);
    }

    #[test]
    fn set_slice_accepts_flat_3d_only_when_planar() {
        let mut m = Affine2D::identity();
        #[rustfmt::skip]
        let planar = [
            2.0, 0.0, 0.0, 5.0,
            0.0, 3.0, 0.0, 6.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        m.set_slice(&planar).unwrap();
        assert_eq!(m, Affine2D::new(2.0, 0.0, 5.0, 0.0, 3.0, 6.0));

        let mut tilted = planar;
        tilted[11] = 4.0; // m23
        assert!(m.set_slice(&tilted).is_err());
        assert_eq!(m, Affine2D::new(2.0, 0.0, 5.0, 0.0, 3.0, 6.0));
    }

    #[test]
    fn mult_slice_and_into() {
        let mut m = Affine2D::identity();
        m.translate(10.0, 20.0);

        let out = m.mult_slice(&[1.0, 2.0], None).unwrap();
        assert_eq!(out, vec![11.0, 22.0]);

        let out = m.mult_slice(&[0.0, 0.0], Some(out)).unwrap();
        assert_eq!(out, vec![10.0, 20.0]);

        assert!(m.mult_slice(&[1.0, 2.0, 3.0], None).is_err());

        let mut slot = Vec3::default();
        m.mult_into(Vec3::new(1.0, 1.0, 7.0), &mut slot);
        assert_eq!(slot, Vec3::new(11.0, 21.0, 7.0));
    }

    #[test]
    fn transpose_swaps_linear_block_only() {
        let mut m = Affine2D::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        m.transpose();
        assert_eq!(m, Affine2D::new(1.0, 4.0, 3.0, 2.0, 5.0, 6.0));
    }

    #[test]
    fn rotate_full_turn_is_identity() {
        let mut m = Affine2D::identity();
        m.rotate(2.0 * PI);
        assert!(m.is_identity());
        m.translate(1.0, 0.0);
        assert!(!m.is_identity());
    }

    #[test]
    fn display_aligns_columns() {
        let m = Affine2D::new(1.0, -0.0, 12.5, 0.0, 1.0, -3.0);
        let s = m.to_string();
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "[  1.0000  0.0000 12.5000 ]");
        assert_eq!(lines[1], "[  0.0000  1.0000 -3.0000 ]");
    }

    #[test]
    fn serde_round_trip() {
        let m = sample_affine();
        let json = serde_json::to_string(&m).unwrap();
        let back: Affine2D = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
