use std::fmt;
use std::ops::{Index, IndexMut, Mul};

use serde::{Deserialize, Serialize};

use crate::affine2d::Affine2D;
use crate::error::{MatrixError, Result};
use crate::scalar::{checked_recip, det3, reuse_or_alloc, row_norm_product, write_rows};
use crate::tolerance::Tolerance;
use crate::vector::{Homogeneous, Vec3};

/// A 4x4 homogeneous matrix, row-major, acting on column vectors.
///
/// Composition follows the same convention as [`Affine2D`]: the elementary
/// operations and `apply` post-multiply (`self = self * X`), `pre_apply`
/// pre-multiplies. The bottom row is not constrained, so projective
/// matrices are representable.
///
/// Not internally synchronized; share across threads only behind a lock.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix3D {
    m: [[f64; 4]; 4],
}

impl Matrix3D {
    pub const LEN: usize = 16;

    pub const fn identity() -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    pub const fn from_rows(m: [[f64; 4]; 4]) -> Self {
        Self { m }
    }

    #[inline]
    pub fn rows(&self) -> &[[f64; 4]; 4] {
        &self.m
    }

    // Elementary matrices
    // -------------------------------------------------------------------------

    pub const fn translation(tx: f64, ty: f64, tz: f64) -> Self {
        Self::from_rows([
            [1.0, 0.0, 0.0, tx],
            [0.0, 1.0, 0.0, ty],
            [0.0, 0.0, 1.0, tz],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub const fn scaling(sx: f64, sy: f64, sz: f64) -> Self {
        Self::from_rows([
            [sx, 0.0, 0.0, 0.0],
            [0.0, sy, 0.0, 0.0],
            [0.0, 0.0, sz, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, c, -s, 0.0],
            [0.0, s, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn rotation_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([
            [c, 0.0, s, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [-s, 0.0, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([
            [c, -s, 0.0, 0.0],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation by `angle` radians about `axis` (right-handed).
    ///
    /// The axis is normalized here; a zero-length axis has no direction and
    /// is rejected with [`MatrixError::DegenerateInput`].
    pub fn rotation_axis(angle: f64, axis: Vec3) -> Result<Self> {
        let Some(k) = axis.normalized(Tolerance::DEFAULT_EPSILON) else {
            log::debug!("rotation axis {axis:?} is degenerate");
            return Err(MatrixError::DegenerateInput(format!(
                "rotation axis ({}, {}, {}) has no direction",
                axis.x, axis.y, axis.z
            )));
        };

        // Principal axes get the exact elementary matrices.
        if k.y == 0.0 && k.z == 0.0 {
            return Ok(Self::rotation_x(angle * k.x));
        }
        if k.x == 0.0 && k.z == 0.0 {
            return Ok(Self::rotation_y(angle * k.y));
        }
        if k.x == 0.0 && k.y == 0.0 {
            return Ok(Self::rotation_z(angle * k.z));
        }

        // Rodrigues
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let Vec3 { x, y, z } = k;
        Ok(Self::from_rows([
            [t * x * x + c, t * x * y - s * z, t * x * z + s * y, 0.0],
            [t * x * y + s * z, t * y * y + c, t * y * z - s * x, 0.0],
            [t * x * z - s * y, t * y * z + s * x, t * z * z + c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]))
    }

    // Get / set
    // -------------------------------------------------------------------------

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

    /// Copies the sixteen coefficients, row by row, into `target` if it has
    /// exactly that length, otherwise into a new buffer. Returns the buffer
    /// written.
    pub fn get_into(&self, target: Option<Vec<f64>>) -> Vec<f64> {
        let mut out = reuse_or_alloc(target, Self::LEN);
        for (dst, src) in out.iter_mut().zip(self.m.iter().flatten()) {
            *dst = *src;
        }
        out
    }

    pub fn set_rows(&mut self, m: [[f64; 4]; 4]) {
        self.m = m;
    }

    /// Overwrites from a flat buffer: sixteen values row by row, or six
    /// values of a 2D affine matrix which are lifted.
    pub fn set_slice(&mut self, src: &[f64]) -> Result<()> {
        match src.len() {
            Self::LEN => {
                for (dst, v) in self.m.iter_mut().flatten().zip(src) {
                    *dst = *v;
                }
                Ok(())
            }
            Affine2D::LEN => {
                self.set_affine(&Affine2D::new(src[0], src[1], src[2], src[3], src[4], src[5]));
                Ok(())
            }
            n => Err(MatrixError::DimensionMismatch(format!(
                "Matrix3D expects 16 or 6 values, got {n}"
            ))),
        }
    }

    pub fn set_affine(&mut self, src: &Affine2D) {
        *self = Self::from(src);
    }

    // Composition
    // -------------------------------------------------------------------------

    pub fn translate(&mut self, tx: f64, ty: f64, tz: f64) {
        for row in &mut self.m {
            row[3] += tx * row[0] + ty * row[1] + tz * row[2];
        }
    }

    /// Rotation in the xy plane, same as [`Self::rotate_z`].
    pub fn rotate(&mut self, angle: f64) {
        self.rotate_z(angle);
    }

    pub fn rotate_x(&mut self, angle: f64) {
        self.apply(&Self::rotation_x(angle));
    }

    pub fn rotate_y(&mut self, angle: f64) {
        self.apply(&Self::rotation_y(angle));
    }

    pub fn rotate_z(&mut self, angle: f64) {
        self.apply(&Self::rotation_z(angle));
    }

    /// Rotates about an arbitrary axis. Fails, leaving `self` unchanged, if
    /// the axis has zero length.
    pub fn rotate_axis(&mut self, angle: f64, axis: Vec3) -> Result<()> {
        let r = Self::rotation_axis(angle, axis)?;
        self.apply(&r);
        Ok(())
    }

    /// Uniform scale in x, y and z.
    pub fn scale(&mut self, s: f64) {
        self.scale_xyz(s, s, s);
    }

    pub fn scale_xyz(&mut self, sx: f64, sy: f64, sz: f64) {
        for row in &mut self.m {
            row[0] *= sx;
            row[1] *= sy;
            row[2] *= sz;
        }
    }

    pub fn shear_x(&mut self, angle: f64) {
        let mut sh = Self::identity();
        sh.m[0][1] = angle.tan();
        self.apply(&sh);
    }

    pub fn shear_y(&mut self, angle: f64) {
        let mut sh = Self::identity();
        sh.m[1][0] = angle.tan();
        self.apply(&sh);
    }

    /// `self = self * src`.
    pub fn apply(&mut self, src: &Matrix3D) {
        *self = *self * *src;
    }

    /// `self = src * self`.
    pub fn pre_apply(&mut self, src: &Matrix3D) {
        *self = *src * *self;
    }

    /// [`Self::apply`] with the coefficients given as rows.
    pub fn apply_rows(&mut self, rows: [[f64; 4]; 4]) {
        self.apply(&Self::from_rows(rows));
    }

    pub fn pre_apply_rows(&mut self, rows: [[f64; 4]; 4]) {
        self.pre_apply(&Self::from_rows(rows));
    }

    /// Post-multiplies by a 2D matrix lifted into the xy block.
    pub fn apply_affine(&mut self, src: &Affine2D) {
        self.apply(&Self::from(src));
    }

    pub fn pre_apply_affine(&mut self, src: &Affine2D) {
        self.pre_apply(&Self::from(src));
    }

    // Inverse tracking
    //
    // Each `inv_*` pre-multiplies by the inverse of the matching elementary
    // matrix. Mirroring every forward call on a second matrix keeps that
    // matrix equal to the inverse of the first without calling `invert`.
    // -------------------------------------------------------------------------

    pub fn inv_translate(&mut self, tx: f64, ty: f64, tz: f64) {
        self.pre_apply(&Self::translation(-tx, -ty, -tz));
    }

    pub fn inv_rotate_x(&mut self, angle: f64) {
        self.pre_apply(&Self::rotation_x(-angle));
    }

    pub fn inv_rotate_y(&mut self, angle: f64) {
        self.pre_apply(&Self::rotation_y(-angle));
    }

    pub fn inv_rotate_z(&mut self, angle: f64) {
        self.pre_apply(&Self::rotation_z(-angle));
    }

    pub fn inv_rotate_axis(&mut self, angle: f64, axis: Vec3) -> Result<()> {
        let r = Self::rotation_axis(-angle, axis)?;
        self.pre_apply(&r);
        Ok(())
    }

    pub fn inv_scale_xyz(&mut self, sx: f64, sy: f64, sz: f64) -> Result<()> {
        let tol = Tolerance::default();
        if [sx, sy, sz].iter().any(|&s| tol.is_near(s, 0.0)) {
            return Err(MatrixError::DegenerateInput(format!(
                "scale ({sx}, {sy}, {sz}) has no inverse"
            )));
        }
        self.pre_apply(&Self::scaling(1.0 / sx, 1.0 / sy, 1.0 / sz));
        Ok(())
    }

    /// Pre-multiplies by the inverse of `src`. A singular `src` leaves
    /// `self` unchanged.
    pub fn inv_apply(&mut self, src: &Matrix3D) -> Result<()> {
        let mut inv = *src;
        inv.invert()?;
        self.pre_apply(&inv);
        Ok(())
    }

    // Vector transforms
    // -------------------------------------------------------------------------

    /// Transforms a point with `w = 1` and returns the x, y, z rows.
    ///
    /// No perspective divide is performed: for projective matrices the
    /// result is the raw homogeneous x, y, z, and `w` is available from
    /// [`Self::mult_w`] or [`Self::mult_homogeneous`].
    #[inline]
    pub fn mult(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.mult_x(v.x, v.y, v.z),
            self.mult_y(v.x, v.y, v.z),
            self.mult_z(v.x, v.y, v.z),
        )
    }

    #[inline]
    pub fn mult_into(&self, v: Vec3, target: &mut Vec3) {
        *target = self.mult(v);
    }

    #[inline]
    pub fn mult_x(&self, x: f64, y: f64, z: f64) -> f64 {
        self.row_dot(0, x, y, z)
    }

    #[inline]
    pub fn mult_y(&self, x: f64, y: f64, z: f64) -> f64 {
        self.row_dot(1, x, y, z)
    }

    #[inline]
    pub fn mult_z(&self, x: f64, y: f64, z: f64) -> f64 {
        self.row_dot(2, x, y, z)
    }

    #[inline]
    pub fn mult_w(&self, x: f64, y: f64, z: f64) -> f64 {
        self.row_dot(3, x, y, z)
    }

    #[inline]
    fn row_dot(&self, row: usize, x: f64, y: f64, z: f64) -> f64 {
        let r = &self.m[row];
        r[0] * x + r[1] * y + r[2] * z + r[3]
    }

    pub fn mult_homogeneous(&self, v: Homogeneous) -> Homogeneous {
        self.m.map(|r| r[0] * v[0] + r[1] * v[1] + r[2] * v[2] + r[3] * v[3])
    }

    /// Transforms a flat point: `[x, y, z]` (with `w = 1`, three values out)
    /// or `[x, y, z, w]` (four values out). `target` is reused when it has
    /// the output length.
    pub fn mult_slice(&self, src: &[f64], target: Option<Vec<f64>>) -> Result<Vec<f64>> {
        match *src {
            [x, y, z] => {
                let mut out = reuse_or_alloc(target, 3);
                out[0] = self.mult_x(x, y, z);
                out[1] = self.mult_y(x, y, z);
                out[2] = self.mult_z(x, y, z);
                Ok(out)
            }
            [x, y, z, w] => {
                let mut out = reuse_or_alloc(target, 4);
                out.copy_from_slice(&self.mult_homogeneous([x, y, z, w]));
                Ok(out)
            }
            _ => Err(MatrixError::DimensionMismatch(format!(
                "Matrix3D transforms 3- or 4-element points, got {}",
                src.len()
            ))),
        }
    }

    // Transpose / determinant / inverse
    // -------------------------------------------------------------------------

    pub fn transpose(&mut self) {
        for i in 0..4 {
            for j in (i + 1)..4 {
                let t = self.m[i][j];
                self.m[i][j] = self.m[j][i];
                self.m[j][i] = t;
            }
        }
    }

    /// Determinant of the 3x3 matrix left after deleting `row` and `col`.
    fn minor(&self, row: usize, col: usize) -> f64 {
        let mut sub = [[0.0; 3]; 3];
        for (si, i) in (0..4).filter(|&i| i != row).enumerate() {
            for (sj, j) in (0..4).filter(|&j| j != col).enumerate() {
                sub[si][sj] = self.m[i][j];
            }
        }
        det3(&sub)
    }

    fn cofactor(&self, row: usize, col: usize) -> f64 {
        let minor = self.minor(row, col);
        if (row + col) % 2 == 0 { minor } else { -minor }
    }

    /// Cofactor expansion along the first row. `invert` uses this same value.
    pub fn determinant(&self) -> f64 {
        (0..4).map(|j| self.m[0][j] * self.cofactor(0, j)).sum()
    }

    /// Hadamard bound used to scale the singularity threshold.
    ///
    /// With a bottom row of exactly `[0, 0, 0, 1]` the determinant is that of
    /// the 3x3 linear block, so the translation column is left out and a far
    /// away origin doesn't make a well-conditioned transform look singular.
    /// Any other bottom row lets column 3 feed the determinant, so every row
    /// counts in full.
    pub fn det_bound(&self) -> f64 {
        let m = &self.m;
        if m[3] == [0.0, 0.0, 0.0, 1.0] {
            row_norm_product(&[&m[0][..3], &m[1][..3], &m[2][..3]])
        } else {
            row_norm_product(&[&m[0][..], &m[1][..], &m[2][..], &m[3][..]])
        }
    }

    pub fn invert(&mut self) -> Result<()> {
        self.invert_with(&Tolerance::default())
    }

    /// Inverts in place via the adjugate. On a (near-)singular matrix this
    /// returns [`MatrixError::Singular`] and leaves `self` untouched.
    pub fn invert_with(&mut self, tol: &Tolerance) -> Result<()> {
        let det = self.determinant();
        let Some(inv) = checked_recip(det, self.det_bound(), tol) else {
            log::debug!("Matrix3D::invert rejected singular matrix (det {det:e})");
            return Err(MatrixError::Singular { det });
        };

        // Inverse = transpose of the cofactor matrix / det.
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = self.cofactor(j, i) * inv;
            }
        }
        self.m = out;
        Ok(())
    }
}

impl Default for Matrix3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Matrix3D {
    type Output = Matrix3D;

    fn mul(self, rhs: Matrix3D) -> Matrix3D {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (0..4).map(|k| self.m[i][k] * rhs.m[k][j]).sum();
            }
        }
        Matrix3D { m: out }
    }
}

impl Index<(usize, usize)> for Matrix3D {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.m[row][col]
    }
}

impl IndexMut<(usize, usize)> for Matrix3D {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.m[row][col]
    }
}

impl fmt::Display for Matrix3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rows(f, &self.m)
    }
}

// Tests
// -----------------------------------------------------------------------------
