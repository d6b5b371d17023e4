use std::fmt;

use crate::affine2d::Affine2D;
use crate::error::{MatrixError, Result};
use crate::matrix3d::Matrix3D;
use crate::vector::Vec3;

/// Borrowed view of a transform of either dimensionality.
#[derive(Debug, Clone, Copy)]
pub enum MatrixRef<'a> {
    D2(&'a Affine2D),
    D3(&'a Matrix3D),
}

impl MatrixRef<'_> {
    pub fn dims(&self) -> usize {
        match self {
            MatrixRef::D2(_) => 2,
            MatrixRef::D3(_) => 3,
        }
    }

    /// The 4x4 form; 2D matrices are lifted.
    pub fn to_matrix3d(&self) -> Matrix3D {
        match *self {
            MatrixRef::D2(a) => Matrix3D::from(a),
            MatrixRef::D3(m) => *m,
        }
    }

    /// The 2x3 form; fails for 3D matrices with out-of-plane terms.
    pub fn to_affine2d(&self) -> Result<Affine2D> {
        match *self {
            MatrixRef::D2(a) => Ok(*a),
            MatrixRef::D3(m) => Affine2D::try_from(m),
        }
    }
}

/// The operations shared by [`Affine2D`] and [`Matrix3D`], for callers that
/// hold a transform without knowing its dimensionality.
///
/// Composition post-multiplies (`self = self * X`) except for `pre_apply`.
/// Operations that only make sense in 3D (`translate_xyz`, `rotate_x`,
/// `rotate_y`, `rotate_axis`, `scale_xyz`) fail on a 2D matrix with
/// [`MatrixError::DimensionMismatch`]. Every fallible call leaves `self`
/// unchanged when it fails.
pub trait Transform: fmt::Debug + fmt::Display {
    fn as_matrix(&self) -> MatrixRef<'_>;

    fn reset(&mut self);

    /// An independent copy.
    fn get(&self) -> Box<dyn Transform>;

    /// Flat row-major coefficients, reusing `target` if it has the right
    /// length.
    fn get_into(&self, target: Option<Vec<f64>>) -> Vec<f64>;

    fn set(&mut self, src: &dyn Transform) -> Result<()>;

    fn set_slice(&mut self, src: &[f64]) -> Result<()>;

    fn translate(&mut self, tx: f64, ty: f64);

    fn translate_xyz(&mut self, tx: f64, ty: f64, tz: f64) -> Result<()>;

    /// Rotation in the xy plane.
    fn rotate(&mut self, angle: f64);

    fn rotate_x(&mut self, angle: f64) -> Result<()>;

    fn rotate_y(&mut self, angle: f64) -> Result<()>;

    fn rotate_z(&mut self, angle: f64);

    fn rotate_axis(&mut self, angle: f64, axis: Vec3) -> Result<()>;

    /// Uniform scale along every axis of the matrix.
    fn scale(&mut self, s: f64);

    fn scale_xy(&mut self, sx: f64, sy: f64);

    fn scale_xyz(&mut self, sx: f64, sy: f64, sz: f64) -> Result<()>;

    fn shear_x(&mut self, angle: f64);

    fn shear_y(&mut self, angle: f64);

    fn apply(&mut self, src: &dyn Transform) -> Result<()>;

    fn pre_apply(&mut self, src: &dyn Transform) -> Result<()>;

    fn mult(&self, v: Vec3) -> Vec3;

    fn mult_slice(&self, src: &[f64], target: Option<Vec<f64>>) -> Result<Vec<f64>>;

    fn transpose(&mut self);

    fn invert(&mut self) -> Result<()>;

    fn determinant(&self) -> f64;
}

fn needs_3d(op: &str) -> MatrixError {
    MatrixError::DimensionMismatch(format!("{op} requires a 3D matrix"))
}

impl Transform for Affine2D {
    fn as_matrix(&self) -> MatrixRef<'_> {
        MatrixRef::D2(self)
    }

    fn reset(&mut self) {
        Affine2D::reset(self);
    }

    fn get(&self) -> Box<dyn Transform> {
        Box::new(*self)
    }

    fn get_into(&self, target: Option<Vec<f64>>) -> Vec<f64> {
        Affine2D::get_into(self, target)
    }

    fn set(&mut self, src: &dyn Transform) -> Result<()> {
        *self = src.as_matrix().to_affine2d()?;
        Ok(())
    }

    fn set_slice(&mut self, src: &[f64]) -> Result<()> {
        Affine2D::set_slice(self, src)
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        Affine2D::translate(self, tx, ty);
    }

    fn translate_xyz(&mut self, _tx: f64, _ty: f64, _tz: f64) -> Result<()> {
        Err(needs_3d("translate_xyz"))
    }

    fn rotate(&mut self, angle: f64) {
        Affine2D::rotate(self, angle);
    }

    fn rotate_x(&mut self, _angle: f64) -> Result<()> {
        Err(needs_3d("rotate_x"))
    }

    fn rotate_y(&mut self, _angle: f64) -> Result<()> {
        Err(needs_3d("rotate_y"))
    }

    fn rotate_z(&mut self, angle: f64) {
        Affine2D::rotate(self, angle);
    }

    fn rotate_axis(&mut self, _angle: f64, _axis: Vec3) -> Result<()> {
        Err(needs_3d("rotate_axis"))
    }

    fn scale(&mut self, s: f64) {
        Affine2D::scale(self, s);
    }

    fn scale_xy(&mut self, sx: f64, sy: f64) {
        Affine2D::scale_xy(self, sx, sy);
    }

    fn scale_xyz(&mut self, _sx: f64, _sy: f64, _sz: f64) -> Result<()> {
        Err(needs_3d("scale_xyz"))
    }

    fn shear_x(&mut self, angle: f64) {
        Affine2D::shear_x(self, angle);
    }

    fn shear_y(&mut self, angle: f64) {
        Affine2D::shear_y(self, angle);
    }

    fn apply(&mut self, src: &dyn Transform) -> Result<()> {
        match src.as_matrix() {
            MatrixRef::D2(a) => Affine2D::apply(self, a),
            MatrixRef::D3(m) => Affine2D::apply_3d(self, m)?,
        }
        Ok(())
    }

    fn pre_apply(&mut self, src: &dyn Transform) -> Result<()> {
        match src.as_matrix() {
            MatrixRef::D2(a) => Affine2D::pre_apply(self, a),
            MatrixRef::D3(m) => Affine2D::pre_apply_3d(self, m)?,
        }
        Ok(())
    }

    fn mult(&self, v: Vec3) -> Vec3 {
        Affine2D::mult(self, v)
    }

    fn mult_slice(&self, src: &[f64], target: Option<Vec<f64>>) -> Result<Vec<f64>> {
        Affine2D::mult_slice(self, src, target)
    }

    fn transpose(&mut self) {
        Affine2D::transpose(self);
    }

    fn invert(&mut self) -> Result<()> {
        Affine2D::invert(self)
    }

    fn determinant(&self) -> f64 {
        Affine2D::determinant(self)
    }
}

impl Transform for Matrix3D {
    fn as_matrix(&self) -> MatrixRef<'_> {
        MatrixRef::D3(self)
    }

    fn reset(&mut self) {
        Matrix3D::reset(self);
    }

    fn get(&self) -> Box<dyn Transform> {
        Box::new(*self)
    }

    fn get_into(&self, target: Option<Vec<f64>>) -> Vec<f64> {
        Matrix3D::get_into(self, target)
    }

    fn set(&mut self, src: &dyn Transform) -> Result<()> {
        *self = src.as_matrix().to_matrix3d();
        Ok(())
    }

    fn set_slice(&mut self, src: &[f64]) -> Result<()> {
        Matrix3D::set_slice(self, src)
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        Matrix3D::translate(self, tx, ty, 0.0);
    }

    fn translate_xyz(&mut self, tx: f64, ty: f64, tz: f64) -> Result<()> {
        Matrix3D::translate(self, tx, ty, tz);
        Ok(())
    }

    fn rotate(&mut self, angle: f64) {
        Matrix3D::rotate_z(self, angle);
    }

    fn rotate_x(&mut self, angle: f64) -> Result<()> {
        Matrix3D::rotate_x(self, angle);
        Ok(())
    }

    fn rotate_y(&mut self, angle: f64) -> Result<()> {
        Matrix3D::rotate_y(self, angle);
        Ok(())
    }

    fn rotate_z(&mut self, angle: f64) {
        Matrix3D::rotate_z(self, angle);
    }

    fn rotate_axis(&mut self, angle: f64, axis: Vec3) -> Result<()> {
        Matrix3D::rotate_axis(self, angle, axis)
    }

    fn scale(&mut self, s: f64) {
        Matrix3D::scale(self, s);
    }

    fn scale_xy(&mut self, sx: f64, sy: f64) {
        Matrix3D::scale_xyz(self, sx, sy, 1.0);
    }

    fn scale_xyz(&mut self, sx: f64, sy: f64, sz: f64) -> Result<()> {
        Matrix3D::scale_xyz(self, sx, sy, sz);
        Ok(())
    }

    fn shear_x(&mut self, angle: f64) {
        Matrix3D::shear_x(self, angle);
    }

    fn shear_y(&mut self, angle: f64) {
        Matrix3D::shear_y(self, angle);
    }

    fn apply(&mut self, src: &dyn Transform) -> Result<()> {
        match src.as_matrix() {
            MatrixRef::D2(a) => Matrix3D::apply_affine(self, a),
            MatrixRef::D3(m) => Matrix3D::apply(self, m),
        }
        Ok(())
    }

    fn pre_apply(&mut self, src: &dyn Transform) -> Result<()> {
        match src.as_matrix() {
            MatrixRef::D2(a) => Matrix3D::pre_apply_affine(self, a),
            MatrixRef::D3(m) => Matrix3D::pre_apply(self, m),
        }
        Ok(())
    }

    fn mult(&self, v: Vec3) -> Vec3 {
        Matrix3D::mult(self, v)
    }

    fn mult_slice(&self, src: &[f64], target: Option<Vec<f64>>) -> Result<Vec<f64>> {
        Matrix3D::mult_slice(self, src, target)
    }

    fn transpose(&mut self) {
        Matrix3D::transpose(self);
    }

    fn invert(&mut self) -> Result<()> {
        Matrix3D::invert(self)
    }

    fn determinant(&self) -> f64 {
        Matrix3D::determinant(self)
    }
}
