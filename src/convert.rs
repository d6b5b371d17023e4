// Conversions between the 2D and 3D representations.
//
// Lifting 2D -> 3D always succeeds. Degrading 3D -> 2D only succeeds when
// the 3D matrix leaves z and w alone, otherwise it would silently drop
// geometry.

use crate::affine2d::Affine2D;
use crate::error::{MatrixError, Result};
use crate::matrix3d::Matrix3D;
use crate::tolerance::Tolerance;

impl From<&Affine2D> for Matrix3D {
    fn from(src: &Affine2D) -> Self {
        let [[m00, m01, m02], [m10, m11, m12]] = *src.rows();
        Matrix3D::from_rows([
            [m00, m01, 0.0, m02],
            [m10, m11, 0.0, m12],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }
}

impl From<Affine2D> for Matrix3D {
    fn from(src: Affine2D) -> Self {
        Matrix3D::from(&src)
    }
}

impl Affine2D {
    /// Extracts the xy block of `src`.
    ///
    /// Every coefficient outside that block must match the identity within
    /// `tol.epsilon`: m02, m12, m20, m21, m23, m30, m31, m32 zero and m22,
    /// m33 one. Otherwise [`MatrixError::DimensionMismatch`] names the
    /// offending coefficients.
    pub fn try_from_3d_with(src: &Matrix3D, tol: &Tolerance) -> Result<Self> {
        let m = src.rows();
        let out_of_plane = [
            ("m02", m[0][2], 0.0),
            ("m12", m[1][2], 0.0),
            ("m20", m[2][0], 0.0),
            ("m21", m[2][1], 0.0),
            ("m22", m[2][2], 1.0),
            ("m23", m[2][3], 0.0),
            ("m30", m[3][0], 0.0),
            ("m31", m[3][1], 0.0),
            ("m32", m[3][2], 0.0),
            ("m33", m[3][3], 1.0),
        ];

        let bad: Vec<&str> = out_of_plane
            .iter()
            .filter(|(_, v, want)| !tol.is_near(*v, *want))
            .map(|(name, ..)| *name)
            .collect();
        if !bad.is_empty() {
            log::debug!("refusing to degrade Matrix3D to Affine2D: {bad:?}");
            return Err(MatrixError::DimensionMismatch(format!(
                "3D matrix is not planar ({})",
                bad.join(", ")
            )));
        }

        Ok(Affine2D::new(m[0][0], m[0][1], m[0][3], m[1][0], m[1][1], m[1][3]))
    }
}

impl TryFrom<&Matrix3D> for Affine2D {
    type Error = MatrixError;

    fn try_from(src: &Matrix3D) -> Result<Self> {
        Affine2D::try_from_3d_with(src, &Tolerance::default())
    }
}

impl TryFrom<Matrix3D> for Affine2D {
    type Error = MatrixError;

    fn try_from(src: Matrix3D) -> Result<Self> {
        Affine2D::try_from(&src)
    }
}
