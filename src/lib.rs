// Library crate root.
//
// Affine (2x3) and homogeneous (4x4) transformation matrices for positioning
// drawing primitives, plus the `Transform` trait for callers that don't know
// which of the two they hold.

pub mod error;
pub mod tolerance;
pub mod scalar;
pub mod vector;
pub mod affine2d;
pub mod matrix3d;
pub mod convert;
pub mod transform;

pub use affine2d::Affine2D;
pub use error::{MatrixError, Result};
pub use matrix3d::Matrix3D;
pub use tolerance::Tolerance;
pub use transform::{MatrixRef, Transform};
pub use vector::{Homogeneous, Vec3};

#[cfg(test)]
pub mod test_helpers;
