use approx::assert_abs_diff_eq;

use crate::affine2d::Affine2D;
use crate::matrix3d::Matrix3D;
use crate::vector::Vec3;

const EPS: f64 = 1e-9;

/// A non-trivial, invertible 2D transform.
pub fn sample_affine() -> Affine2D {
    let mut m = Affine2D::identity();
    m.translate(3.0, -7.5);
    m.rotate(0.6);
    m.scale_xy(1.5, -0.25);
    m.shear_y(0.35);
    m
}

/// A non-trivial, invertible 3D transform with a projective bottom row.
pub fn sample_matrix3d() -> Matrix3D {
    let mut m = Matrix3D::identity();
    m.translate(1.0, -2.0, 3.0);
    m.rotate_axis(0.7, Vec3::new(1.0, 2.0, 3.0))
        .expect("axis is not degenerate");
    m.scale_xyz(2.0, 0.5, 1.5);
    m.shear_x(0.3);

    let mut persp = Matrix3D::identity();
    persp[(3, 2)] = 0.25;
    m.pre_apply(&persp);
    m
}

pub fn assert_affine_near(a: &Affine2D, b: &Affine2D) {
    for (x, y) in a.rows().iter().flatten().zip(b.rows().iter().flatten()) {
        assert_abs_diff_eq!(*x, *y, epsilon = EPS);
    }
}

pub fn assert_affine_near_identity(a: &Affine2D) {
    assert_affine_near(a, &Affine2D::identity());
}

pub fn assert_matrix_near(a: &Matrix3D, b: &Matrix3D) {
    for (x, y) in a.rows().iter().flatten().zip(b.rows().iter().flatten()) {
        assert_abs_diff_eq!(*x, *y, epsilon = EPS);
    }
}

pub fn assert_matrix_near_identity(m: &Matrix3D) {
    assert_matrix_near(m, &Matrix3D::identity());
}

pub fn assert_vec_near(a: Vec3, b: Vec3) {
    assert_abs_diff_eq!(a.x, b.x, epsilon = EPS);
    assert_abs_diff_eq!(a.y, b.y, epsilon = EPS);
    assert_abs_diff_eq!(a.z, b.z, epsilon = EPS);
}
