use serde::{Deserialize, Serialize};

/// Homogeneous 4-vector `[x, y, z, w]`.
pub type Homogeneous = [f64; 4];

/// A point or direction. 2D transforms read `x` and `y` only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    #[inline]
    pub fn mag_sq(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline]
    pub fn mag(&self) -> f64 {
        self.mag_sq().sqrt()
    }

    /// Unit-length copy, or `None` if the length is at most `min_len`.
    pub fn normalized(&self, min_len: f64) -> Option<Self> {
        let len = self.mag();
        if !(len > min_len) {
            return None;
        }
        Some(Self::new(self.x / len, self.y / len, self.z / len))
    }

    /// Lifts to homogeneous coordinates with `w = 1`.
    #[inline]
    pub fn to_homogeneous(self) -> Homogeneous {
        [self.x, self.y, self.z, 1.0]
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}
