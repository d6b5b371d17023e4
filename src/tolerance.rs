use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Near-zero policy shared by every determinant check in the crate.
///
/// With `relative` set (the default) a determinant is compared against
/// `epsilon * scale`, where `scale` is the matrix's `det_bound()`, a
/// Hadamard bound (product of row lengths) on the determinant. Uniformly scaling a matrix
/// scales both sides equally, so tiny or huge scenes are judged the same as
/// unit-sized ones. With `relative` unset the comparison is against plain
/// `epsilon`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub epsilon: f64,
    pub relative: bool,
}

impl Tolerance {
    pub const DEFAULT_EPSILON: f64 = 1e-10;

    pub const fn new(epsilon: f64, relative: bool) -> Self {
        Self { epsilon, relative }
    }

    /// Parses a tolerance from JSON, e.g. `{"epsilon": 1e-8}`.
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[inline]
    pub fn threshold(&self, scale: f64) -> f64 {
        if self.relative {
            self.epsilon * scale
        } else {
            self.epsilon
        }
    }

    /// True if `det` should be treated as zero for a matrix whose
    /// determinant bound is `scale`. NaN counts as singular.
    #[inline]
    pub fn is_singular(&self, det: f64, scale: f64) -> bool {
        !(det.abs() > self.threshold(scale))
    }

    /// Absolute comparison against `epsilon`, used for coefficient checks.
    #[inline]
    pub fn is_near(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.epsilon
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EPSILON, true)
    }
}
