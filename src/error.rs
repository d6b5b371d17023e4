use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatrixError>;

/// Recoverable failures of matrix operations.
///
/// None of these are fatal: a call that returns an error has left the
/// receiver exactly as it was.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// The determinant is zero (or within tolerance of zero).
    #[error("matrix is singular (determinant {det:e})")]
    Singular { det: f64 },

    /// A source or operation of the wrong dimensionality, e.g. a 3D matrix
    /// with out-of-plane terms assigned to a 2D one, or a flat buffer of
    /// the wrong length.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Ill-posed parameters such as a zero-length rotation axis.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("invalid tolerance config: {0}")]
    Config(#[from] serde_json::Error),
}
