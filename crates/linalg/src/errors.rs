use thiserror::Error;

/// A result type for structured linear algebra computations
pub type Result<T> = std::result::Result<T, LinalgError>;

/// An error raised by Kronecker operators or Cholesky factorizations
#[derive(Error, Debug)]
pub enum LinalgError {
    /// When operator and operand shapes are not compatible
    #[error("Dimension mismatch: {0}")]
    DimensionMismatchError(String),
    /// When a square matrix is required
    #[error("Matrix is not square: {0}")]
    NotSquareError(String),
    /// When a Cholesky factorization encounters a non positive definite matrix
    #[error("Matrix is not positive definite: {0}")]
    NotPositiveDefiniteError(String),
    /// When a Kronecker factor cannot be inverted
    #[error("Matrix is singular: {0}")]
    SingularMatrixError(String),
    /// When input data is not valid (not symmetric, not finite, ...)
    #[error("Invalid input: {0}")]
    InvalidInputError(String),
    /// When a parameter value is invalid
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When an array cannot be reshaped
    #[error(transparent)]
    ShapeError(#[from] ndarray::ShapeError),
    /// When extrema cannot be computed (NaN values)
    #[error(transparent)]
    MinMaxError(#[from] ndarray_stats::errors::MinMaxError),
    /// When the pure Rust backend fails
    #[error(transparent)]
    BackendError(#[from] linfa_linalg::LinalgError),
    /// When the BLAS/LAPACK backend fails
    #[cfg(feature = "blas")]
    #[error("Linalg BLAS error: {0}")]
    LinalgBlasError(#[from] ndarray_linalg::error::LinalgError),
}
