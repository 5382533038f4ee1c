//! This library implements the structured dense linear algebra needed to keep
//! [Gaussian process](https://en.wikipedia.org/wiki/Gaussian_process) computations tractable:
//!
//! * matrix-free products and solves with a [Kronecker product](https://en.wikipedia.org/wiki/Kronecker_product)
//!   of small matrices, see [KroneckerOperator], [kron_prod] and [kron_solve],
//! * update of a Cholesky factor when new rows and columns are appended to the factorized matrix,
//!   see [update_cholesky], [update_cholesky_linear_system] and [CholeskyFactor],
//! * rank revealing pivoted Cholesky factorization of a symmetric positive semidefinite matrix,
//!   see [IncompleteCholesky].
//!
//! Dense kernels (Cholesky, triangular solves, QR) are delegated to `linfa-linalg`, or to
//! LAPACK through `ndarray-linalg` when the `blas` feature is enabled.
//!
//! Example:
//! ```
//! use best_linalg::{kron, kron_prod, CholeskyFactor};
//! use ndarray::array;
//!
//! let a1 = array![[2., -1.], [-1., 2.]];
//! let a2 = array![[1., 0.5], [0.5, 1.]];
//! let x = array![1., 2., 3., 4.];
//! let y = kron_prod(&[a1.to_owned(), a2.to_owned()], &x).unwrap();
//! assert!((y - kron(&a1, &a2).dot(&x)).iter().all(|v: &f64| v.abs() < 1e-12));
//!
//! // Covariance matrix grows as new observations arrive
//! let factor = CholeskyFactor::new(&array![[2., 1.], [1., 2.]]).unwrap();
//! let factor = factor.update(&array![[0.5], [0.5]], &array![[2.]]).unwrap();
//! assert_eq!(factor.dim(), 3);
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod backend;
mod cholesky;
mod errors;
mod incomplete_cholesky;
mod kronecker;
mod parameters;
mod utils;

pub use cholesky::*;
pub use errors::*;
pub use incomplete_cholesky::*;
pub use kronecker::*;
pub use parameters::*;

/// Env variable used to set the log level (ex: `BEST_LOG=debug`)
pub const BEST_LOG: &str = "BEST_LOG";
