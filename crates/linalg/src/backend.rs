//! Dense kernels delegated to the numerical backend: pure Rust `linfa-linalg` by default,
//! LAPACK through `ndarray-linalg` when the `blas` feature is enabled.
use crate::errors::{LinalgError, Result};
use linfa::Float;
use ndarray::{Array2, ArrayBase, Data, Ix2};

#[cfg(feature = "blas")]
use linfa::dataset::{WithLapack, WithoutLapack};
#[cfg(not(feature = "blas"))]
use linfa_linalg::{cholesky::*, qr::*, triangular::*};
#[cfg(feature = "blas")]
use ndarray_linalg::{cholesky::*, qr::*, triangular::*};

/// Lower Cholesky factor of a symmetric positive definite matrix
#[cfg(not(feature = "blas"))]
pub(crate) fn cholesky<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
    a.cholesky().map_err(|err| match err {
        linfa_linalg::LinalgError::NotPositiveDefinite => LinalgError::NotPositiveDefiniteError(
            format!("cholesky factorization of ({}, {}) matrix failed", a.nrows(), a.ncols()),
        ),
        err => LinalgError::from(err),
    })
}

/// See non blas version
#[cfg(feature = "blas")]
pub(crate) fn cholesky<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
    let l = a
        .to_owned()
        .with_lapack()
        .cholesky(UPLO::Lower)
        .map_err(|err| LinalgError::NotPositiveDefiniteError(err.to_string()))?;
    Ok(l.without_lapack())
}

/// Solve `l * x = b` where `l` is lower triangular
#[cfg(not(feature = "blas"))]
pub(crate) fn solve_lower<F: Float>(
    l: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    if l.is_empty() || b.is_empty() {
        return Ok(Array2::zeros(b.raw_dim()));
    }
    Ok(l.solve_triangular(b, UPLO::Lower)?)
}

/// See non blas version
#[cfg(feature = "blas")]
pub(crate) fn solve_lower<F: Float>(
    l: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    if l.is_empty() || b.is_empty() {
        return Ok(Array2::zeros(b.raw_dim()));
    }
    let x = l.to_owned().with_lapack().solve_triangular(
        UPLO::Lower,
        Diag::NonUnit,
        &b.to_owned().with_lapack(),
    )?;
    Ok(x.without_lapack())
}

/// Solve `u * x = b` where `u` is upper triangular
#[cfg(not(feature = "blas"))]
pub(crate) fn solve_upper<F: Float>(
    u: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    if u.is_empty() || b.is_empty() {
        return Ok(Array2::zeros(b.raw_dim()));
    }
    Ok(u.solve_triangular(b, UPLO::Upper)?)
}

/// See non blas version
#[cfg(feature = "blas")]
pub(crate) fn solve_upper<F: Float>(
    u: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    if u.is_empty() || b.is_empty() {
        return Ok(Array2::zeros(b.raw_dim()));
    }
    let x = u.to_owned().with_lapack().solve_triangular(
        UPLO::Upper,
        Diag::NonUnit,
        &b.to_owned().with_lapack(),
    )?;
    Ok(x.without_lapack())
}

/// QR decomposition `(q, r)` of a square matrix
#[cfg(not(feature = "blas"))]
pub(crate) fn qr<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<(Array2<F>, Array2<F>)> {
    Ok(a.to_owned().qr()?.into_decomp())
}

/// See non blas version
#[cfg(feature = "blas")]
pub(crate) fn qr<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<(Array2<F>, Array2<F>)> {
    let (q, r) = a.to_owned().with_lapack().qr()?;
    Ok((q.without_lapack(), r.without_lapack()))
}
