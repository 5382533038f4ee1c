//! Cholesky factorization of bordered matrices.
//!
//! Given the lower factor `L` of a `(n, n)` SPD matrix `A`, the factor of the bordered matrix
//!
//! ```text
//! A' = [ A   B ]
//!      [ B^t C ]
//! ```
//!
//! is `[[L, 0], [D21, D22]]` with `L D21^t = B` and `D22 D22^t = C - D21 D21^t`, which costs
//! `O(n^2 m + m^3)` instead of the `O((n + m)^3)` of a factorization from scratch.
use crate::backend;
use crate::errors::{LinalgError, Result};
use crate::utils::{as_columns, check_square, from_columns};
use linfa::Float;
use log::debug;
use ndarray::{concatenate, s, Array, Array2, ArrayBase, Axis, Data, Dimension, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Compute the lower Cholesky factor of the bordered matrix `[[A, B], [B^t, C]]`
/// given `l` the `(n, n)` lower Cholesky factor of `A`, `b` the `(n, m)` upper right block
/// and `c` the `(m, m)` symmetric bottom right block.
///
/// The top left `(n, n)` block of the returned `(n + m, n + m)` factor is `l`.
pub fn update_cholesky<F: Float>(
    l: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    c: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    let n = check_square(l, "Cholesky factor")?;
    let m = check_square(c, "bottom right block")?;
    if b.dim() != (n, m) {
        return Err(LinalgError::DimensionMismatchError(format!(
            "upper right block should be ({n}, {m}), got {:?}",
            b.dim()
        )));
    }
    if m == 0 {
        return Ok(l.to_owned());
    }

    // L D21^t = B
    let d21t = backend::solve_lower(l, b)?;
    let schur = c - &d21t.t().dot(&d21t);
    let d22 = backend::cholesky(&schur).map_err(|err| match err {
        LinalgError::NotPositiveDefiniteError(_) => LinalgError::NotPositiveDefiniteError(format!(
            "Schur complement of the ({}, {}) bordered matrix",
            n + m,
            n + m
        )),
        err => err,
    })?;

    let mut l_new = Array2::<F>::zeros((n + m, n + m));
    l_new.slice_mut(s![..n, ..n]).assign(l);
    l_new.slice_mut(s![n.., ..n]).assign(&d21t.t());
    l_new.slice_mut(s![n.., n..]).assign(&d22);
    debug!("Cholesky factor updated from size {} to {}", n, n + m);
    Ok(l_new)
}

/// Extend the solution `x` of `L x = y` to the solution of `L_new x_new = (y, z)`
/// where `l_new` is the factor returned by [update_cholesky] from `L`.
///
/// The result is `(x, x_u)` with `D22 x_u = z - D21 x`, `D21` and `D22` being
/// the bottom left and bottom right blocks of `l_new`.
/// `x` and `z` are vectors or matrices with the same number of columns, a vector being
/// a single column: a vector `x` may be extended with a `(m, 1)` matrix `z`.
/// The result has the dimensionality of `x`.
pub fn update_cholesky_linear_system<F: Float, D: Dimension, E: Dimension>(
    x: &ArrayBase<impl Data<Elem = F>, D>,
    l_new: &ArrayBase<impl Data<Elem = F>, Ix2>,
    z: &ArrayBase<impl Data<Elem = F>, E>,
) -> Result<Array<F, D>> {
    let size = check_square(l_new, "updated Cholesky factor")?;
    let x2 = as_columns(x)?;
    let z2 = as_columns(z)?;
    if x2.ncols() != z2.ncols() {
        return Err(LinalgError::DimensionMismatchError(format!(
            "previous solution has {} columns while new right hand side has {}",
            x2.ncols(),
            z2.ncols()
        )));
    }
    let (n, m) = (x2.nrows(), z2.nrows());
    if n + m != size {
        return Err(LinalgError::DimensionMismatchError(format!(
            "updated factor of size {size} does not match {n} + {m} unknowns"
        )));
    }

    let d21 = l_new.slice(s![n.., ..n]);
    let d22 = l_new.slice(s![n.., n..]);
    let x_u = backend::solve_lower(&d22, &(&z2 - &d21.dot(&x2)))?;
    let x_new = concatenate(Axis(0), &[x2.view(), x_u.view()])?;
    from_columns(x_new, x.ndim())
}

/// Lower Cholesky factor `L` of a symmetric positive definite matrix `A = L L^t`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct CholeskyFactor<F: Float> {
    lower: Array2<F>,
}

impl<F: Float> CholeskyFactor<F> {
    /// Factorize the given symmetric positive definite matrix
    pub fn new(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<CholeskyFactor<F>> {
        check_square(a, "matrix")?;
        Ok(CholeskyFactor {
            lower: backend::cholesky(a)?,
        })
    }

    /// Wrap an already computed lower triangular factor
    pub fn from_lower(lower: Array2<F>) -> Result<CholeskyFactor<F>> {
        check_square(&lower, "Cholesky factor")?;
        if lower.diag().iter().any(|&v| !(v > F::zero())) {
            return Err(LinalgError::InvalidInputError(
                "Cholesky factor diagonal should be positive".to_string(),
            ));
        }
        Ok(CholeskyFactor { lower })
    }

    /// Size of the factorized matrix
    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    /// Lower triangular factor
    pub fn lower(&self) -> &Array2<F> {
        &self.lower
    }

    /// Consume the factorization and return the lower triangular factor
    pub fn into_lower(self) -> Array2<F> {
        self.lower
    }

    /// Factor of the matrix bordered with `b` (upper right) and `c` (bottom right),
    /// see [update_cholesky]. `self` is left untouched.
    pub fn update(
        &self,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
        c: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<CholeskyFactor<F>> {
        Ok(CholeskyFactor {
            lower: update_cholesky(&self.lower, b, c)?,
        })
    }

    /// Solve `L x = y`
    pub fn solve_lower<D: Dimension>(
        &self,
        y: &ArrayBase<impl Data<Elem = F>, D>,
    ) -> Result<Array<F, D>> {
        let y2 = self.check_rhs(y)?;
        from_columns(backend::solve_lower(&self.lower, &y2)?, y.ndim())
    }

    /// Solve `A x = y`
    pub fn solve<D: Dimension>(&self, y: &ArrayBase<impl Data<Elem = F>, D>) -> Result<Array<F, D>> {
        let y2 = self.check_rhs(y)?;
        let w = backend::solve_lower(&self.lower, &y2)?;
        from_columns(backend::solve_upper(&self.lower.t(), &w)?, y.ndim())
    }

    /// `log(det(A)) = 2 Σ log(L_ii)`
    pub fn log_det(&self) -> F {
        F::cast(2.) * self.lower.diag().mapv(|v| v.ln()).sum()
    }

    /// `y^t A^-1 y` computed as the squared norm of `L^-1 y`
    pub fn quadratic_form(&self, y: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<F> {
        let w = self.solve_lower(y)?;
        Ok(w.dot(&w))
    }

    fn check_rhs<D: Dimension>(&self, y: &ArrayBase<impl Data<Elem = F>, D>) -> Result<Array2<F>> {
        let y2 = as_columns(y)?;
        if y2.nrows() != self.dim() {
            return Err(LinalgError::DimensionMismatchError(format!(
                "right hand side has {} rows, expected {}",
                y2.nrows(),
                self.dim()
            )));
        }
        Ok(y2)
    }
}
