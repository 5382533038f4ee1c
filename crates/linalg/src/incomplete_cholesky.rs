//! Rank revealing Cholesky factorization with complete (diagonal) pivoting of
//! symmetric positive semidefinite matrices.
//!
//! For a `(n, n)` matrix `A` of numerical rank `k`, it computes a permutation `P` and a
//! lower trapezoidal `(n, k)` factor `L` such that `P^t A P ≈ L L^t`. This is the fallback
//! when a plain Cholesky factorization fails on a (nearly) singular covariance matrix.
use crate::errors::{LinalgError, Result};
use crate::parameters::{IncompleteCholeskyParams, IncompleteCholeskyValidParams};
use linfa::{Float, ParamGuard};
use log::{debug, warn};
use ndarray::{s, Array1, Array2, ArrayBase, ArrayView2, Data, Ix2};
use ndarray_stats::QuantileExt;
use rayon::prelude::*;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Pivoted Cholesky factorization `P^t A P ≈ L L^t` of a symmetric positive semidefinite matrix
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct IncompleteCholesky<F: Float> {
    /// numerical rank
    rank: usize,
    /// `piv[i]` is the row index of `A` placed at position `i`
    piv: Array1<usize>,
    /// `(n, rank)` lower or `(rank, n)` upper factor
    factor: Array2<F>,
    /// whether factor is lower or upper
    lower: bool,
    /// tolerance actually used to stop the pivoting
    tol: F,
}

impl<F: Float> IncompleteCholesky<F> {
    /// Pivoted Cholesky parameters builder
    pub fn params() -> IncompleteCholeskyParams<F> {
        IncompleteCholeskyParams::new()
    }

    /// Factorize `a` returning a lower (`lower = true`) or an upper factor.
    /// A negative `tol` selects the tolerance `n * eps * max(diag(A))`.
    pub fn new(
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        lower: bool,
        tol: F,
    ) -> Result<IncompleteCholesky<F>> {
        Self::params().lower(lower).tol(tol).factorize(a)
    }

    /// Numerical rank `k`
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Pivot indices, `piv[i]` is the row of `A` moved at position `i`
    pub fn piv(&self) -> &Array1<usize> {
        &self.piv
    }

    /// Triangular factor, `(n, k)` when lower, `(k, n)` when upper
    pub fn factor(&self) -> &Array2<F> {
        &self.factor
    }

    /// Whether [IncompleteCholesky::factor] is lower triangular
    pub fn is_lower(&self) -> bool {
        self.lower
    }

    /// Tolerance used to reveal the rank
    pub fn tol(&self) -> F {
        self.tol
    }

    /// Permutation matrix `P` such that `(P^t A P)[i, j] = A[piv[i], piv[j]]`
    pub fn permutation_matrix(&self) -> Array2<F> {
        let n = self.piv.len();
        let mut p = Array2::<F>::zeros((n, n));
        for (i, &r) in self.piv.iter().enumerate() {
            p[[r, i]] = F::one();
        }
        p
    }

    /// Low rank approximation `P L L^t P^t` of `A`
    pub fn reconstruct(&self) -> Array2<F> {
        let l = self.lower_factor();
        let mut pl = Array2::<F>::zeros(l.raw_dim());
        for (i, &r) in self.piv.iter().enumerate() {
            pl.row_mut(r).assign(&l.row(i));
        }
        pl.dot(&pl.t())
    }

    fn lower_factor(&self) -> ArrayView2<'_, F> {
        if self.lower {
            self.factor.view()
        } else {
            self.factor.t()
        }
    }
}

impl<F: Float> IncompleteCholeskyValidParams<F> {
    /// Compute the pivoted Cholesky factorization of `a`
    pub fn factorize(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<IncompleteCholesky<F>> {
        let n = check_symmetric(a)?;
        let tol = if self.tol < F::zero() && n > 0 {
            F::cast(n) * F::epsilon() * *a.diag().max()?
        } else {
            self.tol
        };

        let (rank, piv, l) = pivoted_cholesky(&a.view(), tol)?;
        if rank < n {
            warn!("Pivoted Cholesky: matrix of size {n} is rank deficient (rank {rank}, tol {tol:e})");
        } else {
            debug!("Pivoted Cholesky: full rank {rank} (tol {tol:e})");
        }

        // rows in pivot order
        let mut factor = Array2::<F>::zeros((n, rank));
        for (i, &r) in piv.iter().enumerate() {
            factor.row_mut(i).assign(&l.slice(s![r, ..rank]));
        }
        let factor = if self.lower {
            factor
        } else {
            factor.reversed_axes().as_standard_layout().into_owned()
        };

        Ok(IncompleteCholesky {
            rank,
            piv: Array1::from(piv),
            factor,
            lower: self.lower,
            tol,
        })
    }
}

impl<F: Float> IncompleteCholeskyParams<F> {
    /// Check parameters then compute the pivoted Cholesky factorization of `a`
    pub fn factorize(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<IncompleteCholesky<F>> {
        self.check_ref()?.factorize(a)
    }
}

/// Check `a` is square, finite and symmetric up to `sqrt(eps) * max|a_ij|`, returns its size
fn check_symmetric<F: Float>(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<usize> {
    let (n, m) = a.dim();
    if n != m {
        return Err(LinalgError::InvalidInputError(format!(
            "matrix should be square, got ({n}, {m})"
        )));
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::InvalidInputError(
            "matrix should only contain finite values".to_string(),
        ));
    }
    let amax = a.iter().fold(F::zero(), |acc, v| acc.max(v.abs()));
    let sym_tol = F::epsilon().sqrt() * amax;
    for i in 0..n {
        for j in (i + 1)..n {
            if (a[[i, j]] - a[[j, i]]).abs() > sym_tol {
                return Err(LinalgError::InvalidInputError(format!(
                    "matrix should be symmetric, a[{i}, {j}] != a[{j}, {i}]"
                )));
            }
        }
    }
    Ok(n)
}

/// Left looking pivoted Cholesky.
///
/// The matrix is never permuted: `piv` maps positions to rows of `a`, and both the
/// remaining diagonal `d` and the factor columns `l` are indexed by rows of `a`.
/// Returns the rank, the pivots and the `(n, n)` factor columns where only
/// the first `rank` columns are meaningful.
///
/// Fails when a remaining diagonal value is negative beyond `max(|tol|, n * eps * max|diag(A)|)`,
/// the Schur complement left unfactored being then indefinite.
fn pivoted_cholesky<F: Float>(a: &ArrayView2<F>, tol: F) -> Result<(usize, Vec<usize>, Array2<F>)> {
    let n = a.nrows();
    let mut piv: Vec<usize> = (0..n).collect();
    let mut d = a.diag().to_owned();
    let mut l = Array2::<F>::zeros((n, n));

    let mut rank = 0;
    for k in 0..n {
        let (jmax, dmax) = (k + 1..n).fold((k, d[piv[k]]), |(jm, dm), j| {
            if d[piv[j]] > dm {
                (j, d[piv[j]])
            } else {
                (jm, dm)
            }
        });
        if dmax <= tol {
            break;
        }
        piv.swap(k, jmax);
        let p = piv[k];
        let lkk = dmax.sqrt();
        l[[p, k]] = lkk;

        let lp = l.slice(s![p, ..k]);
        let col: Vec<F> = piv[k + 1..]
            .par_iter()
            .map(|&r| (a[[r, p]] - l.slice(s![r, ..k]).dot(&lp)) / lkk)
            .collect();
        for (&r, v) in piv[k + 1..].iter().zip(col) {
            l[[r, k]] = v;
            d[r] -= v * v;
        }
        rank = k + 1;
    }

    let dabs = a.diag().fold(F::zero(), |acc, v| acc.max(v.abs()));
    let neg_tol = tol.abs().max(F::cast(n) * F::epsilon() * dabs);
    if let Some(&r) = piv[rank..].iter().find(|&&r| d[r] < -neg_tol) {
        return Err(LinalgError::NotPositiveDefiniteError(format!(
            "matrix is not positive semidefinite, remaining diagonal value {:e} at row {r} after {rank} pivots",
            d[r]
        )));
    }
    Ok((rank, piv, l))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    fn assert_permutation(piv: &Array1<usize>) {
        let mut sorted = piv.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..piv.len()).collect::<Vec<_>>());
    }

    fn low_rank(n: usize, r: usize, seed: u64) -> Array2<f64> {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let m = Array2::random_using((n, r), Uniform::new(-1., 1.), &mut rng);
        m.dot(&m.t())
    }

    #[test]
    fn test_low_rank_lower() {
        let env = env_logger::Env::new().filter_or(crate::BEST_LOG, "info");
        let mut builder = env_logger::Builder::from_env(env);
        let builder = builder.target(env_logger::Target::Stdout);
        builder.try_init().ok();

        let a = low_rank(8, 3, 42);
        let chol = IncompleteCholesky::new(&a, true, 1e-10).unwrap();

        assert_eq!(chol.rank(), 3);
        assert_eq!(chol.factor().dim(), (8, 3));
        assert_permutation(chol.piv());

        let p = chol.permutation_matrix();
        let ptap = p.t().dot(&a).dot(&p);
        let l = chol.factor();
        assert_abs_diff_eq!(ptap, l.dot(&l.t()), epsilon = 1e-8);
        assert_abs_diff_eq!(chol.reconstruct(), a, epsilon = 1e-8);
        // lower trapezoidal
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert_eq!(l[[i, j]], 0.);
            }
        }
    }

    #[test]
    fn test_low_rank_upper() {
        let a = low_rank(6, 2, 7);
        let chol = IncompleteCholesky::params()
            .lower(false)
            .tol(1e-10)
            .factorize(&a)
            .unwrap();

        assert!(!chol.is_lower());
        assert_eq!(chol.rank(), 2);
        assert_eq!(chol.factor().dim(), (2, 6));
        let p = chol.permutation_matrix();
        let u = chol.factor();
        assert_abs_diff_eq!(p.t().dot(&a).dot(&p), u.t().dot(u), epsilon = 1e-8);
        assert_abs_diff_eq!(chol.reconstruct(), a, epsilon = 1e-8);
    }

    #[test]
    fn test_full_rank_auto_tol() {
        let a = array![[4., 12., -16.], [12., 37., -43.], [-16., -43., 98.]];
        let chol = IncompleteCholesky::params().factorize(&a).unwrap();
        assert_eq!(chol.rank(), 3);
        assert_abs_diff_eq!(chol.tol(), 3. * f64::EPSILON * 98., epsilon = 1e-20);
        // largest diagonal entry comes first
        assert_eq!(chol.piv()[0], 2);
        assert_abs_diff_eq!(chol.factor()[[0, 0]], 98f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(chol.reconstruct(), a, epsilon = 1e-10);
    }

    #[test]
    fn test_rank_one_auto_tol() {
        let v = array![[1.], [2.], [3.]];
        let a = v.dot(&v.t());
        let chol = IncompleteCholesky::new(&a, true, -1.).unwrap();
        assert_eq!(chol.rank(), 1);
        assert_eq!(chol.piv()[0], 2);
        assert_abs_diff_eq!(chol.factor().column(0), array![3., 2., 1.], epsilon = 1e-12);
    }

    #[test]
    fn test_zero_matrix() {
        let a = Array2::<f64>::zeros((4, 4));
        let chol = IncompleteCholesky::new(&a, true, -1.).unwrap();
        assert_eq!(chol.rank(), 0);
        assert_eq!(chol.factor().dim(), (4, 0));
        assert_permutation(chol.piv());
        assert_eq!(chol.reconstruct(), a);

        let chol = IncompleteCholesky::new(&a, false, -1.).unwrap();
        assert_eq!(chol.factor().dim(), (0, 4));
    }

    #[test]
    fn test_empty_matrix() {
        let chol = IncompleteCholesky::new(&Array2::<f64>::zeros((0, 0)), true, -1.).unwrap();
        assert_eq!(chol.rank(), 0);
        assert!(chol.piv().is_empty());
    }

    #[test]
    fn test_residual_below_tolerance() {
        // spectrum 1, 1e-1, ..., 1e-9 in a random orthonormal basis
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let m = Array2::random_using((10, 10), Uniform::new(-1., 1.), &mut rng);
        let (q, _) = crate::backend::qr(&m).unwrap();
        let spectrum = Array1::from_iter((0..10).map(|i| 10f64.powi(-i)));
        let a = (&q * &spectrum).dot(&q.t());
        let a = (&a + &a.t()) / 2.;

        let tol = 1e-4;
        let chol = IncompleteCholesky::new(&a, true, tol).unwrap();
        assert!(chol.rank() >= 4);
        assert!(chol.rank() < 10);
        assert_permutation(chol.piv());

        let p = chol.permutation_matrix();
        let l = chol.factor();
        let residual = p.t().dot(&a).dot(&p) - l.dot(&l.t());
        let max_residual = residual.iter().fold(0f64, |acc, v: &f64| acc.max(v.abs()));
        assert!(max_residual > 0.);
        assert!(max_residual <= tol * (1. + 1e-8));
    }

    #[test]
    fn test_indefinite_matrix() {
        assert!(matches!(
            IncompleteCholesky::new(&array![[1., 2.], [2., 1.]], true, -1.),
            Err(LinalgError::NotPositiveDefiniteError(_))
        ));
        assert!(matches!(
            IncompleteCholesky::new(&(-Array2::<f64>::eye(3)), true, -1.),
            Err(LinalgError::NotPositiveDefiniteError(_))
        ));
        assert!(matches!(
            IncompleteCholesky::new(&array![[1., 0.], [0., -1e-3]], false, 1e-6),
            Err(LinalgError::NotPositiveDefiniteError(_))
        ));
        // negative roundoff within tolerance is accepted
        let chol = IncompleteCholesky::new(&array![[1., 0.], [0., -1e-8]], true, 1e-6).unwrap();
        assert_eq!(chol.rank(), 1);
    }

    #[test]
    fn test_input_not_mutated() {
        let a = low_rank(5, 2, 1);
        let copy = a.to_owned();
        let _ = IncompleteCholesky::new(&a, true, 1e-10).unwrap();
        assert_eq!(a, copy);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            IncompleteCholesky::new(&Array2::<f64>::zeros((2, 3)), true, -1.),
            Err(LinalgError::InvalidInputError(_))
        ));
        assert!(matches!(
            IncompleteCholesky::new(&array![[1., 2.], [0., 1.]], true, -1.),
            Err(LinalgError::InvalidInputError(_))
        ));
        assert!(matches!(
            IncompleteCholesky::new(&array![[1., f64::NAN], [f64::NAN, 1.]], true, -1.),
            Err(LinalgError::InvalidInputError(_))
        ));
        assert!(matches!(
            IncompleteCholesky::new(&Array2::<f64>::eye(2), true, f64::NAN),
            Err(LinalgError::InvalidValueError(_))
        ));
    }
}
