//! Matrix-free Kronecker product operators.
//!
//! A [KroneckerOperator] represents `A_1 ⊗ A_2 ⊗ ... ⊗ A_s` through its factors only.
//! Products and solves are computed by contracting each mode of the operand, seen as a
//! tensor of shape `(n_1, ..., n_s, ncols)`, against the corresponding factor. The full
//! `(Π m_i, Π n_i)` matrix is never built.
use crate::backend;
use crate::errors::{LinalgError, Result};
use crate::utils::{as_columns, check_square, from_columns};
use linfa::Float;
use log::debug;
use ndarray::{s, Array, Array2, Array3, ArrayBase, ArrayView2, Data, Dimension, Ix2};
use ndarray_stats::QuantileExt;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Implicit Kronecker product of an ordered list of dense matrices
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize))]
pub struct KroneckerOperator<F: Float> {
    factors: Vec<Array2<F>>,
}

/// Loading goes through [KroneckerOperator::new] so that an empty factor list is rejected
#[cfg(feature = "serializable")]
impl<'de, F: Float + Deserialize<'de>> Deserialize<'de> for KroneckerOperator<F> {
    fn deserialize<De>(deserializer: De) -> std::result::Result<Self, De::Error>
    where
        De: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Factors<T> {
            factors: Vec<Array2<T>>,
        }

        let Factors { factors } = Factors::<F>::deserialize(deserializer)?;
        KroneckerOperator::new(factors).map_err(serde::de::Error::custom)
    }
}

impl<F: Float> KroneckerOperator<F> {
    /// Constructor from the ordered factors `A_1, ..., A_s`
    pub fn new(factors: Vec<Array2<F>>) -> Result<KroneckerOperator<F>> {
        if factors.is_empty() {
            return Err(LinalgError::InvalidInputError(
                "Kronecker operator requires at least one factor".to_string(),
            ));
        }
        Ok(KroneckerOperator { factors })
    }

    /// Factor matrices
    pub fn factors(&self) -> &[Array2<F>] {
        &self.factors
    }

    /// Number of rows of the implicit product `Π m_i`
    pub fn nrows(&self) -> usize {
        self.factors.iter().map(|a| a.nrows()).product()
    }

    /// Number of columns of the implicit product `Π n_i`
    pub fn ncols(&self) -> usize {
        self.factors.iter().map(|a| a.ncols()).product()
    }

    /// Shape `(Π m_i, Π n_i)` of the implicit product
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// Whether every factor is square (required to solve)
    pub fn is_square(&self) -> bool {
        self.factors.iter().all(|a| a.nrows() == a.ncols())
    }

    /// Compute `(A_1 ⊗ ... ⊗ A_s) x`.
    ///
    /// `x` is either a vector of length `Π n_i` or a `(Π n_i, p)` matrix of `p` stacked
    /// right hand sides. The result has the same dimensionality as `x`.
    pub fn multiply<D: Dimension>(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, D>,
    ) -> Result<Array<F, D>> {
        let x2 = check_operand(x, self.ncols())?;
        let dims: Vec<(usize, usize)> = self.factors.iter().map(|a| a.dim()).collect();
        let y2 = contract_modes(&dims, x2, |k, t| Ok(self.factors[k].dot(&t)))?;
        from_columns(y2, x.ndim())
    }

    /// Solve `(A_1 ⊗ ... ⊗ A_s) x = y`.
    ///
    /// Factors are QR-factorized on each call, use [KroneckerOperator::factorize]
    /// to reuse the factorizations over several solves.
    pub fn solve<D: Dimension>(&self, y: &ArrayBase<impl Data<Elem = F>, D>) -> Result<Array<F, D>> {
        self.factorize()?.solve(y)
    }

    /// Factorize every (square) factor once to get a reusable solver
    pub fn factorize(&self) -> Result<KroneckerSolver<F>> {
        let qr = self
            .factors
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let n = check_square(a, &format!("Kronecker factor #{i}"))?;
                let (q, r) = backend::qr(a)?;
                if n > 0 {
                    let rdiag = r.diag().mapv(|v| v.abs());
                    let threshold = F::cast(n) * F::epsilon() * *rdiag.max()?;
                    if rdiag.iter().any(|&v| v <= threshold) {
                        return Err(LinalgError::SingularMatrixError(format!(
                            "Kronecker factor #{i} of size {n} is not invertible"
                        )));
                    }
                }
                Ok((q, r))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "Kronecker solver with factors of sizes {:?}",
            qr.iter().map(|(q, _)| q.nrows()).collect::<Vec<_>>()
        );
        Ok(KroneckerSolver { qr })
    }

    /// Explicit `(Π m_i, Π n_i)` matrix, only sensible for small operators
    pub fn to_dense(&self) -> Array2<F> {
        self.factors[1..]
            .iter()
            .fold(self.factors[0].to_owned(), |acc, a| kron(&acc, a))
    }
}

/// QR factorizations of the factors of a square [KroneckerOperator]
#[derive(Clone, Debug)]
pub struct KroneckerSolver<F: Float> {
    /// `(q, r)` for each factor
    qr: Vec<(Array2<F>, Array2<F>)>,
}

impl<F: Float> KroneckerSolver<F> {
    /// Size `Π n_i` of the implicit square product
    pub fn dim(&self) -> usize {
        self.qr.iter().map(|(q, _)| q.nrows()).product()
    }

    /// Solve `(A_1 ⊗ ... ⊗ A_s) x = y` with `y` a vector or a matrix of stacked right hand sides
    pub fn solve<D: Dimension>(&self, y: &ArrayBase<impl Data<Elem = F>, D>) -> Result<Array<F, D>> {
        let y2 = check_operand(y, self.dim())?;
        let dims: Vec<(usize, usize)> = self.qr.iter().map(|(q, _)| q.dim()).collect();
        let x2 = contract_modes(&dims, y2, |k, t| {
            let (q, r) = &self.qr[k];
            backend::solve_upper(r, &q.t().dot(&t))
        })?;
        from_columns(x2, y.ndim())
    }

    /// Logarithm of the absolute value of the determinant of the implicit product,
    /// `log|det(A_1 ⊗ ... ⊗ A_s)| = Σ_i (N / n_i) log|det(A_i)|` with `N = Π n_i`
    pub fn log_abs_det(&self) -> F {
        let n = self.dim();
        self.qr
            .iter()
            .filter(|(_, r)| !r.is_empty())
            .map(|(_, r)| F::cast(n / r.nrows()) * r.diag().mapv(|v| v.abs().ln()).sum())
            .fold(F::zero(), |acc, v| acc + v)
    }
}

/// Explicit Kronecker product of two matrices
///
/// ```text
/// kron(a, b) = [ a[(0, 0)] * b    , ... , a[(0, n-1)] * b    ]
///              [ ...              , ... , ...                ]
///              [ a[(m-1, 0)] * b  , ... , a[(m-1, n-1)] * b  ]
/// ```
pub fn kron<F: Float>(
    a: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    let (ma, na) = a.dim();
    let (mb, nb) = b.dim();
    let mut res = Array2::zeros((ma * mb, na * nb));
    for ((i, j), &aij) in a.indexed_iter() {
        res.slice_mut(s![i * mb..(i + 1) * mb, j * nb..(j + 1) * nb])
            .assign(&b.mapv(|v| v * aij));
    }
    res
}

/// Compute `(A_1 ⊗ ... ⊗ A_s) x` given the factors list
pub fn kron_prod<F: Float, D: Dimension>(
    factors: &[Array2<F>],
    x: &ArrayBase<impl Data<Elem = F>, D>,
) -> Result<Array<F, D>> {
    KroneckerOperator::new(factors.to_vec())?.multiply(x)
}

/// Solve `(A_1 ⊗ ... ⊗ A_s) x = y` given the list of square factors
pub fn kron_solve<F: Float, D: Dimension>(
    factors: &[Array2<F>],
    y: &ArrayBase<impl Data<Elem = F>, D>,
) -> Result<Array<F, D>> {
    KroneckerOperator::new(factors.to_vec())?.solve(y)
}

fn check_operand<F: Float, D: Dimension>(
    x: &ArrayBase<impl Data<Elem = F>, D>,
    expected: usize,
) -> Result<Array2<F>> {
    let x2 = as_columns(x)?;
    if x2.nrows() != expected {
        return Err(LinalgError::DimensionMismatchError(format!(
            "operand leading dimension {} does not match Kronecker operator dimension {}",
            x2.nrows(),
            expected
        )));
    }
    Ok(x2)
}

/// Apply `op` mode after mode to `x` seen as a `(n_1, ..., n_s, ncols)` row-major tensor.
///
/// `dims[k]` is `(m_k, n_k)` and `op(k, t)` maps a `(n_k, r)` matrix to a `(m_k, r)` matrix.
/// The result is the `(Π m_k, ncols)` matrix of the `(m_1, ..., m_s, ncols)` output tensor.
fn contract_modes<F, G>(dims: &[(usize, usize)], x: Array2<F>, mut op: G) -> Result<Array2<F>>
where
    F: Float,
    G: FnMut(usize, ArrayView2<F>) -> Result<Array2<F>>,
{
    let ncols = x.ncols();
    let nrows_out = dims.iter().map(|(m, _)| m).product::<usize>();
    if dims.iter().any(|&(m, n)| m == 0 || n == 0) {
        return Ok(Array2::zeros((nrows_out, ncols)));
    }

    let mut left = 1;
    let mut right = x.len();
    let mut data: Vec<F> = x.iter().cloned().collect();
    for (k, &(m, n)) in dims.iter().enumerate() {
        right /= n;
        // bring mode k in front: (left, n, right) -> (n, left * right)
        let t = Array3::from_shape_vec((left, n, right), data)?.permuted_axes([1, 0, 2]);
        let t = Array2::from_shape_vec((n, left * right), t.iter().cloned().collect())?;
        let t = op(k, t.view())?;
        // and back: (m, left * right) -> (left, m, right)
        let t = Array3::from_shape_vec((m, left, right), t.iter().cloned().collect())?
            .permuted_axes([1, 0, 2]);
        data = t.iter().cloned().collect();
        left *= m;
    }
    Ok(Array2::from_shape_vec((left, ncols), data)?)
}
