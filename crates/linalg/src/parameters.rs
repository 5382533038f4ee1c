use crate::errors::{LinalgError, Result};
use linfa::{Float, ParamGuard};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A set of validated pivoted Cholesky parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct IncompleteCholeskyValidParams<F: Float> {
    /// Whether the factor is returned as a lower `(n, rank)` or an upper `(rank, n)` matrix
    pub(crate) lower: bool,
    /// Pivoting stops when remaining diagonal values are lower or equal to this tolerance,
    /// a negative value selects `n * eps * max(diag(A))`
    pub(crate) tol: F,
}

impl<F: Float> Default for IncompleteCholeskyValidParams<F> {
    fn default() -> IncompleteCholeskyValidParams<F> {
        IncompleteCholeskyValidParams {
            lower: true,
            tol: F::cast(-1.),
        }
    }
}

impl<F: Float> IncompleteCholeskyValidParams<F> {
    /// Whether the lower factor is computed
    pub fn lower(&self) -> bool {
        self.lower
    }

    /// Rank revealing tolerance (negative means automatic)
    pub fn tol(&self) -> F {
        self.tol
    }
}

#[derive(Clone, Debug)]
/// The set of parameters that can be specified for the computation of
/// the [pivoted Cholesky factorization](crate::IncompleteCholesky).
pub struct IncompleteCholeskyParams<F: Float>(IncompleteCholeskyValidParams<F>);

impl<F: Float> Default for IncompleteCholeskyParams<F> {
    fn default() -> IncompleteCholeskyParams<F> {
        Self::new()
    }
}

impl<F: Float> IncompleteCholeskyParams<F> {
    /// A constructor with default parameters: lower factor and automatic tolerance
    pub fn new() -> IncompleteCholeskyParams<F> {
        Self(IncompleteCholeskyValidParams::default())
    }

    /// Set whether the factor is lower (`true`) or upper (`false`) triangular.
    pub fn lower(mut self, lower: bool) -> Self {
        self.0.lower = lower;
        self
    }

    /// Set rank revealing tolerance.
    ///
    /// A negative value selects `n * eps * max(diag(A))` where `eps` is the machine precision.
    pub fn tol(mut self, tol: F) -> Self {
        self.0.tol = tol;
        self
    }
}

impl<F: Float> From<IncompleteCholeskyValidParams<F>> for IncompleteCholeskyParams<F> {
    fn from(valid: IncompleteCholeskyValidParams<F>) -> Self {
        IncompleteCholeskyParams(valid)
    }
}

impl<F: Float> ParamGuard for IncompleteCholeskyParams<F> {
    type Checked = IncompleteCholeskyValidParams<F>;
    type Error = LinalgError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.tol.is_nan() {
            return Err(LinalgError::InvalidValueError(
                "`tol` should not be NaN".to_string(),
            ));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
