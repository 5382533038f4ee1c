use crate::errors::{LinalgError, Result};
use linfa::Float;
use ndarray::{Array, Array1, Array2, ArrayBase, Axis, Data, Dimension, Ix2};

/// Returns the size of a square matrix, `what` names the matrix in the error message
pub(crate) fn check_square<F>(a: &ArrayBase<impl Data<Elem = F>, Ix2>, what: &str) -> Result<usize> {
    let (n, m) = a.dim();
    if n != m {
        Err(LinalgError::NotSquareError(format!(
            "{what} should be square, got ({n}, {m})"
        )))
    } else {
        Ok(n)
    }
}

/// Copies a 1d or 2d array as a (n, ncols) matrix in standard layout,
/// a 1d array of length n is seen as a (n, 1) column.
pub(crate) fn as_columns<F: Float, D: Dimension>(
    x: &ArrayBase<impl Data<Elem = F>, D>,
) -> Result<Array2<F>> {
    match x.ndim() {
        1 => Ok(x.iter().cloned().collect::<Array1<F>>().insert_axis(Axis(1))),
        2 => Ok(x
            .view()
            .into_dimensionality::<Ix2>()?
            .as_standard_layout()
            .into_owned()),
        d => Err(LinalgError::DimensionMismatchError(format!(
            "expected a 1d or 2d array, got a {d}d array"
        ))),
    }
}

/// Inverse of [as_columns]: gives back a `ndim` dimensional array
pub(crate) fn from_columns<F: Float, D: Dimension>(y: Array2<F>, ndim: usize) -> Result<Array<F, D>> {
    if ndim == 1 {
        Ok(y.iter().cloned().collect::<Array1<F>>().into_dimensionality::<D>()?)
    } else {
        Ok(y.into_dimensionality::<D>()?)
    }
}
