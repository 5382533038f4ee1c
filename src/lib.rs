#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub use best_linalg as linalg;
pub use best_linalg::*;

use env_logger::{Builder, Env};

/// Initialize logging on stdout, the level is read from the [BEST_LOG] env variable
/// (default to `info`). Calling it more than once is harmless.
pub fn init_logger() {
    let env = Env::new().filter_or(BEST_LOG, "info");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    if builder.try_init().is_ok() {
        log::debug!("Logger initialized from {BEST_LOG}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_covariance_workflow() {
        init_logger();
        init_logger();

        // covariance of 2 observations then a third one arrives
        let k = array![[1., 0.5, 0.25], [0.5, 1., 0.5], [0.25, 0.5, 1.]];
        let y = array![0.3, -0.2, 0.8];

        let factor = CholeskyFactor::new(&k.slice(ndarray::s![..2, ..2])).unwrap();
        let x = factor.solve_lower(&y.slice(ndarray::s![..2])).unwrap();
        let updated = factor
            .update(&k.slice(ndarray::s![..2, 2..]), &k.slice(ndarray::s![2.., 2..]))
            .unwrap();
        let x_new =
            update_cholesky_linear_system(&x, updated.lower(), &y.slice(ndarray::s![2..])).unwrap();

        // squared norm of L^-1 y is the quadratic form of the likelihood
        assert_abs_diff_eq!(
            x_new.dot(&x_new),
            updated.quadratic_form(&y).unwrap(),
            epsilon = 1e-12
        );
        let full = CholeskyFactor::new(&k).unwrap();
        assert_abs_diff_eq!(updated.log_det(), full.log_det(), epsilon = 1e-12);
    }

    #[test]
    fn test_singular_covariance_fallback() {
        // two observations at the same location
        let k = array![[1., 1., 0.], [1., 1., 0.], [0., 0., 2.]];
        let chol = IncompleteCholesky::new(&k, true, -1.).unwrap();
        assert_eq!(chol.rank(), 2);
        assert_abs_diff_eq!(chol.reconstruct(), k, epsilon = 1e-12);
    }
}
