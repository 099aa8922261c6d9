use std::collections::HashMap;

use faer::{Mat, MatRef, Side};
use itertools::Itertools;
use tracing::warn;

use crate::error::{Result, SmcError};

/// `ln(sum(exp(values)))`, shifted by the maximum so that neither overflow
/// nor underflow can occur. Returns `-inf` for an empty slice.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|&x| (x - max).exp()).sum();
    max + sum.ln()
}

/// Normalize raw log weights so that their exponentials sum to one.
///
/// Computed as `w - m - ln(sum(exp(w - m)))` with `m = max(w)`. A NaN or
/// `+inf` entry, or a non-empty slice that is entirely `-inf`, has no
/// normalization and is rejected.
pub fn normalize_log_weights(log_weights: &[f64]) -> Result<Box<[f64]>> {
    if log_weights.is_empty() {
        return Ok(Box::new([]));
    }
    if log_weights
        .iter()
        .any(|&w| w.is_nan() || w == f64::INFINITY)
    {
        return Err(SmcError::InvalidLogWeights);
    }
    let max = log_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return Err(SmcError::InvalidLogWeights);
    }
    let log_norm = log_weights
        .iter()
        .map(|&w| (w - max).exp())
        .sum::<f64>()
        .ln();
    Ok(log_weights.iter().map(|&w| w - max - log_norm).collect())
}

pub(crate) fn mat_all_finite(mat: MatRef<'_, f64>) -> bool {
    (0..mat.nrows())
        .cartesian_product(0..mat.ncols())
        .all(|(i, j)| mat[(i, j)].is_finite())
}

/// Replace `mat` by `(mat + mat^T) / 2`.
pub(crate) fn symmetrize(mat: &mut Mat<f64>) {
    let n = mat.nrows();
    for (i, j) in (0..n).tuple_combinations() {
        let avg = 0.5 * (mat[(i, j)] + mat[(j, i)]);
        mat[(i, j)] = avg;
        mat[(j, i)] = avg;
    }
}

/// Eigenvalue test for positive semi-definiteness of a symmetric matrix.
///
/// Eigenvalues may dip below zero by `tolerance * max(1, max |eigenvalue|)`
/// to absorb rounding in singular matrices.
pub fn is_positive_semi_definite(mat: MatRef<'_, f64>, tolerance: f64) -> bool {
    if mat.nrows() != mat.ncols() || !mat_all_finite(mat) {
        return false;
    }
    if mat.nrows() == 0 {
        return true;
    }
    let Ok(eig) = mat.self_adjoint_eigen(Side::Lower) else {
        return false;
    };
    let vals = eig.S().column_vector();
    let eigvals = (0..vals.nrows()).map(|i| vals[i]).collect_vec();
    if !eigvals.iter().all(|x| x.is_finite()) {
        return false;
    }
    let scale = eigvals.iter().fold(1f64, |acc, x| acc.max(x.abs()));
    eigvals.iter().all(|&x| x >= -tolerance * scale)
}

/// Zero the off-diagonal entries of `cov` if it is not positive
/// semi-definite. The diagonal is kept as is. Returns whether the matrix was
/// changed.
pub fn repair_covariance(cov: &mut Mat<f64>, tolerance: f64) -> bool {
    if is_positive_semi_definite(cov.as_ref(), tolerance) {
        return false;
    }
    warn!(
        dim = cov.nrows(),
        "Covariance matrix is not positive definite; setting off-diagonal terms to zero."
    );
    let n = cov.nrows();
    for (i, j) in (0..n).cartesian_product(0..n) {
        if i != j {
            cov[(i, j)] = 0f64;
        }
    }
    true
}

/// Pair positional statistics with their parameter names.
///
/// Panics if `names` and `values` differ in length.
pub fn package_by_name(names: &[String], values: &[f64]) -> HashMap<String, f64> {
    assert!(names.len() == values.len());
    names.iter().cloned().zip(values.iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::{layer::Context, prelude::*, Layer};

    use super::*;

    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn count_warnings(f: impl FnOnce()) -> usize {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(count.clone()));
        tracing::subscriber::with_default(subscriber, f);
        count.load(Ordering::SeqCst)
    }

    proptest! {
        #[test]
        fn normalized_weights_sum_to_one(
            raw in prop::collection::vec(-1e3f64..1e3f64, 1..50),
            shift in prop::sample::select(vec![-1e300, -1e5, 0., 1e5, 1e300]),
        ) {
            let shifted = raw.iter().map(|w| w + shift).collect_vec();
            let normed = normalize_log_weights(&shifted).unwrap();
            let total: f64 = normed.iter().map(|w| w.exp()).sum();
            prop_assert!((total - 1.).abs() < 1e-9);
            prop_assert!(normed.iter().all(|&w| w <= 0.));
        }

        #[test]
        fn log_sum_exp_matches_naive(raw in prop::collection::vec(-20f64..20f64, 1..20)) {
            let naive = raw.iter().map(|x| x.exp()).sum::<f64>().ln();
            prop_assert!((log_sum_exp(&raw) - naive).abs() < 1e-10);
        }
    }

    #[test]
    fn normalize_huge_magnitudes() {
        let normed = normalize_log_weights(&[1000., 1000., 1000. + 2f64.ln()]).unwrap();
        assert_relative_eq!(normed[0].exp(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(normed[1].exp(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(normed[2].exp(), 0.5, epsilon = 1e-12);

        let normed = normalize_log_weights(&[-2000., -2000.]).unwrap();
        assert_relative_eq!(normed[0], 0.5f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn normalize_keeps_zero_weights() {
        let normed = normalize_log_weights(&[f64::NEG_INFINITY, 0.]).unwrap();
        assert_eq!(normed[0], f64::NEG_INFINITY);
        assert_eq!(normed[1], 0.);
    }

    #[test]
    fn normalize_rejects_degenerate_input() {
        assert!(normalize_log_weights(&[]).unwrap().is_empty());
        assert!(matches!(
            normalize_log_weights(&[0., f64::NAN]),
            Err(SmcError::InvalidLogWeights)
        ));
        assert!(matches!(
            normalize_log_weights(&[0., f64::INFINITY]),
            Err(SmcError::InvalidLogWeights)
        ));
        assert!(matches!(
            normalize_log_weights(&[f64::NEG_INFINITY; 3]),
            Err(SmcError::InvalidLogWeights)
        ));
    }

    #[test]
    fn psd_check() {
        let identity = Mat::<f64>::identity(3, 3);
        assert!(is_positive_semi_definite(identity.as_ref(), 1e-10));

        // rank one, singular but semi-definite
        let singular = Mat::from_fn(2, 2, |_, _| 1f64);
        assert!(is_positive_semi_definite(singular.as_ref(), 1e-10));

        let indefinite = Mat::from_fn(2, 2, |i, j| if i == j { 1. } else { 2. });
        assert!(!is_positive_semi_definite(indefinite.as_ref(), 1e-10));

        let with_nan = Mat::from_fn(2, 2, |i, j| if i == j { 1. } else { f64::NAN });
        assert!(!is_positive_semi_definite(with_nan.as_ref(), 1e-10));
    }

    #[test]
    fn repair_zeroes_off_diagonal_and_warns() {
        let mut cov = Mat::from_fn(2, 2, |i, j| if i == j { 1. + i as f64 } else { 3. });
        let warnings = count_warnings(|| {
            assert!(repair_covariance(&mut cov, 1e-10));
        });
        assert_eq!(warnings, 1);
        assert_eq!(cov[(0, 0)], 1.);
        assert_eq!(cov[(1, 1)], 2.);
        assert_eq!(cov[(0, 1)], 0.);
        assert_eq!(cov[(1, 0)], 0.);
    }

    #[test]
    fn repair_leaves_valid_matrix_alone() {
        let mut cov = Mat::from_fn(2, 2, |i, j| if i == j { 2. } else { 0.5 });
        let warnings = count_warnings(|| {
            assert!(!repair_covariance(&mut cov, 1e-10));
        });
        assert_eq!(warnings, 0);
        assert_eq!(cov[(0, 1)], 0.5);
    }

    #[test]
    fn symmetrize_averages() {
        let mut mat = Mat::from_fn(2, 2, |i, j| (2 * i + j) as f64);
        symmetrize(&mut mat);
        assert_eq!(mat[(0, 1)], 1.5);
        assert_eq!(mat[(1, 0)], 1.5);
        assert_eq!(mat[(1, 1)], 3.);
    }

    #[test]
    #[should_panic]
    fn package_rejects_length_mismatch() {
        let names = vec!["a".to_string(), "b".to_string()];
        package_by_name(&names, &[1.]);
    }

    #[test]
    fn packages_in_name_order() {
        let names = vec!["a".to_string(), "b".to_string()];
        let packaged = package_by_name(&names, &[1., 2.]);
        assert_eq!(packaged["a"], 1.);
        assert_eq!(packaged["b"], 2.);
    }
}
