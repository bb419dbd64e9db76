use crate::{
    core::{
        utils::{
            flatten_lower_triangle, inverse_softplus, lower_triangular_from_flat,
            semidefinite_cholesky, softplus, symmetric_from_flat, triangular_dimension,
        },
        ConstraintKind,
    },
    error::ReparamError,
    Float,
};

/// Returns the dimension of the covariance matrix described by `len` lower-triangular entries.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] if `len` is not a triangular number.
pub fn dimension(len: usize) -> Result<usize, ReparamError> {
    match triangular_dimension(len) {
        Some(dim) if dim > 0 => Ok(dim),
        _ => Err(ReparamError::invalid(
            ConstraintKind::Covariance,
            format!(
                "{} parameters given, there should be n = d(d+1)/2 for a d-dimensional matrix",
                len
            ),
        )),
    }
}

/// Maps the lower triangle of a covariance matrix onto the entries of its Cholesky factor
/// $`L`$, with the diagonal passed through the inverse softplus $`\ln(e^x - 1)`$ so every
/// internal value ranges over the whole real line.
///
/// Singular matrices on the boundary of the positive semi-definite cone, which
/// [`from_internal`] produces once a softplus underflows, are accepted: a vanishing pivot is
/// floored at `Float::MIN_POSITIVE` before the inverse softplus.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] if the slice length is not triangular and
/// [`ReparamError::InfeasibleInput`] if the matrix is not positive semi-definite.
pub fn to_internal(external: &[Float]) -> Result<Vec<Float>, ReparamError> {
    let dim = dimension(external.len())?;
    let cov = symmetric_from_flat(external, dim);
    let mut l = semidefinite_cholesky(&cov, Float::EPSILON.sqrt()).ok_or_else(|| {
        ReparamError::infeasible(
            ConstraintKind::Covariance,
            "covariance matrix is not positive semi-definite",
        )
    })?;
    for i in 0..dim {
        l[(i, i)] = inverse_softplus(l[(i, i)].max(Float::MIN_POSITIVE));
    }
    Ok(flatten_lower_triangle(&l))
}

/// Builds the factor $`L`$ from the internal slice (softplus on the diagonal) and returns the
/// lower triangle of $`LL^{\intercal}`$, which is symmetric positive semi-definite by construction.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] if the slice length is not triangular.
pub fn from_internal(internal: &[Float]) -> Result<Vec<Float>, ReparamError> {
    let dim = dimension(internal.len())?;
    let mut l = lower_triangular_from_flat(internal, dim);
    for i in 0..dim {
        l[(i, i)] = softplus(l[(i, i)]);
    }
    let cov = &l * l.transpose();
    Ok(flatten_lower_triangle(&cov))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use fastrand::Rng;

    use super::*;

    #[test]
    fn test_covariance_roundtrip() {
        let cov = [4.0, 1.0, 3.0, 0.5, -0.2, 2.0];
        let z = to_internal(&cov).unwrap();
        let back = from_internal(&z).unwrap();
        for (a, b) in cov.iter().zip(&back) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_identity_factor() {
        // an internal diagonal of ln(e - 1) is a unit factor diagonal
        let d = Float::ln(Float::exp(1.0) - 1.0);
        let cov = from_internal(&[d, 0.0, d]).unwrap();
        assert_relative_eq!(cov[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(cov[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(cov[2], 1.0, epsilon = 1e-12);
        let z = to_internal(&[1.0, 0.0, 1.0]).unwrap();
        assert_relative_eq!(z[0], d, epsilon = 1e-12);
        assert_relative_eq!(z[2], d, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_feasible_for_any_internal() {
        let mut rng = Rng::with_seed(1);
        for _ in 0..100 {
            let dim = rng.usize(1..5);
            let z: Vec<Float> = (0..dim * (dim + 1) / 2)
                .map(|_| (rng.f64() as Float - 0.5) * 6.0)
                .collect();
            let cov = symmetric_from_flat(&from_internal(&z).unwrap(), dim);
            assert_eq!(cov, cov.transpose());
            let eigenvalues = cov.symmetric_eigenvalues();
            assert!(eigenvalues.iter().all(|v| *v > -1e-10));
            let again = to_internal(&flatten_lower_triangle(&cov)).unwrap();
            for (a, b) in z.iter().zip(&again) {
                assert_relative_eq!(a, b, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_ill_conditioned_factor_roundtrip() {
        // softplus(-20) is tiny, so the second pivot of L Lᵀ cancels to zero
        let cov = from_internal(&[-20.0, 100.0, -20.0]).unwrap();
        let z = to_internal(&cov).unwrap();
        assert!(z.iter().all(|v| v.is_finite()));
        let back = from_internal(&z).unwrap();
        for (a, b) in cov.iter().zip(&back) {
            assert_relative_eq!(a, b, epsilon = 1e-12, max_relative = 1e-10);
        }
        let singular = to_internal(&[1.0, 1.0, 1.0]).unwrap();
        assert_relative_eq!(singular[2], Float::MIN_POSITIVE.ln(), max_relative = 1e-12);
    }

    #[test]
    fn test_covariance_rejects_invalid() {
        assert!(matches!(
            to_internal(&[1.0, 2.0, 1.0]),
            Err(ReparamError::InfeasibleInput { .. })
        ));
        assert!(matches!(
            to_internal(&[1.0, 2.0]),
            Err(ReparamError::InvalidConstraint { .. })
        ));
        assert!(matches!(
            from_internal(&[]),
            Err(ReparamError::InvalidConstraint { .. })
        ));
    }
}
