use crate::{
    core::{
        utils::{semidefinite_cholesky, triangular_dimension},
        ConstraintKind,
    },
    error::ReparamError,
    DMatrix, Float,
};

/// Returns the dimension $`d`$ of the implied covariance matrix given `len` parameters
/// ($`d`$ standard deviations followed by $`d(d-1)/2`$ correlations).
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] if `len` is not a triangular number.
pub fn dimension(len: usize) -> Result<usize, ReparamError> {
    match triangular_dimension(len) {
        Some(dim) if dim > 0 => Ok(dim),
        _ => Err(ReparamError::invalid(
            ConstraintKind::Sdcorr,
            format!(
                "{} parameters given, there should be d standard deviations and d(d-1)/2 correlations",
                len
            ),
        )),
    }
}

/// Builds the correlation matrix from the strictly-lower correlations listed row by row.
///
/// # Panics
///
/// This function will panic if `correlations` has fewer than $`d(d-1)/2`$ entries.
pub fn correlation_matrix(correlations: &[Float], dim: usize) -> DMatrix<Float> {
    let mut corr = DMatrix::identity(dim, dim);
    let mut k = 0;
    for i in 0..dim {
        for j in 0..i {
            corr[(i, j)] = correlations[k];
            corr[(j, i)] = correlations[k];
            k += 1;
        }
    }
    corr
}

/// Returns the implied covariance matrix $`\Sigma_{ij} = \sigma_i \sigma_j \rho_{ij}`$ of an
/// external `sdcorr` slice.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] if the slice length is not triangular.
pub fn covariance_matrix(external: &[Float]) -> Result<DMatrix<Float>, ReparamError> {
    let dim = dimension(external.len())?;
    let (sds, correlations) = external.split_at(dim);
    let corr = correlation_matrix(correlations, dim);
    Ok(DMatrix::from_fn(dim, dim, |i, j| sds[i] * sds[j] * corr[(i, j)]))
}

/// Maps standard deviations onto their logarithms and correlations onto the hyperbolic
/// arctangent of the canonical partial correlations read off the Cholesky factor of the
/// correlation matrix:
///
/// ```math
/// z_{ij} = \operatorname{artanh}\left(\frac{L_{ij}}{\sqrt{1 - \sum_{k<j} L_{ik}^2}}\right)
/// ```
///
/// Correlations of exactly $`\pm 1`$ and singular correlation matrices, which [`from_internal`]
/// produces once a $`\tanh`$ saturates, are accepted. Partial correlations are clamped to
/// $`\pm(1 - \epsilon)`$ so the result stays finite.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] if the slice length is not triangular and
/// [`ReparamError::InfeasibleInput`] if a standard deviation is not strictly positive, a
/// correlation lies outside $`[-1, 1]`$, or the correlation matrix is not positive
/// semi-definite.
pub fn to_internal(external: &[Float]) -> Result<Vec<Float>, ReparamError> {
    let dim = dimension(external.len())?;
    let (sds, correlations) = external.split_at(dim);
    if let Some((i, sd)) = sds
        .iter()
        .enumerate()
        .find(|(_, sd)| !(sd.is_finite() && **sd > 0.0))
    {
        return Err(ReparamError::infeasible(
            ConstraintKind::Sdcorr,
            format!("standard deviation {} is {}, but must be strictly positive", i, sd),
        ));
    }
    if let Some((k, rho)) = correlations
        .iter()
        .enumerate()
        .find(|(_, rho)| !(rho.abs() <= 1.0))
    {
        return Err(ReparamError::infeasible(
            ConstraintKind::Sdcorr,
            format!("correlation {} is {}, but must lie in [-1, 1]", k, rho),
        ));
    }
    let l = semidefinite_cholesky(
        &correlation_matrix(correlations, dim),
        Float::EPSILON.sqrt(),
    )
    .ok_or_else(|| {
        ReparamError::infeasible(
            ConstraintKind::Sdcorr,
            "correlation matrix is not positive semi-definite",
        )
    })?;
    let bound = 1.0 - Float::EPSILON;
    let mut internal: Vec<Float> = sds.iter().map(|sd| sd.ln()).collect();
    for i in 1..dim {
        let mut sum_sq: Float = 0.0;
        for j in 0..i {
            let remaining = 1.0 - sum_sq;
            // a saturated row has nothing left to distribute
            let partial = if remaining > 0.0 {
                l[(i, j)] / remaining.sqrt()
            } else {
                0.0
            };
            internal.push(partial.clamp(-bound, bound).atanh());
            sum_sq += l[(i, j)].powi(2);
        }
    }
    Ok(internal)
}

/// Maps log standard deviations back through the exponential and assembles the Cholesky factor
/// of the correlation matrix from $`\tanh`$-bounded canonical partial correlations. Every row of
/// that factor has unit norm, so the resulting correlation matrix has a unit diagonal, is
/// positive semi-definite, and has off-diagonal entries in $`[-1, 1]`$.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] if the slice length is not triangular.
pub fn from_internal(internal: &[Float]) -> Result<Vec<Float>, ReparamError> {
    let dim = dimension(internal.len())?;
    let (log_sds, partials) = internal.split_at(dim);
    let mut l: DMatrix<Float> = DMatrix::zeros(dim, dim);
    l[(0, 0)] = 1.0;
    let mut k = 0;
    for i in 1..dim {
        let mut sum_sq: Float = 0.0;
        for j in 0..i {
            // max(0) only absorbs rounding in 1 - sum_sq
            l[(i, j)] = partials[k].tanh() * Float::max(1.0 - sum_sq, 0.0).sqrt();
            sum_sq += l[(i, j)].powi(2);
            k += 1;
        }
        l[(i, i)] = Float::max(1.0 - sum_sq, 0.0).sqrt();
    }
    let corr = &l * l.transpose();
    let mut external: Vec<Float> = log_sds.iter().map(|z| z.exp()).collect();
    for i in 0..dim {
        for j in 0..i {
            external.push(corr[(i, j)]);
        }
    }
    Ok(external)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use fastrand::Rng;

    use super::*;

    #[test]
    fn test_sdcorr_roundtrip() {
        let x = [1.5, 0.5, 2.0, 0.3, -0.2, 0.4];
        let z = to_internal(&x).unwrap();
        assert_relative_eq!(z[0], Float::ln(1.5), epsilon = 1e-14);
        // the first correlation of the second row is its own partial correlation
        assert_relative_eq!(z[3], Float::atanh(0.3), epsilon = 1e-14);
        let back = from_internal(&z).unwrap();
        for (a, b) in x.iter().zip(&back) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_internal_is_identity_correlation() {
        let x = from_internal(&[0.0; 6]).unwrap();
        assert_eq!(x, vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_sdcorr_feasible_for_any_internal() {
        let mut rng = Rng::with_seed(2);
        for _ in 0..100 {
            let dim = rng.usize(1..5);
            let z: Vec<Float> = (0..dim * (dim + 1) / 2)
                .map(|_| (rng.f64() as Float - 0.5) * 8.0)
                .collect();
            let x = from_internal(&z).unwrap();
            assert!(x[..dim].iter().all(|sd| *sd > 0.0));
            assert!(x[dim..].iter().all(|rho| (-1.0..=1.0).contains(rho)));
            let cov = covariance_matrix(&x).unwrap();
            let eigenvalues = cov.symmetric_eigenvalues();
            let scale = eigenvalues.amax().max(1.0);
            assert!(eigenvalues.iter().all(|v| *v > -1e-10 * scale));
        }
    }

    #[test]
    fn test_sdcorr_internal_roundtrip() {
        let z = [0.2, -0.4, 0.1, 0.9, -1.3, 0.5];
        let again = to_internal(&from_internal(&z).unwrap()).unwrap();
        for (a, b) in z.iter().zip(&again) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_saturated_correlation_roundtrip() {
        let x = from_internal(&[0.0, 0.0, 20.0]).unwrap();
        assert_eq!(x[2], 1.0);
        let z = to_internal(&x).unwrap();
        assert!(z.iter().all(|v| v.is_finite()));
        let back = from_internal(&z).unwrap();
        for (a, b) in x.iter().zip(&back) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }

        // the second row saturates, leaving the correlation matrix singular
        let x = from_internal(&[0.0, 0.5, -0.3, 25.0, 0.3, -0.4]).unwrap();
        let z = to_internal(&x).unwrap();
        assert!(z.iter().all(|v| v.is_finite()));
        let back = from_internal(&z).unwrap();
        for (a, b) in x.iter().zip(&back) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_covariance_matrix() {
        let cov = covariance_matrix(&[2.0, 3.0, 0.5]).unwrap();
        assert_relative_eq!(cov[(0, 0)], 4.0);
        assert_relative_eq!(cov[(1, 1)], 9.0);
        assert_relative_eq!(cov[(0, 1)], 3.0);
    }

    #[test]
    fn test_sdcorr_rejects_infeasible() {
        assert!(matches!(
            to_internal(&[1.0, -1.0, 0.0]),
            Err(ReparamError::InfeasibleInput { .. })
        ));
        assert!(matches!(
            to_internal(&[1.0, 1.0, 1.5]),
            Err(ReparamError::InfeasibleInput { .. })
        ));
        // pairwise valid, jointly impossible
        assert!(matches!(
            to_internal(&[1.0, 1.0, 1.0, 0.9, 0.9, -0.9]),
            Err(ReparamError::InfeasibleInput { .. })
        ));
        assert!(matches!(
            to_internal(&[1.0, 1.0]),
            Err(ReparamError::InvalidConstraint { .. })
        ));
    }
}
