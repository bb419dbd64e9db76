use crate::{DMatrix, Float};

/// Returns the dimension $`d`$ of a square matrix whose lower triangle (diagonal included) has
/// `n` entries, i.e. the solution of $`n = d(d+1)/2`$, or [`None`] if there is none.
pub fn triangular_dimension(n: usize) -> Option<usize> {
    let dim = ((Float::sqrt((8 * n + 1) as Float) - 1.0) / 2.0).round() as usize;
    (dim * (dim + 1) / 2 == n).then_some(dim)
}

/// Builds a lower-triangular matrix from its entries listed row by row (left to right, top to
/// bottom).
///
/// # Panics
///
/// This function will panic if `values` has fewer than $`d(d+1)/2`$ entries.
pub fn lower_triangular_from_flat(values: &[Float], dim: usize) -> DMatrix<Float> {
    let mut output = DMatrix::zeros(dim, dim);
    let mut k = 0;
    for i in 0..dim {
        for j in 0..=i {
            output[(i, j)] = values[k];
            k += 1;
        }
    }
    output
}

/// Builds a symmetric matrix from its lower triangle listed row by row.
///
/// # Panics
///
/// This function will panic if `values` has fewer than $`d(d+1)/2`$ entries.
pub fn symmetric_from_flat(values: &[Float], dim: usize) -> DMatrix<Float> {
    let mut output = DMatrix::zeros(dim, dim);
    let mut k = 0;
    for i in 0..dim {
        for j in 0..=i {
            output[(i, j)] = values[k];
            output[(j, i)] = values[k];
            k += 1;
        }
    }
    output
}

/// Lists the lower triangle (diagonal included) of a square matrix row by row.
pub fn flatten_lower_triangle(matrix: &DMatrix<Float>) -> Vec<Float> {
    let dim = matrix.nrows();
    let mut output = Vec::with_capacity(dim * (dim + 1) / 2);
    for i in 0..dim {
        for j in 0..=i {
            output.push(matrix[(i, j)]);
        }
    }
    output
}

/// Lower Cholesky factor of a symmetric positive semi-definite matrix.
///
/// Unlike [`nalgebra::Cholesky`], a vanishing pivot is accepted: the diagonal entry is set to zero
/// and so is the rest of its column, which requires the matching residuals to vanish as well.
/// Residuals are compared against `tolerance` relative to the diagonal. Returns [`None`] if the
/// matrix has a non-finite entry or is not positive semi-definite within `tolerance`.
pub(crate) fn semidefinite_cholesky(
    matrix: &DMatrix<Float>,
    tolerance: Float,
) -> Option<DMatrix<Float>> {
    if !matrix.iter().all(|v| v.is_finite()) {
        return None;
    }
    let dim = matrix.nrows();
    let mut l = DMatrix::<Float>::zeros(dim, dim);
    for i in 0..dim {
        let c_ii = matrix[(i, i)];
        if c_ii < 0.0 {
            return None;
        }
        for j in 0..i {
            let mut residual = matrix[(i, j)];
            for k in 0..j {
                residual -= l[(i, k)] * l[(j, k)];
            }
            if l[(j, j)] > 0.0 {
                l[(i, j)] = residual / l[(j, j)];
            } else if residual.abs() > tolerance * Float::sqrt(c_ii * matrix[(j, j)]) {
                return None;
            }
        }
        let mut residual = c_ii;
        for k in 0..i {
            residual -= l[(i, k)].powi(2);
        }
        if residual < -tolerance * c_ii {
            return None;
        }
        // rounding noise on a singular pivot
        if residual > Float::EPSILON * c_ii {
            l[(i, i)] = residual.sqrt();
        }
    }
    Some(l)
}

/// The softplus function, $`\ln(1 + e^x)`$, which maps the real line onto $`(0, \infty)`$.
pub fn softplus(x: Float) -> Float {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

/// The inverse of [`softplus`], $`\ln(e^y - 1)`$, defined for $`y > 0`$.
pub fn inverse_softplus(y: Float) -> Float {
    if y > 1.0 {
        y + (-(-y).exp()).ln_1p()
    } else {
        y.exp_m1().ln()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_triangular_dimension() {
        assert_eq!(triangular_dimension(1), Some(1));
        assert_eq!(triangular_dimension(3), Some(2));
        assert_eq!(triangular_dimension(6), Some(3));
        assert_eq!(triangular_dimension(10), Some(4));
        assert_eq!(triangular_dimension(4), None);
        assert_eq!(triangular_dimension(7), None);
    }

    #[test]
    fn test_pack_and_unpack() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let l = lower_triangular_from_flat(&values, 3);
        assert_eq!(l[(1, 0)], 2.0);
        assert_eq!(l[(2, 1)], 5.0);
        assert_eq!(l[(0, 2)], 0.0);
        let s = symmetric_from_flat(&values, 3);
        assert_eq!(s[(0, 2)], 4.0);
        assert_eq!(s[(2, 0)], 4.0);
        assert_eq!(flatten_lower_triangle(&s), values.to_vec());
    }

    #[test]
    fn test_softplus_inverse() {
        for &x in &[-30.0, -2.5, -1e-3, 0.0, 0.7, 3.0, 40.0] {
            let y = softplus(x);
            assert!(y > 0.0);
            assert_relative_eq!(inverse_softplus(y), x, epsilon = 1e-9, max_relative = 1e-9);
        }
        assert_relative_eq!(softplus(0.0), Float::ln(2.0));
    }

    #[test]
    fn test_semidefinite_cholesky() {
        let tol = Float::EPSILON.sqrt();
        let pd = symmetric_from_flat(&[4.0, 2.0, 3.0], 2);
        let l = semidefinite_cholesky(&pd, tol).unwrap();
        assert_relative_eq!(&l * l.transpose(), pd, epsilon = 1e-12);
        assert_eq!(l[(0, 1)], 0.0);

        // rank one, second pivot vanishes
        let singular = symmetric_from_flat(&[1.0, 1.0, 1.0, 1.0, 1.0, 2.0], 3);
        let l = semidefinite_cholesky(&singular, tol).unwrap();
        assert_eq!(l[(1, 1)], 0.0);
        assert_eq!(l[(2, 1)], 0.0);
        assert_relative_eq!(&l * l.transpose(), singular, epsilon = 1e-12);

        assert!(semidefinite_cholesky(&symmetric_from_flat(&[1.0, 2.0, 1.0], 2), tol).is_none());
        assert!(semidefinite_cholesky(&symmetric_from_flat(&[0.0, 1.0, 0.0], 2), tol).is_none());
        assert!(
            semidefinite_cholesky(&symmetric_from_flat(&[1.0, Float::NAN, 1.0], 2), tol).is_none()
        );
    }
}
