use crate::{core::ConstraintKind, error::ReparamError, Float};

/// Returns the position (within the constraint's slice) of the value which is solved from the
/// others: the last entry carrying a non-zero weight.
pub fn dropped_position(weights: &[Float]) -> Option<usize> {
    weights.iter().rposition(|w| *w != 0.0)
}

fn require_dropped(values: &[Float], weights: &[Float]) -> Result<usize, ReparamError> {
    if weights.len() != values.len() {
        return Err(ReparamError::invalid(
            ConstraintKind::Linear,
            format!(
                "{} weights given for {} parameters",
                weights.len(),
                values.len()
            ),
        ));
    }
    dropped_position(weights)
        .ok_or_else(|| ReparamError::invalid(ConstraintKind::Linear, "all weights are zero"))
}

/// Marks which slots of the internal slice are free: every slot except the dropped one.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] if every weight is zero.
pub fn free_slots(weights: &[Float]) -> Result<Vec<bool>, ReparamError> {
    let dropped = dropped_position(weights)
        .ok_or_else(|| ReparamError::invalid(ConstraintKind::Linear, "all weights are zero"))?;
    Ok((0..weights.len()).map(|k| k != dropped).collect())
}

/// The internal representation of a linear constraint is the external slice itself. The dropped
/// slot is carried along but is not free, and is recomputed by [`from_internal`].
///
/// When a `tolerance` is given, the equality $`w \cdot x = c`$ is checked first.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] if the weights do not match the slice or are all
/// zero, and [`ReparamError::InfeasibleInput`] if the equality does not hold.
pub fn to_internal(
    external: &[Float],
    weights: &[Float],
    value: Float,
    tolerance: Option<Float>,
) -> Result<Vec<Float>, ReparamError> {
    require_dropped(external, weights)?;
    if let Some(tol) = tolerance {
        let lhs: Float = external.iter().zip(weights).map(|(x, w)| x * w).sum();
        if !lhs.is_finite() || (lhs - value).abs() > tol * (1.0 + value.abs()) {
            return Err(ReparamError::infeasible(
                ConstraintKind::Linear,
                format!("weighted sum is {} but must equal {}", lhs, value),
            ));
        }
    }
    Ok(external.to_vec())
}

/// Solves the dropped slot from the free ones:
///
/// ```math
/// x_d = \frac{c - \sum_{k \neq d} w_k x_k}{w_d}
/// ```
///
/// Whatever value currently sits in the dropped slot is ignored.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] if the weights do not match the slice or are all
/// zero.
pub fn from_internal(
    internal: &[Float],
    weights: &[Float],
    value: Float,
) -> Result<Vec<Float>, ReparamError> {
    let dropped = require_dropped(internal, weights)?;
    let rest: Float = internal
        .iter()
        .zip(weights)
        .enumerate()
        .filter(|(k, _)| *k != dropped)
        .map(|(_, (x, w))| x * w)
        .sum();
    let mut external = internal.to_vec();
    external[dropped] = (value - rest) / weights[dropped];
    Ok(external)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_dropped_position() {
        assert_eq!(dropped_position(&[1.0, 1.0, 1.0]), Some(2));
        assert_eq!(dropped_position(&[1.0, 2.0, 0.0]), Some(1));
        assert_eq!(dropped_position(&[0.0, 0.0]), None);
        assert_eq!(free_slots(&[1.0, 2.0, 0.0]).unwrap(), vec![true, false, true]);
    }

    #[test]
    fn test_linear_from_internal_solves_for_dropped() {
        let ext = from_internal(&[4.0, 999.0], &[1.0, 1.0], 10.0).unwrap();
        assert_eq!(ext, vec![4.0, 6.0]);

        let ext = from_internal(&[1.0, 2.0, 0.0], &[2.0, -1.0, 4.0], 3.0).unwrap();
        assert_relative_eq!(ext[2], (3.0 - 2.0 + 2.0) / 4.0);
    }

    #[test]
    fn test_linear_roundtrip() {
        let weights = [0.5, 1.5, -2.0];
        let x = [1.0, 2.0, -0.25];
        let value: Float = x.iter().zip(&weights).map(|(a, b)| a * b).sum();
        let z = to_internal(&x, &weights, value, Some(1e-10)).unwrap();
        let back = from_internal(&z, &weights, value).unwrap();
        for (a, b) in x.iter().zip(&back) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_linear_rejects_violated_equality() {
        let err = to_internal(&[1.0, 1.0], &[1.0, 1.0], 3.0, Some(1e-8)).unwrap_err();
        assert!(matches!(err, ReparamError::InfeasibleInput { .. }));
        assert!(to_internal(&[1.0, 1.0], &[1.0, 1.0], 3.0, None).is_ok());
    }

    #[test]
    fn test_linear_rejects_bad_weights() {
        assert!(matches!(
            from_internal(&[1.0, 1.0], &[0.0, 0.0], 1.0),
            Err(ReparamError::InvalidConstraint { .. })
        ));
        assert!(matches!(
            to_internal(&[1.0, 1.0], &[1.0], 1.0, None),
            Err(ReparamError::InvalidConstraint { .. })
        ));
    }
}
