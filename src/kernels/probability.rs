use crate::{core::ConstraintKind, error::ReparamError, Float};

/// Marks which slots of the internal slice are free: every slot except the last, whose logit is
/// pinned at zero.
pub fn free_slots(len: usize) -> Vec<bool> {
    (0..len).map(|k| k + 1 != len).collect()
}

/// Maps a point on the simplex onto log-ratios against the last entry:
///
/// ```math
/// z_k = \ln\frac{p_k}{p_n}
/// ```
///
/// The last internal slot is always zero. Entries must be non-negative and not all zero. An
/// exact zero, which [`from_internal`] produces once a softmax weight underflows, has its
/// logarithm floored at $`\ln`$ of the smallest positive normal float so the log-ratios stay
/// finite. When a `tolerance` is given, the entries must also sum to one within it.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] for an empty slice and
/// [`ReparamError::InfeasibleInput`] if any entry is negative or not finite, all entries are
/// zero, or the sum is off.
pub fn to_internal(
    external: &[Float],
    tolerance: Option<Float>,
) -> Result<Vec<Float>, ReparamError> {
    let n = external.len();
    if n == 0 {
        return Err(ReparamError::invalid(
            ConstraintKind::Probability,
            "no parameters given",
        ));
    }
    if let Some((k, p)) = external
        .iter()
        .enumerate()
        .find(|(_, p)| !(p.is_finite() && **p >= 0.0))
    {
        return Err(ReparamError::infeasible(
            ConstraintKind::Probability,
            format!("entry {} is {}, but must be non-negative", k, p),
        ));
    }
    let total: Float = external.iter().sum();
    if total <= 0.0 {
        return Err(ReparamError::infeasible(
            ConstraintKind::Probability,
            "all entries are zero",
        ));
    }
    if let Some(tol) = tolerance {
        if (total - 1.0).abs() > tol {
            return Err(ReparamError::infeasible(
                ConstraintKind::Probability,
                format!("entries sum to {}", total),
            ));
        }
    }
    let floor = Float::MIN_POSITIVE.ln();
    let log = |p: Float| p.ln().max(floor);
    let ln_last = log(external[n - 1]);
    let mut internal: Vec<Float> = external.iter().map(|p| log(*p) - ln_last).collect();
    internal[n - 1] = 0.0;
    Ok(internal)
}

/// Maps unconstrained logits onto the simplex with a softmax in which the last logit is pinned
/// at zero:
///
/// ```math
/// p_k = \frac{e^{z_k}}{1 + \sum_{j < n} e^{z_j}}
/// ```
///
/// The value in the last slot is ignored. All zeros give the uniform distribution.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidConstraint`] for an empty slice.
pub fn from_internal(internal: &[Float]) -> Result<Vec<Float>, ReparamError> {
    let n = internal.len();
    if n == 0 {
        return Err(ReparamError::invalid(
            ConstraintKind::Probability,
            "no parameters given",
        ));
    }
    let logits = internal[..n - 1].iter().copied().chain(std::iter::once(0.0));
    let max = logits.clone().fold(Float::NEG_INFINITY, Float::max);
    let weights: Vec<Float> = logits.map(|z| (z - max).exp()).collect();
    let total: Float = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / total).collect())
}
