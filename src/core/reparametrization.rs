use log::{debug, trace};

use crate::{error::ReparamError, DVector, Float};

use super::{Config, Constraint, Replacements};

fn gather(values: &DVector<Float>, index: &[usize]) -> Result<Vec<Float>, ReparamError> {
    index
        .iter()
        .map(|&i| {
            values.get(i).copied().ok_or(ReparamError::IndexOutOfBounds {
                index: i,
                len: values.len(),
            })
        })
        .collect()
}

fn scatter(values: &mut DVector<Float>, index: &[usize], slice: &[Float]) {
    for (&i, v) in index.iter().zip(slice) {
        values[i] = *v;
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), ReparamError> {
    if expected == found {
        Ok(())
    } else {
        Err(ReparamError::DimensionMismatch {
            what,
            expected,
            found,
        })
    }
}

fn to_internal_with(
    external: &DVector<Float>,
    free_mask: &[bool],
    constraints: &[Constraint],
    tolerance: Option<Float>,
) -> Result<DVector<Float>, ReparamError> {
    check_len("free mask", external.len(), free_mask.len())?;
    let mut values = external.clone();
    for constraint in constraints {
        let index = constraint.index();
        trace!("{} to_internal on {:?}", constraint.kind(), index);
        let slice = gather(external, index)?;
        let internal = constraint.to_internal(&slice, tolerance)?;
        scatter(&mut values, index, &internal);
    }
    Ok(DVector::from_iterator(
        free_mask.iter().filter(|free| **free).count(),
        values
            .iter()
            .zip(free_mask)
            .filter(|(_, free)| **free)
            .map(|(v, _)| *v),
    ))
}

fn from_internal_with(
    internal: &DVector<Float>,
    fixed_values: &DVector<Float>,
    pre_replacements: &Replacements,
    constraints: &[Constraint],
    post_replacements: &Replacements,
) -> Result<DVector<Float>, ReparamError> {
    let mut values = fixed_values.clone();
    pre_replacements.apply(internal, &mut values)?;
    for constraint in constraints {
        let index = constraint.index();
        trace!("{} from_internal on {:?}", constraint.kind(), index);
        let slice = gather(&values, index)?;
        let external = constraint.from_internal(&slice)?;
        scatter(&mut values, index, &external);
    }
    let transformed = values.clone();
    post_replacements.apply(&transformed, &mut values)?;
    Ok(values)
}

/// Converts a full external parameter vector into the internal vector an optimizer may perturb
/// freely.
///
/// Every constraint's `to_internal` kernel is applied to its slice of a copy of `external`, and
/// the positions marked in `free_mask` are returned in order. The linear and probability
/// feasibility checks run with the default [`Config`] tolerance.
///
/// # Errors
///
/// Returns [`ReparamError::DimensionMismatch`] if `free_mask` does not match `external`,
/// [`ReparamError::IndexOutOfBounds`] if a constraint points past the end of `external`, and
/// any error raised by a kernel (see [`Constraint::to_internal`]).
pub fn reparametrize_to_internal(
    external: &DVector<Float>,
    free_mask: &[bool],
    constraints: &[Constraint],
) -> Result<DVector<Float>, ReparamError> {
    to_internal_with(
        external,
        free_mask,
        constraints,
        Config::default().check_tolerance(),
    )
}

/// Converts an internal parameter vector into a full external vector which satisfies every
/// constraint.
///
/// Starting from a copy of `fixed_values`, the pre-replacements are copied in from `internal`,
/// every constraint's `from_internal` kernel is applied to its slice, and finally the
/// post-replacements are copied from the already transformed values.
///
/// # Errors
///
/// Returns [`ReparamError::InvalidReplacementIndex`] if a replacement reads out of range,
/// [`ReparamError::DimensionMismatch`] if the replacements do not match `fixed_values`,
/// [`ReparamError::IndexOutOfBounds`] if a constraint points past the end of `fixed_values`,
/// and [`ReparamError::InvalidConstraint`] if a constraint is malformed.
pub fn reparametrize_from_internal(
    internal: &DVector<Float>,
    fixed_values: &DVector<Float>,
    pre_replacements: &Replacements,
    constraints: &[Constraint],
    post_replacements: &Replacements,
) -> Result<DVector<Float>, ReparamError> {
    from_internal_with(
        internal,
        fixed_values,
        pre_replacements,
        constraints,
        post_replacements,
    )
}

/// Converts a derivative with respect to external parameters into one with respect to internal
/// parameters.
///
/// # Errors
///
/// Always returns [`ReparamError::NotImplemented`]; the chain rule through the kernels is not
/// defined yet.
pub fn propagate_derivative(
    _external_derivative: &DVector<Float>,
) -> Result<DVector<Float>, ReparamError> {
    Err(ReparamError::NotImplemented("derivative propagation"))
}

/// Derives the standard free mask for `n_external` parameters: a position is free unless it is
/// fixed or it is a slot a kernel computes from the others (the dropped entry of a linear
/// constraint, the last entry of a probability constraint).
///
/// `fixed` marks the positions pinned to a value, and must have length `n_external`.
///
/// # Errors
///
/// Returns [`ReparamError::DimensionMismatch`] if `fixed` has the wrong length,
/// [`ReparamError::IndexOutOfBounds`] if a constraint points past `n_external`, and
/// [`ReparamError::InvalidConstraint`] if a constraint is malformed.
pub fn free_mask_from_constraints(
    n_external: usize,
    constraints: &[Constraint],
    fixed: &[bool],
) -> Result<Vec<bool>, ReparamError> {
    check_len("fixed mask", n_external, fixed.len())?;
    let mut mask: Vec<bool> = fixed.iter().map(|f| !f).collect();
    for constraint in constraints {
        for (&i, free) in constraint.index().iter().zip(constraint.free_slots()?) {
            if i >= n_external {
                return Err(ReparamError::IndexOutOfBounds {
                    index: i,
                    len: n_external,
                });
            }
            mask[i] &= free;
        }
    }
    Ok(mask)
}

/// A validated reparametrization, built once per optimization run.
///
/// It owns the processed constraints together with the free mask, fixed values, and
/// replacement rules, and checks at construction that they agree with each other. After that,
/// [`Reparametrization::to_internal`] and [`Reparametrization::from_internal`] only fail on
/// infeasible external input.
///
/// The struct holds no interior state, so a single instance may be shared across threads to
/// evaluate many candidate points at once.
#[derive(Clone, Debug, PartialEq)]
pub struct Reparametrization {
    constraints: Vec<Constraint>,
    free_mask: Vec<bool>,
    fixed_values: DVector<Float>,
    pre_replacements: Replacements,
    post_replacements: Replacements,
    n_internal: usize,
    config: Config,
}

impl Reparametrization {
    /// Creates a new [`Reparametrization`] with the default [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`ReparamError::DimensionMismatch`] if the free mask or either set of
    /// replacements does not have one entry per fixed value,
    /// [`ReparamError::InvalidConstraint`] if a constraint is malformed,
    /// [`ReparamError::IndexOutOfBounds`] if a constraint points past the external vector,
    /// [`ReparamError::OverlappingConstraints`] if two constraints share a position, and
    /// [`ReparamError::InvalidReplacementIndex`] if a pre-replacement reads past the internal
    /// vector or a post-replacement reads past the external vector.
    pub fn new(
        constraints: Vec<Constraint>,
        free_mask: Vec<bool>,
        fixed_values: DVector<Float>,
        pre_replacements: Replacements,
        post_replacements: Replacements,
    ) -> Result<Self, ReparamError> {
        let n_external = fixed_values.len();
        check_len("free mask", n_external, free_mask.len())?;
        check_len("pre-replacements", n_external, pre_replacements.len())?;
        check_len("post-replacements", n_external, post_replacements.len())?;
        let mut owned = vec![false; n_external];
        for constraint in &constraints {
            constraint.validate()?;
            for &i in constraint.index() {
                if i >= n_external {
                    return Err(ReparamError::IndexOutOfBounds {
                        index: i,
                        len: n_external,
                    });
                }
                if owned[i] {
                    return Err(ReparamError::OverlappingConstraints { index: i });
                }
                owned[i] = true;
            }
        }
        let n_internal = free_mask.iter().filter(|free| **free).count();
        pre_replacements.validate(n_internal)?;
        post_replacements.validate(n_external)?;
        debug!(
            "built reparametrization: {} external, {} internal, {} constraints",
            n_external,
            n_internal,
            constraints.len()
        );
        Ok(Self {
            constraints,
            free_mask,
            fixed_values,
            pre_replacements,
            post_replacements,
            n_internal,
            config: Config::default(),
        })
    }

    /// Replaces the [`Config`] used by the kernels.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Convenience method to adjust the [`Config`] with its chainable setters.
    pub fn setup_config<F>(mut self, mut f: F) -> Self
    where
        F: FnMut(&mut Config) -> &mut Config,
    {
        f(&mut self.config);
        self
    }

    /// The number of external parameters.
    pub fn n_external(&self) -> usize {
        self.fixed_values.len()
    }

    /// The number of internal (free) parameters.
    pub const fn n_internal(&self) -> usize {
        self.n_internal
    }

    /// The processed constraints, in declaration order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The free mask.
    pub fn free_mask(&self) -> &[bool] {
        &self.free_mask
    }

    /// The fixed values.
    pub const fn fixed_values(&self) -> &DVector<Float> {
        &self.fixed_values
    }

    /// The current [`Config`].
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Converts a full external vector into the internal vector. See
    /// [`reparametrize_to_internal`].
    ///
    /// # Errors
    ///
    /// Returns [`ReparamError::DimensionMismatch`] if `external` has the wrong length and
    /// [`ReparamError::InfeasibleInput`] if it violates a constraint.
    pub fn to_internal(&self, external: &DVector<Float>) -> Result<DVector<Float>, ReparamError> {
        check_len("external vector", self.n_external(), external.len())?;
        to_internal_with(
            external,
            &self.free_mask,
            &self.constraints,
            self.config.check_tolerance(),
        )
    }

    /// Converts an internal vector into a full external vector. See
    /// [`reparametrize_from_internal`].
    ///
    /// # Errors
    ///
    /// Returns [`ReparamError::DimensionMismatch`] if `internal` has the wrong length.
    pub fn from_internal(&self, internal: &DVector<Float>) -> Result<DVector<Float>, ReparamError> {
        check_len("internal vector", self.n_internal, internal.len())?;
        from_internal_with(
            internal,
            &self.fixed_values,
            &self.pre_replacements,
            &self.constraints,
            &self.post_replacements,
        )
    }

    /// Converts a batch of external vectors, in parallel when the `rayon` feature is enabled.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Reparametrization::to_internal`].
    pub fn to_internal_batch(
        &self,
        externals: &[DVector<Float>],
    ) -> Result<Vec<DVector<Float>>, ReparamError> {
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            externals.par_iter().map(|x| self.to_internal(x)).collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            externals.iter().map(|x| self.to_internal(x)).collect()
        }
    }

    /// Converts a batch of internal vectors, in parallel when the `rayon` feature is enabled.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Reparametrization::from_internal`].
    pub fn from_internal_batch(
        &self,
        internals: &[DVector<Float>],
    ) -> Result<Vec<DVector<Float>>, ReparamError> {
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            internals.par_iter().map(|z| self.from_internal(z)).collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            internals.iter().map(|z| self.from_internal(z)).collect()
        }
    }

    /// Converts a derivative with respect to external parameters into one with respect to
    /// internal parameters. See [`propagate_derivative`].
    ///
    /// # Errors
    ///
    /// Always returns [`ReparamError::NotImplemented`].
    pub fn propagate_derivative(
        &self,
        external_derivative: &DVector<Float>,
    ) -> Result<DVector<Float>, ReparamError> {
        propagate_derivative(external_derivative)
    }
}
