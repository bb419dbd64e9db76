use crate::{core::Reparametrization, error::ReparamError, traits::CostFunction, DVector, Float};

/// A bidirectional map between an external parameter space and an internal one.
pub trait Transform {
    /// Maps external parameters to internal parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ReparamError`] if `x` cannot be mapped.
    fn to_internal(&self, x: &DVector<Float>) -> Result<DVector<Float>, ReparamError>;
    /// Maps internal parameters to external parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ReparamError`] if `z` cannot be mapped.
    fn to_external(&self, z: &DVector<Float>) -> Result<DVector<Float>, ReparamError>;
}

impl Transform for Reparametrization {
    fn to_internal(&self, x: &DVector<Float>) -> Result<DVector<Float>, ReparamError> {
        Self::to_internal(self, x)
    }

    fn to_external(&self, z: &DVector<Float>) -> Result<DVector<Float>, ReparamError> {
        self.from_internal(z)
    }
}

/// A [`CostFunction`] of internal parameters, built from one of external parameters.
///
/// Every evaluation first maps the internal point to the external space and then calls the
/// wrapped function there, so an optimizer working on the unconstrained internal space only
/// ever hands the user's function feasible parameters.
pub struct ReparametrizedProblem<'a, F, T>
where
    T: Transform,
{
    /// The cost function of external parameters.
    pub f: &'a F,
    /// The map between the two spaces.
    pub t: &'a T,
}

impl<'a, F, T> ReparametrizedProblem<'a, F, T>
where
    T: Transform,
{
    /// Wraps `f` so that it can be evaluated on the internal parameters of `t`.
    pub const fn new(f: &'a F, t: &'a T) -> Self {
        Self { f, t }
    }

    /// Maps internal parameters to external parameters.
    ///
    /// # Errors
    ///
    /// See [`Transform::to_external`].
    pub fn to_external(&self, z: &DVector<Float>) -> Result<DVector<Float>, ReparamError> {
        self.t.to_external(z)
    }

    /// Maps external parameters to internal parameters, e.g. to turn a user's starting point into
    /// the optimizer's.
    ///
    /// # Errors
    ///
    /// See [`Transform::to_internal`].
    pub fn to_internal(&self, x: &DVector<Float>) -> Result<DVector<Float>, ReparamError> {
        self.t.to_internal(x)
    }
}

impl<'a, F, U, E, T> CostFunction<U, E> for ReparametrizedProblem<'a, F, T>
where
    F: CostFunction<U, E>,
    T: Transform,
    E: From<ReparamError>,
{
    #[inline]
    fn evaluate(&self, z: &DVector<Float>, user_data: &mut U) -> Result<Float, E> {
        let x = self.t.to_external(z)?;
        self.f.evaluate(&x, user_data)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::core::{Constraint, Replacements};

    /// Cross-entropy of a distribution against a target.
    struct CrossEntropy(Vec<Float>);
    impl CostFunction<(), ReparamError> for CrossEntropy {
        fn evaluate(&self, x: &DVector<Float>, _: &mut ()) -> Result<Float, ReparamError> {
            Ok(-self.0.iter().zip(x.iter()).map(|(t, p)| t * p.ln()).sum::<Float>())
        }
    }

    fn simplex() -> Reparametrization {
        Reparametrization::new(
            vec![Constraint::Probability {
                index: vec![0, 1, 2],
            }],
            vec![true, true, false],
            DVector::zeros(3),
            Replacements::from(vec![Some(0), Some(1), None]),
            Replacements::none(3),
        )
        .unwrap()
    }

    #[test]
    fn test_reparametrized_problem_evaluates_external() {
        let r = simplex();
        let f = CrossEntropy(vec![0.2, 0.3, 0.5]);
        let problem = ReparametrizedProblem::new(&f, &r);
        let z = DVector::from_vec(vec![0.0, 0.0]);
        let value = problem.evaluate(&z, &mut ()).unwrap();
        assert_relative_eq!(value, Float::ln(3.0), epsilon = 1e-12);

        let x0 = DVector::from_vec(vec![0.2, 0.3, 0.5]);
        let z0 = problem.to_internal(&x0).unwrap();
        let back = problem.to_external(&z0).unwrap();
        assert_relative_eq!(back, x0, epsilon = 1e-12);
    }

    #[test]
    fn test_reparametrized_problem_propagates_errors() {
        let r = simplex();
        let f = CrossEntropy(vec![0.2, 0.3, 0.5]);
        let problem = ReparametrizedProblem::new(&f, &r);
        let err = problem
            .evaluate(&DVector::from_vec(vec![0.0]), &mut ())
            .unwrap_err();
        assert!(matches!(err, ReparamError::DimensionMismatch { .. }));
    }
}
