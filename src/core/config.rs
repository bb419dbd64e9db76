use serde::{Deserialize, Serialize};

use crate::Float;

/// The configuration struct for a [`Reparametrization`](super::Reparametrization). It holds the
/// numerical settings the kernels need when they check that external values are feasible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Absolute tolerance (scaled by the magnitude of the target) used when checking linear
    /// equalities and that probabilities sum to one.
    pub tolerance: Float,
    /// Whether the linear and probability kernels verify their input before transforming it.
    /// Matrix factorizations reject matrices that are not positive semi-definite regardless.
    pub check_feasibility: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: Float::EPSILON.sqrt(),
            check_feasibility: true,
        }
    }
}

impl Config {
    /// Sets the feasibility tolerance (default: `sqrt(EPSILON)`).
    ///
    /// # Panics
    ///
    /// This function will panic if the tolerance is negative or not finite.
    pub fn with_tolerance(&mut self, tolerance: Float) -> &mut Self {
        assert!(
            tolerance.is_finite() && tolerance >= 0.0,
            "Tolerance must be finite and non-negative, got {}",
            tolerance
        );
        self.tolerance = tolerance;
        self
    }
    /// Enables or disables the feasibility checks of the linear and probability kernels
    /// (default: enabled).
    pub fn with_feasibility_checks(&mut self, check: bool) -> &mut Self {
        self.check_feasibility = check;
        self
    }
    /// The tolerance the kernels should use, or `None` when checks are disabled.
    pub(crate) const fn check_tolerance(&self) -> Option<Float> {
        if self.check_feasibility {
            Some(self.tolerance)
        } else {
            None
        }
    }
}
