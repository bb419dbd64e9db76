//! `reparam` maps constrained model parameters onto a flat, unconstrained vector that any
//! optimizer can search freely, and maps the optimizer's proposals back onto parameters which
//! satisfy every declared constraint.
//!
//! # Table of Contents
//! - [Key Features](#key-features)
//! - [Quick Start](#quick-start)
//! - [Constraint Kinds](#constraint-kinds)
//! - [Replacements](#replacements)
//!
//! # Key Features
//! * A closed set of [`Constraint`] kinds, each backed by a pair of transform kernels in
//!   [`kernels`].
//! * Feasibility by construction: every internal vector maps to an external vector inside the
//!   feasible set of each constraint, without clipping.
//! * Fixed parameters and linked duplicates are handled outside of the kernels through
//!   [`Replacements`].
//! * A [`ReparametrizedProblem`](traits::ReparametrizedProblem) adapter so that a cost function
//!   written for external parameters can be handed directly to an optimizer.
//!
//! # Quick Start
//!
//! ```rust
//! use reparam::prelude::*;
//!
//! fn main() -> Result<(), ReparamError> {
//!     // three probabilities summing to one
//!     let constraints = vec![Constraint::Probability { index: vec![0, 1, 2] }];
//!     let free_mask = vec![true, true, false];
//!     let fixed_values = DVector::zeros(3);
//!     let pre = Replacements::from(vec![Some(0), Some(1), None]);
//!     let post = Replacements::none(3);
//!     let r = Reparametrization::new(constraints, free_mask, fixed_values, pre, post)?;
//!
//!     let x = r.from_internal(&DVector::from_vec(vec![0.0, 0.0]))?;
//!     assert!((x[0] - 1.0 / 3.0).abs() < 1e-12);
//!     let z = r.to_internal(&x)?;
//!     assert_eq!(z.len(), 2);
//!     Ok(())
//! }
//! ```
//!
//! # Constraint Kinds
//!
//! Linear (`w·x = c`), with the last entry carrying a non-zero weight solved from the others:
//! ```math
//! x_d = \frac{c - \sum_{k \neq d} w_k x_k}{w_d}
//! ```
//! Probability, as a softmax with the last logit pinned at zero:
//! ```math
//! z_k = \ln\frac{p_k}{p_{n}}, \qquad p_k = \frac{e^{z_k}}{\sum_j e^{z_j}}
//! ```
//! Covariance, as a Cholesky factor $`L`$ with a softplus diagonal, $`\Sigma = LL^{\intercal}`$.
//!
//! Standard deviations and correlations, as $`\ln\sigma_i`$ together with the hyperbolic
//! arctangent of the canonical partial correlations of the correlation matrix.
//!
//! # Replacements
//!
//! Pre-replacements copy raw internal values into the external vector *before* any kernel
//! runs. Post-replacements copy external values *after* every kernel has run, so a linked
//! duplicate of a transformed parameter always sees the transformed value.
#![warn(
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::doc_link_with_quotes,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::perf,
    clippy::style,
    missing_docs
)]

/// Module containing the reparametrization engine, constraints, and configuration.
pub mod core;
/// Module containing the crate's error type.
pub mod error;
/// Module containing the transform kernels for every constraint kind.
pub mod kernels;
/// Module containing the traits used to plug the engine into an optimizer.
pub mod traits;

pub use crate::core::{
    free_mask_from_constraints, propagate_derivative, reparametrize_from_internal,
    reparametrize_to_internal, Config, Constraint, ConstraintKind, Replacements,
    Reparametrization,
};
pub use error::ReparamError;

/// Prelude module containing everything someone should need to use this crate for
/// non-development purposes.
pub mod prelude {
    pub use crate::{
        core::{Config, Constraint, ConstraintKind, Replacements, Reparametrization},
        error::ReparamError,
        traits::{CostFunction, ReparametrizedProblem, Transform},
        DMatrix, DVector, Float,
    };
}

/// The floating-point type used throughout the crate.
#[cfg(not(feature = "f32"))]
pub type Float = f64;

/// The floating-point type used throughout the crate.
#[cfg(feature = "f32")]
pub type Float = f32;

/// Re-export of the nalgebra dynamic vector type.
pub use nalgebra::DVector;

/// Re-export of the nalgebra dynamic matrix type.
pub use nalgebra::DMatrix;
