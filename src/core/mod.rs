/// [`Config`] type holding the numerical settings of a reparametrization.
pub mod config;
/// [`Constraint`] and [`ConstraintKind`] types describing processed constraints.
pub mod constraint;
/// [`Replacements`] type for copy rules applied outside of the kernels.
pub mod replacements;
/// [`Reparametrization`] type and the free functions converting between parameter spaces.
pub mod reparametrization;
/// Helpers for packing and unpacking triangular matrices.
pub mod utils;

pub use config::Config;
pub use constraint::{Constraint, ConstraintKind};
pub use replacements::Replacements;
pub use reparametrization::{
    free_mask_from_constraints, propagate_derivative, reparametrize_from_internal,
    reparametrize_to_internal, Reparametrization,
};
