/// Module containing the [`CostFunction`] trait.
pub mod cost_function;
/// Module containing the [`Transform`] trait and the [`ReparametrizedProblem`] adapter.
pub mod transform;

pub use cost_function::CostFunction;
pub use transform::{ReparametrizedProblem, Transform};
