//! Transform kernels, one pair of functions per constraint kind.
//!
//! Every kernel works on the slice of the external vector its constraint governs. The
//! `to_internal` half maps a feasible slice onto an internal slice of the same length (some
//! slots of which are not free and are dropped by the free mask), and the `from_internal` half
//! maps *any* internal slice back onto a feasible one. The two halves are exact inverses of each
//! other up to floating-point error:
//!
//! ```math
//! f^{-1}(f(x)) = x, \qquad f(f^{-1}(z)) = z
//! ```
//!
//! Feasibility is a property of the shape of each map, so no kernel ever clips its output.

/// Kernel for the `covariance` constraint kind.
pub mod covariance;
/// Kernel for the `linear` constraint kind.
pub mod linear;
/// Kernel for the `probability` constraint kind.
pub mod probability;
/// Kernel for the `sdcorr` constraint kind.
pub mod sdcorr;
