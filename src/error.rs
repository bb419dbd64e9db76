use thiserror::Error;

use crate::core::ConstraintKind;

/// Errors that can occur while building or applying a reparametrization.
///
/// None of these are transient. Every variant indicates a contract violation by the caller or
/// by whatever produced the processed constraints, so nothing here is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReparamError {
    /// A constraint record named a kind with no matching kernel.
    #[error("unknown constraint kind '{0}'")]
    UnknownConstraintKind(String),

    /// A kernel received external values outside of its feasible set.
    #[error("infeasible input for {kind} constraint: {reason}")]
    InfeasibleInput {
        /// The kind of the constraint whose kernel rejected the input.
        kind: ConstraintKind,
        /// A human-readable description of the violation.
        reason: String,
    },

    /// A replacement rule points outside of the vector it reads from.
    #[error("replacement for position {target} reads from {from}, but the source has length {len}")]
    InvalidReplacementIndex {
        /// The position that would have been written.
        target: usize,
        /// The position that would have been read.
        from: usize,
        /// The length of the vector being read.
        len: usize,
    },

    /// A constraint record is malformed (wrong number of entries, missing weights, ...).
    #[error("invalid {kind} constraint: {reason}")]
    InvalidConstraint {
        /// The kind of the malformed constraint.
        kind: ConstraintKind,
        /// A human-readable description of the problem.
        reason: String,
    },

    /// A constraint refers to a position past the end of the external vector.
    #[error("constraint index {index} is out of bounds for {len} external parameters")]
    IndexOutOfBounds {
        /// The offending position.
        index: usize,
        /// The number of external parameters.
        len: usize,
    },

    /// Two constraints govern the same external position.
    #[error("external position {index} is governed by more than one constraint")]
    OverlappingConstraints {
        /// The position claimed twice.
        index: usize,
    },

    /// Two pieces of input that must agree in length do not.
    #[error("{what} has length {found}, expected {expected}")]
    DimensionMismatch {
        /// Which input had the wrong length.
        what: &'static str,
        /// The required length.
        expected: usize,
        /// The length that was given.
        found: usize,
    },

    /// The requested operation has no implementation yet.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl ReparamError {
    pub(crate) fn infeasible(kind: ConstraintKind, reason: impl Into<String>) -> Self {
        Self::InfeasibleInput {
            kind,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(kind: ConstraintKind, reason: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            kind,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = ReparamError::UnknownConstraintKind("fixed".to_string());
        assert_eq!(e.to_string(), "unknown constraint kind 'fixed'");

        let e = ReparamError::infeasible(ConstraintKind::Probability, "entry 1 is negative");
        assert_eq!(
            e.to_string(),
            "infeasible input for probability constraint: entry 1 is negative"
        );

        let e = ReparamError::InvalidReplacementIndex {
            target: 2,
            from: 7,
            len: 3,
        };
        assert_eq!(
            e.to_string(),
            "replacement for position 2 reads from 7, but the source has length 3"
        );
    }
}
