use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::ReparamError,
    kernels::{covariance, linear, probability, sdcorr},
    Float,
};

/// The family of feasible-set shape a [`Constraint`] imposes on its slice of the external
/// vector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    /// Values satisfying a weighted linear equality.
    Linear,
    /// Non-negative values summing to one.
    Probability,
    /// The lower triangle of a symmetric positive-definite matrix.
    Covariance,
    /// Standard deviations followed by correlations.
    Sdcorr,
}

impl ConstraintKind {
    /// The name used for this kind in serialized constraint records.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Probability => "probability",
            Self::Covariance => "covariance",
            Self::Sdcorr => "sdcorr",
        }
    }
}

impl Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ConstraintKind {
    type Err = ReparamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "probability" => Ok(Self::Probability),
            "covariance" => Ok(Self::Covariance),
            "sdcorr" => Ok(Self::Sdcorr),
            other => Err(ReparamError::UnknownConstraintKind(other.to_string())),
        }
    }
}

/// A processed constraint on a set of positions of the external parameter vector.
///
/// Index sets of different constraints must not overlap. Each variant maps to exactly one pair
/// of kernels in [`kernels`](crate::kernels), so adding a kind without both directions fails to
/// compile.
///
/// In serialized form a constraint is a record tagged by `"type"`:
///
/// ```json
/// {"type": "linear", "index": [0, 1], "weights": [1.0, 1.0], "value": 10.0}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConstraint", into = "RawConstraint")]
pub enum Constraint {
    /// `sum(weights[k] * x[index[k]]) == value`
    Linear {
        /// Positions governed by the constraint.
        index: Vec<usize>,
        /// One weight per position.
        weights: Vec<Float>,
        /// The right-hand side of the equality.
        value: Float,
    },
    /// `x[index]` lies on the probability simplex.
    Probability {
        /// Positions governed by the constraint.
        index: Vec<usize>,
    },
    /// `x[index]` is the lower triangle, row by row, of a covariance matrix.
    Covariance {
        /// Positions governed by the constraint, `d(d+1)/2` of them.
        index: Vec<usize>,
    },
    /// `x[index]` holds `d` standard deviations followed by the `d(d-1)/2` strictly-lower
    /// correlations, row by row.
    Sdcorr {
        /// Positions governed by the constraint, `d(d+1)/2` of them.
        index: Vec<usize>,
    },
}

impl Constraint {
    /// The [`ConstraintKind`] of this constraint.
    pub const fn kind(&self) -> ConstraintKind {
        match self {
            Self::Linear { .. } => ConstraintKind::Linear,
            Self::Probability { .. } => ConstraintKind::Probability,
            Self::Covariance { .. } => ConstraintKind::Covariance,
            Self::Sdcorr { .. } => ConstraintKind::Sdcorr,
        }
    }

    /// The positions of the external vector governed by this constraint.
    pub fn index(&self) -> &[usize] {
        match self {
            Self::Linear { index, .. }
            | Self::Probability { index }
            | Self::Covariance { index }
            | Self::Sdcorr { index } => index,
        }
    }

    /// Checks that the constraint is well-formed on its own (non-empty, no repeated positions,
    /// sizes the kernel can work with).
    ///
    /// # Errors
    ///
    /// Returns [`ReparamError::InvalidConstraint`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ReparamError> {
        let index = self.index();
        if index.is_empty() {
            return Err(ReparamError::invalid(self.kind(), "index is empty"));
        }
        let mut sorted = index.to_vec();
        sorted.sort_unstable();
        if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(ReparamError::invalid(
                self.kind(),
                format!("position {} appears more than once", w[0]),
            ));
        }
        match self {
            Self::Linear { weights, value, .. } => {
                if weights.len() != index.len() {
                    return Err(ReparamError::invalid(
                        self.kind(),
                        format!(
                            "{} weights given for {} parameters",
                            weights.len(),
                            index.len()
                        ),
                    ));
                }
                if !value.is_finite() || weights.iter().any(|w| !w.is_finite()) {
                    return Err(ReparamError::invalid(
                        self.kind(),
                        "weights and value must be finite",
                    ));
                }
                linear::free_slots(weights).map(|_| ())
            }
            Self::Probability { .. } => Ok(()),
            Self::Covariance { .. } => covariance::dimension(index.len()).map(|_| ()),
            Self::Sdcorr { .. } => sdcorr::dimension(index.len()).map(|_| ()),
        }
    }

    /// Marks, per position of [`Constraint::index`], whether the internal value at that
    /// position is a free parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ReparamError::InvalidConstraint`] if the constraint is malformed.
    pub fn free_slots(&self) -> Result<Vec<bool>, ReparamError> {
        self.validate()?;
        Ok(match self {
            Self::Linear { weights, .. } => linear::free_slots(weights)?,
            Self::Probability { index } => probability::free_slots(index.len()),
            Self::Covariance { index } | Self::Sdcorr { index } => vec![true; index.len()],
        })
    }

    /// Applies this constraint's `to_internal` kernel to the external values at
    /// [`Constraint::index`]. `tolerance` enables the linear and probability feasibility checks.
    ///
    /// # Errors
    ///
    /// Returns [`ReparamError::InfeasibleInput`] if the values violate the constraint and
    /// [`ReparamError::InvalidConstraint`] if the constraint itself is malformed.
    pub fn to_internal(
        &self,
        external: &[Float],
        tolerance: Option<Float>,
    ) -> Result<Vec<Float>, ReparamError> {
        match self {
            Self::Linear { weights, value, .. } => {
                linear::to_internal(external, weights, *value, tolerance)
            }
            Self::Probability { .. } => probability::to_internal(external, tolerance),
            Self::Covariance { .. } => covariance::to_internal(external),
            Self::Sdcorr { .. } => sdcorr::to_internal(external),
        }
    }

    /// Applies this constraint's `from_internal` kernel to the internal values at
    /// [`Constraint::index`].
    ///
    /// # Errors
    ///
    /// Returns [`ReparamError::InvalidConstraint`] if the constraint is malformed.
    pub fn from_internal(&self, internal: &[Float]) -> Result<Vec<Float>, ReparamError> {
        match self {
            Self::Linear { weights, value, .. } => linear::from_internal(internal, weights, *value),
            Self::Probability { .. } => probability::from_internal(internal),
            Self::Covariance { .. } => covariance::from_internal(internal),
            Self::Sdcorr { .. } => sdcorr::from_internal(internal),
        }
    }
}

/// The flat record shape constraints take on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawConstraint {
    #[serde(rename = "type")]
    kind: String,
    index: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weights: Option<Vec<Float>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Float>,
}

impl TryFrom<RawConstraint> for Constraint {
    type Error = ReparamError;

    fn try_from(raw: RawConstraint) -> Result<Self, Self::Error> {
        let kind: ConstraintKind = raw.kind.parse()?;
        let index = raw.index;
        Ok(match kind {
            ConstraintKind::Linear => {
                let (weights, value) = raw.weights.zip(raw.value).ok_or_else(|| {
                    ReparamError::invalid(kind, "linear constraints need weights and a value")
                })?;
                Self::Linear {
                    index,
                    weights,
                    value,
                }
            }
            ConstraintKind::Probability => Self::Probability { index },
            ConstraintKind::Covariance => Self::Covariance { index },
            ConstraintKind::Sdcorr => Self::Sdcorr { index },
        })
    }
}

impl From<Constraint> for RawConstraint {
    fn from(constraint: Constraint) -> Self {
        let kind = constraint.kind().name().to_string();
        match constraint {
            Constraint::Linear {
                index,
                weights,
                value,
            } => Self {
                kind,
                index,
                weights: Some(weights),
                value: Some(value),
            },
            Constraint::Probability { index }
            | Constraint::Covariance { index }
            | Constraint::Sdcorr { index } => Self {
                kind,
                index,
                weights: None,
                value: None,
            },
        }
    }
}
