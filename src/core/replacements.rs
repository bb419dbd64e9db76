use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::{error::ReparamError, DVector, Float};

/// Copy rules which fill positions of the external vector without going through a kernel.
///
/// Entry `p` holds `Some(s)` when position `p` must be overwritten with the value at position
/// `s` of the source vector, and [`None`] when position `p` has no replacement. Pre-replacements
/// read from the internal vector before any kernel runs; post-replacements read from the
/// external vector after every kernel has run.
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacements(Vec<Option<usize>>);

impl Replacements {
    /// A set of rules of length `len` which replaces nothing.
    pub fn none(len: usize) -> Self {
        Self(vec![None; len])
    }
    /// Converts the sentinel encoding used by index arrays, where a negative entry means "no
    /// replacement at this position".
    pub fn from_sentinels(values: &[i64]) -> Self {
        Self(
            values
                .iter()
                .map(|v| usize::try_from(*v).ok())
                .collect(),
        )
    }
    /// Returns the inner vector of rules.
    pub fn into_inner(self) -> Vec<Option<usize>> {
        self.0
    }
    /// Iterates over every `(target, source)` pair.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(target, source)| source.map(|s| (target, s)))
    }
    /// Checks that every source lies inside a vector of length `source_len`.
    ///
    /// # Errors
    ///
    /// Returns [`ReparamError::InvalidReplacementIndex`] for the first out-of-range source.
    pub fn validate(&self, source_len: usize) -> Result<(), ReparamError> {
        match self.pairs().find(|(_, s)| *s >= source_len) {
            Some((target, from)) => Err(ReparamError::InvalidReplacementIndex {
                target,
                from,
                len: source_len,
            }),
            None => Ok(()),
        }
    }
    /// Writes `source[s]` into `target[t]` for every rule. All sources are read before any
    /// target is written, so a rule never observes a value written by another rule of the same
    /// pass.
    ///
    /// # Errors
    ///
    /// Returns [`ReparamError::InvalidReplacementIndex`] if a source is out of range and
    /// [`ReparamError::DimensionMismatch`] if the rules do not cover `target`.
    pub(crate) fn apply(
        &self,
        source: &DVector<Float>,
        target: &mut DVector<Float>,
    ) -> Result<(), ReparamError> {
        if self.0.len() != target.len() {
            return Err(ReparamError::DimensionMismatch {
                what: "replacements",
                expected: target.len(),
                found: self.0.len(),
            });
        }
        self.validate(source.len())?;
        let values: Vec<(usize, Float)> = self.pairs().map(|(t, s)| (t, source[s])).collect();
        for (t, v) in values {
            target[t] = v;
        }
        Ok(())
    }
}

impl From<Vec<Option<usize>>> for Replacements {
    fn from(value: Vec<Option<usize>>) -> Self {
        Self(value)
    }
}

impl Deref for Replacements {
    type Target = Vec<Option<usize>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
