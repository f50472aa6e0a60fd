//! Objective vectors and the dominance order over them.

use std::fmt;

use crate::error::{MospError, Result};

/// Accumulated cost of a path under k simultaneous criteria.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ObjectiveVector(Vec<u64>);

impl ObjectiveVector {
    pub fn new(objectives: Vec<u64>) -> ObjectiveVector {
        ObjectiveVector(objectives)
    }

    /// The seed placed on the source vertex.
    pub fn zero(dimension: usize) -> ObjectiveVector {
        ObjectiveVector(vec![0; dimension])
    }

    /// Weight given to edges that carry no explicit weights.
    pub fn unit(dimension: usize) -> ObjectiveVector {
        ObjectiveVector(vec![1; dimension])
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u64> {
        self.0
    }

    pub(crate) fn dimension_matches(&self, other: &ObjectiveVector, context: &str) -> Result<()> {
        if self.0.len() != other.0.len() {
            return Err(MospError::Dimension {
                expected: self.0.len(),
                found: other.0.len(),
                context: context.to_string(),
            });
        }
        Ok(())
    }

    /// `self` dominates `other` iff it is no worse in every coordinate and
    /// strictly better in at least one. A vector never dominates itself.
    pub fn dominates(&self, other: &ObjectiveVector) -> Result<bool> {
        self.dimension_matches(other, "dominance test")?;
        Ok(self.dominates_unchecked(other))
    }

    pub fn equals(&self, other: &ObjectiveVector) -> Result<bool> {
        self.dimension_matches(other, "equality test")?;
        Ok(self.0 == other.0)
    }

    // callers guarantee equal lengths
    pub(crate) fn dominates_unchecked(&self, other: &ObjectiveVector) -> bool {
        let mut strictly_better = false;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            if a > b {
                return false;
            }
            if a < b {
                strictly_better = true;
            }
        }
        strictly_better
    }

    /// Coordinate-wise sum, the cost of extending a path by one edge.
    ///
    /// Coordinates that overflow are clamped to `u64::MAX` and the flag is
    /// set. A clamped sum is no greater than the true one in any coordinate
    /// and strictly smaller in at least one, so anything that dominates or
    /// equals it also dominates the true sum.
    pub fn saturating_add(&self, weights: &ObjectiveVector) -> Result<(ObjectiveVector, bool)> {
        self.dimension_matches(weights, "edge relaxation")?;
        let mut saturated = false;
        let sum = self
            .0
            .iter()
            .zip(weights.0.iter())
            .map(|(a, w)| {
                a.checked_add(*w).unwrap_or_else(|| {
                    saturated = true;
                    u64::MAX
                })
            })
            .collect();
        Ok((ObjectiveVector(sum), saturated))
    }
}

impl From<Vec<u64>> for ObjectiveVector {
    fn from(objectives: Vec<u64>) -> Self {
        ObjectiveVector(objectives)
    }
}

impl fmt::Display for ObjectiveVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")
    }
}
