//! Per-vertex Pareto fronts.

use crate::error::Result;
use crate::objective::ObjectiveVector;

/// Default bound on the number of vectors a single front may hold.
pub const MAX_FRONT: usize = 100;

/// Outcome of offering a candidate to a front.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion {
    Inserted,
    /// The front was full. The candidate may well have been non-dominated.
    AtCapacity,
    Duplicate,
    Dominated,
}

impl Insertion {
    pub fn changed(&self) -> bool {
        matches!(self, Insertion::Inserted)
    }
}

/// A bounded set of mutually non-dominated objective vectors.
///
/// Members are kept in insertion order (with dominated members removed), so
/// two runs that offer the same candidates in the same order produce the same
/// front.
#[derive(Clone, Debug)]
pub struct ParetoFront {
    members: Vec<ObjectiveVector>,
    capacity: usize,
}

impl ParetoFront {
    pub fn new(capacity: usize) -> ParetoFront {
        ParetoFront {
            members: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn members(&self) -> &[ObjectiveVector] {
        &self.members
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObjectiveVector> {
        self.members.iter()
    }

    /// Offer `candidate` to the front, returning true iff the front changed.
    pub fn insert(&mut self, candidate: ObjectiveVector) -> Result<bool> {
        Ok(self.try_insert(candidate)?.changed())
    }

    /// Offer `candidate` to the front and report why it was or wasn't kept.
    ///
    /// The capacity check runs first, then the duplicate check. Members the
    /// candidate dominates are removed before testing whether a survivor
    /// dominates the candidate.
    pub fn try_insert(&mut self, candidate: ObjectiveVector) -> Result<Insertion> {
        if let Some(first) = self.members.first() {
            first.dimension_matches(&candidate, "pareto front insertion")?;
        }
        if self.members.len() >= self.capacity {
            return Ok(Insertion::AtCapacity);
        }
        if self.members.iter().any(|m| *m == candidate) {
            return Ok(Insertion::Duplicate);
        }
        self.members.retain(|m| !candidate.dominates_unchecked(m));
        if self.members.iter().any(|m| m.dominates_unchecked(&candidate)) {
            return Ok(Insertion::Dominated);
        }
        self.members.push(candidate);
        Ok(Insertion::Inserted)
    }

    /// Offer a clamped sum (see [`ObjectiveVector::saturating_add`]) that
    /// cannot be stored. Returns the outcome if the front would turn the true
    /// sum away anyway, or `None` if the true sum belongs in the front.
    pub fn reject_saturated(&self, candidate: &ObjectiveVector) -> Result<Option<Insertion>> {
        if let Some(first) = self.members.first() {
            first.dimension_matches(candidate, "pareto front insertion")?;
        }
        if self.members.len() >= self.capacity {
            return Ok(Some(Insertion::AtCapacity));
        }
        let covered = self
            .members
            .iter()
            .any(|m| m == candidate || m.dominates_unchecked(candidate));
        Ok(covered.then_some(Insertion::Dominated))
    }

    /// Members in lexicographic order, for deterministic output.
    pub fn sorted(&self) -> Vec<ObjectiveVector> {
        let mut members = self.members.clone();
        members.sort_unstable_by(|a, b| a.as_slice().cmp(b.as_slice()));
        members
    }
}
