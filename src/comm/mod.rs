//! Collective operations between cooperating ranks.
//!
//! The relaxation rounds only ever talk to other ranks through
//! [`Collective`]. [`world::WorldComm`] implements it on a Lamellar world
//! with active messages; [`local::LocalGroup`] implements it between threads
//! of one process, which is how multi-rank runs are tested.

pub mod local;
pub mod world;

use crate::graph::VertexId;
use crate::objective::ObjectiveVector;

/// A candidate vector addressed to the rank that owns `target`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Delivery {
    pub target: VertexId,
    pub objectives: ObjectiveVector,
    /// `objectives` is a clamped sum; the owner may only drop it
    pub saturated: bool,
}

/// Whether this rank reports run-wide results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Worker,
}

impl Role {
    pub fn is_coordinator(&self) -> bool {
        matches!(self, Role::Coordinator)
    }
}

/// Every method is collective: all ranks must call it, in the same order,
/// before any of them returns.
pub trait Collective: Sync {
    fn rank(&self) -> usize;

    fn num_ranks(&self) -> usize;

    fn barrier(&self);

    /// Every rank's `values`, indexed by rank.
    fn all_gather(&self, values: &[u64]) -> Vec<Vec<u64>>;

    /// `root` supplies `Some(payload)`, everyone receives a copy.
    fn broadcast(&self, root: usize, payload: Option<Vec<u8>>) -> Vec<u8>;

    /// `outgoing[r]` is sent to rank `r`; returns what other ranks sent here.
    fn exchange(&self, outgoing: Vec<Vec<Delivery>>) -> Vec<Delivery>;

    /// Element-wise sum across ranks.
    fn sum(&self, values: &[u64]) -> Vec<u64> {
        fold(self.all_gather(values), values.len(), |a, b| a + b)
    }

    /// Element-wise maximum across ranks.
    fn max(&self, values: &[u64]) -> Vec<u64> {
        fold(self.all_gather(values), values.len(), |a, b| a.max(b))
    }

    /// Logical OR across ranks.
    fn any(&self, flag: bool) -> bool {
        self.sum(&[flag as u64])[0] > 0
    }
}

fn fold(gathered: Vec<Vec<u64>>, len: usize, op: impl Fn(u64, u64) -> u64) -> Vec<u64> {
    let mut acc = vec![0; len];
    for values in gathered {
        for (a, v) in acc.iter_mut().zip(values) {
            *a = op(*a, v);
        }
    }
    acc
}

/// Bucket deliveries by the rank owning each target.
pub fn route(
    deliveries: impl IntoIterator<Item = Delivery>,
    num_ranks: usize,
    owner: impl Fn(VertexId) -> usize,
) -> Vec<Vec<Delivery>> {
    let mut outgoing = vec![Vec::new(); num_ranks];
    for delivery in deliveries {
        outgoing[owner(delivery.target)].push(delivery);
    }
    outgoing
}
