//! Run-wide counters, reduced across ranks once relaxation has finished.

use std::time::Duration;

use crate::comm::Collective;
use crate::graph::store::PartitionStore;
use crate::relax::{RelaxOutcome, Termination};

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunMetrics {
    pub num_ranks: usize,
    pub iterations: usize,
    pub termination: Termination,
    pub local_insertions: u64,
    pub global_insertions: u64,
    pub local_capacity_rejections: u64,
    pub global_capacity_rejections: u64,
    pub discarded: u64,
    pub exchanged: u64,
    /// overflowing candidates that were already dominated at their target
    pub saturated: u64,
    pub local_elapsed_secs: f64,
    /// slowest rank's relaxation time
    pub max_elapsed_secs: f64,
    /// vectors held across every rank's final fronts
    pub global_front_entries: u64,
    pub mflops: f64,
    pub vertices_owned: usize,
    pub global_vertices: u64,
}

impl RunMetrics {
    /// Collective: every rank must call this with its own outcome.
    pub fn gather<C: Collective>(
        comm: &C,
        store: &PartitionStore,
        outcome: &RelaxOutcome,
    ) -> RunMetrics {
        let local_nanos = outcome.elapsed.as_nanos().min(u64::MAX as u128) as u64;
        let max_nanos = comm.max(&[local_nanos])[0];
        let sums = comm.sum(&[store.front_entries() as u64, store.num_local() as u64]);
        let max_elapsed = Duration::from_nanos(max_nanos).as_secs_f64();

        RunMetrics {
            num_ranks: comm.num_ranks(),
            iterations: outcome.iterations,
            termination: outcome.termination,
            local_insertions: outcome.local.insertions,
            global_insertions: outcome.global.insertions,
            local_capacity_rejections: outcome.local.capacity_rejections,
            global_capacity_rejections: outcome.global.capacity_rejections,
            discarded: outcome.global.discarded,
            exchanged: outcome.global.exchanged,
            saturated: outcome.global.saturated,
            local_elapsed_secs: outcome.elapsed.as_secs_f64(),
            max_elapsed_secs: max_elapsed,
            global_front_entries: sums[0],
            mflops: mflops(sums[0], max_elapsed),
            vertices_owned: store.num_local(),
            global_vertices: sums[1],
        }
    }

    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Front entries per microsecond; zero when no time was measured.
pub fn mflops(entries: u64, secs: f64) -> f64 {
    if secs > 0.0 {
        entries as f64 / (1e6 * secs)
    } else {
        0.0
    }
}
