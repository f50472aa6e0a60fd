//! Synchronous rounds of multi-objective relaxation over one partition.
//!
//! Each round every owned vertex relaxes its outgoing edges using the front
//! it held when the round started, inserting candidates into the fronts of
//! locally owned targets. Candidates for vertices owned elsewhere are either
//! dropped or shipped to their owner, depending on [`CutEdgePolicy`]. The
//! round ends with one collective reduction that decides, identically on
//! every rank, whether anyone still made progress.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::comm::{route, Collective, Delivery, Role};
use crate::error::{MospError, Result};
use crate::front::{Insertion, ParetoFront};
use crate::graph::store::{LocalVertex, PartitionStore};
use crate::graph::VertexId;
use crate::objective::ObjectiveVector;

/// Default bound on the number of rounds.
pub const MAX_ITER: usize = 100;

/// What to do with a candidate whose target lives on another rank.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CutEdgePolicy {
    /// drop it; fronts only see paths that stay inside one partition
    #[default]
    Discard,
    /// send it to the owning rank before the round's reduction
    Exchange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Termination {
    Converged,
    MaxIterReached,
}

#[derive(Clone, Debug)]
pub struct RelaxConfig {
    pub max_iterations: usize,
    /// rayon worker threads; 0 lets rayon decide
    pub threads: usize,
    pub cut_edges: CutEdgePolicy,
}

impl Default for RelaxConfig {
    fn default() -> Self {
        RelaxConfig {
            max_iterations: MAX_ITER,
            threads: 0,
            cut_edges: CutEdgePolicy::Discard,
        }
    }
}

/// Counters for one rank, accumulated over a round or a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub insertions: u64,
    pub capacity_rejections: u64,
    pub discarded: u64,
    /// overflowing candidates dropped because the target already covered them
    pub saturated: u64,
    /// candidates shipped to other ranks
    pub exchanged: u64,
}

impl Tally {
    fn add(&mut self, other: &Tally) {
        self.insertions += other.insertions;
        self.capacity_rejections += other.capacity_rejections;
        self.discarded += other.discarded;
        self.saturated += other.saturated;
        self.exchanged += other.exchanged;
    }
}

#[derive(Debug)]
pub struct RelaxOutcome {
    pub iterations: usize,
    pub termination: Termination,
    pub local: Tally,
    pub global: Tally,
    pub elapsed: Duration,
}

// Result of one rank's share of a round.
#[derive(Default)]
struct Pass {
    tally: Tally,
    updated: bool,
    outgoing: Vec<Delivery>,
    failed: u64,
    error: Option<MospError>,
}

impl Pass {
    fn record(&mut self, result: Result<Insertion>) {
        match result {
            Ok(Insertion::Inserted) => {
                self.updated = true;
                self.tally.insertions += 1;
            }
            Ok(Insertion::AtCapacity) => self.tally.capacity_rejections += 1,
            Ok(Insertion::Duplicate) | Ok(Insertion::Dominated) => {}
            Err(e) => self.fail(e),
        }
    }

    /// Offer a candidate to a locally owned front. A saturated candidate is
    /// never stored.
    fn offer(
        &mut self,
        front: &Mutex<ParetoFront>,
        target: VertexId,
        candidate: ObjectiveVector,
        saturated: bool,
    ) {
        let mut front = front.lock();
        if !saturated {
            self.record(front.try_insert(candidate));
            return;
        }
        match front.reject_saturated(&candidate) {
            Ok(Some(Insertion::Dominated)) => self.tally.saturated += 1,
            Ok(Some(outcome)) => self.record(Ok(outcome)),
            Ok(None) => self.fail(MospError::Overflow { target }),
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: MospError) {
        self.failed += 1;
        self.error.get_or_insert(error);
    }

    fn merge(mut self, other: Pass) -> Pass {
        self.tally.add(&other.tally);
        self.updated |= other.updated;
        self.outgoing.extend(other.outgoing);
        self.failed += other.failed;
        if self.error.is_none() {
            self.error = other.error;
        }
        self
    }
}

// Layout of the per-round reduction vector.
const UPDATED: usize = 0;
const INSERTIONS: usize = 1;
const CAPACITY: usize = 2;
const DISCARDED: usize = 3;
const SATURATED: usize = 4;
const EXCHANGED: usize = 5;
const FAILED: usize = 6;

pub struct Coordinator<'a, C: Collective> {
    store: &'a PartitionStore,
    comm: &'a C,
    role: Role,
    config: RelaxConfig,
    pool: rayon::ThreadPool,
}

impl<'a, C: Collective> Coordinator<'a, C> {
    pub fn new(
        store: &'a PartitionStore,
        comm: &'a C,
        role: Role,
        config: RelaxConfig,
    ) -> Result<Coordinator<'a, C>> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if config.threads != 0 {
            builder = builder.num_threads(config.threads);
        }
        let pool = builder.build()?;
        Ok(Coordinator {
            store,
            comm,
            role,
            config,
            pool,
        })
    }

    /// Collective: run rounds until no rank updates a front or the round
    /// limit is hit. Every rank returns the same termination and iteration
    /// count, or every rank returns an error.
    pub fn run(&self) -> Result<RelaxOutcome> {
        let start = Instant::now();
        let mut local = Tally::default();
        let mut global = Tally::default();
        let mut termination = Termination::MaxIterReached;
        let mut iterations = 0;
        // fronts as of the previous round; their cut-edge candidates are already out
        let mut previous = vec![Vec::new(); self.store.num_local()];

        while iterations < self.config.max_iterations {
            iterations += 1;
            let snapshot = self.store.snapshot();
            let mut pass = self.local_pass(&snapshot, &previous);
            if self.config.cut_edges == CutEdgePolicy::Exchange {
                pass.tally.exchanged = pass.outgoing.len() as u64;
                let received = self.comm.exchange(route(
                    std::mem::take(&mut pass.outgoing),
                    self.comm.num_ranks(),
                    |v| self.store.owner(v),
                ));
                pass = pass.merge(self.deliver(received));
            }
            previous = snapshot;

            let totals = self.comm.sum(&[
                pass.updated as u64,
                pass.tally.insertions,
                pass.tally.capacity_rejections,
                pass.tally.discarded,
                pass.tally.saturated,
                pass.tally.exchanged,
                pass.failed,
            ]);
            if totals[FAILED] > 0 {
                return Err(pass.error.unwrap_or(MospError::RemoteRound {
                    iteration: iterations,
                    failed: totals[FAILED],
                }));
            }
            local.add(&pass.tally);
            global.add(&Tally {
                insertions: totals[INSERTIONS],
                capacity_rejections: totals[CAPACITY],
                discarded: totals[DISCARDED],
                saturated: totals[SATURATED],
                exchanged: totals[EXCHANGED],
            });
            debug!(
                rank = self.comm.rank(),
                iteration = iterations,
                updated = pass.updated,
                insertions = pass.tally.insertions,
                "local pass"
            );
            if self.role.is_coordinator() {
                info!(
                    iteration = iterations,
                    active_ranks = totals[UPDATED],
                    insertions = totals[INSERTIONS],
                    capacity_rejections = totals[CAPACITY],
                    discarded = totals[DISCARDED],
                    exchanged = totals[EXCHANGED],
                    "round complete"
                );
            }
            self.comm.barrier();

            if totals[UPDATED] == 0 {
                termination = Termination::Converged;
                break;
            }
        }

        if self.role.is_coordinator() {
            if termination == Termination::MaxIterReached {
                warn!(
                    max_iterations = self.config.max_iterations,
                    "no convergence within the round limit"
                );
            }
            if global.capacity_rejections > 0 {
                warn!(
                    rejections = global.capacity_rejections,
                    capacity = self.store.front_capacity(),
                    "fronts hit capacity; results may be incomplete"
                );
            }
            if global.saturated > 0 {
                debug!(dropped = global.saturated, "overflowing candidates were dominated");
            }
        }
        Ok(RelaxOutcome {
            iterations,
            termination,
            local,
            global,
            elapsed: start.elapsed(),
        })
    }

    /// Relax every owned vertex against `snapshot`, taken at round start.
    fn local_pass(
        &self,
        snapshot: &[Vec<ObjectiveVector>],
        previous: &[Vec<ObjectiveVector>],
    ) -> Pass {
        self.pool.install(|| {
            self.store
                .vertices()
                .par_iter()
                .zip(snapshot.par_iter())
                .zip(previous.par_iter())
                .map(|((vertex, front), previous)| self.relax_vertex(vertex, front, previous))
                .reduce(Pass::default, Pass::merge)
        })
    }

    fn relax_vertex(
        &self,
        vertex: &LocalVertex,
        front: &[ObjectiveVector],
        previous: &[ObjectiveVector],
    ) -> Pass {
        let mut pass = Pass::default();
        let exchange = self.config.cut_edges == CutEdgePolicy::Exchange;
        for edge in &vertex.edges {
            let target = self.store.local_id(edge.target);
            for vector in front {
                if target.is_none() && exchange && previous.contains(vector) {
                    continue;
                }
                let (candidate, saturated) = match vector.saturating_add(&edge.weights) {
                    Ok(sum) => sum,
                    Err(e) => {
                        pass.fail(e);
                        continue;
                    }
                };
                match target {
                    Some(lid) => {
                        pass.offer(self.store.front(lid), edge.target, candidate, saturated)
                    }
                    None if exchange => pass.outgoing.push(Delivery {
                        target: edge.target,
                        objectives: candidate,
                        saturated,
                    }),
                    None => pass.tally.discarded += 1,
                }
            }
        }
        pass
    }

    /// Insert candidates other ranks computed for our vertices.
    fn deliver(&self, received: Vec<Delivery>) -> Pass {
        self.pool.install(|| {
            received
                .into_par_iter()
                .map(|delivery| {
                    let mut pass = Pass::default();
                    match self.store.local_id(delivery.target) {
                        Some(lid) => pass.offer(
                            self.store.front(lid),
                            delivery.target,
                            delivery.objectives,
                            delivery.saturated,
                        ),
                        None => pass.fail(MospError::Misrouted {
                            vertex: delivery.target,
                            rank: self.comm.rank(),
                        }),
                    }
                    pass
                })
                .reduce(Pass::default, Pass::merge)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::local::{LocalComm, LocalGroup};
    use crate::front::MAX_FRONT;
    use crate::graph::tests::graph_from;
    use crate::graph::Graph;
    use crate::partition::OwnerMap;

    fn ov(v: &[u64]) -> ObjectiveVector {
        ObjectiveVector::new(v.to_vec())
    }

    fn relax(
        comm: &LocalComm,
        graph: &Graph,
        owners: &OwnerMap,
        source: VertexId,
        config: RelaxConfig,
    ) -> Result<(RelaxOutcome, Vec<(VertexId, Vec<ObjectiveVector>)>)> {
        let store = PartitionStore::build(
            graph,
            owners.clone(),
            comm.rank(),
            comm.num_ranks(),
            source,
            MAX_FRONT,
        )?;
        let role = if comm.rank() == 0 { Role::Coordinator } else { Role::Worker };
        let outcome = Coordinator::new(&store, comm, role, config)?.run()?;
        Ok((outcome, store.final_fronts()))
    }

    #[test]
    fn path_converges_with_summed_weights() {
        let g = graph_from(3, &[(0, 1, &[1, 2]), (1, 2, &[2, 1])]);
        let owners = OwnerMap::single(3);
        let (outcome, fronts) = LocalGroup::run(1, |comm| {
            relax(&comm, &g, &owners, 0, RelaxConfig::default()).unwrap()
        })
        .remove(0);
        assert_eq!(outcome.termination, Termination::Converged);
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.local.insertions, 2);
        assert_eq!(outcome.global.insertions, 2);
        assert_eq!(
            fronts,
            vec![(0, vec![ov(&[0, 0])]), (1, vec![ov(&[1, 2])]), (2, vec![ov(&[3, 3])])]
        );
    }

    #[test]
    fn parallel_edges_keep_incomparable_vectors() {
        let g = graph_from(2, &[(0, 1, &[1, 5]), (0, 1, &[5, 1]), (0, 1, &[3, 3])]);
        let owners = OwnerMap::single(2);
        let (_, fronts) = LocalGroup::run(1, |comm| {
            relax(&comm, &g, &owners, 0, RelaxConfig::default()).unwrap()
        })
        .remove(0);
        assert_eq!(fronts[1].1, vec![ov(&[1, 5]), ov(&[3, 3]), ov(&[5, 1])]);
    }

    #[test]
    fn round_limit_is_reported() {
        let g = graph_from(4, &[(0, 1, &[1, 1]), (1, 2, &[1, 1]), (2, 3, &[1, 1])]);
        let owners = OwnerMap::single(4);
        let config = RelaxConfig {
            max_iterations: 2,
            ..RelaxConfig::default()
        };
        let (outcome, fronts) = LocalGroup::run(1, |comm| {
            relax(&comm, &g, &owners, 0, config.clone()).unwrap()
        })
        .remove(0);
        assert_eq!(outcome.termination, Termination::MaxIterReached);
        assert_eq!(outcome.iterations, 2);
        assert!(fronts[3].1.is_empty());
    }

    #[test]
    fn zero_round_limit_relaxes_nothing() {
        let g = graph_from(2, &[(0, 1, &[1, 1])]);
        let owners = OwnerMap::single(2);
        let config = RelaxConfig {
            max_iterations: 0,
            ..RelaxConfig::default()
        };
        let (outcome, fronts) = LocalGroup::run(1, |comm| {
            relax(&comm, &g, &owners, 0, config.clone()).unwrap()
        })
        .remove(0);
        assert_eq!(outcome.termination, Termination::MaxIterReached);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.global, Tally::default());
        assert_eq!(fronts, vec![(0, vec![ov(&[0, 0])]), (1, vec![])]);
    }

    #[test]
    fn discard_counts_cut_candidates() {
        let g = graph_from(3, &[(0, 1, &[1, 1]), (1, 2, &[1, 1])]);
        let owners = OwnerMap::new(vec![0, 0, 1]);
        let results = LocalGroup::run(2, |comm| {
            relax(&comm, &g, &owners, 0, RelaxConfig::default()).unwrap()
        });
        for (outcome, _) in &results {
            assert_eq!(outcome.termination, Termination::Converged);
            assert_eq!(outcome.iterations, results[0].0.iterations);
            assert_eq!(outcome.global.insertions, 1);
            assert!(outcome.global.discarded > 0);
        }
        assert!(results[1].1[0].1.is_empty());
    }

    #[test]
    fn exchange_reaches_remote_vertices() {
        let g = graph_from(3, &[(0, 1, &[1, 1]), (1, 2, &[1, 1])]);
        let owners = OwnerMap::new(vec![0, 0, 1]);
        let config = RelaxConfig {
            cut_edges: CutEdgePolicy::Exchange,
            ..RelaxConfig::default()
        };
        let results =
            LocalGroup::run(2, |comm| relax(&comm, &g, &owners, 0, config.clone()).unwrap());
        assert_eq!(results[1].1, vec![(2, vec![ov(&[2, 2])])]);
        assert_eq!(results[0].0.global.insertions, 2);
        assert_eq!(results[0].0.global.discarded, 0);
    }

    #[test]
    fn overflow_into_an_open_front_is_an_error() {
        let g = graph_from(3, &[(0, 1, &[u64::MAX, 1]), (1, 2, &[1, 1])]);
        let owners = OwnerMap::single(3);
        let results = LocalGroup::run(1, |comm| {
            relax(&comm, &g, &owners, 0, RelaxConfig::default()).map(|_| ())
        });
        assert!(matches!(results[0], Err(MospError::Overflow { target: 2 })));
    }

    #[test]
    fn overflow_stops_every_rank() {
        let g = graph_from(3, &[(0, 1, &[u64::MAX, 1]), (1, 2, &[1, 1])]);
        let owners = OwnerMap::new(vec![0, 0, 1]);
        let config = RelaxConfig {
            cut_edges: CutEdgePolicy::Exchange,
            ..RelaxConfig::default()
        };
        let results = LocalGroup::run(2, |comm| {
            relax(&comm, &g, &owners, 0, config.clone()).map(|_| ())
        });
        assert!(matches!(
            results[0],
            Err(MospError::RemoteRound {
                iteration: 2,
                failed: 1
            })
        ));
        assert!(matches!(results[1], Err(MospError::Overflow { target: 2 })));
    }

    #[test]
    fn dominated_overflow_is_dropped() {
        let half = 1u64 << 63;
        let g = graph_from(2, &[(0, 1, &[half, 0]), (1, 0, &[half, 0])]);
        let expected = vec![(0, vec![ov(&[0, 0])]), (1, vec![ov(&[half, 0])])];

        let owners = OwnerMap::single(2);
        let (outcome, fronts) = LocalGroup::run(1, |comm| {
            relax(&comm, &g, &owners, 0, RelaxConfig::default()).unwrap()
        })
        .remove(0);
        assert_eq!(outcome.termination, Termination::Converged);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.global.saturated, 1);
        assert_eq!(fronts, expected);

        let owners = OwnerMap::new(vec![0, 1]);
        let config = RelaxConfig {
            cut_edges: CutEdgePolicy::Exchange,
            ..RelaxConfig::default()
        };
        let results = LocalGroup::run(2, |comm| {
            relax(&comm, &g, &owners, 0, config.clone()).unwrap()
        });
        assert_eq!(results[0].0.termination, Termination::Converged);
        assert_eq!(results[0].0.global.saturated, 1);
        assert_eq!(results[0].1, expected[..1].to_vec());
        assert_eq!(results[1].1, expected[1..].to_vec());
    }

    #[test]
    fn exchange_ships_each_vector_once() {
        // vertex 1 keeps its front for several rounds while 3 -> 4 -> 5 settle
        let g = graph_from(
            6,
            &[(0, 1, &[1, 1]), (1, 2, &[1, 1]), (0, 3, &[1, 1]), (3, 4, &[1, 1]), (4, 5, &[1, 1])],
        );
        let owners = OwnerMap::new(vec![0, 0, 1, 0, 0, 0]);
        let config = RelaxConfig {
            cut_edges: CutEdgePolicy::Exchange,
            ..RelaxConfig::default()
        };
        let results = LocalGroup::run(2, |comm| {
            relax(&comm, &g, &owners, 0, config.clone()).unwrap()
        });
        let outcome = &results[0].0;
        assert_eq!(outcome.termination, Termination::Converged);
        assert_eq!(outcome.iterations, 4);
        assert_eq!(outcome.global.exchanged, 1);
        assert_eq!(results[1].1, vec![(2, vec![ov(&[2, 2])])]);
    }

    #[test]
    fn sink_vertices_never_insert() {
        let g = graph_from(3, &[(1, 2, &[1, 1])]);
        let owners = OwnerMap::single(3);
        let (outcome, fronts) = LocalGroup::run(1, |comm| {
            relax(&comm, &g, &owners, 0, RelaxConfig::default()).unwrap()
        })
        .remove(0);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.global.insertions, 0);
        assert!(fronts[1].1.is_empty() && fronts[2].1.is_empty());
    }
}
