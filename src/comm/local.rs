//! Ranks simulated as threads of a single process.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::{Collective, Delivery};

#[derive(Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    poisoned: bool,
}

/// A reusable barrier that a dying rank can break, so its peers panic
/// instead of waiting forever.
struct RankBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl RankBarrier {
    fn new(parties: usize) -> RankBarrier {
        RankBarrier {
            parties,
            state: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        }
    }

    fn wait(&self) {
        let mut state = self.state.lock();
        let generation = state.generation;
        if !state.poisoned {
            state.arrived += 1;
            if state.arrived == self.parties {
                state.arrived = 0;
                state.generation += 1;
                self.released.notify_all();
                return;
            }
            while state.generation == generation && !state.poisoned {
                self.released.wait(&mut state);
            }
        }
        if state.generation == generation {
            drop(state);
            panic!("a peer rank panicked before reaching the barrier");
        }
    }

    fn poison(&self) {
        self.state.lock().poisoned = true;
        self.released.notify_all();
    }
}

struct Shared {
    barrier: RankBarrier,
    gathered: Vec<Mutex<Vec<u64>>>,
    broadcast: Mutex<Vec<u8>>,
    inboxes: Vec<Mutex<Vec<Delivery>>>,
}

/// Handle for one simulated rank. Each handle must be driven by its own
/// thread, since every collective blocks until all ranks arrive.
pub struct LocalComm {
    rank: usize,
    num_ranks: usize,
    shared: Arc<Shared>,
}

pub struct LocalGroup;

impl LocalGroup {
    pub fn new(num_ranks: usize) -> Vec<LocalComm> {
        let shared = Arc::new(Shared {
            barrier: RankBarrier::new(num_ranks),
            gathered: (0..num_ranks).map(|_| Mutex::new(Vec::new())).collect(),
            broadcast: Mutex::new(Vec::new()),
            inboxes: (0..num_ranks).map(|_| Mutex::new(Vec::new())).collect(),
        });
        (0..num_ranks)
            .map(|rank| LocalComm {
                rank,
                num_ranks,
                shared: shared.clone(),
            })
            .collect()
    }

    /// Run `f` once per rank on its own thread and collect the results in
    /// rank order.
    pub fn run<T, F>(num_ranks: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(LocalComm) -> T + Sync,
    {
        let comms = LocalGroup::new(num_ranks);
        std::thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    let f = &f;
                    scope.spawn(move || f(comm))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}

impl Drop for LocalComm {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.shared.barrier.poison();
        }
    }
}

impl Collective for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn all_gather(&self, values: &[u64]) -> Vec<Vec<u64>> {
        *self.shared.gathered[self.rank].lock() = values.to_vec();
        self.barrier();
        let gathered = self
            .shared
            .gathered
            .iter()
            .map(|slot| slot.lock().clone())
            .collect();
        self.barrier();
        gathered
    }

    fn broadcast(&self, root: usize, payload: Option<Vec<u8>>) -> Vec<u8> {
        if self.rank == root {
            *self.shared.broadcast.lock() = payload.unwrap_or_default();
        }
        self.barrier();
        let received = self.shared.broadcast.lock().clone();
        self.barrier();
        received
    }

    fn exchange(&self, outgoing: Vec<Vec<Delivery>>) -> Vec<Delivery> {
        for (rank, batch) in outgoing.into_iter().enumerate() {
            if !batch.is_empty() {
                self.shared.inboxes[rank].lock().extend(batch);
            }
        }
        self.barrier();
        let received = std::mem::take(&mut *self.shared.inboxes[self.rank].lock());
        self.barrier();
        received
    }
}
