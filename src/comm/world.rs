//! [`Collective`] over a Lamellar world.
//!
//! Every collective follows the same shape: push data to the receiving PEs
//! with an active message, `wait_all` until our messages have executed,
//! barrier so everyone else's have too, read the local slot, and barrier
//! again before the slot can be overwritten by the next call.

use lamellar::active_messaging::prelude::*;
use lamellar::darc::prelude::*;

use super::{Collective, Delivery};
use crate::error::MospError;

#[lamellar::AmData]
struct GatherAm {
    slots: LocalRwDarc<Vec<Vec<u64>>>,
    src: usize,
    values: Vec<u64>,
}

#[lamellar::am]
impl LamellarAM for GatherAm {
    async fn exec(self) {
        self.slots.write()[self.src] = self.values.clone();
    }
}

#[lamellar::AmData]
struct BroadcastAm {
    slot: LocalRwDarc<Vec<u8>>,
    payload: Vec<u8>,
}

#[lamellar::am]
impl LamellarAM for BroadcastAm {
    async fn exec(self) {
        **self.slot.write() = self.payload.clone();
    }
}

#[lamellar::AmData]
struct ExchangeAm {
    inbox: LocalRwDarc<Vec<Delivery>>,
    deliveries: Vec<Delivery>,
}

#[lamellar::am]
impl LamellarAM for ExchangeAm {
    async fn exec(self) {
        self.inbox.write().extend(self.deliveries.iter().cloned());
    }
}

pub struct WorldComm<'w> {
    world: &'w LamellarWorld,
    gathered: LocalRwDarc<Vec<Vec<u64>>>,
    broadcast: LocalRwDarc<Vec<u8>>,
    inbox: LocalRwDarc<Vec<Delivery>>,
}

impl<'w> WorldComm<'w> {
    /// Collective: every PE must construct its `WorldComm` together.
    pub fn new(world: &'w LamellarWorld) -> crate::error::Result<WorldComm<'w>> {
        let gathered =
            LocalRwDarc::new(world, vec![Vec::new(); world.num_pes()]).map_err(Self::runtime)?;
        let broadcast = LocalRwDarc::new(world, Vec::new()).map_err(Self::runtime)?;
        let inbox = LocalRwDarc::new(world, Vec::new()).map_err(Self::runtime)?;
        world.barrier();
        Ok(WorldComm {
            world,
            gathered,
            broadcast,
            inbox,
        })
    }

    fn runtime(e: impl std::fmt::Debug) -> MospError {
        MospError::Runtime(format!("lamellar darc construction failed: {e:?}"))
    }

    fn settle(&self) {
        self.world.wait_all();
        self.world.barrier();
    }
}

impl Collective for WorldComm<'_> {
    fn rank(&self) -> usize {
        self.world.my_pe()
    }

    fn num_ranks(&self) -> usize {
        self.world.num_pes()
    }

    fn barrier(&self) {
        self.world.barrier();
    }

    fn all_gather(&self, values: &[u64]) -> Vec<Vec<u64>> {
        let _ = self.world.exec_am_all(GatherAm {
            slots: self.gathered.clone(),
            src: self.world.my_pe(),
            values: values.to_vec(),
        });
        self.settle();
        let gathered = self.gathered.read().to_vec();
        self.world.barrier();
        gathered
    }

    fn broadcast(&self, root: usize, payload: Option<Vec<u8>>) -> Vec<u8> {
        if self.world.my_pe() == root {
            let _ = self.world.exec_am_all(BroadcastAm {
                slot: self.broadcast.clone(),
                payload: payload.unwrap_or_default(),
            });
        }
        self.settle();
        let received = std::mem::take(&mut **self.broadcast.write());
        self.world.barrier();
        received
    }

    fn exchange(&self, outgoing: Vec<Vec<Delivery>>) -> Vec<Delivery> {
        for (pe, deliveries) in outgoing.into_iter().enumerate() {
            if !deliveries.is_empty() {
                let _ = self.world.exec_am_pe(
                    pe,
                    ExchangeAm {
                        inbox: self.inbox.clone(),
                        deliveries,
                    },
                );
            }
        }
        self.settle();
        let received = std::mem::take(&mut **self.inbox.write());
        self.world.barrier();
        received
    }
}
