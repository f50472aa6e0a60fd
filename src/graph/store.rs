//! The vertices a single PE owns, with their edges and Pareto fronts.

use parking_lot::Mutex;
use tracing::debug;

use super::{Edge, Graph, VertexId};
use crate::error::{MospError, Result};
use crate::front::ParetoFront;
use crate::objective::ObjectiveVector;
use crate::partition::OwnerMap;

/// Dense index into a store's vertex arena.
pub type LocalId = u32;

#[derive(Clone, Debug)]
pub struct LocalVertex {
    pub id: VertexId,
    pub edges: Vec<Edge>,
    /// Single-objective fields, not consulted by the multi-objective rounds.
    pub distance: u64,
    pub predecessor: Option<VertexId>,
}

pub struct PartitionStore {
    rank: usize,
    dimension: usize,
    vertices: Vec<LocalVertex>,
    fronts: Vec<Mutex<ParetoFront>>,
    // indexed by global id; `None` for vertices owned elsewhere
    local_ids: Vec<Option<LocalId>>,
    owners: OwnerMap,
    front_capacity: usize,
    source_is_local: bool,
}

impl PartitionStore {
    /// Materialise the vertices `owners` assigns to `rank`, each with an empty
    /// front of capacity `max_front`, and seed the source front with the zero
    /// vector if the source is one of them.
    pub fn build(
        graph: &Graph,
        owners: OwnerMap,
        rank: usize,
        num_ranks: usize,
        source: VertexId,
        max_front: usize,
    ) -> Result<PartitionStore> {
        owners.validate(graph.num_vertices(), num_ranks)?;
        if !graph.contains(source) {
            return Err(MospError::VertexOutOfRange {
                vertex: source,
                num_vertices: graph.num_vertices(),
            });
        }

        let mut vertices = Vec::new();
        let mut fronts = Vec::new();
        let mut local_ids = vec![None; graph.num_vertices()];
        for id in owners.owned_by(rank) {
            local_ids[id as usize] = Some(vertices.len() as LocalId);
            vertices.push(LocalVertex {
                id,
                edges: graph.edges(id).to_vec(),
                distance: u64::MAX,
                predecessor: None,
            });
            fronts.push(Mutex::new(ParetoFront::new(max_front)));
        }

        let mut store = PartitionStore {
            rank,
            dimension: graph.dimension(),
            vertices,
            fronts,
            local_ids,
            owners,
            front_capacity: max_front,
            source_is_local: false,
        };
        if let Some(lid) = store.local_id(source) {
            store.vertices[lid as usize].distance = 0;
            store.fronts[lid as usize]
                .get_mut()
                .insert(ObjectiveVector::zero(store.dimension))?;
            store.source_is_local = true;
        }
        debug!(
            rank,
            owned = store.vertices.len(),
            source_is_local = store.source_is_local,
            "partition materialised"
        );
        Ok(store)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn num_local(&self) -> usize {
        self.vertices.len()
    }

    pub fn front_capacity(&self) -> usize {
        self.front_capacity
    }

    pub fn source_is_local(&self) -> bool {
        self.source_is_local
    }

    pub fn local_id(&self, vertex: VertexId) -> Option<LocalId> {
        self.local_ids.get(vertex as usize).copied().flatten()
    }

    pub fn owner(&self, vertex: VertexId) -> usize {
        self.owners.owner(vertex)
    }

    pub fn vertices(&self) -> &[LocalVertex] {
        &self.vertices
    }

    pub fn vertex(&self, lid: LocalId) -> &LocalVertex {
        &self.vertices[lid as usize]
    }

    /// The lock guarding one vertex's front.
    pub fn front(&self, lid: LocalId) -> &Mutex<ParetoFront> {
        &self.fronts[lid as usize]
    }

    /// Copy of every owned front, in local id order.
    pub fn snapshot(&self) -> Vec<Vec<ObjectiveVector>> {
        self.fronts.iter().map(|f| f.lock().members().to_vec()).collect()
    }

    /// Copy of one vertex's front, if it is owned here.
    pub fn front_of(&self, vertex: VertexId) -> Option<Vec<ObjectiveVector>> {
        self.local_id(vertex)
            .map(|lid| self.fronts[lid as usize].lock().members().to_vec())
    }

    /// Total vectors held across all owned fronts.
    pub fn front_entries(&self) -> usize {
        self.fronts.iter().map(|f| f.lock().len()).sum()
    }

    /// Owned vertices and their fronts in global id order.
    pub fn final_fronts(&self) -> Vec<(VertexId, Vec<ObjectiveVector>)> {
        // owned_by yields ascending ids, so the arena is already sorted
        self.vertices
            .iter()
            .zip(self.fronts.iter())
            .map(|(v, f)| (v.id, f.lock().sorted()))
            .collect()
    }
}
