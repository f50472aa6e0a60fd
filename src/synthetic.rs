//! Random inputs for trying the engine without a real dataset.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::error::{MospError, Result};
use crate::graph::{Edge, Graph, VertexId};
use crate::objective::ObjectiveVector;
use crate::partition::OwnerMap;

/// A simple undirected graph, stored as sorted neighbour sets.
#[derive(Clone, Debug)]
pub struct UndirectedGraph {
    adjacency: Vec<BTreeSet<VertexId>>,
}

impl UndirectedGraph {
    /// Keep adding random neighbours to each vertex in turn until it has at
    /// least `avg_degree` of them. Self loops and parallel edges are never
    /// produced; `avg_degree` is capped at `num_nodes - 1`.
    pub fn random(num_nodes: usize, avg_degree: usize, seed: u64) -> UndirectedGraph {
        let mut rng = StdRng::seed_from_u64(seed);
        let degree = avg_degree.min(num_nodes.saturating_sub(1));
        let mut adjacency = vec![BTreeSet::new(); num_nodes];
        for node in 0..num_nodes {
            while adjacency[node].len() < degree {
                let neighbor = rng.gen_range(0, num_nodes);
                if neighbor != node {
                    adjacency[node].insert(neighbor as VertexId);
                    adjacency[neighbor].insert(node as VertexId);
                }
            }
        }
        UndirectedGraph { adjacency }
    }

    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    /// Undirected edge count.
    pub fn num_edges(&self) -> usize {
        self.adjacency.iter().map(|n| n.len()).sum::<usize>() / 2
    }

    pub fn neighbors(&self, node: VertexId) -> &BTreeSet<VertexId> {
        &self.adjacency[node as usize]
    }

    /// METIS layout: header, then each vertex's 1-based neighbours.
    pub fn write_metis(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| MospError::io(path, e))?;
        let mut out = BufWriter::new(file);
        let io = |e| MospError::io(path, e);
        writeln!(out, "{} {}", self.num_nodes(), self.num_edges()).map_err(io)?;
        for neighbors in &self.adjacency {
            let line: Vec<String> = neighbors.iter().map(|n| (n + 1).to_string()).collect();
            writeln!(out, "{}", line.join(" ")).map_err(io)?;
        }
        out.flush().map_err(io)
    }

    /// Draw a weight vector in `1..=max_weight` per undirected edge, shared
    /// by both directions.
    pub fn random_weights(
        &self,
        dimension: usize,
        max_weight: u64,
        seed: u64,
    ) -> BTreeMap<(VertexId, VertexId), ObjectiveVector> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut weights = BTreeMap::new();
        for (u, neighbors) in self.adjacency.iter().enumerate() {
            let u = u as VertexId;
            for &v in neighbors.iter().filter(|&&v| v > u) {
                let w = (0..dimension).map(|_| rng.gen_range(1, max_weight.max(1) + 1)).collect();
                weights.insert((u, v), ObjectiveVector::new(w));
            }
        }
        weights
    }

    /// Weighted text layout: header, then `u v:w1,w2 ...` per vertex.
    pub fn write_weighted(
        &self,
        path: &Path,
        weights: &BTreeMap<(VertexId, VertexId), ObjectiveVector>,
    ) -> Result<()> {
        let file = File::create(path).map_err(|e| MospError::io(path, e))?;
        let mut out = BufWriter::new(file);
        let io = |e| MospError::io(path, e);
        writeln!(out, "{} {}", self.num_nodes(), self.num_edges()).map_err(io)?;
        for (u, neighbors) in self.adjacency.iter().enumerate() {
            let u = u as VertexId;
            write!(out, "{u}").map_err(io)?;
            for &v in neighbors {
                let w = &weights[&(u.min(v), u.max(v))];
                let w: Vec<String> = w.as_slice().iter().map(|x| x.to_string()).collect();
                write!(out, " {v}:{}", w.join(",")).map_err(io)?;
            }
            writeln!(out).map_err(io)?;
        }
        out.flush().map_err(io)
    }

    /// Both directions of every edge with unit weights.
    pub fn to_graph(&self, dimension: usize) -> Result<Graph> {
        Graph::from_edges(
            self.num_nodes(),
            dimension,
            self.adjacency.iter().enumerate().flat_map(|(u, neighbors)| {
                neighbors.iter().map(move |&v| {
                    (
                        u as VertexId,
                        Edge {
                            target: v,
                            weights: ObjectiveVector::unit(dimension),
                        },
                    )
                })
            }),
        )
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionScheme {
    /// every vertex on rank 0
    Zeros,
    /// contiguous id ranges
    Block,
    /// round-robin by id
    Cyclic,
}

impl PartitionScheme {
    pub fn owners(self, num_vertices: usize, parts: usize) -> OwnerMap {
        match self {
            PartitionScheme::Zeros => OwnerMap::single(num_vertices),
            PartitionScheme::Block => OwnerMap::block(num_vertices, parts),
            PartitionScheme::Cyclic => OwnerMap::cyclic(num_vertices, parts),
        }
    }
}
