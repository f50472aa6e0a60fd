//! Vertex -> owner assignment produced by the external partitioner.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{MospError, Result};
use crate::graph::VertexId;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OwnerMap {
    owners: Vec<usize>,
}

impl OwnerMap {
    pub fn new(owners: Vec<usize>) -> OwnerMap {
        OwnerMap { owners }
    }

    /// Everything on rank 0.
    pub fn single(num_vertices: usize) -> OwnerMap {
        OwnerMap::new(vec![0; num_vertices])
    }

    /// Contiguous id ranges of (nearly) equal size.
    pub fn block(num_vertices: usize, parts: usize) -> OwnerMap {
        let parts = parts.max(1);
        let per_part = ((num_vertices + parts - 1) / parts).max(1);
        OwnerMap::new((0..num_vertices).map(|v| v / per_part).collect())
    }

    /// Round-robin by id.
    pub fn cyclic(num_vertices: usize, parts: usize) -> OwnerMap {
        OwnerMap::new((0..num_vertices).map(|v| v % parts.max(1)).collect())
    }

    /// One rank per line, in vertex order. Reading stops after
    /// `num_vertices` entries; trailing lines are ignored.
    pub fn load(path: &Path, num_vertices: usize) -> Result<OwnerMap> {
        let file = File::open(path).map_err(|e| MospError::io(path, e))?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .comment(Some(b'%'))
            .from_reader(file);

        let mut owners = Vec::with_capacity(num_vertices);
        for result in rdr.deserialize() {
            if owners.len() == num_vertices {
                break;
            }
            let record: [usize; 1] = result?;
            owners.push(record[0]);
        }
        if owners.len() < num_vertices {
            return Err(MospError::OwnerMapLength {
                expected: num_vertices,
                found: owners.len(),
            });
        }
        Ok(OwnerMap::new(owners))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| MospError::io(path, e))?;
        let mut out = BufWriter::new(file);
        for owner in &self.owners {
            writeln!(out, "{owner}").map_err(|e| MospError::io(path, e))?;
        }
        out.flush().map_err(|e| MospError::io(path, e))
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn owner(&self, vertex: VertexId) -> usize {
        self.owners[vertex as usize]
    }

    /// Check the map covers exactly `num_vertices` and only names running ranks.
    pub fn validate(&self, num_vertices: usize, num_ranks: usize) -> Result<()> {
        if self.owners.len() != num_vertices {
            return Err(MospError::OwnerMapLength {
                expected: num_vertices,
                found: self.owners.len(),
            });
        }
        if let Some((vertex, rank)) = self
            .owners
            .iter()
            .enumerate()
            .find(|(_, rank)| **rank >= num_ranks)
        {
            return Err(MospError::RankOutOfRange {
                vertex: vertex as VertexId,
                rank: *rank,
                num_ranks,
            });
        }
        Ok(())
    }

    pub fn owned_by(&self, rank: usize) -> impl Iterator<Item = VertexId> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter(move |(_, owner)| **owner == rank)
            .map(|(v, _)| v as VertexId)
    }
}
