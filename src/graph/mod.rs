//! The shared graph description every PE builds its partition from.
//!
//! A `Graph` is a CSR layout of outgoing edges, each carrying a weight vector
//! of the run's objective dimension. It is parsed once (on the coordinator)
//! from one of the text formats in [`parse`] or from a bincode dump, then
//! handed to [`store::PartitionStore`] which keeps only the owned vertices.

pub mod parse;
pub mod store;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{MospError, Result};
use crate::objective::ObjectiveVector;

pub type VertexId = u32;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Edge {
    pub target: VertexId,
    pub weights: ObjectiveVector,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphFormat {
    /// choose from the file extension
    Auto,
    /// header, offsets line, neighbours line
    Csr,
    /// header, then one line of 1-based neighbours per vertex
    Metis,
    /// header, then `vertex neighbor:w1,w2 ...` lines
    Weighted,
    /// bincode dump written by `--dump-bin`
    Bin,
}

impl GraphFormat {
    pub fn resolve(self, path: &Path) -> GraphFormat {
        match self {
            GraphFormat::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some("csr") => GraphFormat::Csr,
                Some("metis") | Some("graph") => GraphFormat::Metis,
                Some("bin") => GraphFormat::Bin,
                _ => GraphFormat::Weighted,
            },
            other => other,
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Graph {
    num_vertices: usize,
    dimension: usize,
    offsets: Vec<usize>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Parse `path` in the given format. Edges without explicit weights get a
    /// unit vector; `default_dimension` is its length unless an explicit edge
    /// has already fixed the dimension.
    pub fn load(path: &Path, format: GraphFormat, default_dimension: usize) -> Result<Graph> {
        let start = std::time::Instant::now();
        let format = format.resolve(path);
        let graph = match format {
            GraphFormat::Bin => Graph::load_bin(path)?,
            GraphFormat::Csr => parse::csr(path, default_dimension)?,
            GraphFormat::Metis => parse::metis(path, default_dimension)?,
            GraphFormat::Weighted | GraphFormat::Auto => parse::weighted(path, default_dimension)?,
        };
        info!(
            ?format,
            vertices = graph.num_vertices(),
            edges = graph.num_edges(),
            dimension = graph.dimension(),
            secs = start.elapsed().as_secs_f64(),
            "graph loaded"
        );
        Ok(graph)
    }

    /// Build a graph from `(source, edge)` pairs.
    pub fn from_edges(
        num_vertices: usize,
        default_dimension: usize,
        edges: impl IntoIterator<Item = (VertexId, Edge)>,
    ) -> Result<Graph> {
        let mut builder = GraphBuilder::new(num_vertices, default_dimension)?;
        for (source, edge) in edges {
            builder.push(source, edge)?;
        }
        builder.finish()
    }

    fn load_bin(path: &Path) -> Result<Graph> {
        let file = File::open(path).map_err(|e| MospError::io(path, e))?;
        let graph: Graph = bincode::deserialize_from(BufReader::new(file))?;
        graph
            .check_layout()
            .map_err(|msg| MospError::parse(path, 0, format!("corrupt binary graph: {msg}")))?;
        Ok(graph)
    }

    // A dump is trusted no more than a text file.
    fn check_layout(&self) -> std::result::Result<(), String> {
        let n = self.num_vertices;
        if n > VertexId::MAX as usize {
            return Err(format!("{n} vertices exceed the vertex id range"));
        }
        if self.offsets.len() != n + 1 {
            return Err(format!("{} offsets for {n} vertices", self.offsets.len()));
        }
        if self.offsets[0] != 0 || self.offsets[n] != self.edges.len() {
            return Err(format!("offsets do not cover the {} edges", self.edges.len()));
        }
        if self.offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err("offsets decrease".to_string());
        }
        if let Some(edge) = self.edges.iter().find(|e| e.target as usize >= n) {
            return Err(format!("edge target {} out of range", edge.target));
        }
        if let Some(edge) = self.edges.iter().find(|e| e.weights.dimension() != self.dimension) {
            return Err(format!(
                "edge weight of dimension {} in a graph of dimension {}",
                edge.weights.dimension(),
                self.dimension
            ));
        }
        Ok(())
    }

    /// Save to binary format so later runs skip text parsing.
    pub fn dump_to_bin(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| MospError::io(path, e))?;
        bincode::serialize_into(BufWriter::new(file), self)?;
        debug!(?path, "graph dumped");
        Ok(())
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        (vertex as usize) < self.num_vertices
    }

    /// Outgoing edges of `vertex`, in file order.
    pub fn edges(&self, vertex: VertexId) -> &[Edge] {
        let v = vertex as usize;
        &self.edges[self.offsets[v]..self.offsets[v + 1]]
    }

    pub fn out_degree(&self, vertex: VertexId) -> usize {
        let v = vertex as usize;
        self.offsets[v + 1] - self.offsets[v]
    }

    /// The vertex with the most outgoing edges (lowest id on ties), a good
    /// source for exercising as much of the graph as possible.
    pub fn highest_degree_vertex(&self) -> Option<VertexId> {
        (0..self.num_vertices)
            .filter_map(|v| VertexId::try_from(v).ok())
            .max_by(|a, b| self.out_degree(*a).cmp(&self.out_degree(*b)).then(b.cmp(a)))
    }
}

/// Collects edges and enforces a uniform dimension. Storage grows with the
/// edges actually pushed, never with the declared vertex count.
pub(crate) struct GraphBuilder {
    num_vertices: usize,
    edges: Vec<(VertexId, Edge)>,
    dimension: Option<usize>,
    default_dimension: usize,
}

impl GraphBuilder {
    pub(crate) fn new(num_vertices: usize, default_dimension: usize) -> Result<GraphBuilder> {
        if num_vertices > VertexId::MAX as usize {
            return Err(MospError::GraphTooLarge { num_vertices });
        }
        Ok(GraphBuilder {
            num_vertices,
            edges: Vec::new(),
            dimension: None,
            default_dimension,
        })
    }

    /// Unit weights of the run's dimension (or the default if no edge has
    /// fixed it yet).
    pub(crate) fn unit_weights(&self) -> ObjectiveVector {
        ObjectiveVector::unit(self.dimension.unwrap_or(self.default_dimension))
    }

    pub(crate) fn push(&mut self, source: VertexId, edge: Edge) -> Result<()> {
        let n = self.num_vertices;
        for vertex in [source, edge.target] {
            if vertex as usize >= n {
                return Err(MospError::VertexOutOfRange {
                    vertex,
                    num_vertices: n,
                });
            }
        }
        match self.dimension {
            None => self.dimension = Some(edge.weights.dimension()),
            Some(k) if k != edge.weights.dimension() => {
                return Err(MospError::Dimension {
                    expected: k,
                    found: edge.weights.dimension(),
                    context: format!("edge {} -> {}", source, edge.target),
                })
            }
            Some(_) => {}
        }
        self.edges.push((source, edge));
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<Graph> {
        let num_vertices = self.num_vertices;
        let too_large = || MospError::GraphTooLarge { num_vertices };
        let mut offsets = Vec::new();
        offsets
            .try_reserve_exact(num_vertices.checked_add(1).ok_or_else(too_large)?)
            .map_err(|_| too_large())?;

        // stable, so each vertex keeps its edges in push order
        let mut edges = self.edges;
        edges.sort_by_key(|(source, _)| *source);
        offsets.push(0);
        let mut next = 0;
        for v in 0..num_vertices {
            while next < edges.len() && edges[next].0 as usize == v {
                next += 1;
            }
            offsets.push(next);
        }
        Ok(Graph {
            num_vertices,
            dimension: self.dimension.unwrap_or(self.default_dimension),
            offsets,
            edges: edges.into_iter().map(|(_, edge)| edge).collect(),
        })
    }
}
