use std::path::PathBuf;

use thiserror::Error;

use crate::graph::VertexId;

pub type Result<T> = std::result::Result<T, MospError>;

#[derive(Error, Debug)]
pub enum MospError {
    #[error("unable to open {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} line {line}: {msg}")]
    Parse {
        path: PathBuf,
        line: usize,
        msg: String,
    },

    #[error("objective dimension mismatch: expected {expected}, found {found} ({context})")]
    Dimension {
        expected: usize,
        found: usize,
        context: String,
    },

    #[error("objective overflow while relaxing edge into vertex {target}")]
    Overflow { target: VertexId },

    #[error("partition file lists {found} owners but the graph has {expected} vertices")]
    OwnerMapLength { expected: usize, found: usize },

    #[error("vertex {vertex} is assigned to rank {rank} but only {num_ranks} ranks are running")]
    RankOutOfRange {
        vertex: VertexId,
        rank: usize,
        num_ranks: usize,
    },

    #[error("vertex {vertex} is out of range for a graph with {num_vertices} vertices")]
    VertexOutOfRange {
        vertex: VertexId,
        num_vertices: usize,
    },

    #[error("setup failed on the coordinator: {0}")]
    RemoteSetup(String),

    #[error("{failed} rank(s) failed during round {iteration}")]
    RemoteRound { iteration: usize, failed: u64 },

    #[error("unable to build relaxation thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(
        "graph of {num_vertices} vertices cannot be held (vertex ids stop at {max})",
        max = VertexId::MAX
    )]
    GraphTooLarge { num_vertices: usize },

    #[error("coordinator rank {coordinator} requested but only {num_ranks} ranks are running")]
    CoordinatorOutOfRange {
        coordinator: usize,
        num_ranks: usize,
    },

    #[error("rank {rank} received a candidate for vertex {vertex} it does not own")]
    Misrouted { vertex: VertexId, rank: usize },

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("bincode error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl MospError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MospError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, msg: impl Into<String>) -> Self {
        MospError::Parse {
            path: path.into(),
            line,
            msg: msg.into(),
        }
    }
}
