//! Everything a run writes out: per-rank front dumps, the per-rank summary
//! table, and the JSON-lines run record.

use std::collections::BTreeMap;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::comm::Collective;
use crate::error::{MospError, Result};
use crate::graph::store::PartitionStore;
use crate::graph::VertexId;
use crate::metrics::RunMetrics;
use crate::objective::ObjectiveVector;
use crate::relax::{CutEdgePolicy, RelaxOutcome};

/// `Process <rank> - Vertex <id>: (a, b) (c, d)`
pub fn front_line(rank: usize, vertex: VertexId, front: &[ObjectiveVector]) -> String {
    let mut line = format!("Process {rank} - Vertex {vertex}:");
    for v in front {
        line.push(' ');
        line.push_str(&v.to_string());
    }
    line
}

pub fn write_fronts<W: Write>(
    out: W,
    rank: usize,
    fronts: &[(VertexId, Vec<ObjectiveVector>)],
) -> io::Result<()> {
    let mut out = BufWriter::new(out);
    for (vertex, front) in fronts {
        writeln!(out, "{}", front_line(rank, *vertex, front))?;
    }
    out.flush()
}

pub fn fronts_path(dir: &Path, rank: usize) -> PathBuf {
    dir.join(format!("fronts_rank{rank}.txt"))
}

/// Write this rank's fronts to `<dir>/fronts_rank<rank>.txt`.
pub fn write_fronts_file(
    dir: &Path,
    rank: usize,
    fronts: &[(VertexId, Vec<ObjectiveVector>)],
) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| MospError::io(dir, e))?;
    let path = fronts_path(dir, rank);
    let file = File::create(&path).map_err(|e| MospError::io(&path, e))?;
    write_fronts(file, rank, fronts).map_err(|e| MospError::io(&path, e))?;
    Ok(path)
}

/// One row of the per-rank summary table.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RankSummary {
    pub rank: usize,
    pub iterations: usize,
    pub insertions: u64,
    pub capacity_rejections: u64,
    pub vertices_owned: u64,
    pub front_entries: u64,
}

impl RankSummary {
    /// Collective: every rank receives every rank's row, in rank order.
    pub fn gather<C: Collective>(
        comm: &C,
        store: &PartitionStore,
        outcome: &RelaxOutcome,
    ) -> Vec<RankSummary> {
        comm.all_gather(&[
            outcome.local.insertions,
            outcome.local.capacity_rejections,
            store.num_local() as u64,
            store.front_entries() as u64,
        ])
        .into_iter()
        .enumerate()
        .map(|(rank, row)| RankSummary {
            rank,
            iterations: outcome.iterations,
            insertions: row[0],
            capacity_rejections: row[1],
            vertices_owned: row[2],
            front_entries: row[3],
        })
        .collect()
    }
}

pub fn write_summary(path: &Path, rows: &[RankSummary]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| MospError::io(path, e))
}

/// A single JSON line describing one run.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RunRecord {
    pub name: String,
    pub run_date: String,
    pub executable: String,
    pub parameters: Vec<String>,
    pub graph: PathBuf,
    pub partition: PathBuf,
    pub source: VertexId,
    pub max_front: usize,
    pub max_iterations: usize,
    pub cut_edges: CutEdgePolicy,
    pub output: RunMetrics,
    pub environment: BTreeMap<String, String>,
}

impl RunRecord {
    pub fn new(
        graph: &Path,
        partition: &Path,
        source: VertexId,
        max_front: usize,
        max_iterations: usize,
        cut_edges: CutEdgePolicy,
        metrics: &RunMetrics,
    ) -> RunRecord {
        let mut args = env::args();
        let executable = args.next().unwrap_or_else(|| "<unknown>".to_string());
        RunRecord {
            name: "mosp".to_string(),
            run_date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            executable,
            parameters: args.collect(),
            graph: graph.to_path_buf(),
            partition: partition.to_path_buf(),
            source,
            max_front,
            max_iterations,
            cut_edges,
            output: metrics.clone(),
            environment: env::vars()
                .filter(|(key, _)| key.starts_with("LAMELLAR") || key.starts_with("SLURM"))
                .collect(),
        }
    }

    /// Append as one line to a JSON-lines file, creating it (and its parent
    /// directories) if needed.
    pub fn append(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| MospError::io(parent, e))?;
        }
        let line = serde_json::to_string(self)
            .map_err(|e| MospError::Runtime(format!("unable to encode run record: {e}")))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| MospError::io(path, e))?;
        writeln!(file, "{line}").map_err(|e| MospError::io(path, e))
    }
}
