use std::path::PathBuf;

use clap::Parser;

use mosp_lamellar::graph::{GraphFormat, VertexId};
use mosp_lamellar::relax::{CutEdgePolicy, RelaxConfig};
use mosp_lamellar::session::RunConfig;
use mosp_lamellar::{MAX_FRONT, MAX_ITER};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Pareto-optimal paths over a partitioned graph",
    long_about = None
)]
pub struct MospCli {
    /// graph file (csr, metis, weighted or bincode dump)
    pub graph_file: PathBuf,

    /// one owning rank per line, in vertex order
    pub partition_file: PathBuf,

    /// source vertex (default 0)
    pub source_vertex: Option<VertexId>,

    /// relaxation threads per PE (0 lets rayon decide)
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,

    #[arg(short = 'i', long, default_value_t = MAX_ITER)]
    pub max_iterations: usize,

    /// capacity of every vertex's Pareto front
    #[arg(short = 'm', long, default_value_t = MAX_FRONT)]
    pub max_front: usize,

    #[arg(value_enum, long, default_value_t = CutEdgePolicy::Discard)]
    pub cut_edges: CutEdgePolicy,

    #[arg(value_enum, short, long, default_value_t = GraphFormat::Auto)]
    pub format: GraphFormat,

    /// objective count given to edges without explicit weights
    #[arg(short, long, default_value_t = 2)]
    pub dimension: usize,

    /// rank that loads the inputs and reports run-wide results
    #[arg(short, long, default_value_t = 0)]
    pub coordinator: usize,

    /// start from the vertex with the highest out-degree
    #[arg(long, conflicts_with = "source_vertex")]
    pub auto_source: bool,

    /// write fronts to <dir>/fronts_rank<r>.txt instead of stdout
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// append a JSON line describing the run
    #[arg(short, long)]
    pub record: Option<PathBuf>,

    /// write a per-rank summary table (csv)
    #[arg(short, long)]
    pub summary: Option<PathBuf>,

    /// save the parsed graph next to the input as .bin
    #[arg(long)]
    pub dump_bin: bool,
}

impl MospCli {
    pub fn describe(&self, num_pes: usize) {
        println!("graph file: {}", self.graph_file.display());
        println!("partition file: {}", self.partition_file.display());
        match (self.auto_source, self.source_vertex) {
            (true, _) => println!("source: highest out-degree"),
            (false, source) => println!("source: {}", source.unwrap_or(0)),
        }
        println!("num pes: {num_pes}");
        println!("threads: {}", self.threads);
        println!("max iterations: {}", self.max_iterations);
        println!("max front: {}", self.max_front);
        println!("cut edges: {:?}", self.cut_edges);
        println!("format: {:?}", self.format);
        println!("dimension: {}", self.dimension);
        println!("coordinator: {}", self.coordinator);
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            source: self.source_vertex,
            auto_source: self.auto_source,
            format: self.format,
            dimension: self.dimension,
            max_front: self.max_front,
            coordinator: self.coordinator,
            dump_bin: self.dump_bin,
            relax: RelaxConfig {
                max_iterations: self.max_iterations,
                threads: self.threads,
                cut_edges: self.cut_edges,
            },
            ..RunConfig::new(&self.graph_file, &self.partition_file)
        }
    }
}
