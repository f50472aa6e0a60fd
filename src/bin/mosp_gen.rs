//! Writes a random undirected graph and a matching partition file.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mosp_lamellar::synthetic::{PartitionScheme, UndirectedGraph};

#[derive(Parser)]
#[command(author, version, about = "Generate inputs for mosp", long_about = None)]
struct GenCli {
    /// graph output; .metis/.graph gives unit weights, anything else the
    /// weighted format
    output: PathBuf,

    #[arg(short, long, default_value_t = 1000)]
    num_nodes: usize,

    #[arg(short, long, default_value_t = 4)]
    avg_degree: usize,

    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// objectives per edge in the weighted format
    #[arg(short, long, default_value_t = 2)]
    dimension: usize,

    /// weights are drawn from 1..=max_weight
    #[arg(short = 'w', long, default_value_t = 10)]
    max_weight: u64,

    /// partition output (default: <output>.part)
    #[arg(short, long)]
    partition: Option<PathBuf>,

    #[arg(value_enum, long, default_value_t = PartitionScheme::Zeros)]
    scheme: PartitionScheme,

    #[arg(long, default_value_t = 1)]
    parts: usize,
}

impl GenCli {
    fn describe(&self) {
        println!("output: {}", self.output.display());
        println!("num nodes: {}", self.num_nodes);
        println!("avg degree: {}", self.avg_degree);
        println!("seed: {}", self.seed);
        println!("scheme: {:?} over {} parts", self.scheme, self.parts);
    }
}

fn main() -> Result<(), mosp_lamellar::MospError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let cli = GenCli::parse();
    cli.describe();

    let graph = UndirectedGraph::random(cli.num_nodes, cli.avg_degree, cli.seed);
    match cli.output.extension().and_then(|e| e.to_str()) {
        Some("metis") | Some("graph") => graph.write_metis(&cli.output)?,
        _ => {
            let seed = cli.seed.wrapping_add(1);
            let weights = graph.random_weights(cli.dimension, cli.max_weight, seed);
            graph.write_weighted(&cli.output, &weights)?
        }
    }
    info!(
        nodes = graph.num_nodes(),
        edges = graph.num_edges(),
        path = ?cli.output,
        "graph written"
    );

    let partition = cli.partition.clone().unwrap_or_else(|| cli.output.with_extension("part"));
    cli.scheme.owners(graph.num_nodes(), cli.parts).write(&partition)?;
    info!(path = ?partition, "partition written");
    Ok(())
}
