//! One complete run on one rank: shared setup, relaxation, reduction.

use std::path::PathBuf;

use tracing::{error, info};

use crate::comm::{Collective, Role};
use crate::error::{MospError, Result};
use crate::front::MAX_FRONT;
use crate::graph::store::PartitionStore;
use crate::graph::{Graph, GraphFormat, VertexId};
use crate::metrics::RunMetrics;
use crate::objective::ObjectiveVector;
use crate::partition::OwnerMap;
use crate::relax::{Coordinator, RelaxConfig};
use crate::report::RankSummary;

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub graph: PathBuf,
    pub partition: PathBuf,
    /// `None` means vertex 0, unless `auto_source` is set
    pub source: Option<VertexId>,
    pub auto_source: bool,
    pub format: GraphFormat,
    /// length of the unit weight given to edges without explicit weights
    pub dimension: usize,
    pub max_front: usize,
    pub coordinator: usize,
    pub dump_bin: bool,
    pub relax: RelaxConfig,
}

impl RunConfig {
    pub fn new(graph: impl Into<PathBuf>, partition: impl Into<PathBuf>) -> RunConfig {
        RunConfig {
            graph: graph.into(),
            partition: partition.into(),
            source: None,
            auto_source: false,
            format: GraphFormat::Auto,
            dimension: 2,
            max_front: MAX_FRONT,
            coordinator: 0,
            dump_bin: false,
            relax: RelaxConfig::default(),
        }
    }
}

/// What a rank knows once the run is over.
#[derive(Debug)]
pub struct RunReport {
    pub rank: usize,
    pub role: Role,
    pub source: VertexId,
    pub metrics: RunMetrics,
    /// this rank's vertices and fronts, in vertex id order
    pub fronts: Vec<(VertexId, Vec<ObjectiveVector>)>,
    pub ranks: Vec<RankSummary>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Setup {
    graph: Graph,
    owners: OwnerMap,
    source: VertexId,
}

#[derive(serde::Serialize, serde::Deserialize)]
enum SetupMessage {
    Ready(Setup),
    Failed(String),
}

/// Read and validate the inputs. Only the coordinator touches the files.
fn load_setup(config: &RunConfig, num_ranks: usize) -> Result<Setup> {
    let graph = Graph::load(&config.graph, config.format, config.dimension)?;
    if config.dump_bin && config.format.resolve(&config.graph) != GraphFormat::Bin {
        let bin = config.graph.with_extension("bin");
        graph.dump_to_bin(&bin)?;
        info!(path = ?bin, "wrote binary graph");
    }
    let owners = OwnerMap::load(&config.partition, graph.num_vertices())?;
    owners.validate(graph.num_vertices(), num_ranks)?;

    let source = if config.auto_source {
        let best = graph.highest_degree_vertex().unwrap_or(0);
        if graph.contains(best) {
            info!(source = best, degree = graph.out_degree(best), "picked source by out-degree");
        }
        best
    } else {
        config.source.unwrap_or(0)
    };
    if !graph.contains(source) {
        return Err(MospError::VertexOutOfRange {
            vertex: source,
            num_vertices: graph.num_vertices(),
        });
    }
    Ok(Setup {
        graph,
        owners,
        source,
    })
}

fn encode(message: &SetupMessage) -> Vec<u8> {
    // an empty payload fails to decode on every rank alike
    bincode::serialize(message).unwrap_or_default()
}

/// Collective: every rank calls this with the same `config`.
pub fn run<C: Collective>(comm: &C, config: &RunConfig) -> Result<RunReport> {
    let rank = comm.rank();
    let num_ranks = comm.num_ranks();
    if config.coordinator >= num_ranks {
        return Err(MospError::CoordinatorOutOfRange {
            coordinator: config.coordinator,
            num_ranks,
        });
    }
    let role = if rank == config.coordinator {
        Role::Coordinator
    } else {
        Role::Worker
    };

    let mut local_error = None;
    let payload = role.is_coordinator().then(|| match load_setup(config, num_ranks) {
        Ok(setup) => encode(&SetupMessage::Ready(setup)),
        Err(e) => {
            error!("setup failed: {e}");
            let message = SetupMessage::Failed(e.to_string());
            local_error = Some(e);
            encode(&message)
        }
    });
    let received = comm.broadcast(config.coordinator, payload);
    if let Some(e) = local_error {
        return Err(e);
    }
    let Setup {
        graph,
        owners,
        source,
    } = match bincode::deserialize::<SetupMessage>(&received)? {
        SetupMessage::Ready(setup) => setup,
        SetupMessage::Failed(msg) => return Err(MospError::RemoteSetup(msg)),
    };

    let store = PartitionStore::build(&graph, owners, rank, num_ranks, source, config.max_front)?;
    drop(graph);

    let coordinator = Coordinator::new(&store, comm, role, config.relax.clone());
    let pool_failures = comm.sum(&[coordinator.is_err() as u64])[0];
    let coordinator = coordinator?;
    if pool_failures > 0 {
        return Err(MospError::Runtime(format!(
            "{pool_failures} rank(s) could not start their thread pools"
        )));
    }
    comm.barrier();
    if role.is_coordinator() {
        info!(
            ranks = num_ranks,
            source,
            cut_edges = ?config.relax.cut_edges,
            "starting relaxation"
        );
    }

    let outcome = coordinator.run()?;
    let metrics = RunMetrics::gather(comm, &store, &outcome);
    let ranks = RankSummary::gather(comm, &store, &outcome);
    if role.is_coordinator() {
        info!(
            iterations = metrics.iterations,
            termination = ?metrics.termination,
            secs = metrics.max_elapsed_secs,
            "relaxation finished"
        );
    }

    Ok(RunReport {
        rank,
        role,
        source,
        metrics,
        fronts: store.final_fronts(),
        ranks,
    })
}
