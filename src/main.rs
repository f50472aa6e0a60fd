mod options;
mod printer;

use clap::Parser;
use lamellar::LamellarWorld;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use mosp_lamellar::comm::world::WorldComm;
use mosp_lamellar::report::{self, RunRecord};
use mosp_lamellar::{session, MospError};
use options::MospCli;

fn main() {
    let world = lamellar::LamellarWorldBuilder::new().build();
    let my_pe = world.my_pe();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = match MospCli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if my_pe == 0 {
                err.exit();
            }
            std::process::exit(err.exit_code());
        }
    };

    if my_pe == cli.coordinator {
        cli.describe(world.num_pes());
    }

    if let Err(e) = run(&world, &cli) {
        if my_pe == cli.coordinator {
            error!("{e}");
        } else {
            debug!(pe = my_pe, "{e}");
        }
        std::process::exit(1);
    }
}

fn run(world: &LamellarWorld, cli: &MospCli) -> mosp_lamellar::Result<()> {
    let comm = WorldComm::new(world)?;
    let config = cli.run_config();
    let report = session::run(&comm, &config)?;

    match &cli.output_dir {
        Some(dir) => {
            let path = report::write_fronts_file(dir, report.rank, &report.fronts)?;
            debug!(?path, "fronts written");
        }
        None => report::write_fronts(std::io::stdout().lock(), report.rank, &report.fronts)
            .map_err(|e| MospError::io("<stdout>", e))?,
    }

    if report.role.is_coordinator() {
        printer::print_summary(&report.metrics);
        printer::print_ranks(&report.ranks);
        if let Some(path) = &cli.record {
            RunRecord::new(
                &config.graph,
                &config.partition,
                report.source,
                config.max_front,
                config.relax.max_iterations,
                config.relax.cut_edges,
                &report.metrics,
            )
            .append(path)?;
        }
        if let Some(path) = &cli.summary {
            report::write_summary(path, &report.ranks)?;
        }
    }
    Ok(())
}
