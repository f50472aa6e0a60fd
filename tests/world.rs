//! A real (single PE) Lamellar world driving a full run.

use std::fs;

use mosp_lamellar::comm::world::WorldComm;
use mosp_lamellar::comm::{Collective, Delivery};
use mosp_lamellar::relax::CutEdgePolicy;
use mosp_lamellar::session::{self, RunConfig};
use mosp_lamellar::{ObjectiveVector, Termination};

// One world per process, so everything lives in a single test.
#[test]
fn single_pe_world() {
    let world = lamellar::LamellarWorldBuilder::new().build();
    let comm = WorldComm::new(&world).unwrap();
    assert_eq!(comm.rank(), 0);
    assert_eq!(comm.num_ranks(), 1);

    assert_eq!(comm.sum(&[3, 4]), vec![3, 4]);
    assert_eq!(comm.sum(&[1, 1]), vec![1, 1]);
    assert_eq!(comm.broadcast(0, Some(vec![9, 8])), vec![9, 8]);
    let delivery = Delivery {
        target: 2,
        objectives: ObjectiveVector::unit(2),
        saturated: false,
    };
    assert_eq!(comm.exchange(vec![vec![delivery.clone()]]), vec![delivery]);
    assert!(comm.exchange(vec![Vec::new()]).is_empty());

    let dir = tempfile::tempdir().unwrap();
    let graph = dir.path().join("g.txt");
    let parts = dir.path().join("g.part");
    fs::write(&graph, "3 2\n0 1:1,2\n1 2:2,1\n").unwrap();
    fs::write(&parts, "0\n0\n0\n").unwrap();
    let mut config = RunConfig::new(&graph, &parts);
    config.relax.cut_edges = CutEdgePolicy::Exchange;

    let report = session::run(&comm, &config).unwrap();
    assert_eq!(report.metrics.termination, Termination::Converged);
    assert_eq!(report.fronts[2].1, vec![ObjectiveVector::new(vec![3, 3])]);
    assert_eq!(report.metrics.global_front_entries, 3);
}
