use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::hint::black_box;

use mosp_lamellar::comm::local::LocalGroup;
use mosp_lamellar::graph::store::PartitionStore;
use mosp_lamellar::partition::OwnerMap;
use mosp_lamellar::relax::{Coordinator, RelaxConfig};
use mosp_lamellar::synthetic::UndirectedGraph;
use mosp_lamellar::{ObjectiveVector, ParetoFront, Role};

const NUM_CANDIDATES: usize = 10_000;

fn candidates(dimension: usize, seed: u64) -> Vec<ObjectiveVector> {
    let mut rng: StdRng = SeedableRng::seed_from_u64(seed);
    (0..NUM_CANDIDATES)
        .map(|_| ObjectiveVector::new((0..dimension).map(|_| rng.gen_range(0, 1000)).collect()))
        .collect()
}

fn benchmark_front_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("front_insert");
    for &dimension in &[2, 3, 5] {
        let input = candidates(dimension, 42);
        for &capacity in &[16, 100, 1000] {
            group.bench_with_input(
                BenchmarkId::new(format!("k{dimension}"), capacity),
                &capacity,
                |b, &capacity| {
                    b.iter(|| {
                        let mut front = ParetoFront::new(capacity);
                        for candidate in &input {
                            black_box(front.try_insert(candidate.clone()).unwrap());
                        }
                        front.len()
                    })
                },
            );
        }
    }
    group.finish();
}

fn benchmark_relaxation(c: &mut Criterion) {
    let mut group = c.benchmark_group("relaxation");
    group.sample_size(10);
    for &nodes in &[1_000, 10_000] {
        let graph = UndirectedGraph::random(nodes, 4, 7).to_graph(2).unwrap();
        let owners = OwnerMap::single(nodes);
        group.bench_with_input(BenchmarkId::new("single_pe", nodes), &nodes, |b, _| {
            b.iter(|| {
                LocalGroup::run(1, |comm| {
                    let store =
                        PartitionStore::build(&graph, owners.clone(), 0, 1, 0, 100).unwrap();
                    Coordinator::new(&store, &comm, Role::Worker, RelaxConfig::default())
                        .unwrap()
                        .run()
                        .unwrap()
                        .iterations
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_front_insert, benchmark_relaxation);
criterion_main!(benches);
