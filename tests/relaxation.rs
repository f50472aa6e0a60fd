use std::collections::BTreeMap;

use rand::prelude::*;
use rand::rngs::StdRng;

use mosp_lamellar::comm::local::LocalGroup;
use mosp_lamellar::comm::Collective;
use mosp_lamellar::graph::store::PartitionStore;
use mosp_lamellar::graph::{Edge, Graph, VertexId};
use mosp_lamellar::partition::OwnerMap;
use mosp_lamellar::relax::{Coordinator, CutEdgePolicy, RelaxConfig, RelaxOutcome, Termination};
use mosp_lamellar::{MospError, ObjectiveVector, ParetoFront, Role};

type Fronts = BTreeMap<VertexId, Vec<ObjectiveVector>>;

fn ov(v: &[u64]) -> ObjectiveVector {
    ObjectiveVector::new(v.to_vec())
}

fn graph(n: usize, edges: &[(VertexId, VertexId, Vec<u64>)]) -> Graph {
    Graph::from_edges(
        n,
        2,
        edges.iter().map(|(u, v, w)| {
            (
                *u,
                Edge {
                    target: *v,
                    weights: ObjectiveVector::new(w.clone()),
                },
            )
        }),
    )
    .unwrap()
}

fn random_edges(n: usize, seed: u64) -> Vec<(VertexId, VertexId, Vec<u64>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut edges = Vec::new();
    for u in 0..n as VertexId {
        for v in 0..n as VertexId {
            if u != v && rng.gen_range(0, 10) < 3 {
                edges.push((u, v, vec![rng.gen_range(0, 6), rng.gen_range(0, 6)]));
            }
        }
    }
    edges
}

/// Run every rank to completion and merge the per-rank fronts.
fn solve(
    g: &Graph,
    owners: &OwnerMap,
    source: VertexId,
    ranks: usize,
    config: RelaxConfig,
    max_front: usize,
) -> (Vec<RelaxOutcome>, Fronts) {
    let results = LocalGroup::run(ranks, |comm| {
        let store = PartitionStore::build(g, owners.clone(), comm.rank(), ranks, source, max_front)
            .unwrap();
        let role = if comm.rank() == 0 { Role::Coordinator } else { Role::Worker };
        let outcome = Coordinator::new(&store, &comm, role, config.clone())
            .unwrap()
            .run()
            .unwrap();
        (outcome, store.final_fronts())
    });
    let mut outcomes = Vec::new();
    let mut fronts = Fronts::new();
    for (outcome, rank_fronts) in results {
        outcomes.push(outcome);
        fronts.extend(rank_fronts);
    }
    (outcomes, fronts)
}

/// Pareto sets over every simple path from `source`, by exhaustive search.
fn brute_force(n: usize, edges: &[(VertexId, VertexId, Vec<u64>)], source: VertexId) -> Fronts {
    fn walk(
        u: VertexId,
        acc: Vec<u64>,
        visited: &mut Vec<bool>,
        edges: &[(VertexId, VertexId, Vec<u64>)],
        found: &mut Vec<Vec<Vec<u64>>>,
    ) {
        found[u as usize].push(acc.clone());
        for (_, v, w) in edges.iter().filter(|(s, _, _)| *s == u) {
            if !visited[*v as usize] {
                visited[*v as usize] = true;
                let next = acc.iter().zip(w).map(|(a, b)| a + b).collect();
                walk(*v, next, visited, edges, found);
                visited[*v as usize] = false;
            }
        }
    }

    let mut found = vec![Vec::new(); n];
    let mut visited = vec![false; n];
    visited[source as usize] = true;
    walk(source, vec![0, 0], &mut visited, edges, &mut found);

    (0..n)
        .map(|v| {
            let mut front = ParetoFront::new(usize::MAX);
            for candidate in &found[v] {
                front.insert(ObjectiveVector::new(candidate.clone())).unwrap();
            }
            (v as VertexId, front.sorted())
        })
        .collect()
}

fn unbounded() -> RelaxConfig {
    RelaxConfig {
        max_iterations: 1000,
        ..RelaxConfig::default()
    }
}

#[test]
fn three_vertex_path() {
    let g = graph(3, &[(0, 1, vec![1, 2]), (1, 2, vec![2, 1])]);
    let (outcomes, fronts) = solve(&g, &OwnerMap::single(3), 0, 1, RelaxConfig::default(), 100);
    assert_eq!(outcomes[0].termination, Termination::Converged);
    assert_eq!(fronts[&0], vec![ov(&[0, 0])]);
    assert_eq!(fronts[&1], vec![ov(&[1, 2])]);
    assert_eq!(fronts[&2], vec![ov(&[3, 3])]);
}

#[test]
fn front_scenarios() {
    let mut front = ParetoFront::new(100);
    assert!(front.insert(ov(&[1, 5])).unwrap());
    assert!(front.insert(ov(&[5, 1])).unwrap());
    assert!(front.insert(ov(&[3, 3])).unwrap());
    assert_eq!(front.len(), 3);

    let mut front = ParetoFront::new(100);
    front.insert(ov(&[2, 2])).unwrap();
    front.insert(ov(&[1, 1])).unwrap();
    assert_eq!(front.members(), &[ov(&[1, 1])]);

    let mut front = ParetoFront::new(2);
    assert!(front.insert(ov(&[1, 3])).unwrap());
    assert!(front.insert(ov(&[3, 1])).unwrap());
    assert!(!front.insert(ov(&[2, 2])).unwrap());
    assert_eq!(front.len(), 2);
}

#[test]
fn single_partition_matches_brute_force() {
    for seed in 0..25 {
        let n = 7;
        let edges = random_edges(n, seed);
        let g = graph(n, &edges);
        let (outcomes, fronts) = solve(&g, &OwnerMap::single(n), 0, 1, unbounded(), 10_000);
        assert_eq!(outcomes[0].termination, Termination::Converged, "seed {seed}");
        assert!(outcomes[0].iterations <= n, "seed {seed}: {} rounds", outcomes[0].iterations);
        assert_eq!(fronts, brute_force(n, &edges, 0), "seed {seed}");
    }
}

#[test]
fn exchange_matches_brute_force_across_ranks() {
    for seed in 0..15 {
        let n = 8;
        let edges = random_edges(n, 100 + seed);
        let g = graph(n, &edges);
        let expected = brute_force(n, &edges, 0);
        let config = RelaxConfig {
            cut_edges: CutEdgePolicy::Exchange,
            ..unbounded()
        };
        for (ranks, owners) in [(2, OwnerMap::cyclic(n, 2)), (3, OwnerMap::block(n, 3))] {
            let (outcomes, fronts) = solve(&g, &owners, 0, ranks, config.clone(), 10_000);
            assert!(outcomes.iter().all(|o| o.termination == Termination::Converged));
            assert!(outcomes.iter().all(|o| o.global.discarded == 0));
            assert_eq!(fronts, expected, "seed {seed}, {ranks} ranks");
        }
    }
}

#[test]
fn discard_only_follows_edges_inside_the_source_partition() {
    for seed in 0..15 {
        let n = 8;
        let edges = random_edges(n, 200 + seed);
        let owners = OwnerMap::cyclic(n, 2);
        let g = graph(n, &edges);
        let internal: Vec<_> = edges
            .iter()
            .filter(|(u, v, _)| owners.owner(*u) == owners.owner(*v))
            .cloned()
            .collect();
        let (outcomes, fronts) = solve(&g, &owners, 0, 2, unbounded(), 10_000);
        assert_eq!(fronts, brute_force(n, &internal, 0), "seed {seed}");
        let cut_from_reached = edges
            .iter()
            .any(|(u, v, _)| owners.owner(*u) != owners.owner(*v) && !fronts[u].is_empty());
        assert_eq!(outcomes[0].global.discarded > 0, cut_from_reached, "seed {seed}");
    }
}

#[test]
fn ranks_agree_on_termination() {
    let n = 8;
    let edges = random_edges(n, 7);
    let g = graph(n, &edges);
    let (outcomes, _) = solve(&g, &OwnerMap::cyclic(n, 4), 0, 4, RelaxConfig::default(), 100);
    let first = &outcomes[0];
    for o in &outcomes {
        assert_eq!(o.iterations, first.iterations);
        assert_eq!(o.termination, first.termination);
        assert_eq!(o.global, first.global);
    }
    let local_sum: u64 = outcomes.iter().map(|o| o.local.insertions).sum();
    assert_eq!(local_sum, first.global.insertions);
}

#[test]
fn rounds_only_improve_fronts() {
    let n = 7;
    let edges = random_edges(n, 3);
    let g = graph(n, &edges);
    let owners = OwnerMap::single(n);
    let mut previous: Option<Fronts> = None;
    for rounds in 1..=n {
        let config = RelaxConfig {
            max_iterations: rounds,
            ..RelaxConfig::default()
        };
        let (_, fronts) = solve(&g, &owners, 0, 1, config, 10_000);
        if let Some(previous) = previous {
            for (v, old) in &previous {
                for x in old {
                    let kept = fronts[v]
                        .iter()
                        .any(|y| y == x || y.dominates(x).unwrap());
                    assert!(kept, "vertex {v} lost {x} after {rounds} rounds");
                }
            }
        }
        previous = Some(fronts);
    }
}

#[test]
fn capacity_is_reported_not_fatal() {
    // 0 fans out to four incomparable vectors at vertex 1
    let edges: Vec<_> = (0..4u64).map(|i| (0, 1, vec![i, 3 - i])).collect();
    let g = graph(2, &edges);
    let (outcomes, fronts) = solve(&g, &OwnerMap::single(2), 0, 1, RelaxConfig::default(), 2);
    assert_eq!(outcomes[0].termination, Termination::Converged);
    assert_eq!(fronts[&1].len(), 2);
    assert!(outcomes[0].global.capacity_rejections >= 2);
}

#[test]
fn zero_out_degree_source_converges_immediately() {
    let g = graph(3, &[(1, 2, vec![1, 1])]);
    let (outcomes, fronts) = solve(&g, &OwnerMap::cyclic(3, 3), 0, 3, RelaxConfig::default(), 100);
    assert!(outcomes.iter().all(|o| o.iterations == 1 && o.global.insertions == 0));
    assert_eq!(fronts[&0], vec![ov(&[0, 0])]);
    assert!(fronts[&1].is_empty() && fronts[&2].is_empty());
}

#[test]
fn error_constructors_are_public() {
    let io = MospError::io("<stdout>", std::io::Error::from(std::io::ErrorKind::BrokenPipe));
    assert!(io.to_string().contains("<stdout>"));
    let parse = MospError::parse("g.txt", 3, "bad token");
    assert!(matches!(parse, MospError::Parse { line: 3, .. }));
}
