use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode};
use rand::{rngs::StdRng, Rng, SeedableRng};

use graphmatch::frame::Frame;
use graphmatch::join;
use graphmatch::optimizer::{self, new_cancel_flag};
use graphmatch::types::{CandidateMatch, Graph, MatchParams};

/// A path query graph of length `n` and a target that contains the same
/// path plus extra noise nodes, with `branching` spurious candidates
/// attached to every query node to stress both cost refinement and the
/// branch-and-bound search's pruning.
fn gen_scenario(n: usize, branching: usize, seed: u64) -> (Graph, Graph, Vec<CandidateMatch>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let q_edges: Vec<(u32, u32)> = (0..n as u32 - 1).map(|i| (i, i + 1)).collect();
    let q = Graph::from_edges(n, &q_edges);

    let t_size = n * (branching + 1);
    let mut t_edges = q_edges.clone();
    for extra in n..t_size {
        let anchor = rng.gen::<usize>() % n;
        t_edges.push((anchor as u32, extra as u32));
    }
    let t = Graph::from_edges(t_size, &t_edges);

    let mut candidates = Vec::new();
    for u in 0..n as u32 {
        candidates.push(CandidateMatch { u, v: u, weight: 1.0 });
        for b in 0..branching {
            let v = (n + u as usize * branching + b) as u32;
            if (v as usize) < t_size {
                candidates.push(CandidateMatch { u, v, weight: 0.5 });
            }
        }
    }
    (q, t, candidates)
}

fn bench_optimizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimizer_pipeline");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(20);

    for &(n, branching) in &[(8usize, 2usize), (16, 3)] {
        let (q, t, candidates) = gen_scenario(n, branching, 0xDECA_DE00);
        let params = MatchParams { k: 3, ..MatchParams::default() };

        group.bench_with_input(BenchmarkId::new("refine_costs", format!("{n}x{branching}")), &n, |b, _| {
            b.iter(|| {
                let records = join::join(&q, &t, &candidates, params.h, None).unwrap();
                let mut frame = Frame::new(records).unwrap();
                let cancel = new_cancel_flag();
                let cost = optimizer::refine_costs(&mut frame, &candidates, &params, &cancel).unwrap();
                criterion::black_box(cost);
            });
        });

        group.bench_with_input(BenchmarkId::new("full_pipeline", format!("{n}x{branching}")), &n, |b, _| {
            b.iter(|| {
                let records = join::join(&q, &t, &candidates, params.h, None).unwrap();
                let mut frame = Frame::new(records).unwrap();
                let query_nodes: Vec<u32> = (0..n as u32).collect();
                let cancel = new_cancel_flag();
                let results = optimizer::optimize(&mut frame, &query_nodes, &candidates, &params, &cancel).unwrap();
                criterion::black_box(results);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_optimizer);
criterion_main!(benches);
