use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use memcover::{
    merge_modules, CoverageMatrix, GreedyOptions, GreedySelector, InteractionGraph, MergeOptions,
};

/// Random instance: `n_items` items over `n_elements` elements, each item
/// covering ~5% of elements, ~6 edges per item with weights below 0.7.
fn build_instance(
    n_items: usize,
    n_elements: usize,
    seed: u64,
) -> (CoverageMatrix, InteractionGraph) {
    let mut rng = StdRng::seed_from_u64(seed);
    let sets: Vec<(String, Vec<usize>)> = (0..n_items)
        .map(|i| {
            let covered = (0..n_elements).filter(|_| rng.gen_bool(0.05)).collect();
            (format!("g{i:05}"), covered)
        })
        .collect();
    let matrix = CoverageMatrix::from_sets(n_elements, sets).unwrap();

    let edges: Vec<(String, String, f64)> = (0..n_items * 3)
        .map(|_| {
            let a = rng.gen_range(0..n_items);
            let b = rng.gen_range(0..n_items);
            (format!("g{a:05}"), format!("g{b:05}"), rng.gen_range(0.0..0.7))
        })
        .collect();
    let graph = InteractionGraph::from_edges(edges).unwrap();
    (matrix, graph)
}

fn bench_greedy(c: &mut Criterion) {
    let (matrix, graph) = build_instance(500, 200, 7);
    let options = GreedyOptions {
        k: 2,
        threshold: 0.5,
        ..GreedyOptions::default()
    };

    c.bench_function("greedy_500_items_k2", |b| {
        b.iter(|| {
            let selector = GreedySelector::new(&matrix, &graph, options.clone());
            black_box(selector.run().unwrap());
        });
    });
}

fn bench_merge(c: &mut Criterion) {
    let (matrix, graph) = build_instance(300, 120, 11);
    let options = GreedyOptions {
        threshold: 0.5,
        ..GreedyOptions::default()
    };
    let modules = GreedySelector::new(&matrix, &graph, options).run().unwrap().modules;
    let merge = MergeOptions {
        alpha: 0.0,
        threshold: 0.0,
    };

    c.bench_function("merge_greedy_modules", |b| {
        b.iter(|| black_box(merge_modules(&modules, &graph, &merge).unwrap()));
    });
}

criterion_group!(benches, bench_greedy, bench_merge);
criterion_main!(benches);
