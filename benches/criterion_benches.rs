use criterion::{criterion_group, criterion_main, Benchmark, Criterion};

use sokoban_search::config::{HeuristicKind, Method};
use sokoban_search::solver::{self, Solver};
use sokoban_search::{Level, LoadLevel};

// allowing unused so i can bench just one or few
// and still notice other warnings if there are any
#[allow(unused)]
fn bench_heuristics(c: &mut Criterion) {
    for &kind in &HeuristicKind::ALL {
        bench_heuristic(c, kind, "levels/room.txt", 100);
    }
}

#[allow(unused)]
fn bench_beam_room(c: &mut Criterion) {
    bench_method(c, Method::Beam, "levels/room.txt", 20);
}

#[allow(unused)]
fn bench_lrta_backoff_room(c: &mut Criterion) {
    bench_method(c, Method::LrtaBackoff, "levels/room.txt", 20);
}

#[allow(unused)]
fn bench_lrta_restart_room(c: &mut Criterion) {
    bench_method(c, Method::LrtaRestart, "levels/room.txt", 20);
}

fn bench_heuristic(c: &mut Criterion, kind: HeuristicKind, level_path: &str, samples: usize) {
    let level = level_path.load_level().unwrap();
    let heuristic = kind.function();

    c.bench(
        "heuristics",
        Benchmark::new(format!("{} {}", kind, level_path), move |b| {
            b.iter(|| heuristic(criterion::black_box(&level)))
        })
        .sample_size(samples),
    );
}

fn bench_method(c: &mut Criterion, method: Method, level_path: &str, samples: usize) {
    let level = level_path.load_level().unwrap();
    let base = Solver::new(
        HeuristicKind::MinCost.function(),
        solver::all_moves::<Level>,
        solver::DEFAULT_MAX_ITERS,
    )
    .unwrap();

    c.bench(
        &format!("{}", method),
        Benchmark::new(level_path, move |b| {
            b.iter(|| {
                // same seed every time so all samples do the same work
                let mut search = solver::searcher(method, base.clone(), 20, 0).unwrap();
                search.solve(criterion::black_box(&level))
            })
        })
        .sample_size(samples),
    );
}

criterion_group!(
    benches,
    bench_heuristics,
    bench_beam_room,
    bench_lrta_backoff_room,
    bench_lrta_restart_room,
);
criterion_main!(benches);
