use std::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use hcp_contrast::{average_trials, frame_range, remove_region_mean_inplace, Frames};
use ndarray::Array2;

const N_REGIONS: usize = 360;
const N_T: usize = 405;
const TR: f64 = 0.72;

fn signal() -> Array2<f64> {
    Array2::from_shape_fn((N_REGIONS, N_T), |(r, t)| ((r * 31 + t * 7) % 97) as f64 * 0.01)
}

/// Eight 27 s blocks, spaced like a working-memory run.
fn blocks() -> Vec<Frames> {
    (0..8).map(|i| frame_range(8.0 + i as f64 * 34.0, 27.5, TR)).collect()
}

fn bench_remove_mean(c: &mut Criterion) {
    let ts = signal();
    c.bench_function("remove_region_mean [360×405]", |b| {
        b.iter(|| {
            let mut x = ts.clone();
            black_box(remove_region_mean_inplace(&mut x))
        })
    });
}

fn bench_average_trials(c: &mut Criterion) {
    let ts = signal();
    let trials = blocks();
    c.bench_function("average_trials 8 blocks [360×405]", |b| {
        b.iter(|| {
            let v = average_trials(black_box(&ts), black_box(&trials), "2bk_body").unwrap();
            black_box(v[0])
        })
    });
}

criterion_group!(benches, bench_remove_mean, bench_average_trials);
criterion_main!(benches);
