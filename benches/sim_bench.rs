use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gravity_sim::{ForceMethod, Gravity, Universe, UniverseConfig, seed};

const BODIES: usize = 2_000;

fn setup_universe(config: UniverseConfig) -> Universe {
    let bodies = seed::galaxy(BODIES, Gravity::G);
    Universe::with_config(config, bodies).expect("valid benchmark configuration")
}

fn bench_theta(c: &mut Criterion) {
    let mut group = c.benchmark_group("barnes_hut_theta");
    group.sample_size(10);
    group.throughput(Throughput::Elements(BODIES as u64));

    for theta in [0.1f32, 0.25, 0.5, 1.0] {
        let mut universe = setup_universe(UniverseConfig {
            theta,
            ..UniverseConfig::default()
        });
        // Warmup
        universe.tick().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(theta), &theta, |b, _| {
            b.iter(|| universe.tick().unwrap());
        });
    }

    group.finish();
}

fn bench_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_method");
    group.sample_size(10);

    let presets = [
        ("barnes_hut", ForceMethod::BarnesHut, false),
        ("barnes_hut_rayon", ForceMethod::BarnesHut, true),
        ("direct_sum", ForceMethod::DirectSum, false),
    ];

    for (name, force_method, parallel) in presets {
        let mut universe = setup_universe(UniverseConfig {
            force_method,
            parallel,
            ..UniverseConfig::default()
        });
        universe.tick().unwrap();

        group.bench_function(name, |b| {
            b.iter(|| universe.tick().unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_theta, bench_methods);
criterion_main!(benches);
