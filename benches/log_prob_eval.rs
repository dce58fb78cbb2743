use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use mcorbit::{
    config::FitConfig,
    covariance::CovarianceSource,
    observation_set::ObservationSet,
    orbit::RadialOrbitIntegrator,
    pool::WalkerPool,
    prior::{Orientation, ParameterSpace, Parametrization, PriorEvaluator},
    projection::orientation_matrix,
    ReadyState,
};

const TRUTH: [f64; 5] = [30.0, 60.0, 50.0, 1.0, 1.4];

/// Every 40th point of the orbit of `TRUTH`, as a mock data set.
fn mock_observations(config: &FitConfig) -> ObservationSet {
    let prior = PriorEvaluator::new(
        ParameterSpace::default_for(Parametrization::Apsides),
        Parametrization::Apsides,
        config.mass_model,
    );
    let shape = prior.evaluate(&TRUTH).1.unwrap();
    let path = RadialOrbitIntegrator::new(
        config.mass_model,
        config.orbit_samples,
        config.integration_time,
    )
    .integrate(&shape)
    .unwrap();

    let rot = orientation_matrix(&Orientation::from_theta(&TRUTH));
    let frame = config.sky_frame();
    let points = path
        .positions
        .iter()
        .zip(&path.velocities)
        .step_by(40)
        .map(|(p, v)| frame.to_sky(&(rot * p), &(rot * v)))
        .collect();
    ObservationSet::new(points).unwrap()
}

fn build_state(stride: usize) -> ReadyState {
    let config = FitConfig::builder()
        .subsample_stride(stride)
        .build()
        .unwrap();
    ReadyState::build(
        &mock_observations(&config),
        ParameterSpace::default_for(Parametrization::Apsides),
        CovarianceSource::FromData,
        &config,
    )
    .unwrap()
}

fn bench_single_eval(c: &mut Criterion) {
    for stride in [1, 4] {
        let state = build_state(stride);
        c.bench_function(&format!("log_prob/stride={stride}"), |b| {
            b.iter(|| black_box(state.log_prob(black_box(&TRUTH))))
        });
    }

    let state = build_state(1);
    c.bench_function("log_prob/prior_reject", |b| {
        b.iter(|| black_box(state.log_prob(black_box(&[30.0, 60.0, 50.0, 1.5, 1.0]))))
    });
}

fn bench_pool(c: &mut Criterion) {
    let state = build_state(4);
    let pool = WalkerPool::new(None).unwrap();
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);

    c.bench_function("walker_pool/64_walkers", |b| {
        b.iter_batched(
            || state.prior().space().sample_uniform(&mut rng, 64),
            |thetas| black_box(pool.evaluate(&state, &thetas)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_single_eval, bench_pool);
criterion_main!(benches);
