#![allow(dead_code)]

use mcorbit::{
    config::FitConfig,
    observation_set::ObservationSet,
    orbit::RadialOrbitIntegrator,
    prior::{Orientation, ParameterSpace, Parametrization, PriorEvaluator},
    projection::orientation_matrix,
};
use nalgebra::Vector3;

/// Theta of the synthetic ring used across the integration tests: a circular
/// orbit of radius 1 pc, inclined by 50°.
pub const RING_THETA: [f64; 5] = [30.0, 60.0, 50.0, 1.0, 1.0];

/// Small, fast configuration covering a bit more than one revolution at 1 pc.
pub fn test_config() -> FitConfig {
    FitConfig::builder()
        .orbit_samples(600)
        .integration_time(5.0e4)
        .build()
        .unwrap()
}

/// Sky points `[ra, dec, v]` of the orbit described by `theta`, as the
/// reference integrator and `config` would produce them, before masking.
pub fn synthetic_sky_points(theta: &[f64], config: &FitConfig) -> Vec<Vector3<f64>> {
    let prior = PriorEvaluator::new(
        ParameterSpace::default_for(Parametrization::Apsides),
        Parametrization::Apsides,
        config.mass_model,
    );
    let (_, shape) = prior.evaluate(theta);
    let shape = shape.expect("theta must be admissible");

    let path = RadialOrbitIntegrator::new(
        config.mass_model,
        config.orbit_samples,
        config.integration_time,
    )
    .integrate(&shape)
    .unwrap();

    let rot = orientation_matrix(&Orientation::from_theta(theta));
    let frame = config.sky_frame();
    path.positions
        .iter()
        .zip(&path.velocities)
        .map(|(p, v)| frame.to_sky(&(rot * p), &(rot * v)))
        .collect()
}

/// Observation set made of every `step`-th sky point of the orbit of `theta`.
pub fn synthetic_observations(theta: &[f64], config: &FitConfig, step: usize) -> ObservationSet {
    let points = synthetic_sky_points(theta, config)
        .into_iter()
        .step_by(step)
        .collect();
    ObservationSet::new(points).unwrap()
}

pub fn assert_rejected(result: (f64, f64)) {
    assert_eq!(result, (f64::NEG_INFINITY, f64::NEG_INFINITY));
}
