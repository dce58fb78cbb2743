use thiserror::Error;

/// Construction-time failures of the fitting pipeline.
///
/// Per-evaluation outcomes (out-of-bounds parameters, empty model clouds,
/// singular covariances) are **not** errors: they are reported as
/// `f64::NEG_INFINITY` by [`ReadyState::log_prob`](crate::log_prob::ReadyState::log_prob).
#[derive(Error, Debug)]
pub enum McOrbitError {
    #[error("Observation set is empty")]
    EmptyObservations,

    #[error("Observation {0} contains a non-finite position or velocity")]
    NonFiniteObservation(usize),

    #[error("Observation {0} has a non-finite measurement error")]
    NonFiniteMeasurementError(usize),

    #[error("Not enough samples to estimate a covariance: needed {needed}, found {found}")]
    InsufficientSamples { needed: usize, found: usize },

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Invalid parameter space: {0}")]
    InvalidParameterSpace(String),

    #[error("Invalid covariance matrix: {0}")]
    InvalidCovariance(String),

    #[error("Invalid fit configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid observation weights: {0}")]
    InvalidWeights(String),

    #[error("Orbit generation failed: {0}")]
    OrbitGeneration(String),

    #[error("Unable to read observation file: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unable to start the worker pool: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
}

impl PartialEq for McOrbitError {
    fn eq(&self, other: &Self) -> bool {
        use McOrbitError::*;
        match (self, other) {
            (EmptyObservations, EmptyObservations) => true,
            (NonFiniteObservation(a), NonFiniteObservation(b)) => a == b,
            (NonFiniteMeasurementError(a), NonFiniteMeasurementError(b)) => a == b,
            (
                InsufficientSamples {
                    needed: n1,
                    found: f1,
                },
                InsufficientSamples {
                    needed: n2,
                    found: f2,
                },
            ) => n1 == n2 && f1 == f2,
            (
                DimensionMismatch {
                    expected: e1,
                    found: f1,
                },
                DimensionMismatch {
                    expected: e2,
                    found: f2,
                },
            ) => e1 == e2 && f1 == f2,
            (InvalidParameterSpace(a), InvalidParameterSpace(b)) => a == b,
            (InvalidCovariance(a), InvalidCovariance(b)) => a == b,
            (InvalidConfig(a), InvalidConfig(b)) => a == b,
            (InvalidWeights(a), InvalidWeights(b)) => a == b,
            (OrbitGeneration(a), OrbitGeneration(b)) => a == b,

            // wrapped errors are not comparable: equal when the variant matches
            (CsvError(_), CsvError(_)) => true,
            (IoError(_), IoError(_)) => true,
            (ThreadPoolError(_), ThreadPoolError(_)) => true,

            _ => false,
        }
    }
}
