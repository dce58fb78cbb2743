//! # mcorbit
//!
//! Log-probability engine for fitting orbits of gas streams around Sgr A* to
//! position-position-velocity data with an external MCMC sampler.
//!
//! The entry point is [`log_prob::ReadyState`]: build it once from an
//! [`observation_set::ObservationSet`], a [`prior::ParameterSpace`], a
//! [`covariance::CovarianceSource`] and a [`config::FitConfig`], then call
//! [`log_prob::ReadyState::log_prob`] for every candidate theta, possibly from
//! many threads through [`pool::WalkerPool`].
pub mod config;
pub mod constants;
pub mod covariance;
pub mod likelihood;
pub mod log_prob;
pub mod mcorbit_errors;
pub mod observation_set;
pub mod orbit;
pub mod pool;
pub mod potential;
pub mod prior;
pub mod projection;
pub mod scan_stats;

pub use config::FitConfig;
pub use log_prob::ReadyState;
pub use mcorbit_errors::McOrbitError;
