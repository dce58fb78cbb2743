//! # Log-probability orchestration
//!
//! [`ReadyState`] is the immutable bundle shared by every evaluation of a
//! fitting run: normalized observations, covariance kernel, prior, orbit
//! generator and projector. It is built once by [`ReadyState::build`] and then
//! only read, so a single instance can be evaluated from any number of
//! threads (see [`WalkerPool`](crate::pool::WalkerPool)).
//!
//! ## Evaluation contract
//!
//! [`ReadyState::log_prob`] returns `(log_posterior, log_prior)`, the pair an
//! ensemble sampler expects:
//!
//! | situation | result |
//! |---|---|
//! | theta outside the box, or `r_per > r_ap`, or `e ∉ [0, 1)` | `(−∞, −∞)` |
//! | orbit generator failure | `(−∞, log_prior)` |
//! | non-finite likelihood (e.g. sector mask empties the model) | `(−∞, log_prior)` |
//! | otherwise | `(log_prior + log_likelihood, log_prior)` |
//!
//! A prior reject short-circuits before the orbit generator is invoked.
use nalgebra::Vector3;
use tracing::{debug, trace};

use crate::{
    config::FitConfig,
    covariance::{CovarianceSource, GaussianKernel},
    likelihood::LikelihoodEngine,
    mcorbit_errors::McOrbitError,
    observation_set::{DataNormalization, ObservationSet},
    orbit::{OrbitGenerator, RadialOrbitIntegrator},
    prior::{OrbitShape, Orientation, ParameterSpace, PriorEvaluator},
    projection::{ModelPointCloud, OrbitProjector},
};

/// Read-only state of a fitting run.
#[derive(Debug)]
pub struct ReadyState<G: OrbitGenerator = RadialOrbitIntegrator> {
    observations: Vec<Vector3<f64>>,
    weights: Option<Vec<f64>>,
    prior: PriorEvaluator,
    generator: G,
    projector: OrbitProjector,
    likelihood: LikelihoodEngine,
}

impl ReadyState<RadialOrbitIntegrator> {
    /// Build the run state with the reference [`RadialOrbitIntegrator`].
    ///
    /// The integrator uses `config.mass_model`, `config.orbit_samples` and
    /// `config.integration_time`.
    ///
    /// See also
    /// ------------
    /// * [`ReadyState::build_with_generator`] – same, with a caller-supplied orbit generator.
    pub fn build(
        observations: &ObservationSet,
        parameter_space: ParameterSpace,
        covariance_source: CovarianceSource,
        config: &FitConfig,
    ) -> Result<Self, McOrbitError> {
        let generator = RadialOrbitIntegrator::new(
            config.mass_model,
            config.orbit_samples,
            config.integration_time,
        );
        Self::build_with_generator(
            observations,
            parameter_space,
            covariance_source,
            config,
            generator,
        )
    }
}

impl<G: OrbitGenerator> ReadyState<G> {
    /// Build the run state around an arbitrary orbit generator.
    ///
    /// Arguments
    /// -----------------
    /// * `observations`: the data, in physical units.
    /// * `parameter_space`: box bounds of theta.
    /// * `covariance_source`: how to obtain the kernel covariance.
    /// * `config`: projection, calibration and model settings.
    /// * `generator`: source of synthetic orbits.
    ///
    /// Return
    /// ----------
    /// * The ready state, or a construction error: empty data, too few
    ///   samples for the requested covariance, missing measurement errors,
    ///   or an invalid covariance matrix.
    pub fn build_with_generator(
        observations: &ObservationSet,
        parameter_space: ParameterSpace,
        covariance_source: CovarianceSource,
        config: &FitConfig,
        generator: G,
    ) -> Result<Self, McOrbitError> {
        if observations.is_empty() {
            return Err(McOrbitError::EmptyObservations);
        }

        let normalization = DataNormalization::from_observations(observations);
        let frame = config.sky_frame();

        let normalized: Vec<Vector3<f64>> = observations
            .points()
            .iter()
            .map(|p| normalization.normalize(p))
            .collect();
        let normalized_errors: Option<Vec<Vector3<f64>>> = observations
            .errors()
            .map(|errs| errs.iter().map(|e| normalization.normalize_error(e)).collect());
        let position_angles: Vec<f64> = observations
            .points()
            .iter()
            .map(|p| frame.position_angle(p.x, p.y))
            .collect();

        let covariance =
            covariance_source.estimate(&normalized, &position_angles, normalized_errors.as_deref())?;
        let kernel = GaussianKernel::new(&covariance)?;

        debug!(
            n_obs = normalized.len(),
            kernel_rank = kernel.rank(),
            ?covariance_source,
            "covariance kernel ready"
        );
        if kernel.is_singular() {
            debug!("singular covariance, density restricted to rank {}", kernel.rank());
        }

        let projector = OrbitProjector::new(
            frame,
            config.sector_mask(),
            normalization,
            config.subsample_stride,
        );
        let prior = PriorEvaluator::new(
            parameter_space,
            config.parametrization,
            config.mass_model,
        );

        debug!(
            parametrization = %config.parametrization,
            pa_min = config.pa_min,
            pa_max = config.pa_max,
            stride = config.subsample_stride,
            "log-probability state built"
        );

        Ok(ReadyState {
            observations: normalized,
            weights: observations.weights().map(|w| w.to_vec()),
            prior,
            generator,
            projector,
            likelihood: LikelihoodEngine::new(kernel, config.log_prob_scale),
        })
    }

    /// Normalized observations.
    pub fn observations(&self) -> &[Vector3<f64>] {
        &self.observations
    }

    pub fn prior(&self) -> &PriorEvaluator {
        &self.prior
    }

    pub fn projector(&self) -> &OrbitProjector {
        &self.projector
    }

    pub fn likelihood(&self) -> &LikelihoodEngine {
        &self.likelihood
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    fn model_cloud_for(
        &self,
        theta: &[f64],
        shape: &OrbitShape,
    ) -> Result<ModelPointCloud, McOrbitError> {
        let path = self.generator.generate(theta, shape)?;
        Ok(self
            .projector
            .project(&path, &Orientation::from_theta(theta)))
    }

    /// Normalized model cloud of an admissible theta, `None` if the prior rejects it.
    pub fn model_cloud(&self, theta: &[f64]) -> Result<Option<ModelPointCloud>, McOrbitError> {
        match self.prior.evaluate(theta) {
            (_, Some(shape)) => self.model_cloud_for(theta, &shape).map(Some),
            (_, None) => Ok(None),
        }
    }

    /// Evaluate `(log_posterior, log_prior)` for one theta.
    ///
    /// Never fails and never returns NaN: every rejection is reported as `−∞`
    /// (see the module documentation for the exact tuples).
    pub fn log_prob(&self, theta: &[f64]) -> (f64, f64) {
        let (log_prior, shape) = self.prior.evaluate(theta);
        let shape = match shape {
            Some(shape) if log_prior.is_finite() => shape,
            _ => {
                trace!(?theta, "prior reject");
                return (f64::NEG_INFINITY, f64::NEG_INFINITY);
            }
        };

        let model = match self.model_cloud_for(theta, &shape) {
            Ok(model) => model,
            Err(err) => {
                trace!(?theta, %err, "orbit generation failed");
                return (f64::NEG_INFINITY, log_prior);
            }
        };

        let log_likelihood =
            self.likelihood
                .log_likelihood(&self.observations, self.weights.as_deref(), &model);
        if !log_likelihood.is_finite() {
            trace!(?theta, n_model = model.len(), "non-finite likelihood");
            return (f64::NEG_INFINITY, log_prior);
        }

        (log_prior + log_likelihood, log_prior)
    }
}
