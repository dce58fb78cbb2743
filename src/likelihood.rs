//! # Gaussian-mixture likelihood
//!
//! Every point of a [`ModelPointCloud`] is the centre of an equally weighted
//! Gaussian component sharing one covariance. For each observation `x_j` the
//! mixture density is accumulated **in log space**:
//!
//! ```text
//! ln p_j = logsumexp_k ln N(x_j | m_k, Σ) − ln K + log_prob_scale
//! ln L   = Σ_j w_j · ln p_j
//! ```
//!
//! where `K` is the number of model points actually used and `w_j` the
//! optional observation weights (1 by default).
//!
//! The running per-observation value starts at `−∞` (zero probability) and is
//! combined with [`log_add_exp`], so very small densities never underflow to 0.
//! An empty model cloud has no support and yields `−∞` without evaluating
//! `ln 0`.
//!
//! Summation order is fixed (model points outer, observations inner, final
//! sum in observation order), so results are reproducible bit for bit.
use nalgebra::Vector3;

use crate::{covariance::GaussianKernel, projection::ModelPointCloud};

/// Stable `ln(eᵃ + eᵇ)`.
///
/// `−∞` is the neutral element; NaN inputs propagate.
#[inline]
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

/// Log-likelihood of `observations` under the mixture centred on `model`.
///
/// Arguments
/// -----------------
/// * `observations`: normalized observed points.
/// * `weights`: optional per-observation weights.
/// * `model`: normalized model point cloud (already subsampled).
/// * `kernel`: shared Gaussian component.
/// * `log_prob_scale`: calibration offset added to every observation's log-probability.
///
/// Return
/// ----------
/// * The total log-likelihood; `−∞` for an empty model cloud.
pub fn log_likelihood(
    observations: &[Vector3<f64>],
    weights: Option<&[f64]>,
    model: &ModelPointCloud,
    kernel: &GaussianKernel,
    log_prob_scale: f64,
) -> f64 {
    if model.is_empty() {
        return f64::NEG_INFINITY;
    }

    let mut log_probs = vec![f64::NEG_INFINITY; observations.len()];
    for m in model.points() {
        for (lp, x) in log_probs.iter_mut().zip(observations) {
            *lp = log_add_exp(*lp, kernel.log_pdf(&(x - m)));
        }
    }

    let offset = log_prob_scale - (model.len() as f64).ln();
    match weights {
        Some(w) => log_probs
            .iter()
            .zip(w)
            .map(|(lp, w)| w * (lp + offset))
            .sum(),
        None => log_probs.iter().map(|lp| lp + offset).sum(),
    }
}

/// Kernel and calibration shared by every evaluation of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct LikelihoodEngine {
    kernel: GaussianKernel,
    log_prob_scale: f64,
}

impl LikelihoodEngine {
    pub fn new(kernel: GaussianKernel, log_prob_scale: f64) -> Self {
        LikelihoodEngine {
            kernel,
            log_prob_scale,
        }
    }

    pub fn kernel(&self) -> &GaussianKernel {
        &self.kernel
    }

    pub fn log_prob_scale(&self) -> f64 {
        self.log_prob_scale
    }

    /// See [`log_likelihood`].
    pub fn log_likelihood(
        &self,
        observations: &[Vector3<f64>],
        weights: Option<&[f64]>,
        model: &ModelPointCloud,
    ) -> f64 {
        log_likelihood(
            observations,
            weights,
            model,
            &self.kernel,
            self.log_prob_scale,
        )
    }
}
