//! # Kernel covariance estimation
//!
//! The likelihood treats every model point as the centre of a 3-D Gaussian in
//! the normalized `[ra, dec, v]` space. All components share one covariance
//! (the *covariance bandwidth*), estimated once before sampling starts.
//!
//! ## Sources
//!
//! [`CovarianceSource`] selects how the bandwidth is obtained:
//!
//! - `FromData` – unbiased sample covariance of the normalized observations,
//! - `Fixed` – caller-supplied matrix,
//! - `Clustered` – observations ordered by position angle, split into
//!   contiguous clusters, pooled within-cluster covariance,
//! - `Diagonal` – mean squared normalized measurement error per axis.
//!
//! ## Singular matrices
//!
//! [`GaussianKernel`] never inverts the covariance directly. It diagonalizes
//! it, discards eigenvalues below a relative cutoff and evaluates the
//! density on the remaining subspace (pseudo-inverse and pseudo-determinant),
//! so a rank-deficient covariance still yields finite log-densities. A matrix
//! with no eigen-direction left carries no information and is rejected.
use itertools::Itertools;
use nalgebra::{Matrix3, SymmetricEigen, Vector3};

use crate::mcorbit_errors::McOrbitError;

/// ln(2π)
const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Strategy used to estimate the kernel covariance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CovarianceSource {
    FromData,
    Fixed(Matrix3<f64>),
    Clustered { clusters: usize },
    Diagonal,
}

impl CovarianceSource {
    /// Estimate the covariance for the normalized observations.
    ///
    /// Arguments
    /// -----------------
    /// * `points`: normalized observations.
    /// * `position_angles`: position angle of each observation (used by `Clustered` only).
    /// * `errors`: normalized measurement errors (used by `Diagonal` only).
    ///
    /// Return
    /// ----------
    /// * The 3×3 covariance, or an [`McOrbitError`] if it cannot be computed
    ///   (fewer than two samples per cluster, missing errors, non-finite matrix).
    pub fn estimate(
        &self,
        points: &[Vector3<f64>],
        position_angles: &[f64],
        errors: Option<&[Vector3<f64>]>,
    ) -> Result<Matrix3<f64>, McOrbitError> {
        let cov = match *self {
            CovarianceSource::FromData => sample_covariance(points)?,
            CovarianceSource::Fixed(m) => m,
            CovarianceSource::Clustered { clusters } => {
                clustered_covariance(points, position_angles, clusters)?
            }
            CovarianceSource::Diagonal => {
                let errors = errors.ok_or_else(|| {
                    McOrbitError::InvalidCovariance(
                        "diagonal covariance requires measurement errors".into(),
                    )
                })?;
                error_covariance(errors)?
            }
        };

        validate_covariance(&cov)?;
        Ok(cov)
    }
}

/// Unbiased sample covariance (`n - 1` denominator) of a point set.
pub fn sample_covariance(points: &[Vector3<f64>]) -> Result<Matrix3<f64>, McOrbitError> {
    let n = points.len();
    if n < 2 {
        return Err(McOrbitError::InsufficientSamples {
            needed: 2,
            found: n,
        });
    }

    Ok(scatter_matrix(points) / (n - 1) as f64)
}

/// Sum of outer products of deviations from the mean.
fn scatter_matrix(points: &[Vector3<f64>]) -> Matrix3<f64> {
    let mean = points.iter().fold(Vector3::zeros(), |acc, p| acc + p) / points.len() as f64;
    points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p - mean;
        acc + d * d.transpose()
    })
}

/// Pooled within-cluster covariance.
///
/// Observations are sorted by position angle and cut into `clusters`
/// contiguous groups of (nearly) equal size. Each group must hold at least
/// two points; the scatter matrices are summed and divided by `n - clusters`.
pub fn clustered_covariance(
    points: &[Vector3<f64>],
    position_angles: &[f64],
    clusters: usize,
) -> Result<Matrix3<f64>, McOrbitError> {
    if position_angles.len() != points.len() {
        return Err(McOrbitError::DimensionMismatch {
            expected: points.len(),
            found: position_angles.len(),
        });
    }
    if clusters == 0 {
        return Err(McOrbitError::InvalidCovariance(
            "cluster count must be at least 1".into(),
        ));
    }

    let n = points.len();
    if n < 2 * clusters {
        return Err(McOrbitError::InsufficientSamples {
            needed: 2 * clusters,
            found: n,
        });
    }

    let order: Vec<usize> = (0..n)
        .sorted_by(|&a, &b| position_angles[a].total_cmp(&position_angles[b]))
        .collect();

    let mut pooled = Matrix3::zeros();
    for c in 0..clusters {
        let start = c * n / clusters;
        let end = (c + 1) * n / clusters;
        let members: Vec<Vector3<f64>> = order[start..end].iter().map(|&i| points[i]).collect();
        pooled += scatter_matrix(&members);
    }

    Ok(pooled / (n - clusters) as f64)
}

/// Diagonal covariance built from the mean squared measurement error per axis.
pub fn error_covariance(errors: &[Vector3<f64>]) -> Result<Matrix3<f64>, McOrbitError> {
    if errors.is_empty() {
        return Err(McOrbitError::InsufficientSamples {
            needed: 1,
            found: 0,
        });
    }
    let mean_sq = errors
        .iter()
        .fold(Vector3::zeros(), |acc, e| acc + e.component_mul(e))
        / errors.len() as f64;
    Ok(Matrix3::from_diagonal(&mean_sq))
}

fn validate_covariance(cov: &Matrix3<f64>) -> Result<(), McOrbitError> {
    if !cov.iter().all(|c| c.is_finite()) {
        return Err(McOrbitError::InvalidCovariance(
            "matrix has non-finite entries".into(),
        ));
    }
    let asym = (cov - cov.transpose()).abs().max();
    if asym > 1e-9 * cov.abs().max().max(1.0) {
        return Err(McOrbitError::InvalidCovariance(
            "matrix is not symmetric".into(),
        ));
    }
    Ok(())
}

/// Multivariate normal log-density with a fixed, possibly singular, covariance.
///
/// The covariance `Σ = U diag(s) Uᵀ` is diagonalized once. Eigenvalues below
/// `1e6 · ε · max(s)` are treated as zero; the density lives on the span of the
/// remaining `rank` eigenvectors:
///
/// ```text
/// log p(x) = -½ (rank · ln 2π + ln pdet(Σ) + ‖W (x − μ)‖²),   W = diag(s⁺)^½ Uᵀ
/// ```
///
/// For a full-rank covariance this is the ordinary Gaussian log-density.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    whitening: Matrix3<f64>,
    log_norm: f64,
    rank: usize,
}

impl GaussianKernel {
    /// Diagonalize `cov` and precompute the whitening matrix and normalization.
    ///
    /// Return
    /// ----------
    /// * The kernel, or [`McOrbitError::InvalidCovariance`] if the matrix is
    ///   non-finite, has a significantly negative eigenvalue or has rank 0.
    pub fn new(cov: &Matrix3<f64>) -> Result<Self, McOrbitError> {
        validate_covariance(cov)?;

        let eigen = SymmetricEigen::new(*cov);
        let max_abs = eigen.eigenvalues.abs().max();
        let cutoff = 1e6 * f64::EPSILON * max_abs;

        if eigen.eigenvalues.iter().any(|&s| s < -cutoff) {
            return Err(McOrbitError::InvalidCovariance(
                "matrix is not positive semi-definite".into(),
            ));
        }

        let mut scale = Vector3::zeros();
        let mut log_pdet = 0.0;
        let mut rank = 0;
        for (k, &s) in eigen.eigenvalues.iter().enumerate() {
            if s > cutoff {
                scale[k] = 1.0 / s.sqrt();
                log_pdet += s.ln();
                rank += 1;
            }
        }
        if rank == 0 {
            return Err(McOrbitError::InvalidCovariance(
                "covariance has rank 0".into(),
            ));
        }

        let whitening = Matrix3::from_diagonal(&scale) * eigen.eigenvectors.transpose();

        Ok(GaussianKernel {
            whitening,
            log_norm: -0.5 * (rank as f64 * LN_2PI + log_pdet),
            rank,
        })
    }

    /// Log-density of a deviation `x − μ`.
    #[inline]
    pub fn log_pdf(&self, deviation: &Vector3<f64>) -> f64 {
        let z = self.whitening * deviation;
        self.log_norm - 0.5 * z.norm_squared()
    }

    /// Number of retained eigen-directions.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_singular(&self) -> bool {
        self.rank < 3
    }
}
