//! # Observed position-position-velocity data
//!
//! This module holds the **immutable observation set** a fit is run against and
//! the **normalization constants** that map physical observables into the
//! comparison space used by the likelihood kernel.
//!
//! ## Data model
//!
//! Each observation is a 3-vector `[ra, dec, v]`:
//!
//! - `ra`, `dec` – sky position in **radians**,
//! - `v` – line-of-sight velocity in **km/s** (moment-1 velocity of the gas).
//!
//! Optional per-point measurement errors (same units) and per-point weights
//! can be attached. Once built, an [`ObservationSet`] is never mutated.
//!
//! ## CSV input
//!
//! [`ObservationSet::from_csv_reader`] reads header-less rows of the form
//!
//! ```text
//! x, y, v[, x_err, y_err, v_err]
//! ```
//!
//! Zero or non-finite velocity errors are replaced by a floor value (see
//! [`VELOCITY_ERROR_FLOOR`](crate::constants::VELOCITY_ERROR_FLOOR)).
//! Non-finite positions or velocities cannot be repaired and are rejected.
//!
//! ## Normalization
//!
//! [`DataNormalization`] stores `data_min` and `data_scale = 1 / (max - min)`
//! per dimension and maps a point `p` to `(p - data_min) * data_scale * 2 - 1`,
//! i.e. the observed data spans `[-1, 1]` on every axis.
//!
//! ## See also
//! ------------
//! * [`ReadyState::build`](crate::log_prob::ReadyState::build) – Consumes an observation set.
//! * [`CovarianceSource`](crate::covariance::CovarianceSource) – Kernel bandwidth estimated from the normalized data.
use std::io::Read;

use camino::Utf8Path;
use itertools::{Itertools, MinMaxResult};
use nalgebra::Vector3;
use tracing::warn;

use crate::mcorbit_errors::McOrbitError;

/// Immutable ordered collection of `[ra, dec, v]` observations.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSet {
    points: Vec<Vector3<f64>>,
    errors: Option<Vec<Vector3<f64>>>,
    weights: Option<Vec<f64>>,
}

impl ObservationSet {
    /// Build an observation set from raw `[ra, dec, v]` points.
    ///
    /// Arguments
    /// -----------------
    /// * `points`: observations in (rad, rad, km/s).
    ///
    /// Return
    /// ----------
    /// * The observation set, or [`McOrbitError::EmptyObservations`] /
    ///   [`McOrbitError::NonFiniteObservation`] if the input is unusable.
    pub fn new(points: Vec<Vector3<f64>>) -> Result<Self, McOrbitError> {
        if points.is_empty() {
            return Err(McOrbitError::EmptyObservations);
        }
        if let Some(idx) = points.iter().position(|p| !p.iter().all(|c| c.is_finite())) {
            return Err(McOrbitError::NonFiniteObservation(idx));
        }

        Ok(ObservationSet {
            points,
            errors: None,
            weights: None,
        })
    }

    /// Attach per-point measurement errors (same units as the points).
    pub fn with_errors(mut self, errors: Vec<Vector3<f64>>) -> Result<Self, McOrbitError> {
        if errors.len() != self.points.len() {
            return Err(McOrbitError::DimensionMismatch {
                expected: self.points.len(),
                found: errors.len(),
            });
        }
        if let Some(idx) = errors.iter().position(|e| !e.iter().all(|c| c.is_finite())) {
            return Err(McOrbitError::NonFiniteMeasurementError(idx));
        }
        self.errors = Some(errors);
        Ok(self)
    }

    /// Attach per-point weights applied to each observation's log-probability.
    ///
    /// Weights must be finite and non-negative.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Result<Self, McOrbitError> {
        if weights.len() != self.points.len() {
            return Err(McOrbitError::DimensionMismatch {
                expected: self.points.len(),
                found: weights.len(),
            });
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(McOrbitError::InvalidWeights(
                "weights must be finite and non-negative".into(),
            ));
        }
        self.weights = Some(weights);
        Ok(self)
    }

    /// Read an observation set from a header-less CSV stream.
    ///
    /// Each row holds 3 (`x, y, v`) or 6 (`x, y, v, x_err, y_err, v_err`) values.
    ///
    /// Arguments
    /// -----------------
    /// * `reader`: any byte source.
    /// * `velocity_error_floor`: value substituted for zero or non-finite velocity errors.
    ///
    /// Return
    /// ----------
    /// * The observation set, with errors attached when every row carries 6 columns.
    ///
    /// See also
    /// ------------
    /// * [`ObservationSet::from_csv_path`] – Same, from a file.
    pub fn from_csv_reader<R: Read>(
        reader: R,
        velocity_error_floor: f64,
    ) -> Result<Self, McOrbitError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut points = Vec::new();
        let mut errors = Vec::new();
        let mut repaired = 0usize;

        for (idx, record) in csv_reader.deserialize::<Vec<f64>>().enumerate() {
            let row = record?;
            match row.len() {
                3 | 6 => {}
                n => {
                    return Err(McOrbitError::DimensionMismatch {
                        expected: 6,
                        found: n,
                    })
                }
            }

            let point = Vector3::new(row[0], row[1], row[2]);
            if !point.iter().all(|c| c.is_finite()) {
                return Err(McOrbitError::NonFiniteObservation(idx));
            }
            points.push(point);

            if row.len() == 6 {
                let mut v_err = row[5];
                if v_err == 0.0 || !v_err.is_finite() {
                    v_err = velocity_error_floor;
                    repaired += 1;
                }
                errors.push(Vector3::new(row[3], row[4], v_err));
            }
        }

        if repaired > 0 {
            warn!(
                repaired,
                floor = velocity_error_floor,
                "replaced degenerate velocity errors"
            );
        }

        let set = ObservationSet::new(points)?;
        if errors.is_empty() {
            Ok(set)
        } else {
            set.with_errors(errors)
        }
    }

    /// Read an observation set from a CSV file on disk.
    pub fn from_csv_path(
        path: &Utf8Path,
        velocity_error_floor: f64,
    ) -> Result<Self, McOrbitError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, velocity_error_floor)
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    pub fn errors(&self) -> Option<&[Vector3<f64>]> {
        self.errors.as_deref()
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Affine map from physical observables to the `[-1, 1]` comparison space.
///
/// Computed **once** from the observation set and reused verbatim for every
/// model point cloud, so that model and data live in the same space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataNormalization {
    pub data_min: Vector3<f64>,
    pub data_scale: Vector3<f64>,
}

impl DataNormalization {
    /// Compute `data_min` and `data_scale = 1 / (max - min)` per dimension.
    ///
    /// A dimension with zero extent (all observations share the same value)
    /// gets a scale of `1.0`.
    pub fn from_observations(observations: &ObservationSet) -> Self {
        let mut data_min = Vector3::zeros();
        let mut data_scale = Vector3::from_element(1.0);

        for dim in 0..3 {
            let (lo, hi) = match observations.points.iter().map(|p| p[dim]).minmax() {
                MinMaxResult::NoElements => (0.0, 0.0),
                MinMaxResult::OneElement(v) => (v, v),
                MinMaxResult::MinMax(lo, hi) => (lo, hi),
            };
            data_min[dim] = lo;
            if hi > lo {
                data_scale[dim] = 1.0 / (hi - lo);
            }
        }

        DataNormalization {
            data_min,
            data_scale,
        }
    }

    /// Map a physical point into the comparison space.
    #[inline]
    pub fn normalize(&self, point: &Vector3<f64>) -> Vector3<f64> {
        (point - self.data_min).component_mul(&self.data_scale) * 2.0 - Vector3::from_element(1.0)
    }

    /// Map an uncertainty (a length, not a position) into the comparison space.
    #[inline]
    pub fn normalize_error(&self, error: &Vector3<f64>) -> Vector3<f64> {
        error.component_mul(&self.data_scale) * 2.0
    }
}
