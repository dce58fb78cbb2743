//! # Parameter space and flat prior
//!
//! A theta vector has [`N_PARAMS`] entries in canonical order:
//!
//! ```text
//! [aop, loan, inc, inner, outer]
//! ```
//!
//! where the three orientation angles are in **degrees** and `(inner, outer)`
//! is either `(r_per, r_ap)` in parsecs or `(a, e)` depending on the
//! [`Parametrization`].
//!
//! The prior is uniform over the admissible box. Anything outside the box, or
//! violating the shape ordering (`r_per ≤ r_ap`, `0 ≤ e < 1`), is a **hard
//! reject** reported as `log_prior = −∞`; it is never an error.
//!
//! On acceptance the evaluator also returns the [`OrbitShape`] (turning points
//! and angular momentum) the orbit generator needs.
use rand::Rng;
use std::fmt;

use crate::{
    constants::{
        Degree, Parsec, IDX_AOP, IDX_INC, IDX_INNER, IDX_LOAN, IDX_OUTER, N_PARAMS, RADEG,
    },
    mcorbit_errors::McOrbitError,
    potential::MassModel,
};

/// Meaning of the two shape entries of theta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parametrization {
    /// `theta[3] = r_per`, `theta[4] = r_ap` (pc)
    #[default]
    Apsides,
    /// `theta[3] = a` (pc), `theta[4] = e`
    SemiMajorEccentricity,
}

impl fmt::Display for Parametrization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parametrization::Apsides => write!(f, "apsides"),
            Parametrization::SemiMajorEccentricity => write!(f, "semi-major-eccentricity"),
        }
    }
}

impl std::str::FromStr for Parametrization {
    type Err = McOrbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apsides" | "rp-ra" => Ok(Parametrization::Apsides),
            "semi-major-eccentricity" | "a-e" | "ae" => Ok(Parametrization::SemiMajorEccentricity),
            _ => Err(McOrbitError::InvalidConfig(format!(
                "unknown parametrization: {s}"
            ))),
        }
    }
}

/// Box bounds `(min, max)` for every theta entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace {
    bounds: Vec<(f64, f64)>,
}

impl ParameterSpace {
    /// Build a parameter space from `(min, max)` pairs.
    ///
    /// Return
    /// ----------
    /// * [`McOrbitError::DimensionMismatch`] if there are not exactly [`N_PARAMS`] pairs,
    /// * [`McOrbitError::InvalidParameterSpace`] if a bound is non-finite or `min > max`.
    pub fn new(bounds: Vec<(f64, f64)>) -> Result<Self, McOrbitError> {
        if bounds.len() != N_PARAMS {
            return Err(McOrbitError::DimensionMismatch {
                expected: N_PARAMS,
                found: bounds.len(),
            });
        }
        for (i, &(lo, hi)) in bounds.iter().enumerate() {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(McOrbitError::InvalidParameterSpace(format!(
                    "bounds of parameter {i} must be finite"
                )));
            }
            if lo > hi {
                return Err(McOrbitError::InvalidParameterSpace(format!(
                    "parameter {i}: min {lo} > max {hi}"
                )));
            }
        }
        Ok(ParameterSpace { bounds })
    }

    /// Default search box for a parametrization.
    ///
    /// Orientation angles span `[0, 180]` degrees; radii span `0.1–2 pc`
    /// (periapsis) and `0.5–2 pc` (apoapsis), or `a ∈ [0.1, 2]`, `e ∈ [0, 0.99]`.
    pub fn default_for(parametrization: Parametrization) -> Self {
        let shape = match parametrization {
            Parametrization::Apsides => [(0.1, 2.0), (0.5, 2.0)],
            Parametrization::SemiMajorEccentricity => [(0.1, 2.0), (0.0, 0.99)],
        };
        ParameterSpace {
            bounds: vec![(0.0, 180.0), (0.0, 180.0), (0.0, 180.0), shape[0], shape[1]],
        }
    }

    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    pub fn dim(&self) -> usize {
        self.bounds.len()
    }

    /// Draw `n` vectors uniformly inside the box, e.g. to seed an ensemble of walkers.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|_| {
                self.bounds
                    .iter()
                    .map(|&(lo, hi)| lo + (hi - lo) * rng.random::<f64>())
                    .collect()
            })
            .collect()
    }
}

/// Orbit geometry derived from an accepted theta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitShape {
    pub periapsis: Parsec,
    pub apoapsis: Parsec,
    /// Specific angular momentum (pc²/yr).
    pub angular_momentum: f64,
}

/// Orientation of the orbital plane, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub periapsis_argument: f64,
    pub ascending_node_longitude: f64,
    pub inclination: f64,
}

impl Orientation {
    /// Read the three orientation angles (degrees) from theta.
    pub fn from_theta(theta: &[f64]) -> Self {
        let deg = |d: Degree| d * RADEG;
        Orientation {
            periapsis_argument: deg(theta[IDX_AOP]),
            ascending_node_longitude: deg(theta[IDX_LOAN]),
            inclination: deg(theta[IDX_INC]),
        }
    }
}

/// Flat prior over a [`ParameterSpace`] plus the orbit ordering constraints.
#[derive(Debug, Clone)]
pub struct PriorEvaluator {
    space: ParameterSpace,
    parametrization: Parametrization,
    mass_model: MassModel,
    log_volume: f64,
}

impl PriorEvaluator {
    pub fn new(
        space: ParameterSpace,
        parametrization: Parametrization,
        mass_model: MassModel,
    ) -> Self {
        // degenerate (min == max) dimensions are fixed parameters and carry no density
        let log_volume = space
            .bounds
            .iter()
            .filter(|(lo, hi)| hi > lo)
            .map(|(lo, hi)| (1.0 / (hi - lo)).ln())
            .sum();

        PriorEvaluator {
            space,
            parametrization,
            mass_model,
            log_volume,
        }
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn parametrization(&self) -> Parametrization {
        self.parametrization
    }

    /// Evaluate the log-prior of theta.
    ///
    /// Arguments
    /// -----------------
    /// * `theta`: candidate parameter vector.
    ///
    /// Return
    /// ----------
    /// * `(log_prior, Some(shape))` when theta is admissible,
    /// * `(−∞, None)` when theta has the wrong length, leaves the box, or
    ///   violates the ordering constraint.
    pub fn evaluate(&self, theta: &[f64]) -> (f64, Option<OrbitShape>) {
        const REJECT: (f64, Option<OrbitShape>) = (f64::NEG_INFINITY, None);

        if theta.len() != self.space.dim() {
            return REJECT;
        }
        let in_box = theta
            .iter()
            .zip(&self.space.bounds)
            .all(|(x, &(lo, hi))| (lo..=hi).contains(x));
        if !in_box {
            return REJECT;
        }

        match self.orbit_shape(theta[IDX_INNER], theta[IDX_OUTER]) {
            Some(shape) => (self.log_volume, Some(shape)),
            None => REJECT,
        }
    }

    /// Turning points and angular momentum, or `None` if the ordering
    /// constraint fails or the shape is non-physical.
    fn orbit_shape(&self, inner: f64, outer: f64) -> Option<OrbitShape> {
        let (periapsis, apoapsis) = match self.parametrization {
            Parametrization::Apsides => {
                if inner > outer {
                    return None;
                }
                (inner, outer)
            }
            Parametrization::SemiMajorEccentricity => {
                if !(0.0..1.0).contains(&outer) {
                    return None;
                }
                (inner * (1.0 - outer), inner * (1.0 + outer))
            }
        };

        if periapsis <= 0.0 {
            return None;
        }

        let angular_momentum = self.mass_model.angular_momentum(periapsis, apoapsis);
        if !angular_momentum.is_finite() {
            return None;
        }

        Some(OrbitShape {
            periapsis,
            apoapsis,
            angular_momentum,
        })
    }
}

#[cfg(test)]
mod prior_test {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn evaluator() -> PriorEvaluator {
        PriorEvaluator::new(
            ParameterSpace::default_for(Parametrization::Apsides),
            Parametrization::Apsides,
            MassModel::default(),
        )
    }

    #[test]
    fn test_space_validation() {
        assert!(matches!(
            ParameterSpace::new(vec![(0.0, 1.0); 4]),
            Err(McOrbitError::DimensionMismatch {
                expected: 5,
                found: 4
            })
        ));
        let mut bounds = vec![(0.0, 1.0); 5];
        bounds[2] = (2.0, 1.0);
        assert!(matches!(
            ParameterSpace::new(bounds),
            Err(McOrbitError::InvalidParameterSpace(_))
        ));
    }

    #[test]
    fn test_flat_prior_value() {
        let (lp, shape) = evaluator().evaluate(&[90.0, 45.0, 30.0, 0.8, 1.2]);
        let expected = 3.0 * (1.0_f64 / 180.0).ln() + (1.0_f64 / 1.9).ln() + (1.0_f64 / 1.5).ln();
        assert_relative_eq!(lp, expected, epsilon = 1e-12);

        let shape = shape.unwrap();
        assert_eq!(shape.periapsis, 0.8);
        assert_eq!(shape.apoapsis, 1.2);
        assert!(shape.angular_momentum > 0.0);
    }

    #[test]
    fn test_out_of_box_rejected() {
        let eval = evaluator();
        for theta in [
            [-1.0, 45.0, 30.0, 0.8, 1.2],
            [90.0, 181.0, 30.0, 0.8, 1.2],
            [90.0, 45.0, 30.0, 0.05, 1.2],
            [90.0, 45.0, 30.0, 0.8, 2.5],
            [f64::NAN, 45.0, 30.0, 0.8, 1.2],
        ] {
            assert_eq!(eval.evaluate(&theta), (f64::NEG_INFINITY, None));
        }
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(
            evaluator().evaluate(&[90.0, 45.0, 30.0]),
            (f64::NEG_INFINITY, None)
        );
    }

    #[test]
    fn test_periapsis_beyond_apoapsis_rejected() {
        assert_eq!(
            evaluator().evaluate(&[90.0, 45.0, 30.0, 1.5, 1.0]),
            (f64::NEG_INFINITY, None)
        );
    }

    #[test]
    fn test_circular_orbit_accepted() {
        let (lp, shape) = evaluator().evaluate(&[90.0, 45.0, 30.0, 1.0, 1.0]);
        assert!(lp.is_finite());
        let shape = shape.unwrap();
        assert_eq!(shape.periapsis, shape.apoapsis);
    }

    #[test]
    fn test_semi_major_eccentricity() {
        let eval = PriorEvaluator::new(
            ParameterSpace::new(vec![
                (0.0, 180.0),
                (0.0, 180.0),
                (0.0, 180.0),
                (0.1, 2.0),
                (0.0, 1.0),
            ])
            .unwrap(),
            Parametrization::SemiMajorEccentricity,
            MassModel::default(),
        );

        let (lp, shape) = eval.evaluate(&[10.0, 20.0, 30.0, 1.0, 0.5]);
        assert!(lp.is_finite());
        let shape = shape.unwrap();
        assert_relative_eq!(shape.periapsis, 0.5);
        assert_relative_eq!(shape.apoapsis, 1.5);

        // e = 1 is inside the box but unbound
        assert_eq!(
            eval.evaluate(&[10.0, 20.0, 30.0, 1.0, 1.0]),
            (f64::NEG_INFINITY, None)
        );
    }

    #[test]
    fn test_degenerate_dimension_is_fixed() {
        let mut bounds = vec![(0.0, 180.0); 3];
        bounds.push((1.0, 1.0));
        bounds.push((1.0, 2.0));
        let eval = PriorEvaluator::new(
            ParameterSpace::new(bounds).unwrap(),
            Parametrization::Apsides,
            MassModel::default(),
        );
        let (lp, _) = eval.evaluate(&[0.0, 0.0, 0.0, 1.0, 1.5]);
        assert_relative_eq!(lp, 3.0 * (1.0_f64 / 180.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_sample_uniform_in_bounds() {
        let space = ParameterSpace::default_for(Parametrization::Apsides);
        let mut rng = StdRng::seed_from_u64(7);
        let walkers = space.sample_uniform(&mut rng, 100);
        assert_eq!(walkers.len(), 100);
        for w in &walkers {
            assert_eq!(w.len(), N_PARAMS);
            for (x, &(lo, hi)) in w.iter().zip(space.bounds()) {
                assert!(*x >= lo && *x <= hi);
            }
        }
    }

    #[test]
    fn test_parametrization_from_str() {
        assert_eq!(
            "a-e".parse::<Parametrization>().unwrap(),
            Parametrization::SemiMajorEccentricity
        );
        assert!("ellipse".parse::<Parametrization>().is_err());
    }
}
