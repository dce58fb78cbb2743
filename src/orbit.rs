//! # Orbit generation
//!
//! The likelihood engine consumes orbits through the [`OrbitGenerator`] trait:
//! given an accepted theta and its [`OrbitShape`], a generator returns a
//! discretized [`OrbitPath`] of positions (pc) and velocities (pc/yr).
//!
//! A path is either expressed in the **orbital plane** (periapsis on the +x
//! axis, angular momentum along +z), in which case the projector applies the
//! orientation angles, or already in the **observer frame**.
//!
//! [`RadialOrbitIntegrator`] is the reference generator. It integrates the
//! planar equations of motion in a spherical [`MassModel`] with a fixed-step
//! fourth-order Runge–Kutta scheme:
//!
//! ```text
//! r̈ = L² / r³ − Φ'(r)
//! φ̇ = L / r²
//! ```
//!
//! starting at periapsis with zero radial velocity. The radius is clamped to
//! the turning points `[r_per, r_ap]` after each step, so a circular orbit
//! stays exactly circular.
use nalgebra::Vector3;

use crate::{
    constants::{Parsec, Year},
    mcorbit_errors::McOrbitError,
    potential::MassModel,
    prior::OrbitShape,
};

/// Coordinate frame of an [`OrbitPath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFrame {
    /// Orbital plane, orientation not yet applied.
    OrbitalPlane,
    /// Observer frame: x towards East, y towards North, z away from the observer.
    Observer,
}

/// Discretized orbit, one velocity per position.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitPath {
    pub frame: PathFrame,
    pub positions: Vec<Vector3<f64>>,
    pub velocities: Vec<Vector3<f64>>,
}

impl OrbitPath {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Distance of every sample from the central mass.
    pub fn radii(&self) -> impl Iterator<Item = Parsec> + '_ {
        self.positions.iter().map(|p| p.norm())
    }
}

/// Source of synthetic orbits.
///
/// Implementations must be deterministic for a fixed input and safe to call
/// from several threads at once.
pub trait OrbitGenerator: Send + Sync {
    /// Produce the orbit described by `theta` and its derived `shape`.
    fn generate(&self, theta: &[f64], shape: &OrbitShape) -> Result<OrbitPath, McOrbitError>;
}

/// State of the planar integration: radius, radial velocity, azimuth.
#[derive(Debug, Clone, Copy)]
struct PlanarState {
    r: f64,
    vr: f64,
    phi: f64,
}

/// Fixed-step RK4 integrator of planar orbits in a spherical potential.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialOrbitIntegrator {
    mass_model: MassModel,
    samples: usize,
    duration: Year,
    substeps: usize,
}

impl RadialOrbitIntegrator {
    /// Create an integrator producing `samples` points spread over `duration` years.
    ///
    /// Each output interval is split into `substeps` RK4 steps (default 8, see
    /// [`RadialOrbitIntegrator::with_substeps`]).
    pub fn new(mass_model: MassModel, samples: usize, duration: Year) -> Self {
        RadialOrbitIntegrator {
            mass_model,
            samples,
            duration,
            substeps: 8,
        }
    }

    pub fn with_substeps(mut self, substeps: usize) -> Self {
        self.substeps = substeps.max(1);
        self
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    fn derivative(&self, s: &PlanarState, l: f64) -> PlanarState {
        PlanarState {
            r: s.vr,
            vr: l * l / s.r.powi(3) - self.mass_model.gradient(s.r),
            phi: l / (s.r * s.r),
        }
    }

    fn rk4_step(&self, s: &PlanarState, l: f64, h: f64) -> PlanarState {
        let shift = |base: &PlanarState, k: &PlanarState, f: f64| PlanarState {
            r: base.r + f * k.r,
            vr: base.vr + f * k.vr,
            phi: base.phi + f * k.phi,
        };

        let k1 = self.derivative(s, l);
        let k2 = self.derivative(&shift(s, &k1, h / 2.0), l);
        let k3 = self.derivative(&shift(s, &k2, h / 2.0), l);
        let k4 = self.derivative(&shift(s, &k3, h), l);

        PlanarState {
            r: s.r + h / 6.0 * (k1.r + 2.0 * k2.r + 2.0 * k3.r + k4.r),
            vr: s.vr + h / 6.0 * (k1.vr + 2.0 * k2.vr + 2.0 * k3.vr + k4.vr),
            phi: s.phi + h / 6.0 * (k1.phi + 2.0 * k2.phi + 2.0 * k3.phi + k4.phi),
        }
    }

    /// Integrate the planar orbit and sample it.
    ///
    /// Arguments
    /// -----------------
    /// * `shape`: turning points and angular momentum.
    ///
    /// Return
    /// ----------
    /// * The sampled path in the orbital plane, or
    ///   [`McOrbitError::OrbitGeneration`] for a non-physical shape.
    pub fn integrate(&self, shape: &OrbitShape) -> Result<OrbitPath, McOrbitError> {
        let (r_min, r_max, l) = (shape.periapsis, shape.apoapsis, shape.angular_momentum);
        if !(r_min > 0.0 && r_min <= r_max && l.is_finite()) {
            return Err(McOrbitError::OrbitGeneration(format!(
                "invalid orbit shape: r_per={r_min}, r_ap={r_max}, L={l}"
            )));
        }
        if self.samples < 2 {
            return Err(McOrbitError::OrbitGeneration(
                "at least two samples are required".into(),
            ));
        }

        let h = self.duration / ((self.samples - 1) * self.substeps) as f64;
        let mut state = PlanarState {
            r: r_min,
            vr: 0.0,
            phi: 0.0,
        };

        let mut positions = Vec::with_capacity(self.samples);
        let mut velocities = Vec::with_capacity(self.samples);

        for i in 0..self.samples {
            if i > 0 {
                for _ in 0..self.substeps {
                    state = self.rk4_step(&state, l, h);
                    state.r = state.r.clamp(r_min, r_max);
                }
            }

            if !(state.r.is_finite() && state.vr.is_finite() && state.phi.is_finite()) {
                return Err(McOrbitError::OrbitGeneration(format!(
                    "integration diverged at sample {i}"
                )));
            }

            let (sin_phi, cos_phi) = state.phi.sin_cos();
            let phi_dot = l / (state.r * state.r);
            positions.push(Vector3::new(state.r * cos_phi, state.r * sin_phi, 0.0));
            velocities.push(Vector3::new(
                state.vr * cos_phi - state.r * phi_dot * sin_phi,
                state.vr * sin_phi + state.r * phi_dot * cos_phi,
                0.0,
            ));
        }

        Ok(OrbitPath {
            frame: PathFrame::OrbitalPlane,
            positions,
            velocities,
        })
    }
}

impl OrbitGenerator for RadialOrbitIntegrator {
    fn generate(&self, _theta: &[f64], shape: &OrbitShape) -> Result<OrbitPath, McOrbitError> {
        self.integrate(shape)
    }
}
