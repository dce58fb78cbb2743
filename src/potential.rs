//! # Central mass model
//!
//! Spherically symmetric gravitational potential around Sgr A*: a central
//! point mass, optionally embedded in a Hernquist stellar cusp.
//!
//! Units are parsecs, years and solar masses, so potentials are expressed in
//! pc²/yr² and gradients in pc/yr².
//!
//! ## Angular momentum from turning points
//!
//! A bound orbit with periapsis `r1` and apoapsis `r2` has the same energy at
//! both turning points, where the radial velocity vanishes:
//!
//! ```text
//! Φ(r1) + L²/(2 r1²) = Φ(r2) + L²/(2 r2²)
//! ⇒ L² = 2 (Φ(r2) − Φ(r1)) / (1/r1² − 1/r2²)
//! ```
//!
//! In the circular limit `r1 = r2 = r` this degenerates to `L² = r³ Φ'(r)`.
use crate::constants::{Parsec, SolarMass, EPS, GRAV, SGRA_MASS};

/// Hernquist density profile, `Φ(r) = −G M / (r + a)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HernquistCusp {
    pub mass: SolarMass,
    pub scale_radius: Parsec,
}

/// Point mass plus optional extended stellar component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassModel {
    pub central_mass: SolarMass,
    pub cusp: Option<HernquistCusp>,
}

impl Default for MassModel {
    fn default() -> Self {
        MassModel {
            central_mass: SGRA_MASS,
            cusp: None,
        }
    }
}

impl MassModel {
    pub fn point_mass(mass: SolarMass) -> Self {
        MassModel {
            central_mass: mass,
            cusp: None,
        }
    }

    pub fn with_cusp(mut self, mass: SolarMass, scale_radius: Parsec) -> Self {
        self.cusp = Some(HernquistCusp { mass, scale_radius });
        self
    }

    /// Gravitational potential at radius `r` (pc²/yr²).
    ///
    /// `potential(0) = −∞` and `potential(∞) = 0`.
    pub fn potential(&self, r: Parsec) -> f64 {
        let mut phi = -GRAV * self.central_mass / r;
        if let Some(cusp) = self.cusp {
            phi -= GRAV * cusp.mass / (r + cusp.scale_radius);
        }
        phi
    }

    /// Radial derivative of the potential, `dΦ/dr` (pc/yr²).
    ///
    /// `gradient(0) = +∞` and `gradient(∞) = 0`.
    pub fn gradient(&self, r: Parsec) -> f64 {
        let mut grad = GRAV * self.central_mass / (r * r);
        if let Some(cusp) = self.cusp {
            let d = r + cusp.scale_radius;
            grad += GRAV * cusp.mass / (d * d);
        }
        grad
    }

    /// Specific angular momentum (pc²/yr) of the orbit with turning points `r1 ≤ r2`.
    ///
    /// The result satisfies `r1³ Φ'(r1) ≤ L² ≤ r2³ Φ'(r2)`. Non-physical
    /// inputs (non-positive radii) produce a non-finite value that the
    /// prior rejects.
    pub fn angular_momentum(&self, r1: Parsec, r2: Parsec) -> f64 {
        if (r2 - r1).abs() <= EPS * r1.abs().max(1.0) {
            return (r1.powi(3) * self.gradient(r1)).sqrt();
        }
        let l_sq =
            2.0 * (self.potential(r2) - self.potential(r1)) / (r1.powi(-2) - r2.powi(-2));
        l_sq.sqrt()
    }
}
