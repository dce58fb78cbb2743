//! # Constants and type definitions for MCOrbit
//!
//! This module centralizes the **physical constants**, **unit conversions** and
//! **type aliases** shared by the likelihood engine.
//!
//! ## Overview
//!
//! - Gravitational constant and central mass in the (pc, yr, M☉) unit system
//! - Reference position of Sgr A* and its distance
//! - Unit conversions (pc/yr ↔ km/s, degrees ↔ radians)
//! - Canonical layout of the orbital parameter vector
//!
//! All dynamics are computed in **parsecs**, **years** and **solar masses**.
//! Observables are expressed in **radians** (sky position) and **km/s**
//! (line-of-sight velocity).

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// Newton's gravitational constant in pc³ · M☉⁻¹ · yr⁻²
pub const GRAV: f64 = 4.498_502_151_469_554e-15;

/// Mass of Sgr A* in solar masses
pub const SGRA_MASS: f64 = 4.0e6;

/// Distance to the Galactic centre in parsecs
pub const SGRA_DISTANCE: f64 = 8.0e3;

/// Right ascension of Sgr A* (J2000) in radians, 17h45m40.0409s
pub const SGRA_RA: f64 = 266.416_837_083_333_3 * RADEG;

/// Declination of Sgr A* (J2000) in radians, −29°00′28.118″
pub const SGRA_DEC: f64 = -29.007_810_555_555_56 * RADEG;

/// Conversion factor from pc/yr to km/s (Julian year)
pub const PC_PER_YR_TO_KM_PER_S: f64 = 977_792.221_680_789_1;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Floor applied to zero or missing velocity uncertainties (km/s)
pub const VELOCITY_ERROR_FLOOR: f64 = 4e-2;

/// Numerical epsilon used for floating-point comparisons
pub const EPS: f64 = 1e-12;

// -------------------------------------------------------------------------------------------------
// Parameter vector layout
// -------------------------------------------------------------------------------------------------

/// Number of orbital parameters in a theta vector
pub const N_PARAMS: usize = 5;

/// Index of the argument of periapsis (degrees)
pub const IDX_AOP: usize = 0;
/// Index of the longitude of the ascending node (degrees)
pub const IDX_LOAN: usize = 1;
/// Index of the inclination (degrees)
pub const IDX_INC: usize = 2;
/// Index of the inner shape parameter (periapsis radius, or semi-major axis)
pub const IDX_INNER: usize = 3;
/// Index of the outer shape parameter (apoapsis radius, or eccentricity)
pub const IDX_OUTER: usize = 4;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in parsecs
pub type Parsec = f64;
/// Time in years
pub type Year = f64;
/// Mass in solar masses
pub type SolarMass = f64;
