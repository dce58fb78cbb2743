//! # Fit configuration
//!
//! [`FitConfig`] gathers every tunable of a fitting run: file locations,
//! parametrization, sector mask, subsampling, calibration, orbit integration
//! settings and the sky reference frame. It is passed explicitly to
//! [`ReadyState::build`](crate::log_prob::ReadyState::build); nothing is read
//! from process-wide state.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mcorbit::config::FitConfig;
//!
//! let config = FitConfig::builder()
//!     .data_file("data/hcn_ring.csv")
//!     .pa_range(20.0, 160.0)
//!     .subsample_stride(4)
//!     .log_prob_scale(2.0_f64.ln())
//!     .build()
//!     .unwrap();
//! ```
use camino::Utf8PathBuf;
use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt;

use crate::{
    constants::{
        Degree, Parsec, Radian, Year, SGRA_DEC, SGRA_DISTANCE, SGRA_RA, VELOCITY_ERROR_FLOOR,
    },
    mcorbit_errors::McOrbitError,
    potential::MassModel,
    prior::Parametrization,
    projection::{SectorMask, SkyFrame},
};

/// Run configuration consumed by the orchestrator and the CLI.
///
/// Default values:
///
/// | field | default |
/// |---|---|
/// | `data_file` | `data.csv` |
/// | `output_dir` | `output` |
/// | `parametrization` | [`Parametrization::Apsides`] |
/// | `pa_min`, `pa_max` | `0`, `360` degrees |
/// | `subsample_stride` | `1` |
/// | `log_prob_scale` | `0` |
/// | `orbit_samples` | `2000` |
/// | `integration_time` | `1e5` years |
/// | `ra0`, `dec0`, `distance` | Sgr A* |
/// | `mass_model` | Sgr A* point mass |
/// | `velocity_error_floor` | `4e-2` km/s |
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    // --- I/O ---
    pub data_file: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,

    // --- Model ---
    pub parametrization: Parametrization,
    pub mass_model: MassModel,
    /// Number of points of every synthetic orbit.
    pub orbit_samples: usize,
    /// Time span covered by a synthetic orbit.
    pub integration_time: Year,

    // --- Projection ---
    pub ra0: Radian,
    pub dec0: Radian,
    pub distance: Parsec,
    pub pa_min: Degree,
    pub pa_max: Degree,
    /// Keep every n-th model point.
    pub subsample_stride: usize,

    // --- Likelihood ---
    pub log_prob_scale: f64,
    pub velocity_error_floor: f64,
}

impl FitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a [`FitConfigBuilder`] from the default values.
    pub fn builder() -> FitConfigBuilder {
        FitConfigBuilder::new()
    }

    pub fn sky_frame(&self) -> SkyFrame {
        SkyFrame {
            ra0: self.ra0,
            dec0: self.dec0,
            distance: self.distance,
        }
    }

    pub fn sector_mask(&self) -> SectorMask {
        SectorMask {
            pa_min: self.pa_min,
            pa_max: self.pa_max,
        }
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            data_file: Utf8PathBuf::from("data.csv"),
            output_dir: Utf8PathBuf::from("output"),

            parametrization: Parametrization::Apsides,
            mass_model: MassModel::default(),
            orbit_samples: 2000,
            integration_time: 1.0e5,

            ra0: SGRA_RA,
            dec0: SGRA_DEC,
            distance: SGRA_DISTANCE,
            pa_min: 0.0,
            pa_max: 360.0,
            subsample_stride: 1,

            log_prob_scale: 0.0,
            velocity_error_floor: VELOCITY_ERROR_FLOOR,
        }
    }
}

/// Builder for [`FitConfig`], with validation.
#[derive(Debug, Clone, Default)]
pub struct FitConfigBuilder {
    config: FitConfig,
}

impl FitConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: FitConfig::default(),
        }
    }

    // --- I/O ---
    pub fn data_file(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.config.data_file = v.into();
        self
    }
    pub fn output_dir(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.config.output_dir = v.into();
        self
    }

    // --- Model ---
    pub fn parametrization(mut self, v: Parametrization) -> Self {
        self.config.parametrization = v;
        self
    }
    pub fn mass_model(mut self, v: MassModel) -> Self {
        self.config.mass_model = v;
        self
    }
    pub fn orbit_samples(mut self, v: usize) -> Self {
        self.config.orbit_samples = v;
        self
    }
    pub fn integration_time(mut self, v: Year) -> Self {
        self.config.integration_time = v;
        self
    }

    // --- Projection ---
    pub fn reference_center(mut self, ra0: Radian, dec0: Radian) -> Self {
        self.config.ra0 = ra0;
        self.config.dec0 = dec0;
        self
    }
    pub fn distance(mut self, v: Parsec) -> Self {
        self.config.distance = v;
        self
    }
    pub fn pa_range(mut self, pa_min: Degree, pa_max: Degree) -> Self {
        self.config.pa_min = pa_min;
        self.config.pa_max = pa_max;
        self
    }
    pub fn subsample_stride(mut self, v: usize) -> Self {
        self.config.subsample_stride = v;
        self
    }

    // --- Likelihood ---
    pub fn log_prob_scale(mut self, v: f64) -> Self {
        self.config.log_prob_scale = v;
        self
    }
    pub fn velocity_error_floor(mut self, v: f64) -> Self {
        self.config.velocity_error_floor = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff lo <= x <= hi and comparable.
    #[inline]
    fn within(x: f64, lo: f64, hi: f64) -> bool {
        matches!(x.partial_cmp(&lo), Some(Greater) | Some(Equal))
            && matches!(x.partial_cmp(&hi), Some(Less) | Some(Equal))
    }

    /// Validate and produce the [`FitConfig`].
    ///
    /// Validation rules
    /// -----------------
    /// * `subsample_stride ≥ 1`, `orbit_samples ≥ 2`.
    /// * `integration_time > 0`, `distance > 0`, `velocity_error_floor > 0`.
    /// * `pa_min` and `pa_max` inside `[0, 360]`. `pa_min > pa_max` is accepted
    ///   and describes a sector wrapping through North.
    /// * `log_prob_scale` finite.
    /// * `dec0` inside `[-90°, 90°]`, `ra0` finite.
    /// * central mass `> 0`; a cusp needs a non-negative mass and a positive scale radius.
    ///
    /// Return
    /// ----------
    /// * `Ok(FitConfig)` or [`McOrbitError::InvalidConfig`] naming the first failed rule.
    pub fn build(self) -> Result<FitConfig, McOrbitError> {
        let c = &self.config;
        let invalid = |msg: &str| Err(McOrbitError::InvalidConfig(msg.into()));

        if c.subsample_stride == 0 {
            return invalid("subsample_stride must be >= 1");
        }
        if c.orbit_samples < 2 {
            return invalid("orbit_samples must be >= 2");
        }
        if !Self::gt0(c.integration_time) || !c.integration_time.is_finite() {
            return invalid("integration_time must be finite and > 0");
        }
        if !Self::gt0(c.distance) || !c.distance.is_finite() {
            return invalid("distance must be finite and > 0");
        }
        if !Self::gt0(c.velocity_error_floor) {
            return invalid("velocity_error_floor must be > 0");
        }
        if !Self::within(c.pa_min, 0.0, 360.0) || !Self::within(c.pa_max, 0.0, 360.0) {
            return invalid("pa_min and pa_max must lie in [0, 360] degrees");
        }
        if !c.log_prob_scale.is_finite() {
            return invalid("log_prob_scale must be finite");
        }
        if !c.ra0.is_finite() || !Self::within(c.dec0, -90f64.to_radians(), 90f64.to_radians()) {
            return invalid("reference center must be a valid (ra, dec) in radians");
        }
        if !Self::gt0(c.mass_model.central_mass) {
            return invalid("central mass must be > 0");
        }
        if let Some(cusp) = c.mass_model.cusp {
            if !Self::within(cusp.mass, 0.0, f64::MAX) || !Self::gt0(cusp.scale_radius) {
                return invalid("cusp mass must be >= 0 and scale radius > 0");
            }
        }

        Ok(self.config)
    }
}

impl fmt::Display for FitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit configuration")?;
        writeln!(f, "-----------------")?;
        writeln!(f, "  data_file            = {}", self.data_file)?;
        writeln!(f, "  output_dir           = {}", self.output_dir)?;
        writeln!(f, "  parametrization      = {}", self.parametrization)?;
        writeln!(
            f,
            "  central_mass         = {:.3e} Msun",
            self.mass_model.central_mass
        )?;
        if let Some(cusp) = self.mass_model.cusp {
            writeln!(
                f,
                "  cusp                 = {:.3e} Msun, a = {} pc",
                cusp.mass, cusp.scale_radius
            )?;
        }
        writeln!(f, "  orbit_samples        = {}", self.orbit_samples)?;
        writeln!(f, "  integration_time     = {:.3e} yr", self.integration_time)?;
        writeln!(
            f,
            "  reference_center     = ({:.6}, {:.6}) deg",
            self.ra0.to_degrees(),
            self.dec0.to_degrees()
        )?;
        writeln!(f, "  distance             = {} pc", self.distance)?;
        writeln!(f, "  pa_range             = [{}, {}] deg", self.pa_min, self.pa_max)?;
        writeln!(f, "  subsample_stride     = {}", self.subsample_stride)?;
        writeln!(f, "  log_prob_scale       = {}", self.log_prob_scale)?;
        write!(f, "  velocity_error_floor = {}", self.velocity_error_floor)
    }
}
