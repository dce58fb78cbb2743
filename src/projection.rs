//! # Projection of synthetic orbits into observable space
//!
//! [`OrbitProjector`] turns an [`OrbitPath`] into the [`ModelPointCloud`]
//! compared against the data:
//!
//! 1. **Orientation** – orbital-plane paths are rotated by
//!    `Rz(Ω) · Rx(i) · Rz(ω)` into the observer frame (x East, y North,
//!    z away from the observer). Paths already in the observer frame are used as is.
//! 2. **Sky mapping** – offsets in parsecs become angular offsets around the
//!    reference centre; the line-of-sight velocity is converted to km/s.
//! 3. **Sector mask** – the position angle (East of North) of every point is
//!    computed and only points inside `[pa_min, pa_max]` are kept.
//! 4. **Normalization** – retained points are mapped with the data's
//!    [`DataNormalization`].
//! 5. **Subsampling** – every `stride`-th retained point is kept.
//!
//! ## Position angle convention
//!
//! The raw angle `atan2(−Δδ, Δα cos δ₀)` is measured clockwise from East, in
//! `[0°, 360°)`. It is rotated into the astronomical East-of-North convention
//! by adding 90° below 270° and subtracting 270° at or above it, so North is 0°
//! and East is 90°.
use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::{
    constants::{Degree, Parsec, Radian, PC_PER_YR_TO_KM_PER_S},
    observation_set::DataNormalization,
    orbit::{OrbitPath, PathFrame},
    prior::Orientation,
};

/// Coordinate axis of an elementary rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Elementary rotation of angle `alpha` around `axis`, in the direct sense.
///
/// The matrix rotates vectors in a fixed frame (`x' = R · x`); it is not a
/// change of basis.
pub fn rotmt(alpha: Radian, axis: Axis) -> Matrix3<f64> {
    let axis = match axis {
        Axis::X => Vector3::x_axis(),
        Axis::Y => Vector3::y_axis(),
        Axis::Z => Vector3::z_axis(),
    };
    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// Rotation from the orbital plane to the observer frame.
pub fn orientation_matrix(orientation: &Orientation) -> Matrix3<f64> {
    rotmt(orientation.ascending_node_longitude, Axis::Z)
        * rotmt(orientation.inclination, Axis::X)
        * rotmt(orientation.periapsis_argument, Axis::Z)
}

/// Reference centre and distance used to map parsecs onto the sky.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyFrame {
    pub ra0: Radian,
    pub dec0: Radian,
    pub distance: Parsec,
}

impl SkyFrame {
    /// Position angle (degrees East of North) of a sky position around the centre.
    pub fn position_angle(&self, ra: Radian, dec: Radian) -> Degree {
        let east = (ra - self.ra0) * self.dec0.cos();
        let north = dec - self.dec0;
        let raw = (-north).atan2(east).to_degrees().rem_euclid(360.0);
        if raw < 270.0 {
            raw + 90.0
        } else {
            raw - 270.0
        }
    }

    /// Map an observer-frame position (pc) and velocity (pc/yr) to `[ra, dec, v]`.
    #[inline]
    pub fn to_sky(&self, position: &Vector3<f64>, velocity: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            self.ra0 + position.x / (self.distance * self.dec0.cos()),
            self.dec0 + position.y / self.distance,
            velocity.z * PC_PER_YR_TO_KM_PER_S,
        )
    }
}

/// Admissible range of position angles, in degrees.
///
/// When `pa_min > pa_max` the sector wraps through North (e.g. `[300, 60]`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorMask {
    pub pa_min: Degree,
    pub pa_max: Degree,
}

impl SectorMask {
    pub fn full() -> Self {
        SectorMask {
            pa_min: 0.0,
            pa_max: 360.0,
        }
    }

    #[inline]
    pub fn contains(&self, pa: Degree) -> bool {
        if self.pa_min <= self.pa_max {
            pa >= self.pa_min && pa <= self.pa_max
        } else {
            pa >= self.pa_min || pa <= self.pa_max
        }
    }
}

/// Synthetic `[ra, dec, v]` points of one orbit, in normalized space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelPointCloud {
    points: Vec<Vector3<f64>>,
}

impl ModelPointCloud {
    pub fn new(points: Vec<Vector3<f64>>) -> Self {
        ModelPointCloud { points }
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Keep every `stride`-th point, starting with the first one.
    pub fn subsample(self, stride: usize) -> Self {
        if stride <= 1 {
            return self;
        }
        ModelPointCloud {
            points: self.points.into_iter().step_by(stride).collect(),
        }
    }
}

/// Projects orbit paths into the normalized comparison space.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitProjector {
    frame: SkyFrame,
    sector: SectorMask,
    normalization: DataNormalization,
    stride: usize,
}

impl OrbitProjector {
    pub fn new(
        frame: SkyFrame,
        sector: SectorMask,
        normalization: DataNormalization,
        stride: usize,
    ) -> Self {
        OrbitProjector {
            frame,
            sector,
            normalization,
            stride: stride.max(1),
        }
    }

    pub fn frame(&self) -> &SkyFrame {
        &self.frame
    }

    pub fn normalization(&self) -> &DataNormalization {
        &self.normalization
    }

    /// Physical `[ra, dec, v]` of every path sample, before masking.
    pub fn sky_points(&self, path: &OrbitPath, orientation: &Orientation) -> Vec<Vector3<f64>> {
        let rot = match path.frame {
            PathFrame::OrbitalPlane => orientation_matrix(orientation),
            PathFrame::Observer => Matrix3::identity(),
        };
        path.positions
            .iter()
            .zip(&path.velocities)
            .map(|(p, v)| self.frame.to_sky(&(rot * p), &(rot * v)))
            .collect()
    }

    /// Project, mask, normalize and subsample a path.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: synthetic orbit from an [`OrbitGenerator`](crate::orbit::OrbitGenerator).
    /// * `orientation`: orientation angles of theta (ignored for observer-frame paths).
    ///
    /// Return
    /// ----------
    /// * The model cloud; empty when the sector mask rejects every point.
    pub fn project(&self, path: &OrbitPath, orientation: &Orientation) -> ModelPointCloud {
        let points = self
            .sky_points(path, orientation)
            .into_iter()
            .filter(|sky| self.sector.contains(self.frame.position_angle(sky.x, sky.y)))
            .map(|sky| self.normalization.normalize(&sky))
            .collect();

        ModelPointCloud::new(points).subsample(self.stride)
    }
}

#[cfg(test)]
mod projection_test {
    use super::*;
    use crate::constants::{SGRA_DEC, SGRA_DISTANCE, SGRA_RA};
    use approx::assert_relative_eq;

    fn frame() -> SkyFrame {
        SkyFrame {
            ra0: SGRA_RA,
            dec0: SGRA_DEC,
            distance: SGRA_DISTANCE,
        }
    }

    fn identity_norm() -> DataNormalization {
        DataNormalization {
            data_min: Vector3::from_element(-1.0),
            data_scale: Vector3::from_element(0.5),
        }
    }

    #[test]
    fn test_position_angle_cardinal_points() {
        let f = frame();
        let d = 1e-5;
        let cos_dec = f.dec0.cos();
        assert_relative_eq!(f.position_angle(f.ra0, f.dec0 + d), 0.0, epsilon = 1e-6);
        assert_relative_eq!(
            f.position_angle(f.ra0 + d / cos_dec, f.dec0),
            90.0,
            epsilon = 1e-6
        );
        assert_relative_eq!(f.position_angle(f.ra0, f.dec0 - d), 180.0, epsilon = 1e-6);
        assert_relative_eq!(
            f.position_angle(f.ra0 - d / cos_dec, f.dec0),
            270.0,
            epsilon = 1e-6
        );
        // North-East diagonal
        assert_relative_eq!(
            f.position_angle(f.ra0 + d / cos_dec, f.dec0 + d),
            45.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_position_angle_range() {
        let f = frame();
        for k in 0..360 {
            let a = (k as f64).to_radians();
            let pa = f.position_angle(
                f.ra0 + 1e-5 * a.sin() / f.dec0.cos(),
                f.dec0 + 1e-5 * a.cos(),
            );
            assert!((0.0..360.0).contains(&pa) || (pa - 360.0).abs() < 1e-9);
            let diff = (pa - k as f64).rem_euclid(360.0);
            assert!(diff < 1e-6 || diff > 360.0 - 1e-6);
        }
    }

    #[test]
    fn test_sector_mask_wraps() {
        let mask = SectorMask {
            pa_min: 300.0,
            pa_max: 60.0,
        };
        assert!(mask.contains(330.0));
        assert!(mask.contains(10.0));
        assert!(!mask.contains(180.0));

        let mask = SectorMask {
            pa_min: 90.0,
            pa_max: 180.0,
        };
        assert!(mask.contains(90.0));
        assert!(mask.contains(180.0));
        assert!(!mask.contains(200.0));
        assert!(SectorMask::full().contains(0.0));
    }

    #[test]
    fn test_face_on_orbit_has_no_radial_velocity() {
        let path = OrbitPath {
            frame: PathFrame::OrbitalPlane,
            positions: vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)],
            velocities: vec![Vector3::new(0.0, 1e-4, 0.0), Vector3::new(-1e-4, 0.0, 0.0)],
        };
        let face_on = Orientation {
            periapsis_argument: 0.0,
            ascending_node_longitude: 0.0,
            inclination: 0.0,
        };
        let projector = OrbitProjector::new(frame(), SectorMask::full(), identity_norm(), 1);
        for sky in projector.sky_points(&path, &face_on) {
            assert_eq!(sky.z, 0.0);
        }
    }

    #[test]
    fn test_edge_on_orbit_velocity_along_line_of_sight() {
        // i = 90°: orbital y axis maps onto the line of sight
        let path = OrbitPath {
            frame: PathFrame::OrbitalPlane,
            positions: vec![Vector3::new(1.0, 0.0, 0.0)],
            velocities: vec![Vector3::new(0.0, 1e-4, 0.0)],
        };
        let edge_on = Orientation {
            periapsis_argument: 0.0,
            ascending_node_longitude: 0.0,
            inclination: 90f64.to_radians(),
        };
        let projector = OrbitProjector::new(frame(), SectorMask::full(), identity_norm(), 1);
        let sky = projector.sky_points(&path, &edge_on);
        assert_relative_eq!(sky[0].z, 1e-4 * PC_PER_YR_TO_KM_PER_S, max_relative = 1e-12);
        assert_relative_eq!(
            sky[0].x,
            SGRA_RA + 1.0 / (SGRA_DISTANCE * SGRA_DEC.cos()),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_mask_rejecting_everything_gives_empty_cloud() {
        // single point due East
        let path = OrbitPath {
            frame: PathFrame::Observer,
            positions: vec![Vector3::new(1.0, 0.0, 0.0)],
            velocities: vec![Vector3::zeros()],
        };
        let west_only = SectorMask {
            pa_min: 200.0,
            pa_max: 340.0,
        };
        let projector = OrbitProjector::new(frame(), west_only, identity_norm(), 1);
        let orientation = Orientation {
            periapsis_argument: 1.0,
            ascending_node_longitude: 2.0,
            inclination: 3.0,
        };
        assert!(projector.project(&path, &orientation).is_empty());
    }

    #[test]
    fn test_normalization_applied() {
        let path = OrbitPath {
            frame: PathFrame::Observer,
            positions: vec![Vector3::zeros()],
            velocities: vec![Vector3::zeros()],
        };
        let f = frame();
        let norm = DataNormalization {
            data_min: Vector3::new(f.ra0 - 1.0, f.dec0 - 1.0, -10.0),
            data_scale: Vector3::new(0.5, 0.25, 0.05),
        };
        let projector = OrbitProjector::new(f, SectorMask::full(), norm, 1);
        let orientation = Orientation {
            periapsis_argument: 0.0,
            ascending_node_longitude: 0.0,
            inclination: 0.0,
        };
        let cloud = projector.project(&path, &orientation);
        assert_eq!(cloud.len(), 1);
        let p = cloud.points()[0];
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, -0.5, epsilon = 1e-12);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_subsample_stride() {
        let cloud = ModelPointCloud::new((0..10).map(|i| Vector3::new(i as f64, 0.0, 0.0)).collect());
        let sub = cloud.clone().subsample(3);
        let xs: Vec<f64> = sub.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 3.0, 6.0, 9.0]);
        assert_eq!(cloud.clone().subsample(1), cloud);
        assert_eq!(cloud.clone().subsample(0), cloud);
    }

    #[test]
    fn test_rotmt_is_orthonormal() {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let r = rotmt(0.7, axis);
            assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-14);
            assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_rotmt_direct_sense() {
        let quarter = std::f64::consts::FRAC_PI_2;
        assert_relative_eq!(
            rotmt(quarter, Axis::Z) * Vector3::x(),
            Vector3::y(),
            epsilon = 1e-15
        );
        assert_relative_eq!(
            rotmt(quarter, Axis::X) * Vector3::y(),
            Vector3::z(),
            epsilon = 1e-15
        );
        assert_relative_eq!(
            rotmt(quarter, Axis::Y) * Vector3::z(),
            Vector3::x(),
            epsilon = 1e-15
        );
    }
}
