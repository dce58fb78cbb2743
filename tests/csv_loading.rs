use std::io::Write;

use camino::Utf8Path;
use tempfile::NamedTempFile;

use mcorbit::{
    constants::VELOCITY_ERROR_FLOOR,
    covariance::CovarianceSource,
    mcorbit_errors::McOrbitError,
    observation_set::ObservationSet,
    prior::{ParameterSpace, Parametrization},
    ReadyState,
};

mod common;
use common::{synthetic_sky_points, test_config, RING_THETA};

fn write_csv(rows: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(rows.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn utf8(file: &NamedTempFile) -> &Utf8Path {
    Utf8Path::from_path(file.path()).unwrap()
}

#[test]
fn load_with_errors_and_repair_velocity_floor() {
    let file = write_csv(
        "\
4.6498, -0.5063, 120.0, 1e-6, 1e-6, 0.0
4.6499, -0.5062, -40.0, 1e-6, 1e-6, nan
4.6500, -0.5061, 15.0, 1e-6, 1e-6, 3.0
",
    );

    let set = ObservationSet::from_csv_path(utf8(&file), VELOCITY_ERROR_FLOOR).unwrap();
    assert_eq!(set.len(), 3);

    let errors = set.errors().unwrap();
    assert_eq!(errors[0].z, VELOCITY_ERROR_FLOOR);
    assert_eq!(errors[1].z, VELOCITY_ERROR_FLOOR);
    assert_eq!(errors[2].z, 3.0);
}

#[test]
fn non_finite_velocity_is_rejected() {
    let file = write_csv("4.6498, -0.5063, 120.0\n4.6499, -0.5062, nan\n");
    assert_eq!(
        ObservationSet::from_csv_path(utf8(&file), VELOCITY_ERROR_FLOOR).unwrap_err(),
        McOrbitError::NonFiniteObservation(1)
    );
}

#[test]
fn non_finite_position_error_is_reported_as_error_column() {
    let file = write_csv("4.6498, -0.5063, 120.0, 1e-6, 1e-6, 2.0\n4.6499, -0.5062, 30.0, inf, 1e-6, 2.0\n");
    assert_eq!(
        ObservationSet::from_csv_path(utf8(&file), VELOCITY_ERROR_FLOOR).unwrap_err(),
        McOrbitError::NonFiniteMeasurementError(1)
    );
}

#[test]
fn empty_file_is_rejected() {
    let file = write_csv("# no data\n");
    assert_eq!(
        ObservationSet::from_csv_path(utf8(&file), VELOCITY_ERROR_FLOOR).unwrap_err(),
        McOrbitError::EmptyObservations
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let res = ObservationSet::from_csv_path(
        Utf8Path::new("/nonexistent/mcorbit/data.csv"),
        VELOCITY_ERROR_FLOOR,
    );
    assert!(matches!(res, Err(McOrbitError::IoError(_))));
}

#[test]
fn unparsable_value_is_a_csv_error() {
    let file = write_csv("4.6498, -0.5063, fast\n");
    let res = ObservationSet::from_csv_path(utf8(&file), VELOCITY_ERROR_FLOOR);
    assert!(matches!(res, Err(McOrbitError::CsvError(_))));
}

#[test]
fn csv_round_trip_into_diagonal_kernel() {
    let config = test_config();
    let rows: String = synthetic_sky_points(&RING_THETA, &config)
        .iter()
        .step_by(25)
        .map(|p| format!("{:.17e},{:.17e},{:.17e},1e-7,1e-7,5.0\n", p.x, p.y, p.z))
        .collect();
    let file = write_csv(&rows);

    let set = ObservationSet::from_csv_path(utf8(&file), config.velocity_error_floor).unwrap();
    assert_eq!(set.len(), 24);

    let state = ReadyState::build(
        &set,
        ParameterSpace::default_for(Parametrization::Apsides),
        CovarianceSource::Diagonal,
        &config,
    )
    .unwrap();
    assert!(state.likelihood().kernel().rank() == 3);
    assert!(state.log_prob(&RING_THETA).0.is_finite());
}
