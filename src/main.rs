use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use nalgebra::Matrix3;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use mcorbit::{
    config::FitConfig,
    constants::N_PARAMS,
    covariance::CovarianceSource,
    observation_set::ObservationSet,
    pool::WalkerPool,
    potential::MassModel,
    prior::{ParameterSpace, Parametrization},
    scan_stats::{fmt_rate, ScanStats},
    McOrbitError, ReadyState,
};

#[derive(Parser)]
#[command(name = "mcorbit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    fit: FitArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate (log_posterior, log_prior) for one parameter vector
    Eval {
        /// aop,loan,inc,inner,outer (angles in degrees)
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        theta: Vec<f64>,
    },
    /// Evaluate uniformly drawn walkers and report the best one
    Scan {
        #[arg(long, default_value = "256")]
        walkers: usize,

        #[arg(long, default_value = "42")]
        seed: u64,

        /// Worker threads (all CPUs when omitted)
        #[arg(long)]
        threads: Option<usize>,

        /// Walkers evaluated between two progress updates
        #[arg(long, default_value = "32")]
        batch: usize,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CovarianceKind {
    /// Sample covariance of the data
    Data,
    /// Pooled covariance of position-angle clusters
    Clustered,
    /// Mean squared measurement errors
    Diagonal,
    /// Isotropic kernel of width --bandwidth
    Fixed,
}

#[derive(Args)]
struct FitArgs {
    /// CSV file with x,y,v[,x_err,y_err,v_err] rows
    #[arg(long, global = true, env = "MCORBIT_DATA", default_value = "data.csv")]
    data: Utf8PathBuf,

    #[arg(long, global = true, env = "MCORBIT_OUTPUT_DIR", default_value = "output")]
    output_dir: Utf8PathBuf,

    /// apsides (r_per, r_ap) or a-e
    #[arg(long, global = true, default_value = "apsides")]
    parametrization: Parametrization,

    /// lo,hi pairs for the five parameters (defaults depend on the parametrization)
    #[arg(long, global = true, value_delimiter = ',', allow_hyphen_values = true)]
    bounds: Option<Vec<f64>>,

    #[arg(long, global = true, default_value = "0")]
    pa_min: f64,

    #[arg(long, global = true, default_value = "360")]
    pa_max: f64,

    #[arg(long, global = true, default_value = "1")]
    stride: usize,

    #[arg(long, global = true, default_value = "0", allow_negative_numbers = true)]
    log_prob_scale: f64,

    #[arg(long, global = true, default_value = "2000")]
    orbit_samples: usize,

    /// Years
    #[arg(long, global = true, default_value = "1e5")]
    integration_time: f64,

    /// Hernquist cusp mass (Msun), requires --cusp-radius
    #[arg(long, global = true, requires = "cusp_radius")]
    cusp_mass: Option<f64>,

    /// Hernquist cusp scale radius (pc)
    #[arg(long, global = true)]
    cusp_radius: Option<f64>,

    #[arg(long, global = true, value_enum, default_value = "data")]
    covariance: CovarianceKind,

    #[arg(long, global = true, default_value = "4")]
    clusters: usize,

    /// Kernel width in normalized units, for --covariance fixed
    #[arg(long, global = true, default_value = "0.05")]
    bandwidth: f64,
}

impl FitArgs {
    fn config(&self) -> Result<FitConfig, McOrbitError> {
        let mut mass_model = MassModel::default();
        if let (Some(mass), Some(radius)) = (self.cusp_mass, self.cusp_radius) {
            mass_model = mass_model.with_cusp(mass, radius);
        }

        FitConfig::builder()
            .data_file(self.data.clone())
            .output_dir(self.output_dir.clone())
            .parametrization(self.parametrization)
            .mass_model(mass_model)
            .pa_range(self.pa_min, self.pa_max)
            .subsample_stride(self.stride)
            .log_prob_scale(self.log_prob_scale)
            .orbit_samples(self.orbit_samples)
            .integration_time(self.integration_time)
            .build()
    }

    fn parameter_space(&self) -> Result<ParameterSpace, McOrbitError> {
        match &self.bounds {
            Some(flat) if flat.len() == 2 * N_PARAMS => {
                ParameterSpace::new(flat.chunks_exact(2).map(|b| (b[0], b[1])).collect())
            }
            Some(flat) => Err(McOrbitError::DimensionMismatch {
                expected: 2 * N_PARAMS,
                found: flat.len(),
            }),
            None => Ok(ParameterSpace::default_for(self.parametrization)),
        }
    }

    fn covariance_source(&self) -> CovarianceSource {
        match self.covariance {
            CovarianceKind::Data => CovarianceSource::FromData,
            CovarianceKind::Clustered => CovarianceSource::Clustered {
                clusters: self.clusters,
            },
            CovarianceKind::Diagonal => CovarianceSource::Diagonal,
            CovarianceKind::Fixed => {
                CovarianceSource::Fixed(Matrix3::identity() * self.bandwidth.powi(2))
            }
        }
    }
}

#[derive(Serialize)]
struct ScanRecord {
    aop: f64,
    loan: f64,
    inc: f64,
    inner: f64,
    outer: f64,
    log_posterior: f64,
    log_prior: f64,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mcorbit=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn build_state(fit: &FitArgs) -> Result<(FitConfig, ReadyState), McOrbitError> {
    let config = fit.config()?;
    info!("\n{config}");

    let observations = ObservationSet::from_csv_path(&config.data_file, config.velocity_error_floor)?;
    info!(n_obs = observations.len(), file = %config.data_file, "observations loaded");

    let state = ReadyState::build(
        &observations,
        fit.parameter_space()?,
        fit.covariance_source(),
        &config,
    )?;
    Ok((config, state))
}

fn eval(fit: &FitArgs, theta: &[f64]) -> Result<(), McOrbitError> {
    if theta.len() != N_PARAMS {
        return Err(McOrbitError::DimensionMismatch {
            expected: N_PARAMS,
            found: theta.len(),
        });
    }
    let (_, state) = build_state(fit)?;
    let (log_posterior, log_prior) = state.log_prob(theta);
    println!("{log_posterior} {log_prior}");
    Ok(())
}

fn scan(
    fit: &FitArgs,
    walkers: usize,
    seed: u64,
    threads: Option<usize>,
    batch: usize,
) -> Result<(), McOrbitError> {
    let (config, state) = build_state(fit)?;
    let pool = WalkerPool::new(threads)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let thetas = state.prior().space().sample_uniform(&mut rng, walkers);
    info!(walkers, seed, threads = pool.threads(), "scanning");

    #[cfg(feature = "progress")]
    let pb = {
        let pb = ProgressBar::new(walkers.max(1) as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | ETA {eta_precise} | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    };

    let mut stats = ScanStats::new();
    let mut results = Vec::with_capacity(thetas.len());
    for chunk in thetas.chunks(batch.max(1)) {
        let evaluated = pool.evaluate(&state, chunk);
        stats.record_batch(&evaluated);
        results.extend(evaluated);

        #[cfg(feature = "progress")]
        {
            pb.set_message(stats.summary());
            pb.inc(chunk.len() as u64);
        }
    }
    #[cfg(feature = "progress")]
    pb.finish_and_clear();

    info!(
        evaluated = stats.evaluated(),
        accepted = stats.accepted(),
        prior_rejected = stats.prior_rejected(),
        likelihood_rejected = stats.likelihood_rejected(),
        throughput = %fmt_rate(stats.rate(stats.elapsed())),
        "scan finished"
    );

    std::fs::create_dir_all(&config.output_dir)?;
    let out_path = config.output_dir.join("scan.csv");
    let mut writer = csv::Writer::from_path(&out_path)?;
    for (theta, &(log_posterior, log_prior)) in thetas.iter().zip(&results) {
        writer.serialize(ScanRecord {
            aop: theta[0],
            loan: theta[1],
            inc: theta[2],
            inner: theta[3],
            outer: theta[4],
            log_posterior,
            log_prior,
        })?;
    }
    writer.flush()?;
    info!(file = %out_path, "scan written");

    match stats.best() {
        Some((idx, log_posterior)) => {
            let theta = &thetas[idx];
            info!(?theta, log_posterior, "best walker");
            println!("{}", theta.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(","));
        }
        None => warn!("no walker has a finite log-probability"),
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let res = match &cli.command {
        Command::Eval { theta } => eval(&cli.fit, theta),
        Command::Scan {
            walkers,
            seed,
            threads,
            batch,
        } => scan(&cli.fit, *walkers, *seed, *threads, *batch),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod cli_test {
    use super::*;

    #[test]
    fn test_negative_theta_and_bounds() {
        let cli = Cli::try_parse_from([
            "mcorbit",
            "--bounds",
            "-180,180,0,360,0,180,0.1,3,0.1,3",
            "eval",
            "--theta",
            "-10,60,50,1,1.4",
        ])
        .unwrap();

        match cli.command {
            Command::Eval { theta } => assert_eq!(theta, vec![-10.0, 60.0, 50.0, 1.0, 1.4]),
            Command::Scan { .. } => panic!("expected eval"),
        }
        let space = cli.fit.parameter_space().unwrap();
        assert_eq!(space.bounds()[0], (-180.0, 180.0));
    }

    #[test]
    fn test_bounds_length_checked() {
        let cli = Cli::try_parse_from(["mcorbit", "--bounds", "0,1,2", "scan"]).unwrap();
        assert_eq!(
            cli.fit.parameter_space().unwrap_err(),
            McOrbitError::DimensionMismatch {
                expected: 2 * N_PARAMS,
                found: 3
            }
        );
    }
}
