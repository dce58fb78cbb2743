//! # Walker pool
//!
//! Batch evaluation of [`ReadyState::log_prob`] on a dedicated rayon thread
//! pool. Theta vectors go in, `(log_posterior, log_prior)` pairs come out in
//! the same order; the shared [`ReadyState`] is only borrowed immutably.
//!
//! Each evaluation runs sequentially on one worker, so the result for a given
//! theta does not depend on the number of threads or on scheduling.
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::{log_prob::ReadyState, mcorbit_errors::McOrbitError, orbit::OrbitGenerator};

/// Dedicated worker pool for log-probability evaluations.
#[derive(Debug)]
pub struct WalkerPool {
    pool: ThreadPool,
}

impl WalkerPool {
    /// Start a pool with `threads` workers (`None` uses every available CPU).
    pub fn new(threads: Option<usize>) -> Result<Self, McOrbitError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.unwrap_or(0))
            .thread_name(|i| format!("mcorbit-walker-{i}"))
            .build()?;
        debug!(threads = pool.current_num_threads(), "walker pool started");
        Ok(WalkerPool { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Evaluate every theta of the batch.
    ///
    /// Arguments
    /// -----------------
    /// * `state`: shared, read-only run state.
    /// * `thetas`: one parameter vector per walker.
    ///
    /// Return
    /// ----------
    /// * `(log_posterior, log_prior)` for each theta, in input order.
    pub fn evaluate<G: OrbitGenerator>(
        &self,
        state: &ReadyState<G>,
        thetas: &[Vec<f64>],
    ) -> Vec<(f64, f64)> {
        self.pool.install(|| {
            thetas
                .par_iter()
                .map(|theta| state.log_prob(theta))
                .collect()
        })
    }
}
