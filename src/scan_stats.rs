//! # Walker scan statistics
//!
//! [`ScanStats`] accumulates the `(log_posterior, log_prior)` pairs returned by
//! [`WalkerPool::evaluate`](crate::pool::WalkerPool::evaluate) and classifies
//! every evaluation with [`Outcome::classify`]:
//!
//! | `log_prior` | `log_posterior` | outcome                |
//! |-------------|-----------------|------------------------|
//! | `−∞`        | any             | `PriorRejected`        |
//! | finite      | finite          | `Accepted`             |
//! | finite      | `−∞` or NaN     | `LikelihoodRejected`   |
//!
//! It also keeps the best accepted walker and the evaluation throughput,
//! which the CLI `scan` command shows next to its progress bar.
use std::time::{Duration, Instant};

/// Classification of one log-probability evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    /// Outside the parameter box or failing an ordering rule.
    PriorRejected,
    /// Valid theta whose model cloud could not be scored (empty sector, failed orbit).
    LikelihoodRejected,
}

impl Outcome {
    pub fn classify((log_posterior, log_prior): (f64, f64)) -> Self {
        if log_prior == f64::NEG_INFINITY {
            Outcome::PriorRejected
        } else if log_posterior.is_finite() {
            Outcome::Accepted
        } else {
            Outcome::LikelihoodRejected
        }
    }
}

/// Running tally of a walker scan.
#[derive(Debug, Clone)]
pub struct ScanStats {
    started: Instant,
    evaluated: usize,
    prior_rejected: usize,
    likelihood_rejected: usize,
    best: Option<(usize, f64)>,
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanStats {
    /// Start a tally; throughput is measured from this call.
    pub fn new() -> Self {
        ScanStats {
            started: Instant::now(),
            evaluated: 0,
            prior_rejected: 0,
            likelihood_rejected: 0,
            best: None,
        }
    }

    /// Account for the next batch of results.
    ///
    /// Arguments
    /// -----------------
    /// * `results`: `(log_posterior, log_prior)` pairs, in walker order. The
    ///   first pair of the batch belongs to walker [`ScanStats::evaluated`].
    pub fn record_batch(&mut self, results: &[(f64, f64)]) {
        for (offset, &result) in results.iter().enumerate() {
            match Outcome::classify(result) {
                Outcome::PriorRejected => self.prior_rejected += 1,
                Outcome::LikelihoodRejected => self.likelihood_rejected += 1,
                Outcome::Accepted => {
                    let log_posterior = result.0;
                    match self.best {
                        Some((_, best)) if log_posterior <= best => {}
                        _ => self.best = Some((self.evaluated + offset, log_posterior)),
                    }
                }
            }
        }
        self.evaluated += results.len();
    }

    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    pub fn accepted(&self) -> usize {
        self.evaluated - self.prior_rejected - self.likelihood_rejected
    }

    pub fn prior_rejected(&self) -> usize {
        self.prior_rejected
    }

    pub fn likelihood_rejected(&self) -> usize {
        self.likelihood_rejected
    }

    /// Fraction of evaluations without a finite posterior (0 before any batch).
    pub fn reject_fraction(&self) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            (self.prior_rejected + self.likelihood_rejected) as f64 / self.evaluated as f64
        }
    }

    /// Walker index and log-posterior of the best accepted evaluation.
    ///
    /// Ties keep the earliest walker.
    pub fn best(&self) -> Option<(usize, f64)> {
        self.best
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Evaluations per second over `elapsed`.
    pub fn rate(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.evaluated as f64 / secs
        } else {
            0.0
        }
    }

    /// One-line summary for the progress bar message.
    pub fn summary(&self) -> String {
        let best = match self.best {
            Some((_, lp)) => format!("{lp:.3}"),
            None => "-".to_string(),
        };
        format!(
            "best: {best} | rejected: {:.1}% | {}",
            100.0 * self.reject_fraction(),
            fmt_rate(self.rate(self.elapsed()))
        )
    }
}

/// Short throughput label: `"850 eval/s"` or `"12.3k eval/s"`.
pub fn fmt_rate(per_sec: f64) -> String {
    if per_sec < 1_000.0 {
        format!("{per_sec:.0} eval/s")
    } else {
        format!("{:.1}k eval/s", per_sec / 1_000.0)
    }
}
