//! Monte Carlo averaging of the SNR penalty.
//!
//! The penalty of a chain depends on the random orientation of each
//! impairment, so it is characterized by its statistics over many
//! realizations. Realizations are computed in parallel with [rayon] in
//! batches. Realization number `k` draws all its random numbers from
//! [`realization_rng`]`(seed, k)`, so the results only depend on the seed and
//! not on the number of threads.
//!
//! For dual-polarization links, the components of the chain that do not have
//! rotation and phase angles get new random angles in every realization.

use crate::{
    component::Chain,
    config::LinkConfig,
    error::{ConfigurationError, Result},
    penalty::{estimate, Penalty},
    rand::realization_rng,
};
use rayon::prelude::*;
use std::{
    sync::mpsc::Sender,
    time::{Duration, Instant},
};

/// Number of realizations computed between progress reports.
const BATCH_SIZE: u64 = 256;

/// Monte Carlo run.
///
/// This struct is used to configure and run a Monte Carlo estimation of the
/// penalty of a chain.
#[derive(Debug)]
pub struct MonteCarlo {
    /// Chain of components.
    pub chain: Chain,
    /// Link parameters.
    pub config: LinkConfig,
    /// Number of realizations.
    pub realizations: u64,
    /// Seed of the random number generators.
    pub seed: u64,
    /// Optional progress reporter.
    pub reporter: Option<Reporter>,
}

/// Progress reporter.
///
/// A reporter can optionally be passed to a [`MonteCarlo`] run, so that it
/// periodically sends the statistics gathered so far.
#[derive(Debug, Clone)]
pub struct Reporter {
    /// Sender element of the channel used to send the reports.
    pub tx: Sender<Report>,
    /// Minimum interval between progress reports.
    pub interval: Duration,
}

/// Progress report.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Statistics of the realizations computed so far.
    Progress(Statistics),
    /// The run has finished.
    Finished,
}

/// Penalty statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    /// Number of realizations.
    pub count: u64,
    /// Mean penalty (dB).
    pub mean_db: f64,
    /// Sample standard deviation of the penalty (dB).
    pub std_db: f64,
    /// Smallest penalty (dB).
    pub min_db: f64,
    /// Largest penalty (dB).
    pub max_db: f64,
    /// Mean ASE-limited SNR (dB).
    pub mean_snr_ase_db: f64,
    /// Elapsed time.
    pub elapsed: Duration,
}

/// Results of a Monte Carlo run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Penalty of each realization (dB), in realization order.
    pub penalties_db: Vec<f64>,
    /// Statistics over all the realizations.
    pub statistics: Statistics,
}

#[derive(Debug, Clone)]
struct Accumulator {
    count: u64,
    sum: f64,
    sum_squares: f64,
    min: f64,
    max: f64,
    sum_snr_ase: f64,
    start: Instant,
}

impl MonteCarlo {
    /// Runs the Monte Carlo estimation.
    ///
    /// The realizations run in the current rayon thread pool. The first
    /// realization that fails aborts the run and its error is returned.
    pub fn run(&self) -> Result<Outcome> {
        self.config.validate()?;
        if self.realizations == 0 {
            return Err(ConfigurationError::InvalidValue {
                parameter: "number of realizations",
                value: 0.0,
            }
            .into());
        }
        tracing::info!(
            realizations = self.realizations,
            seed = self.seed,
            components = self.chain.len(),
            "starting Monte Carlo run"
        );

        let mut accumulator = Accumulator::new();
        let mut penalties_db = Vec::with_capacity(self.realizations as usize);
        let mut last_report = Instant::now();
        let mut start = 0;
        while start < self.realizations {
            let end = (start + BATCH_SIZE).min(self.realizations);
            let (chain, config, seed) = (&self.chain, &self.config, self.seed);
            let batch = (start..end)
                .into_par_iter()
                .map(|index| realization(chain, config, seed, index))
                .collect::<Result<Vec<Penalty>>>()?;
            for penalty in &batch {
                accumulator.push(penalty);
                penalties_db.push(penalty.penalty_db);
            }
            start = end;

            if let Some(reporter) = &self.reporter {
                let now = Instant::now();
                if now - last_report >= reporter.interval || start == self.realizations {
                    last_report = now;
                    // The receiver may have been dropped; the run goes on
                    // without reports in that case.
                    let _ = reporter
                        .tx
                        .send(Report::Progress(accumulator.statistics()));
                }
            }
        }

        let statistics = accumulator.statistics();
        tracing::info!(
            mean_db = statistics.mean_db,
            std_db = statistics.std_db,
            elapsed = ?statistics.elapsed,
            "finished Monte Carlo run"
        );
        if let Some(reporter) = &self.reporter {
            let _ = reporter.tx.send(Report::Finished);
        }
        Ok(Outcome {
            penalties_db,
            statistics,
        })
    }
}

fn realization(chain: &Chain, config: &LinkConfig, seed: u64, index: u64) -> Result<Penalty> {
    let mut rng = realization_rng(seed, index);
    let penalty = if config.is_polarization() {
        let chain = chain.with_random_angles(&mut rng);
        estimate(&chain, config, &mut rng)
    } else {
        estimate(chain, config, &mut rng)
    };
    if let Err(e) = &penalty {
        tracing::error!(index, error = %e, "realization failed");
    }
    penalty
}

impl Accumulator {
    fn new() -> Accumulator {
        Accumulator {
            count: 0,
            sum: 0.0,
            sum_squares: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum_snr_ase: 0.0,
            start: Instant::now(),
        }
    }

    fn push(&mut self, penalty: &Penalty) {
        let x = penalty.penalty_db;
        self.count += 1;
        self.sum += x;
        self.sum_squares += x * x;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
        self.sum_snr_ase += penalty.snr_ase_db;
    }

    fn statistics(&self) -> Statistics {
        let n = self.count as f64;
        let mean = self.sum / n;
        let variance = if self.count > 1 {
            ((self.sum_squares - n * mean * mean) / (n - 1.0)).max(0.0)
        } else {
            0.0
        };
        Statistics {
            count: self.count,
            mean_db: mean,
            std_db: variance.sqrt(),
            min_db: self.min,
            max_db: self.max,
            mean_snr_ase_db: self.sum_snr_ase / n,
            elapsed: Instant::now() - self.start,
        }
    }
}
