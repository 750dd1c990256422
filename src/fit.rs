//! Baum-Welch (EM) parameter re-estimation over one or more sequences.
use crate::errors::{HmmError, Table};
use crate::forward_backward::{ForwardBackward, LogModel};
use crate::model::CategoricalHmm;
use crate::stats::SufficientStats;
use crate::table::ProbTable;
use log::{debug, warn};
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;

bitflags::bitflags! {
    /// Which of the three parameter tables an operation touches.
    pub struct Params: u8 {
        const START = 0b001;
        const TRANS = 0b010;
        const EMISSION = 0b100;
    }
}

/// Numerical slack allowed before a log-likelihood decrease between
/// iterations is reported as an anomaly.
pub const MONOTONICITY_SLACK: f64 = 0.000001;

/// Configuration for `CategoricalHmm::fit`.
/// `params` are the tables the M-step rewrites; everything else is held
/// fixed. `init_params` are re-initialized before the first E-step
/// (start/transition uniform, emission random from the seeded generator).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub params: Params,
    pub init_params: Params,
    pub tol: f64,
    pub max_iter: usize,
    pub seed: u64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            params: Params::all(),
            init_params: Params::empty(),
            tol: 0.01,
            max_iter: 10,
            seed: 0,
        }
    }
}

/// Records the per-iteration total log-likelihood and decides convergence.
/// EM guarantees a non-decreasing trajectory; a decrease beyond
/// `MONOTONICITY_SLACK` indicates a bug and is reported through `log::warn!`
/// and the sticky `anomaly` flag, while fitting continues.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    tol: f64,
    pub history: Vec<f64>,
    pub anomaly: bool,
}

impl ConvergenceMonitor {
    pub fn new(tol: f64) -> Self {
        Self {
            tol,
            history: Vec::new(),
            anomaly: false,
        }
    }
    pub fn report(&mut self, log_likelihood: f64) {
        if let Some(&prev) = self.history.last() {
            if log_likelihood < prev - MONOTONICITY_SLACK {
                warn!(
                    "log-likelihood decreased: {:.6} -> {:.6}",
                    prev, log_likelihood
                );
                self.anomaly = true;
            }
        }
        debug!(
            "iteration {}: log-likelihood {:.6}",
            self.history.len(),
            log_likelihood
        );
        self.history.push(log_likelihood);
    }
    pub fn converged(&self) -> bool {
        match self.history.as_slice() {
            [.., prev, last] => last - prev < self.tol,
            _ => false,
        }
    }
}

impl CategoricalHmm {
    /// Learn parameters from a concatenated dataset by EM.
    /// `lengths` splits `observations` into independent sequences and must
    /// sum to `observations.len()`. Per iteration, every sequence's expected
    /// counts are accumulated (in parallel; the merge is an associative,
    /// commutative addition) and the tables named by `config.params` are
    /// re-normalized from the totals. Returns the log-likelihood history,
    /// one entry per completed iteration in iteration order.
    pub fn fit(
        &mut self,
        observations: &[usize],
        lengths: &[usize],
        config: &FitConfig,
    ) -> Result<Vec<f64>, HmmError> {
        let total: usize = lengths.iter().sum();
        if total != observations.len() {
            return Err(HmmError::LengthMismatch {
                expected: observations.len(),
                actual: total,
            });
        }
        for (position, &symbol) in observations.iter().enumerate() {
            if symbol >= self.n_symbols() {
                return Err(HmmError::InvalidObservation { position, symbol });
            }
        }
        self.validate()?;
        let sequences: Vec<&[usize]> = {
            let mut seqs = Vec::with_capacity(lengths.len());
            let mut offset = 0;
            for &len in lengths {
                seqs.push(&observations[offset..offset + len]);
                offset += len;
            }
            seqs
        };
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(config.seed);
        self.initialize(config.init_params, &mut rng);
        let (k, m) = (self.n_states(), self.n_symbols());
        let mut monitor = ConvergenceMonitor::new(config.tol);
        for _ in 0..config.max_iter {
            let lm = LogModel::new(self);
            let stats = sequences
                .par_iter()
                .map(|&seq| {
                    let fb = ForwardBackward::run(&lm, seq);
                    let mut stats = SufficientStats::zeros(k, m);
                    stats.accumulate(&lm, seq, &fb);
                    stats
                })
                .reduce(
                    || SufficientStats::zeros(k, m),
                    |mut acc, part| {
                        acc.merge(&part);
                        acc
                    },
                );
            self.maximize(&stats, config.params)?;
            monitor.report(stats.log_likelihood);
            if monitor.converged() {
                debug!("converged after {} iterations", monitor.history.len());
                break;
            }
        }
        Ok(monitor.history)
    }
    fn initialize<R: Rng>(&mut self, init: Params, rng: &mut R) {
        let (k, m) = (self.n_states(), self.n_symbols());
        if init.contains(Params::START) {
            self.startprob = ProbTable::uniform(1, k);
        }
        if init.contains(Params::TRANS) {
            self.transmat = ProbTable::uniform(k, k);
        }
        if init.contains(Params::EMISSION) {
            self.emissionprob = ProbTable::random(k, m, rng);
        }
    }
    /// M-step: replace the learned tables by the normalized expected counts,
    /// then revalidate the whole model.
    fn maximize(&mut self, stats: &SufficientStats, params: Params) -> Result<(), HmmError> {
        let (k, m) = (self.n_states(), self.n_symbols());
        if params.contains(Params::START) {
            let mut table = ProbTable::from_flat(1, k, stats.start.clone());
            table.normalize_rows(0f64, Table::Start)?;
            self.startprob = table;
        }
        if params.contains(Params::TRANS) {
            let mut table = ProbTable::from_flat(k, k, stats.trans.clone());
            table.normalize_rows(0f64, Table::Trans)?;
            self.transmat = table;
        }
        if params.contains(Params::EMISSION) {
            let mut table = ProbTable::from_flat(k, m, stats.emit.clone());
            table.normalize_rows(0f64, Table::Emission)?;
            self.emissionprob = table;
        }
        self.validate()
    }
}
