//! A tiny implementation of discrete-emission hidden Markov models.
//! A model is a triple of row-stochastic tables (start, transition, emission)
//! over `K` hidden states and `M` observable symbols. On top of that triple,
//! this crate provides scoring (forward algorithm), posterior computation
//! (forward-backward), decoding (Viterbi and per-timestep MAP), ancestral
//! sampling, and Baum-Welch parameter re-estimation over one or more
//! observation sequences.
//! All recursions run in log-domain. Probabilities equal to zero are mapped
//! to the large negative constant `EP` rather than negative infinity, so that
//! summing two log-probabilities never produces NaN.
pub mod decode;
pub mod errors;
pub mod fit;
pub mod forward_backward;
pub mod model;
pub mod sample;
pub mod stats;
pub mod table;

pub use crate::decode::Algorithm;
pub use crate::errors::{HmmError, Table, ValidationKind};
pub use crate::fit::{ConvergenceMonitor, FitConfig, Params};
pub use crate::model::CategoricalHmm;
pub use crate::stats::SufficientStats;
pub use crate::table::ProbTable;

/// Stand-in for the log of a zero probability.
pub(crate) const EP: f64 = -10000000000000000000000000000000f64;

/// Log of a probability, with zero mapped to `EP`.
pub(crate) fn plog(x: f64) -> f64 {
    if x <= 0f64 {
        EP
    } else {
        x.ln()
    }
}

/// Compute log(sum_i exp(xs[i])) by the usual max-subtraction trick.
/// Returns 0 for an empty slice (log of an empty product).
pub fn logsumexp(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.;
    }
    let max = xs.iter().max_by(|x, y| x.partial_cmp(y).unwrap()).unwrap();
    let sum = xs.iter().map(|x| (x - max).exp()).sum::<f64>().ln();
    assert!(sum >= 0., "{:?}->{}", xs, sum);
    max + sum
}
