//! Expected counts accumulated across sequences during the E-step.
use crate::forward_backward::{ForwardBackward, LogModel};

/// Additive accumulator of the sufficient statistics for one EM iteration:
/// expected start counts (length K), expected transition counts (K x K),
/// expected emission counts (K x M), and the running total log-likelihood.
/// Accumulation is order-independent across sequences, so partial
/// accumulators can be merged in any order.
#[derive(Debug, Clone)]
pub struct SufficientStats {
    pub start: Vec<f64>,
    pub trans: Vec<f64>,
    pub emit: Vec<f64>,
    pub log_likelihood: f64,
    n_states: usize,
    n_symbols: usize,
}

impl SufficientStats {
    pub fn zeros(n_states: usize, n_symbols: usize) -> Self {
        Self {
            start: vec![0f64; n_states],
            trans: vec![0f64; n_states * n_states],
            emit: vec![0f64; n_states * n_symbols],
            log_likelihood: 0f64,
            n_states,
            n_symbols,
        }
    }
    /// Add one sequence's expected counts from its forward/backward lattices.
    pub(crate) fn accumulate(&mut self, lm: &LogModel, obs: &[usize], fb: &ForwardBackward) {
        let k = self.n_states;
        self.log_likelihood += fb.log_likelihood;
        if obs.is_empty() {
            return;
        }
        let post = fb.posteriors(k);
        for i in 0..k {
            self.start[i] += post.get(0, i);
        }
        for (t, &o) in obs.iter().enumerate() {
            for i in 0..k {
                self.emit[i * self.n_symbols + o] += post.get(t, i);
            }
        }
        for t in 0..obs.len() - 1 {
            let o_next = obs[t + 1];
            for i in 0..k {
                for j in 0..k {
                    self.trans[i * k + j] += (fb.log_alpha.get(t, i)
                        + lm.trans(i, j)
                        + lm.emit(j, o_next)
                        + fb.log_beta.get(t + 1, j)
                        - fb.log_likelihood)
                        .exp();
                }
            }
        }
    }
    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &Self) {
        assert_eq!(self.n_states, other.n_states);
        assert_eq!(self.n_symbols, other.n_symbols);
        self.start
            .iter_mut()
            .zip(other.start.iter())
            .for_each(|(x, &y)| *x += y);
        self.trans
            .iter_mut()
            .zip(other.trans.iter())
            .for_each(|(x, &y)| *x += y);
        self.emit
            .iter_mut()
            .zip(other.emit.iter())
            .for_each(|(x, &y)| *x += y);
        self.log_likelihood += other.log_likelihood;
    }
}
