//! Log-domain forward and backward recursions for one observation sequence.
use crate::model::CategoricalHmm;
use crate::table::ProbTable;
use crate::{logsumexp, plog, EP};

/// A dynamic programming lattice. It is a serialized T x K array.
#[derive(Debug, Clone)]
pub(crate) struct DpTable {
    data: Vec<f64>,
    cols: usize,
}

impl DpTable {
    pub fn new(rows: usize, cols: usize, x: f64) -> Self {
        Self {
            data: vec![x; rows * cols],
            cols,
        }
    }
    pub fn get(&self, t: usize, i: usize) -> f64 {
        self.data[t * self.cols + i]
    }
    pub fn get_mut(&mut self, t: usize, i: usize) -> &mut f64 {
        &mut self.data[t * self.cols + i]
    }
    pub fn row(&self, t: usize) -> &[f64] {
        &self.data[t * self.cols..(t + 1) * self.cols]
    }
}

/// Model parameters with every entry pre-converted to log-domain, shared
/// read-only by scoring, decoding, and the per-sequence E-steps.
#[derive(Debug, Clone)]
pub(crate) struct LogModel {
    pub n_states: usize,
    pub n_symbols: usize,
    pub start: Vec<f64>,
    trans: Vec<f64>,
    emit: Vec<f64>,
}

impl LogModel {
    pub fn new(model: &CategoricalHmm) -> Self {
        let convert = |xs: &[f64]| xs.iter().map(|&x| plog(x)).collect();
        Self {
            n_states: model.n_states(),
            n_symbols: model.n_symbols(),
            start: convert(model.startprob().row(0)),
            trans: convert(model.transmat().data()),
            emit: convert(model.emissionprob().data()),
        }
    }
    /// log Pr{state i -> state j}.
    pub fn trans(&self, i: usize, j: usize) -> f64 {
        self.trans[i * self.n_states + j]
    }
    /// log Pr{symbol o | state i}.
    pub fn emit(&self, i: usize, o: usize) -> f64 {
        self.emit[i * self.n_symbols + o]
    }
}

/// Raw forward/backward lattices and the sequence log-likelihood.
/// `log_alpha[t][i] = log Pr{o_1..o_t, state_t = i}` and
/// `log_beta[t][i] = log Pr{o_{t+1}..o_T | state_t = i}`.
#[derive(Debug, Clone)]
pub(crate) struct ForwardBackward {
    pub log_alpha: DpTable,
    pub log_beta: DpTable,
    pub log_likelihood: f64,
    len: usize,
}

impl ForwardBackward {
    /// Run both recursions. Symbols must already be checked against the
    /// alphabet; an empty sequence yields log-likelihood 0.
    pub fn run(lm: &LogModel, obs: &[usize]) -> Self {
        let (len, k) = (obs.len(), lm.n_states);
        let mut log_alpha = DpTable::new(len, k, EP);
        let mut log_beta = DpTable::new(len, k, EP);
        if len == 0 {
            return Self {
                log_alpha,
                log_beta,
                log_likelihood: 0f64,
                len,
            };
        }
        for i in 0..k {
            *log_alpha.get_mut(0, i) = lm.start[i] + lm.emit(i, obs[0]);
        }
        let mut work = vec![EP; k];
        for (t, &o) in obs.iter().enumerate().skip(1) {
            for i in 0..k {
                for (j, w) in work.iter_mut().enumerate() {
                    *w = log_alpha.get(t - 1, j) + lm.trans(j, i);
                }
                *log_alpha.get_mut(t, i) = logsumexp(&work) + lm.emit(i, o);
            }
        }
        for i in 0..k {
            *log_beta.get_mut(len - 1, i) = 0f64;
        }
        for t in (0..len - 1).rev() {
            for i in 0..k {
                for (j, w) in work.iter_mut().enumerate() {
                    *w = lm.trans(i, j) + lm.emit(j, obs[t + 1]) + log_beta.get(t + 1, j);
                }
                *log_beta.get_mut(t, i) = logsumexp(&work);
            }
        }
        let log_likelihood = logsumexp(log_alpha.row(len - 1));
        Self {
            log_alpha,
            log_beta,
            log_likelihood,
            len,
        }
    }
    /// State posteriors, `posteriors[t][i] = Pr{state_t = i | o_1..o_T}`.
    /// Each row sums to one; an empty sequence yields a zero-row table.
    pub fn posteriors(&self, n_states: usize) -> ProbTable {
        let mut post = ProbTable::filled(self.len, n_states, 0f64);
        for t in 0..self.len {
            for i in 0..n_states {
                *post.get_mut(t, i) =
                    (self.log_alpha.get(t, i) + self.log_beta.get(t, i) - self.log_likelihood)
                        .exp();
            }
        }
        post
    }
}
