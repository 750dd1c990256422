//! The model itself: a validated (start, transition, emission) triple and
//! the inference entry points.
use crate::decode::{map_decode, viterbi, Algorithm};
use crate::errors::{HmmError, Table, ValidationKind};
use crate::forward_backward::{ForwardBackward, LogModel};
use crate::table::{ProbTable, ROW_SUM_TOLERANCE};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A discrete-emission hidden Markov model over `K` hidden states and `M`
/// observation symbols. The model owns its parameter tables and is the
/// single source of truth for them: every way of setting parameters
/// revalidates the invariants immediately, so any constructed model is
/// safe to run the recursions on. Persistence is left to callers; the
/// serde derives expose exactly the three tables plus the two dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalHmm {
    n_states: usize,
    n_symbols: usize,
    pub(crate) startprob: ProbTable,
    pub(crate) transmat: ProbTable,
    pub(crate) emissionprob: ProbTable,
}

impl CategoricalHmm {
    /// A model with uniform start, transition, and emission distributions.
    pub fn uniform(n_states: usize, n_symbols: usize) -> Result<Self, HmmError> {
        Self::checked(
            n_states,
            n_symbols,
            ProbTable::uniform(1, n_states),
            ProbTable::uniform(n_states, n_states),
            ProbTable::uniform(n_states, n_symbols),
        )
    }
    /// A model with every row drawn from `rng` and normalized.
    pub fn random<R: Rng>(n_states: usize, n_symbols: usize, rng: &mut R) -> Result<Self, HmmError> {
        if n_states == 0 || n_symbols == 0 {
            return Err(HmmError::Validation {
                table: Table::Start,
                kind: ValidationKind::Shape,
            });
        }
        Self::checked(
            n_states,
            n_symbols,
            ProbTable::random(1, n_states, rng),
            ProbTable::random(n_states, n_states, rng),
            ProbTable::random(n_states, n_symbols, rng),
        )
    }
    /// Build a model from explicit tables. The dimensions are inferred from
    /// `startprob` (K) and the emission rows (M).
    pub fn with_parameters(
        startprob: &[f64],
        transmat: &[Vec<f64>],
        emissionprob: &[Vec<f64>],
    ) -> Result<Self, HmmError> {
        let n_states = startprob.len();
        if n_states == 0 {
            return Err(HmmError::Validation {
                table: Table::Start,
                kind: ValidationKind::Shape,
            });
        }
        let n_symbols = emissionprob.first().map(|row| row.len()).unwrap_or(0);
        let trans = flatten(transmat, n_states, n_states, Table::Trans)?;
        let emit = flatten(emissionprob, n_states, n_symbols, Table::Emission)?;
        Self::checked(
            n_states,
            n_symbols,
            ProbTable::from_flat(1, n_states, startprob.to_vec()),
            trans,
            emit,
        )
    }
    fn checked(
        n_states: usize,
        n_symbols: usize,
        startprob: ProbTable,
        transmat: ProbTable,
        emissionprob: ProbTable,
    ) -> Result<Self, HmmError> {
        let model = Self {
            n_states,
            n_symbols,
            startprob,
            transmat,
            emissionprob,
        };
        model.validate()?;
        Ok(model)
    }
    /// Replace all three tables at once. The new tables must match the
    /// model's dimensions; the invariants are checked before anything is
    /// stored, so a failed call leaves the model untouched.
    pub fn set_parameters(
        &mut self,
        startprob: &[f64],
        transmat: &[Vec<f64>],
        emissionprob: &[Vec<f64>],
    ) -> Result<(), HmmError> {
        if startprob.len() != self.n_states {
            return Err(HmmError::Validation {
                table: Table::Start,
                kind: ValidationKind::Shape,
            });
        }
        let next = Self::with_parameters(startprob, transmat, emissionprob)?;
        if next.n_symbols != self.n_symbols {
            return Err(HmmError::Validation {
                table: Table::Emission,
                kind: ValidationKind::Shape,
            });
        }
        *self = next;
        Ok(())
    }
    /// Check every invariant: K, M >= 1, mutually consistent shapes,
    /// non-negative entries, rows summing to one.
    pub fn validate(&self) -> Result<(), HmmError> {
        let shape_err = |table| HmmError::Validation {
            table,
            kind: ValidationKind::Shape,
        };
        if self.n_states == 0 || self.startprob.rows() != 1 || self.startprob.cols() != self.n_states
        {
            return Err(shape_err(Table::Start));
        }
        if self.transmat.rows() != self.n_states || self.transmat.cols() != self.n_states {
            return Err(shape_err(Table::Trans));
        }
        if self.n_symbols == 0
            || self.emissionprob.rows() != self.n_states
            || self.emissionprob.cols() != self.n_symbols
        {
            return Err(shape_err(Table::Emission));
        }
        self.startprob.validate(Table::Start, ROW_SUM_TOLERANCE)?;
        self.transmat.validate(Table::Trans, ROW_SUM_TOLERANCE)?;
        self.emissionprob
            .validate(Table::Emission, ROW_SUM_TOLERANCE)?;
        Ok(())
    }
    pub fn n_states(&self) -> usize {
        self.n_states
    }
    pub fn n_symbols(&self) -> usize {
        self.n_symbols
    }
    pub fn startprob(&self) -> &ProbTable {
        &self.startprob
    }
    pub fn transmat(&self) -> &ProbTable {
        &self.transmat
    }
    pub fn emissionprob(&self) -> &ProbTable {
        &self.emissionprob
    }
    /// True iff every symbol is inside the model's alphabet. A pure
    /// predicate: callers use it to decide whether to proceed, while the
    /// scoring and decoding entry points still reject bad input themselves.
    pub fn check_input_symbols(&self, observations: &[usize]) -> bool {
        observations.iter().all(|&symbol| symbol < self.n_symbols)
    }
    fn check_observations(&self, observations: &[usize]) -> Result<(), HmmError> {
        for (position, &symbol) in observations.iter().enumerate() {
            if symbol >= self.n_symbols {
                return Err(HmmError::InvalidObservation { position, symbol });
            }
        }
        Ok(())
    }
    /// Log-likelihood of the observation sequence (forward algorithm).
    pub fn score(&self, observations: &[usize]) -> Result<f64, HmmError> {
        self.check_observations(observations)?;
        let lm = LogModel::new(self);
        Ok(ForwardBackward::run(&lm, observations).log_likelihood)
    }
    /// Log-likelihood together with the T x K posterior matrix.
    pub fn score_with_posteriors(
        &self,
        observations: &[usize],
    ) -> Result<(f64, ProbTable), HmmError> {
        self.check_observations(observations)?;
        let lm = LogModel::new(self);
        let fb = ForwardBackward::run(&lm, observations);
        let post = fb.posteriors(self.n_states);
        Ok((fb.log_likelihood, post))
    }
    /// Decode a state path. Viterbi returns the best path and its
    /// log-probability; MAP returns the per-timestep posterior argmax and
    /// the full-sequence log-likelihood.
    pub fn decode(
        &self,
        observations: &[usize],
        algorithm: Algorithm,
    ) -> Result<(f64, Vec<usize>), HmmError> {
        self.check_observations(observations)?;
        let lm = LogModel::new(self);
        let result = match algorithm {
            Algorithm::Viterbi => viterbi(&lm, observations),
            Algorithm::Map => map_decode(&lm, observations),
        };
        Ok(result)
    }
    /// The Viterbi state path.
    pub fn predict(&self, observations: &[usize]) -> Result<Vec<usize>, HmmError> {
        self.decode(observations, Algorithm::Viterbi)
            .map(|(_, path)| path)
    }
    /// The posterior matrix alone.
    pub fn predict_proba(&self, observations: &[usize]) -> Result<ProbTable, HmmError> {
        self.score_with_posteriors(observations)
            .map(|(_, post)| post)
    }
}

fn flatten(
    rows: &[Vec<f64>],
    expect_rows: usize,
    expect_cols: usize,
    table: Table,
) -> Result<ProbTable, HmmError> {
    let shape_err = || HmmError::Validation {
        table,
        kind: ValidationKind::Shape,
    };
    if rows.len() != expect_rows || expect_cols == 0 {
        return Err(shape_err());
    }
    let mut data = Vec::with_capacity(expect_rows * expect_cols);
    for row in rows {
        if row.len() != expect_cols {
            return Err(shape_err());
        }
        data.extend_from_slice(row);
    }
    Ok(ProbTable::from_flat(expect_rows, expect_cols, data))
}
