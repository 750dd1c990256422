//! A validated row-stochastic table. It is a serialized 2-d array; a
//! probability vector is a table with a single row.
use crate::errors::{HmmError, Table, ValidationKind};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default tolerance for the per-row sum check.
pub const ROW_SUM_TOLERANCE: f64 = 0.000001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbTable {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl ProbTable {
    pub fn filled(rows: usize, cols: usize, x: f64) -> Self {
        Self {
            data: vec![x; rows * cols],
            rows,
            cols,
        }
    }
    pub(crate) fn from_flat(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), rows * cols);
        Self { data, rows, cols }
    }
    /// Every row is the uniform distribution over `cols` entries.
    pub fn uniform(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, (cols as f64).recip())
    }
    /// Every row is drawn from the given generator and normalized.
    pub fn random<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let data: Vec<f64> = (0..rows * cols).map(|_| rng.gen_range(0.01..1f64)).collect();
        let mut table = Self::from_flat(rows, cols, data);
        let degenerate = table.normalize_rows_inner(0f64);
        assert!(degenerate.is_none());
        table
    }
    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }
    pub(crate) fn get_mut(&mut self, i: usize, j: usize) -> &mut f64 {
        &mut self.data[i * self.cols + j]
    }
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }
    pub fn data(&self) -> &[f64] {
        &self.data
    }
    /// Check non-negativity and per-row normalization, reporting the failed
    /// check against `table`. Shape consistency across tables is the model's
    /// responsibility; here only an empty table counts as a shape violation.
    pub fn validate(&self, table: Table, tol: f64) -> Result<(), HmmError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(HmmError::Validation {
                table,
                kind: ValidationKind::Shape,
            });
        }
        for row in self.data.chunks_exact(self.cols) {
            if row.iter().any(|&x| x < 0f64) {
                return Err(HmmError::Validation {
                    table,
                    kind: ValidationKind::Negative,
                });
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1f64).abs() > tol {
                return Err(HmmError::Validation {
                    table,
                    kind: ValidationKind::NotNormalized,
                });
            }
        }
        Ok(())
    }
    /// Add `pseudocount` to every entry, then divide each row by its sum.
    /// A row summing to zero after smoothing fails fast instead of
    /// propagating NaN.
    pub fn normalize_rows(&mut self, pseudocount: f64, table: Table) -> Result<(), HmmError> {
        match self.normalize_rows_inner(pseudocount) {
            None => Ok(()),
            Some(_) => Err(HmmError::DegenerateDistribution { table }),
        }
    }
    fn normalize_rows_inner(&mut self, pseudocount: f64) -> Option<usize> {
        for (idx, row) in self.data.chunks_exact_mut(self.cols).enumerate() {
            row.iter_mut().for_each(|x| *x += pseudocount);
            let sum: f64 = row.iter().sum();
            if sum <= 0f64 {
                return Some(idx);
            }
            row.iter_mut().for_each(|x| *x /= sum);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    #[test]
    fn uniform_rows_are_stochastic() {
        let table = ProbTable::uniform(3, 5);
        table.validate(Table::Trans, ROW_SUM_TOLERANCE).unwrap();
        assert!((table.get(2, 4) - 0.2).abs() < 0.000001);
    }
    #[test]
    fn random_rows_are_stochastic() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(389);
        for _ in 0..10 {
            let table = ProbTable::random(4, 6, &mut rng);
            table.validate(Table::Emission, ROW_SUM_TOLERANCE).unwrap();
        }
    }
    #[test]
    fn validate_rejects_negative_entries() {
        let table = ProbTable::from_flat(1, 3, vec![0.5, 0.7, -0.2]);
        let err = table.validate(Table::Start, ROW_SUM_TOLERANCE).unwrap_err();
        assert_eq!(
            err,
            HmmError::Validation {
                table: Table::Start,
                kind: ValidationKind::Negative,
            }
        );
    }
    #[test]
    fn validate_rejects_unnormalized_rows() {
        let table = ProbTable::from_flat(2, 2, vec![0.5, 0.5, 0.6, 0.6]);
        let err = table.validate(Table::Trans, ROW_SUM_TOLERANCE).unwrap_err();
        assert_eq!(
            err,
            HmmError::Validation {
                table: Table::Trans,
                kind: ValidationKind::NotNormalized,
            }
        );
    }
    #[test]
    fn validate_rejects_empty_tables() {
        let table = ProbTable::filled(0, 3, 0f64);
        let err = table.validate(Table::Start, ROW_SUM_TOLERANCE).unwrap_err();
        assert_eq!(
            err,
            HmmError::Validation {
                table: Table::Start,
                kind: ValidationKind::Shape,
            }
        );
    }
    #[test]
    fn normalize_rows_divides_by_row_sums() {
        let mut table = ProbTable::from_flat(2, 2, vec![2f64, 6f64, 1f64, 3f64]);
        table.normalize_rows(0f64, Table::Trans).unwrap();
        assert!((table.get(0, 0) - 0.25).abs() < 0.000001);
        assert!((table.get(1, 1) - 0.75).abs() < 0.000001);
    }
    #[test]
    fn normalize_rows_applies_pseudocount() {
        let mut table = ProbTable::from_flat(1, 2, vec![0f64, 0f64]);
        table.normalize_rows(1f64, Table::Emission).unwrap();
        assert!((table.get(0, 0) - 0.5).abs() < 0.000001);
    }
    #[test]
    fn normalize_rows_fails_fast_on_zero_mass() {
        let mut table = ProbTable::from_flat(2, 2, vec![0.3, 0.7, 0f64, 0f64]);
        let err = table.normalize_rows(0f64, Table::Emission).unwrap_err();
        assert_eq!(
            err,
            HmmError::DegenerateDistribution {
                table: Table::Emission,
            }
        );
    }
}
