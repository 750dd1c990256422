//! Error taxonomy. Validation and input errors are caller-visible failures
//! and are never retried or silently corrected. Log-likelihood anomalies
//! during fitting are warning-level, not errors; see `fit::ConvergenceMonitor`.
use thiserror::Error;

/// Which parameter table an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Start,
    Trans,
    Emission,
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Table::Start => write!(f, "startprob"),
            Table::Trans => write!(f, "transmat"),
            Table::Emission => write!(f, "emissionprob"),
        }
    }
}

/// The specific check a table failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Shape,
    Negative,
    NotNormalized,
}

impl std::fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ValidationKind::Shape => write!(f, "inconsistent shape"),
            ValidationKind::Negative => write!(f, "negative entry"),
            ValidationKind::NotNormalized => write!(f, "row does not sum to one"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HmmError {
    /// A parameter table violates the model invariants.
    #[error("{table}: {kind}")]
    Validation { table: Table, kind: ValidationKind },
    /// An observation symbol is outside `[0, M)`. Raised before any
    /// recursion runs, so no partial computation happens on bad input.
    #[error("symbol {symbol} at position {position} is out of range")]
    InvalidObservation { position: usize, symbol: usize },
    /// A row that should carry positive mass sums to zero even after
    /// pseudocount smoothing.
    #[error("{table}: a row has zero total mass")]
    DegenerateDistribution { table: Table },
    /// The per-sequence lengths do not add up to the dataset length.
    #[error("sequence lengths sum to {actual}, but {expected} observations were given")]
    LengthMismatch { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn messages_name_the_offending_table() {
        let err = HmmError::Validation {
            table: Table::Trans,
            kind: ValidationKind::NotNormalized,
        };
        let msg = err.to_string();
        assert!(msg.contains("transmat"), "{}", msg);
        let err = HmmError::DegenerateDistribution {
            table: Table::Emission,
        };
        assert!(err.to_string().contains("emissionprob"));
    }
    #[test]
    fn observation_error_reports_position_and_symbol() {
        let err = HmmError::InvalidObservation {
            position: 7,
            symbol: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains('7') && msg.contains("12"), "{}", msg);
    }
}
