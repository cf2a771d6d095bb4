use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightsError {
    /// A structurally valid row that contradicts the analysis window
    /// (e.g. a purchase dated after the as-of date).
    #[error("data integrity error at row {row}: {reason}")]
    DataIntegrity { row: usize, reason: String },

    /// No valid transactions survived screening. Scoring and cohorting are
    /// undefined on an empty population.
    #[error("empty population: no valid transactions to analyse")]
    EmptyPopulation,

    /// A ratio whose denominator is zero.
    #[error("division undefined: {what}")]
    DivisionUndefined { what: String },

    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (empty rule, bad range, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// A required column is absent from the ledger header.
    #[error("ledger: missing column '{column}'")]
    MissingColumn { column: String },

    /// CSV reader error (bad quoting, IO on the underlying reader).
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type InsightsResult<T> = Result<T, InsightsError>;
