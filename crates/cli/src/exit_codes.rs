//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                                |
//! |---------|------------------|--------------------------------------------|
//! | 0       | Universal        | Success                                    |
//! | 1       | Universal        | General error (unspecified)                |
//! | 2       | Universal        | CLI usage error (bad args, bad flag value) |
//! | 3       | Universal        | I/O error (cannot read ledger/config)      |
//! | 10-19   | analyze          | Analysis-specific codes                    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `insights_exit_code` or the relevant command

use shoplens_insights::InsightsError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid flag values.
pub const EXIT_USAGE: u8 = 2;

/// Cannot read an input file or write an output file.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Analyze (10-19)
// =============================================================================

/// Config file failed to parse or validate (bad TOML, bad segment rules).
pub const EXIT_INVALID_CONFIG: u8 = 10;

/// A transaction is dated after the as-of date.
pub const EXIT_DATA_INTEGRITY: u8 = 11;

/// No valid transactions survived loading and screening.
pub const EXIT_EMPTY_POPULATION: u8 = 12;

/// Ledger is not usable as a whole (missing required column, broken CSV).
pub const EXIT_LEDGER_FORMAT: u8 = 13;

/// Map an engine error to its exit code.
pub fn insights_exit_code(err: &InsightsError) -> u8 {
    match err {
        InsightsError::ConfigParse(_) | InsightsError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        InsightsError::DataIntegrity { .. } => EXIT_DATA_INTEGRITY,
        InsightsError::EmptyPopulation => EXIT_EMPTY_POPULATION,
        InsightsError::MissingColumn { .. } | InsightsError::Csv(_) => EXIT_LEDGER_FORMAT,
        InsightsError::DivisionUndefined { .. } => EXIT_ERROR,
    }
}

/// Machine-parseable error printed to stderr under `--json`.
#[derive(Debug, serde::Serialize)]
pub struct ErrorOutput {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub exit_code: u8,
}

impl ErrorOutput {
    pub fn from_insights_error(err: &InsightsError) -> Self {
        let (error, row) = match err {
            InsightsError::DataIntegrity { row, .. } => ("data_integrity", Some(*row)),
            InsightsError::EmptyPopulation => ("empty_population", None),
            InsightsError::DivisionUndefined { .. } => ("division_undefined", None),
            InsightsError::ConfigParse(_) => ("config_parse", None),
            InsightsError::ConfigValidation(_) => ("config_validation", None),
            InsightsError::MissingColumn { .. } => ("missing_column", None),
            InsightsError::Csv(_) => ("csv", None),
        };
        Self {
            error,
            message: err.to_string(),
            row,
            exit_code: insights_exit_code(err),
        }
    }
}
