//! `shoplens analyze` / `shoplens validate`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use shoplens_insights::metrics::format_cents;
use shoplens_insights::{load_csv_transactions, run, AnalysisConfig, AnalysisResult, CohortGranularity, InsightsError};

use crate::exit_codes::{insights_exit_code, ErrorOutput, EXIT_ERROR, EXIT_INVALID_CONFIG};
use crate::CliError;

pub struct AnalyzeArgs {
    pub ledger: PathBuf,
    pub config: Option<PathBuf>,
    pub as_of: Option<NaiveDate>,
    pub churn_days: Option<u32>,
    pub granularity: Option<CohortGranularity>,
    pub json: bool,
    pub output: Option<PathBuf>,
}

fn hint_for(err: &InsightsError) -> Option<&'static str> {
    match err {
        InsightsError::DataIntegrity { .. } => {
            Some("pass --as-of on or after the latest transaction date, or drop the future-dated row")
        }
        InsightsError::EmptyPopulation => {
            Some("every row was rejected; check the column mapping and rerun with -v for the skip report")
        }
        InsightsError::MissingColumn { .. } => Some("map the column under [ledger.columns] in the config"),
        _ => None,
    }
}

/// Convert an engine error into a `CliError`. Under `--json` the error is
/// also emitted as a JSON object on stderr and the plain message suppressed.
fn engine_err(err: InsightsError, json: bool) -> CliError {
    let code = insights_exit_code(&err);
    if json {
        if let Ok(out) = serde_json::to_string(&ErrorOutput::from_insights_error(&err)) {
            eprintln!("{out}");
            return CliError { code, message: String::new(), hint: None };
        }
    }
    let cli_err = CliError { code, message: err.to_string(), hint: None };
    match hint_for(&err) {
        Some(hint) => cli_err.with_hint(hint),
        None => cli_err,
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, CliError> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    AnalysisConfig::from_toml(&config_str).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: format!("{}: {e}", path.display()),
        hint: None,
    })
}

pub fn cmd_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    if args.output.as_deref() == Some(args.ledger.as_path()) {
        return Err(CliError::args("--output would overwrite the ledger"));
    }

    let mut config = load_config(args.config.as_deref())?;

    // Flags override file values.
    if args.as_of.is_some() {
        config.as_of = args.as_of;
    }
    if let Some(days) = args.churn_days {
        config.churn.inactivity_days = days;
    }
    if let Some(granularity) = args.granularity {
        config.cohort.granularity = granularity;
    }
    let fingerprint = config.fingerprint().map_err(|e| engine_err(e, args.json))?;
    log::debug!("effective config {fingerprint}");

    let csv_data = std::fs::read(&args.ledger).map_err(|e| {
        CliError::io(format!("cannot read {}: {e}", args.ledger.display()))
    })?;
    let input = load_csv_transactions(&csv_data, &config.ledger).map_err(|e| engine_err(e, args.json))?;
    let result = run(&config, &input).map_err(|e| engine_err(e, args.json))?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError { code: EXIT_ERROR, message: format!("JSON serialization error: {e}"), hint: None })?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    print_summary(&result);
    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &AnalysisResult) {
    let k = &result.key_metrics;
    eprintln!(
        "as of {}: {} order(s) from {} customer(s), revenue {}, avg order {}",
        result.meta.as_of,
        k.total_orders,
        k.unique_customers,
        format_cents(k.total_revenue_cents),
        format_cents(k.avg_order_value_cents),
    );

    if !result.skipped.is_empty() {
        let reasons: Vec<String> = result
            .skipped
            .by_reason
            .iter()
            .map(|(reason, n)| format!("{n} {reason}"))
            .collect();
        eprintln!("skipped {} row(s): {}", result.skipped.total, reasons.join(", "));
    }

    eprintln!("segments:");
    for s in &result.segments {
        eprintln!(
            "  {:<10} {:>6} customer(s)  {:>12}",
            s.segment.to_string(),
            s.customers,
            format_cents(s.revenue_cents),
        );
    }

    eprintln!(
        "cohorts: {} {} cohort(s)",
        result.cohorts.len(),
        result.meta.granularity,
    );

    let c = &result.churn;
    eprintln!(
        "churn: {} of {} customer(s) inactive > {} days ({:.1}%), {} revenue at risk",
        c.churned_customers,
        k.unique_customers,
        c.inactivity_days,
        c.churn_rate * 100.0,
        format_cents(c.at_risk_revenue_cents),
    );
    let r = &result.churn_risk;
    eprintln!("risk: {} high, {} medium, {} low", r.high, r.medium, r.low);
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;
    eprintln!(
        "valid: {} segment rule(s), {} cohorts, churn after {} days",
        config.segments.rules.len(),
        config.cohort.granularity,
        config.churn.inactivity_days,
    );
    Ok(())
}
