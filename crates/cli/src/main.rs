// ShopLens CLI - customer analytics over a transaction ledger

mod analyze;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use shoplens_insights::CohortGranularity;

use exit_codes::{EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "shoplens")]
#[command(about = "Customer RFM segments, cohorts and churn from a transaction ledger")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a ledger CSV and report segments, cohorts, churn and key metrics
    #[command(after_help = "\
Examples:
  shoplens analyze orders.csv
  shoplens analyze orders.csv --config shop.analysis.toml
  shoplens analyze orders.csv --as-of 2024-03-31 --churn-days 60 --json
  shoplens analyze orders.csv --granularity weekly --output insights.json")]
    Analyze {
        /// Ledger CSV (customer_id, transaction_date, total_amount[, product_category])
        ledger: PathBuf,

        /// Analysis config TOML (defaults apply when omitted)
        #[arg(long, short = 'c', env = "SHOPLENS_CONFIG")]
        config: Option<PathBuf>,

        /// Reference date for recency and churn (default: latest transaction)
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_as_of)]
        as_of: Option<NaiveDate>,

        /// Days of inactivity after which a customer counts as churned
        #[arg(long, value_name = "DAYS")]
        churn_days: Option<u32>,

        /// Cohort bucket size
        #[arg(long)]
        granularity: Option<Granularity>,

        /// Print the JSON bundle to stdout (summary stays on stderr)
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Validate an analysis config without running
    #[command(after_help = "\
Examples:
  shoplens validate shop.analysis.toml")]
    Validate {
        /// Path to the analysis config TOML
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Granularity {
    Weekly,
    Monthly,
    Quarterly,
}

impl From<Granularity> for CohortGranularity {
    fn from(g: Granularity) -> Self {
        match g {
            Granularity::Weekly => CohortGranularity::Weekly,
            Granularity::Monthly => CohortGranularity::Monthly,
            Granularity::Quarterly => CohortGranularity::Quarterly,
        }
    }
}

fn parse_as_of(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  shoplens-insights ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
        "\nprofile: ", env!("SHOPLENS_BUILD_PROFILE"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format_timestamp(None);
    // RUST_LOG directives are applied last and win over -v.
    builder.parse_default_env();
    builder.init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            ledger,
            config,
            as_of,
            churn_days,
            granularity,
            json,
            output,
        } => analyze::cmd_analyze(analyze::AnalyzeArgs {
            ledger,
            config,
            as_of,
            churn_days,
            granularity: granularity.map(Into::into),
            json,
            output,
        }),
        Commands::Validate { config } => analyze::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
