use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::InsightsError;
use crate::segment::SegmentRules;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Analysis options. Every section is optional; an empty document yields
/// the documented defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Reference date for recency. Defaults to the latest valid transaction date.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub churn: ChurnConfig,
    #[serde(default)]
    pub cohort: CohortConfig,
    #[serde(default)]
    pub segments: SegmentRules,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

// ---------------------------------------------------------------------------
// Churn
// ---------------------------------------------------------------------------

pub const DEFAULT_INACTIVITY_DAYS: u32 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnConfig {
    /// A customer is churned when `recency_days > inactivity_days`.
    #[serde(default = "default_inactivity_days")]
    pub inactivity_days: u32,
}

fn default_inactivity_days() -> u32 {
    DEFAULT_INACTIVITY_DAYS
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            inactivity_days: DEFAULT_INACTIVITY_DAYS,
        }
    }
}

// ---------------------------------------------------------------------------
// Cohort
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortConfig {
    #[serde(default)]
    pub granularity: CohortGranularity,
}

/// Calendar bucket used for acquisition cohorts and retention offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortGranularity {
    /// ISO weeks, Monday start.
    Weekly,
    #[default]
    Monthly,
    Quarterly,
}

impl std::fmt::Display for CohortGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Quarterly => write!(f, "quarterly"),
        }
    }
}

impl std::str::FromStr for CohortGranularity {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            other => Err(InsightsError::ConfigValidation(format!(
                "unknown cohort granularity \"{other}\" (expected weekly, monthly or quarterly)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub columns: ColumnMapping,
    /// chrono format string tried before the built-in ISO formats.
    #[serde(default)]
    pub date_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(default = "default_customer_id")]
    pub customer_id: String,
    #[serde(default = "default_transaction_date")]
    pub transaction_date: String,
    #[serde(default = "default_total_amount")]
    pub total_amount: String,
    /// Optional column; rows from a ledger without it are uncategorized.
    #[serde(default = "default_product_category")]
    pub product_category: String,
}

fn default_customer_id() -> String {
    "customer_id".into()
}

fn default_transaction_date() -> String {
    "transaction_date".into()
}

fn default_total_amount() -> String {
    "total_amount".into()
}

fn default_product_category() -> String {
    "product_category".into()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            customer_id: default_customer_id(),
            transaction_date: default_transaction_date(),
            total_amount: default_total_amount(),
            product_category: default_product_category(),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,
}

fn default_top_categories() -> usize {
    10
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_categories: default_top_categories(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl AnalysisConfig {
    pub fn from_toml(input: &str) -> Result<Self, InsightsError> {
        let config: AnalysisConfig =
            toml::from_str(input).map_err(|e| InsightsError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InsightsError> {
        self.segments.validate()?;

        let cols = &self.ledger.columns;
        let named = [
            ("customer_id", &cols.customer_id),
            ("transaction_date", &cols.transaction_date),
            ("total_amount", &cols.total_amount),
            ("product_category", &cols.product_category),
        ];
        for (field, name) in &named {
            if name.trim().is_empty() {
                return Err(InsightsError::ConfigValidation(format!(
                    "ledger.columns.{field} must not be empty"
                )));
            }
        }
        for (i, (field_a, a)) in named.iter().enumerate() {
            for (field_b, b) in &named[i + 1..] {
                if a == b {
                    return Err(InsightsError::ConfigValidation(format!(
                        "ledger.columns.{field_a} and ledger.columns.{field_b} both map to '{a}'"
                    )));
                }
            }
        }

        if self.report.top_categories == 0 {
            return Err(InsightsError::ConfigValidation(
                "report.top_categories must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Stable digest of the effective configuration, used as part of cache keys.
    pub fn fingerprint(&self) -> Result<String, InsightsError> {
        // Plain structs and Vecs only: serde_json output is deterministic here.
        let canonical = serde_json::to_string(self).map_err(|e| {
            InsightsError::ConfigValidation(format!("config cannot be fingerprinted: {e}"))
        })?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(format!("sha256:{:x}", hasher.finalize()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
