use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::CohortGranularity;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single purchase event from the ledger.
///
/// `row` is the 1-based data row in the source file (header excluded) and is
/// only used for reporting. Amounts are integer minor units (cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub row: usize,
    pub customer_id: String,
    pub transaction_date: NaiveDate,
    pub amount_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_category: Option<String>,
}

/// Pre-loaded ledger: parsed transactions plus rows the loader already rejected.
#[derive(Debug, Clone, Default)]
pub struct LedgerInput {
    pub transactions: Vec<Transaction>,
    pub rejected: SkipReport,
}

impl From<Vec<Transaction>> for LedgerInput {
    fn from(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            rejected: SkipReport::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Skip report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingField,
    MissingCustomerId,
    UnparseableDate,
    UnparseableAmount,
    NegativeAmount,
    InvalidEncoding,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField => write!(f, "missing_field"),
            Self::MissingCustomerId => write!(f, "missing_customer_id"),
            Self::UnparseableDate => write!(f, "unparseable_date"),
            Self::UnparseableAmount => write!(f, "unparseable_amount"),
            Self::NegativeAmount => write!(f, "negative_amount"),
            Self::InvalidEncoding => write!(f, "invalid_encoding"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: SkipReason,
}

/// Rows excluded from the analysis, counted by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipReport {
    pub total: usize,
    pub by_reason: BTreeMap<SkipReason, usize>,
    pub rows: Vec<SkippedRow>,
}

impl SkipReport {
    pub fn record(&mut self, row: usize, reason: SkipReason) {
        self.total += 1;
        *self.by_reason.entry(reason).or_insert(0) += 1;
        self.rows.push(SkippedRow { row, reason });
    }

    /// Fold another report into this one, keeping rows ordered by row number.
    pub fn merge(&mut self, other: &SkipReport) {
        for skipped in &other.rows {
            self.record(skipped.row, skipped.reason);
        }
        self.rows.sort_by_key(|s| s.row);
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn count(&self, reason: SkipReason) -> usize {
        self.by_reason.get(&reason).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Customer primitives + scores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub recency_days: i64,
    pub frequency: u32,
    pub monetary_cents: i64,
    pub first_purchase_date: NaiveDate,
    pub last_purchase_date: NaiveDate,
}

/// Quintile scores, each in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RfmScore {
    pub r: u8,
    pub f: u8,
    pub m: u8,
}

impl RfmScore {
    pub fn new(r: u8, f: u8, m: u8) -> Self {
        Self { r, f, m }
    }

    /// Three-digit code, e.g. `"545"`.
    pub fn code(&self) -> String {
        format!("{}{}{}", self.r, self.f, self.m)
    }

    pub fn sum(&self) -> u8 {
        self.r + self.f + self.m
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Champions,
    Loyal,
    Potential,
    AtRisk,
    Lost,
    /// Fallback when no rule in the table matches.
    Other,
}

impl Segment {
    /// Canonical reporting order.
    pub const ALL: [Segment; 6] = [
        Segment::Champions,
        Segment::Loyal,
        Segment::Potential,
        Segment::AtRisk,
        Segment::Lost,
        Segment::Other,
    ];
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Champions => write!(f, "Champions"),
            Self::Loyal => write!(f, "Loyal"),
            Self::Potential => write!(f, "Potential"),
            Self::AtRisk => write!(f, "At Risk"),
            Self::Lost => write!(f, "Lost"),
            Self::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurnRisk {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ChurnRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// One row of the customer table: primitives, scores and derived labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerInsight {
    #[serde(flatten)]
    pub profile: CustomerProfile,
    pub score: RfmScore,
    pub rfm_code: String,
    pub segment: Segment,
    pub churn_risk: ChurnRisk,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customers: usize,
    pub revenue_cents: i64,
    pub avg_recency_days: f64,
    pub avg_frequency: f64,
    pub avg_monetary_cents: f64,
}

// ---------------------------------------------------------------------------
// Cohorts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionPoint {
    pub period_offset: u32,
    pub retained_count: usize,
    pub retention_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cohort {
    pub cohort_key: String,
    pub cohort_start: NaiveDate,
    pub cohort_size: usize,
    pub retention: Vec<RetentionPoint>,
}

// ---------------------------------------------------------------------------
// Churn
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChurnFlag {
    pub customer_id: String,
    pub recency_days: i64,
    pub churned: bool,
    pub at_risk_revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChurnReport {
    pub inactivity_days: u32,
    pub churned_customers: usize,
    pub at_risk_revenue_cents: i64,
    pub churn_rate: f64,
    pub flags: Vec<ChurnFlag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

// ---------------------------------------------------------------------------
// Headline metrics + breakdowns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyMetrics {
    pub total_revenue_cents: i64,
    pub total_orders: usize,
    pub unique_customers: usize,
    pub avg_order_value_cents: i64,
    pub first_transaction_date: NaiveDate,
    pub last_transaction_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    /// `None` collects rows with no category; serialized as `null`.
    pub category: Option<String>,
    pub revenue_cents: i64,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTrend {
    pub month: String,
    pub revenue_cents: i64,
    pub orders: usize,
    pub unique_customers: usize,
}

// ---------------------------------------------------------------------------
// Output bundle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisMeta {
    pub engine_version: String,
    pub as_of: NaiveDate,
    pub granularity: CohortGranularity,
    pub inactivity_days: u32,
    pub table_fingerprint: String,
    pub valid_transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub meta: AnalysisMeta,
    pub key_metrics: KeyMetrics,
    pub customers: Vec<CustomerInsight>,
    pub segments: Vec<SegmentSummary>,
    pub cohorts: Vec<Cohort>,
    pub churn: ChurnReport,
    pub churn_risk: RiskDistribution,
    pub categories: Vec<CategoryTotal>,
    pub trends: Vec<MonthlyTrend>,
    pub skipped: SkipReport,
}
