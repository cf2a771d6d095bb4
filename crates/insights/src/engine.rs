use sha2::{Digest, Sha256};

use crate::churn::{estimate_churn, risk_distribution};
use crate::cohort::build_cohorts;
use crate::config::AnalysisConfig;
use crate::error::InsightsError;
use crate::metrics::{compute_key_metrics, monthly_trends, top_categories};
use crate::model::{AnalysisMeta, AnalysisResult, ChurnRisk, CustomerInsight, LedgerInput};
use crate::profile::{build_profiles, resolve_as_of, screen_transactions};
use crate::score::score_profiles;
use crate::segment::summarize_segments;

/// Run the full analysis. Pure: same input and config, same result.
pub fn run(config: &AnalysisConfig, input: &LedgerInput) -> Result<AnalysisResult, InsightsError> {
    let screened = screen_transactions(&input.transactions);
    let mut skipped = input.rejected.clone();
    skipped.merge(&screened.skipped);
    if !skipped.is_empty() {
        log::warn!(
            "excluded {} row(s) from analysis: {:?}",
            skipped.total,
            skipped.by_reason
        );
    }

    let valid = screened.valid;
    let as_of = resolve_as_of(&valid, config.as_of)?;

    // Computed once; every downstream stage reads this same snapshot.
    let profiles = build_profiles(&valid, as_of)?;
    log::debug!("built {} customer profile(s) as of {as_of}", profiles.len());

    // Checked total first: it bounds every unchecked sum below.
    let key_metrics = compute_key_metrics(&valid)?;

    let scores = score_profiles(&profiles)?;

    let customers: Vec<CustomerInsight> = profiles
        .iter()
        .zip(&scores)
        .map(|(profile, &score)| CustomerInsight {
            profile: profile.clone(),
            score,
            rfm_code: score.code(),
            segment: config.segments.classify(score),
            churn_risk: ChurnRisk::from_recency_score(score.r),
        })
        .collect();

    let segments = summarize_segments(&customers);
    let cohorts = build_cohorts(&profiles, &valid, config.cohort.granularity, as_of);
    log::debug!("built {} {} cohort(s)", cohorts.len(), config.cohort.granularity);

    let churn = estimate_churn(&profiles, config.churn.inactivity_days);
    let churn_risk = risk_distribution(&customers);
    let categories = top_categories(&valid, config.report.top_categories);
    let trends = monthly_trends(&valid);

    log::info!(
        "analysed {} transaction(s), {} customer(s); {} churned past {} days",
        valid.len(),
        customers.len(),
        churn.churned_customers,
        config.churn.inactivity_days,
    );

    Ok(AnalysisResult {
        meta: AnalysisMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            as_of,
            granularity: config.cohort.granularity,
            inactivity_days: config.churn.inactivity_days,
            table_fingerprint: fingerprint_table(input),
            valid_transactions: valid.len(),
        },
        key_metrics,
        customers,
        segments,
        cohorts,
        churn,
        churn_risk,
        categories,
        trends,
        skipped,
    })
}

/// SHA-256 over every loaded row and every loader rejection, in input order.
pub fn fingerprint_table(input: &LedgerInput) -> String {
    let mut hasher = Sha256::new();
    for t in &input.transactions {
        hasher.update(
            format!(
                "{}\x1f{}\x1f{}\x1f{}\x1f{}\n",
                t.row,
                t.customer_id,
                t.transaction_date,
                t.amount_cents,
                t.product_category.as_deref().unwrap_or("")
            )
            .as_bytes(),
        );
    }
    for s in &input.rejected.rows {
        hasher.update(format!("skip\x1f{}\x1f{}\n", s.row, s.reason).as_bytes());
    }
    format!("sha256:{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Segment, SkipReason, Transaction};
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn txn(row: usize, customer: &str, d: &str, cents: i64) -> Transaction {
        Transaction {
            row,
            customer_id: customer.into(),
            transaction_date: date(d),
            amount_cents: cents,
            product_category: None,
        }
    }

    fn reference_input() -> LedgerInput {
        LedgerInput::from(vec![
            txn(1, "C1", "2024-01-01", 10_000),
            txn(2, "C1", "2024-02-01", 5_000),
            txn(3, "C2", "2024-01-15", 20_000),
        ])
    }

    #[test]
    fn reference_example() {
        let config = AnalysisConfig {
            as_of: Some(date("2024-03-01")),
            ..AnalysisConfig::default()
        };
        let result = run(&config, &reference_input()).unwrap();

        assert_eq!(result.meta.as_of, date("2024-03-01"));
        assert_eq!(result.key_metrics.total_revenue_cents, 35_000);
        assert_eq!(result.key_metrics.total_orders, 3);
        assert_eq!(result.key_metrics.unique_customers, 2);
        assert_eq!(result.key_metrics.avg_order_value_cents, 11_667);

        let c1 = &result.customers[0].profile;
        assert_eq!((c1.recency_days, c1.frequency, c1.monetary_cents), (29, 2, 15_000));
        let c2 = &result.customers[1].profile;
        assert_eq!((c2.recency_days, c2.frequency, c2.monetary_cents), (45, 1, 20_000));

        // Two customers: the better of each pair scores 5, the other 1.
        assert_eq!(result.customers[0].rfm_code, "551");
        assert_eq!(result.customers[1].rfm_code, "115");
        assert_eq!(result.customers[0].segment, Segment::Loyal);
        assert_eq!(result.customers[1].segment, Segment::Potential);

        assert_eq!(result.churn.churned_customers, 0);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn default_as_of_is_latest_transaction() {
        let result = run(&AnalysisConfig::default(), &reference_input()).unwrap();
        assert_eq!(result.meta.as_of, date("2024-02-01"));
        assert_eq!(result.customers[0].profile.recency_days, 0);
    }

    #[test]
    fn screening_and_loader_rejections_are_merged() {
        let mut input = LedgerInput::from(vec![
            txn(1, "C1", "2024-01-01", 10_000),
            txn(3, "", "2024-01-02", 100),
            txn(4, "C2", "2024-01-03", -1),
        ]);
        input.rejected.record(2, SkipReason::UnparseableDate);

        let result = run(&AnalysisConfig::default(), &input).unwrap();
        assert_eq!(result.skipped.total, 3);
        let rows: Vec<usize> = result.skipped.rows.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![2, 3, 4]);
        assert_eq!(result.key_metrics.total_orders, 1);
        assert_eq!(result.meta.valid_transactions, 1);
    }

    #[test]
    fn all_rows_invalid_is_empty_population() {
        let input = LedgerInput::from(vec![txn(1, "", "2024-01-01", 100)]);
        let err = run(&AnalysisConfig::default(), &input).unwrap_err();
        assert!(matches!(err, InsightsError::EmptyPopulation));
    }

    #[test]
    fn future_dated_row_aborts_with_integrity_error() {
        let config = AnalysisConfig {
            as_of: Some(date("2024-01-31")),
            ..AnalysisConfig::default()
        };
        let err = run(&config, &reference_input()).unwrap_err();
        assert!(matches!(err, InsightsError::DataIntegrity { row: 2, .. }));
    }

    #[test]
    fn revenue_overflow_is_integrity_error() {
        // Each customer fits in i64 on its own; the table total does not.
        let input = LedgerInput::from(vec![
            txn(1, "C1", "2024-01-01", i64::MAX - 10),
            txn(2, "C2", "2024-01-02", 20),
        ]);
        let err = run(&AnalysisConfig::default(), &input).unwrap_err();
        assert!(matches!(err, InsightsError::DataIntegrity { row: 2, .. }));

        let input = LedgerInput::from(vec![
            txn(1, "C1", "2024-01-01", i64::MAX),
            txn(2, "C1", "2024-01-02", 1),
        ]);
        let err = run(&AnalysisConfig::default(), &input).unwrap_err();
        assert!(matches!(err, InsightsError::DataIntegrity { row: 2, .. }));
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = reference_input();
        let mut b = reference_input();
        assert_eq!(fingerprint_table(&a), fingerprint_table(&b));
        b.transactions[0].amount_cents += 1;
        assert_ne!(fingerprint_table(&a), fingerprint_table(&b));
    }
}
