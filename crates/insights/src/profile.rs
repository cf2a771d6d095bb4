//! Metric primitives: per-customer recency, frequency and monetary value.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{InsightsError, InsightsResult};
use crate::model::{CustomerProfile, SkipReason, SkipReport, Transaction};

/// Transactions that passed row screening, plus the report of those that didn't.
#[derive(Debug, Clone, Default)]
pub struct Screened {
    pub valid: Vec<Transaction>,
    pub skipped: SkipReport,
}

/// Drop rows with a blank customer id or a negative amount.
pub fn screen_transactions(transactions: &[Transaction]) -> Screened {
    let mut screened = Screened::default();
    for txn in transactions {
        if txn.customer_id.trim().is_empty() {
            screened.skipped.record(txn.row, SkipReason::MissingCustomerId);
        } else if txn.amount_cents < 0 {
            screened.skipped.record(txn.row, SkipReason::NegativeAmount);
        } else {
            screened.valid.push(txn.clone());
        }
    }
    screened
}

/// Explicit as-of date, or the latest transaction date in the valid set.
pub fn resolve_as_of(valid: &[Transaction], explicit: Option<NaiveDate>) -> InsightsResult<NaiveDate> {
    if valid.is_empty() {
        return Err(InsightsError::EmptyPopulation);
    }
    match explicit {
        Some(date) => Ok(date),
        None => valid
            .iter()
            .map(|t| t.transaction_date)
            .max()
            .ok_or(InsightsError::EmptyPopulation),
    }
}

struct Accum {
    first: NaiveDate,
    last: NaiveDate,
    count: u32,
    cents: i64,
}

/// One profile per distinct customer, sorted by customer id.
///
/// Expects screened rows. Any transaction dated after `as_of` is a
/// `DataIntegrity` error: recency would be negative.
pub fn build_profiles(valid: &[Transaction], as_of: NaiveDate) -> InsightsResult<Vec<CustomerProfile>> {
    if valid.is_empty() {
        return Err(InsightsError::EmptyPopulation);
    }

    let mut customers: BTreeMap<&str, Accum> = BTreeMap::new();
    for txn in valid {
        if txn.transaction_date > as_of {
            return Err(InsightsError::DataIntegrity {
                row: txn.row,
                reason: format!(
                    "transaction dated {} is after as-of date {as_of}",
                    txn.transaction_date
                ),
            });
        }

        let entry = customers.entry(txn.customer_id.as_str()).or_insert(Accum {
            first: txn.transaction_date,
            last: txn.transaction_date,
            count: 0,
            cents: 0,
        });
        entry.first = entry.first.min(txn.transaction_date);
        entry.last = entry.last.max(txn.transaction_date);
        entry.count += 1;
        entry.cents = entry
            .cents
            .checked_add(txn.amount_cents)
            .ok_or_else(|| InsightsError::DataIntegrity {
                row: txn.row,
                reason: format!("revenue for customer '{}' overflows 64-bit cents", txn.customer_id),
            })?;
    }

    Ok(customers
        .into_iter()
        .map(|(id, acc)| CustomerProfile {
            customer_id: id.to_string(),
            recency_days: (as_of - acc.last).num_days(),
            frequency: acc.count,
            monetary_cents: acc.cents,
            first_purchase_date: acc.first,
            last_purchase_date: acc.last,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn reference_example() {
        let txns = vec![
            txn(1, "C1", "2024-01-01", 10_000),
            txn(2, "C1", "2024-02-01", 5_000),
            txn(3, "C2", "2024-01-15", 20_000),
        ];
        let profiles = build_profiles(&txns, date("2024-03-01")).unwrap();
        assert_eq!(profiles.len(), 2);

        let c1 = &profiles[0];
        assert_eq!(c1.customer_id, "C1");
        assert_eq!(c1.recency_days, 29);
        assert_eq!(c1.frequency, 2);
        assert_eq!(c1.monetary_cents, 15_000);
        assert_eq!(c1.first_purchase_date, date("2024-01-01"));
        assert_eq!(c1.last_purchase_date, date("2024-02-01"));

        let c2 = &profiles[1];
        assert_eq!(c2.recency_days, 45);
        assert_eq!(c2.frequency, 1);
        assert_eq!(c2.monetary_cents, 20_000);
    }

    #[test]
    fn screening_excludes_and_reports() {
        let txns = vec![
            txn(1, "C1", "2024-01-01", 10_000),
            txn(2, "  ", "2024-01-02", 500),
            txn(3, "C2", "2024-01-03", -100),
            txn(4, "C2", "2024-01-04", 0),
        ];
        let screened = screen_transactions(&txns);
        assert_eq!(screened.valid.len(), 2);
        assert_eq!(screened.skipped.total, 2);
        assert_eq!(screened.skipped.count(SkipReason::MissingCustomerId), 1);
        assert_eq!(screened.skipped.count(SkipReason::NegativeAmount), 1);
        assert_eq!(screened.skipped.rows[0].row, 2);
        assert_eq!(screened.skipped.rows[1].row, 3);
    }

    #[test]
    fn as_of_defaults_to_latest_transaction() {
        let txns = vec![
            txn(1, "C1", "2024-01-01", 100),
            txn(2, "C2", "2024-02-10", 100),
            txn(3, "C1", "2024-01-20", 100),
        ];
        assert_eq!(resolve_as_of(&txns, None).unwrap(), date("2024-02-10"));
        assert_eq!(
            resolve_as_of(&txns, Some(date("2024-06-30"))).unwrap(),
            date("2024-06-30")
        );
    }

    #[test]
    fn empty_population_is_an_error() {
        assert!(matches!(resolve_as_of(&[], None), Err(InsightsError::EmptyPopulation)));
        assert!(matches!(
            build_profiles(&[], date("2024-01-01")),
            Err(InsightsError::EmptyPopulation)
        ));
    }

    #[test]
    fn future_dated_transaction_fails() {
        let txns = vec![txn(1, "C1", "2024-01-01", 100), txn(7, "C2", "2024-03-02", 100)];
        let err = build_profiles(&txns, date("2024-03-01")).unwrap_err();
        match err {
            InsightsError::DataIntegrity { row, reason } => {
                assert_eq!(row, 7);
                assert!(reason.contains("2024-03-02"));
            }
            other => panic!("expected DataIntegrity, got {other:?}"),
        }
    }

    #[test]
    fn customer_revenue_overflow_fails() {
        let txns = vec![txn(3, "C1", "2024-01-01", i64::MAX), txn(9, "C1", "2024-01-02", 1)];
        let err = build_profiles(&txns, date("2024-03-01")).unwrap_err();
        assert!(matches!(err, InsightsError::DataIntegrity { row: 9, .. }));
    }

    #[test]
    fn same_day_purchase_has_zero_recency() {
        let txns = vec![txn(1, "C1", "2024-03-01", 100)];
        let profiles = build_profiles(&txns, date("2024-03-01")).unwrap();
        assert_eq!(profiles[0].recency_days, 0);
    }
}
