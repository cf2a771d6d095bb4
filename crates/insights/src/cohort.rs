//! Acquisition cohorts and period-over-period retention.
//!
//! A customer belongs to the cohort of the calendar period holding their
//! first purchase. For every offset from that period up to the as-of period,
//! the cohort reports how many members bought at least once in that
//! absolute period. Offsets with no activity are emitted with a zero count.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, Duration, NaiveDate};

use crate::config::CohortGranularity;
use crate::model::{Cohort, CustomerProfile, RetentionPoint, Transaction};

/// Monotonic index of the period containing `date`; consecutive periods differ by 1.
pub fn period_index(granularity: CohortGranularity, date: NaiveDate) -> i64 {
    let year = date.year() as i64;
    let month0 = date.month0() as i64;
    match granularity {
        // 0001-01-01 (day 1 from CE) is a Monday.
        CohortGranularity::Weekly => (date.num_days_from_ce() as i64 - 1).div_euclid(7),
        CohortGranularity::Monthly => year * 12 + month0,
        CohortGranularity::Quarterly => year * 4 + month0 / 3,
    }
}

/// First day of the period containing `date`.
pub fn period_start(granularity: CohortGranularity, date: NaiveDate) -> NaiveDate {
    match granularity {
        CohortGranularity::Weekly => {
            date - Duration::days(date.weekday().num_days_from_monday() as i64)
        }
        CohortGranularity::Monthly => date.with_day(1).unwrap_or(date),
        CohortGranularity::Quarterly => {
            let month = date.month0() / 3 * 3 + 1;
            NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
        }
    }
}

/// Human key for the period containing `date`: `2024-W03`, `2024-01`, `2024-Q1`.
pub fn period_label(granularity: CohortGranularity, date: NaiveDate) -> String {
    match granularity {
        CohortGranularity::Weekly => {
            let week = date.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        CohortGranularity::Monthly => format!("{}-{:02}", date.year(), date.month()),
        CohortGranularity::Quarterly => format!("{}-Q{}", date.year(), date.month0() / 3 + 1),
    }
}

/// Build the retention table, ordered by cohort start then offset.
///
/// `transactions` must be the same screened set the profiles came from.
pub fn build_cohorts(
    profiles: &[CustomerProfile],
    transactions: &[Transaction],
    granularity: CohortGranularity,
    as_of: NaiveDate,
) -> Vec<Cohort> {
    let horizon = period_index(granularity, as_of);

    let mut activity: HashMap<&str, BTreeSet<i64>> = HashMap::new();
    for txn in transactions {
        activity
            .entry(txn.customer_id.as_str())
            .or_default()
            .insert(period_index(granularity, txn.transaction_date));
    }

    let mut cohorts: BTreeMap<i64, Vec<&CustomerProfile>> = BTreeMap::new();
    for profile in profiles {
        cohorts
            .entry(period_index(granularity, profile.first_purchase_date))
            .or_default()
            .push(profile);
    }

    cohorts
        .into_iter()
        .map(|(start_idx, members)| {
            let anchor = members[0].first_purchase_date;
            let cohort_size = members.len();
            let last_offset = (horizon - start_idx).max(0);

            let retention = (0..=last_offset)
                .map(|offset| {
                    let period = start_idx + offset;
                    let retained_count = members
                        .iter()
                        .filter(|p| {
                            activity
                                .get(p.customer_id.as_str())
                                .is_some_and(|periods| periods.contains(&period))
                        })
                        .count();
                    RetentionPoint {
                        period_offset: offset as u32,
                        retained_count,
                        retention_rate: retained_count as f64 / cohort_size as f64,
                    }
                })
                .collect();

            Cohort {
                cohort_key: period_label(granularity, anchor),
                cohort_start: period_start(granularity, anchor),
                cohort_size,
                retention,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::build_profiles;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn txn(customer: &str, d: &str) -> Transaction {
        Transaction {
            row: 0,
            customer_id: customer.into(),
            transaction_date: date(d),
            amount_cents: 1_000,
            product_category: None,
        }
    }

    fn cohorts_for(txns: &[Transaction], granularity: CohortGranularity, as_of: &str) -> Vec<Cohort> {
        let profiles = build_profiles(txns, date(as_of)).unwrap();
        build_cohorts(&profiles, txns, granularity, date(as_of))
    }

    fn counts(cohort: &Cohort) -> Vec<usize> {
        cohort.retention.iter().map(|p| p.retained_count).collect()
    }

    #[test]
    fn monthly_retention() {
        let txns = vec![
            txn("a", "2024-01-03"),
            txn("a", "2024-02-11"),
            txn("b", "2024-01-20"),
            txn("b", "2024-03-02"),
            txn("c", "2024-01-31"),
            txn("d", "2024-02-14"),
            txn("d", "2024-03-14"),
        ];
        let cohorts = cohorts_for(&txns, CohortGranularity::Monthly, "2024-03-31");
        assert_eq!(cohorts.len(), 2);

        let jan = &cohorts[0];
        assert_eq!(jan.cohort_key, "2024-01");
        assert_eq!(jan.cohort_start, date("2024-01-01"));
        assert_eq!(jan.cohort_size, 3);
        assert_eq!(counts(jan), vec![3, 1, 1]);
        assert_eq!(jan.retention[1].retention_rate, 1.0 / 3.0);

        let feb = &cohorts[1];
        assert_eq!(feb.cohort_key, "2024-02");
        assert_eq!(feb.cohort_size, 1);
        assert_eq!(counts(feb), vec![1, 1]);
    }

    #[test]
    fn inactive_cohort_keeps_zero_offsets() {
        let txns = vec![txn("a", "2024-01-10"), txn("b", "2024-04-02")];
        let cohorts = cohorts_for(&txns, CohortGranularity::Monthly, "2024-04-30");
        let jan = &cohorts[0];
        assert_eq!(counts(jan), vec![1, 0, 0, 0]);
        assert_eq!(jan.retention[3].period_offset, 3);
        assert_eq!(jan.retention[3].retention_rate, 0.0);
    }

    #[test]
    fn reactivation_is_counted() {
        let txns = vec![txn("a", "2024-01-10"), txn("a", "2024-03-10")];
        let cohorts = cohorts_for(&txns, CohortGranularity::Monthly, "2024-03-31");
        assert_eq!(counts(&cohorts[0]), vec![1, 0, 1]);
    }

    #[test]
    fn multiple_purchases_in_one_period_count_once() {
        let txns = vec![
            txn("a", "2024-01-01"),
            txn("a", "2024-01-15"),
            txn("a", "2024-01-30"),
        ];
        let cohorts = cohorts_for(&txns, CohortGranularity::Monthly, "2024-01-31");
        assert_eq!(counts(&cohorts[0]), vec![1]);
    }

    #[test]
    fn quarterly_buckets() {
        let txns = vec![
            txn("a", "2023-11-20"),
            txn("a", "2024-02-01"),
            txn("b", "2024-01-05"),
        ];
        let cohorts = cohorts_for(&txns, CohortGranularity::Quarterly, "2024-03-31");
        assert_eq!(cohorts.len(), 2);
        assert_eq!(cohorts[0].cohort_key, "2023-Q4");
        assert_eq!(cohorts[0].cohort_start, date("2023-10-01"));
        assert_eq!(counts(&cohorts[0]), vec![1, 1]);
        assert_eq!(cohorts[1].cohort_key, "2024-Q1");
        assert_eq!(counts(&cohorts[1]), vec![1]);
    }

    #[test]
    fn weekly_buckets_start_monday() {
        // 2024-01-03 is a Wednesday; its week starts Monday 2024-01-01.
        let txns = vec![txn("a", "2024-01-03"), txn("a", "2024-01-08")];
        let cohorts = cohorts_for(&txns, CohortGranularity::Weekly, "2024-01-14");
        assert_eq!(cohorts[0].cohort_key, "2024-W01");
        assert_eq!(cohorts[0].cohort_start, date("2024-01-01"));
        assert_eq!(counts(&cohorts[0]), vec![1, 1]);
    }

    #[test]
    fn period_index_is_contiguous_across_years() {
        let dec = period_index(CohortGranularity::Monthly, date("2023-12-31"));
        let jan = period_index(CohortGranularity::Monthly, date("2024-01-01"));
        assert_eq!(jan - dec, 1);

        let sun = period_index(CohortGranularity::Weekly, date("2024-01-07"));
        let mon = period_index(CohortGranularity::Weekly, date("2024-01-08"));
        assert_eq!(mon - sun, 1);

        let q4 = period_index(CohortGranularity::Quarterly, date("2023-12-31"));
        let q1 = period_index(CohortGranularity::Quarterly, date("2024-01-01"));
        assert_eq!(q1 - q4, 1);
    }

    #[test]
    fn weekly_index_spans_monday_to_sunday() {
        let mon = period_index(CohortGranularity::Weekly, date("1970-01-05"));
        let sun = period_index(CohortGranularity::Weekly, date("1970-01-11"));
        let next = period_index(CohortGranularity::Weekly, date("1970-01-12"));
        assert_eq!(mon, sun);
        assert_eq!(next, mon + 1);
    }
}
