//! Headline totals and table-wide breakdowns (categories, monthly trend).

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::Datelike;

use crate::error::{InsightsError, InsightsResult};
use crate::model::{CategoryTotal, KeyMetrics, MonthlyTrend, Transaction};

/// Mean order value in cents, rounded half up.
pub fn avg_order_value_cents(total_revenue_cents: i64, total_orders: usize) -> InsightsResult<i64> {
    if total_orders == 0 {
        return Err(InsightsError::DivisionUndefined {
            what: "average order value with zero orders".into(),
        });
    }
    let n = total_orders as i128;
    let avg = (2 * total_revenue_cents as i128 + n).div_euclid(2 * n);
    Ok(avg as i64)
}

/// Sum of all amounts, or `DataIntegrity` at the row where the total leaves
/// the i64 range. Screened amounts are non-negative, so every partial sum
/// taken later (per segment, cohort, category, month) is bounded by this one.
pub fn checked_revenue_total(valid: &[Transaction]) -> InsightsResult<i64> {
    valid.iter().try_fold(0i64, |acc, t| {
        acc.checked_add(t.amount_cents).ok_or_else(|| InsightsError::DataIntegrity {
            row: t.row,
            reason: "total revenue overflows 64-bit cents".into(),
        })
    })
}

pub fn compute_key_metrics(valid: &[Transaction]) -> InsightsResult<KeyMetrics> {
    let total_revenue_cents = checked_revenue_total(valid)?;
    let total_orders = valid.len();
    let avg_order_value_cents = avg_order_value_cents(total_revenue_cents, total_orders)?;

    let unique_customers = valid
        .iter()
        .map(|t| t.customer_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let dates = valid.iter().map(|t| t.transaction_date);
    let first_transaction_date = dates.clone().min().ok_or(InsightsError::EmptyPopulation)?;
    let last_transaction_date = dates.max().ok_or(InsightsError::EmptyPopulation)?;

    Ok(KeyMetrics {
        total_revenue_cents,
        total_orders,
        unique_customers,
        avg_order_value_cents,
        first_transaction_date,
        last_transaction_date,
    })
}

/// Top `n` categories by revenue (ties broken by name, uncategorized last).
pub fn top_categories(valid: &[Transaction], n: usize) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<Option<&str>, (i64, usize)> = BTreeMap::new();
    for txn in valid {
        let category = txn
            .product_category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let entry = totals.entry(category).or_insert((0, 0));
        entry.0 += txn.amount_cents;
        entry.1 += 1;
    }

    let mut ranked: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, (revenue_cents, orders))| CategoryTotal {
            category: category.map(str::to_string),
            revenue_cents,
            orders,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.revenue_cents
            .cmp(&a.revenue_cents)
            .then_with(|| a.category.is_none().cmp(&b.category.is_none()))
            .then_with(|| a.category.cmp(&b.category))
    });
    ranked.truncate(n);
    ranked
}

/// Revenue, orders and active customers per calendar month, oldest first.
pub fn monthly_trends(valid: &[Transaction]) -> Vec<MonthlyTrend> {
    let mut months: BTreeMap<(i32, u32), (i64, usize, BTreeSet<&str>)> = BTreeMap::new();
    for txn in valid {
        let d = txn.transaction_date;
        let entry = months
            .entry((d.year(), d.month()))
            .or_insert_with(|| (0, 0, BTreeSet::new()));
        entry.0 += txn.amount_cents;
        entry.1 += 1;
        entry.2.insert(txn.customer_id.as_str());
    }

    months
        .into_iter()
        .map(|((year, month), (revenue_cents, orders, customers))| MonthlyTrend {
            month: format!("{year}-{month:02}"),
            revenue_cents,
            orders,
            unique_customers: customers.len(),
        })
        .collect()
}

/// Render cents as a plain decimal string: `11667` → `"116.67"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
