//! CSV ledger loading.
//!
//! Maps configured columns onto [`Transaction`] rows. A missing column is a
//! hard error; a row with a blank, unparseable or non-UTF-8 field is rejected
//! into the skip report and loading continues. The ledger is read as raw
//! bytes: only the fields a row actually needs have to be valid UTF-8, and
//! the optional category is decoded lossily.

use chrono::{NaiveDate, NaiveDateTime};
use csv::ByteRecord;

use crate::config::LedgerConfig;
use crate::error::InsightsError;
use crate::model::{LedgerInput, SkipReason, SkipReport, Transaction};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

struct ColumnIndex {
    customer: usize,
    date: usize,
    amount: usize,
    category: Option<usize>,
}

pub fn load_csv_transactions(csv_data: &[u8], config: &LedgerConfig) -> Result<LedgerInput, InsightsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();

    let col = &config.columns;
    let idx = |name: &str| -> Result<usize, InsightsError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| InsightsError::MissingColumn { column: name.into() })
    };

    let columns = ColumnIndex {
        customer: idx(&col.customer_id)?,
        date: idx(&col.transaction_date)?,
        amount: idx(&col.total_amount)?,
        category: headers.iter().position(|h| *h == col.product_category),
    };

    let date_format = config.date_format.as_deref();
    let mut transactions = Vec::new();
    let mut rejected = SkipReport::default();

    for (i, record) in reader.byte_records().enumerate() {
        let record = record?;
        let row = i + 1;
        match parse_record(&record, row, &columns, date_format) {
            Ok(txn) => transactions.push(txn),
            Err(reason) => rejected.record(row, reason),
        }
    }

    if !rejected.is_empty() {
        log::warn!("ledger: rejected {} unparseable row(s)", rejected.total);
    }
    log::debug!("ledger: loaded {} transaction(s)", transactions.len());

    Ok(LedgerInput {
        transactions,
        rejected,
    })
}

fn parse_record(
    record: &ByteRecord,
    row: usize,
    columns: &ColumnIndex,
    date_format: Option<&str>,
) -> Result<Transaction, SkipReason> {
    let field = |idx: usize| {
        match record.get(idx).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(bytes) => std::str::from_utf8(bytes)
                .map(Some)
                .map_err(|_| SkipReason::InvalidEncoding),
        }
    };

    // A blank customer id parses; screening rejects it later.
    let customer_id = field(columns.customer)?.unwrap_or("");
    let date_str = field(columns.date)?.ok_or(SkipReason::MissingField)?;
    let amount_str = field(columns.amount)?.ok_or(SkipReason::MissingField)?;

    let transaction_date = parse_date(date_str, date_format).ok_or(SkipReason::UnparseableDate)?;
    let amount_cents = parse_amount_cents(amount_str).ok_or(SkipReason::UnparseableAmount)?;

    let product_category = columns
        .category
        .and_then(|idx| record.get(idx))
        .filter(|v| !v.is_empty())
        .map(|v| String::from_utf8_lossy(v).into_owned());

    Ok(Transaction {
        row,
        customer_id: customer_id.to_string(),
        transaction_date,
        amount_cents,
        product_category,
    })
}

/// Parse a calendar date, accepting ISO dates and ISO date-times (time dropped).
pub fn parse_date(s: &str, custom_format: Option<&str>) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(fmt) = custom_format {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Parse a decimal amount to cents without going through f64.
///
/// Accepts `"1234.56"`, `"1234.5"`, `"1234"`, `"-12.30"`, `"$1,234.56"`.
/// More than two fractional digits is rejected rather than rounded.
pub fn parse_amount_cents(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let s = s.strip_prefix('$').unwrap_or(s);
    let s: String = s.chars().filter(|c| *c != ',').collect();

    let (whole_str, frac_str) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s.as_str(), ""),
    };
    if whole_str.is_empty() && frac_str.is_empty() {
        return None;
    }
    if !whole_str.chars().all(|c| c.is_ascii_digit()) || !frac_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = if whole_str.is_empty() { 0 } else { whole_str.parse().ok()? };
    let frac: i64 = match frac_str.len() {
        0 => 0,
        1 => frac_str.parse::<i64>().ok()? * 10,
        2 => frac_str.parse().ok()?,
        _ => return None,
    };

    let minor = whole.checked_mul(100)?.checked_add(frac)?;
    Some(if negative { -minor } else { minor })
}
