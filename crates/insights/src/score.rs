//! RFM quintile scoring.
//!
//! Each dimension is binned independently over the whole population:
//! values are ordered worst to best and a value whose first position in that
//! order is `i` (of `n`) scores `max(1, ceil(i * 5 / (n - 1)))`, so the worst
//! value always scores 1 and the best always scores 5. Equal values share the
//! lowest bin any of them would occupy, so a low-cardinality dimension
//! (frequency, usually) produces fewer than five distinct scores rather than
//! splitting ties. A single-customer population scores 5 everywhere.

use crate::error::{InsightsError, InsightsResult};
use crate::model::{CustomerProfile, RfmScore};

pub const MAX_SCORE: u8 = 5;

/// Scores in the same order as `profiles`.
pub fn score_profiles(profiles: &[CustomerProfile]) -> InsightsResult<Vec<RfmScore>> {
    if profiles.is_empty() {
        return Err(InsightsError::EmptyPopulation);
    }

    // Negated so that ascending order runs from stalest to most recent.
    let recency: Vec<i64> = profiles.iter().map(|p| -p.recency_days).collect();
    let frequency: Vec<u32> = profiles.iter().map(|p| p.frequency).collect();
    let monetary: Vec<i64> = profiles.iter().map(|p| p.monetary_cents).collect();

    let r = quintile_scores(&recency);
    let f = quintile_scores(&frequency);
    let m = quintile_scores(&monetary);

    Ok((0..profiles.len())
        .map(|i| RfmScore::new(r[i], f[i], m[i]))
        .collect())
}

/// Quintile score (1..=5) for every value, larger values scoring higher.
pub fn quintile_scores<T: Ord + Copy>(values: &[T]) -> Vec<u8> {
    let n = values.len();
    if n == 1 {
        return vec![MAX_SCORE];
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let last = n - 1;
    values
        .iter()
        .map(|v| {
            let first = sorted.partition_point(|x| x < v);
            // ceil(first * 5 / last); first == last lands exactly on 5.
            let bin = (first * MAX_SCORE as usize).div_ceil(last);
            bin.max(1) as u8
        })
        .collect()
}
