//! Segment classification: ordered rule table over RFM score triples.
//!
//! Rules are evaluated top to bottom and the first match wins. A rule lists
//! any combination of criteria (explicit codes, per-dimension ranges, a
//! score-sum range) and matches only when all of them hold. A score matched
//! by no rule gets the table's fallback segment.

use serde::{Deserialize, Serialize};

use crate::error::InsightsError;
use crate::model::{CustomerInsight, RfmScore, Segment, SegmentSummary};

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRule {
    pub segment: Segment,
    /// Accepted score codes, e.g. `"554"`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<String>,
    /// Inclusive `[min, max]` range on the recency score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<[u8; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f: Option<[u8; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<[u8; 2]>,
    /// Inclusive `[min, max]` range on `r + f + m`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<[u8; 2]>,
}

impl SegmentRule {
    /// A rule with no criteria; build on it with struct update syntax.
    pub(crate) fn empty(segment: Segment) -> Self {
        Self {
            segment,
            codes: Vec::new(),
            r: None,
            f: None,
            m: None,
            sum: None,
        }
    }

    pub fn by_codes(segment: Segment, codes: &[&str]) -> Self {
        Self {
            codes: codes.iter().map(|c| c.to_string()).collect(),
            ..Self::empty(segment)
        }
    }

    pub fn by_sum(segment: Segment, min: u8, max: u8) -> Self {
        Self {
            sum: Some([min, max]),
            ..Self::empty(segment)
        }
    }

    pub fn has_criteria(&self) -> bool {
        !self.codes.is_empty()
            || self.r.is_some()
            || self.f.is_some()
            || self.m.is_some()
            || self.sum.is_some()
    }

    pub fn matches(&self, score: RfmScore) -> bool {
        if !self.has_criteria() {
            return false;
        }
        if !self.codes.is_empty() {
            let code = score.code();
            if !self.codes.iter().any(|c| *c == code) {
                return false;
            }
        }
        in_range(self.r, score.r)
            && in_range(self.f, score.f)
            && in_range(self.m, score.m)
            && in_range(self.sum, score.sum())
    }
}

fn in_range(range: Option<[u8; 2]>, value: u8) -> bool {
    match range {
        Some([min, max]) => value >= min && value <= max,
        None => true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRules {
    #[serde(default = "default_rules")]
    pub rules: Vec<SegmentRule>,
    #[serde(default = "default_fallback")]
    pub fallback: Segment,
}

/// Score-sum bands, most exclusive first. Champions covers 555/554/544 and
/// every other triple summing to 13 or more.
fn default_rules() -> Vec<SegmentRule> {
    vec![
        SegmentRule::by_sum(Segment::Champions, 13, 15),
        SegmentRule::by_sum(Segment::Loyal, 10, 15),
        SegmentRule::by_sum(Segment::Potential, 7, 15),
        SegmentRule::by_sum(Segment::AtRisk, 5, 15),
        SegmentRule::by_sum(Segment::Lost, 3, 15),
    ]
}

fn default_fallback() -> Segment {
    Segment::Other
}

impl Default for SegmentRules {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            fallback: default_fallback(),
        }
    }
}

impl SegmentRules {
    pub fn new(rules: Vec<SegmentRule>, fallback: Segment) -> Self {
        Self { rules, fallback }
    }

    /// First matching rule wins; unmatched scores get the fallback.
    pub fn classify(&self, score: RfmScore) -> Segment {
        self.rules
            .iter()
            .find(|rule| rule.matches(score))
            .map(|rule| rule.segment)
            .unwrap_or(self.fallback)
    }

    pub fn validate(&self) -> Result<(), InsightsError> {
        for (i, rule) in self.rules.iter().enumerate() {
            let label = format!("segments.rules[{i}] ({})", rule.segment);
            if !rule.has_criteria() {
                return Err(InsightsError::ConfigValidation(format!(
                    "{label}: rule has no criteria"
                )));
            }
            for code in &rule.codes {
                let valid = code.len() == 3 && code.chars().all(|c| ('1'..='5').contains(&c));
                if !valid {
                    return Err(InsightsError::ConfigValidation(format!(
                        "{label}: invalid score code '{code}' (expected three digits 1-5)"
                    )));
                }
            }
            for (dim, range) in [("r", rule.r), ("f", rule.f), ("m", rule.m)] {
                check_range(&label, dim, range, 1, 5)?;
            }
            check_range(&label, "sum", rule.sum, 3, 15)?;
        }
        Ok(())
    }
}

fn check_range(
    label: &str,
    dim: &str,
    range: Option<[u8; 2]>,
    lo: u8,
    hi: u8,
) -> Result<(), InsightsError> {
    if let Some([min, max]) = range {
        if min > max || min < lo || max > hi {
            return Err(InsightsError::ConfigValidation(format!(
                "{label}: {dim} range [{min}, {max}] must satisfy {lo} <= min <= max <= {hi}"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Per-segment rollup in canonical order. The five named segments are always
/// present; `Other` only when some customer fell through the table.
pub fn summarize_segments(customers: &[CustomerInsight]) -> Vec<SegmentSummary> {
    Segment::ALL
        .iter()
        .filter_map(|&segment| {
            let members: Vec<&CustomerInsight> =
                customers.iter().filter(|c| c.segment == segment).collect();
            if segment == Segment::Other && members.is_empty() {
                return None;
            }

            let n = members.len();
            let revenue_cents: i64 = members.iter().map(|c| c.profile.monetary_cents).sum();
            let mean = |total: f64| if n == 0 { 0.0 } else { total / n as f64 };

            Some(SegmentSummary {
                segment,
                customers: n,
                revenue_cents,
                avg_recency_days: mean(members.iter().map(|c| c.profile.recency_days as f64).sum()),
                avg_frequency: mean(members.iter().map(|c| c.profile.frequency as f64).sum()),
                avg_monetary_cents: mean(revenue_cents as f64),
            })
        })
        .collect()
}
