use crate::model::{ChurnFlag, ChurnReport, ChurnRisk, CustomerInsight, CustomerProfile, RiskDistribution};

/// Flag customers inactive for strictly more than `inactivity_days` and total
/// the revenue they represent.
pub fn estimate_churn(profiles: &[CustomerProfile], inactivity_days: u32) -> ChurnReport {
    let threshold = inactivity_days as i64;

    let flags: Vec<ChurnFlag> = profiles
        .iter()
        .map(|p| {
            let churned = p.recency_days > threshold;
            ChurnFlag {
                customer_id: p.customer_id.clone(),
                recency_days: p.recency_days,
                churned,
                at_risk_revenue_cents: if churned { p.monetary_cents } else { 0 },
            }
        })
        .collect();

    let churned_customers = flags.iter().filter(|f| f.churned).count();
    let at_risk_revenue_cents = flags.iter().map(|f| f.at_risk_revenue_cents).sum();
    let churn_rate = if flags.is_empty() {
        0.0
    } else {
        churned_customers as f64 / flags.len() as f64
    };

    ChurnReport {
        inactivity_days,
        churned_customers,
        at_risk_revenue_cents,
        churn_rate,
        flags,
    }
}

impl ChurnRisk {
    /// Tier by recency score: 1-2 high, 3 medium, 4-5 low.
    pub fn from_recency_score(r: u8) -> Self {
        match r {
            0..=2 => Self::High,
            3 => Self::Medium,
            _ => Self::Low,
        }
    }
}

pub fn risk_distribution(customers: &[CustomerInsight]) -> RiskDistribution {
    let mut dist = RiskDistribution::default();
    for c in customers {
        match c.churn_risk {
            ChurnRisk::Low => dist.low += 1,
            ChurnRisk::Medium => dist.medium += 1,
            ChurnRisk::High => dist.high += 1,
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RfmScore, Segment};
    use chrono::NaiveDate;

    fn profile(id: &str, recency: i64, cents: i64) -> CustomerProfile {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        CustomerProfile {
            customer_id: id.into(),
            recency_days: recency,
            frequency: 1,
            monetary_cents: cents,
            first_purchase_date: d,
            last_purchase_date: d,
        }
    }

    #[test]
    fn threshold_is_strict() {
        let profiles = vec![profile("C3", 95, 12_000), profile("C4", 90, 8_000)];
        let report = estimate_churn(&profiles, 90);

        assert!(report.flags[0].churned);
        assert_eq!(report.flags[0].at_risk_revenue_cents, 12_000);
        assert!(!report.flags[1].churned);
        assert_eq!(report.flags[1].at_risk_revenue_cents, 0);

        assert_eq!(report.churned_customers, 1);
        assert_eq!(report.at_risk_revenue_cents, 12_000);
        assert_eq!(report.churn_rate, 0.5);
        assert_eq!(report.inactivity_days, 90);
    }

    #[test]
    fn one_day_over_is_flagged() {
        let report = estimate_churn(&[profile("a", 91, 100)], 90);
        assert!(report.flags[0].churned);
    }

    #[test]
    fn zero_threshold_flags_any_inactivity() {
        let report = estimate_churn(&[profile("a", 0, 100), profile("b", 1, 200)], 0);
        assert!(!report.flags[0].churned);
        assert!(report.flags[1].churned);
        assert_eq!(report.at_risk_revenue_cents, 200);
    }

    #[test]
    fn empty_profiles_yield_empty_report() {
        let report = estimate_churn(&[], 90);
        assert_eq!(report.churned_customers, 0);
        assert_eq!(report.churn_rate, 0.0);
        assert!(report.flags.is_empty());
    }

    #[test]
    fn risk_tiers() {
        assert_eq!(ChurnRisk::from_recency_score(1), ChurnRisk::High);
        assert_eq!(ChurnRisk::from_recency_score(2), ChurnRisk::High);
        assert_eq!(ChurnRisk::from_recency_score(3), ChurnRisk::Medium);
        assert_eq!(ChurnRisk::from_recency_score(4), ChurnRisk::Low);
        assert_eq!(ChurnRisk::from_recency_score(5), ChurnRisk::Low);
    }

    #[test]
    fn distribution_counts_tiers() {
        let make = |r: u8| CustomerInsight {
            profile: profile("x", 10, 100),
            score: RfmScore::new(r, 3, 3),
            rfm_code: format!("{r}33"),
            segment: Segment::Potential,
            churn_risk: ChurnRisk::from_recency_score(r),
        };
        let customers: Vec<CustomerInsight> = [1, 2, 3, 4, 5, 5].into_iter().map(make).collect();
        let dist = risk_distribution(&customers);
        assert_eq!(dist, RiskDistribution { low: 3, medium: 1, high: 2 });
    }
}
