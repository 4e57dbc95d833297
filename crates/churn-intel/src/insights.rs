//! Dashboard aggregates over persisted batch results.

use std::fmt;

use serde::Serialize;

use crate::batch::ScoredRecord;
use crate::scoring::{round_to, RiskTier};

/// Headline figures for the retention dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_customers: usize,
    pub avg_churn_probability: f64,
    pub high_risk_customers: usize,
    pub high_risk_pct: f64,
    pub total_revenue: f64,
    pub total_revenue_at_risk: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskBucketCount {
    pub risk_tier: RiskTier,
    pub count: usize,
}

/// Monthly revenue band: below 50, 50 to 100 inclusive, above 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RevenueSegment {
    #[serde(rename = "Low Revenue")]
    Low,
    #[serde(rename = "Mid Revenue")]
    Mid,
    #[serde(rename = "High Revenue")]
    High,
}

impl RevenueSegment {
    pub fn of(revenue: f64) -> Self {
        if revenue < 50.0 {
            Self::Low
        } else if revenue <= 100.0 {
            Self::Mid
        } else {
            Self::High
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low Revenue",
            Self::Mid => "Mid Revenue",
            Self::High => "High Revenue",
        }
    }
}

impl fmt::Display for RevenueSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub segment: RevenueSegment,
    pub customer_count: usize,
    pub avg_churn_probability: f64,
    pub revenue_at_risk: f64,
}

pub fn kpis(records: &[ScoredRecord]) -> Kpis {
    let total_customers = records.len();
    let high_risk_customers = records
        .iter()
        .filter(|record| record.risk_tier == RiskTier::High)
        .count();
    let probability_sum: f64 = records.iter().map(|record| record.churn_probability).sum();

    Kpis {
        total_customers,
        avg_churn_probability: round_to(mean(probability_sum, total_customers), 4),
        high_risk_customers,
        high_risk_pct: round_to(
            mean(high_risk_customers as f64, total_customers) * 100.0,
            2,
        ),
        total_revenue: round_to(records.iter().map(|record| record.revenue).sum(), 2),
        total_revenue_at_risk: round_to(
            records
                .iter()
                .map(|record| record.expected_revenue_loss)
                .sum(),
            2,
        ),
    }
}

/// Counts per tier, highest risk first. Every tier is listed, even when empty.
pub fn risk_distribution(records: &[ScoredRecord]) -> Vec<RiskBucketCount> {
    RiskTier::ordered()
        .into_iter()
        .map(|risk_tier| RiskBucketCount {
            risk_tier,
            count: records
                .iter()
                .filter(|record| record.risk_tier == risk_tier)
                .count(),
        })
        .collect()
}

/// Revenue bands that have customers, largest revenue at risk first.
pub fn segments(records: &[ScoredRecord]) -> Vec<SegmentSummary> {
    let mut summaries: Vec<SegmentSummary> = [
        RevenueSegment::Low,
        RevenueSegment::Mid,
        RevenueSegment::High,
    ]
    .into_iter()
    .filter_map(|segment| {
        let members: Vec<&ScoredRecord> = records
            .iter()
            .filter(|record| RevenueSegment::of(record.revenue) == segment)
            .collect();
        if members.is_empty() {
            return None;
        }
        let probability_sum: f64 = members.iter().map(|record| record.churn_probability).sum();
        Some(SegmentSummary {
            segment,
            customer_count: members.len(),
            avg_churn_probability: round_to(mean(probability_sum, members.len()), 4),
            revenue_at_risk: round_to(
                members
                    .iter()
                    .map(|record| record.expected_revenue_loss)
                    .sum(),
                2,
            ),
        })
    })
    .collect();

    summaries.sort_by(|left, right| right.revenue_at_risk.total_cmp(&left.revenue_at_risk));
    summaries
}

/// The `limit` records with the highest priority score; ties keep customer id order.
pub fn top_priority(records: &[ScoredRecord], limit: usize) -> Vec<ScoredRecord> {
    let mut ranked: Vec<&ScoredRecord> = records.iter().collect();
    ranked.sort_by(|left, right| {
        right
            .priority_score
            .total_cmp(&left.priority_score)
            .then_with(|| left.customer_id.cmp(&right.customer_id))
    });
    ranked.into_iter().take(limit).cloned().collect()
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
