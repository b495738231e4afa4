use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use strum_macros::Display as EnumDisplay;

use crate::decision::{DecisionPolicy, RiskTier};
use crate::model::LabeledRecord;

pub const MULTIPLE_RETURNS_ALERT: u32 = 4;
pub const COSTLY_FRAUD_AMOUNT: f64 = 3000.0;
pub const NOT_DELIVERED_REASON: &str = "Not Delivered";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumDisplay)]
pub enum Alert {
    #[strum(to_string = "Multiple returns detected")]
    MultipleReturns,
    #[strum(to_string = "High-risk costly orders found")]
    CostlyFraud,
    #[strum(to_string = "Frequent 'Not Delivered' claims")]
    NotDeliveredClaims,
}

/// Dataset-level fraud figures over labeled rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub fraud_count: usize,
    pub fraud_rate_pct: f64,
    pub estimated_loss: u64,
    pub risk_segments: BTreeMap<RiskTier, usize>,
    /// Fraud counts per product category, most frequent first.
    pub fraud_by_category: Vec<(String, usize)>,
    pub alerts: Vec<Alert>,
}

impl DatasetSummary {
    pub fn from_rows(rows: &[LabeledRecord], policy: &DecisionPolicy) -> Self {
        let total = rows.len();
        if total == 0 {
            return Self::default();
        }

        let fraud_count = rows.iter().filter(|r| r.is_fraud).count();
        let fraud_rate_pct = ((fraud_count as f64 / total as f64) * 100.0 * 100.0).round() / 100.0;
        let mean_amount = rows.iter().map(|r| r.record.order_amount).sum::<f64>() / total as f64;
        let estimated_loss = (fraud_count as f64 * mean_amount) as u64;

        let mut risk_segments = BTreeMap::new();
        let mut by_category: HashMap<&str, usize> = HashMap::new();
        for row in rows {
            let tier = policy.risk_tier(row.is_fraud, row.record.past_returns);
            *risk_segments.entry(tier).or_default() += 1;
            if row.is_fraud {
                *by_category.entry(row.record.product_category.as_str()).or_default() += 1;
            }
        }
        let mut fraud_by_category: Vec<(String, usize)> = by_category
            .into_iter()
            .map(|(category, count)| (category.to_string(), count))
            .collect();
        fraud_by_category.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut alerts = Vec::new();
        if rows.iter().any(|r| r.record.past_returns >= MULTIPLE_RETURNS_ALERT) {
            alerts.push(Alert::MultipleReturns);
        }
        if rows
            .iter()
            .any(|r| r.is_fraud && r.record.order_amount > COSTLY_FRAUD_AMOUNT)
        {
            alerts.push(Alert::CostlyFraud);
        }
        if rows.iter().any(|r| r.record.return_reason == NOT_DELIVERED_REASON) {
            alerts.push(Alert::NotDeliveredClaims);
        }

        Self {
            total,
            fraud_count,
            fraud_rate_pct,
            estimated_loss,
            risk_segments,
            fraud_by_category,
            alerts,
        }
    }
}
