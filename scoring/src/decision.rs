use common::config::DecisionConfig;
use serde::{Deserialize, Serialize};
use strum_macros::Display as EnumDisplay;

use crate::error::PolicyError;

/// Probabilities strictly above this are labeled fraud.
pub const FRAUD_LABEL_THRESHOLD: f64 = 0.5;
/// Lowest probability that requires manual review.
pub const REVIEW_THRESHOLD: f64 = 0.30;
/// Lowest probability that blocks the refund.
pub const BLOCK_THRESHOLD: f64 = 0.70;
/// Non-fraud customers with at least this many past returns are medium risk.
pub const MEDIUM_RISK_PAST_RETURNS: u32 = 3;
/// Decimal places kept in a reported probability.
pub const PROBABILITY_DECIMALS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumDisplay)]
pub enum Decision {
    #[serde(rename = "APPROVE")]
    #[strum(to_string = "APPROVE")]
    Approve,
    #[serde(rename = "REVIEW REQUIRED")]
    #[strum(to_string = "REVIEW REQUIRED")]
    Review,
    #[serde(rename = "HIGH RISK - BLOCK")]
    #[strum(to_string = "HIGH RISK - BLOCK")]
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumDisplay)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Which tier ladder a consumer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TierScheme {
    /// High for fraud, Medium for frequent returners, Low otherwise.
    #[default]
    ThreeTier,
    /// High for fraud, Low otherwise.
    TwoTier,
}

/// Step functions from probability (and return history) to labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    pub fraud_threshold: f64,
    pub review_threshold: f64,
    pub block_threshold: f64,
    pub medium_risk_past_returns: u32,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            fraud_threshold: FRAUD_LABEL_THRESHOLD,
            review_threshold: REVIEW_THRESHOLD,
            block_threshold: BLOCK_THRESHOLD,
            medium_risk_past_returns: MEDIUM_RISK_PAST_RETURNS,
        }
    }
}

impl DecisionPolicy {
    /// Applies configured overrides on top of the default ladder.
    pub fn from_config(config: &DecisionConfig) -> Result<Self, PolicyError> {
        let defaults = Self::default();
        let policy = Self {
            fraud_threshold: config.fraud_threshold.unwrap_or(defaults.fraud_threshold),
            review_threshold: config.review_threshold.unwrap_or(defaults.review_threshold),
            block_threshold: config.block_threshold.unwrap_or(defaults.block_threshold),
            medium_risk_past_returns: config
                .medium_risk_past_returns
                .unwrap_or(defaults.medium_risk_past_returns),
        };
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        for (name, value) in [
            ("fraud_threshold", self.fraud_threshold),
            ("review_threshold", self.review_threshold),
            ("block_threshold", self.block_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PolicyError::OutOfRange { name, value });
            }
        }
        if self.review_threshold >= self.block_threshold {
            return Err(PolicyError::Inverted {
                review: self.review_threshold,
                block: self.block_threshold,
            });
        }
        Ok(())
    }

    pub fn is_fraud(&self, probability: f64) -> bool {
        probability > self.fraud_threshold
    }

    pub fn decide(&self, probability: f64) -> Decision {
        if probability < self.review_threshold {
            Decision::Approve
        } else if probability < self.block_threshold {
            Decision::Review
        } else {
            Decision::Block
        }
    }

    pub fn risk_tier(&self, is_fraud: bool, past_returns: u32) -> RiskTier {
        self.risk_tier_with(TierScheme::ThreeTier, is_fraud, past_returns)
    }

    pub fn risk_tier_with(&self, scheme: TierScheme, is_fraud: bool, past_returns: u32) -> RiskTier {
        match (scheme, is_fraud) {
            (_, true) => RiskTier::High,
            (TierScheme::ThreeTier, false) if past_returns >= self.medium_risk_past_returns => {
                RiskTier::Medium
            }
            _ => RiskTier::Low,
        }
    }
}

pub fn round_probability(probability: f64) -> f64 {
    let scale = 10f64.powi(PROBABILITY_DECIMALS);
    (probability * scale).round() / scale
}
