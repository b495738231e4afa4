use serde::{Deserialize, Serialize};
use strum_macros::{Display as EnumDisplay, EnumIter};

use crate::decision::Decision;

pub const ORDER_AMOUNT: &str = "order_amount";
pub const PRODUCT_CATEGORY: &str = "product_category";
pub const PAYMENT_METHOD: &str = "payment_method";
pub const RETURN_REASON: &str = "return_reason";
pub const PAST_RETURNS: &str = "past_returns";
pub const DELIVERY_DELAY_DAYS: &str = "delivery_delay_days";
pub const REFUND_TYPE: &str = "refund_type";
pub const IS_FRAUD: &str = "is_fraud";

/// One refund request in the fixed seven-field schema the classifier expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub order_amount: f64,
    pub product_category: String,
    pub payment_method: String,
    pub return_reason: String,
    pub past_returns: u32,
    pub delivery_delay_days: f64,
    pub refund_type: String,
}

impl TransactionRecord {
    pub fn categorical(&self, field: CategoricalField) -> &str {
        match field {
            CategoricalField::ProductCategory => &self.product_category,
            CategoricalField::PaymentMethod => &self.payment_method,
            CategoricalField::ReturnReason => &self.return_reason,
            CategoricalField::RefundType => &self.refund_type,
        }
    }

    /// Numeric features in encoding order: amount, past returns, delay.
    pub fn numeric_features(&self) -> [f64; 3] {
        [
            self.order_amount,
            f64::from(self.past_returns),
            self.delivery_delay_days,
        ]
    }
}

/// The categorical columns, in the order their one-hot blocks are laid out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumDisplay, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CategoricalField {
    ProductCategory,
    PaymentMethod,
    ReturnReason,
    RefundType,
}

impl CategoricalField {
    /// Value substituted when the field is absent from a raw record.
    pub fn default_value(self) -> &'static str {
        match self {
            CategoricalField::RefundType => "Instant",
            _ => "Unknown",
        }
    }
}

pub const NUMERIC_FEATURES: [&str; 3] = [ORDER_AMOUNT, PAST_RETURNS, DELIVERY_DELAY_DAYS];

/// A dataset row: a normalized record plus its ground-truth label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub record: TransactionRecord,
    pub is_fraud: bool,
}

/// Outcome of scoring a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub fraud_probability: f64,
    #[serde(with = "flag_as_int")]
    pub is_fraud: bool,
    pub decision: Decision,
}

/// Serializes a boolean flag as `0`/`1`; accepts either form when reading.
pub mod flag_as_int {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*flag))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        struct FlagVisitor;

        impl Visitor<'_> for FlagVisitor {
            type Value = bool;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("0, 1 or a boolean")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
                Ok(v)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
                match v {
                    0 => Ok(false),
                    1 => Ok(true),
                    other => Err(E::invalid_value(de::Unexpected::Unsigned(other), &self)),
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
                match u64::try_from(v) {
                    Ok(v) => self.visit_u64(v),
                    Err(_) => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
                }
            }
        }

        deserializer.deserialize_any(FlagVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn score_result_writes_flag_as_integer() {
        let result = ScoreResult {
            fraud_probability: 0.912,
            is_fraud: true,
            decision: Decision::Block,
        };

        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(
            value,
            json!({"fraud_probability": 0.912, "is_fraud": 1, "decision": "HIGH RISK - BLOCK"})
        );
    }

    #[test]
    fn score_result_reads_integer_and_boolean_flags() {
        let from_int: ScoreResult = serde_json::from_value(
            json!({"fraud_probability": 0.1, "is_fraud": 0, "decision": "APPROVE"}),
        )
        .unwrap();
        let from_bool: ScoreResult = serde_json::from_value(
            json!({"fraud_probability": 0.1, "is_fraud": false, "decision": "APPROVE"}),
        )
        .unwrap();

        assert_eq!(from_int, from_bool);
        assert!(
            serde_json::from_value::<ScoreResult>(
                json!({"fraud_probability": 0.1, "is_fraud": 2, "decision": "APPROVE"})
            )
            .is_err()
        );
    }

    #[test]
    fn categorical_defaults() {
        assert_eq!(CategoricalField::RefundType.default_value(), "Instant");
        assert_eq!(CategoricalField::ProductCategory.default_value(), "Unknown");
        assert_eq!(CategoricalField::ProductCategory.to_string(), PRODUCT_CATEGORY);
        assert_eq!(CategoricalField::PaymentMethod.to_string(), PAYMENT_METHOD);
        assert_eq!(CategoricalField::ReturnReason.to_string(), RETURN_REASON);
        assert_eq!(CategoricalField::RefundType.to_string(), REFUND_TYPE);
    }
}
