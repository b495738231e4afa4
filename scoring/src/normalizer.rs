//! Coercion of loosely shaped transaction payloads into [`TransactionRecord`].
//!
//! Normalization is total over JSON objects: missing, null or unparsable
//! numbers become `0`, missing categorical values take the field default.

use serde_json::{Map, Value};

use crate::model::{
    CategoricalField, DELIVERY_DELAY_DAYS, ORDER_AMOUNT, PAST_RETURNS, TransactionRecord,
};

pub fn normalize(raw: &Map<String, Value>) -> TransactionRecord {
    TransactionRecord {
        order_amount: numeric(raw.get(ORDER_AMOUNT)),
        product_category: categorical(raw, CategoricalField::ProductCategory),
        payment_method: categorical(raw, CategoricalField::PaymentMethod),
        return_reason: categorical(raw, CategoricalField::ReturnReason),
        // Truncation of a finite non-negative f64 saturates at u32::MAX.
        past_returns: numeric(raw.get(PAST_RETURNS)) as u32,
        delivery_delay_days: numeric(raw.get(DELIVERY_DELAY_DAYS)),
        refund_type: categorical(raw, CategoricalField::RefundType),
    }
}

fn numeric(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

fn categorical(raw: &Map<String, Value>, field: CategoricalField) -> String {
    match raw.get(&field.to_string()) {
        None | Some(Value::Null) => field.default_value().to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
