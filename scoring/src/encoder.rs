use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::IntoEnumIterator;

use crate::model::{CategoricalField, NUMERIC_FEATURES, TransactionRecord};

/// Known values of one categorical field, sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub field: CategoricalField,
    pub values: Vec<String>,
}

/// One-hot encoding of the categorical fields followed by the raw numeric fields.
///
/// Values not seen while fitting encode to an all-zero block for their field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    vocabularies: Vec<Vocabulary>,
}

impl OneHotEncoder {
    pub fn fit<'a>(records: impl IntoIterator<Item = &'a TransactionRecord>) -> Self {
        let mut seen: Vec<BTreeSet<String>> = CategoricalField::iter().map(|_| BTreeSet::new()).collect();
        for record in records {
            for (set, field) in seen.iter_mut().zip(CategoricalField::iter()) {
                set.insert(record.categorical(field).to_string());
            }
        }

        let vocabularies = CategoricalField::iter()
            .zip(seen)
            .map(|(field, values)| Vocabulary {
                field,
                values: values.into_iter().collect(),
            })
            .collect();
        Self { vocabularies }
    }

    pub fn vocabularies(&self) -> &[Vocabulary] {
        &self.vocabularies
    }

    /// Number of columns produced by [`encode`](Self::encode).
    pub fn width(&self) -> usize {
        self.vocabularies.iter().map(|v| v.values.len()).sum::<usize>() + NUMERIC_FEATURES.len()
    }

    pub fn encode(&self, record: &TransactionRecord) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.width());
        for vocabulary in &self.vocabularies {
            let value = record.categorical(vocabulary.field);
            row.extend(
                vocabulary
                    .values
                    .iter()
                    .map(|known| if known == value { 1.0 } else { 0.0 }),
            );
        }
        row.extend(record.numeric_features());
        row
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|v| v.values.iter().map(move |value| format!("{}={}", v.field, value)))
            .chain(NUMERIC_FEATURES.iter().map(|name| name.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: &str, payment: &str, reason: &str, refund: &str) -> TransactionRecord {
        TransactionRecord {
            order_amount: 1200.0,
            product_category: category.to_string(),
            payment_method: payment.to_string(),
            return_reason: reason.to_string(),
            past_returns: 2,
            delivery_delay_days: 4.0,
            refund_type: refund.to_string(),
        }
    }

    fn fitted() -> OneHotEncoder {
        OneHotEncoder::fit(&[
            record("Clothing", "UPI", "Wrong Size", "Post"),
            record("Books", "COD", "Item Damaged", "Instant"),
            record("Clothing", "Card", "Wrong Size", "Instant"),
        ])
    }

    #[test]
    fn vocabularies_are_sorted_and_deduplicated() {
        let encoder = fitted();
        let categories = &encoder.vocabularies()[0];

        assert_eq!(categories.field, CategoricalField::ProductCategory);
        assert_eq!(categories.values, vec!["Books", "Clothing"]);
        assert_eq!(encoder.width(), 2 + 3 + 2 + 2 + 3);
    }

    #[test]
    fn encodes_indicators_then_numerics() {
        let encoder = fitted();

        let row = encoder.encode(&record("Books", "UPI", "Wrong Size", "Post"));

        assert_eq!(
            row,
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1200.0, 2.0, 4.0]
        );
    }

    #[test]
    fn unknown_values_encode_to_zero_block() {
        let encoder = fitted();

        let row = encoder.encode(&record("Garden", "Crypto", "Wrong Size", "Post"));

        assert_eq!(&row[0..2], &[0.0, 0.0]);
        assert_eq!(&row[2..5], &[0.0, 0.0, 0.0]);
        assert_eq!(row.len(), encoder.width());
    }

    #[test]
    fn feature_names_line_up_with_columns() {
        let encoder = fitted();
        let names = encoder.feature_names();

        assert_eq!(names.len(), encoder.width());
        assert_eq!(names[0], "product_category=Books");
        assert_eq!(names.last().map(String::as_str), Some("delivery_delay_days"));
    }
}
