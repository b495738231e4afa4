//! Seeded synthetic refund dataset.
//!
//! Every draw comes from one `Pcg64Mcg` stream derived from the configured
//! seed, so a given `(seed, rows)` pair always produces the same file.

use common::config::GeneratorConfig;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use scoring::{LabeledRecord, TransactionRecord};

pub const CATEGORIES: [&str; 5] = ["Electronics", "Clothing", "Footwear", "Books", "Cosmetics"];
pub const PAYMENT_METHODS: [&str; 3] = ["UPI", "Card", "COD"];
pub const RETURN_REASONS: [&str; 6] = [
    "Wrong Size",
    "Item Damaged",
    "Not Delivered",
    "Used then returned",
    "Wrong Product",
    "No reason",
];
pub const REFUND_TYPES: [&str; 2] = ["Instant", "Post"];

pub const AMOUNT_RANGE: std::ops::RangeInclusive<u32> = 300..=7000;
pub const PAST_RETURNS_RANGE: std::ops::RangeInclusive<u32> = 0..=8;
pub const DELAY_RANGE: std::ops::RangeInclusive<u32> = 0..=5;

/// Orders above this amount from customers with more than
/// [`SERIAL_RETURNER_PAST_RETURNS`] returns are always fraud.
pub const COSTLY_ORDER_AMOUNT: f64 = 3500.0;
pub const SERIAL_RETURNER_PAST_RETURNS: u32 = 3;

pub fn is_rule_fraud(record: &TransactionRecord) -> bool {
    record.order_amount > COSTLY_ORDER_AMOUNT && record.past_returns > SERIAL_RETURNER_PAST_RETURNS
}

pub struct DatasetGenerator {
    rng: Pcg64Mcg,
    fraud_noise_rate: f64,
}

impl DatasetGenerator {
    pub fn new(seed: u64, fraud_noise_rate: f64) -> Self {
        Self {
            rng: Pcg64Mcg::seed_from_u64(seed),
            fraud_noise_rate,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.seed, config.fraud_noise_rate)
    }

    pub fn next_row(&mut self) -> LabeledRecord {
        let order_amount = self.rng.gen_range(AMOUNT_RANGE) as f64;
        let past_returns = self.rng.gen_range(PAST_RETURNS_RANGE);
        let delivery_delay_days = self.rng.gen_range(DELAY_RANGE) as f64;

        let record = TransactionRecord {
            order_amount,
            product_category: self.pick(&CATEGORIES),
            payment_method: self.pick(&PAYMENT_METHODS),
            return_reason: self.pick(&RETURN_REASONS),
            past_returns,
            delivery_delay_days,
            refund_type: self.pick(&REFUND_TYPES),
        };
        // The noise draw happens for every row so the stream stays aligned.
        let noise = self.rng.gen_range(0.0..1.0) < self.fraud_noise_rate;
        let is_fraud = is_rule_fraud(&record) || noise;

        LabeledRecord { record, is_fraud }
    }

    pub fn generate(&mut self, rows: usize) -> Vec<LabeledRecord> {
        (0..rows).map(|_| self.next_row()).collect()
    }

    fn pick(&mut self, values: &[&str]) -> String {
        values.choose(&mut self.rng).copied().unwrap_or_default().to_string()
    }
}
