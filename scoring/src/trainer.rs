use chrono::Utc;
use common::config::TrainerConfig;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::{
    classifier::{Classifier, ModelMetadata, TrainedModel},
    dataset,
    decision::DecisionPolicy,
    encoder::OneHotEncoder,
    error::TrainingError,
    forest::{ForestParams, RandomForest},
    model::LabeledRecord,
};

/// Fraud-class metrics on the rows held out from training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

impl HoldoutMetrics {
    pub fn evaluate(model: &TrainedModel, rows: &[LabeledRecord], policy: &DecisionPolicy) -> Self {
        let (mut tp, mut fp, mut tn, mut fn_) = (0usize, 0usize, 0usize, 0usize);
        for row in rows {
            let predicted = policy.is_fraud(model.score_one(&row.record));
            match (predicted, row.is_fraud) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, false) => tn += 1,
                (false, true) => fn_ += 1,
            }
        }
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        Self {
            accuracy: ratio(tp + tn, rows.len()),
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
        }
    }
}

/// Training knobs resolved from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerParams {
    pub forest: ForestParams,
    /// Fraction of rows held out for evaluation, in [0, 1).
    pub test_size: f64,
}

impl Default for TrainerParams {
    fn default() -> Self {
        Self::from(&TrainerConfig::default())
    }
}

impl From<&TrainerConfig> for TrainerParams {
    fn from(config: &TrainerConfig) -> Self {
        Self {
            forest: ForestParams {
                n_estimators: config.n_estimators,
                max_depth: config.max_depth,
                min_samples_split: config.min_samples_split,
                min_samples_leaf: config.min_samples_leaf,
                seed: config.seed,
            },
            test_size: config.test_size,
        }
    }
}

/// Fits the encoder and forest on a seeded shuffle of `rows`, keeping
/// `test_size` of them aside to report holdout metrics.
pub fn train(
    rows: &[LabeledRecord],
    params: &TrainerParams,
    policy: &DecisionPolicy,
) -> Result<TrainedModel, TrainingError> {
    if rows.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    if !(0.0..1.0).contains(&params.test_size) {
        return Err(TrainingError::InvalidParameters(format!(
            "test_size must be in [0, 1), got {}",
            params.test_size
        )));
    }

    let mut shuffled: Vec<&LabeledRecord> = rows.iter().collect();
    shuffled.shuffle(&mut Pcg64Mcg::seed_from_u64(params.forest.seed));

    let holdout_len = ((rows.len() as f64) * params.test_size).round() as usize;
    let holdout_len = holdout_len.min(rows.len() - 1);
    let (holdout, training) = shuffled.split_at(holdout_len);

    info!(
        training_rows = training.len(),
        holdout_rows = holdout.len(),
        trees = params.forest.n_estimators,
        max_depth = ?params.forest.max_depth,
        "Training random forest"
    );
    let started = Instant::now();

    let encoder = OneHotEncoder::fit(training.iter().map(|row| &row.record));
    let features: Vec<Vec<f64>> = training.iter().map(|row| encoder.encode(&row.record)).collect();
    let labels: Vec<bool> = training.iter().map(|row| row.is_fraud).collect();
    let forest = RandomForest::fit(&features, &labels, &params.forest)?;

    let metadata = ModelMetadata {
        trained_at: Utc::now(),
        training_rows: training.len(),
        holdout_rows: holdout.len(),
        n_estimators: params.forest.n_estimators,
        max_depth: params.forest.max_depth,
        seed: params.forest.seed,
        holdout: None,
        feature_names: encoder.feature_names(),
    };
    let mut model = TrainedModel::new(metadata, encoder, forest);

    if holdout.is_empty() {
        warn!("No holdout rows; skipping evaluation");
    } else {
        let holdout_rows: Vec<LabeledRecord> = holdout.iter().map(|row| (*row).clone()).collect();
        let metrics = HoldoutMetrics::evaluate(&model, &holdout_rows, policy);
        info!(
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            "Holdout evaluation"
        );
        model.metadata.holdout = Some(metrics);
    }

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Training finished");
    Ok(model)
}

/// Reads the labeled CSV at `dataset_path`, trains, and writes the artifact to `model_path`.
pub fn train_from_csv(
    dataset_path: &Path,
    model_path: &Path,
    params: &TrainerParams,
    policy: &DecisionPolicy,
) -> Result<TrainedModel, TrainingError> {
    let rows = dataset::read_labeled(dataset_path)?;
    info!(path = %dataset_path.display(), rows = rows.len(), "Loaded training data");
    let model = train(&rows, params, policy)?;
    model.save(model_path)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransactionRecord;

    fn rows(n: usize) -> Vec<LabeledRecord> {
        (0..n)
            .map(|i| {
                let past_returns = (i % 9) as u32;
                let order_amount = 300.0 + (i * 137 % 6700) as f64;
                LabeledRecord {
                    record: TransactionRecord {
                        order_amount,
                        product_category: ["Electronics", "Books", "Clothing"][i % 3].to_string(),
                        payment_method: ["UPI", "Card", "COD"][i % 3].to_string(),
                        return_reason: "Wrong Size".to_string(),
                        past_returns,
                        delivery_delay_days: (i % 6) as f64,
                        refund_type: ["Instant", "Post"][i % 2].to_string(),
                    },
                    is_fraud: order_amount > 3500.0 && past_returns > 3,
                }
            })
            .collect()
    }

    fn small_params() -> TrainerParams {
        TrainerParams {
            forest: ForestParams {
                n_estimators: 15,
                max_depth: Some(8),
                ..ForestParams::default()
            },
            test_size: 0.25,
        }
    }

    #[test]
    fn learns_a_separable_rule() {
        let model = train(&rows(400), &small_params(), &DecisionPolicy::default()).unwrap();

        assert_eq!(model.metadata.training_rows, 300);
        assert_eq!(model.metadata.holdout_rows, 100);
        let metrics = model.metadata.holdout.clone().unwrap();
        assert!(metrics.accuracy > 0.9, "accuracy {}", metrics.accuracy);
        assert_eq!(model.metadata.feature_names.len(), model.encoder().width());
    }

    #[test]
    fn zero_test_size_skips_evaluation() {
        let params = TrainerParams {
            test_size: 0.0,
            ..small_params()
        };
        let model = train(&rows(50), &params, &DecisionPolicy::default()).unwrap();

        assert_eq!(model.metadata.training_rows, 50);
        assert!(model.metadata.holdout.is_none());
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            train(&[], &small_params(), &DecisionPolicy::default()),
            Err(TrainingError::EmptyDataset)
        ));
        let params = TrainerParams {
            test_size: 1.0,
            ..small_params()
        };
        assert!(matches!(
            train(&rows(10), &params, &DecisionPolicy::default()),
            Err(TrainingError::InvalidParameters(_))
        ));
    }

    #[test]
    fn same_seed_gives_same_forest() {
        let data = rows(120);
        let a = train(&data, &small_params(), &DecisionPolicy::default()).unwrap();
        let b = train(&data, &small_params(), &DecisionPolicy::default()).unwrap();

        assert_eq!(a.forest(), b.forest());
        assert_eq!(a.encoder(), b.encoder());
    }
}
