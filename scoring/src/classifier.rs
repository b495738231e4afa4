use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::encoder::OneHotEncoder;
use crate::error::ModelError;
use crate::forest::RandomForest;
use crate::model::TransactionRecord;
use crate::trainer::HoldoutMetrics;

/// Maps a normalized record to the probability of the fraud class.
///
/// Implementations must be deterministic and free of side effects so that a
/// single instance can serve concurrent requests without locking.
pub trait Classifier: Send + Sync {
    fn score_one(&self, record: &TransactionRecord) -> f64;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
    pub holdout_rows: usize,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
    pub holdout: Option<HoldoutMetrics>,
    pub feature_names: Vec<String>,
}

/// Encoder and forest fitted together, persisted as one JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub metadata: ModelMetadata,
    encoder: OneHotEncoder,
    forest: RandomForest,
}

impl TrainedModel {
    pub fn new(metadata: ModelMetadata, encoder: OneHotEncoder, forest: RandomForest) -> Self {
        Self {
            metadata,
            encoder,
            forest,
        }
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Reads and validates an artifact. Any failure means the model is unavailable.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::Missing {
                path: path.to_path_buf(),
            });
        }
        let file = fs::File::open(path)?;
        let model: TrainedModel =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| ModelError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        model.validate().map_err(|reason| ModelError::Corrupt {
            path: path.to_path_buf(),
            reason,
        })?;

        tracing::info!(
            path = %path.display(),
            trees = model.forest.trees().len(),
            features = model.forest.n_features(),
            trained_at = %model.metadata.trained_at,
            "Loaded model artifact"
        );
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), "Saved model artifact");
        Ok(())
    }

    fn validate(&self) -> Result<(), String> {
        if self.encoder.width() != self.forest.n_features() {
            return Err(format!(
                "encoder produces {} features but forest expects {}",
                self.encoder.width(),
                self.forest.n_features()
            ));
        }
        self.forest.validate()
    }
}

impl Classifier for TrainedModel {
    fn score_one(&self, record: &TransactionRecord) -> f64 {
        self.forest.predict_proba(&self.encoder.encode(record))
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }
}
