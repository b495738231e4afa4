use serde::Deserialize;
use std::{error::Error, fs};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CommonConfig {
    pub project_name: String,
    /// Trained model artifact, written by the trainer and loaded by the backend.
    pub model_path: String,
    /// Labeled dataset CSV, written by the generator and read by the trainer.
    pub dataset_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    pub rows: usize,
    pub seed: u64,
    #[serde(default = "default_noise_rate")]
    pub fraud_noise_rate: f64,
    pub log_level: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rows: 50_000,
            seed: 7,
            fraud_noise_rate: default_noise_rate(),
            log_level: "info".to_string(),
        }
    }
}

fn default_noise_rate() -> f64 {
    0.15
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrainerConfig {
    pub n_estimators: usize,
    /// Tree depth cap; `null` grows trees until leaves are pure.
    #[serde(default = "default_max_depth")]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    pub test_size: f64,
    pub seed: u64,
    pub log_level: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_estimators: 160,
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            test_size: 0.25,
            seed: 42,
            log_level: "info".to_string(),
        }
    }
}

fn default_max_depth() -> Option<usize> {
    Some(16)
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub server_address: String,
    pub log_level: String,
    #[serde(default)]
    pub cors_origin: Option<String>,
    /// JSON-lines file receiving every scored request; in-memory when unset.
    #[serde(default)]
    pub event_log_path: Option<String>,
    /// Address for the Prometheus scrape endpoint; metrics are not exported when unset.
    #[serde(default)]
    pub metrics_address: Option<String>,
    #[serde(default = "default_workers")]
    pub batch_workers: usize,
    /// Most events the in-memory log keeps before dropping the oldest.
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:5000".to_string(),
            log_level: "info".to_string(),
            cors_origin: None,
            event_log_path: None,
            metrics_address: None,
            batch_workers: default_workers(),
            event_log_capacity: default_event_log_capacity(),
        }
    }
}

fn default_event_log_capacity() -> usize {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    pub workers: usize,
    pub output_path: String,
    pub log_level: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            output_path: "scored.csv".to_string(),
            log_level: "info".to_string(),
        }
    }
}

fn default_workers() -> usize {
    4
}

/// Overrides for the decision thresholds. Unset values keep the built-in ladder.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DecisionConfig {
    pub fraud_threshold: Option<f64>,
    pub review_threshold: Option<f64>,
    pub block_threshold: Option<f64>,
    pub medium_risk_past_returns: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub common: CommonConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub trainer: TrainerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let contents = fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config {}: {}", config_path, e))?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let config = serde_yml::from_str(contents)?;
        Ok(config)
    }
}
