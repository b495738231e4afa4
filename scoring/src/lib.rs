pub mod analytics;
pub mod batch;
pub mod classifier;
pub mod dataset;
pub mod decision;
pub mod encoder;
pub mod error;
pub mod event_log;
pub mod executable_utils;
pub mod forest;
pub mod model;
pub mod normalizer;
pub mod service;
pub mod trainer;

pub use classifier::{Classifier, TrainedModel};
pub use decision::{Decision, DecisionPolicy, RiskTier};
pub use error::{ModelError, ScoringError};
pub use model::{LabeledRecord, ScoreResult, TransactionRecord};
pub use service::ScoringService;
