use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::debug;

use crate::{
    classifier::Classifier,
    decision::{DecisionPolicy, round_probability},
    error::ScoringError,
    model::{ScoreResult, TransactionRecord},
    normalizer::normalize,
};

/// Stateless request/response scoring over an injected classifier.
#[derive(Clone)]
pub struct ScoringService {
    classifier: Arc<dyn Classifier>,
    policy: DecisionPolicy,
}

impl ScoringService {
    pub fn new(classifier: Arc<dyn Classifier>, policy: DecisionPolicy) -> Self {
        tracing::info!(classifier = classifier.name(), ?policy, "Initializing new ScoringService");
        Self { classifier, policy }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Normalizes, scores and labels one raw payload.
    pub fn predict(&self, raw: &Value) -> Result<ScoreResult, ScoringError> {
        self.score_payload(raw).map(|(_, result)| result)
    }

    /// Like `predict`, also handing back the normalized record that was scored.
    pub fn score_payload(&self, raw: &Value) -> Result<(TransactionRecord, ScoreResult), ScoringError> {
        let object = raw.as_object().ok_or_else(|| {
            ScoringError::Input(format!("expected a JSON object, got {}", json_kind(raw)))
        })?;
        let record = normalize(object);
        let result = self.predict_record(&record)?;
        Ok((record, result))
    }

    pub fn predict_record(&self, record: &TransactionRecord) -> Result<ScoreResult, ScoringError> {
        let probability = catch_unwind(AssertUnwindSafe(|| self.classifier.score_one(record)))
            .map_err(|_| ScoringError::Internal(format!("classifier {} panicked", self.classifier.name())))?;

        if !(0.0..=1.0).contains(&probability) {
            return Err(ScoringError::Internal(format!(
                "classifier {} returned probability {} outside [0, 1]",
                self.classifier.name(),
                probability
            )));
        }

        let result = ScoreResult {
            fraud_probability: round_probability(probability),
            is_fraud: self.policy.is_fraud(probability),
            decision: self.policy.decide(probability),
        };
        debug!(
            probability = result.fraud_probability,
            decision = %result.decision,
            "Scored record"
        );
        Ok(result)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
