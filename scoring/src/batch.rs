use futures::{StreamExt, stream};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{dataset::RawRow, decision::Decision, model::ScoreResult, service::ScoringService};

/// Result for one batch row: a score, or a placeholder carrying the failure.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Scored(ScoreResult),
    Failed { error: String },
}

impl RowOutcome {
    pub fn score(&self) -> Option<&ScoreResult> {
        match self {
            RowOutcome::Scored(result) => Some(result),
            RowOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RowOutcome::Scored(_) => None,
            RowOutcome::Failed { error } => Some(error),
        }
    }
}

#[derive(Serialize)]
struct PlaceholderRow<'a> {
    fraud_probability: Option<f64>,
    is_fraud: Option<u8>,
    decision: Option<Decision>,
    error: &'a str,
}

impl Serialize for RowOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowOutcome::Scored(result) => result.serialize(serializer),
            RowOutcome::Failed { error } => PlaceholderRow {
                fraud_probability: None,
                is_fraud: None,
                decision: None,
                error,
            }
            .serialize(serializer),
        }
    }
}

/// Applies the scoring service to every row, keeping input order.
#[derive(Clone)]
pub struct BatchScorer {
    service: Arc<ScoringService>,
    workers: usize,
}

impl BatchScorer {
    pub fn new(service: Arc<ScoringService>, workers: usize) -> Self {
        Self {
            service,
            workers: workers.max(1),
        }
    }

    pub async fn score_all(&self, records: Vec<Value>) -> Vec<RowOutcome> {
        self.score_rows(records.into_iter().map(Ok).collect()).await
    }

    /// Like `score_all`, but rows that already failed upstream (for example
    /// while reading a file) become placeholders at their own position.
    pub async fn score_rows(&self, rows: Vec<RawRow>) -> Vec<RowOutcome> {
        let total = rows.len();
        info!(rows = total, workers = self.workers, "Starting batch scoring");

        let outcomes: Vec<RowOutcome> = stream::iter(rows.into_iter().enumerate())
            .map(|(row, raw)| {
                let service = self.service.clone();
                async move {
                    let raw = match raw {
                        Ok(raw) => raw,
                        Err(error) => return RowOutcome::Failed { error },
                    };
                    let scored = tokio::task::spawn_blocking(move || service.predict(&raw)).await;
                    match scored {
                        Ok(Ok(result)) => RowOutcome::Scored(result),
                        Ok(Err(e)) => {
                            warn!(row, error = %e, "Row failed to score");
                            RowOutcome::Failed { error: e.to_string() }
                        }
                        Err(e) => {
                            warn!(row, error = %e, "Scoring task aborted");
                            RowOutcome::Failed {
                                error: format!("scoring task aborted: {e}"),
                            }
                        }
                    }
                }
            })
            // `buffered` yields in submission order, whatever order tasks finish in.
            .buffered(self.workers)
            .collect()
            .await;

        let summary = BatchSummary::from_outcomes(&outcomes);
        info!(
            rows = summary.total,
            scored = summary.scored,
            failed = summary.failed,
            "Finished batch scoring"
        );
        outcomes
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub scored: usize,
    pub failed: usize,
    pub flagged_fraud: usize,
    pub decisions: BTreeMap<Decision, usize>,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[RowOutcome]) -> Self {
        let mut summary = BatchSummary {
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                RowOutcome::Scored(result) => {
                    summary.scored += 1;
                    if result.is_fraud {
                        summary.flagged_fraud += 1;
                    }
                    *summary.decisions.entry(result.decision).or_default() += 1;
                }
                RowOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}
