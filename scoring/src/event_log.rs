use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::{
    decision::{Decision, DecisionPolicy, RiskTier, TierScheme},
    error::EventLogError,
    model::{ScoreResult, TransactionRecord},
};

/// One scored request as recorded for live monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvent {
    pub scored_at: DateTime<Utc>,
    pub record: TransactionRecord,
    pub result: ScoreResult,
}

impl ScoredEvent {
    pub fn now(record: TransactionRecord, result: ScoreResult) -> Self {
        Self {
            scored_at: Utc::now(),
            record,
            result,
        }
    }
}

/// Append-only sequence of scored events.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: ScoredEvent) -> Result<(), EventLogError>;

    /// All events, oldest first.
    async fn events(&self) -> Result<Vec<ScoredEvent>, EventLogError>;

    /// The latest `limit` events, oldest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ScoredEvent>, EventLogError> {
        let mut events = self.events().await?;
        let skip = events.len().saturating_sub(limit);
        Ok(events.split_off(skip))
    }
}

pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 10_000;

/// Keeps the latest `capacity` events; older ones are dropped on append.
pub struct InMemoryEventLog {
    capacity: usize,
    events: RwLock<VecDeque<ScoredEvent>>,
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: ScoredEvent) -> Result<(), EventLogError> {
        let mut events = self.events.write().await;
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
        Ok(())
    }

    async fn events(&self) -> Result<Vec<ScoredEvent>, EventLogError> {
        Ok(self.events.read().await.iter().cloned().collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ScoredEvent>, EventLogError> {
        let events = self.events.read().await;
        let skip = events.len().saturating_sub(limit);
        Ok(events.iter().skip(skip).cloned().collect())
    }
}

/// Events stored one JSON object per line. A missing file reads as empty and
/// lines that do not parse are skipped with a warning.
pub struct JsonLinesEventLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_contents(&self) -> Result<String, EventLogError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn parse_line(&self, line: &str) -> Option<ScoredEvent> {
        if line.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Skipping unreadable event line");
                None
            }
        }
    }
}

#[async_trait]
impl EventLog for JsonLinesEventLog {
    async fn append(&self, event: ScoredEvent) -> Result<(), EventLogError> {
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn events(&self) -> Result<Vec<ScoredEvent>, EventLogError> {
        let contents = self.read_contents().await?;
        Ok(contents.lines().filter_map(|line| self.parse_line(line)).collect())
    }

    /// Parses from the end of the file and stops once `limit` events are found.
    async fn recent(&self, limit: usize) -> Result<Vec<ScoredEvent>, EventLogError> {
        let contents = self.read_contents().await?;
        let mut tail: Vec<ScoredEvent> = contents
            .lines()
            .rev()
            .filter_map(|line| self.parse_line(line))
            .take(limit)
            .collect();
        tail.reverse();
        Ok(tail)
    }
}

/// Aggregate view of the event log for the live dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveSummary {
    pub total_requests: usize,
    pub fraud_cases: usize,
    pub fraud_rate_pct: f64,
    pub review_queue: usize,
    pub blocked: usize,
    pub risk_split: BTreeMap<RiskTier, usize>,
}

impl LiveSummary {
    pub fn from_events(events: &[ScoredEvent], policy: &DecisionPolicy) -> Self {
        let mut summary = LiveSummary {
            total_requests: events.len(),
            ..Default::default()
        };
        for event in events {
            if event.result.is_fraud {
                summary.fraud_cases += 1;
            }
            match event.result.decision {
                Decision::Review => summary.review_queue += 1,
                Decision::Block => summary.blocked += 1,
                Decision::Approve => {}
            }
            let tier = policy.risk_tier_with(
                TierScheme::TwoTier,
                event.result.is_fraud,
                event.record.past_returns,
            );
            *summary.risk_split.entry(tier).or_default() += 1;
        }
        if summary.total_requests > 0 {
            let rate = summary.fraud_cases as f64 / summary.total_requests as f64 * 100.0;
            summary.fraud_rate_pct = (rate * 100.0).round() / 100.0;
        }
        summary
    }
}
