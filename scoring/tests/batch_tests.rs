mod test_utils;

use common::test_helpers::payloads::*;
use scoring::batch::{BatchScorer, BatchSummary, RowOutcome};
use scoring::Decision;
use serde_json::{Value, json};
use std::sync::Arc;
use test_utils::{amount_classifier, service_with};

fn scorer(workers: usize) -> BatchScorer {
    BatchScorer::new(Arc::new(service_with(amount_classifier())), workers)
}

#[tokio::test]
async fn missing_amount_is_scored_as_zero() {
    let rows = vec![
        json!({"order_amount": 8000, "product_category": "Electronics"}),
        payload_without(&high_risk_payload(), "order_amount"),
        json!({"order_amount": 4000, "product_category": "Books"}),
    ];

    let outcomes = scorer(2).score_all(rows).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].score().unwrap().fraud_probability, 0.8);
    assert_eq!(outcomes[1].score().unwrap().fraud_probability, 0.0);
    assert_eq!(outcomes[1].score().unwrap().decision, Decision::Approve);
    assert_eq!(outcomes[2].score().unwrap().fraud_probability, 0.4);
}

#[tokio::test]
async fn output_order_matches_input_order() {
    let rows: Vec<Value> = (0..50)
        .map(|i| json!({"order_amount": (i * 100) as f64}))
        .collect();

    let outcomes = scorer(8).score_all(rows).await;

    let probabilities: Vec<f64> = outcomes
        .iter()
        .map(|o| o.score().unwrap().fraud_probability)
        .collect();
    let expected: Vec<f64> = (0..50).map(|i| (i as f64 * 100.0 / 10_000.0 * 1000.0).round() / 1000.0).collect();
    assert_eq!(probabilities, expected);
}

#[tokio::test]
async fn failing_rows_become_placeholders() {
    let rows = vec![low_risk_payload(), json!("not a record"), high_risk_payload()];

    let outcomes = scorer(4).score_all(rows).await;

    assert!(outcomes[0].score().is_some());
    assert!(outcomes[1].error().unwrap().contains("expected a JSON object"));
    assert!(outcomes[2].score().is_some());

    let placeholder = serde_json::to_value(&outcomes[1]).unwrap();
    assert_eq!(placeholder["fraud_probability"], Value::Null);
    assert_eq!(placeholder["is_fraud"], Value::Null);
    assert_eq!(placeholder["decision"], Value::Null);

    let scored = serde_json::to_value(&outcomes[0]).unwrap();
    assert!(scored.get("error").is_none());
    assert!(scored["is_fraud"].is_u64());
}

#[tokio::test]
async fn unreadable_rows_fail_in_place() {
    let rows = vec![
        Ok(json!({"order_amount": "2000"})),
        Err("line 3 has 4 fields, header has 3".to_string()),
        Ok(json!({"order_amount": "6000"})),
    ];

    let outcomes = scorer(3).score_rows(rows).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].score().unwrap().fraud_probability, 0.2);
    assert_eq!(outcomes[1].error(), Some("line 3 has 4 fields, header has 3"));
    assert_eq!(outcomes[2].score().unwrap().fraud_probability, 0.6);
}

#[tokio::test]
async fn empty_batch_yields_no_rows() {
    assert!(scorer(1).score_all(Vec::new()).await.is_empty());
}

#[test]
fn summary_tallies_outcomes() {
    let outcomes = vec![
        RowOutcome::Scored(scoring::ScoreResult {
            fraud_probability: 0.9,
            is_fraud: true,
            decision: Decision::Block,
        }),
        RowOutcome::Scored(scoring::ScoreResult {
            fraud_probability: 0.1,
            is_fraud: false,
            decision: Decision::Approve,
        }),
        RowOutcome::Failed {
            error: "bad row".to_string(),
        },
    ];

    let summary = BatchSummary::from_outcomes(&outcomes);

    assert_eq!(summary.total, 3);
    assert_eq!(summary.scored, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.flagged_fraud, 1);
    assert_eq!(summary.decisions.get(&Decision::Block), Some(&1));
    assert_eq!(summary.decisions.get(&Decision::Review), None);
}
