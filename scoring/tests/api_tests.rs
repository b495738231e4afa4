mod test_utils;

use axum::{Router, http::StatusCode};
use common::test_helpers::{
    TestError, TestResult, payloads::*,
    test_utils::{build_request, check_status_code, serialize_json},
};
use common::{test_assert, test_assert_eq};
use http_body_util::BodyExt;
use scoring::event_log::{EventLog, InMemoryEventLog};
use scoring::executable_utils::{AppState, build_router};
use serde_json::{Value, json};
use std::sync::Arc;
use test_utils::{MockClassifier, amount_classifier, fixed_classifier, service_with};
use tower::ServiceExt;

fn app_with(classifier: MockClassifier) -> (Router, Arc<InMemoryEventLog>) {
    let event_log = Arc::new(InMemoryEventLog::new());
    let state = AppState::new(Arc::new(service_with(classifier)), event_log.clone(), 2);
    let router = build_router(state, None).expect("router builds");
    (router, event_log)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<String>) -> TestResult<(StatusCode, Vec<u8>)> {
    let request = build_request(method, uri, body)?;
    let response = app
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| TestError::generic(e.to_string()))?;
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .map_err(|e| TestError::generic(e.to_string()))?
        .to_bytes();
    Ok((status, bytes.to_vec()))
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<String>) -> TestResult<(StatusCode, Value)> {
    let (status, bytes) = send(app, method, uri, body).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn predict_returns_the_score_shape() -> TestResult {
    let (app, _) = app_with(fixed_classifier(0.91));

    let body = serialize_json(&high_risk_payload())?;
    let (status, json) = send_json(&app, "POST", "/predict", Some(body)).await?;

    check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(json, json!({"fraud_probability": 0.91, "is_fraud": 1, "decision": "HIGH RISK - BLOCK"}));
    Ok(())
}

#[tokio::test]
async fn predict_accepts_partial_payloads() -> TestResult {
    let (app, _) = app_with(amount_classifier());

    let (status, json) = send_json(&app, "POST", "/predict", Some("{}".to_string())).await?;

    check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(json["is_fraud"], json!(0));
    test_assert_eq!(json["decision"], json!("APPROVE"));
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_bad_request() -> TestResult {
    let (app, events) = app_with(fixed_classifier(0.1));

    let (status, json) = send_json(&app, "POST", "/predict", Some("{\"order_amount\": ".to_string())).await?;

    check_status_code(status, StatusCode::BAD_REQUEST)?;
    test_assert!(json["error"].is_string());
    test_assert!(events.events().await.map_err(|e| TestError::generic(e.to_string()))?.is_empty());
    Ok(())
}

#[tokio::test]
async fn non_object_payload_is_bad_request() -> TestResult {
    let (app, _) = app_with(fixed_classifier(0.1));

    let (status, json) = send_json(&app, "POST", "/predict", Some("[1, 2, 3]".to_string())).await?;

    check_status_code(status, StatusCode::BAD_REQUEST)?;
    test_assert!(json["error"].as_str().unwrap_or_default().contains("array"));
    Ok(())
}

#[tokio::test]
async fn classifier_failure_is_server_error() -> TestResult {
    let (app, _) = app_with(fixed_classifier(7.0));

    let body = serialize_json(&low_risk_payload())?;
    let (status, json) = send_json(&app, "POST", "/predict", Some(body)).await?;

    check_status_code(status, StatusCode::INTERNAL_SERVER_ERROR)?;
    test_assert!(json["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn home_and_health_answer_with_text() -> TestResult {
    let (app, _) = app_with(fixed_classifier(0.1));

    let (status, body) = send(&app, "GET", "/", None).await?;
    check_status_code(status, StatusCode::OK)?;
    test_assert!(String::from_utf8_lossy(&body).contains("/predict"));

    let (status, body) = send(&app, "GET", "/health", None).await?;
    check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(body, b"OK".to_vec());
    Ok(())
}

#[tokio::test]
async fn batch_endpoint_keeps_order_and_placeholders() -> TestResult {
    let (app, _) = app_with(amount_classifier());

    let body = serialize_json(&json!([
        {"order_amount": 9000},
        "broken",
        {"order_amount": 1000}
    ]))?;
    let (status, json) = send_json(&app, "POST", "/predict/batch", Some(body)).await?;

    check_status_code(status, StatusCode::OK)?;
    let rows = json.as_array().cloned().unwrap_or_default();
    test_assert_eq!(rows.len(), 3);
    test_assert_eq!(rows[0]["decision"], json!("HIGH RISK - BLOCK"));
    test_assert_eq!(rows[1]["decision"], Value::Null);
    test_assert!(rows[1]["error"].is_string());
    test_assert_eq!(rows[2]["decision"], json!("APPROVE"));
    Ok(())
}

#[tokio::test]
async fn batch_endpoint_requires_an_array() -> TestResult {
    let (app, _) = app_with(amount_classifier());

    let body = serialize_json(&high_risk_payload())?;
    let (status, _) = send_json(&app, "POST", "/predict/batch", Some(body)).await?;

    check_status_code(status, StatusCode::BAD_REQUEST)?;
    Ok(())
}

#[tokio::test]
async fn scored_requests_feed_the_event_endpoints() -> TestResult {
    let (app, events) = app_with(amount_classifier());

    for amount in [9000, 5000, 1000] {
        let body = serialize_json(&payload_with(&low_risk_payload(), "order_amount", json!(amount)))?;
        let (status, _) = send(&app, "POST", "/predict", Some(body)).await?;
        check_status_code(status, StatusCode::OK)?;
    }
    test_assert_eq!(events.events().await.map_err(|e| TestError::generic(e.to_string()))?.len(), 3);

    let (status, summary) = send_json(&app, "GET", "/events/summary", None).await?;
    check_status_code(status, StatusCode::OK)?;
    test_assert_eq!(summary["total_requests"], json!(3));
    test_assert_eq!(summary["fraud_cases"], json!(1));
    test_assert_eq!(summary["review_queue"], json!(1));
    test_assert_eq!(summary["blocked"], json!(1));
    test_assert_eq!(summary["risk_split"], json!({"Low": 2, "High": 1}));

    let (status, recent) = send_json(&app, "GET", "/events/recent?limit=2", None).await?;
    check_status_code(status, StatusCode::OK)?;
    let recent = recent.as_array().cloned().unwrap_or_default();
    test_assert_eq!(recent.len(), 2);
    test_assert_eq!(recent[0]["record"]["order_amount"], json!(5000.0));
    test_assert_eq!(recent[1]["result"]["decision"], json!("APPROVE"));
    Ok(())
}

#[tokio::test]
async fn recorded_event_holds_the_record_that_was_scored() -> TestResult {
    let mut classifier = MockClassifier::new();
    classifier.expect_name().return_const("mock_classifier");
    classifier
        .expect_score_one()
        .withf(|record| record.order_amount == 7000.0 && record.product_category == "Unknown")
        .times(1)
        .returning(|_| 0.2);
    let (app, events) = app_with(classifier);

    let body = serialize_json(&json!({"order_amount": "7000", "past_returns": "3"}))?;
    let (status, _) = send(&app, "POST", "/predict", Some(body)).await?;
    check_status_code(status, StatusCode::OK)?;

    let recorded = events.events().await.map_err(|e| TestError::generic(e.to_string()))?;
    test_assert_eq!(recorded.len(), 1);
    test_assert_eq!(recorded[0].record.order_amount, 7000.0);
    test_assert_eq!(recorded[0].record.past_returns, 3);
    test_assert_eq!(recorded[0].record.product_category, "Unknown");
    Ok(())
}

#[tokio::test]
async fn bad_recent_limit_is_a_json_bad_request() -> TestResult {
    let (app, _) = app_with(amount_classifier());

    let (status, body) = send_json(&app, "GET", "/events/recent?limit=abc", None).await?;

    check_status_code(status, StatusCode::BAD_REQUEST)?;
    test_assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

    let (status, _) = send_json(&app, "GET", "/events/recent?limit=-3", None).await?;
    check_status_code(status, StatusCode::BAD_REQUEST)?;
    Ok(())
}
