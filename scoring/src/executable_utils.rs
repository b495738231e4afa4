use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use common::config::{BackendConfig, Config};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Deserialize;
use serde_json::{Value, json};
use std::{error::Error, net::SocketAddr, sync::Arc, time::Instant};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    batch::BatchScorer,
    error::ScoringError,
    event_log::{EventLog, LiveSummary, ScoredEvent},
    service::ScoringService,
};

pub const DEFAULT_RECENT_EVENTS: usize = 12;
const HOME_MESSAGE: &str = "Refund fraud scoring service is running. Use POST request on /predict.";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "target/debug/config/total_config.yaml")]
    pub config: String,
}

/// Loads `.env`, parses arguments and reads the config file.
pub fn initialize_executable() -> Result<Config, Box<dyn Error + Send + Sync>> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("No .env file loaded: {}", e);
    }

    let args = Args::parse();
    let config = Config::load(&args.config)?;
    Ok(config)
}

/// `RUST_LOG` takes precedence over the configured level.
pub fn initialize_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn install_metrics_exporter(address: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let address: SocketAddr = address.parse()?;
    PrometheusBuilder::new().with_http_listener(address).install()?;
    tracing::info!("Serving Prometheus metrics at {}", address);
    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    service: Arc<ScoringService>,
    batch: BatchScorer,
    event_log: Arc<dyn EventLog>,
}

impl AppState {
    pub fn new(service: Arc<ScoringService>, event_log: Arc<dyn EventLog>, batch_workers: usize) -> Self {
        Self {
            batch: BatchScorer::new(service.clone(), batch_workers),
            service,
            event_log,
        }
    }
}

pub fn build_router(state: AppState, cors_origin: Option<&str>) -> Result<Router, Box<dyn Error + Send + Sync>> {
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new().allow_origin(origin.parse::<HeaderValue>()?),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    Ok(Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .route("/predict", post(predict))
        .route("/predict/batch", post(predict_batch))
        .route("/events/summary", get(events_summary))
        .route("/events/recent", get(recent_events))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

pub async fn run_backend(config: BackendConfig, state: AppState) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = build_router(state, config.cors_origin.as_deref())?;

    tracing::info!("Starting scoring service at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn scoring_error_response(error: &ScoringError) -> Response {
    counter!("refund_scoring_errors_total", "kind" => error.kind()).increment(1);
    let status = match error {
        ScoringError::Input(_) => StatusCode::BAD_REQUEST,
        ScoringError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

pub async fn home() -> impl IntoResponse {
    (StatusCode::OK, HOME_MESSAGE)
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}

pub async fn predict(State(state): State<AppState>, payload: Result<Json<Value>, JsonRejection>) -> Response {
    let Json(raw) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected predict request");
            counter!("refund_scoring_errors_total", "kind" => "input").increment(1);
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let started = Instant::now();
    let outcome = state.service.score_payload(&raw);
    histogram!("refund_scoring_predict_seconds").record(started.elapsed().as_secs_f64());

    match outcome {
        Ok((record, result)) => {
            counter!("refund_scoring_decisions_total", "decision" => result.decision.to_string()).increment(1);
            if let Err(e) = state.event_log.append(ScoredEvent::now(record, result.clone())).await {
                tracing::error!(error = %e, "Failed to record scored event");
            }
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind(), "Failed to score request");
            scoring_error_response(&e)
        }
    }
}

pub async fn predict_batch(State(state): State<AppState>, payload: Result<Json<Value>, JsonRejection>) -> Response {
    let rows = match payload {
        Ok(Json(Value::Array(rows))) => rows,
        Ok(Json(_)) => {
            return error_response(StatusCode::BAD_REQUEST, "expected a JSON array of records");
        }
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let outcomes = state.batch.score_all(rows).await;
    (StatusCode::OK, Json(outcomes)).into_response()
}

pub async fn events_summary(State(state): State<AppState>) -> Response {
    match state.event_log.events().await {
        Ok(events) => Json(LiveSummary::from_events(&events, state.service.policy())).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read event log");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

pub async fn recent_events(
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> Response {
    let limit = match query {
        Ok(Query(query)) => query.limit.unwrap_or(DEFAULT_RECENT_EVENTS),
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected recent events query");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };
    match state.event_log.recent(limit).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read event log");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
