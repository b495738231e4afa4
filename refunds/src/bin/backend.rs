use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use scoring::event_log::{EventLog, InMemoryEventLog, JsonLinesEventLog};
use scoring::executable_utils::{
    AppState, initialize_executable, initialize_tracing, install_metrics_exporter, run_backend,
};
use scoring::{DecisionPolicy, ScoringService, TrainedModel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting backend...");
    let config = initialize_executable()?;
    initialize_tracing(&config.backend.log_level);

    // Without a model there is nothing to serve.
    let model = TrainedModel::load(Path::new(&config.common.model_path))?;
    let policy = DecisionPolicy::from_config(&config.decision)?;
    let service = Arc::new(ScoringService::new(Arc::new(model), policy));

    let event_log: Arc<dyn EventLog> = match &config.backend.event_log_path {
        Some(path) => {
            tracing::info!("Recording scored requests to {}", path);
            Arc::new(JsonLinesEventLog::new(path))
        }
        None => Arc::new(InMemoryEventLog::with_capacity(config.backend.event_log_capacity)),
    };

    if let Some(address) = &config.backend.metrics_address {
        install_metrics_exporter(address)?;
    }

    let state = AppState::new(service, event_log, config.backend.batch_workers);
    run_backend(config.backend, state).await
}
