use std::error::Error;
use std::path::Path;

use scoring::decision::DecisionPolicy;
use scoring::executable_utils::{initialize_executable, initialize_tracing};
use scoring::trainer::{TrainerParams, train_from_csv};

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting trainer...");
    let config = initialize_executable()?;
    initialize_tracing(&config.trainer.log_level);

    let policy = DecisionPolicy::from_config(&config.decision)?;
    let model = train_from_csv(
        Path::new(&config.common.dataset_path),
        Path::new(&config.common.model_path),
        &TrainerParams::from(&config.trainer),
        &policy,
    )?;

    match &model.metadata.holdout {
        Some(metrics) => tracing::info!(
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            "Model saved to {}",
            config.common.model_path
        ),
        None => tracing::info!("Model saved to {}", config.common.model_path),
    }
    Ok(())
}
