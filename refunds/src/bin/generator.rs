use std::error::Error;
use std::path::Path;

use refunds::DatasetGenerator;
use scoring::analytics::DatasetSummary;
use scoring::dataset::write_labeled;
use scoring::decision::DecisionPolicy;
use scoring::executable_utils::{initialize_executable, initialize_tracing};

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting generator...");
    let config = initialize_executable()?;
    initialize_tracing(&config.generator.log_level);

    let rows = DatasetGenerator::from_config(&config.generator).generate(config.generator.rows);
    write_labeled(Path::new(&config.common.dataset_path), &rows)?;

    let policy = DecisionPolicy::from_config(&config.decision)?;
    let summary = DatasetSummary::from_rows(&rows, &policy);
    tracing::info!(
        rows = summary.total,
        fraud = summary.fraud_count,
        fraud_rate_pct = summary.fraud_rate_pct,
        estimated_loss = summary.estimated_loss,
        risk_segments = ?summary.risk_segments,
        "Generated dataset"
    );
    for alert in &summary.alerts {
        tracing::warn!("{}", alert);
    }
    Ok(())
}
