use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use common::config::Config;
use scoring::batch::{BatchScorer, BatchSummary};
use scoring::dataset::{read_raw_rows, write_scored};
use scoring::executable_utils::initialize_tracing;
use scoring::{DecisionPolicy, ScoringService, TrainedModel};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(author, version, about = "Scores every row of a CSV file", long_about = None)]
struct BatchArgs {
    /// Path to config file
    #[arg(short, long, default_value = "target/debug/config/total_config.yaml")]
    config: String,

    /// CSV to score; defaults to the configured dataset
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the scored CSV; defaults to `batch.output_path`
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting batch scorer...");
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("No .env file loaded: {}", e);
    }
    let args = BatchArgs::parse();
    let config = Config::load(&args.config)?;
    initialize_tracing(&config.batch.log_level);

    let model = TrainedModel::load(Path::new(&config.common.model_path))?;
    let policy = DecisionPolicy::from_config(&config.decision)?;
    let service = Arc::new(ScoringService::new(Arc::new(model), policy));

    let input = args
        .input
        .unwrap_or_else(|| PathBuf::from(&config.common.dataset_path));
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.batch.output_path));

    let rows = read_raw_rows(&input)?;
    let inputs: Vec<Value> = rows
        .iter()
        .map(|row| row.as_ref().map_or(Value::Null, Value::clone))
        .collect();
    let outcomes = BatchScorer::new(service, config.batch.workers)
        .score_rows(rows)
        .await;
    write_scored(&output, &inputs, &outcomes)?;

    let summary = BatchSummary::from_outcomes(&outcomes);
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        scored = summary.scored,
        failed = summary.failed,
        flagged_fraud = summary.flagged_fraud,
        decisions = ?summary.decisions,
        "Batch scoring complete"
    );
    Ok(())
}
