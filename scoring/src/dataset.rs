use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::{
    batch::RowOutcome,
    error::DatasetError,
    model::{IS_FRAUD, LabeledRecord},
    normalizer::normalize,
};

/// One CSV row keyed by header, or the reason it could not be read.
pub type RawRow = Result<Value, String>;

/// Reads a CSV file into raw records keyed by header. Empty cells are left out
/// so that normalization treats them as missing. Cells are decoded lossily and
/// short rows keep the cells they have; a row that cannot be read becomes an
/// `Err` at its position instead of failing the whole file.
pub fn read_raw_rows(path: &Path) -> Result<Vec<RawRow>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|header| String::from_utf8_lossy(header).trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let io_failure = e.is_io_error();
                tracing::warn!(path = %path.display(), row = rows.len(), error = %e, "Unreadable csv row");
                rows.push(Err(e.to_string()));
                if io_failure {
                    break;
                }
                continue;
            }
        };
        if record.len() > headers.len() {
            let line = record.position().map_or(0, |p| p.line());
            tracing::warn!(path = %path.display(), line, "Csv row has more fields than the header");
            rows.push(Err(format!(
                "line {line} has {} fields, header has {}",
                record.len(),
                headers.len()
            )));
            continue;
        }
        let object: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header, String::from_utf8_lossy(cell)))
            .filter(|(_, cell)| !cell.trim().is_empty())
            .map(|(header, cell)| (header.clone(), Value::String(cell.into_owned())))
            .collect();
        rows.push(Ok(Value::Object(object)));
    }
    tracing::debug!(path = %path.display(), rows = rows.len(), "Read csv rows");
    Ok(rows)
}

/// Reads a labeled dataset; rows are normalized and unreadable labels count as
/// not fraud. Rows that could not be read at all are skipped.
pub fn read_labeled(path: &Path) -> Result<Vec<LabeledRecord>, DatasetError> {
    let mut labeled = Vec::new();
    for (index, row) in read_raw_rows(path)?.into_iter().enumerate() {
        match row {
            Ok(Value::Object(object)) => labeled.push(LabeledRecord {
                record: normalize(&object),
                is_fraud: parse_label(object.get(IS_FRAUD)),
            }),
            Ok(_) => {}
            Err(error) => tracing::warn!(row = index, %error, "Skipping unreadable training row"),
        }
    }
    Ok(labeled)
}

pub fn parse_label(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s.parse::<f64>().is_ok_and(|v| v != 0.0)
        }
        _ => false,
    }
}

#[derive(Serialize)]
struct DatasetRow<'a> {
    order_amount: f64,
    product_category: &'a str,
    payment_method: &'a str,
    return_reason: &'a str,
    past_returns: u32,
    delivery_delay_days: f64,
    refund_type: &'a str,
    is_fraud: u8,
}

impl<'a> From<&'a LabeledRecord> for DatasetRow<'a> {
    fn from(row: &'a LabeledRecord) -> Self {
        let record = &row.record;
        Self {
            order_amount: record.order_amount,
            product_category: &record.product_category,
            payment_method: &record.payment_method,
            return_reason: &record.return_reason,
            past_returns: record.past_returns,
            delivery_delay_days: record.delivery_delay_days,
            refund_type: &record.refund_type,
            is_fraud: u8::from(row.is_fraud),
        }
    }
}

pub fn write_labeled(path: &Path, rows: &[LabeledRecord]) -> Result<(), DatasetError> {
    create_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(DatasetRow::from(row))?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Wrote labeled dataset");
    Ok(())
}

pub const SCORE_COLUMNS: [&str; 4] = ["fraud_probability", "is_fraud", "decision", "error"];
pub const PREDICTED_PREFIX: &str = "predicted_";

/// Header names for the score columns. A score column that shares its name
/// with an input column gets the `predicted_` prefix so the input survives.
pub fn score_headers(input_columns: &[String]) -> Vec<String> {
    SCORE_COLUMNS
        .iter()
        .map(|column| {
            if input_columns.iter().any(|input| input == column) {
                format!("{PREDICTED_PREFIX}{column}")
            } else {
                column.to_string()
            }
        })
        .collect()
}

/// Writes the input columns followed by each row's score (or error).
pub fn write_scored(path: &Path, raw_rows: &[Value], outcomes: &[RowOutcome]) -> Result<(), DatasetError> {
    create_parent(path)?;

    let mut input_columns: Vec<String> = Vec::new();
    for key in raw_rows.iter().filter_map(Value::as_object).flat_map(|o| o.keys()) {
        if !input_columns.contains(key) {
            input_columns.push(key.clone());
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(input_columns.iter().chain(&score_headers(&input_columns)))?;

    for (raw, outcome) in raw_rows.iter().zip(outcomes) {
        let mut cells: Vec<String> = input_columns
            .iter()
            .map(|column| match raw.get(column) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        match outcome {
            RowOutcome::Scored(result) => cells.extend([
                result.fraud_probability.to_string(),
                u8::from(result.is_fraud).to_string(),
                result.decision.to_string(),
                String::new(),
            ]),
            RowOutcome::Failed { error } => {
                cells.extend([String::new(), String::new(), String::new(), error.clone()])
            }
        }
        writer.write_record(&cells)?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), rows = outcomes.len(), "Wrote scored dataset");
    Ok(())
}

fn create_parent(path: &Path) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
