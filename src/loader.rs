// 📂 Transaction Loader - JSON / CSV → Vec<Transaction>
//
// The aggregation engine never touches files; this is the only place
// datasets are read from disk.

use crate::model::Transaction;
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// JSON array of records (the `transactions.json` export)
    Json,

    /// CSV with a header row using the same field names as the JSON export
    Csv,
}

/// Detect the dataset format from the file extension
pub fn detect_format(path: &Path) -> Option<SourceFormat> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();

    match extension.as_str() {
        "json" => Some(SourceFormat::Json),
        "csv" => Some(SourceFormat::Csv),
        _ => None,
    }
}

/// Load a dataset, choosing the reader from the file extension
pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>> {
    match detect_format(path) {
        Some(SourceFormat::Json) => load_json(path),
        Some(SourceFormat::Csv) => load_csv(path),
        None => bail!(
            "Unsupported dataset format: {} (expected .json or .csv)",
            path.display()
        ),
    }
}

pub fn load_json(json_path: &Path) -> Result<Vec<Transaction>> {
    let file = File::open(json_path)
        .with_context(|| format!("Failed to open JSON file {}", json_path.display()))?;

    let transactions: Vec<Transaction> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to deserialize transactions from {}", json_path.display()))?;

    info!(path = %json_path.display(), count = transactions.len(), "loaded transactions");
    Ok(transactions)
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;

    let mut transactions = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        // +2: one for the header row, one for 1-based line numbers
        let transaction: Transaction = result
            .with_context(|| format!("Failed to deserialize transaction on line {}", index + 2))?;
        transactions.push(transaction);
    }

    info!(path = %csv_path.display(), count = transactions.len(), "loaded transactions");
    Ok(transactions)
}

// ============================================================================
// TESTS
// ============================================================================
