//! Output formatting and persistence for categorization results.
//!
//! Supports a single-line JSON log, pretty JSON and CSV append.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::categories::Category;
use crate::classifier::Categorization;

/// Logs the full categorization as one line of JSON.
pub fn log_json(categorization: &Categorization) -> Result<()> {
    info!(
        trips = categorization.len(),
        "{}",
        serde_json::to_string(categorization)?
    );
    Ok(())
}

/// Renders the categorization as pretty-printed JSON.
pub fn to_pretty_json(categorization: &Categorization) -> Result<String> {
    Ok(serde_json::to_string_pretty(categorization)?)
}

/// One CSV row: a trip and one of its categories.
///
/// A trip without categories gets a single row with empty category and score.
#[derive(Debug, Serialize)]
pub struct CategoryRecord<'a> {
    pub timestamp: DateTime<Utc>,
    pub trip_id: &'a str,
    pub category: Option<Category>,
    pub score: Option<f64>,
}

/// Flattens a categorization into rows stamped with `timestamp`.
pub fn records(
    categorization: &Categorization,
    timestamp: DateTime<Utc>,
) -> Vec<CategoryRecord<'_>> {
    let mut rows = Vec::new();
    for (trip_id, categories) in &categorization.trips {
        if categories.is_empty() {
            rows.push(CategoryRecord {
                timestamp,
                trip_id: trip_id.as_str(),
                category: None,
                score: None,
            });
        }
        for (category, score) in categories {
            rows.push(CategoryRecord {
                timestamp,
                trip_id: trip_id.as_str(),
                category: Some(*category),
                score: Some(*score),
            });
        }
    }
    rows
}

/// Appends the categorization as rows to a CSV file and returns the row count.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(path: &str, categorization: &Categorization) -> Result<usize> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    let rows = records(categorization, Utc::now());
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(rows.len())
}
