//! Input table loading and schema guard

use crate::error::PipelineError;
use crate::models::Schema;
use std::path::Path;
use tracing::{debug, info};

/// Untyped table restricted to the schema's required columns
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a CSV table and keep only the columns the schema requires.
///
/// Timestamp and index columns listed in the schema (and unnamed header
/// cells) are dropped first. A missing file or a missing required column is
/// fatal.
pub fn load_table(path: &Path, schema: &Schema) -> Result<RawTable, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }

    let read_err = |source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(read_err)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(read_err)?
        .iter()
        .map(str::to_string)
        .collect();
    info!(path = %path.display(), columns = ?headers, "Loaded table header");

    let dropped: Vec<&String> = headers
        .iter()
        .filter(|h| h.is_empty() || schema.drop_columns.contains(h))
        .collect();
    if !dropped.is_empty() {
        debug!(columns = ?dropped, "Dropping timestamp/index columns");
    }

    let required = schema.required_columns();
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !headers.iter().any(|h| h == *name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns(missing));
    }

    let positions: Vec<usize> = required
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == name))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(read_err)?;
        rows.push(
            positions
                .iter()
                .map(|&i| record.get(i).unwrap_or("").to_string())
                .collect(),
        );
    }

    info!(rows = rows.len(), "Data loaded");

    Ok(RawTable {
        columns: required.iter().map(|s| s.to_string()).collect(),
        rows,
    })
}
