//! CSV ingestion of claim records

use crate::error::Result;
use crate::types::claim::{ClaimTable, FieldValue};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Load a claims CSV (header row required) into a `ClaimTable`.
pub fn load_claims<P: AsRef<Path>>(path: P, id_column: &str) -> Result<ClaimTable> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let table = read_table(reader, id_column)?;

    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "Loaded claims"
    );

    Ok(table)
}

/// Parse claims from any CSV source.
pub fn read_claims<R: Read>(source: R, id_column: &str) -> Result<ClaimTable> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);
    read_table(reader, id_column)
}

fn read_table<R: Read>(mut reader: csv::Reader<R>, id_column: &str) -> Result<ClaimTable> {
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(FieldValue::parse).collect());
    }

    ClaimTable::new(columns, rows, id_column)
}
