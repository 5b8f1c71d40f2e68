use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::value::Value;

/// One record of the tabular source, by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    fields: HashMap<String, Value>,
}

impl SourceRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    /// The field's value, or `None` when it is absent, null or empty.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_empty())
    }
}

/// The whole source held in memory. A row's position is its identity for
/// the duration of an import run.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    headers: Vec<String>,
    rows: Vec<SourceRow>,
}

impl SourceData {
    pub fn new(headers: Vec<String>, rows: Vec<SourceRow>) -> Self {
        SourceData { headers, rows }
    }

    /// Build from rows alone; headers are every field seen, sorted.
    pub fn from_rows(rows: Vec<SourceRow>) -> Self {
        let mut headers: Vec<String> = rows
            .iter()
            .flat_map(|r| r.fields.keys().cloned())
            .collect();
        headers.sort();
        headers.dedup();
        SourceData { headers, rows }
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open CSV file {:?}", path))?;
        Self::from_csv_reader(file).with_context(|| format!("Failed to read CSV file {:?}", path))
    }

    /// Every field is read as text; empty fields become null.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Malformed CSV record {}", line + 1))?;
            let mut row = SourceRow::new();
            for (header, field) in headers.iter().zip(record.iter()) {
                let value = if field.is_empty() {
                    Value::Null
                } else {
                    Value::Text(field.to_string())
                };
                row.insert(header, value);
            }
            rows.push(row);
        }

        Ok(SourceData { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[SourceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
