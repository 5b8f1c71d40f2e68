use std::collections::HashMap;

use crate::error::ConsistencyError;
use crate::value::Value;

/// Primary keys assigned during one import run, by table and source row index.
///
/// Entries are only ever added. A store belongs to a single run and is
/// dropped with it.
#[derive(Debug, Default)]
pub struct IdResolutionStore {
    keys: HashMap<String, HashMap<usize, Value>>,
}

impl IdResolutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        table: &str,
        row_index: usize,
        key: Value,
    ) -> Result<(), ConsistencyError> {
        let rows = self.keys.entry(table.to_string()).or_default();
        if rows.contains_key(&row_index) {
            return Err(ConsistencyError::DuplicateKey {
                table: table.to_string(),
                row_index,
            });
        }
        rows.insert(row_index, key);
        Ok(())
    }

    pub fn lookup(&self, table: &str, row_index: usize) -> Option<&Value> {
        self.keys.get(table).and_then(|rows| rows.get(&row_index))
    }

    /// Number of keys recorded for `table`.
    pub fn recorded_for(&self, table: &str) -> usize {
        self.keys.get(table).map_or(0, HashMap::len)
    }

    pub fn len(&self) -> usize {
        self.keys.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
