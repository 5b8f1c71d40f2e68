use std::collections::{HashMap, HashSet};

use crate::error::MappingError;
use crate::schema::{Column, Schema, Table};

/// Explicit overrides: table -> column -> source field.
pub type MappingOverrides = HashMap<String, HashMap<String, String>>;

/// Which source field feeds which destination column, resolved once per run.
///
/// Foreign-key columns and generated primary keys are never mapped here;
/// the former come from the id store, the latter from the database.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    fields: HashMap<String, HashMap<String, String>>,
}

impl ColumnMapping {
    pub fn resolve(
        schema: &Schema,
        headers: &[String],
        overrides: &MappingOverrides,
    ) -> Result<Self, MappingError> {
        let header_set: HashSet<&str> = headers.iter().map(String::as_str).collect();
        validate_overrides(schema, &header_set, overrides)?;

        let mut fields: HashMap<String, HashMap<String, String>> = HashMap::new();

        for table in schema.tables() {
            let table_overrides = overrides.get(&table.name);
            let mut table_fields = HashMap::new();

            for col in table.columns.iter().filter(|c| takes_source_data(table, c)) {
                if let Some(field) = table_overrides.and_then(|o| o.get(&col.name)) {
                    table_fields.insert(col.name.clone(), field.clone());
                    continue;
                }

                let mut candidates: Vec<String> = Vec::new();
                for name in [
                    col.name.clone(),
                    format!("{}.{}", table.name, col.name),
                    format!("{}_{}", table.name, col.name),
                ] {
                    if header_set.contains(name.as_str()) && !candidates.contains(&name) {
                        candidates.push(name);
                    }
                }

                match candidates.len() {
                    0 if is_required(col) => {
                        return Err(MappingError::Unmapped {
                            table: table.name.clone(),
                            column: col.name.clone(),
                        });
                    }
                    0 => {}
                    1 => {
                        table_fields.insert(col.name.clone(), candidates.remove(0));
                    }
                    _ => {
                        return Err(MappingError::Ambiguous {
                            table: table.name.clone(),
                            column: col.name.clone(),
                            candidates,
                        });
                    }
                }
            }

            fields.insert(table.name.clone(), table_fields);
        }

        Ok(ColumnMapping { fields })
    }

    pub fn field_for(&self, table: &str, column: &str) -> Option<&str> {
        self.fields
            .get(table)
            .and_then(|cols| cols.get(column))
            .map(String::as_str)
    }

    /// True when at least one column of `table` is fed from the source.
    pub fn has_fields(&self, table: &str) -> bool {
        self.fields.get(table).is_some_and(|cols| !cols.is_empty())
    }
}

fn takes_source_data(table: &Table, col: &Column) -> bool {
    table.foreign_key_for(&col.name).is_none() && !(col.is_primary && col.is_generated())
}

/// A column the database cannot fill on its own.
pub(crate) fn is_required(col: &Column) -> bool {
    !col.is_nullable && col.default.is_none() && !col.is_generated()
}

fn validate_overrides(
    schema: &Schema,
    headers: &HashSet<&str>,
    overrides: &MappingOverrides,
) -> Result<(), MappingError> {
    for (table_name, columns) in overrides {
        for (column, field) in columns {
            let table = schema.get_table(table_name);
            let known = table
                .and_then(|t| t.column(column).map(|c| (t, c)))
                .filter(|(t, c)| takes_source_data(t, c));

            if known.is_none() {
                return Err(MappingError::UnknownColumn {
                    table: table_name.clone(),
                    column: column.clone(),
                });
            }
            if !headers.contains(field.as_str()) {
                return Err(MappingError::UnknownField {
                    table: table_name.clone(),
                    column: column.clone(),
                    field: field.clone(),
                });
            }
        }
    }
    Ok(())
}
