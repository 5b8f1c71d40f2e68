use crate::column_type::ColumnType;
use crate::id_store::IdResolutionStore;
use crate::mapping::{ColumnMapping, is_required};
use crate::schema::{Column, Table};
use crate::source::SourceRow;
use crate::value::{Value, render_literal};

/// Columns and rendered literals for one row of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPayload {
    pub row_index: usize,
    pub columns: Vec<String>,
    pub values: Vec<String>,
    /// Primary-key value taken from the source rather than generated.
    pub supplied_key: Option<Value>,
}

impl RowPayload {
    /// Identity of the inserted content, used for de-duplication.
    pub fn signature(&self) -> (Vec<String>, Vec<String>) {
        (self.columns.clone(), self.values.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A NOT NULL column has no value.
    MissingRequired { column: String },
    /// The primary key is neither generated nor supplied.
    MissingKey,
    /// The row carries nothing for this table.
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Insert(RowPayload),
    Skip(SkipReason),
}

/// Project `row` onto `table`.
///
/// Foreign-key columns are filled from keys already recorded for the same
/// row index; a missing parent key leaves the column out. A generated primary
/// key is only written when the row supplies it under the column's own name.
pub fn project_row(
    table: &Table,
    mapping: &ColumnMapping,
    row_index: usize,
    row: &SourceRow,
    store: &IdResolutionStore,
) -> Projection {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    let mut supplied_key = None;
    let mut source_values = 0;

    for col in &table.columns {
        let ty = col.column_type().unwrap_or(ColumnType::Text);

        let value = if let Some(fk) = table.foreign_key_for(&col.name) {
            store
                .lookup(&fk.referenced_table, row_index)
                .filter(|key| !key.is_empty())
        } else if col.is_primary && col.is_generated() {
            row.get(&col.name)
        } else {
            let value = mapping
                .field_for(&table.name, &col.name)
                .and_then(|field| row.get(field));
            if value.is_some() {
                source_values += 1;
            }
            value
        };

        match value {
            Some(value) => {
                if col.is_primary {
                    supplied_key = Some(value.clone());
                }
                columns.push(col.name.clone());
                values.push(render_literal(value, ty));
            }
            None => {
                if let Some(reason) = missing_reason(col) {
                    return Projection::Skip(reason);
                }
            }
        }
    }

    if columns.is_empty() || (source_values == 0 && mapping.has_fields(&table.name)) {
        return Projection::Skip(SkipReason::NoData);
    }

    Projection::Insert(RowPayload {
        row_index,
        columns,
        values,
        supplied_key,
    })
}

fn missing_reason(col: &Column) -> Option<SkipReason> {
    if col.is_primary {
        return if col.is_generated() {
            None
        } else {
            Some(SkipReason::MissingKey)
        };
    }
    if is_required(col) {
        return Some(SkipReason::MissingRequired {
            column: col.name.clone(),
        });
    }
    None
}
