use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::db::Executor;
use crate::error::{ConsistencyError, DbError, ImportError};
use crate::id_store::IdResolutionStore;
use crate::projector::RowPayload;
use crate::schema::Table;
use crate::value::quote_identifier;

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// How rows of one table are turned into statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertStrategy {
    /// One statement per row.
    RowAtATime,
    /// Multi-row statements over consecutive rows with the same columns.
    #[default]
    Batched,
}

impl std::str::FromStr for InsertStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "row-at-a-time" | "row" => Ok(InsertStrategy::RowAtATime),
            "batched" | "batch" => Ok(InsertStrategy::Batched),
            other => Err(format!(
                "Unknown insert strategy '{}' (expected 'row-at-a-time' or 'batched')",
                other
            )),
        }
    }
}

/// An INSERT ready to run, with the source rows it covers in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStatement {
    pub table: String,
    pub row_indices: Vec<usize>,
    pub sql: String,
    /// Key column named in `RETURNING`, if keys are captured.
    pub returning: Option<String>,
}

// ============ Planning ============

pub fn plan_statements(
    table: &Table,
    payloads: &[RowPayload],
    strategy: InsertStrategy,
    batch_size: usize,
) -> Vec<PlannedStatement> {
    let limit = match strategy {
        InsertStrategy::RowAtATime => 1,
        InsertStrategy::Batched => batch_size.max(1),
    };

    let mut statements = Vec::new();
    let mut group: Vec<&RowPayload> = Vec::new();

    for payload in payloads {
        let fits = group
            .first()
            .is_some_and(|first| first.columns == payload.columns && group.len() < limit);
        if !fits && !group.is_empty() {
            statements.push(build_statement(table, &group));
            group.clear();
        }
        group.push(payload);
    }
    if !group.is_empty() {
        statements.push(build_statement(table, &group));
    }

    statements
}

fn build_statement(table: &Table, rows: &[&RowPayload]) -> PlannedStatement {
    let columns: Vec<String> = rows[0].columns.iter().map(|c| quote_identifier(c)).collect();
    let tuples: Vec<String> = rows
        .iter()
        .map(|r| format!("({})", r.values.join(", ")))
        .collect();

    // Keys supplied by the source are recorded directly; nothing to return.
    let returning = table
        .primary_key()
        .filter(|_| rows[0].supplied_key.is_none())
        .map(|pk| pk.name.clone());

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_identifier(&table.name),
        columns.join(", "),
        tuples.join(", ")
    );
    if let Some(pk) = &returning {
        sql.push_str(&format!(" RETURNING {}", quote_identifier(pk)));
    }

    PlannedStatement {
        table: table.name.clone(),
        row_indices: rows.iter().map(|r| r.row_index).collect(),
        sql,
        returning,
    }
}

// ============ Execution ============

/// Insert `payloads` into `table` inside a single transaction and record the
/// resulting keys. Returns the number of rows inserted.
///
/// On failure the transaction is rolled back before the error is returned;
/// keys recorded for the failed table stay in the store but no later table
/// is attempted.
pub async fn execute_table<E: Executor + ?Sized>(
    executor: &mut E,
    table: &Table,
    payloads: &[RowPayload],
    strategy: InsertStrategy,
    batch_size: usize,
    store: &mut IdResolutionStore,
) -> Result<usize, ImportError> {
    if payloads.is_empty() {
        return Ok(0);
    }

    let strategy = effective_strategy(executor, table, strategy);
    let statements = plan_statements(table, payloads, strategy, batch_size);
    let by_index: HashMap<usize, &RowPayload> =
        payloads.iter().map(|p| (p.row_index, p)).collect();

    executor
        .begin()
        .await
        .map_err(|e| execution_error(table, payloads[0].row_index, e))?;

    for statement in &statements {
        if let Err(e) = run_statement(executor, statement, &by_index, store).await {
            rollback(executor, table).await;
            return Err(e);
        }
    }

    executor
        .commit()
        .await
        .map_err(|e| execution_error(table, payloads[0].row_index, e))?;

    Ok(payloads.len())
}

fn effective_strategy<E: Executor + ?Sized>(
    executor: &E,
    table: &Table,
    strategy: InsertStrategy,
) -> InsertStrategy {
    if strategy == InsertStrategy::Batched
        && table.primary_key().is_some()
        && !executor.preserves_returning_order()
    {
        warn!(
            table = %table.name,
            "executor does not guarantee RETURNING order; inserting row at a time"
        );
        return InsertStrategy::RowAtATime;
    }
    strategy
}

async fn run_statement<E: Executor + ?Sized>(
    executor: &mut E,
    statement: &PlannedStatement,
    payloads: &HashMap<usize, &RowPayload>,
    store: &mut IdResolutionStore,
) -> Result<(), ImportError> {
    let first_row = statement.row_indices.first().copied().unwrap_or_default();
    debug!(table = %statement.table, rows = statement.row_indices.len(), sql = %statement.sql);

    let returned = executor
        .execute_planned(statement)
        .await
        .map_err(|e| ImportError::Execution {
            table: statement.table.clone(),
            row_index: first_row,
            message: e.to_string(),
        })?;

    if statement.returning.is_some() {
        if returned.len() != statement.row_indices.len() {
            return Err(ConsistencyError::ReturnedKeyCount {
                table: statement.table.clone(),
                expected: statement.row_indices.len(),
                returned: returned.len(),
            }
            .into());
        }
        for (row_index, row) in statement.row_indices.iter().zip(returned) {
            let key = row.into_iter().next().ok_or_else(|| {
                ConsistencyError::EmptyReturnedRow {
                    table: statement.table.clone(),
                    row_index: *row_index,
                }
            })?;
            store.record(&statement.table, *row_index, key)?;
        }
    } else {
        for row_index in &statement.row_indices {
            let supplied = payloads.get(row_index).and_then(|p| p.supplied_key.clone());
            if let Some(key) = supplied {
                store.record(&statement.table, *row_index, key)?;
            }
        }
    }

    Ok(())
}

async fn rollback<E: Executor + ?Sized>(executor: &mut E, table: &Table) {
    if let Err(e) = executor.rollback().await {
        warn!(table = %table.name, error = %e, "rollback failed");
    }
}

fn execution_error(table: &Table, row_index: usize, e: DbError) -> ImportError {
    ImportError::Execution {
        table: table.name.clone(),
        row_index,
        message: e.to_string(),
    }
}
