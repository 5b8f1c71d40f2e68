use thiserror::Error;

use crate::report::ImportReport;

/// A schema that cannot be imported into.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Duplicate table name: {0}")]
    DuplicateTable(String),

    #[error("Duplicate column {column} in table {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("Unknown column type {data_type:?} for {table}.{column}")]
    UnknownType {
        table: String,
        column: String,
        data_type: String,
    },

    #[error("Foreign key column {column} is not declared in table {table}")]
    UnknownForeignKeyColumn { table: String, column: String },

    #[error("Foreign key {table}.{column} references unknown table {referenced_table}")]
    UnknownReferencedTable {
        table: String,
        column: String,
        referenced_table: String,
    },

    #[error("Foreign key {table}.{column} references unknown column {referenced_table}.{referenced_column}")]
    UnknownReferencedColumn {
        table: String,
        column: String,
        referenced_table: String,
        referenced_column: String,
    },

    #[error("Table {0} declares more than one primary key column; composite keys are not supported")]
    CompositePrimaryKey(String),

    #[error("Foreign key {table}.{column} must reference the primary key of {referenced_table}, not {referenced_column}")]
    ReferenceNotPrimaryKey {
        table: String,
        column: String,
        referenced_table: String,
        referenced_column: String,
    },
}

/// Failures while ordering tables for insertion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Table {table} references itself; self-referencing tables must be loaded manually")]
    SelfReference { table: String },

    #[error("Circular dependency detected at table {table}")]
    Cycle { table: String },
}

/// Failures while binding source fields to destination columns.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Required column {table}.{column} has no matching source field")]
    Unmapped { table: String, column: String },

    #[error("Column {table}.{column} matches several source fields: {candidates:?}")]
    Ambiguous {
        table: String,
        column: String,
        candidates: Vec<String>,
    },

    #[error("Mapping for {table}.{column} names unknown source field {field}")]
    UnknownField {
        table: String,
        column: String,
        field: String,
    },

    #[error("Mapping names unknown column {table}.{column}")]
    UnknownColumn { table: String, column: String },
}

/// Internal invariants that were violated during a run. Always fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("Key for {table} row {row_index} was already recorded")]
    DuplicateKey { table: String, row_index: usize },

    #[error("Insert into {table} returned {returned} keys for {expected} rows")]
    ReturnedKeyCount {
        table: String,
        expected: usize,
        returned: usize,
    },

    #[error("Insert into {table} returned no key for row {row_index}")]
    EmptyReturnedRow { table: String, row_index: usize },
}

/// Error reported by a database executor.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    Driver(#[from] sqlx::Error),

    #[error("Statement timed out after {0} seconds")]
    Timeout(u64),

    #[error("Unsupported column type {0} in returned row")]
    UnsupportedType(String),

    #[error("No transaction is open")]
    NoTransaction,

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error("Insert into {table} failed at row {row_index}: {message}")]
    Execution {
        table: String,
        row_index: usize,
        message: String,
    },

    #[error("Truncate failed: {0}")]
    Truncate(String),

    #[error("Import cancelled before table {next_table}")]
    Cancelled { next_table: String },
}

/// Phase of an import run in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Planning,
    Truncate,
    Insert,
}

impl std::fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImportPhase::Planning => "planning",
            ImportPhase::Truncate => "truncate",
            ImportPhase::Insert => "insert",
        };
        f.write_str(name)
    }
}

/// A failed import run together with everything that completed before it.
#[derive(Debug, Error)]
#[error("Import failed during {phase}: {error}")]
pub struct ImportFailure {
    pub phase: ImportPhase,
    pub report: ImportReport,
    #[source]
    pub error: ImportError,
}

impl ImportFailure {
    /// Table the failure is attributed to, when there is one.
    pub fn table(&self) -> Option<&str> {
        match &self.error {
            ImportError::Execution { table, .. } => Some(table),
            ImportError::Cancelled { next_table } => Some(next_table),
            ImportError::Consistency(ConsistencyError::DuplicateKey { table, .. })
            | ImportError::Consistency(ConsistencyError::ReturnedKeyCount { table, .. }) => {
                Some(table)
            }
            ImportError::Order(OrderError::Cycle { table })
            | ImportError::Order(OrderError::SelfReference { table }) => Some(table),
            _ => None,
        }
    }
}
