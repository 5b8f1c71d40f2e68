mod column_type;
mod config;
mod emitter;
mod error;
mod graph;
mod id_store;
mod importer;
mod mapping;
mod order;
mod os;
mod projector;
mod report;
mod schema;
mod source;
mod toml_schema;
mod value;

pub mod db;

pub use column_type::ColumnType;
pub use config::{CONFIG_FILE, ImportSettings, SeedConfig, database_url, retrieve_from_env};
pub use emitter::{
    DEFAULT_BATCH_SIZE, InsertStrategy, PlannedStatement, execute_table, plan_statements,
};
pub use error::{
    ConsistencyError, DbError, ImportError, ImportFailure, ImportPhase, MappingError, OrderError,
    SchemaError,
};
pub use graph::DependencyGraph;
pub use id_store::IdResolutionStore;
pub use importer::{CancelFlag, ImportOptions, ImportPlan, import, prepare};
pub use mapping::{ColumnMapping, MappingOverrides};
pub use order::order_tables_by_dependency;
pub use os::{create_directory, create_file, scaffold_files};
pub use projector::{Projection, RowPayload, SkipReason, project_row};
pub use report::{ImportReport, TableReport, TableStatus};
pub use schema::{Column, ForeignKey, Index, Schema, Table};
pub use source::{SourceData, SourceRow};
pub use toml_schema::TomlSchema;
pub use value::{Value, quote_identifier, quote_literal, render_literal};
