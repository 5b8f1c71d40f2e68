use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::db::{Executor, truncate_statement};
use crate::emitter::{DEFAULT_BATCH_SIZE, InsertStrategy, execute_table};
use crate::error::{DbError, ImportError, ImportFailure, ImportPhase, SchemaError};
use crate::graph::DependencyGraph;
use crate::id_store::IdResolutionStore;
use crate::mapping::{ColumnMapping, MappingOverrides};
use crate::order::order_tables_by_dependency;
use crate::projector::{Projection, RowPayload, project_row};
use crate::report::{ImportReport, TableReport, TableStatus};
use crate::schema::{Schema, Table};
use crate::source::SourceData;

/// Shared flag asking a running import to stop before its next table.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub strategy: InsertStrategy,
    pub batch_size: usize,
    /// Empty every table before inserting.
    pub truncate: bool,
    /// Tables whose identical rows are inserted once.
    pub deduplicate: HashSet<String>,
    pub mapping: MappingOverrides,
    pub cancel: CancelFlag,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            strategy: InsertStrategy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            truncate: false,
            deduplicate: HashSet::new(),
            mapping: MappingOverrides::new(),
            cancel: CancelFlag::new(),
        }
    }
}

/// Tables in insertion order plus the resolved column mapping.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub order: Vec<String>,
    pub mapping: ColumnMapping,
}

/// Everything that can be decided before touching the database.
pub fn prepare(
    schema: &Schema,
    source: &SourceData,
    overrides: &MappingOverrides,
) -> Result<ImportPlan, ImportError> {
    let graph = DependencyGraph::from_schema(schema)?;
    let order = order_tables_by_dependency(&graph)?;
    check_references(schema)?;
    let mapping = ColumnMapping::resolve(schema, source.headers(), overrides)?;

    Ok(ImportPlan { order, mapping })
}

/// Foreign keys are resolved through the id store, which only holds primary keys.
fn check_references(schema: &Schema) -> Result<(), SchemaError> {
    for table in schema.tables() {
        for fk in &table.foreign_keys {
            let is_pk = schema
                .get_table(&fk.referenced_table)
                .and_then(Table::primary_key)
                .is_some_and(|pk| pk.name == fk.referenced_column);
            if !is_pk {
                return Err(SchemaError::ReferenceNotPrimaryKey {
                    table: table.name.clone(),
                    column: fk.column.clone(),
                    referenced_table: fk.referenced_table.clone(),
                    referenced_column: fk.referenced_column.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Import `source` into the tables of `schema`.
///
/// Tables are inserted one at a time in dependency order, each in its own
/// transaction. The first failure stops the run: tables already committed
/// stay committed and are listed in the failure's report.
pub async fn import<E: Executor + ?Sized>(
    schema: &Schema,
    source: &SourceData,
    executor: &mut E,
    options: &ImportOptions,
) -> Result<ImportReport, ImportFailure> {
    let plan = prepare(schema, source, &options.mapping).map_err(|error| ImportFailure {
        phase: ImportPhase::Planning,
        report: ImportReport::default(),
        error,
    })?;

    let mut report = ImportReport::pending(&plan.order);
    info!(tables = plan.order.len(), rows = source.len(), "import planned");

    if options.truncate {
        if let Err(error) = truncate(executor, &plan.order).await {
            return Err(ImportFailure {
                phase: ImportPhase::Truncate,
                report,
                error,
            });
        }
    }

    let mut store = IdResolutionStore::new();

    for name in &plan.order {
        if options.cancel.is_cancelled() {
            warn!(next_table = %name, "import cancelled");
            return Err(ImportFailure {
                phase: ImportPhase::Insert,
                report,
                error: ImportError::Cancelled {
                    next_table: name.clone(),
                },
            });
        }

        let Some(table) = schema.get_table(name) else {
            continue;
        };
        let mut table_report = TableReport::not_started(name);

        let result = import_table(
            table,
            source,
            &plan.mapping,
            executor,
            options,
            &mut store,
            &mut table_report,
        )
        .instrument(info_span!("import_table", table = %name))
        .await;

        if let Err(error) = &result {
            table_report.status = TableStatus::Failed(error.to_string());
        }
        if let Some(slot) = report.table_mut(name) {
            *slot = table_report;
        }
        if let Err(error) = result {
            return Err(ImportFailure {
                phase: ImportPhase::Insert,
                report,
                error,
            });
        }
    }

    info!(
        inserted = report.total_inserted(),
        skipped = report.total_skipped(),
        "import finished"
    );
    Ok(report)
}

async fn truncate<E: Executor + ?Sized>(
    executor: &mut E,
    order: &[String],
) -> Result<(), ImportError> {
    let Some(sql) = truncate_statement(order) else {
        return Ok(());
    };
    info!(tables = order.len(), "truncating tables");

    let to_error = |e: DbError| ImportError::Truncate(e.to_string());
    executor.begin().await.map_err(to_error)?;
    if let Err(e) = executor.execute(&sql).await {
        if let Err(rollback) = executor.rollback().await {
            warn!(error = %rollback, "rollback failed");
        }
        return Err(to_error(e));
    }
    executor.commit().await.map_err(to_error)
}

async fn import_table<E: Executor + ?Sized>(
    table: &Table,
    source: &SourceData,
    mapping: &ColumnMapping,
    executor: &mut E,
    options: &ImportOptions,
    store: &mut IdResolutionStore,
    report: &mut TableReport,
) -> Result<(), ImportError> {
    let mut payloads: Vec<RowPayload> = Vec::new();
    let mut seen: HashMap<(Vec<String>, Vec<String>), usize> = HashMap::new();
    let mut duplicates: Vec<(usize, usize)> = Vec::new();
    let dedup = options.deduplicate.contains(&table.name);

    for (row_index, row) in source.rows().iter().enumerate() {
        match project_row(table, mapping, row_index, row, store) {
            Projection::Insert(payload) => {
                if dedup {
                    if let Some(&first) = seen.get(&payload.signature()) {
                        duplicates.push((row_index, first));
                        continue;
                    }
                    seen.insert(payload.signature(), row_index);
                }
                payloads.push(payload);
            }
            Projection::Skip(reason) => {
                debug!(row = row_index, ?reason, "row skipped");
                report.skipped += 1;
            }
        }
    }

    report.inserted = execute_table(
        executor,
        table,
        &payloads,
        options.strategy,
        options.batch_size,
        store,
    )
    .await?;

    // Duplicates share the key of the row that was inserted.
    for (row_index, first) in duplicates {
        if let Some(key) = store.lookup(&table.name, first).cloned() {
            store.record(&table.name, row_index, key)?;
        }
        report.deduplicated += 1;
    }

    report.status = TableStatus::Committed;
    if report.skipped > 0 {
        warn!(skipped = report.skipped, "rows skipped");
    }
    info!(
        inserted = report.inserted,
        deduplicated = report.deduplicated,
        "table committed"
    );
    Ok(())
}
