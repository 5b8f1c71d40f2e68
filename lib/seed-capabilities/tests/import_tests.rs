use async_trait::async_trait;
use seed_capabilities::db::{DryRunExecutor, Executor};
use seed_capabilities::{
    CancelFlag, Column, ConsistencyError, DbError, ForeignKey, ImportError, ImportOptions,
    ImportPhase, InsertStrategy, PlannedStatement, Schema, SourceData, SourceRow, Table,
    TableStatus, Value, import,
};

// ============ Fixtures ============

fn sales_schema() -> Schema {
    Schema::new(vec![
        Table::new(
            "orders",
            vec![
                Column::new("order_id", "SERIAL").primary(),
                Column::new("customer_id", "INTEGER").not_null(),
                Column::new("product_id", "INTEGER").not_null(),
                Column::new("amount", "INTEGER").not_null(),
            ],
        )
        .with_foreign_key(ForeignKey::new("customer_id", "customers", "customer_id"))
        .with_foreign_key(ForeignKey::new("product_id", "products", "product_id")),
        Table::new(
            "customers",
            vec![
                Column::new("customer_id", "SERIAL").primary(),
                Column::new("customer_name", "TEXT").not_null(),
            ],
        ),
        Table::new(
            "products",
            vec![
                Column::new("product_id", "SERIAL").primary(),
                Column::new("product_name", "TEXT").not_null(),
            ],
        ),
    ])
    .unwrap()
}

fn sales_rows() -> SourceData {
    SourceData::from_rows(vec![
        SourceRow::new()
            .with("customer_name", "Alice")
            .with("product_name", "Widget")
            .with("amount", "42"),
        SourceRow::new()
            .with("customer_name", "Bob")
            .with("product_name", "Gadget")
            .with("amount", "7"),
        SourceRow::new()
            .with("customer_name", "O'Hara")
            .with("product_name", "Widget")
            .with("amount", "3"),
    ])
}

fn inserts_into<'a>(executor: &'a DryRunExecutor, table: &str) -> Vec<&'a str> {
    let prefix = format!("INSERT INTO \"{}\"", table);
    executor
        .statements()
        .into_iter()
        .filter(|s| s.starts_with(&prefix))
        .collect()
}

/// Wraps the dry run and misbehaves on request.
struct ScriptedExecutor {
    inner: DryRunExecutor,
    fail_on: Option<String>,
    /// Table and zero-based statement number that fails.
    fail_on_statement: Option<(String, usize)>,
    statements_seen: usize,
    drop_returned_key: bool,
    cancel_after_commit: Option<CancelFlag>,
}

impl ScriptedExecutor {
    fn new() -> Self {
        ScriptedExecutor {
            inner: DryRunExecutor::new(),
            fail_on: None,
            fail_on_statement: None,
            statements_seen: 0,
            drop_returned_key: false,
            cancel_after_commit: None,
        }
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn begin(&mut self) -> Result<(), DbError> {
        self.inner.begin().await
    }

    async fn execute(&mut self, sql: &str) -> Result<Vec<Vec<Value>>, DbError> {
        self.inner.execute(sql).await
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.inner.commit().await?;
        if let Some(flag) = &self.cancel_after_commit {
            flag.cancel();
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.inner.rollback().await
    }

    async fn execute_planned(
        &mut self,
        statement: &PlannedStatement,
    ) -> Result<Vec<Vec<Value>>, DbError> {
        if self.fail_on.as_deref() == Some(statement.table.as_str()) {
            return Err(DbError::Other("violates check constraint".into()));
        }
        if let Some((table, nth)) = &self.fail_on_statement {
            if *table == statement.table {
                if self.statements_seen == *nth {
                    return Err(DbError::Other("violates unique constraint".into()));
                }
                self.statements_seen += 1;
            }
        }
        let mut keys = self.inner.execute_planned(statement).await?;
        if self.drop_returned_key {
            keys.pop();
        }
        Ok(keys)
    }

    fn preserves_returning_order(&self) -> bool {
        true
    }
}

// ============ Key substitution ============

#[tokio::test]
async fn child_rows_carry_parent_keys_not_source_text() {
    let mut executor = DryRunExecutor::new();

    let report = import(
        &sales_schema(),
        &sales_rows(),
        &mut executor,
        &ImportOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.order, ["customers", "products", "orders"]);
    assert_eq!(report.total_inserted(), 9);

    let orders = inserts_into(&executor, "orders");
    assert_eq!(
        orders,
        [
            "INSERT INTO \"orders\" (\"customer_id\", \"product_id\", \"amount\") \
             VALUES (1, 1, 42), (2, 2, 7), (3, 3, 3) RETURNING \"order_id\""
        ]
    );
    assert!(!orders[0].contains("Alice"));

    let customers = inserts_into(&executor, "customers");
    assert!(customers[0].contains("('O''Hara')"));
}

#[tokio::test]
async fn missing_required_value_skips_exactly_that_row() {
    let mut rows = sales_rows().rows().to_vec();
    rows.push(
        SourceRow::new()
            .with("customer_name", "Dana")
            .with("product_name", "Widget"),
    );
    let source = SourceData::from_rows(rows);
    let mut executor = DryRunExecutor::new();

    let report = import(&sales_schema(), &source, &mut executor, &ImportOptions::default())
        .await
        .unwrap();

    let orders = report.table("orders").unwrap();
    assert_eq!(orders.inserted, 3);
    assert_eq!(orders.skipped, 1);
    assert_eq!(report.table("customers").unwrap().inserted, 4);
    assert_eq!(orders.status, TableStatus::Committed);
}

#[tokio::test]
async fn skipped_parent_skips_dependent_row() {
    let source = SourceData::from_rows(vec![
        SourceRow::new()
            .with("customer_name", "Alice")
            .with("product_name", "Widget")
            .with("amount", "1"),
        SourceRow::new().with("product_name", "Gadget").with("amount", "2"),
    ]);
    let mut executor = DryRunExecutor::new();

    let report = import(&sales_schema(), &source, &mut executor, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(report.table("customers").unwrap().skipped, 1);
    assert_eq!(report.table("orders").unwrap().skipped, 1);
    assert_eq!(report.table("orders").unwrap().inserted, 1);
}

#[tokio::test]
async fn repeated_runs_produce_identical_reports() {
    let run = || async {
        let mut executor = DryRunExecutor::new();
        let report = import(
            &sales_schema(),
            &sales_rows(),
            &mut executor,
            &ImportOptions::default(),
        )
        .await
        .unwrap();
        (report, executor.into_log())
    };

    let (first_report, first_log) = run().await;
    let (second_report, second_log) = run().await;

    assert_eq!(first_report, second_report);
    assert_eq!(first_log, second_log);
}

// ============ Strategies ============

#[tokio::test]
async fn unordered_returning_falls_back_to_single_rows() {
    let mut executor = DryRunExecutor::new().with_unordered_returning();

    let report = import(
        &sales_schema(),
        &sales_rows(),
        &mut executor,
        &ImportOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(inserts_into(&executor, "customers").len(), 3);
    assert_eq!(inserts_into(&executor, "orders").len(), 3);
    assert_eq!(report.total_inserted(), 9);
    assert!(inserts_into(&executor, "orders")[2].contains("VALUES (3, 3, 3)"));
}

#[tokio::test]
async fn batch_size_bounds_statement_rows() {
    let options = ImportOptions {
        batch_size: 2,
        ..ImportOptions::default()
    };
    let mut executor = DryRunExecutor::new();

    import(&sales_schema(), &sales_rows(), &mut executor, &options)
        .await
        .unwrap();

    let orders = inserts_into(&executor, "orders");
    assert_eq!(orders.len(), 2);
    assert!(orders[1].contains("VALUES (3, 3, 3)"));
}

#[tokio::test]
async fn row_at_a_time_matches_batched_keys() {
    let options = ImportOptions {
        strategy: InsertStrategy::RowAtATime,
        ..ImportOptions::default()
    };
    let mut executor = DryRunExecutor::new();

    import(&sales_schema(), &sales_rows(), &mut executor, &options)
        .await
        .unwrap();

    let orders = inserts_into(&executor, "orders");
    assert_eq!(orders.len(), 3);
    assert!(orders[1].contains("VALUES (2, 2, 7)"));
}

// ============ Failures ============

#[tokio::test]
async fn failure_rolls_back_table_and_stops_the_run() {
    let mut executor = ScriptedExecutor::new();
    executor.fail_on = Some("products".into());

    let failure = import(
        &sales_schema(),
        &sales_rows(),
        &mut executor,
        &ImportOptions::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(failure.phase, ImportPhase::Insert);
    assert_eq!(failure.table(), Some("products"));
    assert!(matches!(
        failure.error,
        ImportError::Execution { row_index: 0, .. }
    ));

    let report = &failure.report;
    assert_eq!(report.table("customers").unwrap().status, TableStatus::Committed);
    assert!(matches!(
        report.table("products").unwrap().status,
        TableStatus::Failed(_)
    ));
    assert_eq!(report.table("orders").unwrap().status, TableStatus::NotStarted);

    assert_eq!(
        executor.inner.transactions(),
        ["BEGIN", "COMMIT", "BEGIN", "ROLLBACK"]
    );
    assert!(inserts_into(&executor.inner, "orders").is_empty());
}

async fn failing_row(strategy: InsertStrategy, batch_size: usize) -> usize {
    let mut executor = ScriptedExecutor::new();
    executor.fail_on_statement = Some(("customers".into(), 1));
    let options = ImportOptions {
        strategy,
        batch_size,
        ..ImportOptions::default()
    };

    let failure = import(&sales_schema(), &sales_rows(), &mut executor, &options)
        .await
        .unwrap_err();

    assert_eq!(failure.table(), Some("customers"));
    assert_eq!(executor.inner.transactions(), ["BEGIN", "ROLLBACK"]);
    match failure.error {
        ImportError::Execution { row_index, .. } => row_index,
        other => panic!("expected an execution error, got {other}"),
    }
}

#[tokio::test]
async fn second_single_row_statement_reports_its_own_row() {
    assert_eq!(failing_row(InsertStrategy::RowAtATime, 500).await, 1);
}

#[tokio::test]
async fn failed_batch_reports_its_first_row() {
    assert_eq!(failing_row(InsertStrategy::Batched, 2).await, 2);
}

#[tokio::test]
async fn short_returned_key_list_is_a_consistency_error() {
    let mut executor = ScriptedExecutor::new();
    executor.drop_returned_key = true;

    let failure = import(
        &sales_schema(),
        &sales_rows(),
        &mut executor,
        &ImportOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        failure.error,
        ImportError::Consistency(ConsistencyError::ReturnedKeyCount {
            expected: 3,
            returned: 2,
            ..
        })
    ));
    assert_eq!(failure.table(), Some("customers"));
    assert_eq!(executor.inner.transactions(), ["BEGIN", "ROLLBACK"]);
}

#[tokio::test]
async fn cancellation_stops_before_the_next_table() {
    let options = ImportOptions::default();
    let mut executor = ScriptedExecutor::new();
    executor.cancel_after_commit = Some(options.cancel.clone());

    let failure = import(&sales_schema(), &sales_rows(), &mut executor, &options)
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        ImportError::Cancelled { ref next_table } if next_table == "products"
    ));
    assert_eq!(
        failure.report.table("customers").unwrap().status,
        TableStatus::Committed
    );
    assert_eq!(
        failure.report.table("products").unwrap().status,
        TableStatus::NotStarted
    );
}

#[tokio::test]
async fn cancelled_before_start_touches_nothing() {
    let options = ImportOptions::default();
    options.cancel.cancel();
    let mut executor = DryRunExecutor::new();

    let failure = import(&sales_schema(), &sales_rows(), &mut executor, &options)
        .await
        .unwrap_err();

    assert_eq!(failure.table(), Some("customers"));
    assert!(executor.log().is_empty());
}

#[tokio::test]
async fn unmapped_required_column_fails_before_any_statement() {
    let source = SourceData::from_rows(vec![SourceRow::new().with("customer_name", "Alice")]);
    let mut executor = DryRunExecutor::new();

    let failure = import(&sales_schema(), &source, &mut executor, &ImportOptions::default())
        .await
        .unwrap_err();

    assert_eq!(failure.phase, ImportPhase::Planning);
    assert!(matches!(failure.error, ImportError::Mapping(_)));
    assert!(executor.log().is_empty());
}

// ============ Database-assigned keys ============

fn introspected_schema() -> Schema {
    Schema::new(vec![
        Table::new(
            "accounts",
            vec![
                Column::new("id", "integer").primary().identity(),
                Column::new("name", "text").not_null(),
            ],
        ),
        Table::new(
            "sessions",
            vec![
                Column::new("id", "uuid")
                    .primary()
                    .with_default("gen_random_uuid()"),
                Column::new("account_id", "integer").not_null(),
            ],
        )
        .with_foreign_key(ForeignKey::new("account_id", "accounts", "id")),
    ])
    .unwrap()
}

#[tokio::test]
async fn identity_key_is_returned_not_mapped() {
    let source = SourceData::from_rows(vec![
        SourceRow::new().with("name", "Alice"),
        SourceRow::new().with("name", "Bob"),
    ]);
    let mut executor = DryRunExecutor::new();

    let report = import(
        &introspected_schema(),
        &source,
        &mut executor,
        &ImportOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.table("accounts").unwrap().inserted, 2);
    assert_eq!(
        inserts_into(&executor, "accounts"),
        ["INSERT INTO \"accounts\" (\"name\") VALUES ('Alice'), ('Bob') RETURNING \"id\""]
    );
}

#[tokio::test]
async fn defaulted_uuid_key_is_captured_instead_of_skipping_rows() {
    let source = SourceData::from_rows(vec![SourceRow::new().with("name", "Alice")]);
    let mut executor = DryRunExecutor::new();

    let report = import(
        &introspected_schema(),
        &source,
        &mut executor,
        &ImportOptions::default(),
    )
    .await
    .unwrap();

    let sessions = report.table("sessions").unwrap();
    assert_eq!(sessions.inserted, 1);
    assert_eq!(sessions.skipped, 0);
    assert_eq!(
        inserts_into(&executor, "sessions"),
        ["INSERT INTO \"sessions\" (\"account_id\") VALUES (1) RETURNING \"id\""]
    );
}
