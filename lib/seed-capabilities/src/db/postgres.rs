use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column as _, PgPool, Postgres, Row, Transaction, TypeInfo};
use std::time::Duration;

use super::Executor;
use crate::error::DbError;
use crate::value::Value;

pub type DbPool = PgPool;

/// Create a database connection pool from a connection string
pub async fn connect(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// SQLSTATE `query_canceled`, raised when `statement_timeout` fires.
const QUERY_CANCELED: &str = "57014";

/// Runs statements against PostgreSQL, one open transaction at a time.
///
/// The statement timeout is set with `SET LOCAL` on each transaction, so the
/// server cancels a slow statement and the transaction can still roll back.
pub struct PgExecutor {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    statement_timeout: Option<Duration>,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        PgExecutor {
            pool,
            tx: None,
            statement_timeout: None,
        }
    }

    pub fn with_statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn begin(&mut self) -> Result<(), DbError> {
        if self.tx.is_some() {
            return Err(DbError::Other("transaction already open".into()));
        }
        self.tx = Some(self.open_transaction().await?);
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<Vec<Vec<Value>>, DbError> {
        let limit = self.statement_timeout;
        let query = sqlx::query(sql).persistent(false);

        let rows = match self.tx.as_mut() {
            Some(tx) => query
                .fetch_all(&mut **tx)
                .await
                .map_err(|e| classify(limit, e))?,
            None => {
                // Outside a transaction the statement still gets its own, so
                // the timeout applies.
                let mut tx = self.open_transaction().await?;
                let rows = query
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| classify(limit, e))?;
                tx.commit().await?;
                rows
            }
        };

        rows.iter().map(decode_row).collect()
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        let tx = self.tx.take().ok_or(DbError::NoTransaction)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        let tx = self.tx.take().ok_or(DbError::NoTransaction)?;
        tx.rollback().await?;
        Ok(())
    }

    fn preserves_returning_order(&self) -> bool {
        // A single-statement multi-row VALUES insert returns rows in list order.
        true
    }
}

impl PgExecutor {
    async fn open_transaction(&self) -> Result<Transaction<'static, Postgres>, DbError> {
        let mut tx = self.pool.begin().await?;
        if let Some(limit) = self.statement_timeout {
            sqlx::query(&statement_timeout_sql(limit))
                .execute(&mut *tx)
                .await?;
        }
        Ok(tx)
    }
}

/// Scoped to the current transaction; Postgres reads a bare number as
/// milliseconds.
fn statement_timeout_sql(limit: Duration) -> String {
    format!("SET LOCAL statement_timeout = {}", limit.as_millis().max(1))
}

fn classify(limit: Option<Duration>, e: sqlx::Error) -> DbError {
    let cancelled = e
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == QUERY_CANCELED);
    match limit {
        Some(limit) if cancelled => DbError::Timeout(limit.as_secs()),
        _ => DbError::from(e),
    }
}

fn decode_row(row: &PgRow) -> Result<Vec<Value>, DbError> {
    (0..row.len()).map(|idx| decode_column(row, idx)).collect()
}

fn decode_column(row: &PgRow, idx: usize) -> Result<Value, DbError> {
    let type_name = row.columns()[idx].type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)?
            .map(|v| Value::Int(v.into())),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)?
            .map(|v| Value::Int(v.into())),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Value::Int),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)?
            .map(|v| Value::Float(v.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(Value::Float),
        "NUMERIC" => row
            .try_get::<Option<sqlx::types::Decimal>, _>(idx)?
            .map(|v| Value::Text(v.to_string())),
        "UUID" => row
            .try_get::<Option<sqlx::types::Uuid>, _>(idx)?
            .map(|v| Value::Text(v.to_string())),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(idx)?.map(Value::Text)
        }
        other => return Err(DbError::UnsupportedType(other.to_string())),
    };

    Ok(value.unwrap_or(Value::Null))
}
