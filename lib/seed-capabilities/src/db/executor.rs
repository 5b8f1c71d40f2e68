use async_trait::async_trait;

use crate::emitter::PlannedStatement;
use crate::error::DbError;
use crate::value::Value;

/// A connection the importer can run statements against.
///
/// `execute` returns the rows produced by the statement (the `RETURNING`
/// clause for inserts), each row as its column values in order.
#[async_trait]
pub trait Executor: Send {
    async fn begin(&mut self) -> Result<(), DbError>;

    async fn execute(&mut self, sql: &str) -> Result<Vec<Vec<Value>>, DbError>;

    async fn commit(&mut self) -> Result<(), DbError>;

    async fn rollback(&mut self) -> Result<(), DbError>;

    /// Run one planned insert.
    async fn execute_planned(
        &mut self,
        statement: &PlannedStatement,
    ) -> Result<Vec<Vec<Value>>, DbError> {
        self.execute(&statement.sql).await
    }

    /// Whether a multi-row `INSERT ... RETURNING` yields keys in the order
    /// the rows were listed.
    fn preserves_returning_order(&self) -> bool {
        false
    }
}
