use async_trait::async_trait;
use std::collections::HashMap;

use super::Executor;
use crate::emitter::PlannedStatement;
use crate::error::DbError;
use crate::value::Value;

const BEGIN: &str = "BEGIN";
const COMMIT: &str = "COMMIT";
const ROLLBACK: &str = "ROLLBACK";

/// Records statements instead of running them.
///
/// Inserts that ask for keys get sequential integers per table, starting at 1.
#[derive(Debug)]
pub struct DryRunExecutor {
    log: Vec<String>,
    next_key: HashMap<String, i64>,
    in_transaction: bool,
    ordered_returning: bool,
}

impl Default for DryRunExecutor {
    fn default() -> Self {
        DryRunExecutor {
            log: Vec::new(),
            next_key: HashMap::new(),
            in_transaction: false,
            ordered_returning: true,
        }
    }
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `RETURNING` order as unreliable, forcing row-at-a-time inserts.
    pub fn with_unordered_returning(mut self) -> Self {
        self.ordered_returning = false;
        self
    }

    /// Everything run so far, transaction markers included.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Statements other than transaction markers.
    pub fn statements(&self) -> Vec<&str> {
        self.log
            .iter()
            .map(String::as_str)
            .filter(|s| !is_marker(s))
            .collect()
    }

    pub fn transactions(&self) -> Vec<&str> {
        self.log
            .iter()
            .map(String::as_str)
            .filter(|s| is_marker(s))
            .collect()
    }

    pub fn into_log(self) -> Vec<String> {
        self.log
    }
}

fn is_marker(s: &str) -> bool {
    matches!(s, BEGIN | COMMIT | ROLLBACK)
}

#[async_trait]
impl Executor for DryRunExecutor {
    async fn begin(&mut self) -> Result<(), DbError> {
        if self.in_transaction {
            return Err(DbError::Other("transaction already open".into()));
        }
        self.in_transaction = true;
        self.log.push(BEGIN.to_string());
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<Vec<Vec<Value>>, DbError> {
        self.log.push(sql.to_string());
        Ok(Vec::new())
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        if !self.in_transaction {
            return Err(DbError::NoTransaction);
        }
        self.in_transaction = false;
        self.log.push(COMMIT.to_string());
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        if !self.in_transaction {
            return Err(DbError::NoTransaction);
        }
        self.in_transaction = false;
        self.log.push(ROLLBACK.to_string());
        Ok(())
    }

    async fn execute_planned(
        &mut self,
        statement: &PlannedStatement,
    ) -> Result<Vec<Vec<Value>>, DbError> {
        self.log.push(statement.sql.clone());
        if statement.returning.is_none() {
            return Ok(Vec::new());
        }

        let next = self.next_key.entry(statement.table.clone()).or_insert(1);
        let keys = statement
            .row_indices
            .iter()
            .map(|_| {
                let key = *next;
                *next += 1;
                vec![Value::Int(key)]
            })
            .collect();
        Ok(keys)
    }

    fn preserves_returning_order(&self) -> bool {
        self.ordered_returning
    }
}
