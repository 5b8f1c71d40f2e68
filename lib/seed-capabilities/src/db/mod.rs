mod ddl;
mod dry_run;
mod executor;
mod postgres;

pub use ddl::{create_table_statements, truncate_statement};
pub use dry_run::DryRunExecutor;
pub use executor::Executor;
pub use postgres::{DbPool, PgExecutor, connect};
