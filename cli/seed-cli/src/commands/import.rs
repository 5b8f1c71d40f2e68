use anyhow::Result;
use seed_capabilities::db::{PgExecutor, connect};
use seed_capabilities::{database_url, import};
use tracing::warn;

use super::{ImportArgs, print_report};

pub async fn run(args: ImportArgs) -> Result<()> {
    let mut loaded = args.source.load()?;
    if args.truncate {
        loaded.options.truncate = true;
    }
    let url = database_url(args.connect.as_deref())?;

    println!("Connecting to database...");
    let pool = connect(&url, loaded.config.import.max_connections).await?;

    let cancel = loaded.options.cancel.clone();
    let on_interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current table");
            cancel.cancel();
        }
    });

    println!("Importing...");
    let mut executor =
        PgExecutor::new(pool.clone()).with_statement_timeout(loaded.config.statement_timeout());
    let result = import(&loaded.schema, &loaded.source, &mut executor, &loaded.options).await;

    on_interrupt.abort();
    drop(executor);
    pool.close().await;

    match result {
        Ok(report) => {
            print_report(&report);
            println!("Import complete");
            Ok(())
        }
        Err(failure) => {
            print_report(&failure.report);
            Err(failure.into())
        }
    }
}
