use anyhow::{Context, Result};
use seed_capabilities::db::DryRunExecutor;
use seed_capabilities::import;

use super::{PlanArgs, print_report};

/// Run the import against a recorder. Keys in the output are placeholders
/// numbered from 1 per table.
pub async fn run(args: PlanArgs) -> Result<()> {
    let loaded = args.source.load()?;
    let mut executor = DryRunExecutor::new();

    let report = import(&loaded.schema, &loaded.source, &mut executor, &loaded.options).await?;

    let script = executor
        .log()
        .iter()
        .map(|s| format!("{};\n", s))
        .collect::<String>();

    match &args.output {
        Some(path) => {
            std::fs::write(path, &script).with_context(|| format!("Failed to write {}", path))?;
            println!("Wrote {} statements to {}", executor.statements().len(), path);
        }
        None => print!("{}", script),
    }

    print_report(&report);
    Ok(())
}
