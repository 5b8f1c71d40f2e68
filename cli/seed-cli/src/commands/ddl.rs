use anyhow::{Context, Result};
use seed_capabilities::db::create_table_statements;

use super::load_schema;

pub fn run(schema_path: &str, output: Option<&str>) -> Result<()> {
    let schema = load_schema(schema_path)?;
    let statements = create_table_statements(&schema)?;
    let sql = statements
        .iter()
        .map(|s| format!("{};\n", s))
        .collect::<Vec<_>>()
        .join("\n");

    match output {
        Some(path) => {
            std::fs::write(path, &sql).with_context(|| format!("Failed to write {}", path))?;
            println!("Wrote {} statements to {}", statements.len(), path);
        }
        None => print!("{}", sql),
    }
    Ok(())
}
