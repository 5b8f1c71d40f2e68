use anyhow::Result;
use seed_capabilities::{DependencyGraph, order_tables_by_dependency};

use super::load_schema;

pub fn run(schema_path: &str) -> Result<()> {
    let schema = load_schema(schema_path)?;
    let graph = DependencyGraph::from_schema(&schema)?;
    let order = order_tables_by_dependency(&graph)?;

    for (position, table) in order.iter().enumerate() {
        let deps = graph.dependencies_of(table);
        if deps.is_empty() {
            println!("{:>3}. {}", position + 1, table);
        } else {
            println!("{:>3}. {} (after {})", position + 1, table, deps.join(", "));
        }
    }
    Ok(())
}
