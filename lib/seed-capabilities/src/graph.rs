use std::collections::HashMap;

use crate::error::OrderError;
use crate::schema::Schema;

/// "Table X must be inserted after table Y" edges derived from foreign keys.
///
/// Nodes and each node's dependencies keep insertion order so that ordering
/// the graph is reproducible.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    dependencies: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every table of `schema`.
    ///
    /// A table whose foreign key points at itself is rejected here so that it
    /// is reported as a self-reference rather than as a cycle.
    pub fn from_schema(schema: &Schema) -> Result<Self, OrderError> {
        let mut graph = DependencyGraph::new();

        for table in schema.tables() {
            graph.add_table(&table.name);
        }

        for table in schema.tables() {
            for fk in &table.foreign_keys {
                if fk.referenced_table == table.name {
                    return Err(OrderError::SelfReference {
                        table: table.name.clone(),
                    });
                }
                graph.add_dependency(&table.name, &fk.referenced_table);
            }
        }

        Ok(graph)
    }

    pub fn add_table(&mut self, table: &str) {
        if !self.dependencies.contains_key(table) {
            self.nodes.push(table.to_string());
            self.dependencies.insert(table.to_string(), Vec::new());
        }
    }

    /// Record that `table` depends on `depends_on`. Both become nodes.
    pub fn add_dependency(&mut self, table: &str, depends_on: &str) {
        self.add_table(table);
        self.add_table(depends_on);

        if let Some(deps) = self.dependencies.get_mut(table) {
            if !deps.iter().any(|d| d == depends_on) {
                deps.push(depends_on.to_string());
            }
        }
    }

    /// Tables in the order they were first seen.
    pub fn tables(&self) -> &[String] {
        &self.nodes
    }

    pub fn dependencies_of(&self, table: &str) -> &[String] {
        self.dependencies
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tables that depend on `table`, in node order.
    pub fn dependents_of(&self, table: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| self.dependencies_of(n).iter().any(|d| d == table))
            .map(String::as_str)
            .collect()
    }

    pub fn has_self_loop(&self, table: &str) -> bool {
        self.dependencies_of(table).iter().any(|d| d == table)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
