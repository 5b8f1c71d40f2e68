use std::collections::HashSet;

use crate::error::OrderError;
use crate::graph::DependencyGraph;

/// Order tables so that every table comes after the tables it references.
///
/// Depth-first: dependencies are emitted before their dependents. Reaching a
/// table that is still being visited means the foreign keys form a cycle,
/// reported at the table where it was detected.
pub fn order_tables_by_dependency(graph: &DependencyGraph) -> Result<Vec<String>, OrderError> {
    let mut ordered = Vec::with_capacity(graph.len());
    let mut visiting = HashSet::new();
    let mut done = HashSet::new();

    for table in graph.tables() {
        visit(graph, table, &mut visiting, &mut done, &mut ordered)?;
    }

    Ok(ordered)
}

fn visit<'g>(
    graph: &'g DependencyGraph,
    table: &'g str,
    visiting: &mut HashSet<&'g str>,
    done: &mut HashSet<&'g str>,
    ordered: &mut Vec<String>,
) -> Result<(), OrderError> {
    if done.contains(table) {
        return Ok(());
    }
    if visiting.contains(table) {
        return Err(OrderError::Cycle {
            table: table.to_string(),
        });
    }
    if graph.has_self_loop(table) {
        return Err(OrderError::SelfReference {
            table: table.to_string(),
        });
    }

    visiting.insert(table);
    for dep in graph.dependencies_of(table) {
        visit(graph, dep, visiting, done, ordered)?;
    }
    visiting.remove(table);

    done.insert(table);
    ordered.push(table.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(order: &[String], table: &str) -> usize {
        order.iter().position(|t| t == table).unwrap()
    }

    #[test]
    fn independent_tables_keep_declaration_order() {
        let mut graph = DependencyGraph::new();
        for t in ["zebra", "apple", "mango"] {
            graph.add_table(t);
        }

        assert_eq!(
            order_tables_by_dependency(&graph).unwrap(),
            ["zebra", "apple", "mango"]
        );
    }

    #[test]
    fn dependencies_come_first() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("transactions", "orders");
        graph.add_dependency("orders", "customers");
        graph.add_dependency("orders", "products");
        graph.add_table("shipping");

        let order = order_tables_by_dependency(&graph).unwrap();

        assert_eq!(order.len(), 5);
        assert!(position(&order, "customers") < position(&order, "orders"));
        assert!(position(&order, "products") < position(&order, "orders"));
        assert!(position(&order, "orders") < position(&order, "transactions"));
        assert_eq!(order, ["customers", "products", "orders", "transactions", "shipping"]);
    }

    #[test]
    fn diamond_visits_shared_dependency_once() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("d", "b");
        graph.add_dependency("d", "c");
        graph.add_dependency("b", "a");
        graph.add_dependency("c", "a");

        assert_eq!(order_tables_by_dependency(&graph).unwrap(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn mutual_references_are_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b");
        graph.add_dependency("b", "a");

        match order_tables_by_dependency(&graph) {
            Err(OrderError::Cycle { table }) => assert!(table == "a" || table == "b"),
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn longer_cycle_is_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_table("root");
        graph.add_dependency("a", "b");
        graph.add_dependency("b", "c");
        graph.add_dependency("c", "a");

        assert!(matches!(
            order_tables_by_dependency(&graph),
            Err(OrderError::Cycle { .. })
        ));
    }

    #[test]
    fn self_edge_is_not_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("employees", "employees");

        assert_eq!(
            order_tables_by_dependency(&graph).unwrap_err(),
            OrderError::SelfReference {
                table: "employees".into()
            }
        );
    }

    #[test]
    fn same_graph_same_order() {
        let build = || {
            let mut graph = DependencyGraph::new();
            graph.add_dependency("line_items", "orders");
            graph.add_dependency("line_items", "products");
            graph.add_dependency("orders", "customers");
            graph.add_table("regions");
            graph
        };

        let first = order_tables_by_dependency(&build()).unwrap();
        for _ in 0..10 {
            assert_eq!(order_tables_by_dependency(&build()).unwrap(), first);
        }
    }
}
