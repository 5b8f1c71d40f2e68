use crate::column_type::ColumnType;
use crate::error::OrderError;
use crate::graph::DependencyGraph;
use crate::order::order_tables_by_dependency;
use crate::schema::{Column, ForeignKey, Index, Schema, Table};
use crate::value::quote_identifier;

/// `CREATE TABLE` and `CREATE INDEX` statements for `schema`, referenced
/// tables first.
pub fn create_table_statements(schema: &Schema) -> Result<Vec<String>, OrderError> {
    let graph = DependencyGraph::from_schema(schema)?;
    let order = order_tables_by_dependency(&graph)?;

    let mut statements = Vec::new();
    for table in order.iter().filter_map(|name| schema.get_table(name)) {
        statements.push(generate_create_table(table));
        for idx in &table.indexes {
            statements.push(generate_create_index(&table.name, idx));
        }
    }
    Ok(statements)
}

/// Empty every table of an import in one statement, children first.
pub fn truncate_statement(order: &[String]) -> Option<String> {
    if order.is_empty() {
        return None;
    }
    let tables: Vec<String> = order.iter().rev().map(|t| quote_identifier(t)).collect();
    Some(format!(
        "TRUNCATE TABLE {} RESTART IDENTITY CASCADE",
        tables.join(", ")
    ))
}

fn generate_create_table(table: &Table) -> String {
    let mut parts: Vec<String> = table.columns.iter().map(format_column_def).collect();

    if let Some(pk) = table.primary_key() {
        parts.push(format!("PRIMARY KEY ({})", quote_identifier(&pk.name)));
    }
    for fk in &table.foreign_keys {
        parts.push(format_foreign_key(fk));
    }

    format!(
        "CREATE TABLE {} (\n  {}\n)",
        quote_identifier(&table.name),
        parts.join(",\n  ")
    )
}

fn format_column_def(col: &Column) -> String {
    let sequence_default = col
        .default
        .as_deref()
        .is_some_and(|d| d.contains("nextval"));

    let mut def = format!(
        "{} {}",
        quote_identifier(&col.name),
        render_type(col, sequence_default)
    );

    if !col.is_nullable && !col.is_primary {
        def.push_str(" NOT NULL");
    }

    if is_identity(col) {
        def.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        return def;
    }

    if let Some(default) = &col.default {
        // The serial type owns the sequence.
        if !sequence_default {
            def.push_str(&format!(" DEFAULT {}", default));
        }
    }

    def
}

/// Identity columns, including ones written by hand as an identity default.
fn is_identity(col: &Column) -> bool {
    col.is_identity
        || col
            .default
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains("identity"))
}

fn render_type(col: &Column, sequence_default: bool) -> String {
    let Some(ty) = col.column_type() else {
        return col.data_type.clone();
    };

    if sequence_default {
        match ty {
            ColumnType::SmallInt => return "SMALLSERIAL".to_string(),
            ColumnType::Integer => return "SERIAL".to_string(),
            ColumnType::BigInt => return "BIGSERIAL".to_string(),
            _ => {}
        }
    }

    let params = col
        .data_type
        .find('(')
        .zip(col.data_type.find(')'))
        .filter(|(open, close)| open < close)
        .map(|(open, close)| col.data_type[open..=close].replace(' ', ""));

    match params {
        Some(params) => format!("{}{}", ty.sql_name(), params),
        None => ty.sql_name().to_string(),
    }
}

fn format_foreign_key(fk: &ForeignKey) -> String {
    let mut sql = format!(
        "FOREIGN KEY ({}) REFERENCES {}({})",
        quote_identifier(&fk.column),
        quote_identifier(&fk.referenced_table),
        quote_identifier(&fk.referenced_column)
    );
    if let Some(action) = &fk.on_delete {
        sql.push_str(&format!(" ON DELETE {}", action));
    }
    if let Some(action) = &fk.on_update {
        sql.push_str(&format!(" ON UPDATE {}", action));
    }
    sql
}

fn generate_create_index(table: &str, idx: &Index) -> String {
    let unique = if idx.is_unique { "UNIQUE " } else { "" };
    let columns: Vec<String> = idx.columns.iter().map(|c| quote_identifier(c)).collect();

    format!(
        "CREATE {}INDEX {} ON {} USING {} ({})",
        unique,
        quote_identifier(&idx.name),
        quote_identifier(table),
        idx.index_type,
        columns.join(", ")
    )
}
