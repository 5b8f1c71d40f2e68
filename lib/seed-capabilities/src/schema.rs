use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::collections::{HashMap, HashSet};

use crate::column_type::ColumnType;
use crate::error::SchemaError;
use crate::toml_schema::TomlSchema;

// ============ Type Definitions ============

/// A validated, read-only description of the destination tables.
#[derive(Debug, Clone)]
pub struct Schema {
    tables: Vec<Table>,
    version: String,
    description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(alias = "type")]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// `GENERATED ... AS IDENTITY`; such columns report no default.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_identity: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default = "default_index_type")]
    pub index_type: String,
}

fn default_nullable() -> bool {
    true
}

fn default_index_type() -> String {
    "btree".to_string()
}

// ============ Column / Table Helpers ============

impl Column {
    pub fn new(name: &str, data_type: &str) -> Self {
        Column {
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_nullable: true,
            is_primary: false,
            default: None,
            is_identity: false,
            description: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self.is_nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self.is_nullable = false;
        self
    }

    /// Parsed type. Always `Some` for columns of a validated `Schema`.
    pub fn column_type(&self) -> Option<ColumnType> {
        ColumnType::parse(&self.data_type)
    }

    /// True when the database assigns this column's value: serial types,
    /// identity columns and sequence defaults. A primary key with any default
    /// (`gen_random_uuid()`, a custom function) counts as well.
    pub fn is_generated(&self) -> bool {
        if self.is_identity || self.column_type().is_some_and(ColumnType::is_serial) {
            return true;
        }
        if self.is_primary && self.default.is_some() {
            return true;
        }
        self.default.as_deref().is_some_and(|d| {
            let d = d.to_lowercase();
            d.contains("nextval(") || d.contains("identity")
        })
    }
}

impl ForeignKey {
    pub fn new(column: &str, referenced_table: &str, referenced_column: &str) -> Self {
        ForeignKey {
            column: column.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
            on_delete: None,
            on_update: None,
        }
    }
}

impl Table {
    pub fn new(name: &str, columns: Vec<Column>) -> Self {
        Table {
            name: name.to_string(),
            columns,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            description: None,
        }
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary)
    }

    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }
}

// ============ Schema Methods ============

impl Schema {
    /// Validate `tables` and freeze them into a schema.
    pub fn new(tables: Vec<Table>) -> Result<Self, SchemaError> {
        Self::with_metadata(tables, "1.0".to_string(), None)
    }

    pub fn with_metadata(
        tables: Vec<Table>,
        version: String,
        description: Option<String>,
    ) -> Result<Self, SchemaError> {
        validate_tables(&tables)?;
        Ok(Schema {
            tables,
            version,
            description,
        })
    }

    /// Tables in declaration order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.get_table(name).is_some()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Read schema from a database
    pub async fn from_db(pool: &PgPool) -> Result<Self> {
        let mut tables: Vec<Table> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        // Step 1: Get all columns
        let column_rows = sqlx::query(
            r#"
            SELECT
                c.table_name,
                c.column_name,
                c.data_type,
                c.is_nullable,
                c.column_default,
                c.is_identity
            FROM information_schema.columns AS c
            JOIN information_schema.tables AS t
                ON t.table_name = c.table_name
                AND t.table_schema = c.table_schema
            WHERE c.table_schema = 'public'
                AND t.table_type = 'BASE TABLE'
            ORDER BY c.table_name, c.ordinal_position
            "#,
        )
        .fetch_all(pool)
        .await?;

        for row in column_rows {
            let table_name: String = row.get("table_name");

            let position = *positions.entry(table_name.clone()).or_insert_with(|| {
                tables.push(Table::new(&table_name, Vec::new()));
                tables.len() - 1
            });

            tables[position].columns.push(Column {
                name: row.get("column_name"),
                data_type: row.get("data_type"),
                is_nullable: row.get::<String, _>("is_nullable") == "YES",
                is_primary: false,
                default: row.get("column_default"),
                is_identity: row.get::<String, _>("is_identity") == "YES",
                description: None,
            });
        }

        // Step 2: Mark primary keys
        let pk_rows = sqlx::query(
            r#"
            SELECT
                tc.table_name,
                kcu.column_name
            FROM information_schema.table_constraints AS tc
            JOIN information_schema.key_column_usage AS kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.constraint_type = 'PRIMARY KEY'
                AND tc.table_schema = 'public'
            "#,
        )
        .fetch_all(pool)
        .await?;

        for row in pk_rows {
            let table_name: String = row.get("table_name");
            let column_name: String = row.get("column_name");

            if let Some(&position) = positions.get(&table_name) {
                if let Some(col) = tables[position]
                    .columns
                    .iter_mut()
                    .find(|c| c.name == column_name)
                {
                    col.is_primary = true;
                }
            }
        }

        // Step 3: Get foreign keys
        let fk_rows = sqlx::query(
            r#"
            SELECT
                tc.table_name,
                kcu.column_name,
                ccu.table_name AS referenced_table,
                ccu.column_name AS referenced_column,
                rc.delete_rule,
                rc.update_rule
            FROM information_schema.table_constraints AS tc
            JOIN information_schema.key_column_usage AS kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage AS ccu
                ON ccu.constraint_name = tc.constraint_name
                AND ccu.table_schema = tc.table_schema
            JOIN information_schema.referential_constraints AS rc
                ON rc.constraint_name = tc.constraint_name
                AND rc.constraint_schema = tc.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
                AND tc.table_schema = 'public'
            ORDER BY tc.table_name, kcu.column_name
            "#,
        )
        .fetch_all(pool)
        .await?;

        for row in fk_rows {
            let table_name: String = row.get("table_name");

            if let Some(&position) = positions.get(&table_name) {
                tables[position].foreign_keys.push(ForeignKey {
                    column: row.get("column_name"),
                    referenced_table: row.get("referenced_table"),
                    referenced_column: row.get("referenced_column"),
                    on_delete: non_default_rule(row.get("delete_rule")),
                    on_update: non_default_rule(row.get("update_rule")),
                });
            }
        }

        // Step 4: Get indexes
        let index_rows = sqlx::query(
            r#"
            SELECT
                t.relname AS table_name,
                i.relname AS index_name,
                a.attname AS column_name,
                ix.indisunique AS is_unique,
                ix.indisprimary AS is_primary,
                am.amname AS index_type
            FROM pg_class t
            JOIN pg_index ix ON t.oid = ix.indrelid
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_am am ON i.relam = am.oid
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
            JOIN pg_namespace n ON n.oid = t.relnamespace
            WHERE n.nspname = 'public'
                AND t.relkind = 'r'
            ORDER BY t.relname, i.relname, a.attnum
            "#,
        )
        .fetch_all(pool)
        .await?;

        // Group index columns by index name, keeping first-seen order
        let mut index_order: Vec<(String, String)> = Vec::new();
        let mut index_map: HashMap<(String, String), (Vec<String>, bool, String)> = HashMap::new();

        for row in index_rows {
            // Primary keys are carried by Column::is_primary
            if row.get::<bool, _>("is_primary") {
                continue;
            }

            let key = (
                row.get::<String, _>("table_name"),
                row.get::<String, _>("index_name"),
            );
            let column_name: String = row.get("column_name");
            let is_unique: bool = row.get("is_unique");
            let index_type: String = row.get("index_type");

            let entry = index_map.entry(key.clone()).or_insert_with(|| {
                index_order.push(key);
                (Vec::new(), is_unique, index_type)
            });

            entry.0.push(column_name);
        }

        for key in index_order {
            if let Some((columns, is_unique, index_type)) = index_map.remove(&key) {
                if let Some(&position) = positions.get(&key.0) {
                    tables[position].indexes.push(Index {
                        name: key.1,
                        columns,
                        is_unique,
                        index_type,
                    });
                }
            }
        }

        Ok(Schema::new(tables)?)
    }

    /// Read schema from a TOML file
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let toml_schema = TomlSchema::from_file(path)?;
        toml_schema.into_schema()
    }

    /// Write this schema to a TOML file
    pub fn write_toml(&self, path: &str) -> Result<()> {
        TomlSchema::from_schema(self).write_file(path)
    }
}

fn non_default_rule(rule: String) -> Option<String> {
    if rule == "NO ACTION" { None } else { Some(rule) }
}

// ============ Validation ============

fn validate_tables(tables: &[Table]) -> Result<(), SchemaError> {
    let mut names = HashSet::new();
    for table in tables {
        if !names.insert(table.name.as_str()) {
            return Err(SchemaError::DuplicateTable(table.name.clone()));
        }
    }

    for table in tables {
        let mut columns = HashSet::new();
        for col in &table.columns {
            if !columns.insert(col.name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    table: table.name.clone(),
                    column: col.name.clone(),
                });
            }
            if col.column_type().is_none() {
                return Err(SchemaError::UnknownType {
                    table: table.name.clone(),
                    column: col.name.clone(),
                    data_type: col.data_type.clone(),
                });
            }
        }

        if table.columns.iter().filter(|c| c.is_primary).count() > 1 {
            return Err(SchemaError::CompositePrimaryKey(table.name.clone()));
        }

        for fk in &table.foreign_keys {
            if !columns.contains(fk.column.as_str()) {
                return Err(SchemaError::UnknownForeignKeyColumn {
                    table: table.name.clone(),
                    column: fk.column.clone(),
                });
            }

            let referenced = tables
                .iter()
                .find(|t| t.name == fk.referenced_table)
                .ok_or_else(|| SchemaError::UnknownReferencedTable {
                    table: table.name.clone(),
                    column: fk.column.clone(),
                    referenced_table: fk.referenced_table.clone(),
                })?;

            if referenced.column(&fk.referenced_column).is_none() {
                return Err(SchemaError::UnknownReferencedColumn {
                    table: table.name.clone(),
                    column: fk.column.clone(),
                    referenced_table: fk.referenced_table.clone(),
                    referenced_column: fk.referenced_column.clone(),
                });
            }
        }
    }

    Ok(())
}
