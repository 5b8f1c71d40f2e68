use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::schema::{Column, ForeignKey, Index, Schema, Table};

// ============ Type Definitions ============

#[derive(Serialize, Deserialize)]
pub struct TomlSchema {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub table: Vec<TomlTable>,
}

#[derive(Serialize, Deserialize)]
pub struct TomlTable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub column: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_key: Vec<ForeignKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index: Vec<Index>,
}

fn default_version() -> String {
    "1.0".to_string()
}

// ============ TomlSchema Methods ============

impl TomlSchema {
    /// Read a TomlSchema from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let toml_str =
            fs::read_to_string(path).with_context(|| format!("Failed to read schema {}", path))?;
        Self::parse(&toml_str).with_context(|| format!("Failed to parse schema {}", path))
    }

    pub fn parse(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Write this TomlSchema to a file
    pub fn write_file(&self, path: &str) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string).with_context(|| format!("Failed to write {}", path))?;
        Ok(())
    }

    /// Tables keep the order they were written in.
    pub fn from_schema(schema: &Schema) -> Self {
        let table = schema
            .tables()
            .iter()
            .map(|t| TomlTable {
                name: t.name.clone(),
                description: t.description.clone(),
                column: t.columns.clone(),
                foreign_key: t.foreign_keys.clone(),
                index: t.indexes.clone(),
            })
            .collect();

        TomlSchema {
            version: schema.version().to_string(),
            description: schema.description().map(str::to_string),
            table,
        }
    }

    pub fn into_schema(self) -> Result<Schema> {
        let tables = self
            .table
            .into_iter()
            .map(|t| Table {
                name: t.name,
                columns: t.column,
                foreign_keys: t.foreign_key,
                indexes: t.index,
                description: t.description,
            })
            .collect();

        Ok(Schema::with_metadata(tables, self.version, self.description)?)
    }
}
