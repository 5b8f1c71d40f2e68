pub mod ddl;
pub mod import;
pub mod init;
pub mod introspect;
pub mod order;
pub mod plan;

use anyhow::{Context, Result};
use clap::Args;
use seed_capabilities::{
    CONFIG_FILE, ImportOptions, ImportReport, InsertStrategy, Schema, SeedConfig, SourceData,
    TableStatus,
};
use std::path::Path;

/// Options shared by `plan` and `import`.
#[derive(Args)]
pub struct SourceArgs {
    /// CSV file with one record per source row
    #[arg(short, long)]
    pub data: String,
    #[arg(short, long, default_value = "./schema/schema.toml")]
    pub schema: String,
    #[arg(long, default_value = CONFIG_FILE)]
    pub config: String,
    /// `batched` or `row-at-a-time`
    #[arg(long)]
    pub strategy: Option<InsertStrategy>,
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Insert identical rows of this table only once (repeatable)
    #[arg(long = "dedup")]
    pub deduplicate: Vec<String>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Write the statements here instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[arg(short, long)]
    pub connect: Option<String>,
    /// Empty every table before inserting
    #[arg(long)]
    pub truncate: bool,
}

pub fn load_schema(path: &str) -> Result<Schema> {
    Schema::from_toml_file(path).with_context(|| format!("Failed to load schema from {}", path))
}

/// Everything `plan` and `import` read from disk.
pub struct Loaded {
    pub schema: Schema,
    pub source: SourceData,
    pub config: SeedConfig,
    pub options: ImportOptions,
}

impl SourceArgs {
    pub fn load(&self) -> Result<Loaded> {
        let schema = load_schema(&self.schema)?;
        let source = SourceData::from_csv_path(Path::new(&self.data))?;
        let config = SeedConfig::load(Path::new(&self.config))?;

        let mut options = config.import_options();
        if let Some(strategy) = self.strategy {
            options.strategy = strategy;
        }
        if let Some(batch_size) = self.batch_size {
            if batch_size == 0 {
                anyhow::bail!("--batch-size must be at least 1");
            }
            options.batch_size = batch_size;
        }
        options.deduplicate.extend(self.deduplicate.iter().cloned());

        println!(
            "Loaded {} tables and {} rows from {}",
            schema.tables().len(),
            source.len(),
            self.data
        );

        Ok(Loaded {
            schema,
            source,
            config,
            options,
        })
    }
}

pub fn print_report(report: &ImportReport) {
    println!(
        "\n  {:<24} {:>9} {:>9} {:>9}  status",
        "table", "inserted", "skipped", "dedup"
    );
    for table in &report.tables {
        let status = match &table.status {
            TableStatus::Committed => "committed".to_string(),
            TableStatus::Failed(reason) => format!("failed: {}", reason),
            TableStatus::NotStarted => "not started".to_string(),
        };
        println!(
            "  {:<24} {:>9} {:>9} {:>9}  {}",
            table.table, table.inserted, table.skipped, table.deduplicated, status
        );
    }
    println!(
        "\n{} rows inserted, {} skipped",
        report.total_inserted(),
        report.total_skipped()
    );
}
