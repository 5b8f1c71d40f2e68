use anyhow::Result;
use seed_capabilities::db::connect;
use seed_capabilities::{Schema, database_url};

pub async fn run(url: Option<&str>, output_path: &str) -> Result<()> {
    let url = database_url(url)?;

    println!("Connecting to database...");
    let pool = connect(&url, 1).await?;

    println!("Reading database schema...");
    let schema = Schema::from_db(&pool).await;
    pool.close().await;
    let schema = schema?;

    println!("Writing schema to {}...", output_path);
    schema.write_toml(output_path)?;

    println!("Schema file written with {} tables", schema.tables().len());
    Ok(())
}
