use seed_capabilities::{create_directory, create_file, scaffold_files};
use std::path::Path;

pub fn run(path: Option<&str>) -> anyhow::Result<()> {
    let base_path = path.unwrap_or(".");
    let base = Path::new(base_path);

    create_directory(&base.join("schema"))?;
    println!("Created schema/");

    for (relative, content) in scaffold_files() {
        let file = base.join(relative);
        if file.exists() {
            println!("{} already exists, skipping", relative);
            continue;
        }
        create_file(&file, Some(content))?;
        println!("Created {}", relative);
    }

    println!("\nSeed project initialized successfully!");
    println!("Next steps:");
    println!("  1. Update .env with your database connection string");
    println!("  2. Run `seed introspect` or edit schema/schema.toml");
    println!("  3. Run `seed plan --data <file.csv>` to review the statements");

    Ok(())
}
