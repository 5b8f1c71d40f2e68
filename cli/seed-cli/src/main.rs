mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ImportArgs, PlanArgs};

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Load flat CSV data into related PostgreSQL tables", long_about = None)]
struct Cli {
    /// Log debug output, including every statement
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold schema/schema.toml, seed.toml and .env
    Init {
        #[arg(short, long)]
        path: Option<String>,
    },
    /// Write the schema of a live database to a TOML file
    Introspect {
        #[arg(short, long)]
        connect: Option<String>,
        #[arg(short, long, default_value = "./schema/schema.toml")]
        output: String,
    },
    /// Print the table insertion order
    Order {
        #[arg(short, long, default_value = "./schema/schema.toml")]
        schema: String,
    },
    /// Print CREATE TABLE statements in insertion order
    Ddl {
        #[arg(short, long, default_value = "./schema/schema.toml")]
        schema: String,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show the statements an import would run, without a database
    Plan(PlanArgs),
    /// Import a CSV file into the database
    Import(ImportArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init { path } => commands::init::run(path.as_deref()),
        Commands::Introspect { connect, output } => {
            commands::introspect::run(connect.as_deref(), &output).await
        }
        Commands::Order { schema } => commands::order::run(&schema),
        Commands::Ddl { schema, output } => commands::ddl::run(&schema, output.as_deref()),
        Commands::Plan(args) => commands::plan::run(args).await,
        Commands::Import(args) => commands::import::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "seed=debug,seed_capabilities=debug"
    } else {
        "seed=info,seed_capabilities=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
