//! # Intake CLI (`intake`)
//!
//! Command-line interface for the document intake pipeline.
//!
//! ## Usage
//!
//! ```bash
//! intake --config ./config/intake.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `intake init` | Create the SQLite database and run schema migrations |
//! | `intake process <file>` | Run the pipeline on one document |
//! | `intake batch <folder>` | Walk a folder (archives included) and process everything |
//! | `intake serve` | Start the JSON HTTP API |
//!
//! Every command that writes records takes `--actor <id>` for the audit
//! columns; there is no implicit system user.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use doc_intake::{config, db, migrate, model, pipeline, server, walker};

/// Document intake CLI — AI-assisted extraction and customer matching for
/// a CRM contact store.
#[derive(Parser)]
#[command(
    name = "intake",
    about = "Document intake — AI-assisted extraction, customer matching, and resolution",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/intake.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Process a single document and print the resolution as JSON.
    Process {
        /// Path to the document.
        file: PathBuf,
        /// Actor id recorded on every write.
        #[arg(long)]
        actor: String,
    },

    /// Walk a folder recursively (zip archives included) and process every
    /// supported file.
    Batch {
        /// Root folder to walk.
        folder: PathBuf,
        /// Actor id recorded on every write.
        #[arg(long)]
        actor: String,
    },

    /// Start the JSON HTTP API.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&config).await?;
            println!("initialized {}", config.db.path.display());
        }
        Commands::Process { file, actor } => {
            let pool = db::connect(&config).await?;
            let client = model::create_client(&config.model)?;
            let pipeline = pipeline::Pipeline::new(pool, client);
            let doc = pipeline.process_path(&file, &actor).await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Commands::Batch { folder, actor } => {
            let pool = db::connect(&config).await?;
            let client = model::create_client(&config.model)?;
            let pipeline = pipeline::Pipeline::new(pool, client);
            let summary =
                walker::process_folder(&pipeline, &folder, &config.walker, &actor).await?;
            println!("batch {}", folder.display());
            println!("  total: {}", summary.total);
            println!("  succeeded: {}", summary.succeeded);
            println!("  failed: {}", summary.failed);
            for result in summary.results.iter().filter(|r| r.error.is_some()) {
                println!(
                    "  error {}: {}",
                    result.path,
                    result.error.as_deref().unwrap_or("-")
                );
            }
            println!("ok");
        }
        Commands::Serve => {
            let pool = db::connect(&config).await?;
            let client = model::create_client(&config.model)?;
            server::run_server(&config, pool, client).await?;
        }
    }

    Ok(())
}
