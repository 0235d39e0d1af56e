use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "dashstore")]
#[command(about = "dashstore CLI - Versioned migrations for persisted dashboard storage", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/dashstore/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store file, overriding `store_path` from the config
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every pending migration
    Migrate,
    /// Show the migration marker and pending migrations
    Status,
    /// List every registered migration
    List,
    /// List stored keys
    Keys,
    /// Print a stored value
    Get { key: String },
    /// Write a stored value
    Set { key: String, value: String },
    /// Generate an identifier for a new migration
    NewId {
        /// Lowercase name, e.g. `rename-desk-keys`
        slug: String,
    },
}

fn main() -> Result<()> {
    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    // Needs neither the config nor the store
    if let Commands::NewId { slug } = &cli.command {
        logging::init(logging::DEFAULT_FILTER);
        return commands::new_id::generate(slug);
    }

    let context = commands::Context::load(cli.config, cli.store)?;
    logging::init(&context.config.log_filter);

    match cli.command {
        Commands::Migrate => commands::migrate::run(&context)?,
        Commands::Status => commands::status::status(&context)?,
        Commands::List => commands::status::list(&context)?,
        Commands::Keys => commands::keys::list(&context)?,
        Commands::Get { key } => commands::keys::get(&context, &key)?,
        Commands::Set { key, value } => commands::keys::set(&context, &key, &value)?,
        Commands::NewId { .. } => {}
    }

    Ok(())
}
