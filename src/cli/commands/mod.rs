//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod add;
mod entity;
mod extract;
mod list;
mod tools;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use docintake::config::{Config, Settings};

#[derive(Parser)]
#[command(name = "docintake")]
#[command(about = "Document intake with text extraction, OCR, and LLM hints")]
#[command(version)]
pub struct Cli {
    /// Config file (skips discovery)
    #[arg(short, long, global = true, env = "DOCINTAKE_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory (overrides config file)
    #[arg(long, global = true, env = "DOCINTAKE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file and run extraction on it
    Add {
        /// File to add
        file: PathBuf,
        /// Title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,
        /// Use the suggested title and summary from the model
        #[arg(long)]
        apply_hints: bool,
    },

    /// Run extraction on a file without storing anything
    Extract {
        /// File to extract
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactively re-run extraction on a stored document
    Review {
        /// Document ID
        id: i64,
    },

    /// List stored documents
    List,

    /// Manage known vendors, projects, and appliances
    Entity {
        #[command(subcommand)]
        command: EntityCommands,
    },

    /// Show which extraction tools and model are available
    Tools,
}

#[derive(Subcommand)]
enum EntityCommands {
    /// Register a name
    Add {
        /// vendor, project, appliance, ...
        kind: String,
        name: String,
    },
    /// List registered names
    List {
        /// Only this kind
        kind: Option<String>,
    },
}

/// Load config from `--config` or by discovery.
async fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from_path(&path)
            .await
            .map_err(anyhow::Error::msg),
        None => Ok(Config::load().await),
    }
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config).await?;
    let mut settings: Settings = config.settings();
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }

    match cli.command {
        Commands::Add {
            file,
            title,
            apply_hints,
        } => add::cmd_add(&settings, &config, &file, title, apply_hints).await,
        Commands::Extract { file, json } => {
            extract::cmd_extract(&settings, &config, &file, json).await
        }
        Commands::Review { id } => super::review::cmd_review(&settings, &config, id).await,
        Commands::List => list::cmd_list(&settings),
        Commands::Entity { command } => match command {
            EntityCommands::Add { kind, name } => entity::cmd_entity_add(&settings, &kind, &name),
            EntityCommands::List { kind } => entity::cmd_entity_list(&settings, kind.as_deref()),
        },
        Commands::Tools => tools::cmd_tools(&config).await,
    }
}
