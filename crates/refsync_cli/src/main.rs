//! refsync CLI
//!
//! Command-line tools for a refsync object store.
//!
//! # Commands
//!
//! - `merge` - Merge a JSON batch of remote item snapshots into a store
//! - `listen` - Subscribe to library change notifications and print them
//! - `inspect` - Display store statistics
//! - `purge-tags` - Delete tags no item carries

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// refsync command-line tools.
#[derive(Parser)]
#[command(name = "refsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a batch of item snapshots into a store
    Merge {
        /// Path to the store file
        #[arg(short, long)]
        store: PathBuf,

        /// Path to the batch JSON file
        #[arg(short, long)]
        batch: PathBuf,

        /// Overwrite items with unsynced local changes
        #[arg(long)]
        prefer_remote: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Listen for library change notifications
    Listen {
        /// Notification stream URL
        #[arg(short, long, default_value = refsync_engine::DEFAULT_STREAM_URL)]
        url: String,

        /// API key used to subscribe
        #[arg(short = 'k', long, env = "REFSYNC_API_KEY", hide_env_values = true)]
        api_key: String,
    },

    /// Display store statistics
    Inspect {
        /// Path to the store file
        #[arg(short, long)]
        store: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete tags that no item carries
    PurgeTags {
        /// Path to the store file
        #[arg(short, long)]
        store: PathBuf,

        /// Only purge tags of this library
        #[arg(short, long)]
        library: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Merge {
            store,
            batch,
            prefer_remote,
            format,
        } => {
            commands::merge::run(&store, &batch, prefer_remote, &format)?;
        }
        Commands::Listen { url, api_key } => {
            commands::listen::run(&url, &api_key)?;
        }
        Commands::Inspect { store, format } => {
            commands::inspect::run(&store, &format)?;
        }
        Commands::PurgeTags { store, library } => {
            commands::purge_tags::run(&store, library.as_deref())?;
        }
    }

    Ok(())
}
