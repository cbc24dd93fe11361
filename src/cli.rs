//! Command-line interface definition for Formcraft
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for serving the HTTP API, generating schemas and
//! browsing local and remote history.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Formcraft - form mock-up to Formily schema generator
///
/// Sends an image of a form plus a short description to a multimodal
/// model and turns the answer into a JSON schema.
#[derive(Parser, Debug, Clone)]
#[command(name = "formcraft")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the data directory holding history databases and blobs
    #[arg(long, env = "FORMCRAFT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Formcraft
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Override the bind address from config (e.g. 0.0.0.0:8080)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Generate a schema from an image and an optional description
    Generate {
        /// Path to the form mock-up image
        #[arg(short, long)]
        image: PathBuf,

        /// Description of the form
        #[arg(short, long)]
        prompt: Option<String>,

        /// Also record a successful generation in the remote history store
        #[arg(long)]
        remote: bool,

        /// Write the schema to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage the local generation history
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Browse the remote generation history
    Remote {
        /// Remote history subcommand
        #[command(subcommand)]
        command: RemoteCommand,
    },
}

/// Local history subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List local history, newest first
    List {
        /// Only show entries whose prompt contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Print the schema of a local history entry
    Show {
        /// Entry ID
        id: String,
    },

    /// Delete a local history entry
    Delete {
        /// Entry ID
        id: String,
    },

    /// Remove all local history entries
    Clear,
}

/// Remote history subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum RemoteCommand {
    /// List remote history records
    List {
        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Page size
        #[arg(short, long)]
        limit: Option<usize>,

        /// Only show records whose prompt contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Filter on the success flag
        #[arg(long)]
        success: Option<bool>,
    },

    /// Print a remote history record as JSON
    Show {
        /// Record ID
        id: String,
    },

    /// Delete a remote history record and its image
    Delete {
        /// Record ID
        id: String,
    },

    /// Show record counts
    Stats,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            data_dir: None,
            command: Commands::Serve { bind: None },
        }
    }
}
