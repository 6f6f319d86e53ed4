//! Command-line interface definition for Limitlab
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for serving the activity API and administering sessions.

use clap::{Parser, Subcommand};

use crate::activity::SessionType;

/// Limitlab - classroom activity backend
///
/// Serves the limitation/compromise activity API and offers admin
/// commands for inspecting and cleaning up session data.
#[derive(Parser, Debug, Clone)]
#[command(name = "limitlab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the database path
    #[arg(long, env = "LIMITLAB_DB_PATH")]
    pub db_path: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Limitlab
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Socket address to bind, e.g. 0.0.0.0:3001
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Inspect and manage sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Remove keysmash (throwaway single-word) responses from all sessions
    Cleanup {
        /// Report what would be removed without writing
        #[arg(long)]
        dry_run: bool,
    },
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List all sessions
    List,

    /// Show the students and analytics of one session
    Show {
        /// Session identifier
        id: String,
    },

    /// Create an empty session with a fresh identifier
    New {
        /// Session type
        #[arg(short = 't', long = "type", value_enum, default_value = "individual")]
        session_type: SessionType,
    },

    /// Delete one session, or every session when no ID is given
    Delete {
        /// Session identifier
        id: Option<String>,

        /// Required to actually delete
        #[arg(long)]
        confirm: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            db_path: None,
            verbose: false,
            command: Commands::Serve { bind: None },
        }
    }
}
