//! CLI interface for Academia

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "academia")]
#[command(version)]
#[command(about = "Academia de Líderes administration server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new academia.toml configuration file
    Init,

    /// Start the HTTP API server and web UI
    Serve {
        /// Host to bind to (defaults to server.host from the config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to server.port from the config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply the database schema (postgres backend only)
    Migrate,

    /// Create an administrator with the initial password
    CreateAdmin {
        #[arg(short, long)]
        matricula: i64,

        #[arg(short, long)]
        nome: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        telefone: String,
    },

    /// Manage users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },

    /// Print the bcrypt digest of a password
    HashPassword {
        /// Password to hash; prompted for when omitted
        plaintext: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// List users
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Mark a user inactive
    Deactivate {
        matricula: i64,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}
