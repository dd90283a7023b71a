//! Knotwork CLI: migrations, operator roles and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Create tables and triggers
//! kw-cli migrate
//!
//! # Let an existing account into the back office
//! kw-cli admin grant -e owner@example.com
//!
//! # Load products and courses
//! kw-cli seed --file catalog.yaml
//! ```
//!
//! Every command reads `DATABASE_URL` (a `.env` file is honoured).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "kw-cli")]
#[command(author, version, about = "Knotwork CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage back office access
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Load products and courses from a YAML file
    Seed {
        /// Catalog file
        #[arg(short, long, default_value = "catalog.yaml")]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an account the admin role
    Grant {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Remove the admin role from an account
    Revoke {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::grant(&email).await?,
            AdminAction::Revoke { email } => commands::admin::revoke(&email).await?,
        },
        Commands::Seed { file } => commands::seed::run(&file).await?,
    }
    Ok(())
}
