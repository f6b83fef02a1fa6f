//! iShop CLI - catalog database and admin tooling.
//!
//! # Usage
//!
//! ```bash
//! # Apply catalog migrations
//! ishop-cli migrate
//!
//! # Import items from a JSON document (existing ids are kept)
//! ishop-cli seed crates/storefront/data/items.json
//!
//! # Print an Argon2 hash for ADMIN_PASSWORD_HASH
//! ishop-cli hash-password
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run catalog migrations
//! - `seed` - Import catalog items
//! - `hash-password` - Hash an admin password

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ishop-cli")]
#[command(author, version, about = "iShop CLI tools")]
struct Cli {
    /// `SQLite` catalog URL (defaults to `CATALOG_DATABASE_URL`)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run catalog database migrations
    Migrate,
    /// Import items from a JSON document into the catalog database
    Seed {
        /// Path to a JSON array of `{"id", "name", "price"}` objects
        file: PathBuf,
    },
    /// Hash an admin password for `ADMIN_PASSWORD_HASH`
    HashPassword {
        /// Password to hash (read from stdin if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => {
            let url = commands::database_url(cli.database_url);
            commands::migrate::run(&url).await?;
        }
        Commands::Seed { file } => {
            let url = commands::database_url(cli.database_url);
            commands::seed::run(&url, &file).await?;
        }
        Commands::HashPassword { password } => commands::admin::hash_password(password)?,
    }
    Ok(())
}
