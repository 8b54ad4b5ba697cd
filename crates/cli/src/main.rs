//! Tienda CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! tienda migrate
//!
//! # Load products from a YAML file, replacing the current catalog
//! tienda seed products catalog.yaml --clear
//!
//! # Create an administrator (password from TIENDA_ADMIN_PASSWORD)
//! tienda user create-admin -n "Ana Gómez" -e ana@example.com
//!
//! # Give an existing account the administrator role
//! tienda user promote -e luis@example.com
//! ```
//!
//! Every command reads `DATABASE_URL` from the environment or `.env`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tienda")]
#[command(author, version, about = "Tienda CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert products from a YAML file
    Products {
        /// Path to the YAML file
        file: String,

        /// Delete the current catalog first
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an administrator account
    CreateAdmin {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password; must satisfy the password policy
        #[arg(long, env = "TIENDA_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Give an existing account the administrator role
    Promote {
        /// Email address of the account
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, clear } => {
                commands::seed::products(&file, clear).await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::CreateAdmin {
                name,
                email,
                password,
            } => {
                commands::user::create_admin(&name, &email, &password).await?;
            }
            UserAction::Promote { email } => commands::user::promote(&email).await?,
        },
    }
    Ok(())
}
