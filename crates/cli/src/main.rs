//! Handicrafts marketplace CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! hc-cli migrate
//!
//! # Insert a demo vendor with two products
//! hc-cli seed
//!
//! # Give an existing account the admin flag
//! hc-cli admin grant --email admin@example.com
//! ```
//!
//! Every command reads `DATABASE_URL` (default `sqlite://handicrafts.db?mode=rwc`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "hc-cli")]
#[command(author, version, about = "Handicrafts marketplace CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Insert a demo vendor and products
    Seed {
        /// Email of the demo vendor's owner account
        #[arg(short, long, default_value = commands::seed::DEMO_EMAIL)]
        email: String,

        /// Password for the demo account if it has to be created
        #[arg(short, long, default_value = commands::seed::DEMO_PASSWORD)]
        password: String,
    },
    /// Manage administrators
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin flag to an existing account
    Grant {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Remove the admin flag from an account
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

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let pool = commands::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::Seed { email, password } => {
            commands::seed::demo(&pool, &email, &password).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::set_admin(&pool, &email, true).await?,
            AdminAction::Revoke { email } => {
                commands::admin::set_admin(&pool, &email, false).await?;
            }
        },
    }
    Ok(())
}
