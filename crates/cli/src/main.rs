//! Cosmic Blueprints CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! cb-cli migrate
//!
//! # Load the bundled catalog (or a custom YAML file)
//! cb-cli seed
//! cb-cli seed --file catalog.yaml
//!
//! # Create an administrator (password from CB_ADMIN_PASSWORD)
//! cb-cli admin create -u admin -e admin@example.com
//! ```
//!
//! All commands read `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cb-cli")]
#[command(author, version, about = "Cosmic Blueprints CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load reports, educational content and testimonials
    Seed {
        /// YAML seed file; the bundled catalog when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Manage administrator accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new administrator
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(file.as_deref()).await?,
        Commands::Admin { action } => match action {
            AdminAction::Create { username, email } => {
                commands::admin::create(&username, &email).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_create() {
        let cli = Cli::try_parse_from(["cb-cli", "admin", "create", "-u", "root", "-e", "r@x.io"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Admin {
                action: AdminAction::Create { .. }
            })
        ));
    }
}
