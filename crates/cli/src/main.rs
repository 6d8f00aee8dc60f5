//! Agente Cidadão CLI - Database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Run portal and session store migrations
//! portal-cli migrate
//!
//! # Create a user
//! portal-cli user create -e admin@example.gov.br -n "Admin Name" -p "s3nh4-f0rte" -r Administrador
//!
//! # Reset a forgotten password
//! portal-cli user reset-password -e admin@example.gov.br -p "n0va-s3nh4"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create a portal account
//! - `user reset-password` - Set a new password for an account

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "portal-cli")]
#[command(author, version, about = "Agente Cidadão portal CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage portal accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Email address (normalized to lower case)
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Initial password (at least 6 characters)
        #[arg(short, long)]
        password: String,

        /// Role tag (defaults to the non-privileged role)
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Set a new password without the current one
    ResetPassword {
        /// Email address of the account
        #[arg(short, long)]
        email: String,

        /// New password (at least 6 characters)
        #[arg(short, long)]
        password: String,
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

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                password,
                role,
            } => {
                commands::user::create(&email, &name, &password, role).await?;
            }
            UserAction::ResetPassword { email, password } => {
                commands::user::reset_password(&email, &password).await?;
            }
        },
    }
    Ok(())
}
