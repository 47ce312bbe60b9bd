//! Bookly CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bookly-cli migrate
//!
//! # Create the demo accounts
//! bookly-cli seed
//!
//! # Create an account
//! bookly-cli user create -e admin@example.com -n Ada -s Lovelace -p 'long-password' -r admin
//!
//! # Reset a password
//! bookly-cli user set-password -e admin@example.com -p 'new-long-password'
//! ```
//!
//! # Environment Variables
//!
//! - `BOOKLY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "bookly-cli")]
#[command(author, version, about = "Bookly CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Create the demo admin and reader accounts
    Seed,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Debug, Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        name: String,

        /// Last name
        #[arg(short, long, default_value = "")]
        surname: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`user` or `admin`)
        #[arg(short, long, default_value = "user")]
        role: String,
    },
    /// List all users
    List,
    /// Replace a user's password
    SetPassword {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// New password (at least 8 characters)
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

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                surname,
                password,
                role,
            } => {
                commands::user::create(&email, &name, &surname, &password, &role).await?;
            }
            UserAction::List => commands::user::list().await?,
            UserAction::SetPassword { email, password } => {
                commands::user::set_password(&email, &password).await?;
            }
        },
    }
    Ok(())
}
