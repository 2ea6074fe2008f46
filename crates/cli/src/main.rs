//! VibeHive CLI - Operator commands against the remote forum API.
//!
//! # Usage
//!
//! ```bash
//! # Show forum counters
//! vh-cli stats
//!
//! # Ask the API whether an email belongs to an admin
//! vh-cli admin check ann@example.com
//!
//! # Promote a user (by forum user id) to admin
//! vh-cli admin promote 665f1c2a9b3e
//!
//! # List users with role and plan
//! vh-cli users list
//!
//! # Publish an announcement
//! vh-cli announce -t "Maintenance" -d "Tonight at 22:00" -n "Forum Team" -e team@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `VIBEHIVE_API_URL` - Base URL of the remote forum API (or `--api-url`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "vh-cli")]
#[command(author, version, about = "VibeHive operator tools")]
struct Cli {
    /// Base URL of the remote forum API
    #[arg(long, env = "VIBEHIVE_API_URL", global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10, global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show forum statistics
    Stats,
    /// Manage admins
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Inspect users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Publish an announcement
    Announce {
        /// Announcement title
        #[arg(short, long)]
        title: String,

        /// Announcement body
        #[arg(short, long)]
        description: String,

        /// Author display name
        #[arg(short = 'n', long)]
        author_name: String,

        /// Author email address
        #[arg(short = 'e', long)]
        author_email: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Check whether an email belongs to an admin
    Check {
        /// Email address to check
        email: String,
    },
    /// Promote a user to admin
    Promote {
        /// Forum user id
        user_id: String,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List every user
    List,
}

#[tokio::main]
async fn main() {
    // Load .env before parsing so `env = ...` arguments see it
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    let api = commands::api_client(cli.api_url.as_deref(), cli.timeout)?;

    match cli.command {
        Commands::Stats => commands::forum::stats(&api).await?,
        Commands::Admin { action } => match action {
            AdminAction::Check { email } => commands::admin::check(&api, &email).await?,
            AdminAction::Promote { user_id } => commands::admin::promote(&api, &user_id).await?,
        },
        Commands::Users { action } => match action {
            UsersAction::List => commands::admin::list_users(&api).await?,
        },
        Commands::Announce {
            title,
            description,
            author_name,
            author_email,
        } => {
            commands::forum::announce(&api, &title, &description, &author_name, &author_email)
                .await?;
        }
    }
    Ok(())
}
