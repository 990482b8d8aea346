//! Taskdeck server - multi-tenant task tracking backend
//!
//! Humans authenticate with session cookies, bots with bearer tokens;
//! everything else hangs off one relational store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use taskdeck_api::{ApiServer, ApiServerConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Taskdeck - team task tracking for humans and bots
#[derive(Parser, Debug)]
#[command(name = "taskdeck")]
#[command(about = "Taskdeck - team task tracking for humans and bots")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the API server
    #[command(long_about = r#"
Run the HTTP API server against a relational store. Migrations are applied
on boot.

EXAMPLES:
  # Local development against SQLite
  taskdeck serve --database-url sqlite://taskdeck.db?mode=rwc

  # Production against Postgres, registration closed
  taskdeck serve --database-url postgres://taskdeck@db/taskdeck \
    --bind 0.0.0.0:8080 --no-signup

ENVIRONMENT VARIABLES:
  TASKDECK_DATABASE_URL  Database URL
  TASKDECK_BIND          Bind address (host:port)
    "#)]
    Serve {
        /// Database URL (e.g. sqlite://taskdeck.db?mode=rwc)
        #[arg(long, env = "TASKDECK_DATABASE_URL")]
        database_url: String,

        /// Address to bind the API server
        #[arg(long, env = "TASKDECK_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// Disable public user registration
        #[arg(long)]
        no_signup: bool,

        /// Disable CORS (behind a same-origin proxy)
        #[arg(long)]
        no_cors: bool,
    },
}

/// Setup logging with the specified log level
fn setup_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Serve {
            database_url,
            bind,
            no_signup,
            no_cors,
        } => {
            info!(
                version = env!("CARGO_PKG_VERSION"),
                git = env!("GIT_HASH"),
                "starting taskdeck"
            );

            let db = taskdeck_db::connect(&database_url)
                .await
                .context("Failed to connect to database")?;
            taskdeck_db::migrate(&db)
                .await
                .context("Failed to run migrations")?;

            let config = ApiServerConfig {
                bind_addr: bind,
                enable_cors: !no_cors,
            };
            let server = ApiServer::new(config, db, !no_signup);
            server.start().await
        }
    }
}
