//! Taskdeck admin CLI - account and maintenance operations
//!
//! Operates directly on the datastore; intended for operators, not end
//! users. Account removal runs the same transactional transfer logic as
//! the API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use taskdeck_core::{accounts, activity, bots, integrity, Capability, PermissionSet};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Taskdeck admin - manage accounts, bots and store hygiene
#[derive(Parser, Debug)]
#[command(name = "taskdeck-admin")]
#[command(about = "Taskdeck admin - manage accounts, bots and store hygiene")]
#[command(version)]
struct Cli {
    /// Database URL (e.g. sqlite://taskdeck.db or postgres://...)
    #[arg(long, env = "TASKDECK_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a user account
    UserCreate {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        /// Password (prefer the environment variable over the flag)
        #[arg(long, env = "TASKDECK_PASSWORD")]
        password: String,

        #[arg(long)]
        full_name: Option<String>,
    },

    /// Remove a user account, transferring everything it owns
    #[command(long_about = r#"
Remove a user account. Owned projects and tasks, and any assignments, are
transferred before the account row is deleted; the whole operation is one
transaction.

EXAMPLES:
  # Remove a user, letting the policy pick the transfer target
  taskdeck-admin user-remove --user-id <uuid>

  # Remove a user, handing their content to a specific colleague
  taskdeck-admin user-remove --user-id <uuid> --transfer-to <uuid>
    "#)]
    UserRemove {
        /// User to remove
        #[arg(long)]
        user_id: Uuid,

        /// Explicit transfer target for owned content
        #[arg(long)]
        transfer_to: Option<Uuid>,
    },

    /// Show what a user owns and is assigned (dry run for user-remove)
    UserContent {
        #[arg(long)]
        user_id: Uuid,
    },

    /// Create a bot owned by a user; prints the token once
    BotCreate {
        #[arg(long)]
        owner_id: Uuid,

        #[arg(long)]
        username: String,

        /// Capability names, comma separated (e.g. read,create_tasks)
        #[arg(long, value_delimiter = ',')]
        permissions: Vec<String>,
    },

    /// Remove a bot, transferring or deleting its content
    BotRemove {
        #[arg(long)]
        bot_id: Uuid,

        /// Cascade-delete bot-owned content instead of transferring it
        #[arg(long)]
        delete_content: bool,

        /// Transfer target; defaults to the bot's owner
        #[arg(long)]
        transfer_to: Option<Uuid>,
    },

    /// Find and delete orphaned tasks and subtasks
    Sweep,

    /// Delete expired sessions
    PurgeSessions,

    /// Print the most recent activity entries
    Activity {
        #[arg(long, default_value = "20")]
        limit: u64,
    },
}

/// Setup logging with the specified log level
fn setup_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

fn parse_permissions(names: &[String]) -> Result<PermissionSet> {
    names
        .iter()
        .map(|name| {
            name.parse::<Capability>()
                .map_err(|e| anyhow::anyhow!(e))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let database_url = cli
        .database_url
        .context("--database-url or TASKDECK_DATABASE_URL is required")?;

    let db = taskdeck_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    taskdeck_db::migrate(&db)
        .await
        .context("Failed to run migrations")?;

    match cli.command {
        Commands::UserCreate {
            username,
            email,
            password,
            full_name,
        } => {
            let user = accounts::register_user(
                &db,
                accounts::NewUser {
                    username,
                    email,
                    password,
                    full_name,
                },
            )
            .await?;
            info!(id = %user.id, username = %user.username, "user created");
            println!("{}", user.id);
        }

        Commands::UserRemove {
            user_id,
            transfer_to,
        } => {
            let summary = accounts::remove_user(&db, None, user_id, transfer_to).await?;
            info!(
                username = %summary.removed_username,
                transferred_to = ?summary.transferred_to,
                projects = summary.projects_reassigned,
                tasks = summary.tasks_reassigned,
                "user removed"
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::UserContent { user_id } => {
            let content = accounts::owned_content(&db, user_id).await?;
            println!(
                "owned projects:    {}\nowned tasks:       {}\nassigned tasks:    {}\nassigned subtasks: {}",
                content.owned_projects.len(),
                content.owned_tasks.len(),
                content.assigned_tasks.len(),
                content.assigned_subtasks.len(),
            );
            for project in &content.owned_projects {
                println!("  project {} {}", project.id, project.name);
            }
            for task in &content.owned_tasks {
                println!("  task    {} {}", task.id, task.title);
            }
        }

        Commands::BotCreate {
            owner_id,
            username,
            permissions,
        } => {
            let owner = taskdeck_core::authn::resolve_user(&db, owner_id).await?;
            let created = bots::create_bot(
                &db,
                &owner,
                bots::NewBot {
                    username,
                    permissions: parse_permissions(&permissions)?,
                },
            )
            .await?;
            info!(id = %created.bot.id, username = %created.bot.username, "bot created");
            // The token is not stored anywhere in the clear; print it once.
            println!("{}", created.token);
        }

        Commands::BotRemove {
            bot_id,
            delete_content,
            transfer_to,
        } => {
            let disposition = if delete_content {
                accounts::BotContentDisposition::Delete
            } else {
                accounts::BotContentDisposition::Transfer(transfer_to)
            };
            let summary = accounts::remove_bot(&db, None, bot_id, disposition).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Sweep => {
            let report = integrity::sweep_orphans(&db).await?;
            if report.is_clean() {
                println!("store is consistent; nothing to repair");
            } else {
                println!(
                    "repaired: {} orphaned tasks, {} orphaned subtasks",
                    report.orphan_tasks_deleted, report.orphan_subtasks_deleted
                );
            }
        }

        Commands::PurgeSessions => {
            let purged = taskdeck_core::authn::purge_expired_sessions(&db).await?;
            println!("purged {purged} expired sessions");
        }

        Commands::Activity { limit } => {
            let entries = activity::recent(&db, limit).await?;
            for entry in entries {
                println!(
                    "{} {:>7} {:<24} {}={} {}",
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry
                        .actor_kind
                        .map(|k| format!("{k:?}").to_lowercase())
                        .unwrap_or_else(|| "system".to_string()),
                    entry.action,
                    entry.entity_kind,
                    entry.entity_id,
                    entry.entity_name.unwrap_or_default(),
                );
            }
        }
    }

    Ok(())
}
