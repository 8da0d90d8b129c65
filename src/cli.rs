use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::{Database, UserFilter, UserUpdate};
use crate::tracking::TrackingController;

#[derive(Parser, Debug)]
#[command(name = "time-tracker")]
#[command(version)]
#[command(about = "Track time spent on tasks and report it per user", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// SQLite database file (overrides TIME_TRACKER_DB and the config file)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start tracking time for a task
    Start {
        #[arg(long)]
        task: Uuid,
    },

    /// Stop tracking time for a task
    Stop {
        #[arg(long)]
        task: Uuid,
    },

    /// Report tracked time per task for a user, longest first
    Calc {
        #[arg(long)]
        user: Uuid,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    Add {
        #[arg(long)]
        surname: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        patronymic: Option<String>,
        #[arg(long)]
        address: String,
    },
    List {
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        patronymic: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    Update {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        patronymic: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    Add {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        name: String,
    },
    List {
        #[arg(long)]
        user: Uuid,
    },
}

/// Runs one command against `db` and returns its JSON response.
pub async fn dispatch(command: Commands, db: Database) -> Result<Value> {
    let value = match command {
        Commands::Start { task } => {
            let controller = TrackingController::new(db);
            serde_json::to_value(controller.start_tracking(task).await?)?
        }
        Commands::Stop { task } => {
            let controller = TrackingController::new(db);
            serde_json::to_value(controller.stop_tracking(task).await?)?
        }
        Commands::Calc { user } => {
            let controller = TrackingController::new(db);
            serde_json::to_value(controller.calc_time(user).await?)?
        }
        Commands::User { action } => dispatch_user(action, &db).await?,
        Commands::Task { action } => match action {
            TaskAction::Add { user, name } => {
                serde_json::to_value(db.insert_task(user, name).await?)?
            }
            TaskAction::List { user } => {
                serde_json::to_value(db.list_tasks_for_user(user).await?)?
            }
        },
    };

    Ok(value)
}

async fn dispatch_user(action: UserAction, db: &Database) -> Result<Value> {
    let value = match action {
        UserAction::Add {
            surname,
            name,
            patronymic,
            address,
        } => {
            let user = db.insert_user(surname, name, patronymic, address).await?;
            serde_json::to_value(user)?
        }
        UserAction::List {
            surname,
            name,
            patronymic,
            address,
            limit,
            offset,
        } => {
            let filter = UserFilter {
                surname,
                name,
                patronymic,
                address,
            };
            serde_json::to_value(db.list_users(filter, limit, offset).await?)?
        }
        UserAction::Update {
            id,
            surname,
            name,
            patronymic,
            address,
        } => {
            let update = UserUpdate {
                surname,
                name,
                patronymic,
                address,
            };
            serde_json::to_value(db.update_user(id, update).await?)?
        }
        UserAction::Delete { id } => {
            db.soft_delete_user(id).await?;
            json!({ "deleted": id })
        }
    };

    Ok(value)
}
