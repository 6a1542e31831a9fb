//! Command-line entry point for TutorHub.
//!
//! # Responsibility
//! - Map subcommands onto `tutorhub_core::TutoringApi` operations.
//! - Resolve configuration from flags first, then `TUTORHUB_*` variables.
//!
//! # Invariants
//! - Responses are printed as pretty JSON envelopes on stdout.
//! - The process exits non-zero whenever the envelope code is not 200.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tutorhub_core::{
    init_logging, open_db, ApiResponse, CommonStudentsRequest, CoreConfig,
    ListNotificationsRequest, RegisterRequest, RetrieveNotificationsRequest, SqliteTutoringStore,
    SuspendRequest, TutoringApi,
};

#[derive(Parser)]
#[command(name = "tutorhub")]
#[command(version)]
#[command(about = "Tutor rosters and student notifications", long_about = None)]
struct Cli {
    /// SQLite database file (default: TUTORHUB_DB_PATH or ./tutorhub.sqlite3)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,
    /// Absolute directory for rolling log files; logging is off without one
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,
    /// Attempts per store write before giving up on a busy database
    #[arg(long, global = true, value_name = "N")]
    max_store_attempts: Option<u32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register students under a tutor
    Register {
        #[arg(long)]
        tutor: String,
        /// Repeat for each student
        #[arg(long = "student", value_name = "EMAIL", required = true)]
        students: Vec<String>,
    },
    /// List students registered to every given tutor
    CommonStudents {
        /// Repeat for each tutor
        #[arg(long = "tutor", value_name = "EMAIL")]
        tutors: Vec<String>,
    },
    /// Suspend a student
    Suspend {
        #[arg(long)]
        student: String,
    },
    /// Post a notification and print its recipients
    Notify {
        #[arg(long)]
        tutor: String,
        #[arg(long)]
        notification: String,
    },
    /// List stored notifications, newest first
    Notifications {
        #[arg(long)]
        tutor: Option<String>,
        #[arg(long)]
        student: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Delete every tutor, student, link and notification
    Reset,
    /// Print the core version and supported schema version
    Version,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!(
            "tutorhub_core version={} schema_version={}",
            tutorhub_core::core_version(),
            tutorhub_core::db::migrations::latest_version()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let config = resolve_config(&cli)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)
            .map_err(anyhow::Error::msg)
            .context("failed to initialize logging")?;
    }

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;

    if let Commands::Reset = cli.command {
        let store = SqliteTutoringStore::with_retry(&conn, config.retry)?;
        let deleted = store.clear_all()?;
        info!("event=cli_reset module=cli status=ok deleted_rows={deleted}");
        println!("Deleted {deleted} rows");
        return Ok(ExitCode::SUCCESS);
    }

    let api = TutoringApi::try_new(&conn, config.retry)?;
    match cli.command {
        Commands::Register { tutor, students } => print_response(&api.register(&RegisterRequest {
            tutor: Some(tutor),
            students: Some(students),
        })),
        Commands::CommonStudents { tutors } => {
            print_response(&api.common_students(&CommonStudentsRequest { tutor: tutors }))
        }
        Commands::Suspend { student } => print_response(&api.suspend(&SuspendRequest {
            student: Some(student),
        })),
        Commands::Notify {
            tutor,
            notification,
        } => print_response(&api.retrieve_notifications(&RetrieveNotificationsRequest {
            tutor: Some(tutor),
            notification: Some(notification),
        })),
        Commands::Notifications {
            tutor,
            student,
            limit,
        } => print_response(&api.list_notifications(&ListNotificationsRequest {
            tutor,
            student,
            limit,
        })),
        Commands::Reset | Commands::Version => Ok(ExitCode::SUCCESS),
    }
}

fn resolve_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    if let Some(max_attempts) = cli.max_store_attempts {
        config = config.with_max_attempts(max_attempts)?;
    }
    Ok(config)
}

fn print_response<T: Serialize>(response: &ApiResponse<T>) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(response)?);
    if response.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
