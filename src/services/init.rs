//! Initialization helpers for the application:
//! - database connection + migrations
//! - optional Telegram integration
//! - background worker spawn helpers
//!
//! This module centralizes bits that used to live in `main.rs`.

use std::{path::Path, sync::Arc};

use anyhow::Result;

use crate::config::Config;
use crate::services::auto_assignment::{AssignmentNotificationCache, AutoAssignmentLoop};
use crate::services::reconciliation::ReconciliationDriver;
use crate::services::reminders::ReminderService;

/// Redact potentially sensitive information from a database URL before logging.
///
/// Attempts to parse the URL and remove userinfo (username:password) components.
/// Falls back to removing everything before '@' or returning "(redacted)".
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        let scheme = url.scheme();
        let host = url.host_str().unwrap_or("");
        let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = url.path();
        format!("{}://{}{}{}", scheme, host, port_part, path)
    } else {
        if let Some(at_pos) = db_url.find('@') {
            let without_creds = &db_url[at_pos + 1..];
            return format!("(redacted){}", without_creds);
        }
        "(redacted)".to_string()
    }
}

/// Initialize SQLite database connection and run migrations.
///
/// Creates the parent directory for the database file (if applicable),
/// opens a connection pool using `create_if_missing(true)` and runs migrations.
pub async fn init_db(config: &Config) -> Result<sqlx::SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Connecting to database: {}", redact_db_url(db_url));

    // Extract the file path from the database URL
    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    let db_file_path = Path::new(db_path);

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await?;

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Initialize the optional Telegram integration and store it into `AppState`.
///
/// Any errors are logged; failure to initialize the bot does not stop the
/// application from starting (the reconciliation loop simply records ledger
/// rows without client delivery).
pub async fn initialize_telegram(state: &Arc<crate::AppState>) {
    if let Some(ref token) = state.config.telegram.bot_token {
        tracing::info!("Initializing Telegram bot");
        match crate::services::telegram::TelegramService::new(token.clone()).await {
            Ok(telegram) => {
                *state.telegram.write().await = Some(telegram);
                tracing::info!("Telegram bot initialized successfully");
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Telegram bot: {}", e);
            }
        }
    }
}

/// Spawn background workers:
/// - periodic activity reconciliation for all WattAttack accounts
/// - periodic auto-assignment of client profiles to platform accounts
/// - periodic session reminders to booked clients
///
/// These are spawned as `tokio::spawn` tasks. The function returns a vector of
/// `JoinHandle<()>`s so callers can await task shutdown. Each worker listens
/// for a shutdown notification via a `tokio::sync::broadcast::Sender<()>`.
pub fn spawn_background_workers(
    state: Arc<crate::AppState>,
    shutdown: tokio::sync::broadcast::Sender<()>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    // Reconciliation worker
    {
        let mut shutdown_rx = shutdown.subscribe();
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            loop {
                tracing::debug!("Starting activity reconciliation tick");
                ReconciliationDriver::run_tick(&state).await;

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Reconciliation worker shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(std::time::Duration::from_secs(
                        state.config.schedule.reconcile_interval_seconds,
                    )) => {}
                }
            }
        }));
    }

    // Auto-assignment worker
    {
        let mut shutdown_rx = shutdown.subscribe();
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            let cache = AssignmentNotificationCache::new();
            loop {
                tracing::debug!("Starting auto-assignment tick");
                AutoAssignmentLoop::run_tick(&state, &cache).await;

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Auto-assignment worker shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(std::time::Duration::from_secs(
                        state.config.schedule.assignment_interval_seconds,
                    )) => {}
                }
            }
        }));
    }

    // Reminder worker
    {
        let mut shutdown_rx = shutdown.subscribe();
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            loop {
                tracing::debug!("Starting reminder tick");
                ReminderService::run_tick(&state).await;

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Reminder worker shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(std::time::Duration::from_secs(
                        state.config.schedule.assignment_interval_seconds,
                    )) => {}
                }
            }
        }));
    }

    handles
}
