// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Storage module for the laptimer
//!
//! Provides the SQL-backed session and track databases. All handles for
//! one database file share a single connection (see
//! [`connection::ConnectionCache`]), so every handle observes the
//! changes made through any other handle of the same file.

use sqlx::sqlite::SqlitePool;
use thiserror::Error;
use tracing::info;

pub mod connection;
pub mod session_db;
pub mod track_db;

pub use connection::{Connection, ConnectionCache, StorageNotification};
pub use session_db::SessionDatabase;
pub use track_db::TrackDatabase;

/// Errors surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested index or id is not in the store.
    #[error("not found")]
    NotFound,
    /// A statement failed to prepare, bind or execute.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Applies the schema to the database behind `pool`.
///
/// The statements are idempotent, an existing schema is left untouched.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
    let migrations = [include_str!("../migrations/001_schema.sql")];
    for migration in &migrations {
        for statement in migration.split(';') {
            let statement = statement.trim();
            if !statement.is_empty() {
                sqlx::query(statement).execute(pool).await?;
            }
        }
    }
    info!("Database migrations applied");
    Ok(())
}
