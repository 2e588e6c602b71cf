// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::StorageError;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast;
use tracing::info;

/// A change observed in one of the stores, carried with the external
/// index of the affected row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageNotification {
    SessionAdded(usize),
    SessionUpdated(usize),
    SessionDeleted(usize),
    TrackAdded(usize),
    TrackDeleted(usize),
}

/// The shared per-file database state.
///
/// All database handles opened for the same file share one `Connection`:
/// one pooled SQLite connection, one notification channel and one pair of
/// index mappings. That is what makes a mutation through one handle
/// observable by every other handle of the same file.
pub struct Connection {
    pool: SqlitePool,
    notifications: broadcast::Sender<StorageNotification>,
    session_ids: Mutex<Vec<i64>>,
    track_ids: Mutex<Vec<i64>>,
}

impl Connection {
    async fn open(db_file: &Path) -> Result<Arc<Connection>, StorageError> {
        let url = format!("sqlite:{}?mode=rwc", db_file.to_string_lossy());
        // a single pooled connection serializes all access to the file
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await?;
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA foreign_keys=ON").execute(&pool).await?;
        info!("Database connection opened for {}", db_file.to_string_lossy());

        let (notifications, _) = broadcast::channel(100);
        Ok(Arc::new(Connection {
            pool,
            notifications,
            session_ids: Mutex::new(vec![]),
            track_ids: Mutex::new(vec![]),
        }))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Subscribes to the change notifications of this database file.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageNotification> {
        self.notifications.subscribe()
    }

    /// Publishes a change to every handle of this database file.
    pub fn notify(&self, notification: StorageNotification) {
        let _ = self.notifications.send(notification);
    }

    /// Rebuilds the session index mapping from the ids currently in the
    /// store, ordered ascending.
    pub async fn refresh_session_index(&self) -> Result<(), StorageError> {
        let rows = sqlx::query("SELECT SessionId FROM Session ORDER BY SessionId ASC")
            .fetch_all(&self.pool)
            .await?;
        let ids = rows
            .iter()
            .map(|row| row.try_get::<i64, _>(0))
            .collect::<Result<Vec<_>, _>>()?;
        *self.session_ids.lock().unwrap_or_else(|e| e.into_inner()) = ids;
        Ok(())
    }

    /// Rebuilds the track index mapping from the ids currently in the
    /// store, ordered ascending.
    pub async fn refresh_track_index(&self) -> Result<(), StorageError> {
        let rows = sqlx::query("SELECT TrackId FROM Track ORDER BY TrackId ASC")
            .fetch_all(&self.pool)
            .await?;
        let ids = rows
            .iter()
            .map(|row| row.try_get::<i64, _>(0))
            .collect::<Result<Vec<_>, _>>()?;
        *self.track_ids.lock().unwrap_or_else(|e| e.into_inner()) = ids;
        Ok(())
    }

    /// Snapshot of the session ids in index order.
    pub fn session_ids(&self) -> Vec<i64> {
        self.session_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn session_count(&self) -> usize {
        self.session_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn session_id_for_index(&self, index: usize) -> Option<i64> {
        self.session_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(index)
            .copied()
    }

    pub fn index_for_session_id(&self, session_id: i64) -> Option<usize> {
        self.session_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .position(|id| *id == session_id)
    }

    pub fn track_count(&self) -> usize {
        self.track_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn track_id_for_index(&self, index: usize) -> Option<i64> {
        self.track_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(index)
            .copied()
    }

    pub fn index_for_track_id(&self, track_id: i64) -> Option<usize> {
        self.track_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .position(|id| *id == track_id)
    }
}

/// Deduplicates database connections per file.
///
/// The cache holds weak references, so a file's connection lives exactly
/// as long as some database handle uses it. The cache is an ordinary
/// value owned by the embedding program, tests create their own.
#[derive(Clone, Default)]
pub struct ConnectionCache {
    connections: Arc<tokio::sync::Mutex<HashMap<PathBuf, Weak<Connection>>>>,
}

impl ConnectionCache {
    pub fn new() -> Self {
        ConnectionCache::default()
    }

    /// The shared connection for `db_file`, opening it on first use.
    pub async fn connection(&self, db_file: &Path) -> Result<Arc<Connection>, StorageError> {
        let mut connections = self.connections.lock().await;
        if let Some(connection) = connections.get(db_file).and_then(Weak::upgrade) {
            return Ok(connection);
        }
        let connection = Connection::open(db_file).await?;
        connections.insert(db_file.to_path_buf(), Arc::downgrade(&connection));
        Ok(connection)
    }
}
