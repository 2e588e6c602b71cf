// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::connection::{Connection, ConnectionCache, StorageNotification};
use crate::StorageError;
use common::{position::Position, track::TrackData};
use module_core::async_result::{AsyncResult, AsyncState};
use module_core::{EventKind, ModuleCtx};
use sqlx::sqlite::SqlitePool;
use sqlx::{Row, Sqlite, Transaction};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// SQL-backed store for the known tracks.
///
/// Shares the per-file connection, index mapping and notification
/// channel with every other database handle of the same file.
pub struct TrackDatabase {
    connection: Arc<Connection>,
    forwarder: tokio::task::JoinHandle<()>,
}

impl TrackDatabase {
    /// Opens a track database handle for `db_file`.
    pub async fn new(
        cache: &ConnectionCache,
        db_file: &Path,
        ctx: ModuleCtx,
    ) -> Result<Self, StorageError> {
        let connection = cache.connection(db_file).await?;
        connection.refresh_track_index().await?;
        let forwarder = spawn_notification_forwarder(&connection, ctx);
        Ok(TrackDatabase {
            connection,
            forwarder,
        })
    }

    /// The number of tracks currently in the store.
    pub fn get_track_count(&self) -> usize {
        self.connection.track_count()
    }

    /// Counts the stored tracks on a worker task.
    pub fn get_track_count_async(&self) -> AsyncResult<usize> {
        let result = AsyncResult::new();
        let worker_result = result.clone();
        let connection = self.connection.clone();
        tokio::spawn(async move {
            match connection.refresh_track_index().await {
                Ok(()) => worker_result.set_result_value(connection.track_count()),
                Err(e) => {
                    error!("Failed to count stored tracks. Error: {e}");
                    worker_result.set_result(AsyncState::Error, Some(e.to_string()));
                }
            }
        });
        result
    }

    /// Reads all stored tracks ordered by their external index.
    pub async fn get_tracks(&self) -> Result<Vec<TrackData>, StorageError> {
        read_all_tracks(&self.connection).await
    }

    /// Reads all stored tracks on a worker task.
    pub fn get_tracks_async(&self) -> AsyncResult<Vec<TrackData>> {
        let result = AsyncResult::new();
        let worker_result = result.clone();
        let connection = self.connection.clone();
        tokio::spawn(async move {
            match read_all_tracks(&connection).await {
                Ok(tracks) => worker_result.set_result_value(tracks),
                Err(e) => {
                    error!("Failed to read stored tracks. Error: {e}");
                    worker_result.set_result(AsyncState::Error, Some(e.to_string()));
                }
            }
        });
        result
    }

    /// Stores a track with its positions and section points on a worker
    /// task.
    pub fn save_track(&self, track: &TrackData) -> AsyncResult<()> {
        let result = AsyncResult::new();
        let worker_result = result.clone();
        let connection = self.connection.clone();
        let track = track.clone();
        tokio::spawn(async move {
            match save_track_task(&connection, &track).await {
                Ok(()) => {
                    info!("Stored track {}", track.name);
                    worker_result.set_result(AsyncState::Ok, None);
                }
                Err(e) => {
                    error!("Failed to store track {}. Error: {e}", track.name);
                    worker_result.set_result(AsyncState::Error, Some(e.to_string()));
                }
            }
        });
        result
    }

    /// Deletes the track under the external index.
    ///
    /// Sessions recorded on the track are removed by the cascading
    /// foreign keys and announced as deleted; orphaned positions are
    /// swept afterwards.
    pub async fn delete_track(&self, index: usize) -> Result<(), StorageError> {
        let Some(track_id) = self.connection.track_id_for_index(index) else {
            error!("Failed to delete track, index {index} not found");
            return Err(StorageError::NotFound);
        };
        let sessions_before = self.connection.session_ids();
        let mut tx = self.connection.pool().begin().await?;
        sqlx::query("DELETE FROM Track WHERE Track.TrackId = ?")
            .bind(track_id)
            .execute(&mut *tx)
            .await?;
        delete_orphan_positions(&mut tx).await?;
        tx.commit().await?;

        self.connection.refresh_track_index().await?;
        self.connection.refresh_session_index().await?;
        self.connection
            .notify(StorageNotification::TrackDeleted(index));
        self.notify_cascaded_sessions(&sessions_before);
        Ok(())
    }

    /// Removes every stored track.
    pub async fn delete_all_tracks(&self) -> Result<(), StorageError> {
        let count = self.connection.track_count();
        let sessions_before = self.connection.session_ids();
        let mut tx = self.connection.pool().begin().await?;
        sqlx::query("DELETE FROM Track").execute(&mut *tx).await?;
        delete_orphan_positions(&mut tx).await?;
        tx.commit().await?;

        self.connection.refresh_track_index().await?;
        self.connection.refresh_session_index().await?;
        for index in 0..count {
            self.connection
                .notify(StorageNotification::TrackDeleted(index));
        }
        self.notify_cascaded_sessions(&sessions_before);
        Ok(())
    }

    /// Announces the sessions removed by a cascading track delete under
    /// the indices they had before the delete.
    fn notify_cascaded_sessions(&self, sessions_before: &[i64]) {
        let remaining = self.connection.session_ids();
        for (index, session_id) in sessions_before.iter().enumerate() {
            if !remaining.contains(session_id) {
                self.connection
                    .notify(StorageNotification::SessionDeleted(index));
            }
        }
    }
}

impl Drop for TrackDatabase {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Republishes the track notifications of the shared connection on the
/// bus of the handle owning `ctx`.
fn spawn_notification_forwarder(
    connection: &Arc<Connection>,
    ctx: ModuleCtx,
) -> tokio::task::JoinHandle<()> {
    let mut notifications = connection.subscribe();
    tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            let event = match notification {
                StorageNotification::TrackAdded(index) => EventKind::TrackAddedEvent(index),
                StorageNotification::TrackDeleted(index) => EventKind::TrackDeletedEvent(index),
                _ => continue,
            };
            let _ = ctx.publish_event(event);
        }
    })
}

async fn save_track_task(
    connection: &Arc<Connection>,
    track: &TrackData,
) -> Result<(), StorageError> {
    let mut tx = connection.pool().begin().await?;
    let track_id = insert_track_rows(&mut tx, track).await?;
    tx.commit().await?;

    connection.refresh_track_index().await?;
    if let Some(index) = connection.index_for_track_id(track_id) {
        connection.notify(StorageNotification::TrackAdded(index));
    }
    Ok(())
}

/// Inserts the track row with its finish line, start line and section
/// positions. Returns the id of the new track.
pub(crate) async fn insert_track_rows(
    tx: &mut Transaction<'_, Sqlite>,
    track: &TrackData,
) -> Result<i64, StorageError> {
    let finishline_id = insert_position(tx, &track.finishline).await?;
    let startline_id = if track.has_startline() {
        Some(insert_position(tx, &track.startline).await?)
    } else {
        None
    };

    let track_id = sqlx::query("INSERT INTO Track (Name, Finishline, Startline) VALUES (?, ?, ?)")
        .bind(&track.name)
        .bind(finishline_id)
        .bind(startline_id)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();

    for (sektor_index, section) in track.sections.iter().enumerate() {
        let position_id = insert_position(tx, section).await?;
        sqlx::query("INSERT INTO Sektor (TrackId, PositionId, SektorIndex) VALUES (?, ?, ?)")
            .bind(track_id)
            .bind(position_id)
            .bind(sektor_index as i64)
            .execute(&mut **tx)
            .await?;
    }
    Ok(track_id)
}

async fn insert_position(
    tx: &mut Transaction<'_, Sqlite>,
    position: &Position,
) -> Result<i64, StorageError> {
    Ok(
        sqlx::query("INSERT INTO Position (Latitude, Longitude) VALUES (?, ?)")
            .bind(f64::from(position.latitude))
            .bind(f64::from(position.longitude))
            .execute(&mut **tx)
            .await?
            .last_insert_rowid(),
    )
}

/// Removes positions no longer referenced by any track or section.
async fn delete_orphan_positions(tx: &mut Transaction<'_, Sqlite>) -> Result<(), StorageError> {
    sqlx::query(
        "DELETE FROM Position WHERE Position.PositionId NOT IN \
         (SELECT Finishline FROM Track \
          UNION SELECT Startline FROM Track WHERE Startline IS NOT NULL \
          UNION SELECT PositionId FROM Sektor)",
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Reads the track under `track_id` with its start line, finish line and
/// ordered section points.
pub(crate) async fn read_track_row(
    pool: &SqlitePool,
    track_id: i64,
) -> Result<TrackData, StorageError> {
    let row = sqlx::query(
        "SELECT Track.Name, FL.Latitude, FL.Longitude, SL.Latitude, SL.Longitude \
         FROM Track \
         LEFT JOIN Position FL ON Track.Finishline = FL.PositionId \
         LEFT JOIN Position SL ON Track.Startline = SL.PositionId \
         WHERE Track.TrackId = ?",
    )
    .bind(track_id)
    .fetch_optional(pool)
    .await?
    .ok_or(StorageError::NotFound)?;

    let name = row.try_get::<String, _>(0)?;
    let finishline = Position::new(
        row.try_get::<f64, _>(1)? as f32,
        row.try_get::<f64, _>(2)? as f32,
    );
    let startline = match (
        row.try_get::<Option<f64>, _>(3)?,
        row.try_get::<Option<f64>, _>(4)?,
    ) {
        (Some(latitude), Some(longitude)) => Position::new(latitude as f32, longitude as f32),
        _ => Position::default(),
    };

    let sektor_rows = sqlx::query(
        "SELECT PO.Latitude, PO.Longitude \
         FROM Sektor SE \
         JOIN Position PO ON SE.PositionId = PO.PositionId \
         WHERE SE.TrackId = ? ORDER BY SE.SektorIndex ASC",
    )
    .bind(track_id)
    .fetch_all(pool)
    .await?;
    let mut sections = Vec::with_capacity(sektor_rows.len());
    for sektor_row in &sektor_rows {
        sections.push(Position::new(
            sektor_row.try_get::<f64, _>(0)? as f32,
            sektor_row.try_get::<f64, _>(1)? as f32,
        ));
    }

    Ok(TrackData {
        name,
        startline,
        finishline,
        sections,
    })
}

async fn read_all_tracks(connection: &Arc<Connection>) -> Result<Vec<TrackData>, StorageError> {
    connection.refresh_track_index().await?;
    let mut tracks = Vec::with_capacity(connection.track_count());
    for index in 0..connection.track_count() {
        let Some(track_id) = connection.track_id_for_index(index) else {
            continue;
        };
        tracks.push(read_track_row(connection.pool(), track_id).await?);
    }
    Ok(tracks)
}
