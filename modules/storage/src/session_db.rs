// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::connection::{Connection, ConnectionCache, StorageNotification};
use crate::{StorageError, track_db};
use common::{
    date::Date, lap::LapData, position::GpsFix, position::Position, session::SessionData,
    session::SessionMeta, timestamp::Timestamp, velocity::Velocity,
};
use module_core::async_result::{AsyncResult, AsyncState};
use module_core::{EventKind, ModuleCtx};
use sqlx::sqlite::SqlitePool;
use sqlx::{Row, Sqlite, Transaction};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// SQL-backed store for driving sessions.
///
/// The store keeps a bijection between external indices and the
/// `SessionId` rows, ordered by id ascending. All asynchronous
/// operations run on worker tasks and complete an
/// [`AsyncResult`]; change notifications fan out as deferred events on
/// the bus of every handle opened for the same database file.
pub struct SessionDatabase {
    connection: Arc<Connection>,
    forwarder: tokio::task::JoinHandle<()>,
}

impl SessionDatabase {
    /// Opens a session database handle for `db_file`.
    ///
    /// Handles for the same file share one connection, rebuilt index
    /// mapping included. Change notifications are republished on the
    /// bus of `ctx`.
    pub async fn new(
        cache: &ConnectionCache,
        db_file: &Path,
        ctx: ModuleCtx,
    ) -> Result<Self, StorageError> {
        let connection = cache.connection(db_file).await?;
        connection.refresh_session_index().await?;
        let forwarder = spawn_notification_forwarder(&connection, ctx);
        Ok(SessionDatabase {
            connection,
            forwarder,
        })
    }

    /// The number of sessions currently in the store.
    pub fn get_session_count(&self) -> usize {
        self.connection.session_count()
    }

    /// Reads the session under the external index.
    pub async fn get_session_by_index(&self, index: usize) -> Result<SessionData, StorageError> {
        read_session_by_index(&self.connection, index).await
    }

    /// Reads the session under the external index on a worker task.
    pub fn get_session_by_index_async(&self, index: usize) -> AsyncResult<SessionData> {
        let result = AsyncResult::new();
        let worker_result = result.clone();
        let connection = self.connection.clone();
        tokio::spawn(async move {
            match read_session_by_index(&connection, index).await {
                Ok(session) => worker_result.set_result_value(session),
                Err(e) => {
                    error!("Failed to read session with index {index}. Error: {e}");
                    worker_result.set_result(AsyncState::Error, Some(e.to_string()));
                }
            }
        });
        result
    }

    /// Looks a session up by its metadata on a worker task.
    ///
    /// The lookup key is the (date, time) pair, resolved to an id and
    /// then to the index of the stored session.
    pub fn get_session_by_metadata_async(&self, metadata: &SessionMeta) -> AsyncResult<SessionData> {
        let result = AsyncResult::new();
        let worker_result = result.clone();
        let connection = self.connection.clone();
        let metadata = metadata.clone();
        tokio::spawn(async move {
            match read_session_by_metadata(&connection, &metadata).await {
                Ok(session) => worker_result.set_result_value(session),
                Err(e) => {
                    error!(
                        date = %metadata.date,
                        time = %metadata.time,
                        "Failed to read session by metadata. Error: {e}"
                    );
                    worker_result.set_result(AsyncState::Error, Some(e.to_string()));
                }
            }
        });
        result
    }

    /// Reads the metadata of the session under the external index on a
    /// worker task.
    pub fn get_session_meta_by_index_async(&self, index: usize) -> AsyncResult<SessionMeta> {
        let result = AsyncResult::new();
        let worker_result = result.clone();
        let connection = self.connection.clone();
        tokio::spawn(async move {
            match read_session_meta_by_index(&connection, index).await {
                Ok(meta) => {
                    info!("SessionMetaData for session {index} requested");
                    worker_result.set_result_value(meta);
                }
                Err(e) => {
                    error!("Failed to read session metadata with index {index}. Error: {e}");
                    worker_result.set_result(AsyncState::Error, Some(e.to_string()));
                }
            }
        });
        result
    }

    /// Stores a session on a worker task.
    ///
    /// A session that is already stored under its (date, time) pair is
    /// updated by appending the laps not yet stored, everything else of
    /// a stored session is immutable. New sessions are inserted with all
    /// laps, sector times and log points inside one transaction.
    pub fn store_session(&self, session: &SessionData) -> AsyncResult<()> {
        let result = AsyncResult::new();
        let worker_result = result.clone();
        let connection = self.connection.clone();
        let session = session.clone();
        info!(
            "Store session {} from {} at {}",
            session.track.name, session.date, session.time
        );
        tokio::spawn(async move {
            match store_session_task(&connection, &session).await {
                Ok(()) => worker_result.set_result(AsyncState::Ok, None),
                Err(e) => {
                    error!(
                        "Failed to store session from {} at {}. Error: {e}",
                        session.date, session.time
                    );
                    worker_result.set_result(AsyncState::Error, Some(e.to_string()));
                }
            }
        });
        result
    }

    /// Deletes the session under the external index.
    ///
    /// The cascading foreign keys remove the session's laps, sector
    /// times and log points with it.
    pub async fn delete_session(&self, index: usize) -> Result<(), StorageError> {
        let Some(session_id) = self.connection.session_id_for_index(index) else {
            error!("Failed to delete session, index {index} not found");
            return Err(StorageError::NotFound);
        };
        sqlx::query("DELETE FROM Session WHERE Session.SessionId = ?")
            .bind(session_id)
            .execute(self.connection.pool())
            .await?;
        self.connection.refresh_session_index().await?;
        self.connection
            .notify(StorageNotification::SessionDeleted(index));
        Ok(())
    }
}

impl Drop for SessionDatabase {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Republishes the session notifications of the shared connection on the
/// bus of the handle owning `ctx`.
fn spawn_notification_forwarder(
    connection: &Arc<Connection>,
    ctx: ModuleCtx,
) -> tokio::task::JoinHandle<()> {
    let mut notifications = connection.subscribe();
    tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            let event = match notification {
                StorageNotification::SessionAdded(index) => EventKind::SessionAddedEvent(index),
                StorageNotification::SessionUpdated(index) => EventKind::SessionUpdatedEvent(index),
                StorageNotification::SessionDeleted(index) => EventKind::SessionDeletedEvent(index),
                _ => continue,
            };
            let _ = ctx.publish_event(event);
        }
    })
}

async fn store_session_task(
    connection: &Arc<Connection>,
    session: &SessionData,
) -> Result<(), StorageError> {
    let date = session.date.to_string();
    let time = session.time.to_string();
    match read_session_id(connection.pool(), &date, &time).await? {
        Some(session_id) => update_session(connection, session_id, session).await,
        None => insert_session(connection, session).await,
    }
}

/// Appends the laps of `session` that are not stored yet.
async fn update_session(
    connection: &Arc<Connection>,
    session_id: i64,
    session: &SessionData,
) -> Result<(), StorageError> {
    let stored_laps = sqlx::query("SELECT COUNT(*) FROM Lap WHERE Lap.SessionId = ?")
        .bind(session_id)
        .fetch_one(connection.pool())
        .await?
        .try_get::<i64, _>(0)? as usize;
    if session.laps.len() <= stored_laps {
        return Ok(());
    }

    let mut tx = connection.pool().begin().await?;
    for lap_index in stored_laps..session.laps.len() {
        insert_lap(&mut tx, session_id, lap_index, &session.laps[lap_index]).await?;
        debug!(
            "Stored lap {} of {} for session with ID {}",
            lap_index + 1,
            session.laps.len(),
            session_id
        );
    }
    tx.commit().await?;

    if let Some(index) = connection.index_for_session_id(session_id) {
        connection.notify(StorageNotification::SessionUpdated(index));
    }
    Ok(())
}

/// Inserts a new session with all laps. The referenced track is created
/// when the store does not know it yet.
async fn insert_session(
    connection: &Arc<Connection>,
    session: &SessionData,
) -> Result<(), StorageError> {
    let mut tx = connection.pool().begin().await?;
    let track_id = ensure_track(&mut tx, session).await?;
    let session_id = sqlx::query("INSERT INTO Session (TrackId, Date, Time) VALUES (?, ?, ?)")
        .bind(track_id)
        .bind(session.date.to_string())
        .bind(session.time.to_string())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    for (lap_index, lap) in session.laps.iter().enumerate() {
        insert_lap(&mut tx, session_id, lap_index, lap).await?;
        debug!(
            "Stored lap {} of {} for session with ID {}",
            lap_index + 1,
            session.laps.len(),
            session_id
        );
    }
    tx.commit().await?;

    connection.refresh_session_index().await?;
    connection.refresh_track_index().await?;
    if let Some(index) = connection.index_for_session_id(session_id) {
        connection.notify(StorageNotification::SessionAdded(index));
    }
    Ok(())
}

async fn ensure_track(
    tx: &mut Transaction<'_, Sqlite>,
    session: &SessionData,
) -> Result<i64, StorageError> {
    let existing = sqlx::query("SELECT TrackId FROM Track WHERE Track.Name = ?")
        .bind(&session.track.name)
        .fetch_optional(&mut **tx)
        .await?;
    match existing {
        Some(row) => Ok(row.try_get(0)?),
        None => track_db::insert_track_rows(tx, &session.track).await,
    }
}

async fn insert_lap(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: i64,
    lap_index: usize,
    lap: &LapData,
) -> Result<(), StorageError> {
    let lap_id = sqlx::query("INSERT INTO Lap (SessionId, LapIndex) VALUES (?, ?)")
        .bind(session_id)
        .bind(lap_index as i64)
        .execute(&mut **tx)
        .await?
        .last_insert_rowid();

    for (sektor_index, sektor_time) in lap.sectors.iter().enumerate() {
        sqlx::query("INSERT INTO SektorTime (LapId, Time, SektorIndex) VALUES (?, ?, ?)")
            .bind(lap_id)
            .bind(sektor_time.to_string())
            .bind(sektor_index as i64)
            .execute(&mut **tx)
            .await?;
    }

    for (idx, fix) in lap.log_points.iter().enumerate() {
        sqlx::query(
            "INSERT INTO LogPoint (Idx, LapId, Velocity, Longitude, Latitude, Date, Time) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(idx as i64)
        .bind(lap_id)
        .bind(fix.velocity.meters_per_second())
        .bind(f64::from(fix.position.longitude))
        .bind(f64::from(fix.position.latitude))
        .bind(fix.date.to_string())
        .bind(fix.time.to_string())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn read_session_id(
    pool: &SqlitePool,
    date: &str,
    time: &str,
) -> Result<Option<i64>, StorageError> {
    let row = sqlx::query("SELECT Session.SessionId FROM Session WHERE Session.Date = ? AND Session.Time = ?")
        .bind(date)
        .bind(time)
        .fetch_optional(pool)
        .await?;
    Ok(match row {
        Some(row) => Some(row.try_get(0)?),
        None => None,
    })
}

async fn read_session_by_index(
    connection: &Arc<Connection>,
    index: usize,
) -> Result<SessionData, StorageError> {
    let meta = read_session_meta_by_index(connection, index).await?;
    let session_id = connection
        .session_id_for_index(index)
        .ok_or(StorageError::NotFound)?;
    let laps = read_laps_of_session(connection.pool(), session_id).await?;
    Ok(SessionData {
        id: meta.id,
        date: meta.date,
        time: meta.time,
        track: meta.track,
        laps,
    })
}

async fn read_session_by_metadata(
    connection: &Arc<Connection>,
    metadata: &SessionMeta,
) -> Result<SessionData, StorageError> {
    let session_id = read_session_id(
        connection.pool(),
        &metadata.date.to_string(),
        &metadata.time.to_string(),
    )
    .await?
    .ok_or(StorageError::NotFound)?;
    let index = connection
        .index_for_session_id(session_id)
        .ok_or(StorageError::NotFound)?;
    read_session_by_index(connection, index).await
}

async fn read_session_meta_by_index(
    connection: &Arc<Connection>,
    index: usize,
) -> Result<SessionMeta, StorageError> {
    let session_id = connection
        .session_id_for_index(index)
        .ok_or(StorageError::NotFound)?;
    let row = sqlx::query("SELECT Session.Date, Session.Time, Session.TrackId FROM Session WHERE Session.SessionId = ?")
        .bind(session_id)
        .fetch_optional(connection.pool())
        .await?
        .ok_or(StorageError::NotFound)?;

    let date = Date::parse_or_default(&row.try_get::<String, _>(0)?);
    let time = Timestamp::parse_or_default(&row.try_get::<String, _>(1)?);
    let track_id = row.try_get::<i64, _>(2)?;
    let track = track_db::read_track_row(connection.pool(), track_id).await?;
    Ok(SessionMeta {
        id: session_id as u64,
        date,
        time,
        track,
    })
}

async fn read_laps_of_session(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<Vec<LapData>, StorageError> {
    let lap_rows = sqlx::query("SELECT Lap.LapId FROM Lap WHERE Lap.SessionId = ? ORDER BY Lap.LapIndex ASC")
        .bind(session_id)
        .fetch_all(pool)
        .await?;

    let mut laps = Vec::with_capacity(lap_rows.len());
    for lap_row in &lap_rows {
        let lap_id = lap_row.try_get::<i64, _>(0)?;
        let mut lap = LapData::default();

        let sektor_rows = sqlx::query(
            "SELECT SektorTime.Time FROM SektorTime WHERE SektorTime.LapId = ? \
             ORDER BY SektorTime.SektorIndex ASC",
        )
        .bind(lap_id)
        .fetch_all(pool)
        .await?;
        for sektor_row in &sektor_rows {
            lap.add_sector_time(Timestamp::parse_or_default(
                &sektor_row.try_get::<String, _>(0)?,
            ));
        }

        let log_point_rows = sqlx::query(
            "SELECT LogPoint.Velocity, LogPoint.Longitude, LogPoint.Latitude, \
             LogPoint.Date, LogPoint.Time \
             FROM LogPoint WHERE LogPoint.LapId = ? ORDER BY LogPoint.Idx ASC",
        )
        .bind(lap_id)
        .fetch_all(pool)
        .await?;
        for log_point_row in &log_point_rows {
            let velocity = Velocity::from_mps(log_point_row.try_get::<f64, _>(0)?);
            let longitude = log_point_row.try_get::<f64, _>(1)? as f32;
            let latitude = log_point_row.try_get::<f64, _>(2)? as f32;
            let date = Date::parse_or_default(&log_point_row.try_get::<String, _>(3)?);
            let time = Timestamp::parse_or_default(&log_point_row.try_get::<String, _>(4)?);
            lap.add_position(GpsFix::new(
                Position::new(latitude, longitude),
                time,
                date,
                velocity,
            ));
        }

        laps.push(lap);
    }
    Ok(laps)
}
