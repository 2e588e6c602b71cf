// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! REST module
//!
//! Serves the engine's HTTP/JSON surface: stored sessions, the live
//! values of the active session and the GPS ingest endpoint.

use active_session::SharedActiveSessionState;
use common::date::Date;
use common::position::{GpsFix, Position};
use common::timestamp::Timestamp;
use common::velocity::Velocity;
use module_core::async_result::AsyncState;
use module_core::{Event, EventKind, Module, ModuleCtx};
use rocket::http::Status;
use rocket::response::content;
use rocket::serde::{Deserialize, Serialize, json::Json};
use rocket::{Shutdown, State};
use std::net::Ipv4Addr;
use std::sync::Arc;
use storage::{SessionDatabase, StorageError};
use tracing::{debug, error, info};

#[macro_use]
extern crate rocket;

/// Listen address and port of the REST server.
///
/// The embedding program decides both; the default is every interface
/// on port 27018.
#[derive(Debug, Clone)]
pub struct RestServerConfig {
    pub address: String,
    pub port: u16,
}

impl Default for RestServerConfig {
    fn default() -> Self {
        RestServerConfig {
            address: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 27018,
        }
    }
}

/// Shared state of the route handlers.
struct RestState {
    database: Arc<SessionDatabase>,
    active_session: SharedActiveSessionState,
    sender: tokio::sync::broadcast::Sender<Event>,
}

/// The REST module: a rocket server plus the bus loop that shuts it
/// down on a quit event.
pub struct Rest {
    ctx: ModuleCtx,
    state: Arc<RestState>,
    config: RestServerConfig,
}

impl Rest {
    pub fn new(
        ctx: ModuleCtx,
        database: Arc<SessionDatabase>,
        active_session: SharedActiveSessionState,
        config: RestServerConfig,
    ) -> Self {
        let sender = ctx.sender.clone();
        Rest {
            ctx,
            state: Arc::new(RestState {
                database,
                active_session,
                sender,
            }),
            config,
        }
    }
}

#[async_trait::async_trait]
impl Module for Rest {
    /// Runs the REST server until a quit event arrives.
    ///
    /// The rocket instance is launched on its own task; the module loop
    /// waits for `QuitEvent` and shuts the server down gracefully.
    async fn run(&mut self) -> Result<(), ()> {
        let rocket = match launch_rest_server(self.state.clone(), &self.config).await {
            Ok(rocket) => rocket,
            Err(e) => {
                error!("Failed to launch REST server: {}", e);
                return Err(());
            }
        };
        let shutdown: Shutdown = rocket.shutdown();
        let server_handle = tokio::spawn(async move {
            if let Err(e) = rocket.launch().await {
                error!("Rocket server failed: {}", e);
            } else {
                info!("Rocket server terminated gracefully.");
            }
        });

        loop {
            match self.ctx.receiver.recv().await {
                Ok(event) => {
                    if let EventKind::QuitEvent = event.kind {
                        info!("Shutting down REST module and server.");
                        shutdown.notify();
                        tokio::join!(server_handle)
                            .0
                            .map_err(|e| error!("Error while shutting down server: {}", e))?;
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to receive event in REST module. Error: {}", e);
                }
            }
        }
        Ok(())
    }
}

/// Response body of `GET /sessions`.
#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
struct SessionCountResponse {
    count: usize,
}

/// Gives the number of stored sessions.
#[get("/sessions")]
fn get_session_count(state: &State<Arc<RestState>>) -> Json<SessionCountResponse> {
    Json(SessionCountResponse {
        count: state.database.get_session_count(),
    })
}

/// Maps a failed storage result onto the HTTP status.
///
/// An unknown index is a 404; every other storage failure surfaces as a
/// server error with an empty body. The comparison is anchored to the
/// message [`StorageError::NotFound`] completes its results with.
fn storage_error_status(error_message: Option<String>) -> Status {
    if error_message == Some(StorageError::NotFound.to_string()) {
        Status::NotFound
    } else {
        Status::InternalServerError
    }
}

/// Gives the full session data under the index.
#[get("/sessions/<index>/data")]
async fn get_session_data(
    index: usize,
    state: &State<Arc<RestState>>,
) -> Result<content::RawJson<String>, Status> {
    let result = state.database.get_session_by_index_async(index);
    if result.wait_for_finished().await != AsyncState::Ok {
        let error_message = result.error_message();
        error!("Failed to load session {}: {:?}", index, error_message);
        return Err(storage_error_status(error_message));
    }
    let session = result.value().ok_or(Status::InternalServerError)?;
    match session.to_json() {
        Ok(json) => Ok(content::RawJson(json)),
        Err(e) => {
            error!("Failed to serialize session to JSON: {}", e);
            Err(Status::InternalServerError)
        }
    }
}

/// Gives the metadata of the session under the index.
#[get("/sessions/<index>/metadata")]
async fn get_session_metadata(
    index: usize,
    state: &State<Arc<RestState>>,
) -> Result<content::RawJson<String>, Status> {
    let result = state.database.get_session_meta_by_index_async(index);
    if result.wait_for_finished().await != AsyncState::Ok {
        let error_message = result.error_message();
        error!(
            "Failed to load session metadata {}: {:?}",
            index, error_message
        );
        return Err(storage_error_status(error_message));
    }
    let meta = result.value().ok_or(Status::InternalServerError)?;
    match meta.to_json() {
        Ok(json) => Ok(content::RawJson(json)),
        Err(e) => {
            error!("Failed to serialize session metadata to JSON: {}", e);
            Err(Status::InternalServerError)
        }
    }
}

/// Deletes the session under the index.
#[delete("/sessions/<index>")]
async fn delete_session(index: usize, state: &State<Arc<RestState>>) -> Status {
    match state.database.delete_session(index).await {
        Ok(()) => {
            debug!("Session {} deleted successfully", index);
            Status::NoContent
        }
        Err(StorageError::NotFound) => Status::NotFound,
        Err(e) => {
            error!("Failed to delete session {}: {}", index, e);
            Status::InternalServerError
        }
    }
}

/// Request body of `POST /gps`: one position update with stringified
/// coordinates.
#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
struct GpsUpdateBody {
    latitude: String,
    longitude: String,
    date: String,
    time: String,
}

/// Accepts a GPS position update and feeds it into the engine.
#[post("/gps", data = "<body>")]
fn post_gps(body: Json<GpsUpdateBody>, state: &State<Arc<RestState>>) -> Status {
    let (Ok(latitude), Ok(longitude)) = (body.latitude.parse(), body.longitude.parse()) else {
        error!(
            "Discarding GPS update with invalid position: {:?}, {:?}",
            body.latitude, body.longitude
        );
        return Status::BadRequest;
    };
    let (Ok(time), Ok(date)) = (
        body.time.parse::<Timestamp>(),
        body.date.parse::<Date>(),
    ) else {
        error!(
            "Discarding GPS update with invalid date or time: {:?}, {:?}",
            body.date, body.time
        );
        return Status::BadRequest;
    };

    let fix = GpsFix::new(
        Position::new(latitude, longitude),
        time,
        date,
        Velocity::default(),
    );
    let _ = state.sender.send(Event {
        kind: EventKind::GpsFixEvent(Arc::new(fix)),
    });
    Status::Ok
}

/// Gives the track of the active session.
#[get("/activeSession/track")]
fn get_active_session_track(state: &State<Arc<RestState>>) -> Option<content::RawJson<String>> {
    let active_session = state
        .active_session
        .read()
        .unwrap_or_else(|e| e.into_inner());
    let track = active_session.track.as_ref()?;
    match serde_json::to_string(track) {
        Ok(json) => Some(content::RawJson(json)),
        Err(e) => {
            error!("Failed to serialize active session track: {}", e);
            None
        }
    }
}

/// Response body of `GET /activeSession/lap`: the live lap values.
#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
struct ActiveLapResponse {
    #[serde(rename = "lapCount")]
    lap_count: usize,
    #[serde(rename = "currentLap")]
    current_lap: String,
    #[serde(rename = "currentSector")]
    current_sector: String,
    #[serde(rename = "lastLap")]
    last_lap: String,
    #[serde(rename = "lastSector")]
    last_sector: String,
}

/// Gives the lap counters and clocks of the active session.
#[get("/activeSession/lap")]
fn get_active_session_lap(state: &State<Arc<RestState>>) -> Json<ActiveLapResponse> {
    let active_session = state
        .active_session
        .read()
        .unwrap_or_else(|e| e.into_inner());
    Json(ActiveLapResponse {
        lap_count: active_session.lap_count,
        current_lap: active_session.current_laptime.to_string(),
        current_sector: active_session.current_sector_time.to_string(),
        last_lap: active_session.last_laptime.to_string(),
        last_sector: active_session.last_sector_time.to_string(),
    })
}

/// Configures and ignites the rocket server.
async fn launch_rest_server(
    state: Arc<RestState>,
    config: &RestServerConfig,
) -> Result<rocket::Rocket<rocket::Ignite>, rocket::Error> {
    let figment = rocket::Config::figment()
        .merge(("address", config.address.clone()))
        .merge(("port", config.port))
        .merge(("log_level", "critical"))
        .merge(("cli_colors", false));

    rocket::custom(figment)
        .mount(
            "/",
            rocket::routes![
                get_session_count,
                get_session_data,
                get_session_metadata,
                delete_session,
                post_gps,
                get_active_session_track,
                get_active_session_lap,
            ],
        )
        .manage(state)
        .ignite()
        .await
}
