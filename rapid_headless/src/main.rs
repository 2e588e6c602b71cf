// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use active_session::ActiveSessionWorkflow;
use anyhow::{Context, bail};
use clap::Parser;
use common::position::Position;
use dirs::data_local_dir;
use gnss::ConstantGpsSource;
use laptimer::SimpleLaptimer;
use module_core::{Event, EventBus, EventKind, Module};
use rest::{Rest, RestServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use storage::{ConnectionCache, SessionDatabase, TrackDatabase};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use track_detection::TrackDetectionWorkflow;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path of the session and track database.
    #[arg(short = 'b', long)]
    database: Option<PathBuf>,
    /// Port of the REST server.
    #[arg(short, long, default_value_t = 27018)]
    port: u16,
    /// Replay the positions of a CSV file instead of using a receiver.
    #[arg(short, long)]
    gps_fake: bool,
    /// CSV file with the positions for the fake GPS source.
    #[arg(short = 'f', long)]
    gps_source_file: Option<PathBuf>,
    /// Velocity of the fake GPS source in m/s.
    #[arg(short = 'v', long, default_value_t = 40.0)]
    gps_fake_velocity: f64,
}

fn read_lap_points_from_file(file_path: &PathBuf) -> anyhow::Result<Vec<Position>> {
    let mut reader = csv::Reader::from_path(file_path)
        .with_context(|| format!("Failed to open GPS source file {}", file_path.display()))?;
    let mut positions = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to read GPS source record")?;
        let longitude: f32 = record
            .get(0)
            .context("GPS source record misses the longitude")?
            .parse()?;
        let latitude: f32 = record
            .get(1)
            .context("GPS source record misses the latitude")?
            .parse()?;
        positions.push(Position::new(latitude, longitude));
    }
    debug!("Loaded {} positions from the GPS source file", positions.len());
    Ok(positions)
}

fn database_file(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(database) = &cli.database {
        return Ok(database.clone());
    }
    let mut storage_dir = data_local_dir().context("Could not determine local data directory")?;
    storage_dir.push("rapid");
    std::fs::create_dir_all(&storage_dir)
        .with_context(|| format!("Failed to create data directory {}", storage_dir.display()))?;
    Ok(storage_dir.join("rapid.db"))
}

/// Publishes the session start once the circuit is known.
///
/// Detection keeps running until the first match; afterwards it is
/// stopped and the active session starts on the detected track.
async fn supervise_session_start(event_bus: &EventBus) {
    let mut receiver = event_bus.subscribe();
    while let Ok(event) = receiver.recv().await {
        if let EventKind::TrackDetectedEvent(track) = event.kind {
            info!("Starting active session on {}", track.name);
            event_bus.publish(&Event {
                kind: EventKind::TrackDetectionStopEvent,
            });
            event_bus.publish(&Event {
                kind: EventKind::ActiveSessionStartEvent,
            });
            break;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let event_bus = EventBus::default();
    let mut gps_source: Box<dyn Module> = if cli.gps_fake {
        let Some(source_file) = &cli.gps_source_file else {
            bail!("--gps-fake requires --gps-source-file");
        };
        let positions = read_lap_points_from_file(source_file)?;
        Box::new(ConstantGpsSource::new(
            event_bus.context(),
            &positions,
            cli.gps_fake_velocity,
        )?)
    } else {
        bail!("No GPS source specified. Use --gps-fake with --gps-source-file");
    };

    let db_file = database_file(&cli)?;
    info!("Using database {}", db_file.display());
    let cache = ConnectionCache::new();
    let connection = cache
        .connection(&db_file)
        .await
        .context("Failed to open the database")?;
    storage::run_migrations(connection.pool())
        .await
        .context("Failed to apply the database schema")?;
    drop(connection);

    let session_db = Arc::new(
        SessionDatabase::new(&cache, &db_file, event_bus.context())
            .await
            .context("Failed to open the session database")?,
    );
    let track_db = TrackDatabase::new(&cache, &db_file, event_bus.context())
        .await
        .context("Failed to open the track database")?;

    let mut track_detection = TrackDetectionWorkflow::new(event_bus.context());
    match track_db.get_tracks().await {
        Ok(tracks) => {
            info!("Loaded {} tracks for detection", tracks.len());
            track_detection.set_tracks(tracks);
        }
        Err(e) => error!("Failed to load stored tracks: {e}"),
    }
    track_detection.start_detection();

    let mut active_session = ActiveSessionWorkflow::new(
        event_bus.context(),
        SimpleLaptimer::new(event_bus.context()),
        session_db.clone(),
    );
    let mut rest = Rest::new(
        event_bus.context(),
        session_db.clone(),
        active_session.state(),
        RestServerConfig {
            port: cli.port,
            ..RestServerConfig::default()
        },
    );

    let shutdown_sender = event_bus.context().sender.clone();
    ctrlc::set_handler(move || {
        let _ = shutdown_sender.send(Event {
            kind: EventKind::QuitEvent,
        });
    })
    .context("Failed to install the shutdown handler")?;

    info!("Starting modules...");
    let (gps_result, ..) = tokio::join!(
        gps_source.run(),
        track_detection.run(),
        active_session.run(),
        rest.run(),
        supervise_session_start(&event_bus),
    );
    if gps_result.is_err() {
        bail!("The GPS source terminated with an error");
    }
    Ok(())
}
