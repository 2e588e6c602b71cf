// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::Utc;
use common::position::{GpsFix, Position};
use common::velocity::Velocity;
use module_core::{Event, EventKind, Module, ModuleCtx, timer::Timer};
use std::io::{Error, ErrorKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use utm::{lat_lon_to_zone_number, lat_to_zone_letter, to_utm_wgs84, wsg84_utm_to_lat_lon};

/// A GPS source that replays positions at a constant frequency.
///
/// The source interpolates along the closed loop of the configured
/// positions with the configured velocity and publishes one
/// `GpsFixEvent` per tick, stamped with the current UTC time.
pub struct ConstantGpsSource {
    ctx: ModuleCtx,
    config: Arc<ConstantGpsSourceConfig>,
}

#[derive(Clone)]
struct ConstantGpsSourceConfig {
    points: Vec<UtmPoint>,
    velocity: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct UtmPoint {
    northing: f64,
    easting: f64,
    zone: u8,
    zone_letter: char,
}

impl ConstantGpsSource {
    /// Interval between two published fixes.
    pub const POSITION_INTERVAL: Duration = Duration::from_millis(100);

    /// Creates a source replaying `positions` as a closed loop with
    /// `velocity` meters per second.
    pub fn new(ctx: ModuleCtx, positions: &[Position], velocity: f64) -> Result<Self, Error> {
        if positions.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "positions parameter is empty",
            ));
        }
        let points = convert_track_points(positions)?;
        Ok(ConstantGpsSource {
            ctx,
            config: Arc::new(ConstantGpsSourceConfig {
                points,
                velocity,
            }),
        })
    }
}

#[async_trait::async_trait]
impl Module for ConstantGpsSource {
    async fn run(&mut self) -> Result<(), ()> {
        let config = self.config.clone();
        let sender = self.ctx.sender.clone();
        let position_task = tokio::spawn(async move {
            constant_position_task(sender, config).await;
        });

        let mut run = true;
        while run {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            if let EventKind::QuitEvent = event.kind {
                                position_task.abort();
                                run = false;
                            }
                        }
                        Err(e) => error!("Failed to receive event in GPS source. Error: {e}"),
                    }
                }
            }
        }
        Ok(())
    }
}

async fn constant_position_task(
    sender: tokio::sync::broadcast::Sender<Event>,
    config: Arc<ConstantGpsSourceConfig>,
) {
    let mut timer = Timer::new();
    timer.set_interval(ConstantGpsSource::POSITION_INTERVAL);
    let mut runtime = ConstantGpsSourceRuntime {
        points: config.points.clone(),
        target: if config.points.len() > 1 { 1 } else { 0 },
        current: config.points[0],
        velocity: config.velocity,
        sender,
    };
    loop {
        timer.tick().await;
        runtime.handle_tick();
    }
}

struct ConstantGpsSourceRuntime {
    points: Vec<UtmPoint>,
    target: usize,
    current: UtmPoint,
    velocity: f64,
    sender: tokio::sync::broadcast::Sender<Event>,
}

impl ConstantGpsSourceRuntime {
    /// Advances along the loop by one tick worth of travel and
    /// publishes the reached position.
    fn handle_tick(&mut self) {
        let elapsed = ConstantGpsSource::POSITION_INTERVAL.as_secs_f64();
        let mut travel = self.velocity * elapsed;
        while travel > 0.0 {
            let target = self.points[self.target];
            let dx = target.easting - self.current.easting;
            let dy = target.northing - self.current.northing;
            let remaining = (dx * dx + dy * dy).sqrt();
            if remaining <= travel {
                self.current = target;
                self.target = (self.target + 1) % self.points.len();
                travel -= remaining;
                if remaining == 0.0 {
                    break;
                }
            } else {
                self.current.easting += dx / remaining * travel;
                self.current.northing += dy / remaining * travel;
                travel = 0.0;
            }
        }
        self.publish_current();
    }

    fn publish_current(&self) {
        let Ok((latitude, longitude)) = wsg84_utm_to_lat_lon(
            self.current.easting,
            self.current.northing,
            self.current.zone,
            self.current.zone_letter,
        ) else {
            error!("Failed to convert UTM point back to WGS84");
            return;
        };

        let now = Utc::now();
        let fix = GpsFix::new(
            Position::new(latitude as f32, longitude as f32),
            now.time().into(),
            now.date_naive().into(),
            Velocity::from_mps(self.velocity),
        );
        let _ = self.sender.send(Event {
            kind: EventKind::GpsFixEvent(Arc::new(fix)),
        });
    }
}

fn convert_track_points(positions: &[Position]) -> Result<Vec<UtmPoint>, Error> {
    let mut points = Vec::with_capacity(positions.len());
    for position in positions {
        let latitude = f64::from(position.latitude);
        let longitude = f64::from(position.longitude);
        let zone = lat_lon_to_zone_number(latitude, longitude);
        let Some(zone_letter) = lat_to_zone_letter(latitude) else {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "Position lat: {latitude}, long: {longitude} can't be converted to an UTM zone"
                ),
            ));
        };
        let (northing, easting, _) = to_utm_wgs84(latitude, longitude, zone);
        points.push(UtmPoint {
            northing,
            easting,
            zone,
            zone_letter,
        });
    }
    Ok(points)
}
