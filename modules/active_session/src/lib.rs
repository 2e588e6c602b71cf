// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Active session workflow
//!
//! Binds the GPS stream, the lap timer and the session database into a
//! running session: fixes feed the timer and the open lap, finished
//! laps are pushed into the session and the session is stored on every
//! lap close.

use async_trait::async_trait;
use common::{
    lap::LapData, position::GpsFix, session::SessionData, timestamp::Timestamp, track::TrackData,
};
use laptimer::{LaptimerStatus, SimpleLaptimer};
use module_core::{EventKind, Module, ModuleCtx};
use std::sync::{Arc, RwLock};
use storage::SessionDatabase;
use tracing::{debug, error, info};

/// The live values of the running session, shared with the REST layer.
#[derive(Debug, Default, Clone)]
pub struct ActiveSessionState {
    pub track: Option<TrackData>,
    pub lap_count: usize,
    pub current_laptime: Timestamp,
    pub current_sector_time: Timestamp,
    pub last_laptime: Timestamp,
    pub last_sector_time: Timestamp,
}

/// Shared handle on the live session values.
pub type SharedActiveSessionState = Arc<RwLock<ActiveSessionState>>;

/// Drives one recording session.
///
/// The workflow owns the lap timer. Incoming fixes are forwarded to the
/// timer and, while a lap is open, appended to the lap under
/// construction. Sector and lap closures pull the timer's last sector
/// and lap times; every closed lap is pushed into the in-memory session
/// and the session is stored, which updates the stored row in place
/// thanks to the (date, time) lookup of the store.
pub struct ActiveSessionWorkflow {
    ctx: ModuleCtx,
    laptimer: SimpleLaptimer,
    database: Arc<SessionDatabase>,
    state: SharedActiveSessionState,
    session: Option<SessionData>,
    current_lap: LapData,
    lap_active: bool,
    latest_fix: Option<GpsFix>,
}

impl ActiveSessionWorkflow {
    pub fn new(ctx: ModuleCtx, laptimer: SimpleLaptimer, database: Arc<SessionDatabase>) -> Self {
        ActiveSessionWorkflow {
            ctx,
            laptimer,
            database,
            state: Arc::new(RwLock::new(ActiveSessionState::default())),
            session: None,
            current_lap: LapData::default(),
            lap_active: false,
            latest_fix: None,
        }
    }

    /// The shared live values, for the REST layer and other observers.
    pub fn state(&self) -> SharedActiveSessionState {
        self.state.clone()
    }

    /// Stores the track the timer is armed with on the next session
    /// start.
    pub fn set_track(&mut self, track: TrackData) {
        self.write_state(|state| state.track = Some(track));
    }

    /// Starts a fresh session.
    ///
    /// The timer is armed with the stored track and the session is
    /// stamped with the date and time of the current GPS fix.
    pub fn start_active_session(&mut self) {
        let track = self
            .read_state(|state| state.track.clone())
            .unwrap_or_default();
        self.laptimer.set_track(track.clone());
        let (date, time) = self
            .latest_fix
            .map(|fix| (fix.date, fix.time))
            .unwrap_or_default();
        info!(
            "Active session started on track {} at {} {}",
            track.name, date, time
        );
        self.session = Some(SessionData::new(track, date, time));
        self.current_lap = LapData::default();
        self.lap_active = false;
        self.write_state(|state| {
            state.lap_count = 0;
            state.current_laptime = Timestamp::default();
            state.current_sector_time = Timestamp::default();
        });
    }

    /// Stops the running session and drops the in-memory session.
    pub fn stop_active_session(&mut self) {
        info!("Active session stopped");
        self.session = None;
        self.current_lap = LapData::default();
        self.lap_active = false;
    }

    /// The in-memory session, if one is running.
    pub fn get_session(&self) -> Option<&SessionData> {
        self.session.as_ref()
    }

    /// Feeds one GPS fix into the running session.
    ///
    /// The fix drives the lap timer; while a lap is open it is appended
    /// to the lap under construction.
    pub fn update_position(&mut self, fix: &GpsFix) {
        self.latest_fix = Some(*fix);
        if self.session.is_none() {
            return;
        }

        let statuses = self.laptimer.update_position(fix);
        let current_laptime = self.laptimer.current_laptime();
        let current_sector_time = self.laptimer.current_sector_time();
        self.write_state(|state| {
            state.current_laptime = current_laptime;
            state.current_sector_time = current_sector_time;
        });

        for status in statuses {
            match status {
                LaptimerStatus::LapStarted => self.on_lap_started(),
                LaptimerStatus::SectorFinished(sector_time) => {
                    self.on_sector_finished(sector_time)
                }
                LaptimerStatus::LapFinished(laptime) => self.on_lap_finished(laptime),
            }
        }
        if self.lap_active {
            self.current_lap.add_position(*fix);
        }
    }

    fn on_lap_started(&mut self) {
        debug!("Lap started");
        self.current_lap = LapData::default();
        self.lap_active = true;
    }

    fn on_sector_finished(&mut self, sector_time: Timestamp) {
        if !self.lap_active {
            return;
        }
        self.current_lap.add_sector_time(sector_time);
        self.write_state(|state| state.last_sector_time = sector_time);
        info!(
            "Sector {} finished with {}",
            self.current_lap.sector_time_count(),
            sector_time
        );
    }

    fn on_lap_finished(&mut self, laptime: Timestamp) {
        let Some(session) = &mut self.session else {
            return;
        };

        // close the lap with the final sector time
        let sector_time = self.laptimer.last_sector_time();
        let mut lap = std::mem::take(&mut self.current_lap);
        lap.add_sector_time(sector_time);
        self.lap_active = false;
        session.add_lap(lap);

        // the store updates in place for a known (date, time) pair
        let _ = self.database.store_session(session);

        let lap_count = session.lap_count();
        self.write_state(|state| {
            state.last_sector_time = sector_time;
            state.last_laptime = laptime;
            state.lap_count = lap_count;
        });
        info!("Lap {} finished with {}", lap_count, laptime);
    }

    fn read_state<R>(&self, read: impl FnOnce(&ActiveSessionState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        read(&state)
    }

    fn write_state(&self, write: impl FnOnce(&mut ActiveSessionState)) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        write(&mut state);
    }
}

#[async_trait]
impl Module for ActiveSessionWorkflow {
    async fn run(&mut self) -> Result<(), ()> {
        let mut run = true;
        while run {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            match event.kind {
                                EventKind::QuitEvent => run = false,
                                EventKind::GpsFixEvent(fix) => self.update_position(&fix),
                                EventKind::TrackDetectedEvent(track) => {
                                    self.set_track((*track).clone());
                                }
                                EventKind::ActiveSessionStartEvent => self.start_active_session(),
                                EventKind::ActiveSessionStopEvent => self.stop_active_session(),
                                _ => (),
                            }
                        }
                        Err(e) => {
                            error!("Failed to receive event in module ActiveSession. Error: {e}");
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
