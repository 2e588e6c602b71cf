// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Laptimer module
//!
//! Consumes GPS fixes, detects line crossings against the armed track
//! and publishes the lap and sector timing signals on the event bus.

use algorithm::passed_point;
use common::position::{GpsFix, Position};
use common::timestamp::Timestamp;
use common::track::TrackData;
use module_core::{Event, EventKind, Module, ModuleCtx};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Status updates produced by the lap timer while processing a fix.
///
/// The same transitions are published on the event bus; the returned
/// statuses let an owner of the timer react synchronously with the fix
/// that caused them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LaptimerStatus {
    /// A new lap has started.
    LapStarted,

    /// A sector has been completed, carries the sector time.
    SectorFinished(Timestamp),

    /// A lap has finished, carries the lap time.
    LapFinished(Timestamp),
}

/// Internal finite state machine (FSM) state of the lap timer.
///
/// The lap timer transitions through these states while processing GPS
/// fixes.
#[derive(Clone, Copy, Debug, PartialEq)]
enum LaptimerState {
    /// Waiting for the vehicle to cross the start line for the first time.
    WaitingForFirstStart,

    /// Actively iterating over the section points to measure sector times.
    IteratingTrackPoints,

    /// Waiting for the vehicle to cross the finish line after the last
    /// section point.
    WaitingForFinish,
}

/// A lap timer that derives lap and sector times from the timestamps of
/// the incoming GPS fixes.
///
/// The timer is a pure function of its inputs: fixes that fail the
/// crossing gates are ignored, there is no failure state. Signals are
/// published on the event bus of the [`ModuleCtx`]:
/// `LapStartedEvent`, `SectorFinishedEvent`, `LapFinishedEvent` and the
/// value changes of the two running clocks. When a lap closes
/// back-to-back the finished lap is signalled before the started one.
#[derive(Debug)]
pub struct SimpleLaptimer {
    track: Option<TrackData>,
    last_positions: VecDeque<Position>,
    state: LaptimerState,
    current_section: usize,
    lap_started_at: Timestamp,
    sector_started_at: Timestamp,
    current_laptime: Timestamp,
    current_sector_time: Timestamp,
    last_laptime: Timestamp,
    last_sector_time: Timestamp,
    module_ctx: ModuleCtx,
}

impl SimpleLaptimer {
    pub fn new(ctx: ModuleCtx) -> Self {
        SimpleLaptimer {
            track: None,
            last_positions: VecDeque::with_capacity(4),
            state: LaptimerState::WaitingForFirstStart,
            current_section: 0,
            lap_started_at: Timestamp::default(),
            sector_started_at: Timestamp::default(),
            current_laptime: Timestamp::default(),
            current_sector_time: Timestamp::default(),
            last_laptime: Timestamp::default(),
            last_sector_time: Timestamp::default(),
            module_ctx: ctx,
        }
    }

    /// Arms the timer with a track. The next crossing of the track's
    /// start line starts the first lap.
    pub fn set_track(&mut self, track: TrackData) {
        info!("Laptimer armed for track {}", track.name);
        self.track = Some(track);
        self.state = LaptimerState::WaitingForFirstStart;
        self.current_section = 0;
        self.last_positions.clear();
    }

    /// The time of the last finished lap.
    pub fn last_laptime(&self) -> Timestamp {
        self.last_laptime
    }

    /// The time of the last finished sector.
    pub fn last_sector_time(&self) -> Timestamp {
        self.last_sector_time
    }

    /// The running clock of the open lap.
    pub fn current_laptime(&self) -> Timestamp {
        self.current_laptime
    }

    /// The running clock of the open sector.
    pub fn current_sector_time(&self) -> Timestamp {
        self.current_sector_time
    }

    /// Updates the lap timer with a new GPS fix.
    ///
    /// The fix position enters the crossing history; once four positions
    /// are buffered the running clocks are refreshed from the fix time
    /// and the FSM checks for a line crossing. The statuses produced by
    /// the fix are returned in emission order.
    pub fn update_position(&mut self, fix: &GpsFix) -> Vec<LaptimerStatus> {
        let mut statuses = Vec::new();
        if self.last_positions.len() == 4 {
            self.last_positions.pop_back();
        }
        self.last_positions.push_front(fix.position);
        if self.last_positions.len() < 4 || self.track.is_none() {
            return statuses;
        }

        if self.state != LaptimerState::WaitingForFirstStart {
            self.set_current_laptime(fix.time - self.lap_started_at);
            self.set_current_sector_time(fix.time - self.sector_started_at);
        }

        match self.state {
            LaptimerState::WaitingForFirstStart => self.handle_first_start(fix, &mut statuses),
            LaptimerState::IteratingTrackPoints => self.handle_track_points(fix, &mut statuses),
            LaptimerState::WaitingForFinish => self.handle_finish(fix, &mut statuses),
        }
        statuses
    }

    fn handle_first_start(&mut self, fix: &GpsFix, statuses: &mut Vec<LaptimerStatus>) {
        let Some(track) = &self.track else { return };
        let start_line = if track.has_startline() {
            track.startline
        } else {
            track.finishline
        };
        let section_count = track.section_count();
        if !passed_point(&self.last_positions, &start_line) {
            return;
        }

        self.state = if section_count > 0 {
            LaptimerState::IteratingTrackPoints
        } else {
            LaptimerState::WaitingForFinish
        };
        self.current_section = 0;
        self.start_lap_clocks(fix.time);
        debug!("First start line crossing at {}", fix.time);
        self.publish(EventKind::LapStartedEvent);
        statuses.push(LaptimerStatus::LapStarted);
    }

    fn handle_track_points(&mut self, fix: &GpsFix, statuses: &mut Vec<LaptimerStatus>) {
        let Some(track) = &self.track else { return };
        let section = track.sections[self.current_section];
        let section_count = track.section_count();
        if !passed_point(&self.last_positions, &section) {
            return;
        }

        self.current_section += 1;
        if self.current_section >= section_count {
            self.state = LaptimerState::WaitingForFinish;
        }
        self.last_sector_time = self.current_sector_time;
        self.sector_started_at = fix.time;
        self.set_current_sector_time(Timestamp::default());
        debug!("Sector finished with {}", self.last_sector_time);
        self.publish(EventKind::SectorFinishedEvent(Arc::new(
            self.last_sector_time,
        )));
        statuses.push(LaptimerStatus::SectorFinished(self.last_sector_time));
    }

    fn handle_finish(&mut self, fix: &GpsFix, statuses: &mut Vec<LaptimerStatus>) {
        let Some(track) = &self.track else { return };
        let finishline = track.finishline;
        let section_count = track.section_count();
        if !passed_point(&self.last_positions, &finishline) {
            return;
        }

        self.last_laptime = self.current_laptime;
        self.last_sector_time = self.current_sector_time;
        self.start_lap_clocks(fix.time);
        if section_count > 0 {
            self.current_section = 0;
            self.state = LaptimerState::IteratingTrackPoints;
        } else {
            self.last_positions.clear();
        }
        debug!("Lap finished with {}", self.last_laptime);
        self.publish(EventKind::LapFinishedEvent(Arc::new(self.last_laptime)));
        self.publish(EventKind::LapStartedEvent);
        statuses.push(LaptimerStatus::LapFinished(self.last_laptime));
        statuses.push(LaptimerStatus::LapStarted);
    }

    fn start_lap_clocks(&mut self, started_at: Timestamp) {
        self.lap_started_at = started_at;
        self.sector_started_at = started_at;
        self.set_current_laptime(Timestamp::default());
        self.set_current_sector_time(Timestamp::default());
    }

    fn set_current_laptime(&mut self, laptime: Timestamp) {
        if self.current_laptime != laptime {
            self.current_laptime = laptime;
            self.publish(EventKind::CurrentLaptimeEvent(Arc::new(laptime)));
        }
    }

    fn set_current_sector_time(&mut self, sector_time: Timestamp) {
        if self.current_sector_time != sector_time {
            self.current_sector_time = sector_time;
            self.publish(EventKind::CurrentSectorTimeEvent(Arc::new(sector_time)));
        }
    }

    fn publish(&self, kind: EventKind) {
        let _ = self.module_ctx.sender.send(Event { kind });
    }
}

#[async_trait::async_trait]
impl Module for SimpleLaptimer {
    async fn run(&mut self) -> Result<(), ()> {
        let mut run = true;
        while run {
            tokio::select! {
                event = self.module_ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            match event.kind {
                                EventKind::QuitEvent => run = false,
                                EventKind::GpsFixEvent(fix) => {
                                    self.update_position(&fix);
                                }
                                EventKind::TrackDetectedEvent(track) => {
                                    self.set_track((*track).clone());
                                }
                                _ => (),
                            }
                        }
                        Err(e) => tracing::error!("Failed to receive event in laptimer module. Error: {e}"),
                    }
                }
            }
        }
        Ok(())
    }
}
