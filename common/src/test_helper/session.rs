// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use super::track::get_oschersleben_track;
use crate::{
    date::Date,
    lap::LapData,
    position::{GpsFix, Position},
    session::SessionData,
    timestamp::Timestamp,
    velocity::Velocity,
};

/// A session on Oschersleben with one lap of four equal sector times and
/// two logged fixes.
pub fn get_session() -> SessionData {
    let sector_time = Timestamp::new(0, 0, 25, 144);
    let fix = GpsFix::new(
        Position::new(52.0, 11.0),
        Timestamp::default(),
        Date::new(1970, 1, 1),
        Velocity::from_mps(100.0),
    );
    let lap = LapData {
        sectors: vec![sector_time; 4],
        log_points: vec![fix, fix],
    };

    let mut session = SessionData::new(
        get_oschersleben_track(),
        Date::new(1970, 1, 1),
        Timestamp::new(13, 0, 0, 0),
    );
    session.add_lap(lap);
    session
}

/// A second session, one month later on the same track, without logged
/// fixes.
pub fn get_session2() -> SessionData {
    let sector_time = Timestamp::new(0, 0, 25, 144);
    let lap = LapData {
        sectors: vec![sector_time; 4],
        log_points: vec![],
    };

    let mut session = SessionData::new(
        get_oschersleben_track(),
        Date::new(1970, 2, 1),
        Timestamp::new(13, 0, 0, 0),
    );
    session.add_lap(lap);
    session
}
