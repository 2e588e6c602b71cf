// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{
    date::Date, position::GpsFix, position::Position, timestamp::Timestamp, velocity::Velocity,
};

/// A position on the Oschersleben camp site, roughly 150 m from the
/// finish line.
pub fn get_oschersleben_camp_position() -> Position {
    Position::new(52.0258333, 11.279166)
}

/// Approach/depart quartet over the Oschersleben start/finish line,
/// oldest point first.
pub fn get_finishline_quartet() -> [Position; 4] {
    [
        Position::new(52.0270444, 11.2805431),
        Position::new(52.0270730, 11.2804234),
        Position::new(52.0271084, 11.2802563),
        Position::new(52.0271438, 11.2800835),
    ]
}

/// Approach/depart quartet over the first Oschersleben sector point,
/// oldest point first.
pub fn get_sector1_quartet() -> [Position; 4] {
    [
        Position::new(52.029819, 11.274203),
        Position::new(52.029821, 11.274193),
        Position::new(52.029821, 11.274169),
        Position::new(52.029822, 11.274149),
    ]
}

/// Approach/depart quartet over the second Oschersleben sector point,
/// oldest point first.
pub fn get_sector2_quartet() -> [Position; 4] {
    [
        Position::new(52.029970, 11.277183),
        Position::new(52.029968, 11.277193),
        Position::new(52.029967, 11.277212),
        Position::new(52.029966, 11.277218),
    ]
}

/// Stamps a position quartet into fixes one second apart, starting at
/// `first_fix_time`.
pub fn quartet_as_fixes(quartet: [Position; 4], first_fix_time: Timestamp) -> [GpsFix; 4] {
    let date = Date::new(1970, 1, 1);
    let velocity = Velocity::from_kmh(120.0);
    let second = Timestamp::new(0, 0, 1, 0);
    let mut time = first_fix_time;
    quartet.map(|position| {
        let fix = GpsFix::new(position, time, date, velocity);
        time = time + second;
        fix
    })
}
