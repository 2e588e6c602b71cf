// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::passed_point;
use common::position::Position;
use common::test_helper::{positions, track};
use std::collections::VecDeque;

fn as_history(quartet: [Position; 4]) -> VecDeque<Position> {
    // the history is kept newest first
    let mut history = VecDeque::with_capacity(4);
    for pos in quartet {
        history.push_front(pos);
    }
    history
}

#[test]
fn detects_an_approach_and_depart_crossing() {
    let finishline = track::get_oschersleben_track().finishline;
    let history = as_history(positions::get_finishline_quartet());
    assert!(passed_point(&history, &finishline));
}

#[test]
fn requires_four_positions() {
    let finishline = track::get_oschersleben_track().finishline;
    let mut history = as_history(positions::get_finishline_quartet());
    history.pop_back();
    assert!(!passed_point(&history, &finishline));
}

#[test]
fn rejects_positions_outside_the_crossing_range() {
    // the camp site is about 150m away from the finish line
    let camp = positions::get_oschersleben_camp_position();
    let history = as_history(positions::get_finishline_quartet());
    assert!(!passed_point(&history, &camp));
}

#[test]
fn rejects_a_monotone_approach() {
    let quartet = positions::get_finishline_quartet();
    // heading for the line without ever crossing it
    let history = as_history([quartet[0], quartet[0], quartet[1], quartet[1]]);
    let finishline = track::get_oschersleben_track().finishline;
    assert!(!passed_point(&history, &finishline));
}

#[test]
fn rejects_a_stall_on_the_line() {
    let quartet = positions::get_finishline_quartet();
    // the two middle samples sit on the same spot
    let history = as_history([quartet[0], quartet[1], quartet[1], quartet[3]]);
    let finishline = track::get_oschersleben_track().finishline;
    assert!(!passed_point(&history, &finishline));
}
