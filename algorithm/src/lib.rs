// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Geometry and classification primitives of the timing engine.
//!
//! Provides the planar distance approximation, the four-point
//! line-crossing predicate used by the lap timer and the track
//! detection classifier.

use common::position::Position;
use common::track::TrackData;
use std::collections::VecDeque;

/// Calculates the approximate distance in meters between two geographic
/// positions.
///
/// This function uses a simplified equirectangular approximation to
/// determine the distance between two latitude/longitude points. It
/// assumes that the Earth's surface is locally flat, making it suitable
/// only for relatively short distances (up to one or two kilometers).
///
/// # Parameters
/// - `pos1`: Reference to the first geographic position.
/// - `pos2`: Reference to the second geographic position.
///
/// # Returns
/// The calculated distance between `pos1` and `pos2` in meters as `f64`.
///
/// # Notes
/// - The function expects latitude and longitude values in **degrees**.
/// - Accuracy decreases over long distances or near the poles.
pub fn calculate_distance(pos1: &Position, pos2: &Position) -> f64 {
    let lat = f64::from(pos1.latitude + pos2.latitude) / 2.0 * 0.01745;
    let dx = 111300.0 * lat.cos() * f64::from(pos1.longitude - pos2.longitude);
    let dy = 111300.0 * f64::from(pos1.latitude - pos2.latitude);
    (dx * dx + dy * dy).sqrt()
}

/// The distance in meters every buffered position has to stay within for
/// a crossing of that point to count.
const CROSSING_RANGE: f64 = 50.0;

/// Detects whether a position marker (start line, sector point or finish
/// line) has just been crossed.
///
/// `last_positions` holds the most recent positions newest first; the
/// predicate needs at least four of them. A crossing is reported when
/// all four lie within 50 m of `point` and the distance sequence first
/// approaches the point and then moves away:
/// the two oldest samples close in (`d2 < d3`), the two newest recede
/// (`d0 > d1`) and the middle pair does not stall on the line
/// (`d1 != d2`).
pub fn passed_point(last_positions: &VecDeque<Position>, point: &Position) -> bool {
    if last_positions.len() < 4 {
        return false;
    }

    let mut distances = Vec::<f64>::with_capacity(4);
    let in_range = last_positions.iter().take(4).all(|pos| {
        let distance = calculate_distance(pos, point);
        distances.push(distance);
        distance <= CROSSING_RANGE
    });
    if !in_range {
        return false;
    }

    let receding = distances[0] > distances[1];
    let approaching = distances[2] < distances[3];
    receding && approaching && distances[1] != distances[2]
}

/// Classifies whether a position is on one of the known circuits.
///
/// A track matches when the position lies within the detection radius of
/// the track's finish line. Sector geometry is not considered.
#[derive(Debug, Clone, Copy)]
pub struct TrackDetection {
    detection_radius: u16,
}

impl TrackDetection {
    /// The detection radius used when none is configured.
    pub const DEFAULT_RADIUS: u16 = 500;

    /// Creates a classifier with the given detection radius in meters.
    pub fn new(detection_radius: u16) -> Self {
        TrackDetection { detection_radius }
    }

    /// True when `position` lies within the detection radius of the
    /// track's finish line.
    pub fn is_on_track(&self, track: &TrackData, position: &Position) -> bool {
        calculate_distance(&track.finishline, position) <= f64::from(self.detection_radius)
    }
}

impl Default for TrackDetection {
    fn default() -> Self {
        TrackDetection::new(TrackDetection::DEFAULT_RADIUS)
    }
}

#[cfg(test)]
mod tests;
