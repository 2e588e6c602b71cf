// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{position::GpsFix, timestamp::Timestamp};
use serde::{Deserialize, Serialize};

/// Represents a single lap: the ordered sector times that make it up and
/// the fixes logged while the lap was open.
///
/// A lap of a track with `N` section points carries `N + 1` sector times
/// once finished. The laptime is the wrapping sum of the sector times.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LapData {
    pub sectors: Vec<Timestamp>,
    pub log_points: Vec<GpsFix>,
}

impl LapData {
    /// Calculates the total lap time by summing all sector times.
    /// The addition wraps around midnight like all timestamp arithmetic.
    pub fn laptime(&self) -> Timestamp {
        self.sectors
            .iter()
            .fold(Timestamp::default(), |laptime, sector| laptime + *sector)
    }

    /// Appends a sector time to the lap.
    pub fn add_sector_time(&mut self, sector_time: Timestamp) {
        self.sectors.push(sector_time);
    }

    /// The sector time under `index`, or `None` when the index is out of
    /// range.
    pub fn sector_time(&self, index: usize) -> Option<Timestamp> {
        self.sectors.get(index).copied()
    }

    pub fn sector_time_count(&self) -> usize {
        self.sectors.len()
    }

    /// Appends a logged fix to the lap.
    pub fn add_position(&mut self, fix: GpsFix) {
        self.log_points.push(fix);
    }

    /// Replaces all logged fixes of the lap.
    pub fn set_positions(&mut self, fixes: Vec<GpsFix>) {
        self.log_points = fixes;
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
