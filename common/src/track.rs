// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::position::Position;
use serde::{Deserialize, Serialize};

/// Represents a race track: a name, the start and finish lines and the
/// ordered section points that split a lap into sectors.
///
/// An empty `sections` list means the lap has no sector splits. A
/// default (unset) start line means the finish line doubles as the start
/// line for the very first crossing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    pub name: String,
    #[serde(default)]
    pub startline: Position,
    pub finishline: Position,
    #[serde(rename = "sectors")]
    pub sections: Vec<Position>,
}

impl TrackData {
    /// True when no explicit start line was set for the track.
    pub fn has_startline(&self) -> bool {
        self.startline != Position::default()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
