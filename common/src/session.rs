// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{date::Date, lap::LapData, timestamp::Timestamp, track::TrackData};
use serde::{Deserialize, Serialize};

/// The identifying part of a session: the track it was driven on, when
/// it was started and the id assigned by the persistent store.
///
/// The id is 0 until the session has been persisted once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    #[serde(default)]
    pub id: u64,
    pub date: Date,
    pub time: Timestamp,
    pub track: TrackData,
}

impl SessionMeta {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Represents a recorded driving session: the metadata plus the laps
/// completed so far. A session without laps is valid, it exists as soon
/// as it is started.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub id: u64,
    pub date: Date,
    pub time: Timestamp,
    pub track: TrackData,
    pub laps: Vec<LapData>,
}

impl SessionData {
    pub fn new(track: TrackData, date: Date, time: Timestamp) -> Self {
        SessionData {
            id: 0,
            date,
            time,
            track,
            laps: Vec::new(),
        }
    }

    pub fn meta(&self) -> SessionMeta {
        SessionMeta {
            id: self.id,
            date: self.date,
            time: self.time,
            track: self.track.clone(),
        }
    }

    pub fn add_lap(&mut self, lap: LapData) {
        self.laps.push(lap);
    }

    pub fn add_laps(&mut self, laps: Vec<LapData>) {
        self.laps.extend(laps);
    }

    pub fn lap_count(&self) -> usize {
        self.laps.len()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
