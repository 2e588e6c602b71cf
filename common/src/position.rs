// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{date::Date, timestamp::Timestamp, velocity::Velocity};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Represents a geographical coordinate with latitude and longitude.
///
/// Coordinates are stored in decimal degrees, positive north and east.
/// Two positions compare equal when both components differ by less than
/// an epsilon, so positions survive a round trip through their string
/// serialization.
///
/// The JSON form carries both components as strings
/// (`{"latitude":"52.0258","longitude":"11.2791"}`), matching the wire
/// format of the track and session documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    pub latitude: f32,
    pub longitude: f32,
}

impl Position {
    pub fn new(latitude: f32, longitude: f32) -> Self {
        Position {
            latitude,
            longitude,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        (self.latitude - other.latitude).abs() < f32::EPSILON
            && (self.longitude - other.longitude).abs() < f32::EPSILON
    }
}

#[derive(Serialize, Deserialize)]
struct RawPosition {
    latitude: String,
    longitude: String,
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawPosition {
            latitude: self.latitude.to_string(),
            longitude: self.longitude.to_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawPosition::deserialize(deserializer)?;
        let latitude = raw
            .latitude
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid latitude: {:?}", raw.latitude)))?;
        let longitude = raw.longitude.parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid longitude: {:?}", raw.longitude))
        })?;
        Ok(Position {
            latitude,
            longitude,
        })
    }
}

/// One GPS sample, the unit of input to the timing pipeline.
///
/// Combines the position with the time of day, the date and the measured
/// velocity of the fix.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpsFix {
    pub position: Position,
    pub time: Timestamp,
    pub date: Date,
    pub velocity: Velocity,
}

impl GpsFix {
    pub fn new(position: Position, time: Timestamp, date: Date, velocity: Velocity) -> Self {
        GpsFix {
            position,
            time,
            date,
            velocity,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Wire form of a fix inside a lap's log points. Unlike [`Position`],
/// the coordinates travel as numbers here.
#[derive(Serialize, Deserialize)]
struct RawGpsFix {
    velocity: f64,
    longitude: f32,
    latitude: f32,
    time: Timestamp,
    date: Date,
}

impl Serialize for GpsFix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawGpsFix {
            velocity: self.velocity.meters_per_second(),
            longitude: self.position.longitude,
            latitude: self.position.latitude,
            time: self.time,
            date: self.date,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GpsFix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawGpsFix::deserialize(deserializer)?;
        Ok(GpsFix {
            position: Position::new(raw.latitude, raw.longitude),
            time: raw.time,
            date: raw.date,
            velocity: Velocity::from_mps(raw.velocity),
        })
    }
}
