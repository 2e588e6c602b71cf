// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

/// A velocity stored canonically in meters per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Velocity {
    meters_per_second: f64,
}

impl Velocity {
    pub fn from_mps(meters_per_second: f64) -> Self {
        Velocity { meters_per_second }
    }

    pub fn from_kmh(kilometers_per_hour: f64) -> Self {
        Velocity {
            meters_per_second: kilometers_per_hour / 3.6,
        }
    }

    pub fn from_mph(miles_per_hour: f64) -> Self {
        Velocity {
            meters_per_second: miles_per_hour * 0.44704,
        }
    }

    pub fn meters_per_second(&self) -> f64 {
        self.meters_per_second
    }

    pub fn kilometers_per_hour(&self) -> f64 {
        self.meters_per_second * 3.6
    }
}
