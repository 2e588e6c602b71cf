// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// A periodic timer for module run loops.
///
/// The timer wraps a [`tokio::time::Interval`]; [`tick`](Self::tick) is
/// meant to be polled from a `select!` arm and stays pending forever
/// while the timer is stopped, so a stopped timer never wakes the loop.
///
/// Setting an interval of zero stops the timer.
#[derive(Debug, Default)]
pub struct Timer {
    interval: Option<Interval>,
}

impl Timer {
    /// Creates a stopped timer.
    pub fn new() -> Self {
        Timer { interval: None }
    }

    /// Starts the timer with the given period, replacing any running
    /// interval. A zero period stops the timer. The first tick fires one
    /// period from now.
    pub fn set_interval(&mut self, interval: Duration) {
        if interval.is_zero() {
            self.interval = None;
            return;
        }
        let mut timer = tokio::time::interval_at(Instant::now() + interval, interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(timer);
    }

    /// Stops the timer. Pending [`tick`](Self::tick) calls stay pending.
    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Completes at the next period boundary, or never while stopped.
    pub async fn tick(&mut self) {
        match &mut self.interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}
