// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Track detection workflow
//!
//! Classifies incoming GPS fixes against a list of candidate tracks and
//! announces the first circuit that matches.

use algorithm::TrackDetection;
use async_trait::async_trait;
use common::{position::Position, track::TrackData};
use module_core::{EventKind, Module, ModuleCtx};
use std::sync::Arc;
use tracing::{error, info};

/// Detects which of the candidate tracks the vehicle is currently at.
///
/// While active, every incoming fix is classified and the first matching
/// candidate is published as a `TrackDetectedEvent`. Detection does not
/// stop itself after a match, the caller stops it.
pub struct TrackDetectionWorkflow {
    ctx: ModuleCtx,
    detector: TrackDetection,
    tracks: Vec<TrackData>,
    active: bool,
    detected_track: Option<TrackData>,
}

impl TrackDetectionWorkflow {
    /// Creates a workflow with the default detection radius.
    pub fn new(ctx: ModuleCtx) -> Self {
        TrackDetectionWorkflow::with_detector(ctx, TrackDetection::default())
    }

    /// Creates a workflow with a custom classifier, e.g. a tighter
    /// radius.
    pub fn with_detector(ctx: ModuleCtx, detector: TrackDetection) -> Self {
        TrackDetectionWorkflow {
            ctx,
            detector,
            tracks: vec![],
            active: false,
            detected_track: None,
        }
    }

    /// Sets the candidate tracks to classify against.
    pub fn set_tracks(&mut self, tracks: Vec<TrackData>) {
        self.tracks = tracks;
    }

    /// Starts classifying incoming fixes.
    pub fn start_detection(&mut self) {
        self.active = true;
    }

    /// Stops classifying incoming fixes.
    pub fn stop_detection(&mut self) {
        self.active = false;
    }

    /// The most recently detected track.
    pub fn detected_track(&self) -> Option<&TrackData> {
        self.detected_track.as_ref()
    }

    /// Classifies one position while detection is active.
    pub fn on_position(&mut self, position: &Position) {
        if !self.active {
            return;
        }
        let Some(track) = self
            .tracks
            .iter()
            .find(|track| self.detector.is_on_track(track, position))
            .cloned()
        else {
            return;
        };

        info!("Detected track {}", track.name);
        self.detected_track = Some(track.clone());
        let _ = self
            .ctx
            .publish_event(EventKind::TrackDetectedEvent(Arc::new(track)));
    }
}

#[async_trait]
impl Module for TrackDetectionWorkflow {
    async fn run(&mut self) -> Result<(), ()> {
        let mut run = true;
        while run {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            match event.kind {
                                EventKind::QuitEvent => run = false,
                                EventKind::TrackDetectionStartEvent => self.start_detection(),
                                EventKind::TrackDetectionStopEvent => self.stop_detection(),
                                EventKind::GpsFixEvent(fix) => self.on_position(&fix.position),
                                _ => (),
                            }
                        }
                        Err(e) => error!("Failed to receive event in track detection. Error: {e}"),
                    }
                }
            }
        }
        Ok(())
    }
}
