// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! REST session management workflow
//!
//! Manages the sessions stored on a laptimer device through its REST
//! interface: fetch the session count, download sessions and session
//! metadata into per-index caches.

use common::session::{SessionData, SessionMeta};
use module_core::{DownloadFinished, DownloadResult, EventKind, ModuleCtx};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

pub mod client;

pub use client::{HttpRestClient, RequestType, RestClient, RestClientError, RestRequest};

/// Manages the sessions of a laptimer device over REST.
///
/// Sessions are addressed by index, `0..session_count`. Downloads fill
/// per-index caches; every completed download is announced on the bus
/// with its index and [`DownloadResult`].
pub struct RestSessionManagementWorkflow {
    ctx: ModuleCtx,
    client: Arc<dyn RestClient>,
    session_count: usize,
    downloaded_sessions: HashMap<usize, SessionData>,
    downloaded_metadata: HashMap<usize, SessionMeta>,
}

impl RestSessionManagementWorkflow {
    pub fn new(ctx: ModuleCtx, client: Arc<dyn RestClient>) -> Self {
        RestSessionManagementWorkflow {
            ctx,
            client,
            session_count: 0,
            downloaded_sessions: HashMap::new(),
            downloaded_metadata: HashMap::new(),
        }
    }

    /// The session count of the device.
    ///
    /// Only valid after a completed
    /// [`fetch_session_count`](Self::fetch_session_count).
    pub fn get_session_count(&self) -> usize {
        self.session_count
    }

    /// The downloaded session under `index`, if its download completed.
    pub fn get_session(&self, index: usize) -> Option<&SessionData> {
        self.downloaded_sessions.get(&index)
    }

    /// The downloaded metadata under `index`, if its download completed.
    pub fn get_session_metadata(&self, index: usize) -> Option<&SessionMeta> {
        self.downloaded_metadata.get(&index)
    }

    /// Fetches the session count of the device.
    ///
    /// Announces the completion with a `SessionCountFetchedEvent`.
    pub async fn fetch_session_count(&mut self) {
        let result = match self.request_session_count().await {
            Some(count) => {
                self.session_count = count;
                DownloadResult::Ok
            }
            None => DownloadResult::Error,
        };
        let _ = self
            .ctx
            .publish_event(EventKind::SessionCountFetchedEvent(result));
    }

    /// Downloads the session under `index` into the session cache.
    ///
    /// Announces the completion with a `SessionDownloadFinishedEvent`.
    pub async fn download_session(&mut self, index: usize) {
        let result = match self
            .client
            .execute(RestRequest::get(format!("/sessions/{index}/data")))
            .await
        {
            Ok(body) => match SessionData::from_json(&body) {
                Ok(session) => {
                    self.downloaded_sessions.insert(index, session);
                    DownloadResult::Ok
                }
                Err(e) => {
                    error!("Failed to deserialize session {index}. Error: {e}");
                    DownloadResult::Error
                }
            },
            Err(e) => {
                error!("Failed to download session {index}. Error: {e}");
                DownloadResult::Error
            }
        };
        let _ = self
            .ctx
            .publish_event(EventKind::SessionDownloadFinishedEvent(Arc::new(
                DownloadFinished { index, result },
            )));
    }

    /// Downloads the metadata of the session under `index` into the
    /// metadata cache.
    ///
    /// Announces the completion with a
    /// `SessionMetadataDownloadFinishedEvent`.
    pub async fn download_session_metadata(&mut self, index: usize) {
        let result = match self
            .client
            .execute(RestRequest::get(format!("/sessions/{index}/metadata")))
            .await
        {
            Ok(body) => match SessionMeta::from_json(&body) {
                Ok(meta) => {
                    self.downloaded_metadata.insert(index, meta);
                    DownloadResult::Ok
                }
                Err(e) => {
                    error!("Failed to deserialize session metadata {index}. Error: {e}");
                    DownloadResult::Error
                }
            },
            Err(e) => {
                error!("Failed to download session metadata {index}. Error: {e}");
                DownloadResult::Error
            }
        };
        let _ = self
            .ctx
            .publish_event(EventKind::SessionMetadataDownloadFinishedEvent(Arc::new(
                DownloadFinished { index, result },
            )));
    }

    /// Downloads the metadata of every session on the device.
    ///
    /// First fetches the session count, then starts one metadata
    /// download per index; every download announces its completion
    /// independently.
    pub async fn download_all_session_metadata(&mut self) {
        let Some(count) = self.request_session_count().await else {
            return;
        };
        for index in 0..count {
            self.download_session_metadata(index).await;
        }
    }

    async fn request_session_count(&self) -> Option<usize> {
        match self.client.execute(RestRequest::get("/sessions")).await {
            Ok(body) => match parse_session_count(&body) {
                Some(count) => {
                    debug!("Device reports {count} sessions");
                    Some(count)
                }
                None => {
                    error!("Failed to parse session count from response {body:?}");
                    None
                }
            },
            Err(e) => {
                error!("Failed to fetch session count. Error: {e}");
                None
            }
        }
    }
}

fn parse_session_count(body: &str) -> Option<usize> {
    let document: serde_json::Value = serde_json::from_str(body).ok()?;
    document.get("count")?.as_u64().map(|count| count as usize)
}
