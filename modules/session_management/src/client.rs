// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a REST call: either the transport broke down or the
/// server answered outside the 2xx range.
#[derive(Debug, Error)]
pub enum RestClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request failed with status {0}")]
    Status(u16),
}

/// Request methods the workflows use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Get,
}

/// A REST request against the engine's HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestRequest {
    pub request_type: RequestType,
    pub path: String,
}

impl RestRequest {
    pub fn get(path: impl Into<String>) -> Self {
        RestRequest {
            request_type: RequestType::Get,
            path: path.into(),
        }
    }
}

/// Executes REST requests against a laptimer device.
///
/// The success value is the response body.
#[async_trait]
pub trait RestClient: Send + Sync {
    async fn execute(&self, request: RestRequest) -> Result<String, RestClientError>;
}

/// [`RestClient`] over HTTP, backed by a shared connection pool.
pub struct HttpRestClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRestClient {
    /// Creates a client for the device at `base_url`, e.g.
    /// `http://192.168.1.20:27018`.
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpRestClient {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RestClient for HttpRestClient {
    async fn execute(&self, request: RestRequest) -> Result<String, RestClientError> {
        let url = format!("{}{}", self.base_url, request.path);
        let builder = match request.request_type {
            RequestType::Get => self.client.get(&url),
        };
        let response = builder
            .send()
            .await
            .map_err(|e| RestClientError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RestClientError::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| RestClientError::Transport(e.to_string()))
    }
}
