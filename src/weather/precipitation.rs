// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Precipitation image poll/download service.
//!
//! The remote service exposes a "last updated" timestamp in a response
//! header and the composite image under a timestamp-parameterized URL.
//! `download_current_image` fetches the image at most once per distinct
//! remote timestamp value; an unchanged timestamp means no download and
//! no notification. The stored timestamp is only advanced after a fully
//! successful download, so a failed attempt is re-tried on the next call.
//!
//! The service owns no timer. Scheduling the poll is the caller's job,
//! and calls must come from a single logical caller.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info};
use thiserror::Error;
use tokio::sync::broadcast;

/// Placeholder replaced with the formatted timestamp in the image URL.
const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

/// Low-level transport failure, before URL context is attached.
#[derive(Debug, Clone, Error)]
pub enum TransportFailure {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

/// Failure of a poll or download operation, propagated to the caller.
///
/// Timeout and other transport causes are distinguishable for diagnostics;
/// the retry policy is the same for both: none here, the caller decides.
#[derive(Debug, Error)]
pub enum ImageFetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("transport failure fetching {url}: {message}")]
    Transport { url: String, message: String },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("response from {url} is missing header {header}")]
    MissingHeader { url: String, header: String },

    #[error("invalid last-updated timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("failed to write image to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    ClientSetup(String),
}

impl ImageFetchError {
    fn from_transport(failure: TransportFailure, url: &str) -> Self {
        match failure {
            TransportFailure::Timeout => Self::Timeout {
                url: url.to_owned(),
            },
            TransportFailure::Status(status) => Self::Status {
                url: url.to_owned(),
                status,
            },
            TransportFailure::Other(message) => Self::Transport {
                url: url.to_owned(),
                message,
            },
        }
    }
}

/// HTTP operations the service needs, behind a seam so tests run without
/// a network.
pub trait ImageTransport {
    /// HEAD request; returns the named response header if present. The
    /// body is ignored.
    fn head_header(
        &self,
        url: &str,
        header: &str,
    ) -> impl Future<Output = Result<Option<String>, TransportFailure>> + Send;

    /// GET request; returns the response body.
    fn get_bytes(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Vec<u8>, TransportFailure>> + Send;
}

/// Production transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ImageFetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageFetchError::ClientSetup(e.to_string()))?;
        Ok(Self { client })
    }
}

fn classify_reqwest_error(e: &reqwest::Error) -> TransportFailure {
    if e.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Other(e.to_string())
    }
}

impl ImageTransport for HttpTransport {
    async fn head_header(
        &self,
        url: &str,
        header: &str,
    ) -> Result<Option<String>, TransportFailure> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        if !response.status().is_success() {
            return Err(TransportFailure::Status(response.status().as_u16()));
        }

        Ok(response
            .headers()
            .get(header)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned))
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TransportFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        if !response.status().is_success() {
            return Err(TransportFailure::Status(response.status().as_u16()));
        }

        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| classify_reqwest_error(&e))
    }
}

/// Configuration for the precipitation service.
#[derive(Debug, Clone)]
pub struct PrecipitationConfig {
    /// Endpoint answering HEAD with the last-updated header.
    pub status_url: String,
    /// Image URL with a `{timestamp}` placeholder.
    pub image_url: String,
    /// Response header carrying the last-updated timestamp.
    pub timestamp_header: String,
    /// chrono format of the timestamp, both in the header and the URL.
    pub timestamp_format: String,
    /// Local path the image is written to, overwriting prior content.
    pub image_path: PathBuf,
    /// Request timeout.
    pub request_timeout: Duration,
}

/// Notification published after a completed download.
#[derive(Debug, Clone)]
pub enum PrecipitationEvent {
    ImageDownloaded {
        timestamp: DateTime<Utc>,
        path: PathBuf,
    },
}

/// Poll/download service for the precipitation radar image.
pub struct PrecipitationService<T = HttpTransport> {
    config: PrecipitationConfig,
    transport: T,
    last_update: Option<DateTime<Utc>>,
    event_tx: broadcast::Sender<PrecipitationEvent>,
}

impl<T> std::fmt::Debug for PrecipitationService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrecipitationService")
            .field("status_url", &self.config.status_url)
            .field("last_update", &self.last_update)
            .finish_non_exhaustive()
    }
}

impl PrecipitationService<HttpTransport> {
    pub fn new(config: PrecipitationConfig) -> Result<Self, ImageFetchError> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: ImageTransport> PrecipitationService<T> {
    #[must_use]
    pub fn with_transport(config: PrecipitationConfig, transport: T) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            config,
            transport,
            last_update: None,
            event_tx,
        }
    }

    /// Subscribe to download notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PrecipitationEvent> {
        self.event_tx.subscribe()
    }

    /// Timestamp of the last image this service downloaded, if any.
    #[must_use]
    pub fn last_known_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Fetch the remote last-updated timestamp.
    pub async fn last_update_timestamp(&self) -> Result<DateTime<Utc>, ImageFetchError> {
        let url = &self.config.status_url;
        let value = self
            .transport
            .head_header(url, &self.config.timestamp_header)
            .await
            .map_err(|e| ImageFetchError::from_transport(e, url))?
            .ok_or_else(|| ImageFetchError::MissingHeader {
                url: url.clone(),
                header: self.config.timestamp_header.clone(),
            })?;

        let parsed = NaiveDateTime::parse_from_str(&value, &self.config.timestamp_format)
            .map_err(|e| ImageFetchError::InvalidTimestamp { value, source: e })?;
        Ok(parsed.and_utc())
    }

    /// Download the current image if the remote timestamp changed.
    ///
    /// Returns the remote timestamp either way, so callers can compare it
    /// against their own previous read to tell "fresh" from "already
    /// current". The stored timestamp is only updated after the image has
    /// been written, so a failed download is re-attempted next call.
    pub async fn download_current_image(&mut self) -> Result<DateTime<Utc>, ImageFetchError> {
        let remote = self.last_update_timestamp().await?;

        if self.last_update == Some(remote) {
            debug!("Precipitation image already current ({})", remote);
            return Ok(remote);
        }

        let formatted = remote.format(&self.config.timestamp_format).to_string();
        let url = self.config.image_url.replace(TIMESTAMP_PLACEHOLDER, &formatted);

        let bytes = self
            .transport
            .get_bytes(&url)
            .await
            .map_err(|e| ImageFetchError::from_transport(e, &url))?;

        tokio::fs::write(&self.config.image_path, &bytes)
            .await
            .map_err(|e| ImageFetchError::Io {
                path: self.config.image_path.display().to_string(),
                source: e,
            })?;

        info!(
            "Downloaded precipitation image for {} ({} bytes)",
            remote,
            bytes.len()
        );

        let _ = self.event_tx.send(PrecipitationEvent::ImageDownloaded {
            timestamp: remote,
            path: self.config.image_path.clone(),
        });
        self.last_update = Some(remote);

        Ok(remote)
    }
}
