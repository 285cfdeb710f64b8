// src/http.rs
//! Outbound HTTP capability shared by the source adapters and the downstream sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

use crate::error::HttpError;

/// The two calls the pipeline makes to the outside world.
///
/// Implementations must bound every call with a timeout.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// `GET url?query`; returns the body on HTTP 200.
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>, HttpError>;

    /// `POST url` with a JSON body; returns the status on 2xx.
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<u16, HttpError>;
}

/// Largest success body accepted unless overridden.
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Bytes of a non-success body kept for diagnostics.
pub const ERROR_BODY_BYTES: usize = 4 * 1024;

/// `reqwest`-backed client with connect and request timeouts.
#[derive(Clone)]
pub struct ReqwestClient {
    http: Client,
    max_body_bytes: usize,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("hazard-feed/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

/// Read at most `cap` bytes; the flag is set when the body was longer.
async fn read_capped(resp: &mut Response, cap: usize) -> Result<(Vec<u8>, bool), reqwest::Error> {
    let mut buf = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        let room = cap - buf.len();
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            return Ok((buf, true));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok((buf, false))
}

/// Status is decided before the body is touched; the body excerpt is best effort.
async fn status_error(mut resp: Response) -> HttpError {
    let status = resp.status().as_u16();
    let body = match read_capped(&mut resp, ERROR_BODY_BYTES).await {
        Ok((bytes, _)) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::debug!(status, error = %e, "error body unreadable");
            String::new()
        }
    };
    HttpError::Status { status, body }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>, HttpError> {
        let mut resp = self.http.get(url).query(query).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(status_error(resp).await);
        }
        let limit = self.max_body_bytes;
        if resp.content_length().is_some_and(|n| n > limit as u64) {
            return Err(HttpError::TooLarge { limit });
        }
        let (body, truncated) = read_capped(&mut resp, limit).await?;
        if truncated {
            return Err(HttpError::TooLarge { limit });
        }
        Ok(body)
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<u16, HttpError> {
        let resp = self.http.post(url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(resp).await);
        }
        Ok(status.as_u16())
    }
}
