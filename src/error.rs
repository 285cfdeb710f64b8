//! Error taxonomy for provider fetches and downstream sends.

use thiserror::Error;

/// Longest body excerpt kept on an error for diagnostics.
pub const BODY_EXCERPT_CHARS: usize = 512;

/// Failure of a single outbound HTTP exchange, before it is tagged with a source.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection refused, DNS, TLS, timeout, truncated body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer answered, but not with a success status.
    #[error("unexpected HTTP status {status}")]
    Status { status: u16, body: String },

    /// Success status, but the body ran past the configured limit.
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Transport(format!("timed out: {e}"))
        } else {
            HttpError::Transport(e.to_string())
        }
    }
}

/// Error surfaced by an adapter or a downstream send, tagged with its target
/// (`"seismic"`, `"cyclone"`, `"downstream"`).
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{target}: transport error: {message}")]
    Transport { target: String, message: String },

    #[error("{target}: provider error{}: {detail}", status_suffix(.status))]
    Provider {
        target: String,
        status: Option<u16>,
        detail: String,
        body: String,
    },
}

impl FeedError {
    /// Tag an HTTP failure with the source or sink it happened on.
    pub fn from_http(target: &str, err: HttpError) -> Self {
        match err {
            HttpError::Transport(message) => FeedError::Transport {
                target: target.to_string(),
                message,
            },
            HttpError::Status { status, body } => FeedError::Provider {
                target: target.to_string(),
                status: Some(status),
                detail: "non-success status".to_string(),
                body: excerpt(&body),
            },
            e @ HttpError::TooLarge { .. } => FeedError::Provider {
                target: target.to_string(),
                status: None,
                detail: e.to_string(),
                body: String::new(),
            },
        }
    }

    /// Response arrived with 200 but the JSON did not match the expected shape.
    pub fn malformed(target: &str, err: &serde_json::Error, body: &[u8]) -> Self {
        FeedError::Provider {
            target: target.to_string(),
            status: None,
            detail: format!("malformed response: {err}"),
            body: excerpt(&String::from_utf8_lossy(body)),
        }
    }

    pub fn target(&self) -> &str {
        match self {
            FeedError::Transport { target, .. } | FeedError::Provider { target, .. } => target,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, FeedError::Transport { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}
