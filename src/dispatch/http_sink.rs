use std::sync::Arc;

use async_trait::async_trait;

use super::DownstreamSink;
use crate::error::FeedError;
use crate::http::HttpClient;
use crate::ingest::types::Record;

const TARGET: &str = "downstream";

/// POSTs each record as a JSON body to the model endpoint. Non-2xx is a failure.
#[derive(Clone)]
pub struct HttpSink {
    endpoint: String,
    client: Arc<dyn HttpClient>,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>, client: Arc<dyn HttpClient>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait]
impl DownstreamSink for HttpSink {
    async fn send(&self, record: &Record) -> Result<(), FeedError> {
        let body = serde_json::to_value(record).map_err(|e| FeedError::Provider {
            target: TARGET.to_string(),
            status: None,
            detail: format!("record not serializable: {e}"),
            body: String::new(),
        })?;

        match self.client.post_json(&self.endpoint, &body).await {
            Ok(status) => {
                tracing::debug!(target: "dispatch", status, "sent cyclone record to model");
                Ok(())
            }
            Err(e) => {
                let e = FeedError::from_http(TARGET, e);
                if let FeedError::Provider {
                    status: Some(status),
                    ..
                } = &e
                {
                    tracing::info!(target: "dispatch", status, "model rejected cyclone record");
                }
                Err(e)
            }
        }
    }
}
