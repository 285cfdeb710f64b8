// tests/common/mod.rs
//
// In-process stand-in for the outbound HTTP capability.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use hazard_feed::config::FeedConfig;
use hazard_feed::http::HttpClient;
use hazard_feed::HttpError;

pub const USGS: &str = "http://usgs.test/query";
pub const NOAA: &str = "http://noaa.test/storms";
pub const MODEL: &str = "http://model.test/predict_cluster";

pub const USGS_FIXTURE: &str = include_str!("../fixtures/usgs_day.json");
pub const NOAA_FIXTURE: &str = include_str!("../fixtures/noaa_active.json");

#[derive(Clone)]
pub enum Reply {
    Ok(String),
    Status(u16),
    Down,
}

/// Canned GET replies per URL; POSTs fail at the listed 0-based call indices.
#[derive(Default)]
pub struct FakeClient {
    replies: Mutex<HashMap<String, Reply>>,
    pub gets: Mutex<Vec<(String, Vec<(String, String)>)>>,
    pub posts: Mutex<Vec<serde_json::Value>>,
    post_fail_at: Vec<usize>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_posts_at(mut self, idx: &[usize]) -> Self {
        self.post_fail_at = idx.to_vec();
        self
    }

    pub fn reply(self, url: &str, reply: Reply) -> Self {
        self.set(url, reply);
        self
    }

    pub fn set(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    pub fn get_count(&self, url: &str) -> usize {
        self.gets.lock().unwrap().iter().filter(|(u, _)| u == url).count()
    }
}

#[async_trait]
impl HttpClient for FakeClient {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>, HttpError> {
        self.gets.lock().unwrap().push((
            url.to_string(),
            query.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        ));
        let reply = self.replies.lock().unwrap().get(url).cloned();
        match reply {
            Some(Reply::Ok(body)) => Ok(body.into_bytes()),
            Some(Reply::Status(status)) => Err(HttpError::Status {
                status,
                body: "internal error".into(),
            }),
            Some(Reply::Down) | None => Err(HttpError::Transport("connection refused".into())),
        }
    }

    async fn post_json(&self, _url: &str, body: &serde_json::Value) -> Result<u16, HttpError> {
        let idx = {
            let mut posts = self.posts.lock().unwrap();
            posts.push(body.clone());
            posts.len() - 1
        };
        if self.post_fail_at.contains(&idx) {
            return Err(HttpError::Status {
                status: 503,
                body: "model unavailable".into(),
            });
        }
        Ok(200)
    }
}

pub fn test_config() -> FeedConfig {
    let mut cfg = FeedConfig::default();
    cfg.seismic.url = USGS.into();
    cfg.cyclone.url = NOAA.into();
    cfg.downstream.url = MODEL.into();
    cfg
}
