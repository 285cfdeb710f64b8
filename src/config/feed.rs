// src/config/feed.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "HAZARD_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/hazard.toml";

pub const DEFAULT_USGS_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";
pub const DEFAULT_NOAA_URL: &str = "https://www.nhc.noaa.gov/CurrentStorms.json";
pub const DEFAULT_MODEL_ENDPOINT: &str = "http://127.0.0.1:8000/predict_cluster";

fn default_bind_addr() -> String {
    "0.0.0.0:5001".to_string()
}
fn default_poll_interval_secs() -> u64 {
    600
}
fn default_http_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeismicConfig {
    pub url: String,
    pub min_magnitude: f64,
    pub limit: u32,
    pub event_type: String,
    pub order_by: String,
    /// Overrides `poll_interval_secs` for this job.
    pub interval_secs: Option<u64>,
}

impl Default for SeismicConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_USGS_URL.to_string(),
            min_magnitude: 3.0,
            limit: 50,
            event_type: "earthquake".to_string(),
            order_by: "time-asc".to_string(),
            interval_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CycloneConfig {
    pub url: String,
    pub interval_secs: Option<u64>,
}

impl Default for CycloneConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_NOAA_URL.to_string(),
            interval_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DownstreamConfig {
    pub url: String,
    pub interval_secs: Option<u64>,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MODEL_ENDPOINT.to_string(),
            interval_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub seismic: SeismicConfig,
    #[serde(default)]
    pub cyclone: CycloneConfig,
    #[serde(default)]
    pub downstream: DownstreamConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            poll_interval_secs: default_poll_interval_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            seismic: SeismicConfig::default(),
            cyclone: CycloneConfig::default(),
            downstream: DownstreamConfig::default(),
        }
    }
}

impl FeedConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: FeedConfig = toml::from_str(s).context("parsing feed config toml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $HAZARD_CONFIG_PATH (must exist)
    /// 2) config/hazard.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = env::var("USGS_URL") {
            self.seismic.url = v;
        }
        if let Ok(v) = env::var("NOAA_URL") {
            self.cyclone.url = v;
        }
        if let Ok(v) = env::var("MODEL_ENDPOINT") {
            self.downstream.url = v;
        }
        if let Ok(v) = env::var("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = env::var("POLL_INTERVAL_SECS") {
            self.poll_interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("POLL_INTERVAL_SECS is not a number: {v:?}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be > 0");
        }
        if self.http_timeout_secs == 0 {
            bail!("http_timeout_secs must be > 0");
        }
        for (name, v) in [
            ("seismic", self.seismic.interval_secs),
            ("cyclone", self.cyclone.interval_secs),
            ("downstream", self.downstream.interval_secs),
        ] {
            if v == Some(0) {
                bail!("{name}.interval_secs must be > 0");
            }
        }
        if !(1..=20_000).contains(&self.seismic.limit) {
            bail!("seismic.limit must be within 1..=20000");
        }
        if !self.seismic.min_magnitude.is_finite() {
            bail!("seismic.min_magnitude must be finite");
        }
        for (name, url) in [
            ("seismic.url", &self.seismic.url),
            ("cyclone.url", &self.cyclone.url),
            ("downstream.url", &self.downstream.url),
        ] {
            if url.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn seismic_interval(&self) -> Duration {
        Duration::from_secs(self.seismic.interval_secs.unwrap_or(self.poll_interval_secs))
    }

    pub fn cyclone_interval(&self) -> Duration {
        Duration::from_secs(self.cyclone.interval_secs.unwrap_or(self.poll_interval_secs))
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(
            self.downstream
                .interval_secs
                .unwrap_or(self.poll_interval_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERRIDE_VARS: [&str; 6] = [
        ENV_CONFIG_PATH,
        "USGS_URL",
        "NOAA_URL",
        "MODEL_ENDPOINT",
        "BIND_ADDR",
        "POLL_INTERVAL_SECS",
    ];

    fn clear_env() {
        for k in OVERRIDE_VARS {
            env::remove_var(k);
        }
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = FeedConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, FeedConfig::default());
        assert_eq!(cfg.seismic_interval(), Duration::from_secs(600));
        assert_eq!(cfg.dispatch_interval(), Duration::from_secs(600));
        assert_eq!(cfg.http_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn per_job_interval_overrides_poll_interval() {
        let cfg = FeedConfig::from_toml_str(
            r#"
            poll_interval_secs = 120
            [cyclone]
            interval_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.seismic_interval(), Duration::from_secs(120));
        assert_eq!(cfg.cyclone_interval(), Duration::from_secs(30));
        assert_eq!(cfg.cyclone.url, DEFAULT_NOAA_URL);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(FeedConfig::from_toml_str("poll_interval_secs = 0").is_err());
        assert!(FeedConfig::from_toml_str("[seismic]\nlimit = 0").is_err());
        assert!(FeedConfig::from_toml_str("[downstream]\nurl = \"  \"").is_err());
        assert!(FeedConfig::from_toml_str("[cyclone]\ninterval_secs = 0").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_path_then_overrides() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        clear_env();

        // No file in temp CWD -> defaults
        let v = FeedConfig::load_default().unwrap();
        assert_eq!(v, FeedConfig::default());

        // Env path wins, env URL overrides the file
        let p = tmp.path().join("hazard.toml");
        fs::write(&p, "poll_interval_secs = 60\n[seismic]\nmin_magnitude = 4.5\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var("NOAA_URL", "http://localhost:9/storms");
        let v2 = FeedConfig::load_default().unwrap();
        assert_eq!(v2.poll_interval_secs, 60);
        assert_eq!(v2.seismic.min_magnitude, 4.5);
        assert_eq!(v2.cyclone.url, "http://localhost:9/storms");

        // Dangling env path is an error
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
        assert!(FeedConfig::load_default().is_err());

        clear_env();
        env::set_current_dir(&old).unwrap();
    }
}
