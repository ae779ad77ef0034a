use anyhow::Context;
use serde::{Deserialize, Serialize};
use spotdeck_common::{FilterConfig, PrefixEntry};

/// Placeholder callsign shipped in fresh configurations
pub const PLACEHOLDER_CALLSIGN: &str = "N0CALL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub pskreporter: PskReporterConfig,

    /// Initial filter for both views
    #[serde(default)]
    pub filter: FilterConfig,

    /// Callsign prefix table used by the geography filters
    #[serde(default)]
    pub geography: Vec<PrefixEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub enable: bool,
    /// Endpoint returning a JSON array of spots
    pub url: String,
    /// Value of the `source` query parameter
    pub source: String,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub retention_minutes: u64,
    pub max_spots: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            enable: true,
            url: "http://localhost:3000/api/dxcluster/spots".to_string(),
            source: "auto".to_string(),
            poll_interval_secs: 30,
            request_timeout_secs: 10,
            retention_minutes: 30,
            max_spots: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PskReporterConfig {
    pub enable: bool,
    /// Operator callsign; empty or the placeholder disables the ingestor
    pub callsign: String,
    /// Full WebSocket URL of the broker
    pub broker_url: String,
    pub broker_port: u16,
    pub topic_prefix: String,
    pub window_minutes: u64,
    pub max_reports: usize,
    pub sweep_interval_secs: u64,
    pub connect_timeout_secs: u64,
    pub reconnect_max_secs: u64,
    pub keep_alive_secs: u64,
}

impl Default for PskReporterConfig {
    fn default() -> Self {
        Self {
            enable: true,
            callsign: PLACEHOLDER_CALLSIGN.to_string(),
            broker_url: "wss://mqtt.pskreporter.info:1886/mqtt".to_string(),
            broker_port: 1886,
            topic_prefix: "pskr/filter/v2".to_string(),
            window_minutes: 15,
            max_reports: 100,
            sweep_interval_secs: 30,
            connect_timeout_secs: 15,
            reconnect_max_secs: 60,
            keep_alive_secs: 60,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8088
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            cluster: ClusterConfig::default(),
            pskreporter: PskReporterConfig::default(),
            filter: FilterConfig::default(),
            geography: Vec::new(),
        }
    }
}

impl BackendConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config file '{}'", path))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: BackendConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load `path`, or `None` when the file does not exist. Callers fall back to
/// defaults so a bare checkout still starts (with the ingestor disabled).
pub fn read_config(path: &str) -> anyhow::Result<Option<BackendConfig>> {
    if std::path::Path::new(path).exists() {
        BackendConfig::from_file(path).map(Some)
    } else {
        Ok(None)
    }
}
