use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8085;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_INDEX_PATH: &str = "./public/index.html";
pub const DEFAULT_CONFIG_PATH: &str = "./dagstream.toml";
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;
pub const DEFAULT_COMMAND_BUFFER: usize = 64;
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1; // tokio mpsc has no zero-capacity channel
pub const DEFAULT_PRODUCER_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 12 * 60 * 60;

/// Top-level config (dagstream.toml + DAGSTREAM_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagstreamConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// File served at `GET /`.
    #[serde(default = "default_index_path")]
    pub index_path: String,
    /// Interval between SSE keep-alive comments.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            index_path: DEFAULT_INDEX_PATH.to_string(),
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
        }
    }
}

/// What the hub does when a subscriber's mailbox is full.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Backpressure {
    /// Wait for the consumer. One stuck subscriber stalls the whole fan-out.
    #[default]
    Block,
    /// Skip the message for that subscriber and count it as dropped.
    DropNew,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Depth of the command queue feeding the control loop.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    /// Per-subscriber mailbox depth.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    #[serde(default)]
    pub backpressure: Backpressure,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_buffer: DEFAULT_COMMAND_BUFFER,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            backpressure: Backpressure::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_producer_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_PRODUCER_INTERVAL_SECS,
        }
    }
}

/// CORS policy. Origins, request headers and exposed headers are always `*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_max_age_secs")]
    pub max_age_secs: u64,
    #[serde(default = "default_cors_methods")]
    pub allow_methods: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            allow_methods: default_cors_methods(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_index_path() -> String {
    DEFAULT_INDEX_PATH.to_string()
}
fn default_keep_alive_secs() -> u64 {
    DEFAULT_KEEP_ALIVE_SECS
}
fn default_command_buffer() -> usize {
    DEFAULT_COMMAND_BUFFER
}
fn default_mailbox_capacity() -> usize {
    DEFAULT_MAILBOX_CAPACITY
}
fn default_producer_interval_secs() -> u64 {
    DEFAULT_PRODUCER_INTERVAL_SECS
}
fn default_cors_max_age_secs() -> u64 {
    DEFAULT_CORS_MAX_AGE_SECS
}
fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl DagstreamConfig {
    /// Load config from a TOML file with DAGSTREAM_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ./dagstream.toml
    ///
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);
        Self::figment(path)
            .extract()
            .map_err(|e| crate::error::DagstreamError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(DagstreamConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("DAGSTREAM_").split("__"))
    }

    /// Validate values that serde cannot express.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.hub.mailbox_capacity == 0 {
            return Err(crate::error::DagstreamError::Config(
                "hub.mailbox_capacity must be at least 1".into(),
            ));
        }
        if self.hub.command_buffer == 0 {
            return Err(crate::error::DagstreamError::Config(
                "hub.command_buffer must be at least 1".into(),
            ));
        }
        if self.producer.enabled && self.producer.interval_secs == 0 {
            return Err(crate::error::DagstreamError::Config(
                "producer.interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
