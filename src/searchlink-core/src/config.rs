use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Node addresses; the first one is the base URL for relative request paths
    #[serde(default = "default_addresses")]
    pub addresses: Vec<String>,

    // Basic auth, sent only when a username is set
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    // TLS
    #[serde(default)]
    pub insecure_skip_verify: bool,
    #[serde(default)]
    pub ca_cert_path: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_addresses() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Settings for a local development cluster with the demo security setup:
    /// `admin`/`admin` over HTTPS with a self-signed certificate
    pub fn local_development() -> Self {
        Self {
            addresses: vec!["https://localhost:9200".to_string()],
            username: Some("admin".to_string()),
            password: Some("admin".to_string()),
            insecure_skip_verify: true,
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addresses: default_addresses(),
            username: None,
            password: None,
            insecure_skip_verify: false,
            ca_cert_path: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}
