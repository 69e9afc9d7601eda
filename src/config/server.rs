//! Listener configuration for the live endpoint.

use serde::Deserialize;
use std::net::SocketAddr;

use super::error::ValidationError;

/// Smallest accepted inbound frame limit.
const MIN_FRAME_BYTES: usize = 1024;
/// Largest accepted inbound frame limit.
const MAX_FRAME_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub environment: Environment,

    /// `EnvFilter` directive used by the tracing subscriber.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Comma-separated browser origins allowed to open the live socket.
    /// Unset means any origin.
    pub cors_origins: Option<String>,

    /// Largest client message accepted on a live socket, in bytes.
    #[serde(default = "default_ws_max_frame_bytes")]
    pub ws_max_frame_bytes: usize,
}

/// Deployment environment.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl ServerConfig {
    /// Address the listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse()
            .map_err(|_| ValidationError::InvalidBindAddress(raw))
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Allowed origins, trimmed, empty entries dropped.
    pub fn cors_origins_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if !(MIN_FRAME_BYTES..=MAX_FRAME_BYTES).contains(&self.ws_max_frame_bytes) {
            return Err(ValidationError::InvalidFrameLimit);
        }
        self.socket_addr()?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            log_level: default_log_level(),
            cors_origins: None,
            ws_max_frame_bytes: default_ws_max_frame_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info,townhall_presence=debug,sqlx=warn".to_string()
}

fn default_ws_max_frame_bytes() -> usize {
    64 * 1024
}
