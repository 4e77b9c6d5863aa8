use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, error};

use crate::session::{AdminPolicy, CoordinatorSettings};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Display name that grants the admin role
    #[serde(default = "default_admin_name")]
    pub admin_name: String,

    /// Whether several connections may hold admin at once
    #[serde(default)]
    pub admin_policy: AdminPolicy,

    /// Broadcasts buffered per subscriber before it is considered lagging
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Largest accepted document
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,

    /// Largest websocket frame read off the wire. Oversized documents below this
    /// still reach the session and get a `documentTooLarge` reply.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Allowed CORS origins, empty when none are configured.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Largest websocket message we accept. Never below a base64 document at the
    /// size limit plus the JSON envelope.
    pub fn max_message_bytes(&self) -> usize {
        let encoded_document = self.max_document_bytes.saturating_mul(4) / 3 + 64 * 1024;
        self.max_frame_bytes.max(encoded_document)
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            admin_name: self.admin_name.clone(),
            admin_policy: self.admin_policy,
            broadcast_capacity: self.broadcast_capacity,
            command_timeout: Duration::from_millis(self.command_timeout_ms),
            max_document_bytes: self.max_document_bytes,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            service_name: default_service_name(),
            admin_name: default_admin_name(),
            admin_policy: AdminPolicy::default(),
            broadcast_capacity: default_broadcast_capacity(),
            command_timeout_ms: default_command_timeout_ms(),
            max_document_bytes: default_max_document_bytes(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "pdf-coview".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_admin_name() -> String {
    "admin".to_string()
}

fn default_broadcast_capacity() -> usize {
    256
}

fn default_command_timeout_ms() -> u64 {
    5_000
}

fn default_max_document_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_max_frame_bytes() -> usize {
    128 * 1024 * 1024
}
