use serde::{Deserialize, Serialize};
use tracing::{info, error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the managed platform
    #[serde(default = "default_platform_url")]
    pub platform_url: String,

    /// API key attached to every platform request
    pub api_key: Option<String>,

    /// Realtime websocket URL; derived from platform_url when not set
    pub realtime_url: Option<String>,

    /// Bucket used for note image uploads
    #[serde(default = "default_storage_bucket")]
    pub storage_bucket: String,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,
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

        // Load from environment variables using envy
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

    /// REST endpoint for record operations
    pub fn rest_endpoint(&self) -> String {
        format!("{}/rest/v1", self.platform_url.trim_end_matches('/'))
    }

    /// Endpoint for blob uploads
    pub fn storage_endpoint(&self) -> String {
        format!("{}/storage/v1", self.platform_url.trim_end_matches('/'))
    }

    /// Endpoint for remote task invocation
    pub fn functions_endpoint(&self) -> String {
        format!("{}/functions/v1", self.platform_url.trim_end_matches('/'))
    }

    /// Websocket endpoint for the realtime channels
    pub fn realtime_endpoint(&self) -> String {
        if let Some(url) = &self.realtime_url {
            return url.trim_end_matches('/').to_string();
        }
        let base = self.platform_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/realtime/v1", ws_base)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "prod" || self.environment.to_lowercase() == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform_url: default_platform_url(),
            api_key: None,
            realtime_url: None,
            storage_bucket: default_storage_bucket(),
            environment: default_environment(),
            log_level: default_log_level(),
            service_name: default_service_name(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_platform_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_storage_bucket() -> String {
    "note-images".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "collabnote".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}
