//! Configuration module for imgdrop.

use serde::Deserialize;
use std::path::Path;
use validator::Validate;

use crate::upload::{
    ValidationPolicy, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_ALLOWED_MIME_TYPES, DEFAULT_FIELD_NAME,
    DEFAULT_MAX_UPLOAD_SIZE_MB,
};
use crate::{ImgdropError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Upload storage and validation configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UploadConfig {
    /// Directory where accepted uploads are stored.
    #[serde(default = "default_storage_path")]
    #[validate(length(min = 1, message = "storage_path must not be empty"))]
    pub storage_path: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    #[validate(range(min = 1, message = "max_upload_size_mb must be at least 1"))]
    pub max_upload_size_mb: u64,
    /// Multipart field name carrying the file.
    #[serde(default = "default_field_name")]
    #[validate(length(min = 1, message = "field_name must not be empty"))]
    pub field_name: String,
    /// Accepted MIME types.
    #[serde(default = "default_allowed_mime_types")]
    #[validate(length(min = 1, message = "at least one MIME type must be allowed"))]
    pub allowed_mime_types: Vec<String>,
    /// Accepted file extensions (without the leading dot).
    #[serde(default = "default_allowed_extensions")]
    #[validate(length(min = 1, message = "at least one extension must be allowed"))]
    pub allowed_extensions: Vec<String>,
}

fn default_storage_path() -> String {
    "uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    DEFAULT_MAX_UPLOAD_SIZE_MB
}

fn default_field_name() -> String {
    DEFAULT_FIELD_NAME.to_string()
}

fn default_allowed_mime_types() -> Vec<String> {
    DEFAULT_ALLOWED_MIME_TYPES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
            field_name: default_field_name(),
            allowed_mime_types: default_allowed_mime_types(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl UploadConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }

    /// Build the immutable validation policy used by the upload pipeline.
    pub fn to_policy(&self) -> ValidationPolicy {
        ValidationPolicy::new(
            self.max_upload_size_bytes(),
            self.allowed_mime_types.iter().map(String::as_str),
            self.allowed_extensions.iter().map(String::as_str),
        )
        .with_field_name(&self.field_name)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/imgdrop.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web layer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whether to serve the static front-end.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
    /// Scheme used for public URLs when the request carries no `X-Forwarded-Proto`.
    #[serde(default = "default_public_scheme")]
    pub public_scheme: String,
    /// Fixed base URL for public links (e.g. `https://img.example.com`).
    ///
    /// When set, request host and scheme are ignored.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_serve_static() -> bool {
    true
}

fn default_static_path() -> String {
    "public".to_string()
}

fn default_public_scheme() -> String {
    "http".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec![],
            serve_static: default_serve_static(),
            static_path: default_static_path(),
            public_scheme: default_public_scheme(),
            public_base_url: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload configuration.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Web configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ImgdropError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ImgdropError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`: Override the listen port
    /// - `IMGDROP_UPLOAD_DIR`: Override the upload storage directory
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }

        if let Ok(dir) = std::env::var("IMGDROP_UPLOAD_DIR") {
            if !dir.is_empty() {
                self.upload.storage_path = dir;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - Any upload field fails its range/length rule
    /// - An allowed extension contains a path separator or a dot
    /// - An allowed MIME type is not of the form `type/subtype`
    pub fn validate(&self) -> Result<()> {
        self.upload.validate()?;

        for ext in &self.upload.allowed_extensions {
            let ext = ext.trim_start_matches('.');
            if ext.is_empty() || ext.contains(['/', '\\', '.']) {
                return Err(ImgdropError::Validation(format!(
                    "invalid allowed extension: {ext:?}"
                )));
            }
        }

        for mime in &self.upload.allowed_mime_types {
            match mime.split_once('/') {
                Some((ty, sub)) if !ty.is_empty() && !sub.is_empty() => {}
                _ => {
                    return Err(ImgdropError::Validation(format!(
                        "invalid allowed MIME type: {mime:?}"
                    )))
                }
            }
        }

        Ok(())
    }
}
