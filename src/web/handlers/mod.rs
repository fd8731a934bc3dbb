//! API handlers and shared state.

pub mod upload;

pub use upload::*;

use crate::upload::UploadPipeline;

/// Path prefix under which stored uploads are served.
pub const UPLOADS_PATH: &str = "/uploads";

/// Application state shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Upload pipeline (storage root + policy).
    pub pipeline: UploadPipeline,
    /// Scheme for public URLs when the request does not say.
    pub public_scheme: String,
    /// Fixed base URL overriding request host and scheme.
    pub public_base_url: Option<String>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(pipeline: UploadPipeline) -> Self {
        Self {
            pipeline,
            public_scheme: "http".to_string(),
            public_base_url: None,
        }
    }

    /// Set the fallback scheme for public URLs.
    pub fn with_public_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.public_scheme = scheme.into();
        self
    }

    /// Set a fixed base URL for public links.
    pub fn with_public_base_url(mut self, base_url: Option<String>) -> Self {
        self.public_base_url = base_url.filter(|u| !u.trim().is_empty());
        self
    }

    /// Public URL of a stored file.
    ///
    /// Uses the configured base URL if any; otherwise `forwarded_proto` (first
    /// value, `http`/`https` only) or the fallback scheme, plus `host`. With
    /// no host a root-relative path is returned.
    pub fn public_url(
        &self,
        forwarded_proto: Option<&str>,
        host: Option<&str>,
        filename: &str,
    ) -> String {
        if let Some(base) = &self.public_base_url {
            return format!("{}{UPLOADS_PATH}/{filename}", base.trim_end_matches('/'));
        }

        let Some(host) = host.filter(|h| !h.is_empty()) else {
            return format!("{UPLOADS_PATH}/{filename}");
        };

        let scheme = forwarded_proto
            .and_then(|p| p.split(',').next())
            .map(|p| p.trim().to_ascii_lowercase())
            .filter(|p| p == "http" || p == "https")
            .unwrap_or_else(|| self.public_scheme.clone());

        format!("{scheme}://{host}{UPLOADS_PATH}/{filename}")
    }
}
