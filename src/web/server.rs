//! Web server for imgdrop.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::{Config, WebConfig};
use crate::upload::{StorageRoot, UploadPipeline};
use crate::{ImgdropError, Result};

use super::handlers::AppState;
use super::router::{
    create_health_router, create_router, create_static_router, create_swagger_router,
};

/// Web server for the upload API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Web configuration.
    web_config: WebConfig,
}

impl WebServer {
    /// Create a new web server from the full configuration.
    ///
    /// The storage directory is not created here; see
    /// [`WebServer::prepare_storage`].
    pub fn new(config: &Config) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                ImgdropError::Config(format!(
                    "invalid listen address {}:{}: {}",
                    config.server.host, config.server.port, e
                ))
            })?;

        let storage = StorageRoot::new(&config.upload.storage_path)?;
        tracing::info!("Upload storage root: {}", storage.root().display());

        let pipeline = UploadPipeline::new(storage, config.upload.to_policy());
        let app_state = AppState::new(pipeline)
            .with_public_scheme(&config.web.public_scheme)
            .with_public_base_url(config.web.public_base_url.clone());

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            web_config: config.web.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the application state.
    pub fn app_state(&self) -> &Arc<AppState> {
        &self.app_state
    }

    /// Create the upload directory before serving.
    ///
    /// Uploads recreate it on demand, so this only surfaces a bad path early.
    pub async fn prepare_storage(&self) -> Result<PathBuf> {
        self.app_state
            .pipeline
            .storage()
            .ensure_root()
            .await
            .map_err(|e| ImgdropError::Storage(e.detail().to_string()))
    }

    /// Build the complete application router.
    pub fn into_router(self) -> Router {
        let mut router = create_router(self.app_state, &self.web_config)
            .merge(create_health_router())
            .merge(create_swagger_router());

        // Add static file serving if enabled
        if self.web_config.serve_static {
            if let Some(static_router) = create_static_router(&self.web_config.static_path) {
                router = router.merge(static_router);
            }
        }

        // Add gzip compression layer
        router.layer(CompressionLayer::new())
    }

    /// Run the web server.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let addr = self.addr;
        let router = self.into_router();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let addr = self.addr;
        let router = self.into_router();

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config(storage_path: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0; // Use random port
        config.upload.storage_path = storage_path.to_string_lossy().into_owned();
        config.web.serve_static = false;
        config
    }

    #[test]
    fn test_web_server_new() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(&dir.path().join("uploads"));

        let server = WebServer::new(&config).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
        assert!(server.app_state().pipeline.storage().root().is_absolute());
        // Root is created lazily
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_prepare_storage_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(&dir.path().join("uploads"));

        let server = WebServer::new(&config).unwrap();
        let root = server.prepare_storage().await.unwrap();

        assert!(root.is_dir());
        assert_eq!(root, server.app_state().pipeline.storage().root());
    }

    #[tokio::test]
    async fn test_prepare_storage_path_is_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("uploads");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let server = WebServer::new(&create_test_config(&blocker)).unwrap();
        let err = server.prepare_storage().await.unwrap_err();

        assert!(matches!(err, ImgdropError::Storage(_)));
        assert!(err.to_string().starts_with("storage error: "));
    }

    #[test]
    fn test_web_server_invalid_host() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config(dir.path());
        config.server.host = "not an address".to_string();

        assert!(matches!(
            WebServer::new(&config),
            Err(ImgdropError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path());

        let server = WebServer::new(&config).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        // Test health endpoint
        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_web_server_upload_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path());

        let server = WebServer::new(&config).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let part = reqwest::multipart::Part::bytes(b"\x89PNG\r\n\x1a\nfake".to_vec())
            .file_name("cat.png")
            .mime_str("image/png")
            .unwrap();
        let form = reqwest::multipart::Form::new().part("image", part);

        let resp = reqwest::Client::new()
            .post(format!("http://{}/upload", addr))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["size"], 12);

        let url = json["url"].as_str().unwrap();
        assert!(url.starts_with(&format!("http://{}/uploads/", addr)));

        let served = reqwest::get(url).await.unwrap();
        assert_eq!(served.status(), reqwest::StatusCode::OK);
        assert_eq!(served.bytes().await.unwrap().as_ref(), b"\x89PNG\r\n\x1a\nfake");
    }
}
