//! Router configuration for the web layer.

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Response, StatusCode},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{upload_image, AppState, UPLOADS_PATH};
use super::middleware::{create_cors_layer, security_headers};
use super::openapi::{ApiDoc, OPENAPI_JSON_PATH};
use crate::config::WebConfig;

/// Multipart framing allowance on top of the file size limit.
///
/// The pipeline enforces the exact file limit; the transport limit only
/// bounds how much a client can push before being cut off.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Create the main router: upload endpoint and stored file serving.
pub fn create_router(app_state: Arc<AppState>, web_config: &WebConfig) -> Router {
    let body_limit = app_state
        .pipeline
        .policy()
        .max_size_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let upload_routes = Router::new()
        .route("/upload", post(upload_image))
        .layer(DefaultBodyLimit::max(body_limit));

    let uploads_dir = create_uploads_router(app_state.pipeline.storage().root());

    Router::new()
        .merge(upload_routes)
        .merge(uploads_dir)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&web_config.cors_origins))
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}

/// Serve stored uploads read-only under `/uploads/<name>`.
///
/// Stored names are random and never reused, so successful responses are
/// cacheable forever. In-progress `.part` files are hidden.
pub fn create_uploads_router<S>(root: &Path) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .nest_service(
            UPLOADS_PATH,
            ServeDir::new(root).append_index_html_on_directories(false),
        )
        .layer(middleware::from_fn(hide_in_progress))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            immutable_cache,
        ))
}

fn immutable_cache(res: &Response<Body>) -> Option<HeaderValue> {
    res.status()
        .is_success()
        .then(|| HeaderValue::from_static("public, max-age=31536000, immutable"))
}

/// Reject requests for dot-files (in-progress uploads) with 404.
async fn hide_in_progress(req: Request, next: Next) -> axum::response::Response {
    if is_hidden_path(req.uri().path()) {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(req).await
}

/// Whether any segment of the decoded path names a dot-file.
///
/// Undecodable paths count as hidden.
fn is_hidden_path(path: &str) -> bool {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded
            .split(['/', '\\'])
            .any(|segment| segment.starts_with('.')),
        Err(_) => true,
    }
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the Swagger UI router backed by the generated OpenAPI document.
pub fn create_swagger_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
}

/// Create a fallback router serving the static front-end.
///
/// Returns `None` when the directory does not exist.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let path = Path::new(static_path);
    if !path.is_dir() {
        tracing::warn!("Static path not found, front-end disabled: {}", static_path);
        return None;
    }

    tracing::info!("Serving static files from: {}", static_path);
    Some(Router::new().fallback_service(ServeDir::new(path)))
}
