//! OpenAPI documentation.

use utoipa::OpenApi;

use super::dto::UploadResponse;
use super::error::{ErrorBody, ErrorCode};
use super::handlers;

/// Path the OpenAPI JSON document is served from.
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "imgdrop API",
        version = "0.1.0",
        description = "Anonymous image upload service. Stored images are served from /uploads/."
    ),
    paths(handlers::upload::upload_image),
    components(schemas(UploadResponse, ErrorBody, ErrorCode, handlers::upload::UploadForm)),
    tags((name = "upload", description = "Image upload"))
)]
pub struct ApiDoc;
