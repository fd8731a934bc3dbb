//! Image upload handler.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::HeaderMap,
    Json,
};
use axum_extra::{headers::Host, TypedHeader};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::upload::UploadError;
use crate::web::dto::UploadResponse;
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::AppState;

/// Multipart form accepted by `POST /upload` (documentation only).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// The image file.
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

/// POST /upload - Upload a single image.
///
/// Request body: multipart/form-data with the image under the `image` field.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = UploadResponse),
        (
            status = 400,
            description = "Missing file, too many files or malformed body",
            body = ErrorBody
        ),
        (status = 413, description = "File too large", body = ErrorBody),
        (status = 415, description = "Unsupported file type", body = ErrorBody),
        (status = 503, description = "Upload storage unavailable", body = ErrorBody)
    )
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    host: Option<TypedHeader<Host>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let multipart = multipart.map_err(|e| {
        tracing::warn!("Rejected non-multipart upload: {}", e);
        ApiError::from(UploadError::malformed("Expected a multipart/form-data body"))
    })?;

    let stored = state.pipeline.ingest(multipart).await?;

    let forwarded_proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok());
    let host = host.map(|TypedHeader(h)| h.to_string());
    let url = state.public_url(forwarded_proto, host.as_deref(), &stored.generated_name);

    tracing::info!(
        filename = %stored.generated_name,
        size = stored.size_bytes,
        url = %url,
        "Image uploaded"
    );

    Ok(Json(UploadResponse::new(&stored, url)))
}
