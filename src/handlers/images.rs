use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
};
use serde::Serialize;

use crate::app::AppState;
use crate::identity::authorization_header;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub url: String,
}

/// POST /api/images - Upload raw image bytes, returns the public URL
///
/// The file type comes from the `Content-Type` header. Accepted types are
/// jpeg, png, webp and gif, between 1 KiB and 5 MiB.
pub async fn upload(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult<UploadedImage> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let url = state
        .listings
        .upload_image(authorization_header(&headers), content_type, body.to_vec())
        .await
        .map_err(|e| state.api_error(e))?;

    Ok(ApiResponse::created(UploadedImage { url }))
}
