use axum::{extract::State, http::HeaderMap};
use serde::Serialize;

use crate::app::AppState;
use crate::identity::authorization_header;
use crate::listing::stats::Dashboard;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    pub is_admin: bool,
}

/// POST /api/admin/verify - Whether the caller's token email is an admin
///
/// Any email in the request body is ignored.
pub async fn verify(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<AdminStatus> {
    let is_admin = state
        .listings
        .verify_admin(authorization_header(&headers))
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::success(AdminStatus { is_admin }))
}

/// GET /api/admin/dashboard - Statistics and every listing (admin only)
pub async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Dashboard> {
    let dashboard = state
        .listings
        .dashboard(authorization_header(&headers))
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::success(dashboard))
}
