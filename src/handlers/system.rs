use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - Service banner
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Marketplace API",
            "version": version,
            "description": "Listing marketplace backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "listings": "/api/listings[/:id] (read public, writes authenticated)",
                "sold": "/api/listings/:id/sold (owner)",
                "images": "/api/images (authenticated)",
                "admin": "/api/admin/verify, /api/admin/dashboard (authenticated, admin)",
                "auth": "/api/auth/password/check (public)",
            }
        }
    }))
}

/// GET /health - Liveness plus listing store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.listings.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            let mut data = json!({
                "status": "degraded",
                "timestamp": now,
                "database": "unavailable"
            });
            if state.config.environment.exposes_diagnostics() {
                if let crate::listing::ListingError::PersistenceFailure { detail } = &e {
                    data["database_error"] = json!(detail);
                }
            }
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": {
                        "code": "SERVICE_UNAVAILABLE",
                        "message": "database unavailable"
                    },
                    "data": data
                })),
            )
        }
    }
}
