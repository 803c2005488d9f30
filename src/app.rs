use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers;
use crate::listing::{ListingError, ListingService};
use crate::listing::validators::MAX_UPLOAD_BYTES;
use crate::middleware::{rate_limit_middleware, RateLimiter};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub listings: Arc<ListingService>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, listings: Arc<ListingService>) -> Self {
        Self { config, listings }
    }

    /// Map a pipeline rejection, including persistence detail only when the
    /// environment exposes diagnostics.
    pub fn api_error(&self, err: ListingError) -> ApiError {
        ApiError::from_listing(err, self.config.environment.exposes_diagnostics())
    }
}

pub fn router(state: AppState, limiter: RateLimiter) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .merge(listing_routes())
        .merge(image_routes())
        .merge(admin_routes())
        .merge(auth_routes())
        .with_state(state)
        // Global middleware
        .layer(from_fn_with_state(limiter, rate_limit_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn listing_routes() -> Router<AppState> {
    use handlers::listings;

    Router::new()
        .route("/api/listings", get(listings::list).post(listings::create))
        .route(
            "/api/listings/:id",
            get(listings::get).patch(listings::update).delete(listings::delete),
        )
        .route("/api/listings/:id/sold", put(listings::set_sold))
}

fn image_routes() -> Router<AppState> {
    // headroom over the upload maximum so oversize files reach validation
    Router::new()
        .route("/api/images", post(handlers::images::upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES * 2))
}

fn admin_routes() -> Router<AppState> {
    use handlers::admin;

    Router::new()
        .route("/api/admin/verify", post(admin::verify))
        .route("/api/admin/dashboard", get(admin::dashboard))
}

fn auth_routes() -> Router<AppState> {
    Router::new().route("/api/auth/password/check", post(handlers::auth::password_check))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let security = &config.security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let methods = [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE];
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(methods).allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new().allow_origin(origins).allow_methods(methods).allow_headers(Any)
}
