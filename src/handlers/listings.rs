use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::error::ApiError;
use crate::identity::authorization_header;
use crate::listing::{DeleteOutcome, Listing, ListingFilter, ListingId, ListingInput};
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SoldBody {
    pub sold: bool,
}

/// GET /api/listings - Browse listings, newest first
pub async fn list(State(state): State<AppState>, Query(filter): Query<ListingFilter>) -> ApiResult<Vec<Listing>> {
    let listings = state.listings.list(&filter).await.map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::success(listings))
}

/// GET /api/listings/:id - Fetch one listing
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<ListingId>, PathRejection>,
) -> ApiResult<Listing> {
    let id = listing_id(id)?;
    let listing = state.listings.get(id).await.map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::success(listing))
}

/// POST /api/listings - Create a listing owned by the caller
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Listing> {
    let authorization = authorization_header(&headers);
    let input = read_listing(&state, authorization, body).await?;

    let listing = state
        .listings
        .create(authorization, input)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::created(listing))
}

/// PATCH /api/listings/:id - Partial update by owner or admin
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<ListingId>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Listing> {
    let authorization = authorization_header(&headers);
    let id = listing_id(id)?;
    let input = read_listing(&state, authorization, body).await?;

    let listing = state
        .listings
        .update(authorization, id, input)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::success(listing))
}

/// DELETE /api/listings/:id - Delete by owner or admin, images included
pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<ListingId>, PathRejection>,
) -> ApiResult<DeleteOutcome> {
    let id = listing_id(id)?;
    let outcome = state
        .listings
        .delete(authorization_header(&headers), id)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::success(outcome))
}

/// PUT /api/listings/:id/sold - Owner toggles sold status
pub async fn set_sold(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<ListingId>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Listing> {
    let authorization = authorization_header(&headers);
    let id = listing_id(id)?;
    let SoldBody { sold } = read_json(&state, authorization, body, serde_json::from_value::<SoldBody>).await?;

    let listing = state
        .listings
        .set_sold(authorization, id, sold)
        .await
        .map_err(|e| state.api_error(e))?;
    Ok(ApiResponse::success(listing))
}

fn listing_id(path: Result<Path<ListingId>, PathRejection>) -> Result<ListingId, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request("listing id must be an integer"))
}

async fn read_listing(
    state: &AppState,
    authorization: Option<&str>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ListingInput, ApiError> {
    read_json(state, authorization, body, ListingInput::from_json).await
}

/// Decode a JSON body. Unauthenticated callers get 401 even when the body is
/// also malformed.
pub(crate) async fn read_json<T, F>(
    state: &AppState,
    authorization: Option<&str>,
    body: Result<Json<Value>, JsonRejection>,
    decode: F,
) -> Result<T, ApiError>
where
    T: DeserializeOwned,
    F: FnOnce(Value) -> Result<T, serde_json::Error>,
{
    let decoded = match body {
        Ok(Json(value)) => decode(value).map_err(|e| ApiError::invalid_json(e.to_string())),
        Err(rejection) => Err(ApiError::from(rejection)),
    };

    match decoded {
        Ok(value) => Ok(value),
        Err(err) => {
            state
                .listings
                .authenticate(authorization)
                .await
                .map_err(|e| state.api_error(e))?;
            Err(err)
        }
    }
}
