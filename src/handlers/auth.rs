use axum::{extract::rejection::JsonRejection, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::listing::validators::{validate_email, validate_password};
use crate::listing::ListingError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CredentialsCheck {
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub valid: bool,
}

/// POST /api/auth/password/check - Registration form pre-check
///
/// Validates password strength and, when given, the email shape. Accounts
/// themselves are created by the identity provider.
pub async fn password_check(body: Result<Json<CredentialsCheck>, JsonRejection>) -> ApiResult<CheckResult> {
    let Json(check) = body?;

    if let Some(email) = check.email.as_deref() {
        validate_email(email).map_err(|e| ApiError::from(ListingError::from(e)))?;
    }
    validate_password(&check.password).map_err(|e| ApiError::from(ListingError::from(e)))?;

    Ok(ApiResponse::success(CheckResult { valid: true }))
}
