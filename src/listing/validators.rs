//! Field validators for listing and account input.
//!
//! Every validator takes one raw value and returns either the normalized
//! value or a [`ValidationError`] carrying a human-readable reason. They are
//! stateless; which fields are required and in what order they run is up to
//! the caller.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const MAX_PRICE: f64 = 1_000_000.0;
pub const PHONE_DIGITS: usize = 11;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MIN_IMAGES: usize = 3;
pub const MAX_IMAGES: usize = 6;
pub const MIN_UPLOAD_BYTES: usize = 1024;
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "12345678",
    "qwerty123",
    "abc123456",
    "password123",
    "admin123",
    "letmein123",
];

const UPLOAD_CONTENT_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{reason}")]
    InvalidPrice { reason: &'static str },

    #[error("must have 11 digits")]
    InvalidPhone,

    #[error("must be a valid email address")]
    InvalidEmail,

    #[error("{reason}")]
    WeakPassword { reason: &'static str },

    #[error("'{value}' is not an accepted {field}")]
    InvalidEnum { field: &'static str, value: String },

    #[error("select at least one {field}")]
    EmptySelection { field: &'static str },

    #[error("send at least 3 photos of the product (got {count})")]
    TooFewImages { count: usize },

    #[error("at most 6 photos are allowed (got {count})")]
    TooManyImages { count: usize },

    #[error("image '{url}' is not served by the trusted storage")]
    UntrustedImageSource { url: String },

    #[error("{reason}")]
    ImageRejected { reason: &'static str },
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::InvalidPrice { .. } => "INVALID_PRICE",
            ValidationError::InvalidPhone => "INVALID_PHONE",
            ValidationError::InvalidEmail => "INVALID_EMAIL",
            ValidationError::WeakPassword { .. } => "WEAK_PASSWORD",
            ValidationError::InvalidEnum { .. } => "INVALID_ENUM",
            ValidationError::EmptySelection { .. } => "EMPTY_SELECTION",
            ValidationError::TooFewImages { .. } => "TOO_FEW_IMAGES",
            ValidationError::TooManyImages { .. } => "TOO_MANY_IMAGES",
            ValidationError::UntrustedImageSource { .. } => "UNTRUSTED_IMAGE_SOURCE",
            ValidationError::ImageRejected { .. } => "IMAGE_REJECTED",
        }
    }

    /// The input field the failure refers to, when there is exactly one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::InvalidPrice { .. } => Some("price"),
            ValidationError::InvalidPhone => Some("contactPhone"),
            ValidationError::InvalidEmail => Some("email"),
            ValidationError::WeakPassword { .. } => Some("password"),
            ValidationError::InvalidEnum { field, .. } => Some(*field),
            ValidationError::EmptySelection { field } => Some(*field),
            ValidationError::TooFewImages { .. }
            | ValidationError::TooManyImages { .. }
            | ValidationError::UntrustedImageSource { .. } => Some("images"),
            ValidationError::ImageRejected { .. } => Some("file"),
        }
    }
}

/// Price as submitted: forms send strings, API clients send numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

/// Parse a submitted price and validate it with [`validate_price`].
pub fn parse_price(input: &PriceInput) -> Result<Decimal, ValidationError> {
    let value = match input {
        PriceInput::Number(n) => *n,
        PriceInput::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidPrice { reason: "price is not a number" })?,
    };
    validate_price(value)
}

/// Accepts finite values in `0..=1_000_000`, rounded to cents.
pub fn validate_price(value: f64) -> Result<Decimal, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidPrice { reason: "price is not a number" });
    }
    if value < 0.0 {
        return Err(ValidationError::InvalidPrice { reason: "price cannot be negative" });
    }
    if value > MAX_PRICE {
        return Err(ValidationError::InvalidPrice { reason: "price is too high (maximum 1,000,000)" });
    }
    Decimal::from_f64(value)
        .map(|price| price.round_dp(2))
        .ok_or(ValidationError::InvalidPrice { reason: "price is not a number" })
}

/// Returns the digit-only projection of the phone number.
pub fn validate_phone(phone: &str) -> Result<String, ValidationError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != PHONE_DIGITS {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(digits)
}

pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.chars().count() > MAX_EMAIL_LEN || !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email.to_string())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let weak = |reason| Err(ValidationError::WeakPassword { reason });

    if password.is_empty() {
        return weak("password is required");
    }
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return weak("password must have at least 8 characters");
    }
    if len > MAX_PASSWORD_LEN {
        return weak("password is too long (maximum 128 characters)");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return weak("password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return weak("password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return weak("password must contain at least one number");
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return weak("password must contain at least one special character (!@#$%^&* etc)");
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.iter().any(|common| lowered.contains(common)) {
        return weak("password is too common, choose a stronger one");
    }

    Ok(())
}

/// Single value drawn from a caller-supplied enumerated set.
pub fn validate_enum(field: &'static str, value: &str, allowed: &[String]) -> Result<String, ValidationError> {
    let value = value.trim();
    if allowed.iter().any(|a| a == value) {
        Ok(value.to_string())
    } else {
        Err(ValidationError::InvalidEnum { field, value: value.to_string() })
    }
}

/// Non-empty selection from an enumerated set. Duplicates are collapsed,
/// first occurrence wins.
pub fn validate_selection(
    field: &'static str,
    values: &[String],
    allowed: &[String],
) -> Result<Vec<String>, ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::EmptySelection { field });
    }

    let mut selected: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = validate_enum(field, value, allowed)?;
        if !selected.contains(&value) {
            selected.push(value);
        }
    }
    Ok(selected)
}

pub fn validate_image_count(count: usize) -> Result<(), ValidationError> {
    if count < MIN_IMAGES {
        return Err(ValidationError::TooFewImages { count });
    }
    if count > MAX_IMAGES {
        return Err(ValidationError::TooManyImages { count });
    }
    Ok(())
}

/// Origin of the object storage that image URLs must point to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedStorage {
    host: String,
    port: Option<u16>,
}

impl TrustedStorage {
    /// Build from the storage base URL, e.g. `https://project.supabase.co`.
    pub fn from_url(base: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(base)?;
        let host = url.host_str().ok_or(url::ParseError::EmptyHost)?;
        Ok(Self {
            host: host.to_ascii_lowercase(),
            port: url.port(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn trusts(&self, candidate: &str) -> bool {
        let Ok(url) = Url::parse(candidate.trim()) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let host_matches = url
            .host_str()
            .map(|h| h.eq_ignore_ascii_case(&self.host))
            .unwrap_or(false);
        // `port()` is None for the scheme's default port, so an origin
        // configured without a port only trusts default ports
        host_matches && url.port() == self.port
    }
}

pub fn validate_image_urls(urls: &[String], trusted: &TrustedStorage) -> Result<Vec<String>, ValidationError> {
    urls.iter()
        .map(|url| {
            if trusted.trusts(url) {
                Ok(url.trim().to_string())
            } else {
                Err(ValidationError::UntrustedImageSource { url: url.clone() })
            }
        })
        .collect()
}

/// Checks an uploaded image file before it is stored. Returns the file
/// extension for the content type.
pub fn validate_image_upload(content_type: &str, size: usize) -> Result<&'static str, ValidationError> {
    let content_type = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    let extension = UPLOAD_CONTENT_TYPES
        .iter()
        .find(|(ct, _)| *ct == content_type)
        .map(|(_, ext)| *ext)
        .ok_or(ValidationError::ImageRejected {
            reason: "file type not allowed, use jpg, png, webp or gif",
        })?;

    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::ImageRejected { reason: "file is too large, maximum size is 5mb" });
    }
    if size < MIN_UPLOAD_BYTES {
        return Err(ValidationError::ImageRejected { reason: "file is too small or corrupted" });
    }
    Ok(extension)
}
