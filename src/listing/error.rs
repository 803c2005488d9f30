use thiserror::Error;

use super::model::ListingId;
use super::validators::ValidationError;

/// Rejections produced by the listing mutation pipeline. Every variant maps
/// to a stable kind code and a message safe to show to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ListingError {
    #[error("not authenticated, token invalid or missing")]
    Unauthenticated,

    #[error("you do not have permission to change this listing")]
    Forbidden,

    #[error("listing {0} not found")]
    NotFound(ListingId),

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("product name must have at least 3 characters")]
    NameTooShort,

    #[error("description must have at least 10 characters")]
    DescriptionTooShort,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// `detail` is the underlying store message, only ever shown in
    /// diagnostic mode.
    #[error("could not save the listing, try again later")]
    PersistenceFailure { detail: String },
}

impl ListingError {
    pub fn kind(&self) -> &'static str {
        match self {
            ListingError::Unauthenticated => "UNAUTHENTICATED",
            ListingError::Forbidden => "FORBIDDEN",
            ListingError::NotFound(_) => "NOT_FOUND",
            ListingError::MissingFields(_) => "MISSING_FIELDS",
            ListingError::NameTooShort => "NAME_TOO_SHORT",
            ListingError::DescriptionTooShort => "DESCRIPTION_TOO_SHORT",
            ListingError::Invalid(e) => e.kind(),
            ListingError::PersistenceFailure { .. } => "PERSISTENCE_FAILURE",
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            ListingError::NameTooShort => Some("name"),
            ListingError::DescriptionTooShort => Some("description"),
            ListingError::Invalid(e) => e.field(),
            _ => None,
        }
    }

    pub fn persistence(detail: impl Into<String>) -> Self {
        ListingError::PersistenceFailure { detail: detail.into() }
    }
}
