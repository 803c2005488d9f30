//! Capabilities the listing pipeline consumes. Adapters live in
//! `crate::database`, `crate::storage` and `crate::identity`.

use async_trait::async_trait;
use thiserror::Error;

use super::model::{Actor, Listing, ListingChanges, ListingFilter, ListingId, NewListing};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("listing {0} not found")]
    NotFound(ListingId),

    #[error("listing store unavailable: {0}")]
    Unavailable(String),

    #[error("listing store query failed: {0}")]
    Query(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("image url is not a stored object: {0}")]
    UnknownObject(String),

    #[error("image is not stored in the listing owner's folder: {0}")]
    OutOfScope(String),

    #[error("storage request failed: {0}")]
    Request(String),

    #[error("storage rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Provider-side failures. The resolver collapses all of them into one
/// `Unauthenticated` rejection; the variants only exist for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("credential rejected: {0}")]
    Rejected(String),

    #[error("credential claims malformed: {0}")]
    MalformedClaims(String),

    #[error("identity provider misconfigured: {0}")]
    Misconfigured(&'static str),
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn fetch_listing(&self, id: ListingId) -> Result<Option<Listing>, StoreError>;

    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, StoreError>;

    /// Fails with [`StoreError::NotFound`] when the row disappeared.
    async fn update_listing(&self, id: ListingId, changes: ListingChanges) -> Result<Listing, StoreError>;

    async fn delete_listing(&self, id: ListingId) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Raw image bytes headed for object storage.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Object path inside the bucket, e.g. `produtos/<owner id>/<uuid>.png`
    pub path: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store bytes and return the public URL.
    async fn store_image(&self, upload: ImageUpload) -> Result<String, StorageError>;

    /// Delete the object behind `url`, only if it sits directly inside
    /// `folder`. Anything else fails with `OutOfScope` and is left alone.
    async fn delete_stored_image(&self, url: &str, folder: &str) -> Result<(), StorageError>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_credential(&self, token: &str) -> Result<Actor, IdentityError>;
}
