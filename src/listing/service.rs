//! Listing mutation orchestrator.
//!
//! Every mutating operation walks the same stages: identify the caller,
//! load the current record, authorize against it, validate the body, then
//! persist. A rejection at any stage ends the request and nothing is written.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::identity::IdentityResolver;

use super::authorize::{authorize, Grant};
use super::error::ListingError;
use super::model::{Actor, Listing, ListingChanges, ListingFilter, ListingId, SoldStatus};
use super::patch::ListingInput;
use super::ports::{ImageStore, ImageUpload, ListingStore, StorageError, StoreError};
use super::rules::ListingRules;
use super::stats::{Dashboard, DashboardStats};
use super::validators::validate_image_upload;

pub const UPLOAD_PREFIX: &str = "produtos";

/// Storage folder holding the images a user uploaded. Deletes never reach
/// outside the listing owner's folder.
pub fn owner_folder(owner: Uuid) -> String {
    format!("{}/{}", UPLOAD_PREFIX, owner)
}

/// Last pipeline position reached before a rejection. Nothing is rejected
/// once the write has landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Identified,
    Authorized,
    Validated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Identified => "identified",
            Stage::Authorized => "authorized",
            Stage::Validated => "validated",
        };
        f.write_str(name)
    }
}

/// Result of a delete. Image cleanup is best-effort, so failures are
/// reported here rather than failing the request. Images outside the owner's
/// folder are kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub id: ListingId,
    pub images_removed: usize,
    pub images_failed: Vec<String>,
    pub images_kept: Vec<String>,
}

pub struct ListingService {
    identity: IdentityResolver,
    store: Arc<dyn ListingStore>,
    images: Arc<dyn ImageStore>,
    rules: ListingRules,
}

impl ListingService {
    pub fn new(
        identity: IdentityResolver,
        store: Arc<dyn ListingStore>,
        images: Arc<dyn ImageStore>,
        rules: ListingRules,
    ) -> Self {
        Self { identity, store, images, rules }
    }

    pub fn rules(&self) -> &ListingRules {
        &self.rules
    }

    /// Create a listing owned by the caller. The owner always comes from the
    /// resolved credential, never from the body.
    pub async fn create(&self, authorization: Option<&str>, input: ListingInput) -> Result<Listing, ListingError> {
        const OP: &str = "create";

        let actor = self.identify(OP, authorization).await?;
        let new = self
            .rules
            .validate_new(&input, actor.id, Utc::now())
            .map_err(|e| rejected(OP, Stage::Identified, e))?;

        let listing = self
            .store
            .insert_listing(new)
            .await
            .map_err(|e| rejected(OP, Stage::Validated, e.into()))?;

        tracing::info!(listing_id = listing.id, owner_id = %actor.id, "Listing created");
        Ok(listing)
    }

    /// Apply a partial update as owner or admin. An update with no mutable
    /// fields returns the current record unchanged.
    pub async fn update(
        &self,
        authorization: Option<&str>,
        id: ListingId,
        input: ListingInput,
    ) -> Result<Listing, ListingError> {
        const OP: &str = "update";

        let actor = self.identify(OP, authorization).await?;
        let current = self.load(OP, id).await?;
        let grant = self.authorize_owner_or_admin(OP, &actor, &current)?;

        let changes = self
            .rules
            .validate_changes(&input)
            .map_err(|e| rejected(OP, Stage::Authorized, e))?;

        if changes.is_empty() {
            tracing::debug!(listing_id = id, "Update carried no mutable fields");
            return Ok(current);
        }

        let listing = self.persist(OP, id, changes).await?;
        tracing::info!(listing_id = id, actor_id = %actor.id, ?grant, "Listing updated");
        Ok(listing)
    }

    /// Delete as owner or admin, then remove the listing's images.
    pub async fn delete(&self, authorization: Option<&str>, id: ListingId) -> Result<DeleteOutcome, ListingError> {
        const OP: &str = "delete";

        let actor = self.identify(OP, authorization).await?;
        let current = self.load(OP, id).await?;
        let grant = self.authorize_owner_or_admin(OP, &actor, &current)?;

        // Ownership is re-read right before the delete so a record that
        // changed hands since the first check is not removed.
        let current = self.load(OP, id).await?;
        self.authorize_owner_or_admin(OP, &actor, &current)?;

        self.store
            .delete_listing(id)
            .await
            .map_err(|e| rejected(OP, Stage::Validated, e.into()))?;

        let outcome = self.remove_images(id, current.owner_id, &current.images).await;
        tracing::info!(
            listing_id = id,
            actor_id = %actor.id,
            ?grant,
            images_removed = outcome.images_removed,
            images_failed = outcome.images_failed.len(),
            images_kept = outcome.images_kept.len(),
            "Listing deleted"
        );
        Ok(outcome)
    }

    /// Mark a listing sold or available. Only the owner may do this, admins
    /// included.
    pub async fn set_sold(
        &self,
        authorization: Option<&str>,
        id: ListingId,
        sold: bool,
    ) -> Result<Listing, ListingError> {
        const OP: &str = "set_sold";

        let actor = self.identify(OP, authorization).await?;
        let current = self.load(OP, id).await?;
        authorize(&actor, current.owner_id, false)
            .into_result()
            .map_err(|e| rejected(OP, Stage::Identified, e))?;

        let changes = ListingChanges {
            sold: Some(SoldStatus::from_flag(sold, Utc::now())),
            ..Default::default()
        };
        let listing = self.persist(OP, id, changes).await?;
        tracing::info!(listing_id = id, sold, "Listing sold status changed");
        Ok(listing)
    }

    /// Whether the caller's verified email is on the admin list. The email
    /// always comes from the credential, never from the request body.
    pub async fn verify_admin(&self, authorization: Option<&str>) -> Result<bool, ListingError> {
        let actor = self.identify("verify_admin", authorization).await?;
        Ok(self.identity.is_admin(&actor.email))
    }

    /// Admin-only overview of every listing.
    pub async fn dashboard(&self, authorization: Option<&str>) -> Result<Dashboard, ListingError> {
        const OP: &str = "dashboard";

        let actor = self.identify(OP, authorization).await?;
        if !self.identity.is_admin(&actor.email) {
            return Err(rejected(OP, Stage::Identified, ListingError::Forbidden));
        }

        let listings = self
            .store
            .list_listings(&ListingFilter::default())
            .await
            .map_err(|e| rejected(OP, Stage::Authorized, e.into()))?;

        Ok(Dashboard {
            statistics: DashboardStats::from_listings(&listings, Utc::now()),
            listings,
        })
    }

    /// Store an image for a listing form and return its public URL.
    pub async fn upload_image(
        &self,
        authorization: Option<&str>,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ListingError> {
        const OP: &str = "upload_image";

        let actor = self.identify(OP, authorization).await?;
        let extension = validate_image_upload(content_type, bytes.len())
            .map_err(|e| rejected(OP, Stage::Identified, e.into()))?;

        let upload = ImageUpload {
            path: format!("{}/{}.{}", owner_folder(actor.id), Uuid::new_v4(), extension),
            content_type: content_type.to_string(),
            bytes,
        };
        let path = upload.path.clone();

        let url = self.images.store_image(upload).await.map_err(|e| {
            rejected(OP, Stage::Validated, ListingError::persistence(e.to_string()))
        })?;

        tracing::info!(actor_id = %actor.id, path = %path, "Image uploaded");
        Ok(url)
    }

    pub async fn list(&self, filter: &ListingFilter) -> Result<Vec<Listing>, ListingError> {
        self.store
            .list_listings(filter)
            .await
            .map_err(|e| rejected("list", Stage::Received, e.into()))
    }

    pub async fn get(&self, id: ListingId) -> Result<Listing, ListingError> {
        self.load("get", id).await
    }

    /// Resolve the caller without running an operation.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Actor, ListingError> {
        self.identify("authenticate", authorization).await
    }

    pub async fn health_check(&self) -> Result<(), ListingError> {
        self.store.health_check().await.map_err(ListingError::from)
    }

    async fn identify(&self, op: &'static str, authorization: Option<&str>) -> Result<Actor, ListingError> {
        self.identity
            .resolve_actor(authorization)
            .await
            .map_err(|e| rejected(op, Stage::Received, e))
    }

    async fn load(&self, op: &'static str, id: ListingId) -> Result<Listing, ListingError> {
        match self.store.fetch_listing(id).await {
            Ok(Some(listing)) => Ok(listing),
            Ok(None) => Err(rejected(op, Stage::Identified, ListingError::NotFound(id))),
            Err(e) => Err(rejected(op, Stage::Identified, e.into())),
        }
    }

    fn authorize_owner_or_admin(&self, op: &'static str, actor: &Actor, listing: &Listing) -> Result<Grant, ListingError> {
        let is_admin = self.identity.is_admin(&actor.email);
        authorize(actor, listing.owner_id, is_admin)
            .into_result()
            .map_err(|e| rejected(op, Stage::Identified, e))
    }

    async fn persist(&self, op: &'static str, id: ListingId, changes: ListingChanges) -> Result<Listing, ListingError> {
        self.store
            .update_listing(id, changes)
            .await
            .map_err(|e| rejected(op, Stage::Validated, e.into()))
    }

    async fn remove_images(&self, id: ListingId, owner: Uuid, urls: &[String]) -> DeleteOutcome {
        let folder = owner_folder(owner);
        let results = join_all(urls.iter().map(|url| self.images.delete_stored_image(url, &folder))).await;

        let mut outcome = DeleteOutcome {
            id,
            images_removed: 0,
            images_failed: Vec::new(),
            images_kept: Vec::new(),
        };
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(()) => outcome.images_removed += 1,
                Err(StorageError::OutOfScope(_)) => {
                    tracing::info!(listing_id = id, url = %url, "Keeping image stored outside the owner's folder");
                    outcome.images_kept.push(url.clone());
                }
                Err(e) => {
                    tracing::warn!(listing_id = id, url = %url, "Failed to delete listing image: {}", e);
                    outcome.images_failed.push(url.clone());
                }
            }
        }
        outcome
    }
}

impl From<StoreError> for ListingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ListingError::NotFound(id),
            other => ListingError::persistence(other.to_string()),
        }
    }
}

/// Log a rejection with the last stage the request completed.
fn rejected(op: &'static str, stage: Stage, err: ListingError) -> ListingError {
    match &err {
        ListingError::PersistenceFailure { detail } => {
            tracing::error!(op, %stage, kind = err.kind(), detail = %detail, "Listing request failed");
        }
        _ => {
            tracing::warn!(op, %stage, kind = err.kind(), "Listing request rejected: {}", err);
        }
    }
    err
}
