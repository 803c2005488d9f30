use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::listing::model::{Listing, ListingChanges, ListingFilter, ListingId, NewListing};
use crate::listing::ports::{ListingStore, StoreError};

/// In-process listing store for development and tests. Ids are assigned
/// sequentially from 1.
pub struct MemoryListingStore {
    listings: RwLock<BTreeMap<ListingId, Listing>>,
    next_id: AtomicI64,
    available: AtomicBool,
}

impl Default for MemoryListingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self {
            listings: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: every call fails with `Unavailable` until restored.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.listings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.listings.read().await.is_empty()
    }

    /// Snapshot of every row, ordered by id.
    pub async fn list_all(&self) -> Vec<Listing> {
        self.listings.read().await.values().cloned().collect()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn fetch_listing(&self, id: ListingId) -> Result<Option<Listing>, StoreError> {
        self.ensure_available()?;
        Ok(self.listings.read().await.get(&id).cloned())
    }

    async fn insert_listing(&self, new: NewListing) -> Result<Listing, StoreError> {
        self.ensure_available()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let listing = Listing {
            id,
            owner_id: new.owner_id,
            name: new.name,
            description: new.description,
            price: new.price,
            contact_phone: new.contact_phone,
            category: new.category,
            condition: new.condition,
            payment_methods: new.payment_methods,
            images: new.images,
            delivery_offered: new.delivery_offered,
            sold: false,
            sold_at: None,
            created_at: new.created_at,
        };
        self.listings.write().await.insert(id, listing.clone());
        Ok(listing)
    }

    async fn update_listing(&self, id: ListingId, changes: ListingChanges) -> Result<Listing, StoreError> {
        self.ensure_available()?;
        let mut listings = self.listings.write().await;
        let listing = listings.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        changes.apply_to(listing);
        Ok(listing.clone())
    }

    async fn delete_listing(&self, id: ListingId) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.listings
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, StoreError> {
        self.ensure_available()?;
        let mut listings: Vec<Listing> = self
            .listings
            .read()
            .await
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(listings)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }
}
