use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::listing::model::{Listing, ListingChanges, ListingFilter, ListingId, NewListing};
use crate::listing::ports::{ListingStore, StoreError};

use super::manager::{DatabaseError, DatabaseManager};

const COLUMNS: &str = "id, owner_id, name, description, price, contact_phone, category, condition, \
     payment_methods, images, delivery_offered, sold, sold_at, created_at";

/// Idempotent schema setup, run at startup when migrations are enabled.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS listings (
        id               BIGSERIAL PRIMARY KEY,
        owner_id         UUID NOT NULL,
        name             TEXT NOT NULL,
        description      TEXT NOT NULL,
        price            NUMERIC(12, 2) NOT NULL CHECK (price >= 0 AND price <= 1000000),
        contact_phone    TEXT NOT NULL,
        category         TEXT NOT NULL,
        condition        TEXT NOT NULL,
        payment_methods  TEXT[] NOT NULL,
        images           TEXT[] NOT NULL,
        delivery_offered BOOLEAN NOT NULL DEFAULT FALSE,
        sold             BOOLEAN NOT NULL DEFAULT FALSE,
        sold_at          TIMESTAMPTZ,
        created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT listings_sold_at_matches_sold CHECK (sold = (sold_at IS NOT NULL))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS listings_created_at_idx ON listings (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS listings_owner_id_idx ON listings (owner_id)",
];

/// Postgres-backed listing store.
#[derive(Clone)]
pub struct PgListingStore {
    db: DatabaseManager,
}

impl PgListingStore {
    pub fn new(manager: &DatabaseManager) -> Self {
        Self { db: manager.clone() }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(self.db.pool()).await.map_err(store_error)?;
        }
        tracing::info!("Listing schema ready");
        Ok(())
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn fetch_listing(&self, id: ListingId) -> Result<Option<Listing>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM listings WHERE id = $1");
        sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(store_error)
    }

    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, StoreError> {
        let sql = format!(
            "INSERT INTO listings (owner_id, name, description, price, contact_phone, category, condition, \
             payment_methods, images, delivery_offered, sold, sold_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, NULL, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Listing>(&sql)
            .bind(listing.owner_id)
            .bind(listing.name)
            .bind(listing.description)
            .bind(listing.price)
            .bind(listing.contact_phone)
            .bind(listing.category)
            .bind(listing.condition)
            .bind(listing.payment_methods)
            .bind(listing.images)
            .bind(listing.delivery_offered)
            .bind(listing.created_at)
            .fetch_one(self.db.pool())
            .await
            .map_err(store_error)
    }

    async fn update_listing(&self, id: ListingId, changes: ListingChanges) -> Result<Listing, StoreError> {
        if changes.is_empty() {
            return self.fetch_listing(id).await?.ok_or(StoreError::NotFound(id));
        }

        let mut qb = update_query(id, changes);
        qb.build_query_as::<Listing>()
            .fetch_optional(self.db.pool())
            .await
            .map_err(store_error)?
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete_listing(&self, id: ListingId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await
            .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, StoreError> {
        let mut qb = select_query(filter);
        qb.build_query_as::<Listing>()
            .fetch_all(self.db.pool())
            .await
            .map_err(store_error)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.db.health_check().await.map_err(|e| match e {
            DatabaseError::Sqlx(e) => store_error(e),
            other => StoreError::Unavailable(other.to_string()),
        })
    }
}

/// Only columns present in the change set are written.
fn update_query(id: ListingId, changes: ListingChanges) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE listings SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(v) = changes.name {
            set.push("name = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.description {
            set.push("description = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.price {
            set.push("price = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.contact_phone {
            set.push("contact_phone = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.category {
            set.push("category = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.condition {
            set.push("condition = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.payment_methods {
            set.push("payment_methods = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.images {
            set.push("images = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.delivery_offered {
            set.push("delivery_offered = ").push_bind_unseparated(v);
        }
        if let Some(status) = changes.sold {
            set.push("sold = ").push_bind_unseparated(status.sold());
            set.push("sold_at = ").push_bind_unseparated(status.sold_at());
        }
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING ").push(COLUMNS);
    qb
}

fn select_query(filter: &ListingFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {COLUMNS} FROM listings WHERE TRUE"));

    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(condition) = &filter.condition {
        qb.push(" AND condition = ").push_bind(condition.clone());
    }
    if let Some(sold) = filter.sold {
        qb.push(" AND sold = ").push_bind(sold);
    }
    if let Some(q) = filter.search_term() {
        let pattern = like_pattern(q);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    qb.push(" ORDER BY created_at DESC, id DESC");
    qb
}

/// Substring pattern with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::model::SoldStatus;
    use chrono::Utc;

    #[test]
    fn update_writes_only_changed_columns() {
        let changes = ListingChanges {
            name: Some("mesa".to_string()),
            delivery_offered: Some(true),
            ..Default::default()
        };
        let qb = update_query(7, changes);
        let sql = qb.sql();
        assert!(sql.starts_with("UPDATE listings SET name = $1, delivery_offered = $2 WHERE id = $3"));
        assert!(!sql.contains("owner_id ="));
        assert!(!sql.contains("created_at ="));
    }

    #[test]
    fn sold_status_writes_both_columns() {
        let changes = ListingChanges {
            sold: Some(SoldStatus::from_flag(true, Utc::now())),
            ..Default::default()
        };
        let qb = update_query(1, changes);
        assert!(qb.sql().contains("sold = $1, sold_at = $2"));
    }

    #[test]
    fn select_applies_filters_newest_first() {
        let filter = ListingFilter {
            category: Some("moveis".to_string()),
            sold: Some(false),
            q: Some("  sofa ".to_string()),
            ..Default::default()
        };
        let qb = select_query(&filter);
        let sql = qb.sql();
        assert!(sql.contains("AND category = $1"));
        assert!(sql.contains("AND sold = $2"));
        assert!(sql.contains("(name ILIKE $3 OR description ILIKE $4)"));
        assert!(sql.ends_with("ORDER BY created_at DESC, id DESC"));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn pool_failures_are_unavailable() {
        assert!(matches!(store_error(sqlx::Error::PoolTimedOut), StoreError::Unavailable(_)));
        assert!(matches!(store_error(sqlx::Error::RowNotFound), StoreError::Query(_)));
    }
}
