use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ListingId = i64;

/// A product advertisement as persisted by the listing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub contact_phone: String,
    pub category: String,
    pub condition: String,
    pub payment_methods: Vec<String>,
    pub images: Vec<String>,
    pub delivery_offered: bool,
    pub sold: bool,
    pub sold_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// URL-friendly slug derived from the name: "Bicicleta Aro 26" -> "bicicleta-aro-26"
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Public product path, e.g. /produto/123/bicicleta-aro-26
    pub fn path(&self) -> String {
        format!("/produto/{}/{}", self.id, self.slug())
    }
}

/// The authenticated identity making a request. Resolved once per request,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
}

/// Fully validated fields for a listing insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub contact_phone: String,
    pub category: String,
    pub condition: String,
    pub payment_methods: Vec<String>,
    pub images: Vec<String>,
    pub delivery_offered: bool,
    pub created_at: DateTime<Utc>,
}

/// Sold state applied as one unit so `sold` and `sold_at` never diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoldStatus {
    Sold { at: DateTime<Utc> },
    Available,
}

impl SoldStatus {
    pub fn from_flag(sold: bool, now: DateTime<Utc>) -> Self {
        if sold {
            SoldStatus::Sold { at: now }
        } else {
            SoldStatus::Available
        }
    }

    pub fn sold(&self) -> bool {
        matches!(self, SoldStatus::Sold { .. })
    }

    pub fn sold_at(&self) -> Option<DateTime<Utc>> {
        match self {
            SoldStatus::Sold { at } => Some(*at),
            SoldStatus::Available => None,
        }
    }
}

/// Validated update set. Only mutable columns are representable here, so
/// `id`, `owner_id` and `created_at` can never be written by an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub contact_phone: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub payment_methods: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub delivery_offered: Option<bool>,
    pub sold: Option<SoldStatus>,
}

impl ListingChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the change set to an in-memory listing.
    pub fn apply_to(self, listing: &mut Listing) {
        if let Some(v) = self.name {
            listing.name = v;
        }
        if let Some(v) = self.description {
            listing.description = v;
        }
        if let Some(v) = self.price {
            listing.price = v;
        }
        if let Some(v) = self.contact_phone {
            listing.contact_phone = v;
        }
        if let Some(v) = self.category {
            listing.category = v;
        }
        if let Some(v) = self.condition {
            listing.condition = v;
        }
        if let Some(v) = self.payment_methods {
            listing.payment_methods = v;
        }
        if let Some(v) = self.images {
            listing.images = v;
        }
        if let Some(v) = self.delivery_offered {
            listing.delivery_offered = v;
        }
        if let Some(status) = self.sold {
            listing.sold = status.sold();
            listing.sold_at = status.sold_at();
        }
    }
}

/// Read-side filter for browsing listings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListingFilter {
    pub category: Option<String>,
    pub condition: Option<String>,
    pub sold: Option<bool>,
    /// Case-insensitive substring over name and description.
    pub q: Option<String>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(category) = &self.category {
            if &listing.category != category {
                return false;
            }
        }
        if let Some(condition) = &self.condition {
            if &listing.condition != condition {
                return false;
            }
        }
        if let Some(sold) = self.sold {
            if listing.sold != sold {
                return false;
            }
        }
        if let Some(q) = self.search_term() {
            let q = q.to_lowercase();
            return listing.name.to_lowercase().contains(&q)
                || listing.description.to_lowercase().contains(&q);
        }
        true
    }

    pub fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase).map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }

    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Listing {
        Listing {
            id: 7,
            owner_id: Uuid::new_v4(),
            name: "bicicleta aro 26".to_string(),
            description: "bicicleta em ótimo estado".to_string(),
            price: Decimal::new(35000, 2),
            contact_phone: "11987654321".to_string(),
            category: "esportes".to_string(),
            condition: "usado".to_string(),
            payment_methods: vec!["pix".to_string()],
            images: vec![],
            delivery_offered: false,
            sold: false,
            sold_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn slugify_strips_accents_and_symbols() {
        assert_eq!(slugify("Bicicleta Aro 26"), "bicicleta-aro-26");
        assert_eq!(slugify("  Câmera  Fotográfica -- Nova! "), "camera-fotografica-nova");
        assert_eq!(slugify("<>"), "");
    }

    #[test]
    fn path_uses_id_and_slug() {
        assert_eq!(listing().path(), "/produto/7/bicicleta-aro-26");
    }

    #[test]
    fn sold_changes_keep_flag_and_timestamp_together() {
        let mut l = listing();
        let now = Utc::now();

        ListingChanges { sold: Some(SoldStatus::from_flag(true, now)), ..Default::default() }.apply_to(&mut l);
        assert!(l.sold);
        assert_eq!(l.sold_at, Some(now));

        ListingChanges { sold: Some(SoldStatus::from_flag(false, now)), ..Default::default() }.apply_to(&mut l);
        assert!(!l.sold);
        assert_eq!(l.sold_at, None);
    }

    #[test]
    fn filter_matches_search_term_case_insensitively() {
        let l = listing();
        let filter = ListingFilter { q: Some("  ARO ".to_string()), ..Default::default() };
        assert!(filter.matches(&l));

        let filter = ListingFilter { category: Some("moveis".to_string()), ..Default::default() };
        assert!(!filter.matches(&l));

        let filter = ListingFilter { sold: Some(false), condition: Some("usado".to_string()), ..Default::default() };
        assert!(filter.matches(&l));
    }
}
