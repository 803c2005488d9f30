use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{AppConfig, Catalog};

use super::error::ListingError;
use super::model::{ListingChanges, NewListing};
use super::patch::{ListingInput, Patch};
use super::sanitize::{char_len, sanitize_description, sanitize_name, MIN_DESCRIPTION_LEN, MIN_NAME_LEN};
use super::validators::{
    parse_price, validate_enum, validate_image_count, validate_image_urls, validate_phone,
    validate_selection, PriceInput, TrustedStorage,
};

/// Configuration the listing validators depend on.
#[derive(Debug, Clone)]
pub struct ListingRules {
    pub catalog: Catalog,
    pub trusted_storage: TrustedStorage,
}

impl ListingRules {
    pub fn new(catalog: Catalog, trusted_storage: TrustedStorage) -> Self {
        Self { catalog, trusted_storage }
    }

    /// Trusted image origin is the configured storage URL.
    pub fn from_config(config: &AppConfig) -> Result<Self, url::ParseError> {
        Ok(Self::new(
            config.catalog.clone(),
            TrustedStorage::from_url(&config.storage.url)?,
        ))
    }

    /// Validate a create body. Checks run in a fixed order and the first
    /// failure wins: presence, enumerations, images, name, description,
    /// price, phone.
    pub fn validate_new(
        &self,
        input: &ListingInput,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<NewListing, ListingError> {
        let missing = missing_fields(input);
        if !missing.is_empty() {
            return Err(ListingError::MissingFields(missing));
        }

        let category = self.category(required(&input.category, "category")?)?;
        let condition = self.condition(required(&input.condition, "condition")?)?;
        let payment_methods =
            self.payment_methods(input.payment_methods.as_option().map_or(&[][..], Vec::as_slice))?;
        let images = self.images(input.images.as_option().map_or(&[][..], Vec::as_slice))?;
        let name = name(required(&input.name, "name")?)?;
        let description = description(required(&input.description, "description")?)?;
        let price = parse_price(required(&input.price, "price")?)?;
        let contact_phone = validate_phone(required(&input.contact_phone, "contactPhone")?)?;

        Ok(NewListing {
            owner_id,
            name,
            description,
            price,
            contact_phone,
            category,
            condition,
            payment_methods,
            images,
            delivery_offered: input.delivery_offered.as_option().copied().unwrap_or(false),
            created_at: now,
        })
    }

    /// Validate a partial update. Only present fields are checked, with the
    /// same validators and order as create; any failure rejects the whole set.
    pub fn validate_changes(&self, input: &ListingInput) -> Result<ListingChanges, ListingError> {
        let mut changes = ListingChanges::default();

        if let Patch::Present(v) = &input.category {
            changes.category = Some(self.category(v)?);
        }
        if let Patch::Present(v) = &input.condition {
            changes.condition = Some(self.condition(v)?);
        }
        if let Patch::Present(v) = &input.payment_methods {
            changes.payment_methods = Some(self.payment_methods(v)?);
        }
        if let Patch::Present(v) = &input.images {
            changes.images = Some(self.images(v)?);
        }
        if let Patch::Present(v) = &input.name {
            changes.name = Some(name(v)?);
        }
        if let Patch::Present(v) = &input.description {
            changes.description = Some(description(v)?);
        }
        if let Patch::Present(v) = &input.price {
            changes.price = Some(parse_price(v)?);
        }
        if let Patch::Present(v) = &input.contact_phone {
            changes.contact_phone = Some(validate_phone(v)?);
        }
        if let Patch::Present(v) = input.delivery_offered {
            changes.delivery_offered = Some(v);
        }

        Ok(changes)
    }

    fn category(&self, value: &str) -> Result<String, ListingError> {
        Ok(validate_enum("category", value, &self.catalog.categories)?)
    }

    fn condition(&self, value: &str) -> Result<String, ListingError> {
        Ok(validate_enum("condition", value, &self.catalog.conditions)?)
    }

    fn payment_methods(&self, values: &[String]) -> Result<Vec<String>, ListingError> {
        Ok(validate_selection("paymentMethods", values, &self.catalog.payment_methods)?)
    }

    fn images(&self, urls: &[String]) -> Result<Vec<String>, ListingError> {
        validate_image_count(urls.len())?;
        Ok(validate_image_urls(urls, &self.trusted_storage)?)
    }
}

fn name(raw: &str) -> Result<String, ListingError> {
    let name = sanitize_name(raw);
    if char_len(&name) < MIN_NAME_LEN {
        return Err(ListingError::NameTooShort);
    }
    Ok(name)
}

fn description(raw: &str) -> Result<String, ListingError> {
    let description = sanitize_description(raw);
    if char_len(&description) < MIN_DESCRIPTION_LEN {
        return Err(ListingError::DescriptionTooShort);
    }
    Ok(description)
}

fn required<'a, T>(value: &'a Patch<T>, field: &'static str) -> Result<&'a T, ListingError> {
    value.as_option().ok_or_else(|| ListingError::MissingFields(vec![field]))
}

fn missing_fields(input: &ListingInput) -> Vec<&'static str> {
    let blank = |v: &Patch<String>| v.as_option().map_or(true, |s| s.trim().is_empty());

    let mut missing = Vec::new();
    if blank(&input.name) {
        missing.push("name");
    }
    if blank(&input.description) {
        missing.push("description");
    }
    let price_missing = match &input.price {
        Patch::Absent => true,
        Patch::Present(PriceInput::Text(s)) => s.trim().is_empty(),
        Patch::Present(PriceInput::Number(_)) => false,
    };
    if price_missing {
        missing.push("price");
    }
    if blank(&input.contact_phone) {
        missing.push("contactPhone");
    }
    if blank(&input.category) {
        missing.push("category");
    }
    if blank(&input.condition) {
        missing.push("condition");
    }
    missing
}
