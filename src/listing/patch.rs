use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::validators::PriceInput;

/// Fields a mutation request may never set. They are dropped silently before
/// the body is read, on create and update alike. `sold`/`soldAt` only change
/// through the sold toggle.
pub const RESERVED_FIELDS: &[&str] = &[
    "id",
    "ownerId",
    "owner_id",
    "createdAt",
    "created_at",
    "sold",
    "soldAt",
    "sold_at",
];

/// A request field that is either absent or carries a new value. JSON `null`
/// counts as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Absent,
    Present(T),
}

impl<T> Patch<T> {
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Patch::Absent => None,
            Patch::Present(v) => Some(v),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Absent, Patch::Present)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

/// Listing body shared by create (all required fields must be present) and
/// update (only present fields are validated and written).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingInput {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub price: Patch<PriceInput>,
    #[serde(default)]
    pub contact_phone: Patch<String>,
    #[serde(default)]
    pub category: Patch<String>,
    #[serde(default)]
    pub condition: Patch<String>,
    #[serde(default)]
    pub payment_methods: Patch<Vec<String>>,
    #[serde(default)]
    pub images: Patch<Vec<String>>,
    #[serde(default)]
    pub delivery_offered: Patch<bool>,
}

impl ListingInput {
    /// Read a request body, dropping [`RESERVED_FIELDS`] first.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let mut map = match value {
            Value::Object(map) => map,
            other => return serde_json::from_value(other),
        };

        let dropped = strip_reserved(&mut map);
        if !dropped.is_empty() {
            tracing::debug!("Dropped reserved fields from listing body: {:?}", dropped);
        }

        serde_json::from_value(Value::Object(map))
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn strip_reserved(map: &mut Map<String, Value>) -> Vec<&'static str> {
    RESERVED_FIELDS
        .iter()
        .copied()
        .filter(|field| map.remove(*field).is_some())
        .collect()
}
