pub mod authorize;
pub mod error;
pub mod model;
pub mod patch;
pub mod ports;
pub mod rules;
pub mod sanitize;
pub mod service;
pub mod stats;
pub mod validators;

pub use error::ListingError;
pub use model::{Actor, Listing, ListingChanges, ListingFilter, ListingId, NewListing, SoldStatus};
pub use patch::ListingInput;
pub use rules::ListingRules;
pub use service::{DeleteOutcome, ListingService, Stage};
