pub mod listing_store;
pub mod manager;
pub mod memory;

pub use listing_store::PgListingStore;
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryListingStore;
