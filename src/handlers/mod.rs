pub mod admin;
pub mod auth;
pub mod images;
pub mod listings;
pub mod system;
