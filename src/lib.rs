pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod listing;
pub mod middleware;
pub mod storage;

pub use app::{router, AppState};
