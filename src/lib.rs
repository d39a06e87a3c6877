pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod openapi;
pub mod pagination;
pub mod questions;
pub mod rate_limit;
pub mod repo;
pub mod routes;
pub mod security;
pub mod seed;

// Re-export commonly used items for tests / binaries
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
