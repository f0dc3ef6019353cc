pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod repo;
pub mod retry;
pub mod routes;
pub mod services;
pub mod validation;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use services::Services;
