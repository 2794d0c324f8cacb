// Core modules
pub mod api;
pub mod engine;
pub mod models;
pub mod notify;
pub mod persistence;
pub mod scheduler;
pub mod session;

// Re-export commonly used types
pub use api::*;
pub use models::*;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
