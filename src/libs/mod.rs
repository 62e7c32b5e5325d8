pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod mapper;
pub mod models;
pub mod schema;
pub mod store;

// Re-export them for easier access from main.rs and the tests
pub use api::{AppState, configure_routes};
pub use catalog::*;
pub use config::*;
pub use error::EmrError;
pub use mapper::{check_connection, map_schema};
pub use models::*;
pub use schema::*;
pub use store::*;
