//! SQLite store access: connection pooling and the database manager.

pub mod database;
pub mod manager;

pub use database::{Database, DatabaseConnection, BUSY_TIMEOUT};
pub use manager::DatabaseManager;
