//! Configuration models for the lock pool and database stores.

pub mod core;

pub use self::core::{CoreConfig, DatabaseConfig, LockPoolConfig};
