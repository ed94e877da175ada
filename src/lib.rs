//! # Harmonia Core
//!
//! Task scheduling and resource pooling primitives for the Harmonia media server.
//!
//! This library provides the concurrency toolkit the rest of the server is built
//! on: background persistence, per-object serialization for sites and sessions,
//! and pooled access to the embedded SQLite stores all go through the three
//! components defined here.
//!
//! ## Components
//!
//! - **`TaskScheduler`**: a single dedicated worker thread that executes
//!   deferred and periodic [`Task`](core::Task)s in deadline order. Submission
//!   is non-blocking and safe from any thread.
//! - **`ResourceLockPool`**: a fixed-size set of pre-allocated locks addressed
//!   by hashing a resource's stable numeric identity, giving every logical
//!   resource an apparent private lock without per-resource allocation.
//! - **`Database` / `DatabaseConnection`**: a reusable connection pool per
//!   named SQLite store, with an internally synchronized LIFO idle stack that
//!   favors cache-hot connections.
//!
//! ## Scheduling a periodic save
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use harmonia_core::core::TaskScheduler;
//! use harmonia_core::jobs::SaveTask;
//!
//! let scheduler = TaskScheduler::new();
//! scheduler.start()?;
//!
//! // Save site state once an hour, starting an hour from now.
//! scheduler.schedule(
//!     Box::new(SaveTask::new(Arc::clone(&site_manager))),
//!     Duration::from_secs(3600),
//!     Duration::from_secs(3600),
//! );
//!
//! // Graceful shutdown: overdue tasks run once, the rest are discarded.
//! scheduler.stop(true)?;
//! ```
//!
//! ## Checking out a pooled connection
//!
//! ```rust,ignore
//! use harmonia_core::store::DatabaseManager;
//!
//! let manager = DatabaseManager::from_config(&config);
//! manager.init()?;
//!
//! if let Some(conn) = manager.get_connection("index", true) {
//!     conn.execute("DELETE FROM tracks WHERE share_id = 3")?;
//!     manager.release_connection(conn);
//! }
//! ```
//!
//! For complete examples, see the integration suites under `tests/`.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

/// Core scheduling and locking primitives.
pub mod core;
/// Configuration models for the lock pool and database stores.
pub mod config;
/// Background job types consumed by the scheduler.
pub mod jobs;
/// SQLite store access: connection pooling and the database manager.
pub mod store;
/// Shared utilities.
pub mod util;

pub use crate::core::{ResourceGuard, ResourceLockPool, Task, TaskScheduler};
pub use crate::store::{Database, DatabaseConnection, DatabaseManager};
