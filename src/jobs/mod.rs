//! Background job types consumed by the scheduler.
//!
//! Each job implements [`Task`](crate::core::Task) and catches its own
//! failures: an error is a logged condition, never something the scheduler
//! worker has to survive.

mod save;
mod statement;

pub use save::SaveTask;
pub use statement::StatementTask;

use crate::core::AppResult;

/// Contract for managers that can persist their state to durable storage.
///
/// Implemented by the site, session, share and statistics managers; the
/// server loads them at startup and schedules periodic [`SaveTask`]s against
/// them.
pub trait PersistentManager: Send + Sync {
    /// Load and prepare the manager.
    ///
    /// # Errors
    ///
    /// Returns the load failure to be surfaced by the caller; it is not
    /// retried automatically.
    fn load(&self) -> AppResult<()>;

    /// Save the manager.
    ///
    /// # Errors
    ///
    /// Returns the save failure to be surfaced by the caller; it is not
    /// retried automatically.
    fn save(&self) -> AppResult<()>;
}
