//! Error types for the scheduling and pooling primitives.

use thiserror::Error;

/// Errors produced by the task scheduler lifecycle.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `start` was called while the worker is already running.
    #[error("scheduler already started")]
    AlreadyStarted,
    /// `stop` was called but the worker was never started.
    #[error("scheduler not started")]
    NotStarted,
    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// The worker thread panicked before it could be joined.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

/// Errors produced by the database manager.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No initial connection could be opened during `init`.
    #[error("could not retrieve an initial connection to database '{0}'")]
    NoInitialConnection(String),
    /// A PRAGMA or init-script statement failed.
    #[error("init failed for database '{name}': {source}")]
    Init {
        /// Name of the database being initialized.
        name: String,
        /// The underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// The side-car init script could not be read.
    #[error("could not read init script '{path}': {source}")]
    Script {
        /// Path of the script file.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
