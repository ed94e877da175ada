//! Periodic persistence job.

use std::sync::Arc;

use tracing::warn;

use crate::core::Task;

use super::PersistentManager;

/// Saves a [`PersistentManager`] when run.
///
/// Scheduled periodically by the server (statistics every 30 s, the other
/// managers hourly). A failed save is logged and the next occurrence runs as
/// scheduled.
pub struct SaveTask {
    manager: Arc<dyn PersistentManager>,
}

impl SaveTask {
    /// Create a save job for the given manager.
    #[must_use]
    pub fn new(manager: Arc<dyn PersistentManager>) -> Self {
        Self { manager }
    }
}

impl Task for SaveTask {
    fn run(&mut self) {
        if let Err(err) = self.manager.save() {
            warn!(error = %err, "failed to save manager");
        }
    }
}
