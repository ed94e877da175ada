//! Fire-and-forget database statement job.

use std::sync::Arc;

use tracing::warn;

use crate::core::Task;
use crate::store::DatabaseManager;

/// Executes one SQL statement against a named database in the background.
///
/// One-shot by design: schedule it with a period of zero. The connection is
/// checked out from the [`DatabaseManager`], optionally write-locked, and
/// released afterwards on every path. Failures (no connection available, or
/// the statement itself erroring) are logged and swallowed.
pub struct StatementTask {
    manager: Arc<DatabaseManager>,
    database: String,
    statement: String,
    write_lock: bool,
}

impl StatementTask {
    /// Create a statement job against the named database.
    #[must_use]
    pub fn new(
        manager: Arc<DatabaseManager>,
        database: impl Into<String>,
        statement: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            database: database.into(),
            statement: statement.into(),
            write_lock: false,
        }
    }

    /// Request a write-locked connection for the statement. Required when
    /// the statement is an UPDATE or INSERT.
    #[must_use]
    pub fn with_write_lock(mut self) -> Self {
        self.write_lock = true;
        self
    }
}

impl Task for StatementTask {
    fn run(&mut self) {
        let Some(conn) = self.manager.get_connection(&self.database, self.write_lock) else {
            return;
        };

        if let Err(err) = conn.execute(&self.statement) {
            warn!(database = %self.database, error = %err, "failed to execute statement");
        }

        self.manager.release_connection(conn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> Arc<DatabaseManager> {
        Arc::new(DatabaseManager::new(vec![Database::new(
            "index",
            dir.path().join("index.db"),
            false,
        )]))
    }

    #[test]
    fn statement_executes_and_releases() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);

        let setup = mgr.get_connection("index", true).unwrap();
        setup
            .execute("CREATE TABLE plays (track TEXT)")
            .unwrap();
        mgr.release_connection(setup);

        let mut task = StatementTask::new(
            Arc::clone(&mgr),
            "index",
            "INSERT INTO plays VALUES ('intro')",
        )
        .with_write_lock();
        task.run();

        // The connection went back to the idle stack and the write lock is gone.
        let db = mgr.database("index").unwrap();
        assert!(!db.is_write_locked());
        assert_eq!(db.idle_count(), 1);

        let conn = mgr.get_connection("index", false).unwrap();
        let count: i64 = conn
            .conn()
            .query_row("SELECT COUNT(*) FROM plays", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        mgr.release_connection(conn);
    }

    #[test]
    fn bad_statement_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);

        let mut task = StatementTask::new(Arc::clone(&mgr), "index", "NOT EVEN SQL");
        // Must not panic.
        task.run();
        assert_eq!(mgr.database("index").unwrap().idle_count(), 1);
    }

    #[test]
    fn unknown_database_is_skipped() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);

        let mut task = StatementTask::new(mgr, "missing", "SELECT 1");
        task.run();
    }
}
