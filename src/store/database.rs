//! One named SQLite store and its reusable connections.

use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::warn;
use uuid::Uuid;

use crate::core::ResourceGuard;

/// Time a connection waits on a contended store before a statement fails.
pub const BUSY_TIMEOUT: Duration = Duration::from_millis(30_000);

/// An open connection to one [`Database`].
///
/// Connections are single-owner values: checkout moves the connection to the
/// caller, [`Database::push_connection`] moves it back to the idle stack. A
/// caller that detects a connection-level error should drop the connection
/// instead of returning it; the handle closes on drop.
pub struct DatabaseConnection {
    id: Uuid,
    database: String,
    conn: Connection,
}

impl DatabaseConnection {
    /// Unique id of this connection, stable for its whole life.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name of the database this connection belongs to.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The underlying SQLite handle, for prepared statements and queries.
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute one or more statements, discarding any result rows.
    ///
    /// # Errors
    ///
    /// Returns the underlying SQLite error on failure.
    pub fn execute(&self, sql: &str) -> rusqlite::Result<()> {
        self.conn.execute_batch(sql)
    }

    /// Quote a string for safe use inside a single-quoted SQL literal by
    /// doubling any embedded quote characters.
    #[must_use]
    pub fn quote(s: &str) -> String {
        s.replace('\'', "''")
    }
}

/// One named SQLite store: the registry of connections it has opened and a
/// LIFO stack of currently idle ones.
///
/// The idle stack is internally synchronized; push/pop are safe from any
/// thread. Reuse order is LIFO: the most recently returned connection is
/// handed out first, which favors cache-hot connections.
pub struct Database {
    name: String,
    path: PathBuf,
    synchronous: bool,
    /// Ids of every connection ever opened for this store.
    opened: Mutex<Vec<Uuid>>,
    /// Idle connections, top of the stack last.
    idle: Mutex<Vec<DatabaseConnection>>,
    /// Write lock held on behalf of a checked-out connection, if any.
    write_guard: Mutex<Option<ResourceGuard>>,
}

impl Database {
    /// Describe a store. No connection is opened until
    /// [`new_connection`](Self::new_connection).
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, synchronous: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            synchronous,
            opened: Mutex::new(Vec::new()),
            idle: Mutex::new(Vec::new()),
            write_guard: Mutex::new(None),
        }
    }

    /// Name of the database.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the store runs with `synchronous=NORMAL` instead of `OFF`.
    #[must_use]
    pub fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    /// Open a new connection with the fixed busy timeout applied.
    ///
    /// The connection is registered and returned checked out; it must be
    /// pushed back after use to become reusable. On failure a warning is
    /// logged and `None` returned, with no partial state retained.
    #[must_use]
    pub fn new_connection(&self) -> Option<DatabaseConnection> {
        let opened = Connection::open(&self.path).and_then(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(conn)
        });

        match opened {
            Ok(conn) => {
                let id = Uuid::new_v4();
                self.opened.lock().push(id);
                Some(DatabaseConnection {
                    id,
                    database: self.name.clone(),
                    conn,
                })
            }
            Err(err) => {
                warn!(database = %self.name, error = %err, "could not create connection");
                None
            }
        }
    }

    /// Return a checked-out connection to the top of the idle stack.
    pub fn push_connection(&self, conn: DatabaseConnection) {
        self.idle.lock().push(conn);
    }

    /// Pop the most recently pushed idle connection.
    ///
    /// `None` means the idle set is empty, a normal condition; the caller
    /// decides whether to open a new connection or fail the request.
    #[must_use]
    pub fn pop_connection(&self) -> Option<DatabaseConnection> {
        self.idle.lock().pop()
    }

    /// Number of currently idle connections.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of connections ever opened for this store.
    #[must_use]
    pub fn opened_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// Whether a write lock is currently parked on this database.
    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.write_guard.lock().is_some()
    }

    pub(crate) fn park_write_guard(&self, guard: ResourceGuard) {
        *self.write_guard.lock() = Some(guard);
    }

    pub(crate) fn take_write_guard(&self) -> Option<ResourceGuard> {
        self.write_guard.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scratch_db(dir: &TempDir) -> Database {
        Database::new("scratch", dir.path().join("scratch.db"), false)
    }

    #[test]
    fn idle_stack_is_lifo() {
        let dir = TempDir::new().unwrap();
        let db = scratch_db(&dir);

        let c1 = db.new_connection().unwrap();
        let c2 = db.new_connection().unwrap();
        let c3 = db.new_connection().unwrap();
        let (id1, id2, id3) = (c1.id(), c2.id(), c3.id());

        db.push_connection(c1);
        db.push_connection(c2);
        db.push_connection(c3);
        assert_eq!(db.idle_count(), 3);

        assert_eq!(db.pop_connection().unwrap().id(), id3);
        assert_eq!(db.pop_connection().unwrap().id(), id2);
        assert_eq!(db.pop_connection().unwrap().id(), id1);
        assert!(db.pop_connection().is_none());
    }

    #[test]
    fn open_failure_leaves_no_state() {
        let db = Database::new("broken", "/nonexistent-dir/deeper/broken.db", false);
        assert!(db.new_connection().is_none());
        assert_eq!(db.opened_count(), 0);
        assert_eq!(db.idle_count(), 0);
    }

    #[test]
    fn opened_registry_outlives_checkout() {
        let dir = TempDir::new().unwrap();
        let db = scratch_db(&dir);

        let conn = db.new_connection().unwrap();
        assert_eq!(db.opened_count(), 1);
        // Discarding instead of pushing back keeps the registry entry.
        drop(conn);
        assert_eq!(db.opened_count(), 1);
        assert_eq!(db.idle_count(), 0);
    }

    #[test]
    fn quote_doubles_embedded_quotes() {
        assert_eq!(DatabaseConnection::quote("O'Brien"), "O''Brien");
        assert_eq!(DatabaseConnection::quote("plain"), "plain");
    }

    #[test]
    fn execute_round_trip() {
        let dir = TempDir::new().unwrap();
        let db = scratch_db(&dir);

        let conn = db.new_connection().unwrap();
        conn.execute("CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('x')")
            .unwrap();
        let count: i64 = conn
            .conn()
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
