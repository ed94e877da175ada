//! Registry of named stores and pooled connection checkout.
//!
//! [`DatabaseManager`] wraps the per-store pools into the
//! `get_connection`/`release_connection` surface the rest of the server
//! uses, adds per-database write locks on top of a [`ResourceLockPool`],
//! and prepares every store at startup (PRAGMA set plus an optional side-car
//! init script).

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::CoreConfig;
use crate::core::{ResourceLockPool, StoreError};

use super::database::{Database, DatabaseConnection};

/// Manages all configured databases and hands out pooled connections.
///
/// A connection requested with `write_lock` holds its database's slot in the
/// write-lock pool until the connection is released; concurrent write
/// checkouts against the same database block until then. Databases are
/// identified in the pool by their registry index, a stable id for the
/// manager's lifetime.
pub struct DatabaseManager {
    databases: Vec<Database>,
    write_locks: ResourceLockPool,
}

impl DatabaseManager {
    /// Name of the media index store.
    pub const DATABASE_INDEX: &'static str = "index";
    /// Name of the server state store.
    pub const DATABASE_SERVER: &'static str = "server";

    /// Default number of slots for per-database write locks.
    pub const DEFAULT_WRITE_LOCK_SLOTS: usize = 5;

    /// Create a manager over the given databases with the default write-lock
    /// pool size.
    #[must_use]
    pub fn new(databases: Vec<Database>) -> Self {
        Self::with_lock_slots(databases, Self::DEFAULT_WRITE_LOCK_SLOTS)
    }

    /// Create a manager with an explicit write-lock pool size.
    ///
    /// # Panics
    ///
    /// Panics if `slots` is zero.
    #[must_use]
    pub fn with_lock_slots(databases: Vec<Database>, slots: usize) -> Self {
        Self {
            databases,
            write_locks: ResourceLockPool::new(slots),
        }
    }

    /// Build the manager from configuration.
    #[must_use]
    pub fn from_config(cfg: &CoreConfig) -> Self {
        let databases = cfg
            .databases
            .iter()
            .map(|d| Database::new(&d.name, &d.path, d.synchronous))
            .collect();
        Self::with_lock_slots(databases, cfg.lock_pool.size)
    }

    /// Initialize and prepare every database for usage.
    ///
    /// For each store, obtains a write-locked connection, applies the PRAGMA
    /// set (`synchronous` per the store's flag), and executes the side-car
    /// init script `<path>.sql` if one exists. Statements in the script are
    /// separated by blank lines; statements starting with `--` are skipped.
    ///
    /// # Errors
    ///
    /// Fails if any store yields no initial connection, or if a PRAGMA or
    /// script statement fails.
    pub fn init(&self) -> Result<(), StoreError> {
        for (index, database) in self.databases.iter().enumerate() {
            let Some(conn) = self.connection_for(index, database, true) else {
                warn!(database = %database.name(), "could not retrieve an initial connection");
                return Err(StoreError::NoInitialConnection(database.name().to_string()));
            };

            let prepared = Self::prepare(database, &conn);
            self.release_connection(conn);
            prepared?;
        }

        Ok(())
    }

    /// Get a connection to the database with the given name.
    ///
    /// Pops an idle connection if one exists, otherwise opens a new one.
    /// With `write_lock`, the database's write-lock slot is acquired before
    /// returning; a connection that is going to UPDATE or INSERT must request
    /// it. The lock is held until [`release_connection`](Self::release_connection).
    ///
    /// `None` means the database is unknown or no connection could be opened.
    #[must_use]
    pub fn get_connection(&self, name: &str, write_lock: bool) -> Option<DatabaseConnection> {
        let Some((index, database)) = self.find(name) else {
            warn!(database = name, "connection requested for unknown database");
            return None;
        };
        self.connection_for(index, database, write_lock)
    }

    /// Release a connection back to its database, dropping any write lock
    /// parked on the database first.
    pub fn release_connection(&self, conn: DatabaseConnection) {
        let Some((_, database)) = self.find(conn.database()) else {
            // The connection's store is gone; dropping closes the handle.
            warn!(database = conn.database(), "released connection for unknown database");
            return;
        };

        drop(database.take_write_guard());
        database.push_connection(conn);
    }

    /// Look up a database by name.
    #[must_use]
    pub fn database(&self, name: &str) -> Option<&Database> {
        self.find(name).map(|(_, db)| db)
    }

    fn connection_for(
        &self,
        index: usize,
        database: &Database,
        write_lock: bool,
    ) -> Option<DatabaseConnection> {
        let conn = database
            .pop_connection()
            .or_else(|| database.new_connection())?;

        if write_lock {
            let guard = self.write_locks.lock(index as u64);
            database.park_write_guard(guard);
        }

        Some(conn)
    }

    fn find(&self, name: &str) -> Option<(usize, &Database)> {
        self.databases
            .iter()
            .enumerate()
            .find(|(_, db)| db.name() == name)
    }

    fn prepare(database: &Database, conn: &DatabaseConnection) -> Result<(), StoreError> {
        let init_err = |source| StoreError::Init {
            name: database.name().to_string(),
            source,
        };

        let pragmas = if database.is_synchronous() {
            "PRAGMA auto_vacuum=FULL;\nPRAGMA synchronous=NORMAL;\nPRAGMA temp_store=MEMORY;"
        } else {
            "PRAGMA auto_vacuum=FULL;\nPRAGMA synchronous=OFF;\nPRAGMA temp_store=MEMORY;"
        };
        conn.execute(pragmas).map_err(init_err)?;

        let script_path = {
            let mut p = database.path().as_os_str().to_owned();
            p.push(".sql");
            PathBuf::from(p)
        };
        if !script_path.exists() {
            return Ok(());
        }

        let script = std::fs::read_to_string(&script_path).map_err(|source| StoreError::Script {
            path: script_path.display().to_string(),
            source,
        })?;

        for statement in Self::tokenize_script(&script) {
            debug!(database = %database.name(), statement, "executing init statement");
            conn.execute(statement).map_err(init_err)?;
        }

        Ok(())
    }

    /// Split an init script into statements on blank lines, dropping comment
    /// statements and empty segments.
    fn tokenize_script(script: &str) -> Vec<&str> {
        script
            .split("\n\n")
            .filter(|segment| {
                let trimmed = segment.trim();
                !trimmed.is_empty() && !trimmed.starts_with("--")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> DatabaseManager {
        DatabaseManager::new(vec![
            Database::new("index", dir.path().join("index.db"), false),
            Database::new("server", dir.path().join("server.db"), true),
        ])
    }

    #[test]
    fn checkout_reuses_released_connections() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);

        let conn = mgr.get_connection("index", false).unwrap();
        let id = conn.id();
        mgr.release_connection(conn);

        // The idle connection comes back instead of a fresh open.
        let again = mgr.get_connection("index", false).unwrap();
        assert_eq!(again.id(), id);
        mgr.release_connection(again);

        assert_eq!(mgr.database("index").unwrap().opened_count(), 1);
    }

    #[test]
    fn unknown_database_yields_none() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        assert!(mgr.get_connection("missing", false).is_none());
    }

    #[test]
    fn write_lock_spans_checkout() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);

        let conn = mgr.get_connection("index", true).unwrap();
        assert!(mgr.database("index").unwrap().is_write_locked());

        mgr.release_connection(conn);
        assert!(!mgr.database("index").unwrap().is_write_locked());
    }

    #[test]
    fn init_applies_script() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);

        std::fs::write(
            dir.path().join("index.db.sql"),
            "-- schema for the media index\n\n\
             CREATE TABLE IF NOT EXISTS tracks (id INTEGER PRIMARY KEY, title TEXT);\n\n\
             CREATE INDEX IF NOT EXISTS idx_tracks_title ON tracks (title);\n",
        )
        .unwrap();

        mgr.init().unwrap();

        let conn = mgr.get_connection("index", false).unwrap();
        let count: i64 = conn
            .conn()
            .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        mgr.release_connection(conn);
    }

    #[test]
    fn tokenize_skips_comments_and_blanks() {
        let script = "-- leading comment\n\nCREATE TABLE a (x);\n\n\n\nCREATE TABLE b (y);\n";
        let statements = DatabaseManager::tokenize_script(script);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("TABLE a"));
        assert!(statements[1].contains("TABLE b"));
    }
}
