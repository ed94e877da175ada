//! Core configuration structures.

use serde::{Deserialize, Serialize};

/// Write-lock pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockPoolConfig {
    /// Number of pre-allocated lock slots.
    pub size: usize,
}

impl Default for LockPoolConfig {
    fn default() -> Self {
        Self { size: 5 }
    }
}

/// One named database store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Name the store is addressed by (e.g. `index`, `server`).
    pub name: String,
    /// Path to the database file.
    pub path: String,
    /// Run with `synchronous=NORMAL` instead of `OFF`. See the SQLite
    /// documentation for the durability trade-off.
    #[serde(default)]
    pub synchronous: bool,
}

/// Root configuration for the scheduling and pooling core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Write-lock pool sizing.
    #[serde(default)]
    pub lock_pool: LockPoolConfig,
    /// Database stores to manage.
    pub databases: Vec<DatabaseConfig>,
}

impl LockPoolConfig {
    /// Validate lock pool configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.size == 0 {
            return Err("lock_pool.size must be greater than 0".into());
        }
        Ok(())
    }
}

impl DatabaseConfig {
    /// Validate a database entry.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("database name must not be empty".into());
        }
        if self.path.is_empty() {
            return Err("database path must not be empty".into());
        }
        Ok(())
    }
}

impl CoreConfig {
    /// Validate all sections; database names must be unique.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        self.lock_pool.validate()?;
        for db in &self.databases {
            db.validate()
                .map_err(|e| format!("database `{}` invalid: {e}", db.name))?;
        }
        for (i, db) in self.databases.iter().enumerate() {
            if self.databases[..i].iter().any(|other| other.name == db.name) {
                return Err(format!("duplicate database name `{}`", db.name));
            }
        }
        Ok(())
    }

    /// Parse core configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse failure or the first invalid value.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: CoreConfig = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
