//! Storage layer for vorsorge.
//!
//! This module provides `SQLite`-based persistent storage for users, parents,
//! children and their checkup appointments. Queries are grouped per record
//! type; ownership lookups (`child_owner`, `appointment_owner`, `parent_user`)
//! resolve the chain Appointment → Child → Parent → User explicitly so the
//! authorization guard never has to navigate object graphs.

mod appointments;
mod children;
pub mod migrations;
mod parents;
pub mod schema;
mod users;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{parse_date, DATE_FORMAT};

/// Storage engine for family records.
///
/// Holds a single `SQLite` connection. Multi-row writes (registration, child
/// creation, child deletion) run inside a transaction and therefore take
/// `&mut self`.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get row counts and file size.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let count = |table: &str| -> Result<i64> {
            let sql = format!("SELECT COUNT(*) FROM {table}");
            Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            users: count("users")?,
            parents: count("parents")?,
            children: count("children")?,
            appointments: count("appointments")?,
            db_size_bytes,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of registered logins.
    pub users: i64,
    /// Number of parent records.
    pub parents: i64,
    /// Number of children.
    pub children: i64,
    /// Number of appointments.
    pub appointments: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Read a `YYYY-MM-DD` column.
fn date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    parse_date(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a nullable `YYYY-MM-DD` column.
fn optional_date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        parse_date(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Format a date for storage.
fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Storage;
    use crate::model::Parent;

    pub(crate) fn storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    /// Register a user with a linked parent record.
    pub(crate) fn parent(storage: &mut Storage, email: &str) -> Parent {
        let (_, parent) = storage
            .create_user_with_parent(email, "$argon2id$test-hash")
            .expect("failed to create parent");
        parent
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{parent, storage};
    use super::*;
    use crate::schedule;

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_path() {
        let storage = storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let storage = storage();
        let result = storage.conn.execute(
            "INSERT INTO children (parent_id, name, birth_date) VALUES (999, 'x', '2024-01-01')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_stats_empty() {
        let storage = storage();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.users, 0);
        assert_eq!(stats.parents, 0);
        assert_eq!(stats.children, 0);
        assert_eq!(stats.appointments, 0);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_stats_with_data() {
        let mut storage = storage();
        let p = parent(&mut storage, "a@example.com");
        let birth = NaiveDate::from_ymd_opt(2023, 5, 15).unwrap();
        storage
            .create_child_with_appointments(p.id, "Mara", birth, &schedule::generate(birth).unwrap())
            .unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.users, 1);
        assert_eq!(stats.parents, 1);
        assert_eq!(stats.children, 1);
        assert_eq!(stats.appointments, 10);
    }

    #[test]
    fn test_corrupt_date_is_an_error() {
        let mut storage = storage();
        let p = parent(&mut storage, "a@example.com");
        storage
            .conn
            .execute(
                "INSERT INTO children (parent_id, name, birth_date) VALUES (?1, 'x', 'not-a-date')",
                [p.id],
            )
            .unwrap();

        assert!(storage.children_for_parent(p.id).is_err());
    }

    #[test]
    fn test_open_file_based() {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("vorsorge_test_{}.db", std::process::id()));

        let mut storage = Storage::open(&db_path).unwrap();
        parent(&mut storage, "file@example.com");
        assert_eq!(storage.stats().unwrap().users, 1);
        assert!(storage.stats().unwrap().db_size_bytes > 0);
        assert_eq!(storage.path(), db_path);

        drop(storage);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp_dir = std::env::temp_dir();
        let root = temp_dir.join(format!("vorsorge_test_dirs_{}", std::process::id()));
        let nested_path = root.join("nested/db.sqlite");
        let _ = std::fs::remove_dir_all(&root);

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(storage);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_storage_stats_serialize() {
        let stats = StorageStats {
            users: 2,
            parents: 3,
            children: 4,
            appointments: 40,
            db_size_bytes: 1024,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"appointments\":40"));
    }
}
