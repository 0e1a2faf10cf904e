//! Schema versioning.
//!
//! Migrations are an ordered list. Each one runs in its own transaction and
//! records its version in the `metadata` table on commit, so a failed
//! migration leaves the database at the previous version.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::{CREATE_METADATA_TABLE, SCHEMA_STATEMENTS};

/// Key of the schema version row in `metadata`.
const VERSION_KEY: &str = "schema_version";

struct Migration {
    version: i32,
    description: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "users, parents, children and appointments",
    statements: SCHEMA_STATEMENTS,
}];

/// The schema version this build expects.
pub const CURRENT_VERSION: i32 = 1;

/// Bring the schema up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns `DatabaseMigration` if the stored version is unreadable or newer
/// than this build supports, or a database error if a migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let installed = schema_version(conn)?;
    if installed > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {installed} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > installed) {
        apply(conn, migration)?;
    }
    Ok(())
}

/// Stored schema version; 0 for a fresh database.
fn schema_version(conn: &Connection) -> Result<i32> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
    }
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for statement in migration.statements {
        tx.execute(statement, [])?;
    }
    tx.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, migration.version.to_string()),
    )?;
    tx.commit()?;

    info!(
        version = migration.version,
        "Applied schema migration: {}", migration.description
    );
    Ok(())
}
