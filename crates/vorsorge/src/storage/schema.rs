//! `SQLite` schema definitions for vorsorge.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema. Dates are stored as `YYYY-MM-DD` text so they sort
//! and compare as calendar dates.

/// SQL statement to create the users table.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the parents table.
pub const CREATE_PARENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS parents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    user_id INTEGER REFERENCES users(id) ON DELETE SET NULL
)
";

/// SQL statement to create the children table.
pub const CREATE_CHILDREN_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS children (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER NOT NULL REFERENCES parents(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    birth_date TEXT NOT NULL
)
";

/// SQL statement to create the appointments table.
pub const CREATE_APPOINTMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    child_id INTEGER NOT NULL REFERENCES children(id) ON DELETE CASCADE,
    exam TEXT NOT NULL,
    due_date TEXT NOT NULL,
    confirmed_date TEXT,
    completed INTEGER NOT NULL DEFAULT 0
)
";

/// Index for resolving a user's parent record.
pub const CREATE_PARENT_USER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_parents_user ON parents(user_id)
";

/// Index for listing a parent's children.
pub const CREATE_CHILD_PARENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_children_parent ON children(parent_id)
";

/// Index for listing a child's appointments.
pub const CREATE_APPOINTMENT_CHILD_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_appointments_child ON appointments(child_id)
";

/// Index for ordering appointments by due date.
pub const CREATE_APPOINTMENT_DUE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_appointments_due ON appointments(due_date)
";

/// Key-value table holding the schema version. Created before any migration
/// runs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Statements of the version 1 schema, in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_PARENTS_TABLE,
    CREATE_CHILDREN_TABLE,
    CREATE_APPOINTMENTS_TABLE,
    CREATE_PARENT_USER_INDEX,
    CREATE_CHILD_PARENT_INDEX,
    CREATE_APPOINTMENT_CHILD_INDEX,
    CREATE_APPOINTMENT_DUE_INDEX,
];
