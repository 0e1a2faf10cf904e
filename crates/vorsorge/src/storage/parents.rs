//! Parent queries.

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::Storage;
use crate::error::Result;
use crate::model::Parent;

impl Storage {
    /// Create a parent record, optionally linked to a login.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn create_parent(&self, name: &str, email: &str, user_id: Option<i64>) -> Result<Parent> {
        self.conn.execute(
            "INSERT INTO parents (name, email, user_id) VALUES (?1, ?2, ?3)",
            params![name, email, user_id],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted parent with id {}", id);

        Ok(Parent {
            id,
            name: name.to_string(),
            email: email.to_string(),
            user_id,
        })
    }

    /// Get a parent by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn parent_by_id(&self, id: i64) -> Result<Option<Parent>> {
        let parent = self
            .conn
            .query_row(
                "SELECT id, name, email, user_id FROM parents WHERE id = ?1",
                [id],
                Self::row_to_parent,
            )
            .optional()?;
        Ok(parent)
    }

    /// Get the parent record linked to a login.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn parent_for_user(&self, user_id: i64) -> Result<Option<Parent>> {
        let parent = self
            .conn
            .query_row(
                "SELECT id, name, email, user_id FROM parents WHERE user_id = ?1
                 ORDER BY id LIMIT 1",
                [user_id],
                Self::row_to_parent,
            )
            .optional()?;
        Ok(parent)
    }

    /// Resolve the login a parent record is linked to.
    ///
    /// Returns `None` if the parent does not exist, `Some(None)` if it exists
    /// but is not linked to any login.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn parent_user(&self, parent_id: i64) -> Result<Option<Option<i64>>> {
        let owner = self
            .conn
            .query_row(
                "SELECT user_id FROM parents WHERE id = ?1",
                [parent_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    /// Update a parent's name and email.
    ///
    /// Returns `true` if a parent was updated, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_parent(&self, id: i64, name: &str, email: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE parents SET name = ?1, email = ?2 WHERE id = ?3",
            params![name, email, id],
        )?;
        Ok(affected > 0)
    }

    fn row_to_parent(row: &rusqlite::Row) -> rusqlite::Result<Parent> {
        Ok(Parent {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            user_id: row.get(3)?,
        })
    }
}
