//! User queries.

use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::Storage;
use crate::error::{Error, Result};
use crate::model::{Parent, User};

impl Storage {
    /// Register a login together with its parent record.
    ///
    /// The parent's name starts out as the email address. Both rows are
    /// written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the email is already registered, or a
    /// database error if the insert fails.
    pub fn create_user_with_parent(
        &mut self,
        email: &str,
        password_hash: &str,
    ) -> Result<(User, Parent)> {
        let tx = self.conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO users (email, password_hash) VALUES (?1, ?2)",
            params![email, password_hash],
        );
        if let Err(e) = inserted {
            let err = Error::from(e);
            if err.is_unique_violation() {
                debug!("Rejected duplicate registration");
                return Err(Error::validation(
                    "Diese E-Mail-Adresse ist bereits registriert.",
                ));
            }
            return Err(err);
        }
        let user_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO parents (name, email, user_id) VALUES (?1, ?1, ?2)",
            params![email, user_id],
        )?;
        let parent_id = tx.last_insert_rowid();

        tx.commit()?;
        info!(user_id, parent_id, "Registered new user");

        Ok((
            User {
                id: user_id,
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            },
            Parent {
                id: parent_id,
                name: email.to_string(),
                email: email.to_string(),
                user_id: Some(user_id),
            },
        ))
    }

    /// Look up a login by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, password_hash FROM users WHERE email = ?1",
                [email],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Count logins registered with the given email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_users_with_email(&self, email: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            [email],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::storage;

    #[test]
    fn test_create_user_with_parent() {
        let mut storage = storage();
        let (user, parent) = storage
            .create_user_with_parent("parent@example.com", "hash")
            .unwrap();

        assert_eq!(user.email, "parent@example.com");
        assert_eq!(parent.name, "parent@example.com");
        assert_eq!(parent.email, "parent@example.com");
        assert_eq!(parent.user_id, Some(user.id));

        let stored = storage.parent_for_user(user.id).unwrap().unwrap();
        assert_eq!(stored, parent);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let mut storage = storage();
        storage
            .create_user_with_parent("parent@example.com", "hash")
            .unwrap();

        let err = storage
            .create_user_with_parent("parent@example.com", "other")
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(
            storage.count_users_with_email("parent@example.com").unwrap(),
            1
        );
        assert_eq!(storage.stats().unwrap().parents, 1);
    }

    #[test]
    fn test_user_by_email() {
        let mut storage = storage();
        let (user, _) = storage
            .create_user_with_parent("parent@example.com", "hash")
            .unwrap();

        let found = storage.user_by_email("parent@example.com").unwrap().unwrap();
        assert_eq!(found, user);
        assert!(storage.user_by_email("nobody@example.com").unwrap().is_none());
    }
}
