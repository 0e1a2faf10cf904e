//! Child queries.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{date_column, format_date, Storage};
use crate::error::Result;
use crate::model::{Appointment, Child, NewAppointment};

impl Storage {
    /// Create a child together with its checkup appointments.
    ///
    /// The child row and every appointment row are written in a single
    /// transaction; if any insert fails nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn create_child_with_appointments(
        &mut self,
        parent_id: i64,
        name: &str,
        birth_date: NaiveDate,
        appointments: &[NewAppointment],
    ) -> Result<(Child, Vec<Appointment>)> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO children (parent_id, name, birth_date) VALUES (?1, ?2, ?3)",
            params![parent_id, name, format_date(birth_date)],
        )?;
        let child_id = tx.last_insert_rowid();

        let mut created = Vec::with_capacity(appointments.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO appointments (child_id, exam, due_date, completed)
                 VALUES (?1, ?2, ?3, 0)",
            )?;
            for new in appointments {
                stmt.execute(params![child_id, new.exam.code(), format_date(new.due_date)])?;
                created.push(Appointment {
                    id: tx.last_insert_rowid(),
                    child_id,
                    exam: new.exam,
                    due_date: new.due_date,
                    confirmed_date: None,
                    completed: false,
                });
            }
        }

        tx.commit()?;
        info!(
            child_id,
            parent_id,
            appointments = created.len(),
            "Created child with appointments"
        );

        Ok((
            Child {
                id: child_id,
                parent_id,
                name: name.to_string(),
                birth_date,
            },
            created,
        ))
    }

    /// Get a child by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn child_by_id(&self, id: i64) -> Result<Option<Child>> {
        let child = self
            .conn
            .query_row(
                "SELECT id, parent_id, name, birth_date FROM children WHERE id = ?1",
                [id],
                Self::row_to_child,
            )
            .optional()?;
        Ok(child)
    }

    /// List a parent's children, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn children_for_parent(&self, parent_id: i64) -> Result<Vec<Child>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, parent_id, name, birth_date FROM children
             WHERE parent_id = ?1 ORDER BY birth_date, id",
        )?;
        let children = stmt
            .query_map([parent_id], Self::row_to_child)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(children)
    }

    /// Resolve the parent that owns a child.
    ///
    /// Returns `None` if the child does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn child_owner(&self, child_id: i64) -> Result<Option<i64>> {
        let owner = self
            .conn
            .query_row(
                "SELECT parent_id FROM children WHERE id = ?1",
                [child_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    /// Update a child's name and birth date.
    ///
    /// Existing appointments keep their due dates.
    ///
    /// Returns `true` if a child was updated, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_child(&self, id: i64, name: &str, birth_date: NaiveDate) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE children SET name = ?1, birth_date = ?2 WHERE id = ?3",
            params![name, format_date(birth_date), id],
        )?;
        Ok(affected > 0)
    }

    /// Delete a child and all of its appointments.
    ///
    /// Returns `true` if a child was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_child(&mut self, id: i64) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let appointments = tx.execute("DELETE FROM appointments WHERE child_id = ?1", [id])?;
        let affected = tx.execute("DELETE FROM children WHERE id = ?1", [id])?;
        tx.commit()?;

        if affected > 0 {
            debug!(child_id = id, appointments, "Deleted child");
        }
        Ok(affected > 0)
    }

    fn row_to_child(row: &rusqlite::Row) -> rusqlite::Result<Child> {
        Ok(Child {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            name: row.get(2)?,
            birth_date: date_column(row, 3)?,
        })
    }
}
