//! Appointment queries.

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{date_column, format_date, optional_date_column, Storage};
use crate::error::Result;
use crate::model::{Appointment, ExamType};

const APPOINTMENT_COLUMNS: &str =
    "a.id, a.child_id, a.exam, a.due_date, a.confirmed_date, a.completed";

impl Storage {
    /// Get an appointment by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn appointment_by_id(&self, id: i64) -> Result<Option<Appointment>> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1");
        let appointment = self
            .conn
            .query_row(&sql, [id], Self::row_to_appointment)
            .optional()?;
        Ok(appointment)
    }

    /// List a child's appointments by due date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn appointments_for_child(&self, child_id: i64) -> Result<Vec<Appointment>> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments a
             WHERE a.child_id = ?1 ORDER BY a.due_date, a.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let appointments = stmt
            .query_map([child_id], Self::row_to_appointment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(appointments)
    }

    /// List the appointments of all of a parent's children by due date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn appointments_for_parent(&self, parent_id: i64) -> Result<Vec<Appointment>> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments a
             JOIN children c ON c.id = a.child_id
             WHERE c.parent_id = ?1 ORDER BY a.due_date, a.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let appointments = stmt
            .query_map([parent_id], Self::row_to_appointment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(appointments)
    }

    /// Resolve the parent that owns an appointment, via its child.
    ///
    /// Returns `None` if the appointment does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn appointment_owner(&self, appointment_id: i64) -> Result<Option<i64>> {
        let owner = self
            .conn
            .query_row(
                "SELECT c.parent_id FROM appointments a
                 JOIN children c ON c.id = a.child_id
                 WHERE a.id = ?1",
                [appointment_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    /// Mark an appointment as done.
    ///
    /// Marking an already completed appointment is a no-op that still
    /// reports success.
    ///
    /// Returns `true` if the appointment exists, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn mark_appointment_done(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("UPDATE appointments SET completed = 1 WHERE id = ?1", [id])?;
        if affected > 0 {
            debug!(appointment_id = id, "Marked appointment done");
        }
        Ok(affected > 0)
    }

    /// Set an appointment's confirmed date and completion flag.
    ///
    /// `None` clears the confirmed date.
    ///
    /// Returns `true` if the appointment was updated, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_appointment(
        &self,
        id: i64,
        confirmed_date: Option<NaiveDate>,
        completed: bool,
    ) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE appointments SET confirmed_date = ?1, completed = ?2 WHERE id = ?3",
            params![confirmed_date.map(format_date), completed, id],
        )?;
        Ok(affected > 0)
    }

    fn row_to_appointment(row: &rusqlite::Row) -> rusqlite::Result<Appointment> {
        let exam: String = row.get(2)?;
        let exam = exam
            .parse::<ExamType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

        Ok(Appointment {
            id: row.get(0)?,
            child_id: row.get(1)?,
            exam,
            due_date: date_column(row, 3)?,
            confirmed_date: optional_date_column(row, 4)?,
            completed: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::super::test_support::{parent, storage};
    use super::super::Storage;
    use crate::model::{next_upcoming, Appointment, ExamType};
    use crate::schedule;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn child_with_schedule(storage: &mut Storage, parent_id: i64, birth: NaiveDate) -> Vec<Appointment> {
        let (_, appointments) = storage
            .create_child_with_appointments(parent_id, "Kind", birth, &schedule::generate(birth).unwrap())
            .unwrap();
        appointments
    }

    #[test]
    fn test_appointment_by_id() {
        let mut storage = storage();
        let p = parent(&mut storage, "a@example.com");
        let appointments = child_with_schedule(&mut storage, p.id, date(2023, 5, 15));

        let u2 = &appointments[1];
        let fetched = storage.appointment_by_id(u2.id).unwrap().unwrap();
        assert_eq!(&fetched, u2);
        assert_eq!(fetched.exam, ExamType::U2);
        assert_eq!(fetched.due_date, date(2023, 5, 18));
        assert!(storage.appointment_by_id(9999).unwrap().is_none());
    }

    #[test]
    fn test_appointments_for_parent_spans_children() {
        let mut storage = storage();
        let a = parent(&mut storage, "a@example.com");
        let b = parent(&mut storage, "b@example.com");
        child_with_schedule(&mut storage, a.id, date(2023, 5, 15));
        child_with_schedule(&mut storage, a.id, date(2020, 1, 1));
        child_with_schedule(&mut storage, b.id, date(2022, 1, 1));

        let all = storage.appointments_for_parent(a.id).unwrap();
        assert_eq!(all.len(), 20);
        assert!(all.windows(2).all(|w| w[0].due_date <= w[1].due_date));
        assert_eq!(all[0].due_date, date(2020, 1, 1));
    }

    #[test]
    fn test_appointment_owner() {
        let mut storage = storage();
        let p = parent(&mut storage, "a@example.com");
        let appointments = child_with_schedule(&mut storage, p.id, date(2023, 5, 15));

        assert_eq!(storage.appointment_owner(appointments[0].id).unwrap(), Some(p.id));
        assert_eq!(storage.appointment_owner(9999).unwrap(), None);
    }

    #[test]
    fn test_mark_done_is_idempotent() {
        let mut storage = storage();
        let p = parent(&mut storage, "a@example.com");
        let appointments = child_with_schedule(&mut storage, p.id, date(2023, 5, 15));
        let id = appointments[0].id;

        assert!(storage.mark_appointment_done(id).unwrap());
        assert!(storage.appointment_by_id(id).unwrap().unwrap().completed);

        assert!(storage.mark_appointment_done(id).unwrap());
        assert!(storage.appointment_by_id(id).unwrap().unwrap().completed);
    }

    #[test]
    fn test_mark_done_missing() {
        let storage = storage();
        assert!(!storage.mark_appointment_done(9999).unwrap());
    }

    #[test]
    fn test_update_appointment_sets_and_clears() {
        let mut storage = storage();
        let p = parent(&mut storage, "a@example.com");
        let appointments = child_with_schedule(&mut storage, p.id, date(2023, 5, 15));
        let id = appointments[2].id;

        assert!(storage
            .update_appointment(id, Some(date(2023, 6, 20)), true)
            .unwrap());
        let updated = storage.appointment_by_id(id).unwrap().unwrap();
        assert_eq!(updated.confirmed_date, Some(date(2023, 6, 20)));
        assert!(updated.completed);
        assert_eq!(updated.due_date, date(2023, 6, 15));

        assert!(storage.update_appointment(id, None, false).unwrap());
        let reverted = storage.appointment_by_id(id).unwrap().unwrap();
        assert_eq!(reverted.confirmed_date, None);
        assert!(!reverted.completed);
    }

    #[test]
    fn test_update_appointment_missing() {
        let storage = storage();
        assert!(!storage.update_appointment(9999, None, true).unwrap());
    }

    #[test]
    fn test_next_upcoming_from_storage() {
        let mut storage = storage();
        let p = parent(&mut storage, "a@example.com");
        let appointments = child_with_schedule(&mut storage, p.id, date(2023, 5, 15));
        storage.mark_appointment_done(appointments[0].id).unwrap();

        let all = storage.appointments_for_parent(p.id).unwrap();

        let next = next_upcoming(&all, date(2023, 5, 15)).unwrap();
        assert_eq!(next.exam, ExamType::U2);

        let next = next_upcoming(&all, date(2023, 5, 19)).unwrap();
        assert_eq!(next.exam, ExamType::U3);

        assert!(next_upcoming(&all, date(2030, 1, 1)).is_none());
    }
}
