//! Checkup schedule generation.
//!
//! Every child gets the same ten checkups, each due at a fixed offset from
//! the birth date. Month offsets use calendar arithmetic: adding a month to
//! the 31st lands on the last day of a shorter month rather than spilling
//! into the next one.

use chrono::{Days, Months, NaiveDate};

use crate::error::{Error, Result};
use crate::model::{is_storable, ExamType, NewAppointment};

/// Distance of a checkup from the birth date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// A number of calendar days.
    Days(u64),
    /// A number of calendar months.
    Months(u32),
}

impl Offset {
    /// Apply the offset to a date.
    ///
    /// Returns `None` if the result is outside the supported calendar range.
    #[must_use]
    pub fn apply(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Days(days) => date.checked_add_days(Days::new(days)),
            Self::Months(months) => date.checked_add_months(Months::new(months)),
        }
    }
}

/// The fixed checkup table.
pub const SCHEDULE: [(ExamType, Offset); 10] = [
    (ExamType::U1, Offset::Days(0)),
    (ExamType::U2, Offset::Days(3)),
    (ExamType::U3, Offset::Months(1)),
    (ExamType::U4, Offset::Months(3)),
    (ExamType::U5, Offset::Months(6)),
    (ExamType::U6, Offset::Months(12)),
    (ExamType::U7, Offset::Months(24)),
    (ExamType::U7a, Offset::Months(36)),
    (ExamType::U8, Offset::Months(48)),
    (ExamType::U9, Offset::Months(60)),
];

/// Compute all checkups for a child born on `birth_date`.
///
/// # Errors
///
/// Returns a validation error if any due date falls outside the supported
/// calendar range or past the year 9999. Either all ten appointments are
/// produced or none.
pub fn generate(birth_date: NaiveDate) -> Result<Vec<NewAppointment>> {
    SCHEDULE
        .iter()
        .map(|&(exam, offset)| {
            offset
                .apply(birth_date)
                .filter(|&due_date| is_storable(due_date))
                .map(|due_date| NewAppointment { exam, due_date })
                .ok_or_else(|| {
                    Error::validation(format!(
                        "Geburtsdatum {birth_date} ergibt keinen gültigen {exam}-Termin."
                    ))
                })
        })
        .collect()
}
