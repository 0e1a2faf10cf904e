//! Core record types for vorsorge.
//!
//! This module defines the four persisted records (users, parents, children
//! and appointments) along with the fixed set of checkup codes.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date format used for storage, forms and display.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A standardized pediatric checkup ("U-Untersuchung").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExamType {
    /// Directly after birth.
    U1,
    /// 3rd to 10th day of life.
    U2,
    /// 4th to 5th week.
    U3,
    /// 3rd to 4th month.
    U4,
    /// 6th to 7th month.
    U5,
    /// 10th to 12th month.
    U6,
    /// 21st to 24th month.
    U7,
    /// 34th to 36th month.
    U7a,
    /// 46th to 48th month.
    U8,
    /// 60th to 64th month.
    U9,
}

impl ExamType {
    /// All checkups in chronological order.
    pub const ALL: [ExamType; 10] = [
        Self::U1,
        Self::U2,
        Self::U3,
        Self::U4,
        Self::U5,
        Self::U6,
        Self::U7,
        Self::U7a,
        Self::U8,
        Self::U9,
    ];

    /// The short code, as stored in the database.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::U1 => "U1",
            Self::U2 => "U2",
            Self::U3 => "U3",
            Self::U4 => "U4",
            Self::U5 => "U5",
            Self::U6 => "U6",
            Self::U7 => "U7",
            Self::U7a => "U7a",
            Self::U8 => "U8",
            Self::U9 => "U9",
        }
    }
}

impl std::fmt::Display for ExamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unknown checkup code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownExamType(pub String);

impl std::fmt::Display for UnknownExamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown checkup code: {}", self.0)
    }
}

impl std::error::Error for UnknownExamType {}

impl FromStr for ExamType {
    type Err = UnknownExamType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|exam| exam.code() == s)
            .ok_or_else(|| UnknownExamType(s.to_string()))
    }
}

/// Login credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Row id.
    pub id: i64,
    /// Unique login email.
    pub email: String,
    /// PHC-format password hash.
    pub password_hash: String,
}

/// Domain profile of a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parent {
    /// Row id.
    pub id: i64,
    /// Display name. Defaults to the email at registration.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Linked login, if any.
    pub user_id: Option<i64>,
}

/// A child belonging to exactly one parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Child {
    /// Row id.
    pub id: i64,
    /// The owning parent.
    pub parent_id: i64,
    /// Given name.
    pub name: String,
    /// Date of birth.
    pub birth_date: NaiveDate,
}

/// Workflow state of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Not yet attended.
    Pending,
    /// Attended and ticked off.
    Done,
}

/// A scheduled checkup for a child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appointment {
    /// Row id.
    pub id: i64,
    /// The child this checkup is for.
    pub child_id: i64,
    /// Which checkup.
    pub exam: ExamType,
    /// Computed from the birth date.
    pub due_date: NaiveDate,
    /// Date booked with the practice, if any.
    pub confirmed_date: Option<NaiveDate>,
    /// Whether the checkup has been attended.
    pub completed: bool,
}

impl Appointment {
    /// Current workflow state.
    #[must_use]
    pub fn status(&self) -> AppointmentStatus {
        if self.completed {
            AppointmentStatus::Done
        } else {
            AppointmentStatus::Pending
        }
    }

    /// Whether this appointment is still open on the given day.
    #[must_use]
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date >= today
    }
}

/// An appointment that has not been persisted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewAppointment {
    /// Which checkup.
    pub exam: ExamType,
    /// Computed due date.
    pub due_date: NaiveDate,
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns the chrono parse error if the input is not a valid calendar date.
pub fn parse_date(input: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
}

/// Whether a date fits the four-digit `YYYY-MM-DD` text form.
///
/// Stored dates are ordered as text, which only matches calendar order for
/// years 0 through 9999.
#[must_use]
pub fn is_storable(date: NaiveDate) -> bool {
    (0..=9999).contains(&date.year())
}

/// Select the next upcoming appointment.
///
/// Picks the earliest-due appointment that is not completed and is due today
/// or later. Ties on the due date go to the lower id.
#[must_use]
pub fn next_upcoming(appointments: &[Appointment], today: NaiveDate) -> Option<&Appointment> {
    appointments
        .iter()
        .filter(|a| a.is_upcoming(today))
        .min_by_key(|a| (a.due_date, a.id))
}
