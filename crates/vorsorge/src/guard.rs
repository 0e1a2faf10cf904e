//! Ownership checks.
//!
//! Every child and appointment belongs to exactly one parent. Before a
//! handler reads or changes one, it resolves the owner through storage and
//! compares it with the parent of the current session. A missing record is
//! [`Error::NotFound`]; a record owned by someone else is
//! [`Error::Forbidden`].

use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{Appointment, Child, Parent};
use crate::storage::Storage;

/// Compare a resolved owner with the requesting parent.
///
/// # Errors
///
/// Returns `NotFound` if `owner` is `None`, `Forbidden` if it is a
/// different parent.
pub fn ensure_owner(owner: Option<i64>, current: &Parent, what: &'static str) -> Result<()> {
    match owner {
        None => Err(Error::not_found(what)),
        Some(owner) if owner == current.id => Ok(()),
        Some(owner) => {
            warn!(
                resource = what,
                owner,
                requester = current.id,
                "Rejected access to foreign record"
            );
            Err(Error::Forbidden)
        }
    }
}

/// Load a child after checking that `current` owns it.
///
/// # Errors
///
/// Returns `NotFound`, `Forbidden`, or a database error.
pub fn authorize_child(storage: &Storage, current: &Parent, child_id: i64) -> Result<Child> {
    ensure_owner(storage.child_owner(child_id)?, current, "child")?;
    storage
        .child_by_id(child_id)?
        .ok_or_else(|| Error::not_found("child"))
}

/// Load an appointment after checking that `current` owns its child.
///
/// # Errors
///
/// Returns `NotFound`, `Forbidden`, or a database error.
pub fn authorize_appointment(
    storage: &Storage,
    current: &Parent,
    appointment_id: i64,
) -> Result<Appointment> {
    ensure_owner(
        storage.appointment_owner(appointment_id)?,
        current,
        "appointment",
    )?;
    storage
        .appointment_by_id(appointment_id)?
        .ok_or_else(|| Error::not_found("appointment"))
}

/// Load a parent record after checking it is linked to the session's login.
///
/// # Errors
///
/// Returns `NotFound` if the record does not exist, `Forbidden` if it is
/// linked to another login or to none.
pub fn authorize_parent(storage: &Storage, user_id: i64, parent_id: i64) -> Result<Parent> {
    match storage.parent_user(parent_id)? {
        None => return Err(Error::not_found("parent")),
        Some(Some(owner)) if owner == user_id => {}
        Some(_) => {
            warn!(parent_id, requester = user_id, "Rejected access to parent record");
            return Err(Error::Forbidden);
        }
    }
    storage
        .parent_by_id(parent_id)?
        .ok_or_else(|| Error::not_found("parent"))
}
