//! Route handlers.
//!
//! Handlers are thin: they pull the session identity from [`CurrentParent`],
//! run ownership checks through [`crate::guard`], and render a view or
//! redirect. Validation failures re-render the submitted form with status 200;
//! everything else propagates as [`Error`] and becomes an error page.

use axum::extract::{Form, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use super::extract::{self, CurrentParent, RecordId};
use super::views::{self, INVALID_DATE, LOGIN_FAILED, MISSING_FIELDS};
use super::AppState;
use crate::auth;
use crate::error::{Error, Result};
use crate::guard;
use crate::model::{
    is_storable, next_upcoming, parse_date, Appointment, Child, NewAppointment, DATE_FORMAT,
};
use crate::schedule;

/// Login and registration form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsForm {
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Parent name and email form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ParentForm {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

/// Child create and edit form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChildForm {
    /// Given name.
    pub name: String,
    /// Birth date, `YYYY-MM-DD`.
    pub geburt: String,
}

/// Appointment edit form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppointmentForm {
    /// Confirmed date, `YYYY-MM-DD`. Empty clears it.
    pub bestaetigtes_datum: String,
    /// Non-empty when the "done" checkbox is ticked.
    pub erledigt: Option<String>,
}

impl AppointmentForm {
    fn completed(&self) -> bool {
        self.erledigt.as_deref().is_some_and(|v| !v.is_empty())
    }
}

fn redirect(to: &str) -> Response {
    Redirect::to(to).into_response()
}

fn with_child_name<'a>(
    appointment: Option<&'a Appointment>,
    children: &'a [Child],
) -> Option<(&'a Appointment, &'a str)> {
    let appointment = appointment?;
    let child = children.iter().find(|c| c.id == appointment.child_id)?;
    Some((appointment, child.name.as_str()))
}

fn child_input(form: &ChildForm) -> Result<(String, NaiveDate)> {
    let name = form.name.trim();
    let birth_date = form.geburt.trim();
    if name.is_empty() || birth_date.is_empty() {
        return Err(Error::validation(MISSING_FIELDS));
    }
    let birth_date = parse_date(birth_date)
        .ok()
        .filter(|&date| is_storable(date))
        .ok_or_else(|| Error::validation(INVALID_DATE))?;
    Ok((name.to_string(), birth_date))
}

fn new_child_input(form: &ChildForm) -> Result<(String, NaiveDate, Vec<NewAppointment>)> {
    let (name, birth_date) = child_input(form)?;
    let planned = schedule::generate(birth_date)?;
    Ok((name, birth_date, planned))
}

fn parent_input(form: &ParentForm) -> Option<(&str, &str)> {
    let name = form.name.trim();
    let email = form.email.trim();
    (!name.is_empty() && !email.is_empty()).then_some((name, email))
}

/// `GET /`
pub async fn home(State(state): State<AppState>, current: CurrentParent) -> Result<Html<String>> {
    let today = state.clock.today();
    let (children, appointments) = {
        let storage = state.storage.lock().await;
        (
            storage.children_for_parent(current.parent.id)?,
            storage.appointments_for_parent(current.parent.id)?,
        )
    };
    let next = with_child_name(next_upcoming(&appointments, today), &children);
    Ok(views::home(&current.parent, &children, next, today))
}

/// `GET /register`
pub async fn register_form() -> Html<String> {
    views::register(None, "")
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response> {
    let result = auth::register(&state.storage, &state.hasher, &form.email, &form.password).await;

    match result {
        Ok((user, _)) => {
            info!(user_id = user.id, "User registered");
            extract::bind_user(&session, user.id).await?;
            Ok(redirect("/kinder"))
        }
        Err(Error::Validation { message }) => {
            Ok(views::register(Some(&message), &form.email).into_response())
        }
        Err(e) => Err(e),
    }
}

/// `GET /login`
pub async fn login_form() -> Html<String> {
    views::login(None, "")
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response> {
    let result = auth::login(&state.storage, &state.hasher, &form.email, &form.password).await;

    match result {
        Ok(user) => {
            extract::bind_user(&session, user.id).await?;
            Ok(redirect("/"))
        }
        Err(Error::Authentication) => {
            Ok(views::login(Some(LOGIN_FAILED), &form.email).into_response())
        }
        Err(e) => Err(e),
    }
}

/// `GET /logout`
pub async fn logout(session: Session) -> Result<Response> {
    extract::clear(&session).await?;
    Ok(redirect("/login"))
}

/// `GET /eltern`
pub async fn profile(current: CurrentParent) -> Html<String> {
    views::profile(&current.parent)
}

/// `GET /profil/bearbeiten`
pub async fn profile_edit_form(current: CurrentParent) -> Html<String> {
    views::profile_edit(None, &current.parent.name, &current.parent.email)
}

/// `POST /profil/bearbeiten`
pub async fn profile_edit(
    State(state): State<AppState>,
    current: CurrentParent,
    Form(form): Form<ParentForm>,
) -> Result<Response> {
    let Some((name, email)) = parent_input(&form) else {
        return Ok(views::profile_edit(Some(MISSING_FIELDS), &form.name, &form.email).into_response());
    };

    state
        .storage
        .lock()
        .await
        .update_parent(current.parent.id, name, email)?;
    Ok(redirect("/eltern"))
}

/// `GET /eltern/neu`
pub async fn parent_new_form(_current: CurrentParent) -> Html<String> {
    views::parent_new(None, "", "")
}

/// `POST /eltern/neu`
pub async fn parent_new(
    State(state): State<AppState>,
    _current: CurrentParent,
    Form(form): Form<ParentForm>,
) -> Result<Response> {
    let Some((name, email)) = parent_input(&form) else {
        return Ok(views::parent_new(Some(MISSING_FIELDS), &form.name, &form.email).into_response());
    };

    let parent = state.storage.lock().await.create_parent(name, email, None)?;
    info!(parent_id = parent.id, "Created unlinked parent record");
    Ok(redirect("/eltern"))
}

/// `GET /eltern/{id}`
pub async fn parent_detail(
    State(state): State<AppState>,
    current: CurrentParent,
    RecordId(id): RecordId,
) -> Result<Html<String>> {
    let parent = guard::authorize_parent(&*state.storage.lock().await, current.user_id, id)?;
    Ok(views::parent_detail(&parent))
}

/// `GET /kind/neu`
pub async fn child_new_form(_current: CurrentParent) -> Html<String> {
    views::child_new(None, "", "")
}

/// `POST /kind/neu`
pub async fn child_new(
    State(state): State<AppState>,
    current: CurrentParent,
    Form(form): Form<ChildForm>,
) -> Result<Response> {
    let (name, birth_date, planned) = match new_child_input(&form) {
        Ok(input) => input,
        Err(Error::Validation { message }) => {
            return Ok(views::child_new(Some(&message), &form.name, &form.geburt).into_response());
        }
        Err(e) => return Err(e),
    };

    let (child, appointments) = state
        .storage
        .lock()
        .await
        .create_child_with_appointments(current.parent.id, &name, birth_date, &planned)?;
    info!(
        child_id = child.id,
        appointments = appointments.len(),
        "Created child with checkup schedule"
    );
    Ok(redirect("/kinder"))
}

/// `GET /kinder`
pub async fn children(State(state): State<AppState>, current: CurrentParent) -> Result<Html<String>> {
    let children = state
        .storage
        .lock()
        .await
        .children_for_parent(current.parent.id)?;
    Ok(views::children(&children))
}

/// `GET /kinder/{id}`
pub async fn child_detail(
    State(state): State<AppState>,
    current: CurrentParent,
    RecordId(id): RecordId,
) -> Result<Html<String>> {
    let storage = state.storage.lock().await;
    let child = guard::authorize_child(&storage, &current.parent, id)?;
    let appointments = storage.appointments_for_child(child.id)?;
    Ok(views::child_detail(&child, &appointments))
}

/// `GET /kind/bearbeiten/{id}`
pub async fn child_edit_form(
    State(state): State<AppState>,
    current: CurrentParent,
    RecordId(id): RecordId,
) -> Result<Html<String>> {
    let child = guard::authorize_child(&*state.storage.lock().await, &current.parent, id)?;
    Ok(views::child_edit(
        child.id,
        None,
        &child.name,
        &child.birth_date.format(DATE_FORMAT).to_string(),
    ))
}

/// `POST /kind/bearbeiten/{id}`
///
/// Existing appointments keep their due dates.
pub async fn child_edit(
    State(state): State<AppState>,
    current: CurrentParent,
    RecordId(id): RecordId,
    Form(form): Form<ChildForm>,
) -> Result<Response> {
    let storage = state.storage.lock().await;
    let child = guard::authorize_child(&storage, &current.parent, id)?;

    let (name, birth_date) = match child_input(&form) {
        Ok(input) => input,
        Err(Error::Validation { message }) => {
            return Ok(
                views::child_edit(child.id, Some(&message), &form.name, &form.geburt).into_response(),
            );
        }
        Err(e) => return Err(e),
    };

    storage.update_child(child.id, &name, birth_date)?;
    Ok(redirect("/kinder"))
}

/// `GET /kind/loeschen/{id}`
pub async fn child_delete(
    State(state): State<AppState>,
    current: CurrentParent,
    RecordId(id): RecordId,
) -> Result<Response> {
    let mut storage = state.storage.lock().await;
    let child = guard::authorize_child(&storage, &current.parent, id)?;
    storage.delete_child(child.id)?;
    info!(child_id = child.id, "Deleted child");
    Ok(redirect("/kinder"))
}

/// `GET /termine`
pub async fn appointments(
    State(state): State<AppState>,
    current: CurrentParent,
) -> Result<Html<String>> {
    let today = state.clock.today();
    let groups = {
        let storage = state.storage.lock().await;
        storage
            .children_for_parent(current.parent.id)?
            .into_iter()
            .map(|child| -> Result<(Child, Vec<Appointment>)> {
                let appointments = storage.appointments_for_child(child.id)?;
                Ok((child, appointments))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let all: Vec<Appointment> = groups
        .iter()
        .flat_map(|(_, appointments)| appointments.iter().cloned())
        .collect();
    let children: Vec<Child> = groups.iter().map(|(child, _)| child.clone()).collect();
    let next = with_child_name(next_upcoming(&all, today), &children);

    Ok(views::appointments(&groups, next, today))
}

/// `GET /termin/{id}/done`
pub async fn appointment_done(
    State(state): State<AppState>,
    current: CurrentParent,
    RecordId(id): RecordId,
) -> Result<Response> {
    let storage = state.storage.lock().await;
    let appointment = guard::authorize_appointment(&storage, &current.parent, id)?;
    storage.mark_appointment_done(appointment.id)?;
    Ok(redirect("/termine"))
}

/// `GET /termin/{id}`
pub async fn appointment_detail(
    State(state): State<AppState>,
    current: CurrentParent,
    RecordId(id): RecordId,
) -> Result<Html<String>> {
    let storage = state.storage.lock().await;
    let appointment = guard::authorize_appointment(&storage, &current.parent, id)?;
    let child = storage
        .child_by_id(appointment.child_id)?
        .ok_or_else(|| Error::not_found("child"))?;
    let confirmed = appointment
        .confirmed_date
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default();
    Ok(views::appointment_detail(&appointment, &child, None, &confirmed))
}

/// `POST /termin/{id}`
pub async fn appointment_edit(
    State(state): State<AppState>,
    current: CurrentParent,
    RecordId(id): RecordId,
    Form(form): Form<AppointmentForm>,
) -> Result<Response> {
    let storage = state.storage.lock().await;
    let appointment = guard::authorize_appointment(&storage, &current.parent, id)?;

    let raw = form.bestaetigtes_datum.trim();
    let confirmed_date = if raw.is_empty() {
        None
    } else if let Some(date) = parse_date(raw).ok().filter(|&date| is_storable(date)) {
        Some(date)
    } else {
        let child = storage
            .child_by_id(appointment.child_id)?
            .ok_or_else(|| Error::not_found("child"))?;
        return Ok(
            views::appointment_detail(&appointment, &child, Some(INVALID_DATE), raw).into_response(),
        );
    };

    storage.update_appointment(appointment.id, confirmed_date, form.completed())?;
    Ok(redirect("/termine"))
}

/// Fallback for unknown paths.
pub async fn fallback() -> Error {
    Error::not_found("page")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_input() {
        let form = ChildForm {
            name: " Mara ".into(),
            geburt: "2023-05-15".into(),
        };
        let (name, birth) = child_input(&form).unwrap();
        assert_eq!(name, "Mara");
        assert_eq!(birth, NaiveDate::from_ymd_opt(2023, 5, 15).unwrap());
    }

    #[test]
    fn test_child_input_messages() {
        let missing = ChildForm {
            name: "Mara".into(),
            geburt: String::new(),
        };
        assert_eq!(child_input(&missing).unwrap_err().to_string(), MISSING_FIELDS);

        let malformed = ChildForm {
            name: "Mara".into(),
            geburt: "15.05.2023".into(),
        };
        assert_eq!(child_input(&malformed).unwrap_err().to_string(), INVALID_DATE);

        let five_digit_year = ChildForm {
            name: "Mara".into(),
            geburt: NaiveDate::from_ymd_opt(10000, 1, 1)
                .unwrap()
                .format(DATE_FORMAT)
                .to_string(),
        };
        assert_eq!(
            child_input(&five_digit_year).unwrap_err().to_string(),
            INVALID_DATE
        );
    }

    #[test]
    fn test_new_child_input_rejects_unschedulable_birth_date() {
        let form = ChildForm {
            name: "Mara".into(),
            geburt: NaiveDate::MAX.format(DATE_FORMAT).to_string(),
        };
        assert!(new_child_input(&form).unwrap_err().is_validation());
    }

    #[test]
    fn test_appointment_form_completed() {
        let form = |erledigt: Option<&str>| AppointmentForm {
            bestaetigtes_datum: String::new(),
            erledigt: erledigt.map(str::to_string),
        };
        assert!(form(Some("1")).completed());
        assert!(form(Some("on")).completed());
        assert!(!form(Some("")).completed());
        assert!(!form(None).completed());
    }

    #[test]
    fn test_parent_input() {
        let form = ParentForm {
            name: " Anna ".into(),
            email: "anna@example.com".into(),
        };
        assert_eq!(parent_input(&form), Some(("Anna", "anna@example.com")));

        let form = ParentForm {
            name: "Anna".into(),
            email: "  ".into(),
        };
        assert_eq!(parent_input(&form), None);
    }
}
