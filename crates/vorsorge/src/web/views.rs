//! Server-rendered pages.
//!
//! Every page goes through [`page`], which adds the shared layout and
//! navigation. All user-supplied text is passed through [`escape`].

use std::fmt::Write as _;

use axum::response::Html;
use chrono::NaiveDate;

use crate::model::{Appointment, AppointmentStatus, Child, Parent};

/// Shown when a required form field is empty.
pub const MISSING_FIELDS: &str = "Bitte alle Felder ausfüllen.";

/// Shown when a date field cannot be parsed.
pub const INVALID_DATE: &str = "Bitte ein gültiges Datum im Format JJJJ-MM-TT angeben.";

/// Shown for any failed login.
pub const LOGIN_FAILED: &str = "Login fehlgeschlagen";

const DISPLAY_FORMAT: &str = "%d.%m.%Y";

/// Escape text for inclusion in HTML content and attribute values.
#[must_use]
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

fn page(title: &str, logged_in: bool, body: &str) -> Html<String> {
    let nav = if logged_in {
        r#"<a href="/">Start</a> | <a href="/kinder">Kinder</a> | <a href="/termine">Termine</a> | <a href="/eltern">Profil</a> | <a href="/logout">Logout</a>"#
    } else {
        r#"<a href="/login">Login</a> | <a href="/register">Registrieren</a>"#
    };
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"de\">\n<head><meta charset=\"utf-8\"><title>{title} - Vorsorge</title></head>\n<body>\n<nav>{nav}</nav>\n<main>\n<h1>{title}</h1>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title),
    ))
}

fn error_box(error: Option<&str>) -> String {
    error
        .map(|e| format!("<p class=\"error\">{}</p>\n", escape(e)))
        .unwrap_or_default()
}

fn text_input(label: &str, name: &str, kind: &str, value: &str) -> String {
    format!(
        "<label>{label} <input type=\"{kind}\" name=\"{name}\" value=\"{}\"></label><br>\n",
        escape(value)
    )
}

fn form(action: &str, fields: &str, submit: &str) -> String {
    format!("<form method=\"post\" action=\"{action}\">\n{fields}<button type=\"submit\">{submit}</button>\n</form>\n")
}

fn appointment_row(appointment: &Appointment) -> String {
    let state = match appointment.status() {
        AppointmentStatus::Done => "erledigt".to_string(),
        AppointmentStatus::Pending => format!(
            "offen (<a href=\"/termin/{}/done\">als erledigt markieren</a>)",
            appointment.id
        ),
    };
    let confirmed = appointment
        .confirmed_date
        .map(|d| format!(", bestätigt für {}", display_date(d)))
        .unwrap_or_default();
    format!(
        "<li><a href=\"/termin/{id}\">{exam}</a>: fällig am {due}{confirmed}, {state}</li>\n",
        id = appointment.id,
        exam = appointment.exam,
        due = display_date(appointment.due_date),
    )
}

fn next_appointment(next: Option<(&Appointment, &str)>) -> String {
    match next {
        Some((appointment, child_name)) => format!(
            "<p class=\"next\">Nächster Termin: <a href=\"/termin/{}\">{}</a> für {} am {}</p>\n",
            appointment.id,
            appointment.exam,
            escape(child_name),
            display_date(appointment.due_date),
        ),
        None => "<p class=\"next\">Keine anstehenden Termine.</p>\n".to_string(),
    }
}

/// Dashboard with the parent's children and the next open checkup.
#[must_use]
pub fn home(
    parent: &Parent,
    children: &[Child],
    next: Option<(&Appointment, &str)>,
    today: NaiveDate,
) -> Html<String> {
    let mut body = format!(
        "<p>Hallo {}! Heute ist der {}.</p>\n",
        escape(&parent.name),
        display_date(today)
    );
    body.push_str(&next_appointment(next));
    body.push_str(&child_list(children));
    body.push_str("<p><a href=\"/kind/neu\">Kind hinzufügen</a></p>\n");
    page("Übersicht", true, &body)
}

fn child_list(children: &[Child]) -> String {
    if children.is_empty() {
        return "<p>Noch keine Kinder eingetragen.</p>\n".to_string();
    }
    let mut out = String::from("<ul class=\"children\">\n");
    for child in children {
        let _ = writeln!(
            out,
            "<li><a href=\"/kinder/{id}\">{name}</a> (geboren {born}) <a href=\"/kind/bearbeiten/{id}\">bearbeiten</a> <a href=\"/kind/loeschen/{id}\">löschen</a></li>",
            id = child.id,
            name = escape(&child.name),
            born = display_date(child.birth_date),
        );
    }
    out.push_str("</ul>\n");
    out
}

/// Registration form.
#[must_use]
pub fn register(error: Option<&str>, email: &str) -> Html<String> {
    let fields = text_input("E-Mail", "email", "email", email) + &text_input("Passwort", "password", "password", "");
    let body = error_box(error) + &form("/register", &fields, "Registrieren");
    page("Registrieren", false, &body)
}

/// Login form.
#[must_use]
pub fn login(error: Option<&str>, email: &str) -> Html<String> {
    let fields = text_input("E-Mail", "email", "email", email) + &text_input("Passwort", "password", "password", "");
    let body = error_box(error) + &form("/login", &fields, "Login");
    page("Login", false, &body)
}

/// The session parent's own profile.
#[must_use]
pub fn profile(parent: &Parent) -> Html<String> {
    let body = format!(
        "<p>Name: {}</p>\n<p>E-Mail: {}</p>\n<p><a href=\"/profil/bearbeiten\">Profil bearbeiten</a> | <a href=\"/eltern/neu\">Weiteren Elternteil anlegen</a></p>\n",
        escape(&parent.name),
        escape(&parent.email),
    );
    page("Mein Profil", true, &body)
}

/// Profile edit form.
#[must_use]
pub fn profile_edit(error: Option<&str>, name: &str, email: &str) -> Html<String> {
    let fields = text_input("Name", "name", "text", name) + &text_input("E-Mail", "email", "email", email);
    let body = error_box(error) + &form("/profil/bearbeiten", &fields, "Speichern");
    page("Profil bearbeiten", true, &body)
}

/// Form for an extra, unlinked parent record.
#[must_use]
pub fn parent_new(error: Option<&str>, name: &str, email: &str) -> Html<String> {
    let fields = text_input("Name", "name", "text", name) + &text_input("E-Mail", "email", "email", email);
    let body = error_box(error) + &form("/eltern/neu", &fields, "Anlegen");
    page("Elternteil anlegen", true, &body)
}

/// Parent detail page.
#[must_use]
pub fn parent_detail(parent: &Parent) -> Html<String> {
    let body = format!(
        "<p>Name: {}</p>\n<p>E-Mail: {}</p>\n",
        escape(&parent.name),
        escape(&parent.email),
    );
    page("Elternteil", true, &body)
}

/// Child creation form.
#[must_use]
pub fn child_new(error: Option<&str>, name: &str, birth_date: &str) -> Html<String> {
    let fields = text_input("Name", "name", "text", name) + &text_input("Geburtsdatum", "geburt", "date", birth_date);
    let body = error_box(error) + &form("/kind/neu", &fields, "Anlegen");
    page("Kind anlegen", true, &body)
}

/// The parent's children.
#[must_use]
pub fn children(children: &[Child]) -> Html<String> {
    let body = child_list(children) + "<p><a href=\"/kind/neu\">Kind hinzufügen</a></p>\n";
    page("Meine Kinder", true, &body)
}

/// One child with its checkups.
#[must_use]
pub fn child_detail(child: &Child, appointments: &[Appointment]) -> Html<String> {
    let mut body = format!(
        "<p>Geboren am {}</p>\n<ul class=\"appointments\">\n",
        display_date(child.birth_date)
    );
    for appointment in appointments {
        body.push_str(&appointment_row(appointment));
    }
    let _ = write!(
        body,
        "</ul>\n<p><a href=\"/kind/bearbeiten/{id}\">Bearbeiten</a> | <a href=\"/kind/loeschen/{id}\">Löschen</a></p>\n",
        id = child.id
    );
    page(&child.name, true, &body)
}

/// Child edit form.
#[must_use]
pub fn child_edit(child_id: i64, error: Option<&str>, name: &str, birth_date: &str) -> Html<String> {
    let fields = text_input("Name", "name", "text", name) + &text_input("Geburtsdatum", "geburt", "date", birth_date);
    let body = error_box(error) + &form(&format!("/kind/bearbeiten/{child_id}"), &fields, "Speichern");
    page("Kind bearbeiten", true, &body)
}

/// All checkups grouped per child.
#[must_use]
pub fn appointments(
    groups: &[(Child, Vec<Appointment>)],
    next: Option<(&Appointment, &str)>,
    today: NaiveDate,
) -> Html<String> {
    let mut body = format!("<p>Stand: {}</p>\n", display_date(today));
    body.push_str(&next_appointment(next));
    if groups.is_empty() {
        body.push_str("<p>Noch keine Kinder eingetragen.</p>\n");
    }
    for (child, appointments) in groups {
        let _ = writeln!(body, "<h2>{}</h2>\n<ul class=\"appointments\">", escape(&child.name));
        for appointment in appointments {
            body.push_str(&appointment_row(appointment));
        }
        body.push_str("</ul>\n");
    }
    page("Termine", true, &body)
}

/// Appointment detail and edit form.
#[must_use]
pub fn appointment_detail(
    appointment: &Appointment,
    child: &Child,
    error: Option<&str>,
    confirmed_date: &str,
) -> Html<String> {
    let checked = if appointment.completed { " checked" } else { "" };
    let fields = text_input("Bestätigtes Datum", "bestaetigtes_datum", "date", confirmed_date)
        + &format!("<label><input type=\"checkbox\" name=\"erledigt\" value=\"1\"{checked}> erledigt</label><br>\n");
    let body = format!(
        "<p>{} für <a href=\"/kinder/{}\">{}</a>, fällig am {}</p>\n",
        appointment.exam,
        child.id,
        escape(&child.name),
        display_date(appointment.due_date),
    ) + &error_box(error)
        + &form(&format!("/termin/{}", appointment.id), &fields, "Speichern");
    page(&format!("Termin {}", appointment.exam), true, &body)
}

/// 403 page.
#[must_use]
pub fn forbidden() -> Html<String> {
    page("Nicht erlaubt", true, "<p>Sie haben keinen Zugriff auf diese Seite.</p>\n<p><a href=\"/\">Zur Startseite</a></p>")
}

/// 404 page.
#[must_use]
pub fn not_found() -> Html<String> {
    page("Seite nicht gefunden", false, "<p>Die angeforderte Seite existiert nicht.</p>\n<p><a href=\"/\">Zur Startseite</a></p>")
}

/// 500 page.
#[must_use]
pub fn server_error() -> Html<String> {
    page("Interner Fehler", false, "<p>Es ist ein unerwarteter Fehler aufgetreten. Bitte später erneut versuchen.</p>")
}

/// Page for a validation error that reached no form.
#[must_use]
pub fn message(text: &str) -> Html<String> {
    page("Hinweis", false, &format!("<p class=\"error\">{}</p>", escape(text)))
}
