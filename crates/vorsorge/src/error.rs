//! Error types for vorsorge.
//!
//! This module defines all error types used throughout the vorsorge crate.
//! Each variant maps to an HTTP status so route handlers can propagate errors
//! with `?` and still produce the right error page.

use std::path::PathBuf;

use axum::http::StatusCode;
use thiserror::Error;

/// The main error type for vorsorge operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Request Errors ===
    /// User input is missing or malformed.
    #[error("{message}")]
    Validation {
        /// Message shown next to the form.
        message: String,
    },

    /// Login credentials did not match.
    #[error("invalid email or password")]
    Authentication,

    /// The resource exists but belongs to someone else.
    #[error("access denied")]
    Forbidden,

    /// The requested resource does not exist.
    #[error("{what} not found")]
    NotFound {
        /// Kind of resource that was looked up.
        what: &'static str,
    },

    // === Security Errors ===
    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// Reading or writing the session failed.
    #[error("session error: {0}")]
    Session(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized Result type for vorsorge operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<tower_sessions::session::Error> for Error {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Session(err.to_string())
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error for the given kind of resource.
    #[must_use]
    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound { what }
    }

    /// Check if this error is caused by user input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error is a uniqueness constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::DatabaseQuery(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }

    /// The HTTP status this error is reported with.
    ///
    /// - Validation: 422 (handlers normally re-render the form instead)
    /// - Authentication: 401 (handlers normally re-render the login form)
    /// - Forbidden: 403
    /// - `NotFound`: 404
    /// - Everything else: 500
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Forbidden;
        assert_eq!(err.to_string(), "access denied");

        let err = Error::not_found("child");
        assert_eq!(err.to_string(), "child not found");
    }

    #[test]
    fn test_validation_error() {
        let err = Error::validation("Bitte alle Felder ausfüllen.");
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Bitte alle Felder ausfüllen.");
        assert!(!Error::Forbidden.is_validation());
    }

    #[test]
    fn test_authentication_error_is_generic() {
        let msg = Error::Authentication.to_string();
        assert!(msg.contains("email or password"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::validation("x").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::Authentication.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(Error::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            Error::not_found("appointment").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::PasswordHash("bad salt".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_forbidden_and_not_found_are_distinct() {
        assert_ne!(
            Error::Forbidden.status_code(),
            Error::not_found("child").status_code()
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
            assert!(!err.is_unique_violation());
        }
    }

    #[test]
    fn test_unique_violation_detected() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (v TEXT UNIQUE)", []).unwrap();
        conn.execute("INSERT INTO t (v) VALUES ('a')", []).unwrap();
        let err: Error = conn
            .execute("INSERT INTO t (v) VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "session.expiry_days must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("expiry_days"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
