//! HTTP server.
//!
//! Wires the route handlers into an axum [`Router`], adds the signed-cookie
//! session layer and request tracing, and runs the server until Ctrl+C or
//! SIGTERM.

pub mod extract;
pub mod handlers;
pub mod views;


use std::net::SocketAddr;
use std::sync::Arc;

use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::Key;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing::{error, info, warn};

use crate::auth::{Argon2Hasher, PasswordHasher};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, SessionConfig};
use crate::error::{Error, Result};
use crate::storage::Storage;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The single database connection.
    pub storage: Arc<Mutex<Storage>>,
    /// Password hashing.
    pub hasher: Arc<dyn PasswordHasher>,
    /// Source of "today".
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Bundle the collaborators handlers need.
    #[must_use]
    pub fn new(
        storage: Storage,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            hasher,
            clock,
        }
    }
}

/// All routes, without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/eltern", get(handlers::profile))
        .route(
            "/profil/bearbeiten",
            get(handlers::profile_edit_form).post(handlers::profile_edit),
        )
        .route(
            "/eltern/neu",
            get(handlers::parent_new_form).post(handlers::parent_new),
        )
        .route("/eltern/{id}", get(handlers::parent_detail))
        .route(
            "/kind/neu",
            get(handlers::child_new_form).post(handlers::child_new),
        )
        .route("/kinder", get(handlers::children))
        .route("/kinder/{id}", get(handlers::child_detail))
        .route(
            "/kind/bearbeiten/{id}",
            get(handlers::child_edit_form).post(handlers::child_edit),
        )
        .route("/kind/loeschen/{id}", get(handlers::child_delete))
        .route("/termine", get(handlers::appointments))
        .route("/termin/{id}/done", get(handlers::appointment_done))
        .route(
            "/termin/{id}",
            get(handlers::appointment_detail).post(handlers::appointment_edit),
        )
        .fallback(handlers::fallback)
        .with_state(state)
}

/// Build the session signing key from configuration.
///
/// # Errors
///
/// Returns `ConfigValidation` if a configured secret is shorter than 64 bytes.
pub fn session_key(config: &SessionConfig) -> Result<Key> {
    match &config.secret {
        Some(secret) => Key::try_from(secret.as_bytes()).map_err(|e| Error::ConfigValidation {
            message: format!("session.secret: {e}"),
        }),
        None => {
            warn!("No session.secret configured; sessions will not survive a restart");
            Ok(Key::generate())
        }
    }
}

/// The complete application: routes, sessions, and request tracing.
///
/// # Errors
///
/// Returns an error if the session key cannot be built.
pub fn app(state: AppState, config: &SessionConfig) -> Result<Router> {
    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.secure_cookie)
        .with_expiry(Expiry::OnInactivity(config.inactivity_timeout()))
        .with_signed(session_key(config)?);

    Ok(router(state)
        .layer(sessions)
        .layer(TraceLayer::new_for_http()))
}

/// Open the database and serve HTTP on `bind` until shutdown.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the address cannot be
/// bound, or the server fails.
pub async fn serve(config: &Config, bind: SocketAddr) -> Result<()> {
    let storage = Storage::open(config.database_path())?;
    let state = AppState::new(
        storage,
        Arc::new(Argon2Hasher::default()),
        Arc::new(SystemClock),
    );
    let app = app(state, &config.session)?;

    let listener = TcpListener::bind(bind).await?;
    info!(%bind, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Forbidden => (status, views::forbidden()).into_response(),
            Self::NotFound { .. } => (status, views::not_found()).into_response(),
            Self::Authentication => Redirect::to("/login").into_response(),
            Self::Validation { message } => (status, views::message(&message)).into_response(),
            other => {
                error!(error = %other, "Request failed");
                (status, views::server_error()).into_response()
            }
        }
    }
}
