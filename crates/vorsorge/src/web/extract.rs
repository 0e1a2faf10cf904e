//! Request-scoped identity and path extractors.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use tower_sessions::Session;
use tracing::debug;

use super::AppState;
use crate::error::{Error, Result};
use crate::model::Parent;

/// Session key holding the authenticated user's id.
pub const SESSION_USER_ID_KEY: &str = "user_id";

/// Bind the session to a user, rotating the session id first.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn bind_user(session: &Session, user_id: i64) -> Result<()> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_ID_KEY, user_id).await?;
    Ok(())
}

/// Drop all session state.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear(session: &Session) -> Result<()> {
    session.flush().await?;
    Ok(())
}

/// The logged-in user and their parent record.
///
/// Requests without a session, or whose user has no parent record, are
/// redirected to `/login`.
#[derive(Debug, Clone)]
pub struct CurrentParent {
    /// The authenticated user's id.
    pub user_id: i64,
    /// The parent record linked to that user.
    pub parent: Parent,
}

impl FromRequestParts<AppState> for CurrentParent {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let user_id: Option<i64> = session
            .get(SESSION_USER_ID_KEY)
            .await
            .map_err(|e| Error::from(e).into_response())?;
        let Some(user_id) = user_id else {
            return Err(Redirect::to("/login").into_response());
        };

        let parent = state
            .storage
            .lock()
            .await
            .parent_for_user(user_id)
            .map_err(IntoResponse::into_response)?;

        match parent {
            Some(parent) => Ok(Self { user_id, parent }),
            None => {
                debug!(user_id, "Session user has no parent record");
                Err(Redirect::to("/login").into_response())
            }
        }
    }
}

/// A numeric record id from the path. Anything else is a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for RecordId {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| Error::not_found("page"))?;
        Ok(Self(id))
    }
}
