//! Authentication middleware and extractors.
//!
//! The session holds only a user id. Each extractor resolves it against the
//! repository, so a deleted account or a revoked admin flag takes effect on
//! the next request.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tower_sessions::Session;

use cosmic_blueprints_core::UserId;

use crate::error::AppError;
use crate::models::{User, session::keys};
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// Rejects with `AppError::Unauthenticated` (401) when there is no valid
/// session.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub User);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        current_user(parts, &state)
            .await?
            .map(Self)
            .ok_or(AppError::Unauthenticated)
    }
}

/// Extractor that requires a logged-in administrator.
///
/// Rejects with 401 when there is no session and 403 when the user is not
/// an administrator.
pub struct RequireAdmin(pub User);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!(user_id = %user.id, "Non-admin attempted admin action");
            return Err(AppError::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is
/// logged in.
pub struct OptionalAuth(pub Option<User>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(Self(current_user(parts, &state).await?))
    }
}

async fn current_user(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    // Get the session from extensions (set by SessionManagerLayer)
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };

    let Some(user_id) = session_user_id(session).await else {
        return Ok(None);
    };

    let user = state.repo().get_user(user_id).await?;
    if user.is_none() {
        tracing::debug!(user_id = %user_id, "Session names an unknown user");
    }
    Ok(user)
}

/// The user id stored in `session`. An unreadable session counts as
/// anonymous, but the failure is logged.
async fn session_user_id(session: &Session) -> Option<UserId> {
    match session.get::<UserId>(keys::USER_ID).await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read session, treating request as anonymous");
            None
        }
    }
}

/// Bind the session to `user_id`, issuing a fresh session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user_id: UserId,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::USER_ID, user_id).await
}

/// Drop the session entirely (logout). Safe to call without a session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
