//! Account route handlers.
//!
//! Registration and login both start a session; the session id is cycled
//! each time so a pre-login cookie cannot be reused afterwards.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::Message;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::JsonBody;
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::{BirthDetails, User};
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub birth_time: Option<String>,
    #[serde(default)]
    pub birth_location: Option<String>,
}

impl RegisterRequest {
    /// Birth metadata with blanks dropped. A date that does not parse is
    /// dropped rather than failing the registration.
    fn birth(&self) -> BirthDetails {
        BirthDetails {
            birth_date: self.birth_date.as_deref().and_then(parse_birth_date),
            birth_time: non_blank(self.birth_time.as_deref()),
            birth_location: non_blank(self.birth_location.as_deref()),
        }
    }
}

fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, user.id)
        .await
        .map_err(|e| AppError::Internal(format!("failed to start session: {e}")))?;
    set_sentry_user(&user.id, Some(user.username.as_str()));
    Ok(())
}

/// Create an account and log it in.
#[instrument(skip(state, session, body), fields(username = %body.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.repo())
        .register(
            Registration {
                username: &body.username,
                email: &body.email,
                password: &body.password,
            },
            body.birth(),
        )
        .await?;

    start_session(&session, &user).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Verify credentials and start a session.
#[instrument(skip(state, session, body), fields(username = %body.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.repo())
        .login(&body.username, &body.password)
        .await
        .inspect_err(|e| tracing::warn!("Login failed: {e}"))?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(user))
}

/// End the session. Succeeds without one.
#[instrument(skip(session, user))]
pub async fn logout(session: Session, OptionalAuth(user): OptionalAuth) -> Result<Json<Message>> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("failed to end session: {e}")))?;
    clear_sentry_user();

    if let Some(user) = user {
        tracing::info!(user_id = %user.id, "User logged out");
    }

    Ok(Json(Message::new("Logged out successfully")))
}

/// The logged-in user.
pub async fn me(RequireAuth(user): RequireAuth) -> Json<User> {
    Json(user)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(birth_date: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            username: "luna".to_owned(),
            email: "luna@example.com".to_owned(),
            password: "correct horse".to_owned(),
            birth_date: birth_date.map(String::from),
            birth_time: Some("  ".to_owned()),
            birth_location: Some("Lisbon".to_owned()),
        }
    }

    #[test]
    fn test_birth_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1990, 4, 12).unwrap();
        assert_eq!(request(Some("1990-04-12")).birth().birth_date, Some(expected));
        assert_eq!(
            request(Some("1990-04-12T08:30:00Z")).birth().birth_date,
            Some(expected)
        );
        assert_eq!(request(Some("not a date")).birth().birth_date, None);
        assert_eq!(request(None).birth().birth_date, None);
    }

    #[test]
    fn test_blank_fields_dropped() {
        let birth = request(None).birth();
        assert_eq!(birth.birth_time, None);
        assert_eq!(birth.birth_location.as_deref(), Some("Lisbon"));
    }
}
