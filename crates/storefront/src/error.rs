//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error response has the body `{"message": "..."}`. Server-side
//! failures get a generic message; the detail goes to the log and Sentry.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;
use crate::services::orders::OrderError;
use crate::services::payments::PaymentError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Payment provider call failed outside of checkout.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// No valid session.
    #[error("Authentication required")]
    Unauthenticated,

    /// Session user is not an administrator.
    #[error("Administrator access required")]
    Forbidden,

    /// Malformed request body or path.
    #[error("Bad request: {0}")]
    Validation(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidUsername(_)
                | AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::DuplicateUsername | AuthError::DuplicateEmail => StatusCode::CONFLICT,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Cart(err) => match err {
                CartError::ReportNotFound(_) | CartError::ItemNotFound(_) => StatusCode::NOT_FOUND,
                CartError::Total(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
                CheckoutError::ReportMissing(_) => StatusCode::CONFLICT,
                CheckoutError::Total(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::ReportNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::Forbidden => StatusCode::FORBIDDEN,
                CheckoutError::Payment(err) => payment_status(err),
                CheckoutError::Inconsistent { .. } | CheckoutError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Payment(err) => payment_status(err),
            Self::Order(err) => match err {
                OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(err) => match err {
                CatalogError::ReportNotFound(_) | CatalogError::ContentNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
                CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn client_message(&self, status: StatusCode) -> String {
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            return INTERNAL_MESSAGE.to_owned();
        }

        match self {
            Self::Auth(err) => err.to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Checkout(CheckoutError::Payment(err)) | Self::Payment(err) => {
                payment_message(err)
            }
            Self::Checkout(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Catalog(err) => err.to_string(),
            Self::Validation(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

const fn payment_status(err: &PaymentError) -> StatusCode {
    match err {
        PaymentError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        PaymentError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        PaymentError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PaymentError::Http(_) | PaymentError::Rejected { .. } | PaymentError::Parse(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn payment_message(err: &PaymentError) -> String {
    match err {
        PaymentError::Rejected { message, .. } => format!("Payment provider error: {message}"),
        PaymentError::InvalidAmount(_) => {
            "Payment amount must be positive and at most 99999999.99".to_owned()
        }
        PaymentError::NotConfigured => "Payments are not available".to_owned(),
        PaymentError::Timeout(_) => "Payment provider timed out".to_owned(),
        PaymentError::Http(_) | PaymentError::Parse(_) => "Payment provider error".to_owned(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = self.client_message(status);

        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added report", Some(&[("report_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
