//! Authentication error types.

use thiserror::Error;

use cosmic_blueprints_core::{EmailError, UsernameError};

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid username format.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Username already registered (compared without regard to case).
    #[error("username is already taken")]
    DuplicateUsername,

    /// Email already registered (compared without regard to case).
    #[error("email is already registered")]
    DuplicateEmail,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
