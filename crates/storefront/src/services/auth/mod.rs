//! Authentication service.
//!
//! Password registration and login. Sessions are handled by the HTTP
//! layer; this service only decides who someone is.

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use cosmic_blueprints_core::{Email, Username};

use crate::db::{EMAIL_TAKEN, Repository, RepositoryError, USERNAME_TAKEN};
use crate::models::{BirthDetails, NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash verified against when the username is unknown, so a failed login
/// costs the same either way.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("cosmic-blueprints-dummy").ok());

/// Registration input as received from a client.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'r> {
    pub username: &'r str,
    pub email: &'r str,
    pub password: &'r str,
}

/// Authentication service.
///
/// Handles user registration and password login.
pub struct AuthService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` for malformed input.
    /// Returns `AuthError::DuplicateUsername` / `AuthError::DuplicateEmail`
    /// if either is already registered in any letter case.
    #[instrument(skip(self, input, birth), fields(username = %input.username))]
    pub async fn register(
        &self,
        input: Registration<'_>,
        birth: BirthDetails,
    ) -> Result<User, AuthError> {
        self.create_account(input, birth, false).await
    }

    /// Create an administrator account.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_admin(&self, input: Registration<'_>) -> Result<User, AuthError> {
        self.create_account(input, BirthDetails::default(), true)
            .await
    }

    async fn create_account(
        &self,
        input: Registration<'_>,
        birth: BirthDetails,
        is_admin: bool,
    ) -> Result<User, AuthError> {
        let username = Username::parse(input.username)?;
        let email = Email::parse(input.email)?;
        validate_password(input.password)?;

        // Checked up front for a precise error; the store enforces it too.
        if self.repo.get_user_by_username(&username).await?.is_some() {
            return Err(AuthError::DuplicateUsername);
        }
        if self.repo.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password(input.password)?;

        let user = self
            .repo
            .create_user(NewUser {
                username,
                email,
                password_hash,
                is_admin,
                birth,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(ref m) if m == EMAIL_TAKEN => AuthError::DuplicateEmail,
                RepositoryError::Conflict(ref m) if m == USERNAME_TAKEN => {
                    AuthError::DuplicateUsername
                }
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, is_admin, "Account created");
        Ok(user)
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username is unknown or
    /// the password is wrong. The two cases are indistinguishable.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let found = match Username::parse(username) {
            Ok(username) => self.repo.get_password_hash(&username).await?,
            Err(_) => None,
        };

        let Some((user, password_hash)) = found else {
            burn_verification(password);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

fn burn_verification(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{InMemoryRepository, MockRepository};

    fn input<'r>(username: &'r str, email: &'r str) -> Registration<'r> {
        Registration {
            username,
            email,
            password: "correct horse",
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let repo = InMemoryRepository::new();
        let auth = AuthService::new(&repo);

        let user = auth
            .register(input("Luna", "luna@example.com"), BirthDetails::default())
            .await
            .unwrap();
        assert!(!user.is_admin);

        let logged_in = auth.login("luna", "correct horse").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let repo = InMemoryRepository::new();
        AuthService::new(&repo)
            .register(input("luna", "luna@example.com"), BirthDetails::default())
            .await
            .unwrap();

        let (_, hash) = repo
            .get_password_hash(&Username::parse("luna").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_ne!(hash, "correct horse");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_duplicates_ignore_case() {
        let repo = InMemoryRepository::new();
        let auth = AuthService::new(&repo);
        auth.register(input("Luna", "luna@example.com"), BirthDetails::default())
            .await
            .unwrap();

        let err = auth
            .register(input("LUNA", "other@example.com"), BirthDetails::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));

        let err = auth
            .register(input("sol", "LUNA@example.com"), BirthDetails::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let repo = InMemoryRepository::new();
        let auth = AuthService::new(&repo);
        auth.register(input("luna", "luna@example.com"), BirthDetails::default())
            .await
            .unwrap();

        let wrong_password = auth.login("luna", "wrong password").await.unwrap_err();
        let unknown_user = auth.login("nobody", "correct horse").await.unwrap_err();
        let malformed = auth.login("x", "correct horse").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert!(matches!(malformed, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let repo = InMemoryRepository::new();
        let err = AuthService::new(&repo)
            .register(
                Registration {
                    username: "luna",
                    email: "luna@example.com",
                    password: "short",
                },
                BirthDetails::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn test_store_conflict_maps_to_duplicate() {
        // Another request won the race between the pre-check and the insert.
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_username().returning(|_| Ok(None));
        repo.expect_get_user_by_email().returning(|_| Ok(None));
        repo.expect_create_user()
            .returning(|_| Err(RepositoryError::Conflict(EMAIL_TAKEN.to_owned())));

        let err = AuthService::new(&repo)
            .register(input("luna", "luna@example.com"), BirthDetails::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_create_admin() {
        let repo = InMemoryRepository::new();
        let admin = AuthService::new(&repo)
            .create_admin(input("admin", "admin@cosmicblueprints.com"))
            .await
            .unwrap();
        assert!(admin.is_admin);
    }
}
