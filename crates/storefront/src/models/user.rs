//! User domain types.
//!
//! The password hash never lives on [`User`]; the repository hands it out
//! separately so a `User` is always safe to serialize back to a client.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use cosmic_blueprints_core::{Email, UserId, Username};

/// Optional birth metadata used to personalise reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthDetails {
    pub birth_date: Option<NaiveDate>,
    pub birth_time: Option<String>,
    pub birth_location: Option<String>,
}

/// A storefront account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    pub is_admin: bool,
    #[serde(flatten)]
    pub birth: BirthDetails,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create a [`User`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    /// Argon2 PHC string, never the plaintext.
    pub password_hash: String,
    pub is_admin: bool,
    pub birth: BirthDetails,
}
