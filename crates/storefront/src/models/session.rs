//! Session-related types.
//!
//! Only the user id lives in the session. Everything else about the user,
//! including the administrator flag, is re-read on every request.

/// Session keys for authentication data.
pub mod keys {
    /// Key for the logged-in user's id.
    pub const USER_ID: &str = "user_id";
}
