//! Error taxonomy of the authentication flows

use thiserror::Error;
use todo_common::DatabaseError;

/// Failures of registration, login and request authentication
#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed registration or login input
    #[error("{0}")]
    Validation(String),

    #[error("Username already registered")]
    DuplicateUsername,

    #[error("Email already registered")]
    DuplicateEmail,

    /// Unknown user or wrong password; deliberately undifferentiated
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Missing, invalid or expired token, or a token whose subject is gone
    #[error("Could not validate credentials")]
    Unauthenticated,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(DatabaseError::Query(err))
    }
}
