//! Storage error type shared by the auth and api crates

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Failures of the SQLite storage layer
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The pool could not open a connection to the database file
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A schema migration failed and was rolled back
    #[error("Schema migration failed: {0}")]
    Migration(String),

    /// `DATABASE_URL` or another storage setting is unusable
    #[error("Invalid database configuration: {0}")]
    Configuration(String),
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::Query(err)
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
