//! Common library for the todo list service
//!
//! This crate provides the storage plumbing shared by the auth and api
//! crates: connection pooling, health checks, versioned schema migrations
//! and the storage error type.
//!
//! ```rust,no_run
//! use todo_common::{DatabaseConfig, health_check, init_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     println!("Database health check: {}", health_check(&pool).await?);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod migrations;

pub use database::{DatabaseConfig, health_check, init_pool};
pub use error::{DatabaseError, DatabaseResult};
pub use migrations::run_migrations;
