//! HTTP API of the todo list service
//!
//! Wires the authentication flows from `todo-auth` and the todo repository
//! into an axum router. The binary in `main.rs` only reads configuration,
//! prepares the database and serves [`routes::create_router`].

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod query;
pub mod repositories;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
