//! Authentication building blocks for the todo list service
//!
//! Credential storage, password hashing with a fallback chosen at startup
//! chain, HS256 bearer tokens, and the [`AuthService`] that ties them into
//! the register / login / authenticate flows. Nothing here knows about
//! HTTP; the api crate maps [`AuthError`] onto responses.

pub mod error;
pub mod jwt;
pub mod models;
pub mod password;
pub mod repositories;
pub mod service;
pub mod validation;

pub use error::AuthError;
pub use jwt::{JwtConfig, TokenError, TokenService};
pub use models::{NewUser, Registration, User};
pub use password::{HashScheme, HasherConfig, PasswordService};
pub use repositories::UserRepository;
pub use service::AuthService;
