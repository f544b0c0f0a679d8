//! Application state shared across handlers

use sqlx::SqlitePool;
use todo_auth::{AuthService, PasswordService, TokenService, UserRepository};

use crate::repositories::TodoRepository;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub auth: AuthService,
    pub todo_repository: TodoRepository,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, tokens: TokenService, passwords: PasswordService) -> Self {
        let auth = AuthService::new(UserRepository::new(db_pool.clone()), passwords, tokens);
        let todo_repository = TodoRepository::new(db_pool.clone());

        Self {
            db_pool,
            auth,
            todo_repository,
        }
    }
}
