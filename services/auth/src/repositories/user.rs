//! User repository for database operations

use chrono::Utc;
use sqlx::SqlitePool;
use todo_common::DatabaseResult;
use tracing::{error, info};

use crate::error::AuthError;
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, hashed_password, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user
    ///
    /// The insert runs in its own transaction; a unique constraint hit
    /// (a concurrent registration won the race) is reported as the matching
    /// duplicate error and nothing is written.
    pub async fn create(&self, new_user: &NewUser) -> Result<User, AuthError> {
        info!("Creating new user: {}", new_user.username);

        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO users (username, email, hashed_password, created_at) \
             VALUES (?1, ?2, ?3, ?4) RETURNING {USER_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.hashed_password)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await;

        let user = match inserted {
            Ok(user) => user,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(if db_err.message().contains("users.email") {
                    AuthError::DuplicateEmail
                } else {
                    AuthError::DuplicateUsername
                });
            }
            Err(e) => {
                error!("Failed to insert user {}: {}", new_user.username, e);
                return Err(e.into());
            }
        };

        tx.commit().await?;
        info!("User '{}' registered with ID: {}", user.username, user.id);
        Ok(user)
    }

    /// Find a user by exact (case-sensitive) username
    pub async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user whose username matches ignoring ASCII case
    ///
    /// Several users may differ only by case; the oldest account wins.
    pub async fn find_by_username_ignore_case(
        &self,
        username: &str,
    ) -> DatabaseResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE username = ?1 COLLATE NOCASE ORDER BY id LIMIT 1"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by exact email
    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todo_common::{DatabaseConfig, init_pool, run_migrations};

    async fn repository() -> UserRepository {
        let pool = init_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        UserRepository::new(pool)
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            hashed_password: "$argon2id$placeholder".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = repository().await;
        let created = repo
            .create(&new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        assert!(created.id > 0);
        assert!(created.updated_at.is_none());

        let by_name = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        let by_email = repo
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_email.username, "alice");
    }

    #[tokio::test]
    async fn test_username_lookup_is_case_sensitive() {
        let repo = repository().await;
        repo.create(&new_user("Bob", "bob@example.com"))
            .await
            .unwrap();

        assert!(repo.find_by_username("bob").await.unwrap().is_none());
        let found = repo
            .find_by_username_ignore_case("bob")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.username, "Bob");
    }

    #[tokio::test]
    async fn test_ignore_case_prefers_oldest_account() {
        let repo = repository().await;
        let first = repo
            .create(&new_user("Bob", "bob1@example.com"))
            .await
            .unwrap();
        repo.create(&new_user("BOB", "bob2@example.com"))
            .await
            .unwrap();

        let found = repo
            .find_by_username_ignore_case("bob")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn test_unique_constraints_map_to_duplicates() {
        let repo = repository().await;
        repo.create(&new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = repo
            .create(&new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));

        let err = repo
            .create(&new_user("alice2", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }
}
