//! Versioned schema migrations
//!
//! Migrations run once, in version order, before the service accepts
//! traffic. Each one is applied inside its own transaction and recorded in
//! `schema_migrations`, so running the migrator again is a no-op.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::error::{DatabaseError, DatabaseResult};

/// What a migration does to the schema
#[derive(Debug, Clone, Copy)]
pub enum MigrationStep {
    /// Plain DDL statements executed in order
    Statements(&'static [&'static str]),
    /// Add a column to an existing table unless it is already there.
    ///
    /// The preferred column type is tried first; if the engine rejects it
    /// the fallback type is used instead.
    AddColumnIfAbsent {
        table: &'static str,
        column: &'static str,
        preferred_type: &'static str,
        fallback_type: &'static str,
    },
}

/// A single schema migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub step: MigrationStep,
}

/// Schema of the todo list service
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users_and_todos",
        step: MigrationStep::Statements(&[
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'TODO',
                priority TEXT NOT NULL DEFAULT 'MEDIUM',
                due_date TEXT,
                tags TEXT,
                type TEXT NOT NULL DEFAULT 'TASK',
                content TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_todos_owner_created \
             ON todos (user_id, created_at DESC, id DESC)",
        ]),
    },
    Migration {
        version: 2,
        name: "add_todo_attachments",
        step: MigrationStep::AddColumnIfAbsent {
            table: "todos",
            column: "attachments",
            preferred_type: "JSON",
            fallback_type: "TEXT",
        },
    },
];

/// Apply every pending migration of the service schema
///
/// # Returns
///
/// * `DatabaseResult<usize>` - Number of migrations applied by this call
pub async fn run_migrations(pool: &SqlitePool) -> DatabaseResult<usize> {
    apply_migrations(pool, MIGRATIONS).await
}

/// Apply the pending subset of `migrations`, in version order
pub async fn apply_migrations(
    pool: &SqlitePool,
    migrations: &[Migration],
) -> DatabaseResult<usize> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create schema_migrations: {}", e)))?;

    let applied: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_migrations")
        .fetch_all(pool)
        .await?;

    let mut pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect();
    pending.sort_by_key(|m| m.version);

    for migration in &pending {
        info!(
            "Applying migration {} ({})",
            migration.version, migration.name
        );

        let mut tx = pool.begin().await?;
        apply_step(&mut *tx, &migration.step).await?;

        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    if pending.is_empty() {
        info!("Database schema is up to date");
    }

    Ok(pending.len())
}

async fn apply_step(conn: &mut SqliteConnection, step: &MigrationStep) -> DatabaseResult<()> {
    match *step {
        MigrationStep::Statements(statements) => {
            for &statement in statements {
                sqlx::query(statement)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }
        }
        MigrationStep::AddColumnIfAbsent {
            table,
            column,
            preferred_type,
            fallback_type,
        } => {
            if column_exists(conn, table, column).await? {
                info!("Column {}.{} already present", table, column);
                return Ok(());
            }

            let preferred = format!("ALTER TABLE {table} ADD COLUMN {column} {preferred_type}");
            if let Err(e) = sqlx::query(&preferred).execute(&mut *conn).await {
                warn!(
                    "Adding {}.{} as {} failed ({}), falling back to {}",
                    table, column, preferred_type, e, fallback_type
                );
                let fallback = format!("ALTER TABLE {table} ADD COLUMN {column} {fallback_type}");
                sqlx::query(&fallback)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
                info!("Added {}.{} as {}", table, column, fallback_type);
            } else {
                info!("Added {}.{} as {}", table, column, preferred_type);
            }
        }
    }

    Ok(())
}

/// Check whether `table` has a column named `column`
pub async fn column_exists(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
) -> DatabaseResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2")
            .bind(table)
            .bind(column)
            .fetch_one(&mut *conn)
            .await?;

    Ok(count > 0)
}
