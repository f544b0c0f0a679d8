//! Todo repository for database operations
//!
//! Every statement is scoped by owner: an item that exists but belongs to
//! someone else is indistinguishable from one that does not exist.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};
use todo_common::DatabaseResult;
use tracing::{debug, info};

use crate::models::todo::{Todo, TodoCreate, TodoStats, TodoUpdate};
use crate::query::{Pagination, TodoFilter};

const TODO_COLUMNS: &str = "id, user_id, title, description, status, priority, due_date, tags, \
                            type, content, attachments, created_at, updated_at";

/// RFC 3339 UTC rendering used for every timestamp this service writes
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_enum<T: std::str::FromStr<Err = String>>(
    row: &SqliteRow,
    column: &str,
) -> Result<T, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.into(),
    })
}

impl FromRow<'_, SqliteRow> for Todo {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        // Rows written before attachments were JSON-encoded hold a bare string
        let attachments = row
            .try_get_unchecked::<Option<String>, _>("attachments")?
            .map(|raw| serde_json::from_str::<Vec<String>>(&raw).unwrap_or_else(|_| vec![raw]));

        Ok(Todo {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            status: decode_enum(row, "status")?,
            priority: decode_enum(row, "priority")?,
            due_date: row.try_get("due_date")?,
            tags: row.try_get("tags")?,
            item_type: decode_enum(row, "type")?,
            content: row.try_get("content")?,
            attachments,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Todo repository
#[derive(Clone)]
pub struct TodoRepository {
    pool: SqlitePool,
}

impl TodoRepository {
    /// Create a new todo repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a todo owned by `owner_id`
    pub async fn create(&self, owner_id: i64, payload: &TodoCreate) -> DatabaseResult<Todo> {
        let sql = format!(
            "INSERT INTO todos (title, description, status, priority, due_date, tags, type, \
             content, attachments, created_at, user_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) RETURNING {TODO_COLUMNS}"
        );
        let todo = sqlx::query_as::<_, Todo>(&sql)
            .bind(&payload.title)
            .bind(&payload.description)
            .bind(payload.status.as_str())
            .bind(payload.priority.as_str())
            .bind(payload.due_date.map(timestamp))
            .bind(&payload.tags)
            .bind(payload.item_type.as_str())
            .bind(&payload.content)
            .bind(payload.attachments.as_ref().map(Json))
            .bind(timestamp(Utc::now()))
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        info!("Created todo {} for user {}", todo.id, owner_id);
        Ok(todo)
    }

    /// Fetch one of the owner's todos
    pub async fn get(&self, owner_id: i64, id: i64) -> DatabaseResult<Option<Todo>> {
        let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1 AND user_id = ?2");
        let todo = sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(todo)
    }

    /// Apply a partial update to one of the owner's todos
    ///
    /// Read and write happen in one transaction; `None` means no such todo
    /// for this owner.
    pub async fn update(
        &self,
        owner_id: i64,
        id: i64,
        patch: TodoUpdate,
    ) -> DatabaseResult<Option<Todo>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1 AND user_id = ?2");
        let Some(mut todo) = sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        patch.apply_to(&mut todo);

        let sql = format!(
            "UPDATE todos SET title = ?1, description = ?2, status = ?3, priority = ?4, \
             due_date = ?5, tags = ?6, type = ?7, content = ?8, attachments = ?9, \
             updated_at = ?10 WHERE id = ?11 AND user_id = ?12 RETURNING {TODO_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Todo>(&sql)
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(todo.status.as_str())
            .bind(todo.priority.as_str())
            .bind(todo.due_date.map(timestamp))
            .bind(&todo.tags)
            .bind(todo.item_type.as_str())
            .bind(&todo.content)
            .bind(todo.attachments.as_ref().map(Json))
            .bind(timestamp(Utc::now()))
            .bind(id)
            .bind(owner_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Updated todo {} for user {}", id, owner_id);
        Ok(Some(updated))
    }

    /// Delete one of the owner's todos; `false` when there was nothing to delete
    pub async fn delete(&self, owner_id: i64, id: i64) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM todos WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted todo {} for user {}", id, owner_id);
        }
        Ok(deleted)
    }

    /// List a page of the owner's todos matching `filter`, newest first
    ///
    /// Returns the page and the number of matching todos across all pages.
    pub async fn list(
        &self,
        owner_id: i64,
        filter: &TodoFilter,
        pagination: &Pagination,
        now: DateTime<Utc>,
    ) -> DatabaseResult<(Vec<Todo>, i64)> {
        let now = timestamp(now);

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM todos");
        filter.push_conditions(&mut count, owner_id, &now);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {TODO_COLUMNS} FROM todos"));
        filter.push_conditions(&mut select, owner_id, &now);
        select.push(" ORDER BY julianday(created_at) DESC, id DESC LIMIT ");
        select.push_bind(pagination.limit);
        select.push(" OFFSET ");
        select.push_bind(pagination.skip);

        let todos = select
            .build_query_as::<Todo>()
            .fetch_all(&self.pool)
            .await?;

        debug!(
            "Listed {} of {} todos for user {} (skip {}, limit {})",
            todos.len(),
            total,
            owner_id,
            pagination.skip,
            pagination.limit
        );
        Ok((todos, total))
    }

    /// Counts by status plus overdue count over all of the owner's todos
    pub async fn stats(&self, owner_id: i64, now: DateTime<Utc>) -> DatabaseResult<TodoStats> {
        let stats = sqlx::query_as::<_, TodoStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'TODO' THEN 1 ELSE 0 END), 0) AS todo_count,
                COALESCE(SUM(CASE WHEN status = 'DOING' THEN 1 ELSE 0 END), 0) AS doing_count,
                COALESCE(SUM(CASE WHEN status = 'DONE' THEN 1 ELSE 0 END), 0) AS done_count,
                COALESCE(SUM(CASE WHEN due_date IS NOT NULL
                                   AND julianday(due_date) < julianday(?1)
                                   AND status != 'DONE' THEN 1 ELSE 0 END), 0) AS overdue_count
            FROM todos
            WHERE user_id = ?2
            "#,
        )
        .bind(timestamp(now))
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
