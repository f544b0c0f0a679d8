//! Filtering and pagination of todo listings

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

use crate::models::todo::{ItemType, Priority, TaskStatus, Todo};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Query string accepted by `GET /todos`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
    pub search: Option<String>,
    pub overdue_only: Option<bool>,
}

impl TodoQuery {
    /// Split the query into a validated filter and page window
    pub fn into_parts(self) -> Result<(TodoFilter, Pagination), String> {
        let pagination = Pagination::new(
            self.skip.unwrap_or(0),
            self.limit.unwrap_or(DEFAULT_LIMIT),
        )?;

        let filter = TodoFilter {
            status: self.status,
            priority: self.priority,
            item_type: self.item_type,
            search: self.search.filter(|s| !s.is_empty()),
            overdue_only: self.overdue_only.unwrap_or(false),
        };

        Ok((filter, pagination))
    }
}

/// Optional predicates, all AND-combined
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub item_type: Option<ItemType>,
    /// Case-sensitive substring of title, description, tags or content
    pub search: Option<String>,
    pub overdue_only: bool,
}

impl TodoFilter {
    /// Append the `WHERE` clause for `owner_id` and every set predicate
    pub fn push_conditions(
        &self,
        builder: &mut QueryBuilder<'_, Sqlite>,
        owner_id: i64,
        now: &str,
    ) {
        builder.push(" WHERE user_id = ");
        builder.push_bind(owner_id);

        if let Some(status) = self.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(priority) = self.priority {
            builder.push(" AND priority = ");
            builder.push_bind(priority.as_str());
        }
        if let Some(item_type) = self.item_type {
            builder.push(" AND type = ");
            builder.push_bind(item_type.as_str());
        }
        if let Some(search) = &self.search {
            // instr() is case-sensitive where LIKE is not
            builder.push(" AND (");
            for (i, column) in ["title", "description", "tags", "content"]
                .into_iter()
                .enumerate()
            {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder.push(format!("instr(COALESCE({column}, ''), "));
                builder.push_bind(search.clone());
                builder.push(") > 0");
            }
            builder.push(")");
        }
        if self.overdue_only {
            // julianday() also reads the space-separated timestamps of older rows
            builder.push(" AND due_date IS NOT NULL AND julianday(due_date) < julianday(");
            builder.push_bind(now.to_string());
            builder.push(") AND status != 'DONE'");
        }
    }
}

/// Offset/limit window over a sorted result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(skip: i64, limit: i64) -> Result<Self, String> {
        if skip < 0 {
            return Err("skip must be greater than or equal to 0".to_string());
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(format!("limit must be between 1 and {}", MAX_LIMIT));
        }
        Ok(Self { skip, limit })
    }

    /// 1-based page number containing `skip`
    pub fn page(&self) -> i64 {
        self.skip / self.limit + 1
    }

    /// Number of pages for `total` items, never less than one
    pub fn total_pages(&self, total: i64) -> i64 {
        ((total + self.limit - 1) / self.limit).max(1)
    }
}

/// One page of todos with its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoListResponse {
    pub todos: Vec<Todo>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl TodoListResponse {
    pub fn new(todos: Vec<Todo>, total: i64, pagination: &Pagination) -> Self {
        Self {
            todos,
            total,
            page: pagination.page(),
            per_page: pagination.limit,
            total_pages: pagination.total_pages(total),
        }
    }
}
