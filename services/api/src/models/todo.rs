//! Todo models: tasks, notes and diary entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_TAGS_LENGTH: usize = 500;

/// Workflow state of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    Doing,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::Doing => "DOING",
            TaskStatus::Done => "DONE",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(TaskStatus::Todo),
            "DOING" => Ok(TaskStatus::Doing),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "URGENT",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "URGENT" => Ok(Priority::Urgent),
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// Kind of entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    #[default]
    Task,
    Note,
    Diary,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Task => "TASK",
            ItemType::Note => "NOTE",
            ItemType::Diary => "DIARY",
        }
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TASK" => Ok(ItemType::Task),
            "NOTE" => Ok(ItemType::Note),
            "DIARY" => Ok(ItemType::Diary),
            other => Err(format!("unknown item type '{}'", other)),
        }
    }
}

/// Todo entity as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub content: Option<String>,
    pub attachments: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// New todo creation payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoCreate {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<String>,
    #[serde(rename = "type", default)]
    pub item_type: ItemType,
    pub content: Option<String>,
    pub attachments: Option<Vec<String>>,
}

impl TodoCreate {
    /// Check the payload and normalize the title
    pub fn validate(mut self) -> Result<Self, String> {
        self.title = validate_title(&self.title)?;
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        Ok(self)
    }
}

/// Partial todo update payload
///
/// Absent fields keep their stored value. Nullable fields distinguish
/// "absent" (`None`) from an explicit `null` (`Some(None)`), which clears
/// the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoUpdate {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    pub tags: Option<Option<String>>,
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
    #[serde(default, deserialize_with = "present")]
    pub content: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub attachments: Option<Option<Vec<String>>>,
}

impl TodoUpdate {
    /// Check the payload and normalize the title if one is present
    pub fn validate(mut self) -> Result<Self, String> {
        if let Some(title) = &self.title {
            self.title = Some(validate_title(title)?);
        }
        if let Some(Some(tags)) = &self.tags {
            validate_tags(tags)?;
        }
        Ok(self)
    }

    /// Overwrite the fields of `todo` that are present in this patch
    pub fn apply_to(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(description) = self.description {
            todo.description = description;
        }
        if let Some(status) = self.status {
            todo.status = status;
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            todo.due_date = due_date;
        }
        if let Some(tags) = self.tags {
            todo.tags = tags;
        }
        if let Some(item_type) = self.item_type {
            todo.item_type = item_type;
        }
        if let Some(content) = self.content {
            todo.content = content;
        }
        if let Some(attachments) = self.attachments {
            todo.attachments = attachments;
        }
    }
}

/// Marks a field as present, keeping an explicit `null` as `Some(None)`
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Trim a title and check it is 1 to 200 characters long
pub fn validate_title(title: &str) -> Result<String, String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Title cannot be empty".to_string());
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LENGTH
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_tags(tags: &str) -> Result<(), String> {
    if tags.chars().count() > MAX_TAGS_LENGTH {
        return Err(format!("Tags must be at most {} characters", MAX_TAGS_LENGTH));
    }
    Ok(())
}

/// Aggregate counts over all of a user's todos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TodoStats {
    pub total: i64,
    pub todo_count: i64,
    pub doing_count: i64,
    pub done_count: i64,
    pub overdue_count: i64,
}
