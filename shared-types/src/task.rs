use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::{ParseEnumError, RelatedEntity, RelatedType};

/// Task status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Default)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Deferred,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not-started",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Deferred => "deferred",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-started" => Ok(TaskStatus::NotStarted),
            "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "deferred" => Ok(TaskStatus::Deferred),
            other => Err(ParseEnumError::new("task status", other)),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(TaskPriority::High),
            "medium" => Ok(TaskPriority::Medium),
            "low" => Ok(TaskPriority::Low),
            other => Err(ParseEnumError::new("task priority", other)),
        }
    }
}

/// Follow-up work item, optionally attached to a contact, company or deal
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Task {
    pub id: i64,
    pub subject: String,
    pub description: Option<String>,
    pub due_date: i64,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub assigned_to: String,
    pub related_to: Option<RelatedType>,
    pub related_id: Option<i64>,
    pub ai_suggested: bool,
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    pub fn is_overdue(&self, now: i64) -> bool {
        self.due_date < now && self.status != TaskStatus::Completed
    }
}

/// Request to create a new task
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateTaskRequest {
    pub subject: String,
    pub description: Option<String>,
    pub due_date: i64,
    pub priority: TaskPriority,
    pub status: Option<TaskStatus>,
    pub assigned_to: String,
    /// Free-form tag, validated against the supported related types
    pub related_to: Option<String>,
    pub related_id: Option<i64>,
    pub ai_suggested: Option<bool>,
}

/// Request to update a task
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateTaskRequest {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<i64>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaskBulkUpdates {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BulkUpdateTasksRequest {
    pub ids: Vec<i64>,
    pub updates: TaskBulkUpdates,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ListTasksQuery {
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<String>,
    pub related_to: Option<RelatedType>,
    pub related_id: Option<i64>,
    pub overdue: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct TaskWithRelated {
    #[serde(flatten)]
    pub task: Task,
    pub related_entity: Option<RelatedEntity>,
    pub is_overdue: bool,
}

/// Response containing a page of tasks
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct TasksResponse {
    pub tasks: Vec<TaskWithRelated>,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct TaskSuggestion {
    pub subject: String,
    pub description: String,
    pub priority: TaskPriority,
    pub due_date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaskSuggestionsQuery {
    pub related_to: RelatedType,
    pub related_id: i64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct TaskSuggestionsResponse {
    pub suggestions: Vec<TaskSuggestion>,
}

#[derive(Debug, Clone, Serialize, TS, PartialEq, Eq)]
#[ts(export)]
pub struct TasksSummary {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub overdue_tasks: i64,
    pub due_today_tasks: i64,
    pub high_priority_tasks: i64,
}
