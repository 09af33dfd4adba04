use serde::{Deserialize, Serialize};

pub mod activity;
pub mod company;
pub mod contact;
pub mod deal;
pub mod permission;
pub mod task;
pub mod user;

pub use activity::{
    ActivitiesResponse, Activity, ActivityType, CreateActivityRequest, ListActivitiesQuery,
    RelatedEntity, RelatedType,
};
pub use company::{
    CompaniesResponse, Company, CompanyDetail, CompanyMetrics, CompanySummary, CompanyType,
    CreateCompanyRequest, ListCompaniesQuery, PaymentHistory, ScoreResponse,
    UpdateCompanyRequest, UpdateHealthScoreRequest,
};
pub use contact::{
    BulkUpdateContactsRequest, Contact, ContactBulkUpdates, ContactDetail, ContactRating,
    ContactStatus, ContactsResponse, CreateContactRequest, ListContactsQuery, Sentiment,
    UpdateAiScoreRequest, UpdateContactRequest,
};
pub use deal::{
    CreateDealRequest, Deal, DealDetail, DealStage, DealType, DealWithRelations,
    DealsByStageResponse, DealsResponse, DealsSummary, ListDealsQuery,
    UpdateAiProbabilityRequest, UpdateDealRequest, UpdateDealStageRequest,
};
pub use permission::{
    Action, Module, PermissionCheckQuery, PermissionCheckResponse, RoleCapabilities,
    UserPermissionsResponse,
};
pub use task::{
    BulkUpdateTasksRequest, CreateTaskRequest, ListTasksQuery, Task, TaskBulkUpdates,
    TaskPriority, TaskStatus, TaskSuggestion, TaskSuggestionsQuery, TaskSuggestionsResponse,
    TaskWithRelated, TasksResponse, TasksSummary, UpdateTaskRequest, UpdateTaskStatusRequest,
};
pub use user::{UpdateUserRoleRequest, UpsertUserRequest, User, UserRole, UsersResponse};

/// Error response for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Returned when a stored or submitted tag does not name a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Current time as Unix epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Ids touched by a bulk mutation
#[derive(Debug, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct UpdatedIdsResponse {
    pub ids: Vec<i64>,
}
