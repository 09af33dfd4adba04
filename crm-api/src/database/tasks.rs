use chrono::DateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use shared_types::{
    now_millis, BulkUpdateTasksRequest, CreateTaskRequest, DealStage, ListTasksQuery,
    RelatedType, Task, TaskPriority, TaskStatus, TaskSuggestion, TaskWithRelated,
    TasksResponse, TasksSummary, UpdateTaskRequest,
};

use crate::database::activities::{self, AuditNote};
use crate::database::rows::{enum_column, optional_enum_column, Patch};
use crate::database::{deals, related, AsyncDbConnection};
use crate::error::CrmError;
use crate::helpers::pagination::{matches_any, normalize_search, paginate};

const TASK_COLUMNS: &str = "id, subject, description, due_date, priority, status, assigned_to,
    related_to, related_id, ai_suggested, completed_at, created_at, updated_at";

/// Activities considered when suggesting follow-ups
const SUGGESTION_ACTIVITY_WINDOW: usize = 10;

fn map_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        subject: row.get(1)?,
        description: row.get(2)?,
        due_date: row.get(3)?,
        priority: enum_column(row, 4)?,
        status: enum_column(row, 5)?,
        assigned_to: row.get(6)?,
        related_to: optional_enum_column(row, 7)?,
        related_id: row.get(8)?,
        ai_suggested: row.get(9)?,
        completed_at: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub fn fetch_task(conn: &Connection, id: i64) -> Result<Option<Task>, CrmError> {
    let task = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            [id],
            map_task,
        )
        .optional()?;
    Ok(task)
}

pub fn fetch_related(
    conn: &Connection,
    kind: RelatedType,
    related_id: i64,
) -> Result<Vec<Task>, CrmError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks
         WHERE related_to = ?1 AND related_id = ?2
         ORDER BY created_at DESC, id DESC"
    ))?;
    let tasks = stmt
        .query_map(params![kind.as_str(), related_id], map_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

fn with_related(conn: &Connection, task: Task, now: i64) -> Result<TaskWithRelated, CrmError> {
    let related_entity = match (task.related_to, task.related_id) {
        (Some(kind), Some(id)) => related::resolve(conn, kind, id)?,
        _ => None,
    };
    let is_overdue = task.is_overdue(now);
    Ok(TaskWithRelated {
        task,
        related_entity,
        is_overdue,
    })
}

/// Validate the optional `(related_to, related_id)` pair of a new task.
fn resolve_relation(
    conn: &Connection,
    request: &CreateTaskRequest,
) -> Result<Option<(RelatedType, i64)>, CrmError> {
    match (&request.related_to, request.related_id) {
        (None, None) => Ok(None),
        (Some(tag), related_id) => {
            let kind = related::parse_related_type(tag)?;
            let related_id =
                related_id.ok_or_else(|| CrmError::not_found(format!("Related {kind}")))?;
            related::ensure_exists(conn, kind, related_id)?;
            Ok(Some((kind, related_id)))
        }
        (None, Some(_)) => Err(CrmError::Validation(
            "related_id requires related_to".to_string(),
        )),
    }
}

fn completed_at_for(task: &Task, status: TaskStatus, now: i64) -> Option<i64> {
    if status == TaskStatus::Completed && task.completed_at.is_none() {
        Some(now)
    } else {
        None
    }
}

pub async fn list_tasks(
    conn: AsyncDbConnection,
    query: &ListTasksQuery,
) -> Result<TasksResponse, CrmError> {
    let conn = conn.lock().await?;
    let now = now_millis();

    let mut filters = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(status) = query.status {
        filters.push("status = ?");
        params.push(Box::new(status.as_str()));
    }
    if let Some(priority) = query.priority {
        filters.push("priority = ?");
        params.push(Box::new(priority.as_str()));
    }
    if let Some(assigned_to) = &query.assigned_to {
        filters.push("assigned_to = ?");
        params.push(Box::new(assigned_to.clone()));
    }
    if let Some(related_to) = query.related_to {
        filters.push("related_to = ?");
        params.push(Box::new(related_to.as_str()));
    }
    if let Some(related_id) = query.related_id {
        filters.push("related_id = ?");
        params.push(Box::new(related_id));
    }

    let where_clause = if filters.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", filters.join(" AND "))
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks {where_clause} ORDER BY created_at DESC, id DESC"
    ))?;
    let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut tasks = stmt
        .query_map(params_refs.as_slice(), map_task)?
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(overdue) = query.overdue {
        tasks.retain(|t| t.is_overdue(now) == overdue);
    }
    if let Some(needle) = normalize_search(query.search.as_deref()) {
        tasks.retain(|t| {
            matches_any(&needle, &[Some(t.subject.as_str()), t.description.as_deref()])
        });
    }

    let page = paginate(tasks, query.offset, query.limit);
    let tasks = page
        .items
        .into_iter()
        .map(|task| with_related(&conn, task, now))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TasksResponse {
        tasks,
        total: page.total,
        has_more: page.has_more,
    })
}

/// Tasks assigned to `user`, soonest due first.
pub async fn tasks_by_user(conn: AsyncDbConnection, user: &str) -> Result<Vec<Task>, CrmError> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE assigned_to = ?1 ORDER BY due_date ASC, id ASC"
    ))?;
    let tasks = stmt
        .query_map([user], map_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

pub async fn get_task(conn: AsyncDbConnection, id: i64) -> Result<Task, CrmError> {
    let conn = conn.lock().await?;
    fetch_task(&conn, id)?.ok_or_else(|| CrmError::not_found("Task"))
}

pub async fn create_task(
    conn: AsyncDbConnection,
    request: &CreateTaskRequest,
) -> Result<Task, CrmError> {
    if request.subject.trim().is_empty() {
        return Err(CrmError::Validation(
            "Task subject cannot be empty".to_string(),
        ));
    }

    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();

    let relation = resolve_relation(&tx, request)?;
    let status = request.status.unwrap_or_default();
    let completed_at = (status == TaskStatus::Completed).then_some(now);

    let task = tx.query_row(
        &format!(
            "INSERT INTO tasks
             (subject, description, due_date, priority, status, assigned_to, related_to,
              related_id, ai_suggested, completed_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
             RETURNING {TASK_COLUMNS}"
        ),
        params![
            request.subject,
            request.description,
            request.due_date,
            request.priority.as_str(),
            status.as_str(),
            request.assigned_to,
            relation.map(|(kind, _)| kind.as_str()),
            relation.map(|(_, id)| id),
            request.ai_suggested.unwrap_or(false),
            completed_at,
            now
        ],
        map_task,
    )?;

    if let Some((kind, related_id)) = relation {
        activities::insert_note(
            &tx,
            AuditNote {
                subject: "Task Created",
                description: format!("New task assigned: {}", task.subject),
                related_to: kind,
                related_id,
                owner: &task.assigned_to,
            },
            now,
        )?;
    }

    tx.commit()?;
    tracing::info!("Created task {} for {}", task.id, task.assigned_to);

    Ok(task)
}

pub async fn update_task_status(
    conn: AsyncDbConnection,
    id: i64,
    status: TaskStatus,
) -> Result<Task, CrmError> {
    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();

    let task = fetch_task(&tx, id)?.ok_or_else(|| CrmError::not_found("Task"))?;

    let mut patch = Patch::new(now);
    patch
        .set("status", status.as_str())
        .set_opt("completed_at", completed_at_for(&task, status, now));
    patch.execute(&tx, "tasks", id)?;

    if let (Some(kind), Some(related_id)) = (task.related_to, task.related_id) {
        activities::insert_note(
            &tx,
            AuditNote {
                subject: "Task Status Updated",
                description: format!("Task \"{}\" status changed to {}", task.subject, status),
                related_to: kind,
                related_id,
                owner: &task.assigned_to,
            },
            now,
        )?;
    }

    let updated = fetch_task(&tx, id)?.ok_or_else(|| CrmError::not_found("Task"))?;
    tx.commit()?;

    Ok(updated)
}

pub async fn update_task(
    conn: AsyncDbConnection,
    id: i64,
    request: &UpdateTaskRequest,
) -> Result<Task, CrmError> {
    if request
        .subject
        .as_deref()
        .is_some_and(|s| s.trim().is_empty())
    {
        return Err(CrmError::Validation(
            "Task subject cannot be empty".to_string(),
        ));
    }

    let conn = conn.lock().await?;
    let now = now_millis();
    let task = fetch_task(&conn, id)?.ok_or_else(|| CrmError::not_found("Task"))?;

    let mut patch = Patch::new(now);
    patch
        .set_opt("subject", request.subject.clone())
        .set_opt("description", request.description.clone())
        .set_opt("due_date", request.due_date)
        .set_opt("priority", request.priority.map(|p| p.as_str()))
        .set_opt("status", request.status.map(|s| s.as_str()))
        .set_opt("assigned_to", request.assigned_to.clone())
        .set_opt(
            "completed_at",
            request
                .status
                .and_then(|status| completed_at_for(&task, status, now)),
        );
    patch.execute(&conn, "tasks", id)?;

    fetch_task(&conn, id)?.ok_or_else(|| CrmError::not_found("Task"))
}

pub async fn delete_task(conn: AsyncDbConnection, id: i64) -> Result<(), CrmError> {
    let conn = conn.lock().await?;
    let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(CrmError::not_found("Task"));
    }
    tracing::info!("Deleted task {}", id);
    Ok(())
}

/// Apply the same patch to many tasks; unknown ids are skipped.
pub async fn bulk_update_tasks(
    conn: AsyncDbConnection,
    request: &BulkUpdateTasksRequest,
) -> Result<Vec<i64>, CrmError> {
    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();
    let updates = &request.updates;

    let mut updated = Vec::new();
    for &id in &request.ids {
        let Some(task) = fetch_task(&tx, id)? else {
            continue;
        };
        let mut patch = Patch::new(now);
        patch
            .set_opt("status", updates.status.map(|s| s.as_str()))
            .set_opt("priority", updates.priority.map(|p| p.as_str()))
            .set_opt("assigned_to", updates.assigned_to.clone())
            .set_opt(
                "completed_at",
                updates
                    .status
                    .and_then(|status| completed_at_for(&task, status, now)),
            );
        patch.execute(&tx, "tasks", id)?;
        updated.push(id);
    }

    tx.commit()?;
    tracing::info!(
        "Bulk updated {} of {} tasks",
        updated.len(),
        request.ids.len()
    );

    Ok(updated)
}

/// Follow-up suggestions for a record from its recent activity and open tasks.
pub async fn suggest_tasks(
    conn: AsyncDbConnection,
    kind: RelatedType,
    related_id: i64,
) -> Result<Vec<TaskSuggestion>, CrmError> {
    let conn = conn.lock().await?;
    let now = now_millis();

    let recent_activities =
        activities::fetch_related(&conn, kind, related_id, Some(SUGGESTION_ACTIVITY_WINDOW))?;
    let open_tasks: Vec<Task> = fetch_related(&conn, kind, related_id)?
        .into_iter()
        .filter(|t| t.status != TaskStatus::Completed)
        .collect();
    let deal_stage: Option<DealStage> = match kind {
        RelatedType::Deal => deals::fetch_deal(&conn, related_id)?.map(|d| d.stage),
        _ => None,
    };

    Ok(crm_scoring::suggest_tasks(&crm_scoring::SuggestionContext {
        recent_activities: &recent_activities,
        open_tasks: &open_tasks,
        deal_stage,
        now,
    }))
}

fn same_utc_day(a: i64, b: i64) -> bool {
    match (DateTime::from_timestamp_millis(a), DateTime::from_timestamp_millis(b)) {
        (Some(a), Some(b)) => a.date_naive() == b.date_naive(),
        _ => false,
    }
}

pub async fn tasks_summary(
    conn: AsyncDbConnection,
    user: Option<&str>,
) -> Result<TasksSummary, CrmError> {
    let conn = conn.lock().await?;
    let now = now_millis();

    let tasks = match user {
        Some(user) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE assigned_to = ?1"
            ))?;
            let tasks = stmt
                .query_map([user], map_task)?
                .collect::<Result<Vec<_>, _>>()?;
            tasks
        }
        None => {
            let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks"))?;
            let tasks = stmt
                .query_map([], map_task)?
                .collect::<Result<Vec<_>, _>>()?;
            tasks
        }
    };

    let open = |t: &&Task| t.status != TaskStatus::Completed;
    Ok(TasksSummary {
        total_tasks: tasks.len() as i64,
        completed_tasks: tasks.iter().filter(|t| !open(t)).count() as i64,
        overdue_tasks: tasks.iter().filter(|t| t.is_overdue(now)).count() as i64,
        due_today_tasks: tasks
            .iter()
            .filter(open)
            .filter(|t| same_utc_day(t.due_date, now))
            .count() as i64,
        high_priority_tasks: tasks
            .iter()
            .filter(open)
            .filter(|t| t.priority == TaskPriority::High)
            .count() as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::companies::create_company;
    use crate::database::deals::{create_deal, update_deal_stage};
    use crate::database::test_support::{company_request, deal_request, test_database, OWNER};
    use shared_types::{RelatedEntity, TaskBulkUpdates};

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn task_request(subject: &str, related: Option<(&str, i64)>) -> CreateTaskRequest {
        CreateTaskRequest {
            subject: subject.to_string(),
            description: None,
            due_date: now_millis() + DAY_MS,
            priority: TaskPriority::Medium,
            status: None,
            assigned_to: OWNER.to_string(),
            related_to: related.map(|(tag, _)| tag.to_string()),
            related_id: related.map(|(_, id)| id),
            ai_suggested: None,
        }
    }

    async fn count_rows(conn: &AsyncDbConnection, table: &str) -> i64 {
        let guard = conn.lock().await.unwrap();
        guard
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_related_deal_inserts_nothing() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();

        let err = create_task(conn.clone(), &task_request("Call back", Some(("deal", 99))))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Related deal not found");

        let mut no_id = task_request("Call back", None);
        no_id.related_to = Some("deal".to_string());
        let err = create_task(conn.clone(), &no_id).await.unwrap_err();
        assert_eq!(err.to_string(), "Related deal not found");

        let err = create_task(conn.clone(), &task_request("Call back", Some(("invoice", 1))))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported related type: invoice");

        assert_eq!(count_rows(&conn, "tasks").await, 0);
        assert_eq!(count_rows(&conn, "activities").await, 0);
    }

    #[tokio::test]
    async fn test_related_task_lifecycle() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();

        let task = create_task(
            conn.clone(),
            &task_request("Prepare QBR", Some(("company", company.id))),
        )
        .await
        .unwrap();
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.related_to, Some(RelatedType::Company));
        // Company Created + Task Created
        assert_eq!(count_rows(&conn, "activities").await, 2);

        let done = update_task_status(conn.clone(), task.id, TaskStatus::Completed)
            .await
            .unwrap();
        let completed_at = done.completed_at.unwrap();

        // completing twice keeps the first timestamp
        let again = update_task_status(conn.clone(), task.id, TaskStatus::Completed)
            .await
            .unwrap();
        assert_eq!(again.completed_at, Some(completed_at));

        let feed = activities::fetch_related(
            &*conn.lock().await.unwrap(),
            RelatedType::Company,
            company.id,
            None,
        )
        .unwrap();
        assert_eq!(
            feed[0].description.as_deref(),
            Some("Task \"Prepare QBR\" status changed to completed")
        );

        let listed = list_tasks(
            conn.clone(),
            &ListTasksQuery {
                related_to: Some(RelatedType::Company),
                related_id: Some(company.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(listed.total, 1);
        assert!(matches!(
            listed.tasks[0].related_entity,
            Some(RelatedEntity::Company(_))
        ));
        assert!(!listed.tasks[0].is_overdue);
    }

    #[tokio::test]
    async fn test_unrelated_task_has_no_audit_trail() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let task = create_task(conn.clone(), &task_request("Inbox zero", None))
            .await
            .unwrap();
        update_task_status(conn.clone(), task.id, TaskStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(count_rows(&conn, "activities").await, 0);

        let updated = update_task(
            conn.clone(),
            task.id,
            &UpdateTaskRequest {
                priority: Some(TaskPriority::High),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.priority, TaskPriority::High);
        assert_eq!(updated.status, TaskStatus::InProgress);

        delete_task(conn.clone(), task.id).await.unwrap();
        let err = delete_task(conn, task.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Task not found");
    }

    #[tokio::test]
    async fn test_overdue_filter_and_summary() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();

        let mut late = task_request("Late", None);
        late.due_date = now_millis() - 2 * DAY_MS;
        late.priority = TaskPriority::High;
        create_task(conn.clone(), &late).await.unwrap();

        let mut done = task_request("Done", None);
        done.due_date = now_millis() - 2 * DAY_MS;
        done.status = Some(TaskStatus::Completed);
        let done = create_task(conn.clone(), &done).await.unwrap();
        assert!(done.completed_at.is_some());

        let mut other = task_request("Someone else's", None);
        other.assigned_to = "user_other".to_string();
        create_task(conn.clone(), &other).await.unwrap();

        let overdue = list_tasks(
            conn.clone(),
            &ListTasksQuery {
                overdue: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(overdue.total, 1);
        assert_eq!(overdue.tasks[0].task.subject, "Late");
        assert!(overdue.tasks[0].is_overdue);

        let summary = tasks_summary(conn.clone(), Some(OWNER)).await.unwrap();
        assert_eq!(summary.total_tasks, 2);
        assert_eq!(summary.completed_tasks, 1);
        assert_eq!(summary.overdue_tasks, 1);
        assert_eq!(summary.high_priority_tasks, 1);

        let everyone = tasks_summary(conn.clone(), None).await.unwrap();
        assert_eq!(everyone.total_tasks, 3);

        let mine = tasks_by_user(conn, OWNER).await.unwrap();
        assert_eq!(mine.len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_update_sets_completion() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let a = create_task(conn.clone(), &task_request("A", None)).await.unwrap();
        let b = create_task(conn.clone(), &task_request("B", None)).await.unwrap();

        let ids = bulk_update_tasks(
            conn.clone(),
            &BulkUpdateTasksRequest {
                ids: vec![a.id, b.id, 12345],
                updates: TaskBulkUpdates {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();
        assert_eq!(ids, vec![a.id, b.id]);
        assert!(get_task(conn, a.id).await.unwrap().completed_at.is_some());
    }

    #[tokio::test]
    async fn test_suggestions_for_proposal_deal() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        let deal = create_deal(conn.clone(), &deal_request("Pilot", company.id))
            .await
            .unwrap();
        update_deal_stage(conn.clone(), deal.id, DealStage::Proposal)
            .await
            .unwrap();

        let suggestions = suggest_tasks(conn, RelatedType::Deal, deal.id).await.unwrap();
        let subjects: Vec<&str> = suggestions.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Send check-in email", "Follow up on proposal"]);
    }
}
