use rusqlite::{params, Connection, Row};
use shared_types::{
    now_millis, Activity, ActivityType, CreateActivityRequest, ListActivitiesQuery, RelatedType,
};

use crate::database::rows::enum_column;
use crate::database::{contacts, related, AsyncDbConnection};
use crate::error::CrmError;

const ACTIVITY_COLUMNS: &str = "id, activity_type, subject, description, duration, outcome,
    related_to, related_id, owner, ai_summary, sentiment, created_at";

pub const DEFAULT_FEED_LIMIT: usize = 20;

fn map_activity(row: &Row) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: row.get(0)?,
        activity_type: enum_column(row, 1)?,
        subject: row.get(2)?,
        description: row.get(3)?,
        duration: row.get(4)?,
        outcome: row.get(5)?,
        related_to: enum_column(row, 6)?,
        related_id: row.get(7)?,
        owner: row.get(8)?,
        ai_summary: row.get(9)?,
        sentiment: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// An audit entry written as a side effect of another mutation
pub struct AuditNote<'a> {
    pub subject: &'a str,
    pub description: String,
    pub related_to: RelatedType,
    pub related_id: i64,
    pub owner: &'a str,
}

pub fn insert_note(conn: &Connection, note: AuditNote, now: i64) -> Result<i64, CrmError> {
    let id = conn.query_row(
        "INSERT INTO activities
         (activity_type, subject, description, related_to, related_id, owner, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         RETURNING id",
        params![
            ActivityType::Note.as_str(),
            note.subject,
            note.description,
            note.related_to.as_str(),
            note.related_id,
            note.owner,
            now
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Newest first; `limit = None` returns everything.
pub fn fetch_related(
    conn: &Connection,
    kind: RelatedType,
    related_id: i64,
    limit: Option<usize>,
) -> Result<Vec<Activity>, CrmError> {
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities
         WHERE related_to = ?1 AND related_id = ?2
         ORDER BY created_at DESC, id DESC
         LIMIT ?3"
    ))?;
    let activities = stmt
        .query_map(params![kind.as_str(), related_id, limit], map_activity)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(activities)
}

pub async fn get_activity(conn: AsyncDbConnection, id: i64) -> Result<Activity, CrmError> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map([id], map_activity)?;
    match rows.next() {
        Some(activity) => Ok(activity?),
        None => Err(CrmError::not_found("Activity")),
    }
}

pub async fn list_activities(
    conn: AsyncDbConnection,
    query: &ListActivitiesQuery,
) -> Result<Vec<Activity>, CrmError> {
    let limit = query.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_FEED_LIMIT);
    let conn = conn.lock().await?;

    match (&query.related_to, query.related_id) {
        (Some(tag), Some(related_id)) => {
            let kind = related::parse_related_type(tag)?;
            fetch_related(&conn, kind, related_id, Some(limit))
        }
        (None, None) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACTIVITY_COLUMNS} FROM activities
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1"
            ))?;
            let activities = stmt
                .query_map([limit as i64], map_activity)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(activities)
        }
        _ => Err(CrmError::Validation(
            "related_to and related_id must be provided together".to_string(),
        )),
    }
}

/// Log a call, email, meeting or note against an existing record.
pub async fn create_activity(
    conn: AsyncDbConnection,
    request: &CreateActivityRequest,
) -> Result<Activity, CrmError> {
    if request.subject.trim().is_empty() {
        return Err(CrmError::Validation(
            "Activity subject cannot be empty".to_string(),
        ));
    }
    let kind = related::parse_related_type(&request.related_to)?;

    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();

    related::ensure_exists(&tx, kind, request.related_id)?;

    let activity = tx.query_row(
        &format!(
            "INSERT INTO activities
             (activity_type, subject, description, duration, outcome, related_to, related_id,
              owner, sentiment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING {ACTIVITY_COLUMNS}"
        ),
        params![
            request.activity_type.as_str(),
            request.subject,
            request.description,
            request.duration,
            request.outcome,
            kind.as_str(),
            request.related_id,
            request.owner,
            request.sentiment,
            now
        ],
        map_activity,
    )?;

    if kind == RelatedType::Contact {
        contacts::touch_last_activity(&tx, request.related_id, now)?;
    }

    tx.commit()?;

    tracing::info!(
        "Logged {} activity {} on {} {}",
        activity.activity_type.as_str(),
        activity.id,
        kind,
        request.related_id
    );

    Ok(activity)
}
