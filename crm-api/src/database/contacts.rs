use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use shared_types::{
    now_millis, BulkUpdateContactsRequest, Contact, ContactDetail, ContactsResponse,
    CreateContactRequest, ListContactsQuery, RelatedType, Sentiment, UpdateAiScoreRequest,
    UpdateContactRequest,
};

use crate::database::activities::{self, AuditNote};
use crate::database::rows::{enum_column, optional_enum_column, Patch};
use crate::database::{deals, related, AsyncDbConnection};
use crate::error::CrmError;
use crate::helpers::pagination::{matches_any, normalize_search, paginate};

const CONTACT_COLUMNS: &str = "id, first_name, last_name, email, notes, phone, company, title,
    lead_source, status, rating, owner, ai_score, sentiment, last_activity, created_at, updated_at";

const DETAIL_ACTIVITY_LIMIT: usize = 10;

fn map_contact(row: &Row) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        notes: row.get(4)?,
        phone: row.get(5)?,
        company: row.get(6)?,
        title: row.get(7)?,
        lead_source: row.get(8)?,
        status: enum_column(row, 9)?,
        rating: enum_column(row, 10)?,
        owner: row.get(11)?,
        ai_score: row.get(12)?,
        sentiment: optional_enum_column(row, 13)?,
        last_activity: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

pub fn fetch_contact(conn: &Connection, id: i64) -> Result<Option<Contact>, CrmError> {
    let contact = conn
        .query_row(
            &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
            [id],
            map_contact,
        )
        .optional()?;
    Ok(contact)
}

/// Contacts whose `company` string equals `company_name`.
pub fn fetch_by_company(conn: &Connection, company_name: &str) -> Result<Vec<Contact>, CrmError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts WHERE company = ?1
         ORDER BY created_at DESC, id DESC"
    ))?;
    let contacts = stmt
        .query_map([company_name], map_contact)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(contacts)
}

fn email_taken(conn: &Connection, email: &str, except_id: Option<i64>) -> Result<bool, CrmError> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM contacts WHERE email = ?1 AND id != ?2)",
        params![email, except_id.unwrap_or(-1)],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn touch_last_activity(conn: &Connection, id: i64, now: i64) -> Result<(), CrmError> {
    conn.execute(
        "UPDATE contacts SET last_activity = ?1, updated_at = ?1 WHERE id = ?2",
        params![now, id],
    )?;
    Ok(())
}

pub async fn get_contact(conn: AsyncDbConnection, id: i64) -> Result<Contact, CrmError> {
    let conn = conn.lock().await?;
    fetch_contact(&conn, id)?.ok_or_else(|| CrmError::not_found("Contact"))
}

/// Contact with its latest activities and linked deals.
pub async fn get_contact_detail(
    conn: AsyncDbConnection,
    id: i64,
) -> Result<ContactDetail, CrmError> {
    let conn = conn.lock().await?;
    let contact = fetch_contact(&conn, id)?.ok_or_else(|| CrmError::not_found("Contact"))?;
    let activities =
        activities::fetch_related(&conn, RelatedType::Contact, id, Some(DETAIL_ACTIVITY_LIMIT))?;
    let deals = deals::fetch_for_contact(&conn, id)?;

    Ok(ContactDetail {
        contact,
        activities,
        deals,
    })
}

pub async fn list_contacts(
    conn: AsyncDbConnection,
    query: &ListContactsQuery,
) -> Result<ContactsResponse, CrmError> {
    let conn = conn.lock().await?;

    let mut filters = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(status) = query.status {
        filters.push("status = ?");
        params.push(Box::new(status.as_str()));
    }
    if let Some(sentiment) = query.sentiment {
        filters.push("sentiment = ?");
        params.push(Box::new(sentiment.as_str()));
    }
    if let Some(owner) = &query.owner {
        filters.push("owner = ?");
        params.push(Box::new(owner.clone()));
    }

    let where_clause = if filters.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", filters.join(" AND "))
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts {where_clause}
         ORDER BY created_at DESC, id DESC"
    ))?;
    let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut contacts = stmt
        .query_map(params_refs.as_slice(), map_contact)?
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(needle) = normalize_search(query.search.as_deref()) {
        contacts.retain(|c| {
            matches_any(
                &needle,
                &[
                    Some(c.first_name.as_str()),
                    Some(c.last_name.as_str()),
                    Some(c.email.as_str()),
                    c.company.as_deref(),
                ],
            )
        });
    }

    let page = paginate(contacts, query.offset, query.limit);
    Ok(ContactsResponse {
        contacts: page.items,
        total: page.total,
        has_more: page.has_more,
    })
}

pub async fn contacts_by_company(
    conn: AsyncDbConnection,
    company_name: &str,
) -> Result<Vec<Contact>, CrmError> {
    let conn = conn.lock().await?;
    fetch_by_company(&conn, company_name)
}

/// Insert a contact with its initial lead score. `jitter` is the random term
/// of the score, drawn by the caller.
pub async fn create_contact(
    conn: AsyncDbConnection,
    request: &CreateContactRequest,
    jitter: i64,
) -> Result<Contact, CrmError> {
    if request.email.trim().is_empty() {
        return Err(CrmError::Validation(
            "Contact email cannot be empty".to_string(),
        ));
    }

    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();

    if email_taken(&tx, &request.email, None)? {
        tracing::warn!("Rejected duplicate contact email {}", request.email);
        return Err(CrmError::Duplicate(
            "Contact with this email already exists".to_string(),
        ));
    }

    let ai_score = crm_scoring::lead_score_with_jitter(
        &crm_scoring::LeadProfile {
            lead_source: request.lead_source.as_deref(),
            company: request.company.as_deref(),
            title: request.title.as_deref(),
        },
        jitter,
    );
    tracing::debug!("Lead score for {}: {}", request.email, ai_score);

    let contact = tx.query_row(
        &format!(
            "INSERT INTO contacts
             (first_name, last_name, email, phone, company, title, lead_source, status, rating,
              owner, ai_score, sentiment, last_activity, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13, ?13)
             RETURNING {CONTACT_COLUMNS}"
        ),
        params![
            request.first_name,
            request.last_name,
            request.email,
            request.phone,
            request.company,
            request.title,
            request.lead_source,
            request.status.unwrap_or_default().as_str(),
            request.rating.unwrap_or_default().as_str(),
            request.owner,
            ai_score,
            Sentiment::Neutral.as_str(),
            now
        ],
        map_contact,
    )?;

    activities::insert_note(
        &tx,
        AuditNote {
            subject: "Contact Created",
            description: format!(
                "New contact added to CRM from {}",
                request.lead_source.as_deref().unwrap_or("unknown source")
            ),
            related_to: RelatedType::Contact,
            related_id: contact.id,
            owner: &request.owner,
        },
        now,
    )?;

    tx.commit()?;
    tracing::info!("Created contact {} <{}>", contact.id, contact.email);

    Ok(contact)
}

pub async fn update_contact(
    conn: AsyncDbConnection,
    id: i64,
    request: &UpdateContactRequest,
) -> Result<Contact, CrmError> {
    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();

    let existing = fetch_contact(&tx, id)?.ok_or_else(|| CrmError::not_found("Contact"))?;

    if let Some(email) = &request.email {
        if email.trim().is_empty() {
            return Err(CrmError::Validation(
                "Contact email cannot be empty".to_string(),
            ));
        }
        if email != &existing.email && email_taken(&tx, email, Some(id))? {
            return Err(CrmError::Duplicate(
                "Contact with this email already exists".to_string(),
            ));
        }
    }

    let mut patch = Patch::new(now);
    patch
        .set("last_activity", now)
        .set_opt("first_name", request.first_name.clone())
        .set_opt("last_name", request.last_name.clone())
        .set_opt("email", request.email.clone())
        .set_opt("phone", request.phone.clone())
        .set_opt("company", request.company.clone())
        .set_opt("title", request.title.clone())
        .set_opt("status", request.status.map(|s| s.as_str()))
        .set_opt("rating", request.rating.map(|r| r.as_str()))
        .set_opt("owner", request.owner.clone())
        .set_opt("notes", request.notes.clone());
    patch.execute(&tx, "contacts", id)?;

    let changed = request.changed_fields();
    if !changed.is_empty() {
        activities::insert_note(
            &tx,
            AuditNote {
                subject: "Contact Updated",
                description: format!("Contact information updated: {}", changed.join(", ")),
                related_to: RelatedType::Contact,
                related_id: id,
                owner: &existing.owner,
            },
            now,
        )?;
    }

    let updated = fetch_contact(&tx, id)?.ok_or_else(|| CrmError::not_found("Contact"))?;
    tx.commit()?;

    Ok(updated)
}

/// Delete a contact with its activities and tasks, detaching it from deals.
pub async fn delete_contact(conn: AsyncDbConnection, id: i64) -> Result<(), CrmError> {
    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;

    if fetch_contact(&tx, id)?.is_none() {
        return Err(CrmError::not_found("Contact"));
    }

    let (activities, tasks) = related::delete_dependents(&tx, RelatedType::Contact, id)?;
    let detached = tx.execute(
        "UPDATE deals SET contact_id = NULL, updated_at = ?1 WHERE contact_id = ?2",
        params![now_millis(), id],
    )?;
    tx.execute("DELETE FROM contacts WHERE id = ?1", [id])?;

    tx.commit()?;
    tracing::info!(
        "Deleted contact {} ({} activities, {} tasks removed, {} deals detached)",
        id,
        activities,
        tasks,
        detached
    );

    Ok(())
}

/// Apply the same patch to many contacts; unknown ids are skipped.
pub async fn bulk_update_contacts(
    conn: AsyncDbConnection,
    request: &BulkUpdateContactsRequest,
) -> Result<Vec<i64>, CrmError> {
    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();
    let updates = &request.updates;

    let mut updated = Vec::new();
    for &id in &request.ids {
        let mut patch = Patch::new(now);
        patch
            .set("last_activity", now)
            .set_opt("status", updates.status.map(|s| s.as_str()))
            .set_opt("rating", updates.rating.map(|r| r.as_str()))
            .set_opt("owner", updates.owner.clone());
        if patch.execute(&tx, "contacts", id)? > 0 {
            updated.push(id);
        }
    }

    tx.commit()?;
    tracing::info!(
        "Bulk updated {} of {} contacts",
        updated.len(),
        request.ids.len()
    );

    Ok(updated)
}

/// Fold engagement counts into the contact's AI score; returns the new score.
pub async fn update_ai_score(
    conn: AsyncDbConnection,
    id: i64,
    engagement: &UpdateAiScoreRequest,
) -> Result<i64, CrmError> {
    let conn = conn.lock().await?;
    let contact = fetch_contact(&conn, id)?.ok_or_else(|| CrmError::not_found("Contact"))?;

    let score = crm_scoring::refresh_lead_score(contact.ai_score, engagement);
    conn.execute(
        "UPDATE contacts SET ai_score = ?1, updated_at = ?2 WHERE id = ?3",
        params![score, now_millis(), id],
    )?;
    tracing::debug!("Contact {} AI score {:?} -> {}", id, contact.ai_score, score);

    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{contact_request, test_database, OWNER};
    use shared_types::{ContactBulkUpdates, ContactRating, ContactStatus};

    #[tokio::test]
    async fn test_create_scores_and_logs() {
        let (_dir, db) = test_database();
        let mut request = contact_request("ceo@acme.com", Some("Acme"));
        request.lead_source = Some("referral".to_string());
        request.title = Some("CEO".to_string());

        let contact = create_contact(db.async_connection.clone(), &request, 19)
            .await
            .unwrap();
        assert_eq!(contact.ai_score, Some(100));
        assert_eq!(contact.status, ContactStatus::New);
        assert_eq!(contact.rating, ContactRating::Cold);
        assert_eq!(contact.sentiment, Some(Sentiment::Neutral));

        let detail = get_contact_detail(db.async_connection.clone(), contact.id)
            .await
            .unwrap();
        assert_eq!(detail.activities.len(), 1);
        assert_eq!(detail.activities[0].subject, "Contact Created");
        assert_eq!(
            detail.activities[0].description.as_deref(),
            Some("New contact added to CRM from referral")
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_inserts_nothing() {
        let (_dir, db) = test_database();
        let request = contact_request("dup@example.com", None);
        create_contact(db.async_connection.clone(), &request, 0)
            .await
            .unwrap();

        let err = create_contact(db.async_connection.clone(), &request, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Duplicate(_)));

        let list = list_contacts(db.async_connection.clone(), &ListContactsQuery::default())
            .await
            .unwrap();
        assert_eq!(list.total, 1);
    }

    #[tokio::test]
    async fn test_update_logs_changed_fields_except_notes() {
        let (_dir, db) = test_database();
        let contact = create_contact(
            db.async_connection.clone(),
            &contact_request("ada@example.com", None),
            0,
        )
        .await
        .unwrap();

        let request = UpdateContactRequest {
            title: Some("CTO".to_string()),
            status: Some(ContactStatus::Qualified),
            notes: Some("met at conference".to_string()),
            ..Default::default()
        };
        let updated = update_contact(db.async_connection.clone(), contact.id, &request)
            .await
            .unwrap();
        assert_eq!(updated.title.as_deref(), Some("CTO"));
        assert_eq!(updated.notes.as_deref(), Some("met at conference"));
        assert!(updated.last_activity.is_some());

        let detail = get_contact_detail(db.async_connection.clone(), contact.id)
            .await
            .unwrap();
        assert_eq!(detail.activities[0].subject, "Contact Updated");
        assert_eq!(
            detail.activities[0].description.as_deref(),
            Some("Contact information updated: title, status")
        );

        // notes alone leave no audit entry
        let notes_only = UpdateContactRequest {
            notes: Some("follow up in Q3".to_string()),
            ..Default::default()
        };
        update_contact(db.async_connection.clone(), contact.id, &notes_only)
            .await
            .unwrap();
        let detail = get_contact_detail(db.async_connection.clone(), contact.id)
            .await
            .unwrap();
        assert_eq!(detail.activities.len(), 2);
    }

    #[tokio::test]
    async fn test_update_email_conflict() {
        let (_dir, db) = test_database();
        create_contact(db.async_connection.clone(), &contact_request("a@example.com", None), 0)
            .await
            .unwrap();
        let b = create_contact(db.async_connection.clone(), &contact_request("b@example.com", None), 0)
            .await
            .unwrap();

        let request = UpdateContactRequest {
            email: Some("a@example.com".to_string()),
            ..Default::default()
        };
        let err = update_contact(db.async_connection.clone(), b.id, &request)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Contact with this email already exists");

        // re-submitting its own email is fine
        let same = UpdateContactRequest {
            email: Some("b@example.com".to_string()),
            ..Default::default()
        };
        update_contact(db.async_connection.clone(), b.id, &same)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_filters_and_search() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let mut first = contact_request("linus@kernel.org", Some("Linux Foundation"));
        first.first_name = "Linus".to_string();
        create_contact(conn.clone(), &first, 0).await.unwrap();

        let mut second = contact_request("grace@navy.mil", None);
        second.first_name = "Grace".to_string();
        second.status = Some(ContactStatus::Qualified);
        second.owner = "someone_else".to_string();
        create_contact(conn.clone(), &second, 0).await.unwrap();

        let by_company = list_contacts(
            conn.clone(),
            &ListContactsQuery {
                search: Some("foundation".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_company.contacts.len(), 1);
        assert_eq!(by_company.contacts[0].first_name, "Linus");

        let qualified = list_contacts(
            conn.clone(),
            &ListContactsQuery {
                status: Some(ContactStatus::Qualified),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(qualified.total, 1);

        let mine = list_contacts(
            conn.clone(),
            &ListContactsQuery {
                owner: Some(OWNER.to_string()),
                limit: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(mine.total, 1);
        assert!(!mine.has_more);
    }

    #[tokio::test]
    async fn test_bulk_update_skips_missing() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let a = create_contact(conn.clone(), &contact_request("a@example.com", None), 0)
            .await
            .unwrap();

        let ids = bulk_update_contacts(
            conn.clone(),
            &BulkUpdateContactsRequest {
                ids: vec![a.id, 4242],
                updates: ContactBulkUpdates {
                    rating: Some(ContactRating::Hot),
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();
        assert_eq!(ids, vec![a.id]);
        assert_eq!(
            get_contact(conn, a.id).await.unwrap().rating,
            ContactRating::Hot
        );
    }

    #[tokio::test]
    async fn test_ai_score_refresh_is_clamped() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let contact = create_contact(conn.clone(), &contact_request("a@example.com", None), 0)
            .await
            .unwrap();
        assert_eq!(contact.ai_score, Some(50));

        let score = update_ai_score(
            conn.clone(),
            contact.id,
            &UpdateAiScoreRequest {
                interactions: Some(3),
                email_opens: Some(2),
                website_visits: Some(1),
            },
        )
        .await
        .unwrap();
        assert_eq!(score, 50 + 15 + 4 + 3);

        let capped = update_ai_score(
            conn.clone(),
            contact.id,
            &UpdateAiScoreRequest {
                interactions: Some(1_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(capped, 100);

        let err = update_ai_score(conn, 999, &UpdateAiScoreRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_contact() {
        let (_dir, db) = test_database();
        let err = delete_contact(db.async_connection.clone(), 1).await.unwrap_err();
        assert_eq!(err.to_string(), "Contact not found");
    }
}
