//! Polymorphic `(related_to, related_id)` pointers shared by tasks and activities.

use rusqlite::{params, Connection};
use shared_types::{RelatedEntity, RelatedType};

use crate::database::{companies, contacts, deals};
use crate::error::CrmError;

fn table_for(kind: RelatedType) -> &'static str {
    match kind {
        RelatedType::Contact => "contacts",
        RelatedType::Company => "companies",
        RelatedType::Deal => "deals",
    }
}

/// Parse a wire tag, yielding "Unsupported related type: X" for unknown tags.
pub fn parse_related_type(tag: &str) -> Result<RelatedType, CrmError> {
    Ok(tag.parse()?)
}

pub fn ensure_exists(conn: &Connection, kind: RelatedType, id: i64) -> Result<(), CrmError> {
    let exists: bool = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table_for(kind)),
        [id],
        |row| row.get(0),
    )?;

    if exists {
        Ok(())
    } else {
        Err(CrmError::not_found(format!("Related {kind}")))
    }
}

pub fn resolve(
    conn: &Connection,
    kind: RelatedType,
    id: i64,
) -> Result<Option<RelatedEntity>, CrmError> {
    let entity = match kind {
        RelatedType::Contact => contacts::fetch_contact(conn, id)?.map(RelatedEntity::Contact),
        RelatedType::Company => companies::fetch_company(conn, id)?.map(RelatedEntity::Company),
        RelatedType::Deal => deals::fetch_deal(conn, id)?.map(RelatedEntity::Deal),
    };
    Ok(entity)
}

/// Remove the activities and tasks hanging off a record; returns both counts.
pub fn delete_dependents(
    conn: &Connection,
    kind: RelatedType,
    id: i64,
) -> Result<(usize, usize), CrmError> {
    let activities = conn.execute(
        "DELETE FROM activities WHERE related_to = ?1 AND related_id = ?2",
        params![kind.as_str(), id],
    )?;
    let tasks = conn.execute(
        "DELETE FROM tasks WHERE related_to = ?1 AND related_id = ?2",
        params![kind.as_str(), id],
    )?;
    Ok((activities, tasks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::companies::create_company;
    use crate::database::test_support::{company_request, test_database};

    #[tokio::test]
    async fn test_resolve_and_missing_related() {
        let (_dir, db) = test_database();
        let company = create_company(db.async_connection.clone(), &company_request("Acme"))
            .await
            .unwrap();

        let conn = db.async_connection.lock().await.unwrap();
        ensure_exists(&conn, RelatedType::Company, company.id).unwrap();
        match resolve(&conn, RelatedType::Company, company.id).unwrap() {
            Some(RelatedEntity::Company(found)) => assert_eq!(found.name, "Acme"),
            other => panic!("unexpected {other:?}"),
        }

        let err = ensure_exists(&conn, RelatedType::Deal, 999).unwrap_err();
        assert_eq!(err.to_string(), "Related deal not found");
        assert!(resolve(&conn, RelatedType::Contact, 999).unwrap().is_none());
    }

    #[test]
    fn test_parse_related_type() {
        assert_eq!(parse_related_type("deal").unwrap(), RelatedType::Deal);
        let err = parse_related_type("invoice").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported related type: invoice");
    }
}
