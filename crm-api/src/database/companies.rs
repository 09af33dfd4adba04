use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use shared_types::{
    now_millis, CompaniesResponse, Company, CompanyDetail, CompanyMetrics, CompanySummary,
    CreateCompanyRequest, DealStage, ListCompaniesQuery, RelatedType, UpdateCompanyRequest,
    UpdateHealthScoreRequest,
};

use crate::database::activities::{self, AuditNote};
use crate::database::rows::{enum_column, Patch};
use crate::database::{contacts, deals, related, AsyncDbConnection};
use crate::error::CrmError;
use crate::helpers::pagination::{matches_any, normalize_search, paginate};

const COMPANY_COLUMNS: &str = "id, name, industry, website, phone, employees, annual_revenue,
    company_type, health_score, owner, created_at, updated_at";

const DETAIL_ACTIVITY_LIMIT: usize = 20;

fn map_company(row: &Row) -> rusqlite::Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        industry: row.get(2)?,
        website: row.get(3)?,
        phone: row.get(4)?,
        employees: row.get(5)?,
        annual_revenue: row.get(6)?,
        company_type: enum_column(row, 7)?,
        health_score: row.get(8)?,
        owner: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub fn fetch_company(conn: &Connection, id: i64) -> Result<Option<Company>, CrmError> {
    let company = conn
        .query_row(
            &format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?1"),
            [id],
            map_company,
        )
        .optional()?;
    Ok(company)
}

fn name_taken(conn: &Connection, name: &str, except_id: Option<i64>) -> Result<bool, CrmError> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM companies WHERE name = ?1 AND id != ?2)",
        params![name, except_id.unwrap_or(-1)],
        |row| row.get(0),
    )?;
    Ok(taken)
}

fn validate_name(name: &str) -> Result<(), CrmError> {
    if name.trim().is_empty() {
        return Err(CrmError::Validation(
            "Company name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn summarize(conn: &Connection, company: Company) -> Result<CompanySummary, CrmError> {
    let contact_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM contacts WHERE company = ?1",
        [&company.name],
        |row| row.get(0),
    )?;
    let (active_deal_count, total_deal_value): (i64, f64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(amount), 0) FROM deals
         WHERE company_id = ?1 AND stage NOT IN (?2, ?3)",
        params![
            company.id,
            DealStage::ClosedWon.as_str(),
            DealStage::ClosedLost.as_str()
        ],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(CompanySummary {
        company,
        contact_count,
        active_deal_count,
        total_deal_value,
    })
}

pub async fn list_companies(
    conn: AsyncDbConnection,
    query: &ListCompaniesQuery,
) -> Result<CompaniesResponse, CrmError> {
    let conn = conn.lock().await?;

    let mut filters = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(company_type) = query.company_type {
        filters.push("company_type = ?");
        params.push(Box::new(company_type.as_str()));
    }
    if let Some(industry) = &query.industry {
        filters.push("industry = ?");
        params.push(Box::new(industry.clone()));
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
        "SELECT {COMPANY_COLUMNS} FROM companies {where_clause}
         ORDER BY created_at DESC, id DESC"
    ))?;
    let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut companies = stmt
        .query_map(params_refs.as_slice(), map_company)?
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(needle) = normalize_search(query.search.as_deref()) {
        companies.retain(|c| {
            matches_any(&needle, &[Some(c.name.as_str()), c.industry.as_deref()])
        });
    }

    let page = paginate(companies, query.offset, query.limit);
    let companies = page
        .items
        .into_iter()
        .map(|company| summarize(&conn, company))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompaniesResponse {
        companies,
        total: page.total,
        has_more: page.has_more,
    })
}

/// Company with contacts, deals, recent activity and pipeline metrics.
pub async fn get_company_detail(
    conn: AsyncDbConnection,
    id: i64,
) -> Result<CompanyDetail, CrmError> {
    let conn = conn.lock().await?;
    let company = fetch_company(&conn, id)?.ok_or_else(|| CrmError::not_found("Company"))?;

    let contacts = contacts::fetch_by_company(&conn, &company.name)?;
    let deals = deals::fetch_for_company(&conn, id)?;
    let activities =
        activities::fetch_related(&conn, RelatedType::Company, id, Some(DETAIL_ACTIVITY_LIMIT))?;

    let won = deals.iter().filter(|d| d.stage == DealStage::ClosedWon);
    let active = deals.iter().filter(|d| !d.stage.is_closed());
    let metrics = CompanyMetrics {
        total_revenue: won.clone().map(|d| d.amount).sum(),
        pipeline_value: active.clone().map(|d| d.amount).sum(),
        active_deals: active.count() as i64,
        won_deals: won.count() as i64,
        contact_count: contacts.len() as i64,
    };

    Ok(CompanyDetail {
        company,
        contacts,
        deals,
        activities,
        metrics,
    })
}

pub async fn create_company(
    conn: AsyncDbConnection,
    request: &CreateCompanyRequest,
) -> Result<Company, CrmError> {
    validate_name(&request.name)?;

    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();

    if name_taken(&tx, &request.name, None)? {
        tracing::warn!("Rejected duplicate company name {}", request.name);
        return Err(CrmError::Duplicate(
            "Company with this name already exists".to_string(),
        ));
    }

    let health_score = crm_scoring::health_score(&crm_scoring::CompanyProfile {
        annual_revenue: request.annual_revenue,
        employees: request.employees,
        website: request.website.as_deref(),
    });

    let company = tx.query_row(
        &format!(
            "INSERT INTO companies
             (name, industry, website, phone, employees, annual_revenue, company_type,
              health_score, owner, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             RETURNING {COMPANY_COLUMNS}"
        ),
        params![
            request.name,
            request.industry,
            request.website,
            request.phone,
            request.employees,
            request.annual_revenue,
            request.company_type.as_str(),
            health_score,
            request.owner,
            now
        ],
        map_company,
    )?;

    activities::insert_note(
        &tx,
        AuditNote {
            subject: "Company Created",
            description: format!("New company added to CRM: {}", company.name),
            related_to: RelatedType::Company,
            related_id: company.id,
            owner: &request.owner,
        },
        now,
    )?;

    tx.commit()?;
    tracing::info!(
        "Created company {} ({}) with health score {}",
        company.id,
        company.name,
        health_score
    );

    Ok(company)
}

/// Patch a company. Health is recomputed when revenue, headcount or website
/// change, and a rename is carried over to contacts linked by name.
pub async fn update_company(
    conn: AsyncDbConnection,
    id: i64,
    request: &UpdateCompanyRequest,
) -> Result<Company, CrmError> {
    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();

    let existing = fetch_company(&tx, id)?.ok_or_else(|| CrmError::not_found("Company"))?;

    let rename = request
        .name
        .as_deref()
        .filter(|name| *name != existing.name);
    if let Some(name) = rename {
        validate_name(name)?;
        if name_taken(&tx, name, Some(id))? {
            return Err(CrmError::Duplicate(
                "Company with this name already exists".to_string(),
            ));
        }
    }

    let health_score = if request.annual_revenue.is_some()
        || request.employees.is_some()
        || request.website.is_some()
    {
        let score = crm_scoring::health_score(&crm_scoring::CompanyProfile {
            annual_revenue: request.annual_revenue.or(existing.annual_revenue),
            employees: request.employees.or(existing.employees),
            website: request.website.as_deref().or(existing.website.as_deref()),
        });
        tracing::debug!("Company {} health recalculated: {}", id, score);
        Some(score)
    } else {
        None
    };

    let mut patch = Patch::new(now);
    patch
        .set_opt("name", request.name.clone())
        .set_opt("industry", request.industry.clone())
        .set_opt("website", request.website.clone())
        .set_opt("phone", request.phone.clone())
        .set_opt("employees", request.employees)
        .set_opt("annual_revenue", request.annual_revenue)
        .set_opt("company_type", request.company_type.map(|t| t.as_str()))
        .set_opt("owner", request.owner.clone())
        .set_opt("health_score", health_score);
    patch.execute(&tx, "companies", id)?;

    if let Some(name) = rename {
        let renamed = tx.execute(
            "UPDATE contacts SET company = ?1, updated_at = ?2 WHERE company = ?3",
            params![name, now, existing.name],
        )?;
        tracing::info!(
            "Renamed company {} from {} to {} ({} contacts updated)",
            id,
            existing.name,
            name,
            renamed
        );
    }

    let updated = fetch_company(&tx, id)?.ok_or_else(|| CrmError::not_found("Company"))?;
    tx.commit()?;

    Ok(updated)
}

/// Delete a company with its activities, tasks and deals (and theirs), and
/// clear the company name on linked contacts.
pub async fn delete_company(conn: AsyncDbConnection, id: i64) -> Result<(), CrmError> {
    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();

    let company = fetch_company(&tx, id)?.ok_or_else(|| CrmError::not_found("Company"))?;

    let (mut activities, mut tasks) = related::delete_dependents(&tx, RelatedType::Company, id)?;

    let deal_ids: Vec<i64> = {
        let mut stmt = tx.prepare("SELECT id FROM deals WHERE company_id = ?1")?;
        let ids = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };
    for deal_id in &deal_ids {
        let (a, t) = deals::delete_deal_tx(&tx, *deal_id)?;
        activities += a;
        tasks += t;
    }

    let unlinked = tx.execute(
        "UPDATE contacts SET company = NULL, updated_at = ?1 WHERE company = ?2",
        params![now, company.name],
    )?;
    tx.execute("DELETE FROM companies WHERE id = ?1", [id])?;

    tx.commit()?;
    tracing::info!(
        "Deleted company {} ({}): {} deals, {} activities, {} tasks removed, {} contacts unlinked",
        id,
        company.name,
        deal_ids.len(),
        activities,
        tasks,
        unlinked
    );

    Ok(())
}

/// Fold engagement signals into the health score; returns the new score.
pub async fn update_health_score(
    conn: AsyncDbConnection,
    id: i64,
    signals: &UpdateHealthScoreRequest,
) -> Result<i64, CrmError> {
    let conn = conn.lock().await?;
    let company = fetch_company(&conn, id)?.ok_or_else(|| CrmError::not_found("Company"))?;

    let score = crm_scoring::refresh_health_score(company.health_score, signals);
    conn.execute(
        "UPDATE companies SET health_score = ?1, updated_at = ?2 WHERE id = ?3",
        params![score, now_millis(), id],
    )?;
    tracing::debug!(
        "Company {} health {:?} -> {}",
        id,
        company.health_score,
        score
    );

    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::contacts::{create_contact, get_contact};
    use crate::database::deals::{create_deal, update_deal_stage};
    use crate::database::tasks::create_task;
    use crate::database::test_support::{
        company_request, contact_request, deal_request, test_database, OWNER,
    };
    use shared_types::{CompanyType, CreateTaskRequest, PaymentHistory, TaskPriority};

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[tokio::test]
    async fn test_acme_health_score() {
        let (_dir, db) = test_database();
        let mut request = company_request("Acme");
        request.annual_revenue = Some(2_000_000.0);
        request.employees = Some(150);
        request.website = Some("acme.com".to_string());

        let company = create_company(db.async_connection.clone(), &request)
            .await
            .unwrap();
        assert_eq!(company.health_score, Some(95));

        let detail = get_company_detail(db.async_connection.clone(), company.id)
            .await
            .unwrap();
        assert_eq!(detail.activities.len(), 1);
        assert_eq!(
            detail.activities[0].description.as_deref(),
            Some("New company added to CRM: Acme")
        );
    }

    #[tokio::test]
    async fn test_duplicate_and_empty_names() {
        let (_dir, db) = test_database();
        create_company(db.async_connection.clone(), &company_request("Acme"))
            .await
            .unwrap();

        let err = create_company(db.async_connection.clone(), &company_request("Acme"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Company with this name already exists");

        let err = create_company(db.async_connection.clone(), &company_request("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));

        let conn = db.async_connection.lock().await.unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM companies"), 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM activities"), 1);
    }

    #[tokio::test]
    async fn test_update_recalculates_health_and_renames_contacts() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        assert_eq!(company.health_score, Some(50));
        let contact = create_contact(conn.clone(), &contact_request("a@acme.com", Some("Acme")), 0)
            .await
            .unwrap();

        let updated = update_company(
            conn.clone(),
            company.id,
            &UpdateCompanyRequest {
                name: Some("Acme Holdings".to_string()),
                website: Some("acme.example".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Acme Holdings");
        assert_eq!(updated.health_score, Some(60));

        let contact = get_contact(conn.clone(), contact.id).await.unwrap();
        assert_eq!(contact.company.as_deref(), Some("Acme Holdings"));

        // an unrelated field leaves health alone
        let retyped = update_company(
            conn.clone(),
            company.id,
            &UpdateCompanyRequest {
                company_type: Some(CompanyType::Customer),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(retyped.health_score, Some(60));
        assert_eq!(retyped.company_type, CompanyType::Customer);
    }

    #[tokio::test]
    async fn test_rename_to_existing_name_fails() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        create_company(conn.clone(), &company_request("Acme")).await.unwrap();
        let globex = create_company(conn.clone(), &company_request("Globex"))
            .await
            .unwrap();

        let err = update_company(
            conn.clone(),
            globex.id,
            &UpdateCompanyRequest {
                name: Some("Acme".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CrmError::Duplicate(_)));
        assert_eq!(get_company_detail(conn, globex.id).await.unwrap().company.name, "Globex");
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        let other = create_company(conn.clone(), &company_request("Globex"))
            .await
            .unwrap();
        let contact = create_contact(conn.clone(), &contact_request("a@acme.com", Some("Acme")), 0)
            .await
            .unwrap();
        let deal = create_deal(conn.clone(), &deal_request("Acme renewal", company.id))
            .await
            .unwrap();
        update_deal_stage(conn.clone(), deal.id, DealStage::Negotiation)
            .await
            .unwrap();
        let kept = create_deal(conn.clone(), &deal_request("Globex pilot", other.id))
            .await
            .unwrap();
        create_task(
            conn.clone(),
            &CreateTaskRequest {
                subject: "Send contract".to_string(),
                description: None,
                due_date: now_millis(),
                priority: TaskPriority::High,
                status: None,
                assigned_to: OWNER.to_string(),
                related_to: Some("deal".to_string()),
                related_id: Some(deal.id),
                ai_suggested: None,
            },
        )
        .await
        .unwrap();

        delete_company(conn.clone(), company.id).await.unwrap();

        // contact survives with its company cleared
        let contact = get_contact(conn.clone(), contact.id).await.unwrap();
        assert_eq!(contact.company, None);

        let guard = conn.lock().await.unwrap();
        assert_eq!(count(&guard, "SELECT COUNT(*) FROM companies"), 1);
        assert_eq!(count(&guard, "SELECT COUNT(*) FROM deals"), 1);
        assert_eq!(count(&guard, "SELECT COUNT(*) FROM tasks"), 0);
        assert_eq!(
            count(
                &guard,
                &format!(
                    "SELECT COUNT(*) FROM activities WHERE
                     (related_to = 'company' AND related_id = {}) OR
                     (related_to = 'deal' AND related_id = {})",
                    company.id, deal.id
                )
            ),
            0
        );
        assert!(deals::fetch_deal(&guard, kept.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_health_refresh() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();

        let score = update_health_score(
            conn.clone(),
            company.id,
            &UpdateHealthScoreRequest {
                deal_activity: Some(2),
                communication_frequency: Some(1),
                payment_history: Some(PaymentHistory::Good),
            },
        )
        .await
        .unwrap();
        assert_eq!(score, 50 + 20 + 5 + 15);
        assert_eq!(
            get_company_detail(conn.clone(), company.id)
                .await
                .unwrap()
                .company
                .health_score,
            Some(score)
        );

        let floor = update_health_score(
            conn,
            company.id,
            &UpdateHealthScoreRequest {
                deal_activity: Some(-50),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(floor, 0);
    }

    #[tokio::test]
    async fn test_list_counters() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        create_contact(conn.clone(), &contact_request("a@acme.com", Some("Acme")), 0)
            .await
            .unwrap();
        create_deal(conn.clone(), &deal_request("Open", company.id))
            .await
            .unwrap();
        let won = create_deal(conn.clone(), &deal_request("Won", company.id))
            .await
            .unwrap();
        update_deal_stage(conn.clone(), won.id, DealStage::ClosedWon)
            .await
            .unwrap();

        let list = list_companies(conn.clone(), &ListCompaniesQuery::default())
            .await
            .unwrap();
        assert_eq!(list.total, 1);
        let summary = &list.companies[0];
        assert_eq!(summary.contact_count, 1);
        assert_eq!(summary.active_deal_count, 1);
        assert_eq!(summary.total_deal_value, 25_000.0);

        let detail = get_company_detail(conn.clone(), company.id).await.unwrap();
        assert_eq!(detail.metrics.won_deals, 1);
        assert_eq!(detail.metrics.active_deals, 1);
        assert_eq!(detail.metrics.total_revenue, 25_000.0);
        assert_eq!(detail.metrics.pipeline_value, 25_000.0);

        let searched = list_companies(
            conn,
            &ListCompaniesQuery {
                search: Some("manufact".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(searched.total, 1);
    }
}
