use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use shared_types::{
    now_millis, CreateDealRequest, Deal, DealDetail, DealStage, DealWithRelations,
    DealsByStageResponse, DealsResponse, DealsSummary, ListDealsQuery, RelatedType,
    UpdateAiProbabilityRequest, UpdateDealRequest,
};
use std::collections::BTreeMap;

use crate::database::activities::{self, AuditNote};
use crate::database::rows::{enum_column, Patch};
use crate::database::{companies, contacts, related, tasks, AsyncDbConnection};
use crate::error::CrmError;
use crate::helpers::format::{format_amount, format_date};
use crate::helpers::pagination::{matches_any, normalize_search, paginate};

const DEAL_COLUMNS: &str = "id, name, company_id, contact_id, stage, amount, probability,
    ai_probability, close_date, deal_type, lead_source, owner, next_step, competitors,
    created_at, updated_at";

const DETAIL_ACTIVITY_LIMIT: usize = 10;

fn map_deal(row: &Row) -> rusqlite::Result<Deal> {
    let competitors: String = row.get(13)?;
    let competitors: Vec<String> = serde_json::from_str(&competitors)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, Type::Text, Box::new(e)))?;

    Ok(Deal {
        id: row.get(0)?,
        name: row.get(1)?,
        company_id: row.get(2)?,
        contact_id: row.get(3)?,
        stage: enum_column(row, 4)?,
        amount: row.get(5)?,
        probability: row.get(6)?,
        ai_probability: row.get(7)?,
        close_date: row.get(8)?,
        deal_type: enum_column(row, 9)?,
        lead_source: row.get(10)?,
        owner: row.get(11)?,
        next_step: row.get(12)?,
        competitors,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn clamp_probability(probability: i64) -> i64 {
    crm_scoring::clamp_score(probability)
}

pub fn fetch_deal(conn: &Connection, id: i64) -> Result<Option<Deal>, CrmError> {
    let deal = conn
        .query_row(
            &format!("SELECT {DEAL_COLUMNS} FROM deals WHERE id = ?1"),
            [id],
            map_deal,
        )
        .optional()?;
    Ok(deal)
}

fn fetch_where(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<Deal>, CrmError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DEAL_COLUMNS} FROM deals {where_clause} ORDER BY created_at DESC, id DESC"
    ))?;
    let deals = stmt
        .query_map(params, map_deal)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(deals)
}

pub fn fetch_for_company(conn: &Connection, company_id: i64) -> Result<Vec<Deal>, CrmError> {
    fetch_where(conn, "WHERE company_id = ?", &[&company_id as &dyn ToSql])
}

pub fn fetch_for_contact(conn: &Connection, contact_id: i64) -> Result<Vec<Deal>, CrmError> {
    fetch_where(conn, "WHERE contact_id = ?", &[&contact_id as &dyn ToSql])
}

fn with_relations(conn: &Connection, deal: Deal) -> Result<DealWithRelations, CrmError> {
    let company = companies::fetch_company(conn, deal.company_id)?;
    let contact = match deal.contact_id {
        Some(contact_id) => contacts::fetch_contact(conn, contact_id)?,
        None => None,
    };
    Ok(DealWithRelations {
        deal,
        company,
        contact,
    })
}

/// Delete a deal and its activities and tasks inside the caller's transaction.
pub fn delete_deal_tx(conn: &Connection, id: i64) -> Result<(usize, usize), CrmError> {
    let removed = related::delete_dependents(conn, RelatedType::Deal, id)?;
    conn.execute("DELETE FROM deals WHERE id = ?1", [id])?;
    Ok(removed)
}

pub async fn list_deals(
    conn: AsyncDbConnection,
    query: &ListDealsQuery,
) -> Result<DealsResponse, CrmError> {
    let conn = conn.lock().await?;

    let mut filters = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(stage) = query.stage {
        filters.push("stage = ?");
        params.push(Box::new(stage.as_str()));
    }
    if let Some(owner) = &query.owner {
        filters.push("owner = ?");
        params.push(Box::new(owner.clone()));
    }
    if let Some(company_id) = query.company_id {
        filters.push("company_id = ?");
        params.push(Box::new(company_id));
    }

    let where_clause = if filters.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", filters.join(" AND "))
    };
    let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut deals = fetch_where(&conn, &where_clause, params_refs.as_slice())?;

    if let Some(needle) = normalize_search(query.search.as_deref()) {
        deals.retain(|d| matches_any(&needle, &[Some(d.name.as_str())]));
    }

    let page = paginate(deals, query.offset, query.limit);
    let deals = page
        .items
        .into_iter()
        .map(|deal| with_relations(&conn, deal))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DealsResponse {
        deals,
        total: page.total,
        has_more: page.has_more,
    })
}

/// Kanban view: every stage present, deals ordered by AI probability.
pub async fn deals_by_stage(conn: AsyncDbConnection) -> Result<DealsByStageResponse, CrmError> {
    let conn = conn.lock().await?;
    let deals = fetch_where(&conn, "", &[])?;

    let mut stages: BTreeMap<DealStage, Vec<DealWithRelations>> =
        DealStage::ALL.into_iter().map(|s| (s, Vec::new())).collect();
    for deal in deals {
        let entry = with_relations(&conn, deal)?;
        stages.entry(entry.deal.stage).or_default().push(entry);
    }
    for column in stages.values_mut() {
        column.sort_by_key(|d| std::cmp::Reverse(d.deal.ai_probability.unwrap_or(0)));
    }

    Ok(DealsByStageResponse { stages })
}

pub async fn get_deal_detail(conn: AsyncDbConnection, id: i64) -> Result<DealDetail, CrmError> {
    let conn = conn.lock().await?;
    let deal = fetch_deal(&conn, id)?.ok_or_else(|| CrmError::not_found("Deal"))?;
    let DealWithRelations {
        deal,
        company,
        contact,
    } = with_relations(&conn, deal)?;
    let activities =
        activities::fetch_related(&conn, RelatedType::Deal, id, Some(DETAIL_ACTIVITY_LIMIT))?;
    let tasks = tasks::fetch_related(&conn, RelatedType::Deal, id)?;

    Ok(DealDetail {
        deal,
        company,
        contact,
        activities,
        tasks,
    })
}

pub async fn create_deal(
    conn: AsyncDbConnection,
    request: &CreateDealRequest,
) -> Result<Deal, CrmError> {
    if request.name.trim().is_empty() {
        return Err(CrmError::Validation("Deal name cannot be empty".to_string()));
    }

    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();

    let company = companies::fetch_company(&tx, request.company_id)?
        .ok_or_else(|| CrmError::not_found("Company"))?;
    if let Some(contact_id) = request.contact_id {
        if contacts::fetch_contact(&tx, contact_id)?.is_none() {
            return Err(CrmError::not_found("Contact"));
        }
    }

    let probability = clamp_probability(request.probability);
    let ai_probability = crm_scoring::win_probability(&crm_scoring::DealProfile {
        probability,
        amount: request.amount,
        lead_source: request.lead_source.as_deref(),
        company_health: company.health_score,
    });
    tracing::debug!(
        "Deal {} AI probability {} (company health {:?})",
        request.name,
        ai_probability,
        company.health_score
    );

    let deal = tx.query_row(
        &format!(
            "INSERT INTO deals
             (name, company_id, contact_id, stage, amount, probability, ai_probability,
              close_date, deal_type, lead_source, owner, next_step, competitors,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, '[]', ?13, ?13)
             RETURNING {DEAL_COLUMNS}"
        ),
        params![
            request.name,
            request.company_id,
            request.contact_id,
            request.stage.as_str(),
            request.amount,
            probability,
            ai_probability,
            request.close_date,
            request.deal_type.as_str(),
            request.lead_source,
            request.owner,
            request.next_step,
            now
        ],
        map_deal,
    )?;

    activities::insert_note(
        &tx,
        AuditNote {
            subject: "Deal Created",
            description: format!(
                "New deal created: {} - ${}",
                deal.name,
                format_amount(deal.amount)
            ),
            related_to: RelatedType::Deal,
            related_id: deal.id,
            owner: &request.owner,
        },
        now,
    )?;

    tx.commit()?;
    tracing::info!(
        "Created deal {} ({}) for company {}",
        deal.id,
        deal.name,
        company.name
    );

    Ok(deal)
}

/// Move a deal to `stage`, resetting its probability to the stage default.
pub async fn update_deal_stage(
    conn: AsyncDbConnection,
    id: i64,
    stage: DealStage,
) -> Result<Deal, CrmError> {
    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();

    let deal = fetch_deal(&tx, id)?.ok_or_else(|| CrmError::not_found("Deal"))?;

    let mut patch = Patch::new(now);
    patch
        .set("stage", stage.as_str())
        .set("probability", crm_scoring::stage_probability(stage));
    patch.execute(&tx, "deals", id)?;

    activities::insert_note(
        &tx,
        AuditNote {
            subject: "Deal Stage Updated",
            description: format!("Deal moved to {stage} stage"),
            related_to: RelatedType::Deal,
            related_id: id,
            owner: &deal.owner,
        },
        now,
    )?;

    let updated = fetch_deal(&tx, id)?.ok_or_else(|| CrmError::not_found("Deal"))?;
    tx.commit()?;
    tracing::info!("Deal {} moved from {} to {}", id, deal.stage, stage);

    Ok(updated)
}

pub async fn update_deal(
    conn: AsyncDbConnection,
    id: i64,
    request: &UpdateDealRequest,
) -> Result<Deal, CrmError> {
    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;
    let now = now_millis();

    let existing = fetch_deal(&tx, id)?.ok_or_else(|| CrmError::not_found("Deal"))?;

    if request
        .name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(CrmError::Validation("Deal name cannot be empty".to_string()));
    }

    let stage_changed = request.stage.filter(|s| *s != existing.stage);
    let probability = match (request.probability, stage_changed) {
        // closed stages pin the probability
        (_, Some(stage)) if stage.is_closed() => Some(crm_scoring::stage_probability(stage)),
        (Some(p), _) => Some(clamp_probability(p)),
        (None, Some(stage)) => Some(crm_scoring::stage_probability(stage)),
        (None, None) => None,
    };
    let competitors = request
        .competitors
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let mut patch = Patch::new(now);
    patch
        .set_opt("name", request.name.clone())
        .set_opt("amount", request.amount)
        .set_opt("probability", probability)
        .set_opt("close_date", request.close_date)
        .set_opt("stage", request.stage.map(|s| s.as_str()))
        .set_opt("next_step", request.next_step.clone())
        .set_opt("competitors", competitors);
    patch.execute(&tx, "deals", id)?;

    let mut changes = Vec::new();
    if let Some(amount) = request.amount.filter(|a| *a != existing.amount) {
        changes.push(format!(
            "Amount: ${} → ${}",
            format_amount(existing.amount),
            format_amount(amount)
        ));
    }
    if let Some(stage) = stage_changed {
        changes.push(format!("Stage: {} → {}", existing.stage, stage));
    }
    if let Some(close_date) = request.close_date.filter(|d| *d != existing.close_date) {
        changes.push(format!(
            "Close date: {} → {}",
            format_date(existing.close_date),
            format_date(close_date)
        ));
    }
    if !changes.is_empty() {
        activities::insert_note(
            &tx,
            AuditNote {
                subject: "Deal Updated",
                description: format!("Deal changes: {}", changes.join(", ")),
                related_to: RelatedType::Deal,
                related_id: id,
                owner: &existing.owner,
            },
            now,
        )?;
    }

    let updated = fetch_deal(&tx, id)?.ok_or_else(|| CrmError::not_found("Deal"))?;
    tx.commit()?;

    Ok(updated)
}

pub async fn delete_deal(conn: AsyncDbConnection, id: i64) -> Result<(), CrmError> {
    let mut conn = conn.lock().await?;
    let tx = conn.transaction()?;

    if fetch_deal(&tx, id)?.is_none() {
        return Err(CrmError::not_found("Deal"));
    }
    let (activities, tasks) = delete_deal_tx(&tx, id)?;

    tx.commit()?;
    tracing::info!(
        "Deleted deal {} ({} activities, {} tasks removed)",
        id,
        activities,
        tasks
    );

    Ok(())
}

/// Fold engagement signals into the AI probability; returns the new value.
pub async fn update_ai_probability(
    conn: AsyncDbConnection,
    id: i64,
    signals: &UpdateAiProbabilityRequest,
) -> Result<i64, CrmError> {
    let conn = conn.lock().await?;
    let deal = fetch_deal(&conn, id)?.ok_or_else(|| CrmError::not_found("Deal"))?;

    let ai_probability =
        crm_scoring::refresh_win_probability(deal.ai_probability, deal.probability, signals);
    conn.execute(
        "UPDATE deals SET ai_probability = ?1, updated_at = ?2 WHERE id = ?3",
        params![ai_probability, now_millis(), id],
    )?;
    tracing::debug!(
        "Deal {} AI probability {:?} -> {}",
        id,
        deal.ai_probability,
        ai_probability
    );

    Ok(ai_probability)
}

pub async fn deals_summary(conn: AsyncDbConnection) -> Result<DealsSummary, CrmError> {
    let conn = conn.lock().await?;
    let deals = fetch_where(&conn, "", &[])?;

    let total_deals = deals.len() as i64;
    let total_value: f64 = deals.iter().map(|d| d.amount).sum();
    let won_deals = deals
        .iter()
        .filter(|d| d.stage == DealStage::ClosedWon)
        .count() as i64;
    let lost_deals = deals
        .iter()
        .filter(|d| d.stage == DealStage::ClosedLost)
        .count() as i64;
    let open_deals = total_deals - won_deals - lost_deals;

    let average_deal_size = if total_deals > 0 {
        total_value / total_deals as f64
    } else {
        0.0
    };
    let closed = won_deals + lost_deals;
    let win_rate = if closed > 0 {
        won_deals as f64 / closed as f64 * 100.0
    } else {
        0.0
    };

    Ok(DealsSummary {
        total_deals,
        total_value,
        open_deals,
        won_deals,
        lost_deals,
        average_deal_size,
        win_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::companies::{create_company, update_health_score};
    use crate::database::contacts::{create_contact, delete_contact};
    use crate::database::test_support::{
        company_request, contact_request, deal_request, test_database,
    };
    use shared_types::UpdateHealthScoreRequest;

    #[tokio::test]
    async fn test_create_requires_company_and_contact() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();

        let err = create_deal(conn.clone(), &deal_request("Orphan", 77))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Company not found");

        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        let mut request = deal_request("Ghost contact", company.id);
        request.contact_id = Some(404);
        let err = create_deal(conn.clone(), &request).await.unwrap_err();
        assert_eq!(err.to_string(), "Contact not found");

        let summary = deals_summary(conn).await.unwrap();
        assert_eq!(summary.total_deals, 0);
    }

    #[tokio::test]
    async fn test_create_scores_and_logs() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        update_health_score(
            conn.clone(),
            company.id,
            &UpdateHealthScoreRequest {
                deal_activity: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut request = deal_request("Acme platform", company.id);
        request.probability = 50;
        request.amount = 150_000.0;
        request.lead_source = Some("referral".to_string());
        let deal = create_deal(conn.clone(), &request).await.unwrap();

        // (50 + 90) / 2 * 0.9 * 1.2 = 75.6
        assert_eq!(deal.ai_probability, Some(76));
        assert!(deal.competitors.is_empty());

        let detail = get_deal_detail(conn, deal.id).await.unwrap();
        assert_eq!(detail.company.unwrap().name, "Acme");
        assert_eq!(
            detail.activities[0].description.as_deref(),
            Some("New deal created: Acme platform - $150,000")
        );
    }

    #[tokio::test]
    async fn test_probability_is_clamped_on_write() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        let mut request = deal_request("Overconfident", company.id);
        request.probability = 180;
        let deal = create_deal(conn.clone(), &request).await.unwrap();
        assert_eq!(deal.probability, 100);

        let updated = update_deal(
            conn,
            deal.id,
            &UpdateDealRequest {
                probability: Some(-5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.probability, 0);
    }

    #[tokio::test]
    async fn test_stage_moves_reset_probability() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        let deal = create_deal(conn.clone(), &deal_request("Pilot", company.id))
            .await
            .unwrap();

        let won = update_deal_stage(conn.clone(), deal.id, DealStage::ClosedWon)
            .await
            .unwrap();
        assert_eq!(won.probability, 100);

        // closed deals can be reopened
        let lost = update_deal_stage(conn.clone(), deal.id, DealStage::ClosedLost)
            .await
            .unwrap();
        assert_eq!(lost.probability, 0);

        let detail = get_deal_detail(conn, deal.id).await.unwrap();
        assert_eq!(
            detail.activities[0].description.as_deref(),
            Some("Deal moved to closed-lost stage")
        );
    }

    #[tokio::test]
    async fn test_closing_update_ignores_explicit_probability() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        let deal = create_deal(conn.clone(), &deal_request("Pilot", company.id))
            .await
            .unwrap();

        let won = update_deal(
            conn.clone(),
            deal.id,
            &UpdateDealRequest {
                stage: Some(DealStage::ClosedWon),
                probability: Some(40),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(won.stage, DealStage::ClosedWon);
        assert_eq!(won.probability, 100);

        let lost = update_deal(
            conn,
            deal.id,
            &UpdateDealRequest {
                stage: Some(DealStage::ClosedLost),
                probability: Some(90),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(lost.probability, 0);
    }

    #[tokio::test]
    async fn test_update_logs_changes() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        let deal = create_deal(conn.clone(), &deal_request("Pilot", company.id))
            .await
            .unwrap();

        let updated = update_deal(
            conn.clone(),
            deal.id,
            &UpdateDealRequest {
                amount: Some(30_000.0),
                stage: Some(DealStage::Negotiation),
                competitors: Some(vec!["Globex".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.stage, DealStage::Negotiation);
        assert_eq!(updated.probability, 75);
        assert_eq!(updated.competitors, vec!["Globex".to_string()]);

        let detail = get_deal_detail(conn.clone(), deal.id).await.unwrap();
        assert_eq!(
            detail.activities[0].description.as_deref(),
            Some("Deal changes: Amount: $25,000 → $30,000, Stage: prospecting → negotiation")
        );

        // explicit probability wins over the stage default
        let explicit = update_deal(
            conn.clone(),
            deal.id,
            &UpdateDealRequest {
                stage: Some(DealStage::Proposal),
                probability: Some(65),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(explicit.probability, 65);

        // next_step alone is not logged
        update_deal(
            conn.clone(),
            deal.id,
            &UpdateDealRequest {
                next_step: Some("Send MSA".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let detail = get_deal_detail(conn, deal.id).await.unwrap();
        assert_eq!(detail.activities.len(), 3);
    }

    #[tokio::test]
    async fn test_contact_delete_detaches_deal() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        let contact = create_contact(conn.clone(), &contact_request("a@acme.com", Some("Acme")), 0)
            .await
            .unwrap();
        let mut request = deal_request("Pilot", company.id);
        request.contact_id = Some(contact.id);
        let deal = create_deal(conn.clone(), &request).await.unwrap();

        delete_contact(conn.clone(), contact.id).await.unwrap();

        let deal = get_deal_detail(conn, deal.id).await.unwrap().deal;
        assert_eq!(deal.contact_id, None);
    }

    #[tokio::test]
    async fn test_delete_deal_removes_activities() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        let deal = create_deal(conn.clone(), &deal_request("Pilot", company.id))
            .await
            .unwrap();

        delete_deal(conn.clone(), deal.id).await.unwrap();

        let guard = conn.lock().await.unwrap();
        let remaining: i64 = guard
            .query_row(
                "SELECT COUNT(*) FROM activities WHERE related_to = 'deal'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
        drop(guard);

        let err = delete_deal(conn, deal.id).await.unwrap_err();
        assert!(matches!(err, CrmError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_by_stage_and_summary() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();

        let mut low = deal_request("Low", company.id);
        low.probability = 10;
        create_deal(conn.clone(), &low).await.unwrap();
        let mut high = deal_request("High", company.id);
        high.probability = 90;
        high.amount = 75_000.0;
        create_deal(conn.clone(), &high).await.unwrap();
        let won = create_deal(conn.clone(), &deal_request("Won", company.id))
            .await
            .unwrap();
        update_deal_stage(conn.clone(), won.id, DealStage::ClosedWon)
            .await
            .unwrap();

        let board = deals_by_stage(conn.clone()).await.unwrap();
        assert_eq!(board.stages.len(), DealStage::ALL.len());
        let prospecting: Vec<&str> = board.stages[&DealStage::Prospecting]
            .iter()
            .map(|d| d.deal.name.as_str())
            .collect();
        assert_eq!(prospecting, vec!["High", "Low"]);
        assert!(board.stages[&DealStage::Negotiation].is_empty());

        let summary = deals_summary(conn.clone()).await.unwrap();
        assert_eq!(summary.total_deals, 3);
        assert_eq!(summary.open_deals, 2);
        assert_eq!(summary.won_deals, 1);
        assert_eq!(summary.lost_deals, 0);
        assert_eq!(summary.total_value, 125_000.0);
        assert_eq!(summary.win_rate, 100.0);

        let filtered = list_deals(
            conn,
            &ListDealsQuery {
                search: Some("hig".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(filtered.total, 1);
        assert_eq!(filtered.deals[0].company.as_ref().unwrap().name, "Acme");
    }

    #[tokio::test]
    async fn test_ai_probability_refresh() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let company = create_company(conn.clone(), &company_request("Acme"))
            .await
            .unwrap();
        let mut request = deal_request("Pilot", company.id);
        request.probability = 40;
        let deal = create_deal(conn.clone(), &request).await.unwrap();
        // health 50 averaged with 40
        assert_eq!(deal.ai_probability, Some(45));

        let refreshed = update_ai_probability(
            conn,
            deal.id,
            &UpdateAiProbabilityRequest {
                recent_activities: Some(2),
                email_engagement: Some(1),
                competitor_count: Some(1),
            },
        )
        .await
        .unwrap();
        assert_eq!(refreshed, 45 + 10 + 3 - 5);
    }
}
