use actix_web::{web, HttpResponse};
use rand::Rng;
use serde::Deserialize;
use shared_types::{
    BulkUpdateContactsRequest, ContactsResponse, CreateContactRequest, ListContactsQuery,
    ScoreResponse, UpdateAiScoreRequest, UpdateContactRequest, UpdatedIdsResponse,
};
use std::sync::Arc;

use crate::config::ScoringConfig;
use crate::database::contacts as db;
use crate::database::Database;
use crate::error::CrmError;

pub async fn list_contacts(
    database: web::Data<Arc<Database>>,
    query: web::Query<ListContactsQuery>,
) -> Result<HttpResponse, CrmError> {
    let contacts = db::list_contacts(database.async_connection.clone(), &query).await?;
    Ok(HttpResponse::Ok().json(contacts))
}

pub async fn get_contact(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, CrmError> {
    let contact =
        db::get_contact_detail(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(contact))
}

pub async fn create_contact(
    database: web::Data<Arc<Database>>,
    scoring: web::Data<ScoringConfig>,
    request: web::Json<CreateContactRequest>,
) -> Result<HttpResponse, CrmError> {
    let jitter = if scoring.lead_score_jitter {
        rand::thread_rng().gen_range(0..crm_scoring::lead::JITTER_RANGE)
    } else {
        0
    };

    let contact = db::create_contact(database.async_connection.clone(), &request, jitter).await?;
    Ok(HttpResponse::Created().json(contact))
}

pub async fn update_contact(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateContactRequest>,
) -> Result<HttpResponse, CrmError> {
    let contact =
        db::update_contact(database.async_connection.clone(), path.into_inner(), &request).await?;
    Ok(HttpResponse::Ok().json(contact))
}

pub async fn delete_contact(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, CrmError> {
    db::delete_contact(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn bulk_update_contacts(
    database: web::Data<Arc<Database>>,
    request: web::Json<BulkUpdateContactsRequest>,
) -> Result<HttpResponse, CrmError> {
    let ids = db::bulk_update_contacts(database.async_connection.clone(), &request).await?;
    Ok(HttpResponse::Ok().json(UpdatedIdsResponse { ids }))
}

pub async fn update_ai_score(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateAiScoreRequest>,
) -> Result<HttpResponse, CrmError> {
    let id = path.into_inner();
    let score = db::update_ai_score(database.async_connection.clone(), id, &request).await?;
    Ok(HttpResponse::Ok().json(ScoreResponse { id, score }))
}

#[derive(Deserialize)]
pub struct ByCompanyQuery {
    company_name: String,
}

pub async fn contacts_by_company(
    database: web::Data<Arc<Database>>,
    query: web::Query<ByCompanyQuery>,
) -> Result<HttpResponse, CrmError> {
    let contacts =
        db::contacts_by_company(database.async_connection.clone(), &query.company_name).await?;
    let total = contacts.len();
    Ok(HttpResponse::Ok().json(ContactsResponse {
        contacts,
        total,
        has_more: false,
    }))
}
