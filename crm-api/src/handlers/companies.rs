use actix_web::{web, HttpResponse};
use shared_types::{
    CreateCompanyRequest, ListCompaniesQuery, ScoreResponse, UpdateCompanyRequest,
    UpdateHealthScoreRequest,
};
use std::sync::Arc;

use crate::database::companies as db;
use crate::database::Database;
use crate::error::CrmError;

pub async fn list_companies(
    database: web::Data<Arc<Database>>,
    query: web::Query<ListCompaniesQuery>,
) -> Result<HttpResponse, CrmError> {
    let companies = db::list_companies(database.async_connection.clone(), &query).await?;
    Ok(HttpResponse::Ok().json(companies))
}

pub async fn get_company(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, CrmError> {
    let company =
        db::get_company_detail(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(company))
}

pub async fn create_company(
    database: web::Data<Arc<Database>>,
    request: web::Json<CreateCompanyRequest>,
) -> Result<HttpResponse, CrmError> {
    let company = db::create_company(database.async_connection.clone(), &request).await?;
    Ok(HttpResponse::Created().json(company))
}

pub async fn update_company(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateCompanyRequest>,
) -> Result<HttpResponse, CrmError> {
    let company =
        db::update_company(database.async_connection.clone(), path.into_inner(), &request).await?;
    Ok(HttpResponse::Ok().json(company))
}

pub async fn delete_company(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, CrmError> {
    db::delete_company(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn update_health_score(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateHealthScoreRequest>,
) -> Result<HttpResponse, CrmError> {
    let id = path.into_inner();
    let score = db::update_health_score(database.async_connection.clone(), id, &request).await?;
    Ok(HttpResponse::Ok().json(ScoreResponse { id, score }))
}
