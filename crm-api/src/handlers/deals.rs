use actix_web::{web, HttpResponse};
use shared_types::{
    CreateDealRequest, ListDealsQuery, ScoreResponse, UpdateAiProbabilityRequest,
    UpdateDealRequest, UpdateDealStageRequest,
};
use std::sync::Arc;

use crate::database::deals as db;
use crate::database::Database;
use crate::error::CrmError;

pub async fn list_deals(
    database: web::Data<Arc<Database>>,
    query: web::Query<ListDealsQuery>,
) -> Result<HttpResponse, CrmError> {
    let deals = db::list_deals(database.async_connection.clone(), &query).await?;
    Ok(HttpResponse::Ok().json(deals))
}

pub async fn deals_by_stage(database: web::Data<Arc<Database>>) -> Result<HttpResponse, CrmError> {
    let board = db::deals_by_stage(database.async_connection.clone()).await?;
    Ok(HttpResponse::Ok().json(board))
}

pub async fn deals_summary(database: web::Data<Arc<Database>>) -> Result<HttpResponse, CrmError> {
    let summary = db::deals_summary(database.async_connection.clone()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub async fn get_deal(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, CrmError> {
    let deal = db::get_deal_detail(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(deal))
}

pub async fn create_deal(
    database: web::Data<Arc<Database>>,
    request: web::Json<CreateDealRequest>,
) -> Result<HttpResponse, CrmError> {
    let deal = db::create_deal(database.async_connection.clone(), &request).await?;
    Ok(HttpResponse::Created().json(deal))
}

pub async fn update_deal_stage(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateDealStageRequest>,
) -> Result<HttpResponse, CrmError> {
    let deal =
        db::update_deal_stage(database.async_connection.clone(), path.into_inner(), request.stage)
            .await?;
    Ok(HttpResponse::Ok().json(deal))
}

pub async fn update_deal(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateDealRequest>,
) -> Result<HttpResponse, CrmError> {
    let deal = db::update_deal(database.async_connection.clone(), path.into_inner(), &request).await?;
    Ok(HttpResponse::Ok().json(deal))
}

pub async fn delete_deal(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, CrmError> {
    db::delete_deal(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn update_ai_probability(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateAiProbabilityRequest>,
) -> Result<HttpResponse, CrmError> {
    let id = path.into_inner();
    let score = db::update_ai_probability(database.async_connection.clone(), id, &request).await?;
    Ok(HttpResponse::Ok().json(ScoreResponse { id, score }))
}
