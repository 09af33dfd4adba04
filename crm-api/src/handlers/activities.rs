use actix_web::{web, HttpResponse};
use shared_types::{ActivitiesResponse, CreateActivityRequest, ListActivitiesQuery};
use std::sync::Arc;

use crate::database::activities as db;
use crate::database::Database;
use crate::error::CrmError;

pub async fn list_activities(
    database: web::Data<Arc<Database>>,
    query: web::Query<ListActivitiesQuery>,
) -> Result<HttpResponse, CrmError> {
    let activities = db::list_activities(database.async_connection.clone(), &query).await?;
    Ok(HttpResponse::Ok().json(ActivitiesResponse { activities }))
}

pub async fn get_activity(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, CrmError> {
    let activity = db::get_activity(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(activity))
}

pub async fn create_activity(
    database: web::Data<Arc<Database>>,
    request: web::Json<CreateActivityRequest>,
) -> Result<HttpResponse, CrmError> {
    let activity = db::create_activity(database.async_connection.clone(), &request).await?;
    Ok(HttpResponse::Created().json(activity))
}
