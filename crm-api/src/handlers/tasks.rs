use actix_web::{web, HttpResponse};
use serde::Deserialize;
use shared_types::{
    BulkUpdateTasksRequest, CreateTaskRequest, ListTasksQuery, TaskSuggestionsQuery,
    TaskSuggestionsResponse, UpdateTaskRequest, UpdateTaskStatusRequest, UpdatedIdsResponse,
};
use std::sync::Arc;

use crate::database::tasks as db;
use crate::database::Database;
use crate::error::CrmError;

pub async fn list_tasks(
    database: web::Data<Arc<Database>>,
    query: web::Query<ListTasksQuery>,
) -> Result<HttpResponse, CrmError> {
    let tasks = db::list_tasks(database.async_connection.clone(), &query).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

pub async fn tasks_by_user(
    database: web::Data<Arc<Database>>,
    path: web::Path<String>,
) -> Result<HttpResponse, CrmError> {
    let tasks = db::tasks_by_user(database.async_connection.clone(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

pub async fn get_task(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, CrmError> {
    let task = db::get_task(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

pub async fn create_task(
    database: web::Data<Arc<Database>>,
    request: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, CrmError> {
    let task = db::create_task(database.async_connection.clone(), &request).await?;
    Ok(HttpResponse::Created().json(task))
}

pub async fn update_task_status(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateTaskStatusRequest>,
) -> Result<HttpResponse, CrmError> {
    let task =
        db::update_task_status(database.async_connection.clone(), path.into_inner(), request.status)
            .await?;
    Ok(HttpResponse::Ok().json(task))
}

pub async fn update_task(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, CrmError> {
    let task = db::update_task(database.async_connection.clone(), path.into_inner(), &request).await?;
    Ok(HttpResponse::Ok().json(task))
}

pub async fn delete_task(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, CrmError> {
    db::delete_task(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn bulk_update_tasks(
    database: web::Data<Arc<Database>>,
    request: web::Json<BulkUpdateTasksRequest>,
) -> Result<HttpResponse, CrmError> {
    let ids = db::bulk_update_tasks(database.async_connection.clone(), &request).await?;
    Ok(HttpResponse::Ok().json(UpdatedIdsResponse { ids }))
}

pub async fn task_suggestions(
    database: web::Data<Arc<Database>>,
    query: web::Query<TaskSuggestionsQuery>,
) -> Result<HttpResponse, CrmError> {
    let suggestions =
        db::suggest_tasks(database.async_connection.clone(), query.related_to, query.related_id)
            .await?;
    Ok(HttpResponse::Ok().json(TaskSuggestionsResponse { suggestions }))
}

#[derive(Deserialize)]
pub struct SummaryQuery {
    user_id: Option<String>,
}

pub async fn tasks_summary(
    database: web::Data<Arc<Database>>,
    query: web::Query<SummaryQuery>,
) -> Result<HttpResponse, CrmError> {
    let summary =
        db::tasks_summary(database.async_connection.clone(), query.user_id.as_deref()).await?;
    Ok(HttpResponse::Ok().json(summary))
}
