use actix_web::{web, HttpResponse};
use shared_types::{UpdateUserRoleRequest, UpsertUserRequest, UsersResponse};
use std::sync::Arc;

use crate::database::users as db;
use crate::database::Database;
use crate::error::CrmError;

pub async fn sync_user(
    database: web::Data<Arc<Database>>,
    request: web::Json<UpsertUserRequest>,
) -> Result<HttpResponse, CrmError> {
    let user = db::upsert_user(database.async_connection.clone(), &request).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn list_users(database: web::Data<Arc<Database>>) -> Result<HttpResponse, CrmError> {
    let users = db::list_users(database.async_connection.clone()).await?;
    Ok(HttpResponse::Ok().json(UsersResponse { users }))
}

pub async fn get_user(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, CrmError> {
    let user = db::get_user(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Current user by identity-provider subject; `null` before the first sync.
pub async fn get_user_by_external_id(
    database: web::Data<Arc<Database>>,
    path: web::Path<String>,
) -> Result<HttpResponse, CrmError> {
    let user =
        db::get_user_by_external_id(database.async_connection.clone(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn update_user_role(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateUserRoleRequest>,
) -> Result<HttpResponse, CrmError> {
    let user = db::update_user_role(
        database.async_connection.clone(),
        path.into_inner(),
        &request.acting_external_id,
        request.role,
    )
    .await?;
    Ok(HttpResponse::Ok().json(user))
}
