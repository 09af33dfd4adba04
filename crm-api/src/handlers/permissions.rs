use actix_web::{web, HttpResponse};
use shared_types::permission::{has_permission, role_permissions};
use shared_types::{
    Action, Module, PermissionCheckQuery, PermissionCheckResponse, RoleCapabilities,
    UserPermissionsResponse,
};
use std::sync::Arc;

use crate::database::users as db;
use crate::database::Database;
use crate::error::CrmError;

/// Unknown or deactivated users are never allowed anything.
pub async fn check_permission(
    database: web::Data<Arc<Database>>,
    query: web::Query<PermissionCheckQuery>,
) -> Result<HttpResponse, CrmError> {
    let module: Module = query.module.parse()?;
    let action: Action = query.action.parse()?;

    let user = db::get_user_by_external_id(database.async_connection.clone(), &query.external_id)
        .await?;
    let allowed = user
        .filter(|u| u.is_active)
        .is_some_and(|u| has_permission(u.role, module, action));

    Ok(HttpResponse::Ok().json(PermissionCheckResponse { allowed }))
}

/// Deactivated users resolve to 404 like unknown ones.
pub async fn get_user_permissions(
    database: web::Data<Arc<Database>>,
    path: web::Path<String>,
) -> Result<HttpResponse, CrmError> {
    let user = db::get_user_by_external_id(database.async_connection.clone(), &path.into_inner())
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| CrmError::not_found("User"))?;

    Ok(HttpResponse::Ok().json(UserPermissionsResponse {
        permissions: role_permissions(user.role),
        capabilities: RoleCapabilities::for_role(user.role),
        user,
    }))
}
