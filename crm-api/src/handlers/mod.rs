pub mod activities;
pub mod companies;
pub mod contacts;
pub mod deals;
pub mod permissions;
pub mod tasks;
pub mod users;

use actix_web::{get, web, HttpResponse, Responder};
use std::sync::Arc;

use crate::database::Database;

#[get("/health")]
async fn health(db: web::Data<Arc<Database>>) -> impl Responder {
    match db.ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "database": "connected"
        })),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "database": "disconnected"
            }))
        }
    }
}

/// Register every route. Fixed paths come before `{id}` paths sharing a prefix.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .route("/api/users/sync", web::post().to(users::sync_user))
        .route("/api/users", web::get().to(users::list_users))
        .route("/api/users/external/{external_id}", web::get().to(users::get_user_by_external_id))
        .route("/api/users/{id}", web::get().to(users::get_user))
        .route("/api/users/{id}/role", web::put().to(users::update_user_role))
        .route("/api/permissions/check", web::get().to(permissions::check_permission))
        .route("/api/permissions/{external_id}", web::get().to(permissions::get_user_permissions))
        .route("/api/contacts", web::get().to(contacts::list_contacts))
        .route("/api/contacts", web::post().to(contacts::create_contact))
        .route("/api/contacts/by-company", web::get().to(contacts::contacts_by_company))
        .route("/api/contacts/bulk", web::put().to(contacts::bulk_update_contacts))
        .route("/api/contacts/{id}", web::get().to(contacts::get_contact))
        .route("/api/contacts/{id}", web::put().to(contacts::update_contact))
        .route("/api/contacts/{id}", web::delete().to(contacts::delete_contact))
        .route("/api/contacts/{id}/ai-score", web::post().to(contacts::update_ai_score))
        .route("/api/companies", web::get().to(companies::list_companies))
        .route("/api/companies", web::post().to(companies::create_company))
        .route("/api/companies/{id}", web::get().to(companies::get_company))
        .route("/api/companies/{id}", web::put().to(companies::update_company))
        .route("/api/companies/{id}", web::delete().to(companies::delete_company))
        .route("/api/companies/{id}/health-score", web::post().to(companies::update_health_score))
        .route("/api/deals", web::get().to(deals::list_deals))
        .route("/api/deals", web::post().to(deals::create_deal))
        .route("/api/deals/by-stage", web::get().to(deals::deals_by_stage))
        .route("/api/deals/summary", web::get().to(deals::deals_summary))
        .route("/api/deals/{id}", web::get().to(deals::get_deal))
        .route("/api/deals/{id}", web::put().to(deals::update_deal))
        .route("/api/deals/{id}", web::delete().to(deals::delete_deal))
        .route("/api/deals/{id}/stage", web::put().to(deals::update_deal_stage))
        .route("/api/deals/{id}/ai-probability", web::post().to(deals::update_ai_probability))
        .route("/api/tasks", web::get().to(tasks::list_tasks))
        .route("/api/tasks", web::post().to(tasks::create_task))
        .route("/api/tasks/bulk", web::put().to(tasks::bulk_update_tasks))
        .route("/api/tasks/suggestions", web::get().to(tasks::task_suggestions))
        .route("/api/tasks/summary", web::get().to(tasks::tasks_summary))
        .route("/api/tasks/by-user/{user}", web::get().to(tasks::tasks_by_user))
        .route("/api/tasks/{id}", web::get().to(tasks::get_task))
        .route("/api/tasks/{id}", web::put().to(tasks::update_task))
        .route("/api/tasks/{id}", web::delete().to(tasks::delete_task))
        .route("/api/tasks/{id}/status", web::put().to(tasks::update_task_status))
        .route("/api/activities", web::get().to(activities::list_activities))
        .route("/api/activities", web::post().to(activities::create_activity))
        .route("/api/activities/{id}", web::get().to(activities::get_activity));
}
