use shared_types::*;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate TypeScript definitions for API types
    let mut types = Vec::new();

    // User types
    types.push(clean_type(User::export_to_string()?));
    types.push(clean_type(UserRole::export_to_string()?));
    types.push(clean_type(UpsertUserRequest::export_to_string()?));
    types.push(clean_type(UpdateUserRoleRequest::export_to_string()?));
    types.push(clean_type(UsersResponse::export_to_string()?));

    // Permission types
    types.push(clean_type(Module::export_to_string()?));
    types.push(clean_type(Action::export_to_string()?));
    types.push(clean_type(RoleCapabilities::export_to_string()?));
    types.push(clean_type(PermissionCheckQuery::export_to_string()?));
    types.push(clean_type(PermissionCheckResponse::export_to_string()?));
    types.push(clean_type(UserPermissionsResponse::export_to_string()?));

    // Contact types
    types.push(clean_type(Contact::export_to_string()?));
    types.push(clean_type(ContactStatus::export_to_string()?));
    types.push(clean_type(ContactRating::export_to_string()?));
    types.push(clean_type(Sentiment::export_to_string()?));
    types.push(clean_type(CreateContactRequest::export_to_string()?));
    types.push(clean_type(UpdateContactRequest::export_to_string()?));
    types.push(clean_type(ContactBulkUpdates::export_to_string()?));
    types.push(clean_type(BulkUpdateContactsRequest::export_to_string()?));
    types.push(clean_type(UpdateAiScoreRequest::export_to_string()?));
    types.push(clean_type(ListContactsQuery::export_to_string()?));
    types.push(clean_type(ContactsResponse::export_to_string()?));
    types.push(clean_type(ContactDetail::export_to_string()?));

    // Company types
    types.push(clean_type(Company::export_to_string()?));
    types.push(clean_type(CompanyType::export_to_string()?));
    types.push(clean_type(PaymentHistory::export_to_string()?));
    types.push(clean_type(CreateCompanyRequest::export_to_string()?));
    types.push(clean_type(UpdateCompanyRequest::export_to_string()?));
    types.push(clean_type(UpdateHealthScoreRequest::export_to_string()?));
    types.push(clean_type(ListCompaniesQuery::export_to_string()?));
    types.push(clean_type(CompanySummary::export_to_string()?));
    types.push(clean_type(CompaniesResponse::export_to_string()?));
    types.push(clean_type(CompanyMetrics::export_to_string()?));
    types.push(clean_type(CompanyDetail::export_to_string()?));
    types.push(clean_type(ScoreResponse::export_to_string()?));

    // Deal types
    types.push(clean_type(Deal::export_to_string()?));
    types.push(clean_type(DealStage::export_to_string()?));
    types.push(clean_type(DealType::export_to_string()?));
    types.push(clean_type(CreateDealRequest::export_to_string()?));
    types.push(clean_type(UpdateDealRequest::export_to_string()?));
    types.push(clean_type(UpdateDealStageRequest::export_to_string()?));
    types.push(clean_type(UpdateAiProbabilityRequest::export_to_string()?));
    types.push(clean_type(ListDealsQuery::export_to_string()?));
    types.push(clean_type(DealWithRelations::export_to_string()?));
    types.push(clean_type(DealsResponse::export_to_string()?));
    types.push(clean_type(DealsByStageResponse::export_to_string()?));
    types.push(clean_type(DealDetail::export_to_string()?));
    types.push(clean_type(DealsSummary::export_to_string()?));

    // Task types
    types.push(clean_type(Task::export_to_string()?));
    types.push(clean_type(TaskStatus::export_to_string()?));
    types.push(clean_type(TaskPriority::export_to_string()?));
    types.push(clean_type(CreateTaskRequest::export_to_string()?));
    types.push(clean_type(UpdateTaskRequest::export_to_string()?));
    types.push(clean_type(UpdateTaskStatusRequest::export_to_string()?));
    types.push(clean_type(TaskBulkUpdates::export_to_string()?));
    types.push(clean_type(BulkUpdateTasksRequest::export_to_string()?));
    types.push(clean_type(ListTasksQuery::export_to_string()?));
    types.push(clean_type(TaskWithRelated::export_to_string()?));
    types.push(clean_type(TasksResponse::export_to_string()?));
    types.push(clean_type(TaskSuggestion::export_to_string()?));
    types.push(clean_type(TaskSuggestionsQuery::export_to_string()?));
    types.push(clean_type(TaskSuggestionsResponse::export_to_string()?));
    types.push(clean_type(TasksSummary::export_to_string()?));

    // Activity types
    types.push(clean_type(Activity::export_to_string()?));
    types.push(clean_type(ActivityType::export_to_string()?));
    types.push(clean_type(RelatedType::export_to_string()?));
    types.push(clean_type(RelatedEntity::export_to_string()?));
    types.push(clean_type(CreateActivityRequest::export_to_string()?));
    types.push(clean_type(ListActivitiesQuery::export_to_string()?));
    types.push(clean_type(ActivitiesResponse::export_to_string()?));

    // Shared
    types.push(clean_type(UpdatedIdsResponse::export_to_string()?));

    let output_dir = Path::new("../web/src/api-types");
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    // Check if the type definition includes imports (like Deal which imports DealStage)
    let lines: Vec<&str> = type_def.lines().collect();
    let has_import = lines
        .iter()
        .any(|line| line.trim().starts_with("import type"));

    let filtered: Vec<&str> = lines
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            // Keep import lines if they're part of a type definition (Deal imports DealStage)
            if trimmed.starts_with("import type") {
                return has_import;
            }
            // Filter out the generated comment line
            !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .cloned()
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
