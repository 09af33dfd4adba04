//! Static role → module → action permission matrix.
//!
//! The matrix is consulted by UI guards and by the permission endpoints.
//! Record mutations are not gated by it server-side; role changes are gated
//! by [`RoleCapabilities`] instead.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use ts_rs::TS;

use crate::{ParseEnumError, User, UserRole};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Dashboard,
    Contacts,
    Companies,
    Deals,
    Tasks,
    Reports,
    Settings,
    Team,
    Billing,
    AiFeatures,
}

impl Module {
    pub const ALL: [Module; 10] = [
        Module::Dashboard,
        Module::Contacts,
        Module::Companies,
        Module::Deals,
        Module::Tasks,
        Module::Reports,
        Module::Settings,
        Module::Team,
        Module::Billing,
        Module::AiFeatures,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Dashboard => "dashboard",
            Module::Contacts => "contacts",
            Module::Companies => "companies",
            Module::Deals => "deals",
            Module::Tasks => "tasks",
            Module::Reports => "reports",
            Module::Settings => "settings",
            Module::Team => "team",
            Module::Billing => "billing",
            Module::AiFeatures => "ai_features",
        }
    }
}

impl FromStr for Module {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("module", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Export,
    Manage,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Export => "export",
            Action::Manage => "manage",
        }
    }
}

impl FromStr for Action {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Action::View),
            "create" => Ok(Action::Create),
            "edit" => Ok(Action::Edit),
            "delete" => Ok(Action::Delete),
            "export" => Ok(Action::Export),
            "manage" => Ok(Action::Manage),
            other => Err(ParseEnumError::new("action", other)),
        }
    }
}

use Action::*;

const RECORD_FULL: &[Action] = &[View, Create, Edit, Delete, Export];
const RECORD_NO_DELETE: &[Action] = &[View, Create, Edit, Export];
const TASKS_FULL: &[Action] = &[View, Create, Edit, Delete];
const VIEW_CREATE_EDIT: &[Action] = &[View, Create, Edit];
const REPORTS_FULL: &[Action] = &[View, Create, Export];
const VIEW_EXPORT: &[Action] = &[View, Export];
const VIEW_MANAGE: &[Action] = &[View, Manage];
const TEAM_FULL: &[Action] = &[View, Create, Edit, Delete, Manage];
const VIEW_ONLY: &[Action] = &[View];
const NONE: &[Action] = &[];

/// Actions `role` may perform on `module`.
pub fn allowed_actions(role: UserRole, module: Module) -> &'static [Action] {
    match (role, module) {
        (UserRole::Owner | UserRole::Admin, Module::Dashboard) => VIEW_EXPORT,
        (UserRole::Owner | UserRole::Admin, Module::Contacts | Module::Companies | Module::Deals) => {
            RECORD_FULL
        }
        (UserRole::Owner | UserRole::Admin, Module::Tasks) => TASKS_FULL,
        (UserRole::Owner | UserRole::Admin, Module::Reports) => REPORTS_FULL,
        (UserRole::Owner | UserRole::Admin, Module::Settings) => VIEW_MANAGE,
        (UserRole::Owner | UserRole::Admin, Module::Team) => TEAM_FULL,
        (UserRole::Owner, Module::Billing) => VIEW_MANAGE,
        (UserRole::Admin, Module::Billing) => VIEW_ONLY,
        (UserRole::Owner | UserRole::Admin, Module::AiFeatures) => VIEW_MANAGE,

        (UserRole::Manager, Module::Dashboard) => VIEW_EXPORT,
        (UserRole::Manager, Module::Contacts | Module::Companies | Module::Deals) => {
            RECORD_NO_DELETE
        }
        (UserRole::Manager, Module::Tasks) => VIEW_CREATE_EDIT,
        (UserRole::Manager, Module::Reports) => REPORTS_FULL,
        (UserRole::Manager, Module::Settings | Module::Team | Module::AiFeatures) => VIEW_ONLY,
        (UserRole::Manager, Module::Billing) => NONE,

        (UserRole::Sales, Module::Dashboard | Module::Reports | Module::AiFeatures) => VIEW_ONLY,
        (
            UserRole::Sales,
            Module::Contacts | Module::Companies | Module::Deals | Module::Tasks,
        ) => VIEW_CREATE_EDIT,
        (UserRole::Sales, Module::Settings | Module::Team | Module::Billing) => NONE,

        (UserRole::Viewer, Module::Settings | Module::Team | Module::Billing | Module::AiFeatures) => {
            NONE
        }
        (UserRole::Viewer, _) => VIEW_ONLY,
    }
}

pub fn has_permission(role: UserRole, module: Module, action: Action) -> bool {
    allowed_actions(role, module).contains(&action)
}

/// Full matrix row for a role, keyed by module.
pub fn role_permissions(role: UserRole) -> BTreeMap<Module, Vec<Action>> {
    Module::ALL
        .into_iter()
        .map(|module| (module, allowed_actions(role, module).to_vec()))
        .collect()
}

/// Coarse capabilities used for user administration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
pub struct RoleCapabilities {
    pub can_manage_users: bool,
    pub can_manage_billing: bool,
    pub can_view_all_data: bool,
    pub can_edit_all_data: bool,
    pub can_delete_data: bool,
    pub can_manage_settings: bool,
    pub can_export_data: bool,
}

impl RoleCapabilities {
    pub fn for_role(role: UserRole) -> Self {
        match role {
            UserRole::Owner => Self {
                can_manage_users: true,
                can_manage_billing: true,
                can_view_all_data: true,
                can_edit_all_data: true,
                can_delete_data: true,
                can_manage_settings: true,
                can_export_data: true,
            },
            UserRole::Admin => Self {
                can_manage_users: true,
                can_manage_billing: false,
                can_view_all_data: true,
                can_edit_all_data: true,
                can_delete_data: true,
                can_manage_settings: true,
                can_export_data: true,
            },
            UserRole::Manager => Self {
                can_manage_users: false,
                can_manage_billing: false,
                can_view_all_data: true,
                can_edit_all_data: true,
                can_delete_data: false,
                can_manage_settings: false,
                can_export_data: true,
            },
            UserRole::Sales | UserRole::Viewer => Self {
                can_manage_users: false,
                can_manage_billing: false,
                can_view_all_data: false,
                can_edit_all_data: false,
                can_delete_data: false,
                can_manage_settings: false,
                can_export_data: false,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PermissionCheckQuery {
    pub external_id: String,
    pub module: String,
    pub action: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct PermissionCheckResponse {
    pub allowed: bool,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct UserPermissionsResponse {
    pub user: User,
    pub permissions: BTreeMap<Module, Vec<Action>>,
    pub capabilities: RoleCapabilities,
}
