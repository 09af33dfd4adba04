use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::ParseEnumError;

/// Role assigned to a CRM user. New users start as `Sales`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash, Default)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Owner,
    Admin,
    Manager,
    #[default]
    Sales,
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Sales => "sales",
            UserRole::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(UserRole::Owner),
            "admin" => Ok(UserRole::Admin),
            "manager" => Ok(UserRole::Manager),
            "sales" => Ok(UserRole::Sales),
            "viewer" => Ok(UserRole::Viewer),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: i64,
    /// Subject id issued by the external identity provider
    pub external_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub image_url: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Profile pushed by the identity sync on sign-in
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpsertUserRequest {
    pub external_id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub image_url: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateUserRoleRequest {
    /// External id of the user performing the change
    pub acting_external_id: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [
            UserRole::Owner,
            UserRole::Admin,
            UserRole::Manager,
            UserRole::Sales,
            UserRole::Viewer,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let err = "superuser".parse::<UserRole>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported role: superuser");
    }

    #[test]
    fn test_upsert_defaults_role_to_none() {
        let req: UpsertUserRequest = serde_json::from_str(
            r#"{"external_id":"user_1","email":"a@b.com","first_name":"Ada"}"#,
        )
        .unwrap();
        assert!(req.role.is_none());
        assert_eq!(req.last_name, "");
    }
}
