use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::{Company, Contact, Deal, ParseEnumError};

/// Kind of record a task or activity points at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum RelatedType {
    Contact,
    Company,
    Deal,
}

impl RelatedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelatedType::Contact => "contact",
            RelatedType::Company => "company",
            RelatedType::Deal => "deal",
        }
    }
}

impl std::fmt::Display for RelatedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RelatedType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contact" => Ok(RelatedType::Contact),
            "company" => Ok(RelatedType::Company),
            "deal" => Ok(RelatedType::Deal),
            other => Err(ParseEnumError::new("related type", other)),
        }
    }
}

/// A resolved polymorphic reference
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum RelatedEntity {
    Contact(Contact),
    Company(Company),
    Deal(Deal),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Call,
    Email,
    Meeting,
    Note,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Call => "call",
            ActivityType::Email => "email",
            ActivityType::Meeting => "meeting",
            ActivityType::Note => "note",
        }
    }
}

impl FromStr for ActivityType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "call" => Ok(ActivityType::Call),
            "email" => Ok(ActivityType::Email),
            "meeting" => Ok(ActivityType::Meeting),
            "note" => Ok(ActivityType::Note),
            other => Err(ParseEnumError::new("activity type", other)),
        }
    }
}

/// Audit-trail entry attached to a contact, company or deal
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Activity {
    pub id: i64,
    pub activity_type: ActivityType,
    pub subject: String,
    pub description: Option<String>,
    /// Minutes
    pub duration: Option<i64>,
    pub outcome: Option<String>,
    pub related_to: RelatedType,
    pub related_id: i64,
    pub owner: String,
    pub ai_summary: Option<String>,
    pub sentiment: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateActivityRequest {
    pub activity_type: ActivityType,
    pub subject: String,
    pub description: Option<String>,
    pub duration: Option<i64>,
    pub outcome: Option<String>,
    pub related_to: String,
    pub related_id: i64,
    pub owner: String,
    pub sentiment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ListActivitiesQuery {
    pub related_to: Option<String>,
    pub related_id: Option<i64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ActivitiesResponse {
    pub activities: Vec<Activity>,
}
