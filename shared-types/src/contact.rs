use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::{Activity, Deal, ParseEnumError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Default)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Unqualified,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::Contacted => "contacted",
            ContactStatus::Qualified => "qualified",
            ContactStatus::Unqualified => "unqualified",
        }
    }
}

impl FromStr for ContactStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ContactStatus::New),
            "contacted" => Ok(ContactStatus::Contacted),
            "qualified" => Ok(ContactStatus::Qualified),
            "unqualified" => Ok(ContactStatus::Unqualified),
            other => Err(ParseEnumError::new("contact status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Default)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ContactRating {
    Hot,
    Warm,
    #[default]
    Cold,
}

impl ContactRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactRating::Hot => "hot",
            ContactRating::Warm => "warm",
            ContactRating::Cold => "cold",
        }
    }
}

impl FromStr for ContactRating {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(ContactRating::Hot),
            "warm" => Ok(ContactRating::Warm),
            "cold" => Ok(ContactRating::Cold),
            other => Err(ParseEnumError::new("contact rating", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Default)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl FromStr for Sentiment {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            other => Err(ParseEnumError::new("sentiment", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Contact {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub notes: Option<String>,
    pub phone: Option<String>,
    /// Display name of the linked company
    pub company: Option<String>,
    pub title: Option<String>,
    pub lead_source: Option<String>,
    pub status: ContactStatus,
    pub rating: ContactRating,
    pub owner: String,
    pub ai_score: Option<i64>,
    pub sentiment: Option<Sentiment>,
    pub last_activity: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateContactRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub lead_source: Option<String>,
    pub status: Option<ContactStatus>,
    pub rating: Option<ContactRating>,
    pub owner: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateContactRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub status: Option<ContactStatus>,
    pub rating: Option<ContactRating>,
    pub owner: Option<String>,
    pub notes: Option<String>,
}

impl UpdateContactRequest {
    /// Names of the supplied fields, excluding `notes`
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.first_name.is_some() {
            fields.push("first_name");
        }
        if self.last_name.is_some() {
            fields.push("last_name");
        }
        if self.email.is_some() {
            fields.push("email");
        }
        if self.phone.is_some() {
            fields.push("phone");
        }
        if self.company.is_some() {
            fields.push("company");
        }
        if self.title.is_some() {
            fields.push("title");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.rating.is_some() {
            fields.push("rating");
        }
        if self.owner.is_some() {
            fields.push("owner");
        }
        fields
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ContactBulkUpdates {
    pub status: Option<ContactStatus>,
    pub rating: Option<ContactRating>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BulkUpdateContactsRequest {
    pub ids: Vec<i64>,
    pub updates: ContactBulkUpdates,
}

/// Engagement signals folded into a contact's AI score
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateAiScoreRequest {
    pub interactions: Option<i64>,
    pub email_opens: Option<i64>,
    pub website_visits: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ListContactsQuery {
    pub search: Option<String>,
    pub status: Option<ContactStatus>,
    pub sentiment: Option<Sentiment>,
    pub owner: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ContactsResponse {
    pub contacts: Vec<Contact>,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ContactDetail {
    #[serde(flatten)]
    pub contact: Contact,
    pub activities: Vec<Activity>,
    pub deals: Vec<Deal>,
}
