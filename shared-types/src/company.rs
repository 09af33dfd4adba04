use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::{Activity, Contact, Deal, ParseEnumError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CompanyType {
    Customer,
    Prospect,
    Partner,
}

impl CompanyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyType::Customer => "customer",
            CompanyType::Prospect => "prospect",
            CompanyType::Partner => "partner",
        }
    }
}

impl FromStr for CompanyType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(CompanyType::Customer),
            "prospect" => Ok(CompanyType::Prospect),
            "partner" => Ok(CompanyType::Partner),
            other => Err(ParseEnumError::new("company type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentHistory {
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub employees: Option<i64>,
    pub annual_revenue: Option<f64>,
    pub company_type: CompanyType,
    pub health_score: Option<i64>,
    pub owner: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub employees: Option<i64>,
    pub annual_revenue: Option<f64>,
    pub company_type: CompanyType,
    pub owner: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub employees: Option<i64>,
    pub annual_revenue: Option<f64>,
    pub company_type: Option<CompanyType>,
    pub owner: Option<String>,
}

/// Engagement signals folded into a company's health score
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateHealthScoreRequest {
    pub deal_activity: Option<i64>,
    pub communication_frequency: Option<i64>,
    pub payment_history: Option<PaymentHistory>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ListCompaniesQuery {
    pub search: Option<String>,
    pub company_type: Option<CompanyType>,
    pub industry: Option<String>,
    pub owner: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// List row: a company plus counters derived from its contacts and open deals
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct CompanySummary {
    #[serde(flatten)]
    pub company: Company,
    pub contact_count: i64,
    pub active_deal_count: i64,
    pub total_deal_value: f64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct CompaniesResponse {
    pub companies: Vec<CompanySummary>,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct CompanyMetrics {
    /// Sum of closed-won deal amounts
    pub total_revenue: f64,
    /// Sum of open deal amounts
    pub pipeline_value: f64,
    pub active_deals: i64,
    pub won_deals: i64,
    pub contact_count: i64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    pub contacts: Vec<Contact>,
    pub deals: Vec<Deal>,
    pub activities: Vec<Activity>,
    pub metrics: CompanyMetrics,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ScoreResponse {
    pub id: i64,
    pub score: i64,
}
