use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use ts_rs::TS;

use crate::{Activity, Company, Contact, ParseEnumError, Task};

/// Pipeline position of a deal. Any stage may move to any other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum DealStage {
    Prospecting,
    Qualification,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl DealStage {
    pub const ALL: [DealStage; 6] = [
        DealStage::Prospecting,
        DealStage::Qualification,
        DealStage::Proposal,
        DealStage::Negotiation,
        DealStage::ClosedWon,
        DealStage::ClosedLost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStage::Prospecting => "prospecting",
            DealStage::Qualification => "qualification",
            DealStage::Proposal => "proposal",
            DealStage::Negotiation => "negotiation",
            DealStage::ClosedWon => "closed-won",
            DealStage::ClosedLost => "closed-lost",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, DealStage::ClosedWon | DealStage::ClosedLost)
    }
}

impl std::fmt::Display for DealStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DealStage {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DealStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("deal stage", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DealType {
    New,
    Renewal,
    Expansion,
    Upsell,
}

impl DealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealType::New => "new",
            DealType::Renewal => "renewal",
            DealType::Expansion => "expansion",
            DealType::Upsell => "upsell",
        }
    }
}

impl FromStr for DealType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(DealType::New),
            "renewal" => Ok(DealType::Renewal),
            "expansion" => Ok(DealType::Expansion),
            "upsell" => Ok(DealType::Upsell),
            other => Err(ParseEnumError::new("deal type", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Deal {
    pub id: i64,
    pub name: String,
    pub company_id: i64,
    pub contact_id: Option<i64>,
    pub stage: DealStage,
    pub amount: f64,
    /// User-entered win probability
    pub probability: i64,
    /// Heuristic win probability
    pub ai_probability: Option<i64>,
    pub close_date: i64,
    pub deal_type: DealType,
    pub lead_source: Option<String>,
    pub owner: String,
    pub next_step: Option<String>,
    pub competitors: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateDealRequest {
    pub name: String,
    pub company_id: i64,
    pub contact_id: Option<i64>,
    pub stage: DealStage,
    pub amount: f64,
    pub probability: i64,
    pub close_date: i64,
    pub deal_type: DealType,
    pub owner: String,
    pub lead_source: Option<String>,
    pub next_step: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateDealRequest {
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub probability: Option<i64>,
    pub close_date: Option<i64>,
    pub stage: Option<DealStage>,
    pub next_step: Option<String>,
    pub competitors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateDealStageRequest {
    pub stage: DealStage,
}

/// Signals folded into a deal's AI probability
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateAiProbabilityRequest {
    pub recent_activities: Option<i64>,
    pub email_engagement: Option<i64>,
    pub competitor_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ListDealsQuery {
    pub search: Option<String>,
    pub stage: Option<DealStage>,
    pub owner: Option<String>,
    pub company_id: Option<i64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct DealWithRelations {
    #[serde(flatten)]
    pub deal: Deal,
    pub company: Option<Company>,
    pub contact: Option<Contact>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct DealsResponse {
    pub deals: Vec<DealWithRelations>,
    pub total: usize,
    pub has_more: bool,
}

/// Kanban columns, each sorted by AI probability (highest first)
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct DealsByStageResponse {
    pub stages: BTreeMap<DealStage, Vec<DealWithRelations>>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct DealDetail {
    #[serde(flatten)]
    pub deal: Deal,
    pub company: Option<Company>,
    pub contact: Option<Contact>,
    pub activities: Vec<Activity>,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, TS, PartialEq)]
#[ts(export)]
pub struct DealsSummary {
    pub total_deals: i64,
    pub total_value: f64,
    pub open_deals: i64,
    pub won_deals: i64,
    pub lost_deals: i64,
    pub average_deal_size: f64,
    /// Percentage of closed deals that were won
    pub win_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_uses_kebab_case_on_the_wire() {
        let json = serde_json::to_string(&DealStage::ClosedWon).unwrap();
        assert_eq!(json, "\"closed-won\"");
        assert_eq!("closed-lost".parse::<DealStage>().unwrap(), DealStage::ClosedLost);
    }

    #[test]
    fn test_closed_stages() {
        let closed: Vec<_> = DealStage::ALL.into_iter().filter(|s| s.is_closed()).collect();
        assert_eq!(closed, vec![DealStage::ClosedWon, DealStage::ClosedLost]);
    }
}
