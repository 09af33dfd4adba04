use shared_types::{DealStage, UpdateAiProbabilityRequest};

use crate::{clamp_rounded, clamp_score, stored, weighted};

const LARGE_DEAL: f64 = 100_000.0;
const VERY_LARGE_DEAL: f64 = 500_000.0;

/// Probability a deal is reset to when it enters `stage`.
pub fn stage_probability(stage: DealStage) -> i64 {
    match stage {
        DealStage::Prospecting => 10,
        DealStage::Qualification => 25,
        DealStage::Proposal => 50,
        DealStage::Negotiation => 75,
        DealStage::ClosedWon => 100,
        DealStage::ClosedLost => 0,
    }
}

/// Inputs to the win-probability heuristic
#[derive(Debug, Clone, Copy)]
pub struct DealProfile<'a> {
    /// User-entered probability
    pub probability: i64,
    pub amount: f64,
    pub lead_source: Option<&'a str>,
    pub company_health: Option<i64>,
}

pub fn win_probability(profile: &DealProfile) -> i64 {
    let mut p = profile.probability as f64;

    // a zero health score carries no signal
    if let Some(health) = profile.company_health.filter(|h| *h != 0) {
        p = (p + health as f64) / 2.0;
    }

    if profile.amount > LARGE_DEAL {
        p *= 0.9;
    }
    if profile.amount > VERY_LARGE_DEAL {
        p *= 0.8;
    }

    match profile.lead_source {
        Some("referral") => p *= 1.2,
        Some("cold-email") => p *= 0.8,
        _ => {}
    }

    clamp_rounded(p)
}

/// Fold activity signals into a deal's current AI probability.
pub fn refresh_win_probability(
    current: Option<i64>,
    probability: i64,
    signals: &UpdateAiProbabilityRequest,
) -> i64 {
    let score = stored(current)
        .unwrap_or(probability)
        .saturating_add(weighted(signals.recent_activities, 5))
        .saturating_add(weighted(signals.email_engagement, 3))
        .saturating_sub(weighted(signals.competitor_count, 5));

    clamp_score(score)
}
