use rand::Rng;
use shared_types::UpdateAiScoreRequest;

use crate::{clamp_score, stored, weighted, BASE_SCORE};

/// Upper bound (exclusive) of the random term added at creation
pub const JITTER_RANGE: i64 = 20;

const EXECUTIVE_TITLES: [&str; 2] = ["ceo", "cto"];

/// Contact fields that feed the lead score
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadProfile<'a> {
    pub lead_source: Option<&'a str>,
    pub company: Option<&'a str>,
    pub title: Option<&'a str>,
}

fn base_lead_score(profile: &LeadProfile) -> i64 {
    let mut score = BASE_SCORE;

    match profile.lead_source {
        Some("referral") => score += 20,
        Some("website") => score += 15,
        _ => {}
    }
    if profile.company.is_some_and(|c| !c.trim().is_empty()) {
        score += 10;
    }
    if let Some(title) = profile.title {
        let title = title.to_lowercase();
        if EXECUTIVE_TITLES.iter().any(|t| title.contains(t)) {
            score += 15;
        }
    }

    score
}

/// Lead score with an explicit jitter term.
pub fn lead_score_with_jitter(profile: &LeadProfile, jitter: i64) -> i64 {
    clamp_score(base_lead_score(profile).saturating_add(jitter))
}

/// Lead score with a random jitter in `[0, JITTER_RANGE)` drawn from `rng`.
pub fn lead_score<R: Rng + ?Sized>(profile: &LeadProfile, rng: &mut R) -> i64 {
    let jitter = rng.gen_range(0..JITTER_RANGE);
    lead_score_with_jitter(profile, jitter)
}

/// Fold engagement counts into an existing lead score.
pub fn refresh_lead_score(current: Option<i64>, engagement: &UpdateAiScoreRequest) -> i64 {
    let score = stored(current)
        .unwrap_or(BASE_SCORE)
        .saturating_add(weighted(engagement.interactions, 5))
        .saturating_add(weighted(engagement.email_opens, 2))
        .saturating_add(weighted(engagement.website_visits, 3));

    clamp_score(score)
}
