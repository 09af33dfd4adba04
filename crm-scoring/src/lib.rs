//! CRM Scoring Crate
//!
//! Heuristic scores shown in the CRM as "AI" insights. Every score is a
//! weighted formula over a handful of record fields; nothing here is learned.
//!
//! # Available Scores
//!
//! - [`health::health_score`]: company health from revenue, headcount and web presence
//! - [`lead::lead_score`]: contact lead quality from source, company and title
//! - [`deal::win_probability`]: deal win probability from user input and company health
//! - [`deal::stage_probability`]: fixed probability for each pipeline stage
//! - [`suggestions::suggest_tasks`]: follow-up tasks derived from recent activity
//!
//! All scores live in `[MIN_SCORE, MAX_SCORE]`.
//!
//! # Example
//!
//! ```rust
//! use crm_scoring::health::{health_score, CompanyProfile};
//!
//! let profile = CompanyProfile {
//!     annual_revenue: Some(2_000_000.0),
//!     employees: Some(150),
//!     website: Some("acme.com"),
//! };
//! assert_eq!(health_score(&profile), 95);
//! ```

pub mod deal;
pub mod health;
pub mod lead;
pub mod suggestions;

pub use deal::{refresh_win_probability, stage_probability, win_probability, DealProfile};
pub use health::{health_score, refresh_health_score, CompanyProfile};
pub use lead::{lead_score, lead_score_with_jitter, refresh_lead_score, LeadProfile};
pub use suggestions::{suggest_tasks, SuggestionContext};

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;
/// Starting point for every additive score
pub const BASE_SCORE: i64 = 50;

/// Clamp an integer score into range.
pub fn clamp_score(score: i64) -> i64 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Clamp a fractional score into range and round it.
pub fn clamp_rounded(score: f64) -> i64 {
    if score.is_nan() {
        return MIN_SCORE;
    }
    (score.clamp(MIN_SCORE as f64, MAX_SCORE as f64)).round() as i64
}

/// Stored score to refresh from; zero is treated as never scored.
pub(crate) fn stored(current: Option<i64>) -> Option<i64> {
    current.filter(|score| *score != 0)
}

/// `count * weight`, saturating so extreme engagement counts cannot wrap.
pub(crate) fn weighted(count: Option<i64>, weight: i64) -> i64 {
    count.unwrap_or(0).saturating_mul(weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_score_bounds() {
        assert_eq!(clamp_score(-40), 0);
        assert_eq!(clamp_score(64), 64);
        assert_eq!(clamp_score(i64::MAX), 100);
    }

    #[test]
    fn test_clamp_rounded() {
        assert_eq!(clamp_rounded(45.5), 46);
        assert_eq!(clamp_rounded(120.2), 100);
        assert_eq!(clamp_rounded(-3.0), 0);
        assert_eq!(clamp_rounded(f64::NAN), 0);
    }
}
