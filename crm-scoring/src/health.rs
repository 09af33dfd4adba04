use shared_types::{PaymentHistory, UpdateHealthScoreRequest};

use crate::{clamp_score, stored, weighted, BASE_SCORE};

const REVENUE_THRESHOLD: f64 = 1_000_000.0;
const EMPLOYEE_THRESHOLD: i64 = 100;

/// Fields of a company that feed its health score
#[derive(Debug, Clone, Copy, Default)]
pub struct CompanyProfile<'a> {
    pub annual_revenue: Option<f64>,
    pub employees: Option<i64>,
    pub website: Option<&'a str>,
}

pub fn health_score(profile: &CompanyProfile) -> i64 {
    let mut score = BASE_SCORE;

    if profile.annual_revenue.is_some_and(|r| r > REVENUE_THRESHOLD) {
        score += 20;
    }
    if profile.employees.is_some_and(|e| e > EMPLOYEE_THRESHOLD) {
        score += 15;
    }
    if profile.website.is_some_and(|w| !w.trim().is_empty()) {
        score += 10;
    }

    clamp_score(score)
}

/// Fold engagement signals into an existing health score.
pub fn refresh_health_score(current: Option<i64>, signals: &UpdateHealthScoreRequest) -> i64 {
    let payment = match signals.payment_history {
        Some(PaymentHistory::Good) => 15,
        Some(PaymentHistory::Fair) => 5,
        Some(PaymentHistory::Poor) => -10,
        None => 0,
    };

    let score = stored(current)
        .unwrap_or(BASE_SCORE)
        .saturating_add(weighted(signals.deal_activity, 10))
        .saturating_add(weighted(signals.communication_frequency, 5))
        .saturating_add(payment);

    clamp_score(score)
}
