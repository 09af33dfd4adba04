use shared_types::{Activity, ActivityType, DealStage, Task, TaskPriority, TaskSuggestion};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// What is known about a contact, company or deal when suggesting follow-ups
#[derive(Debug, Clone, Copy)]
pub struct SuggestionContext<'a> {
    /// Most recent activities on the record
    pub recent_activities: &'a [Activity],
    /// Tasks on the record that are not completed
    pub open_tasks: &'a [Task],
    /// Set when the record is a deal
    pub deal_stage: Option<DealStage>,
    pub now: i64,
}

fn has_recent(activities: &[Activity], kind: ActivityType, now: i64, days: i64) -> bool {
    activities
        .iter()
        .any(|a| a.activity_type == kind && a.created_at > now - days * DAY_MS)
}

pub fn suggest_tasks(ctx: &SuggestionContext) -> Vec<TaskSuggestion> {
    let mut suggestions = Vec::new();

    let recent_call = has_recent(ctx.recent_activities, ActivityType::Call, ctx.now, 7);
    let recent_email = has_recent(ctx.recent_activities, ActivityType::Email, ctx.now, 3);
    let has_follow_up = ctx
        .open_tasks
        .iter()
        .any(|t| t.subject.to_lowercase().contains("follow"));

    if recent_call && !has_follow_up {
        suggestions.push(TaskSuggestion {
            subject: "Follow up on recent call".to_string(),
            description:
                "Send follow-up email or schedule next meeting based on call discussion"
                    .to_string(),
            priority: TaskPriority::Medium,
            due_date: ctx.now + 2 * DAY_MS,
        });
    }

    if !recent_email && !has_follow_up {
        suggestions.push(TaskSuggestion {
            subject: "Send check-in email".to_string(),
            description: "Reach out to maintain engagement and check on current needs"
                .to_string(),
            priority: TaskPriority::Low,
            due_date: ctx.now + 7 * DAY_MS,
        });
    }

    if ctx.deal_stage == Some(DealStage::Proposal) {
        suggestions.push(TaskSuggestion {
            subject: "Follow up on proposal".to_string(),
            description:
                "Check if client has reviewed the proposal and address any questions"
                    .to_string(),
            priority: TaskPriority::High,
            due_date: ctx.now + 3 * DAY_MS,
        });
    }

    suggestions
}
