use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::absence::Absence;

/// Outcome of a concurrent-absence check. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ConflictCheck {
    pub has_conflict: bool,
    /// Overlapping absences plus the candidate itself
    pub concurrent_absences: u32,
    pub max_allowed: u32,
    pub conflicting_users: Vec<String>,
    pub conflicting_absence_ids: Vec<String>,
}

/// Counts the team's pending/approved absences overlapping `[start, end]`.
///
/// Absences of `exclude_user_id` are ignored so a user never conflicts with
/// their own requests.
pub fn check_conflicts(
    start: NaiveDate,
    end: NaiveDate,
    team_absences: &[Absence],
    max_concurrent: u32,
    exclude_user_id: Option<&str>,
) -> ConflictCheck {
    let overlapping: Vec<&Absence> = team_absences
        .iter()
        .filter(|a| a.status.is_active())
        .filter(|a| exclude_user_id != Some(a.user_id.as_str()))
        .filter(|a| a.overlaps(start, end))
        .collect();

    let concurrent = overlapping.len() as u32 + 1;

    ConflictCheck {
        has_conflict: concurrent > max_concurrent,
        concurrent_absences: concurrent,
        max_allowed: max_concurrent,
        conflicting_users: overlapping.iter().map(|a| a.user_name.clone()).collect(),
        conflicting_absence_ids: overlapping.iter().map(|a| a.id.clone()).collect(),
    }
}

pub fn warning_message(check: &ConflictCheck) -> Option<String> {
    if !check.has_conflict {
        return None;
    }
    Some(format!(
        "Warnung: {} Mitarbeiter sind gleichzeitig abwesend (Maximum: {}). Betroffene: {}",
        check.concurrent_absences,
        check.max_allowed,
        check.conflicting_users.join(", ")
    ))
}
