//! Fixture builders shared by the unit tests.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::model::{
    absence::{Absence, AbsenceKind, AbsenceStatus},
    analytics::{AnalyticsSnapshot, KindBreakdown, PeriodComparison, StatusBreakdown},
    auto_reply::{AutoReplyConfig, ReplyRecipients, ReplyTiming},
    role::Role,
    user::{User, VacationBalance},
};
use crate::utils::dates::working_days_between;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn instant(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

pub fn disabled_auto_reply(start: NaiveDate) -> AutoReplyConfig {
    AutoReplyConfig {
        enabled: false,
        has_substitute: false,
        substitute: None,
        recipients: ReplyRecipients::default(),
        timing: ReplyTiming {
            activate_immediately: false,
            scheduled_date: start,
            scheduled_time: NaiveTime::MIN,
        },
        messages: None,
    }
}

pub fn absence(
    id: &str,
    user_id: &str,
    kind: AbsenceKind,
    start: NaiveDate,
    end: NaiveDate,
    status: AbsenceStatus,
) -> Absence {
    let created_at = instant(2024, 1, 1, 9);
    Absence {
        id: id.to_string(),
        user_id: user_id.to_string(),
        user_email: format!("{user_id}@company.com"),
        user_name: format!("Name {user_id}"),
        kind,
        start_date: start,
        end_date: end,
        is_half_day: false,
        half_day_period: None,
        total_days: working_days_between(start, end, false),
        status,
        reason: None,
        decision: None,
        substitute: None,
        auto_reply: disabled_auto_reply(start),
        conflict_warning: false,
        created_at,
        updated_at: created_at,
    }
}

pub fn user(id: &str, role: Role) -> User {
    let created_at = instant(2024, 1, 1, 9);
    User {
        id: id.to_string(),
        email: format!("{id}@company.com"),
        name: format!("Name {id}"),
        department: None,
        job_title: None,
        manager_id: None,
        manager_email: None,
        role,
        vacation: VacationBalance::new(30.0),
        is_active: true,
        created_at,
        updated_at: created_at,
    }
}

/// Employee reporting to `manager_id` inside `department`.
pub fn report(id: &str, manager_id: &str, department: &str) -> User {
    User {
        department: Some(department.to_string()),
        manager_id: Some(manager_id.to_string()),
        manager_email: Some(format!("{manager_id}@company.com")),
        ..user(id, Role::Employee)
    }
}

pub fn snapshot(year: i32, month: Option<u32>, department: Option<&str>) -> AnalyticsSnapshot {
    AnalyticsSnapshot {
        year,
        month,
        department: department.map(str::to_string),
        total_absences: 0,
        total_days: 0.0,
        average_duration: 0.0,
        by_kind: KindBreakdown::default(),
        by_status: StatusBreakdown::default(),
        compared_to_previous: PeriodComparison::default(),
        peak_days: Vec::new(),
        vacation_score: 0,
        computed_at: instant(2026, 1, 1, 0),
    }
}

pub fn actor(id: &str, role: Role) -> crate::auth::auth::AuthUser {
    crate::auth::auth::AuthUser {
        user_id: id.to_string(),
        email: format!("{id}@company.com"),
        name: format!("Name {id}"),
        role,
    }
}
