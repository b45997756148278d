use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::model::auto_reply::{AutoReplyConfig, AutoReplyInput};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AbsenceKind {
    Vacation,
    Sick,
    Training,
    Parental,
}

impl AbsenceKind {
    /// Label used in calendar subjects and chat messages.
    pub fn label(self) -> &'static str {
        match self {
            AbsenceKind::Vacation => "Urlaub",
            AbsenceKind::Sick => "Krankheit",
            AbsenceKind::Training => "Fortbildung",
            AbsenceKind::Parental => "Elternzeit",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AbsenceStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl AbsenceStatus {
    /// Pending and approved absences occupy the calendar; the rest do not.
    pub fn is_active(self) -> bool {
        matches!(self, AbsenceStatus::Pending | AbsenceStatus::Approved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HalfDayPeriod {
    Morning,
    Afternoon,
}

/// Colleague asked to take over tasks, independent of the auto-reply text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Substitute {
    #[schema(example = "jane.roe@company.com")]
    pub email: String,
    #[schema(nullable = true)]
    pub tasks: Option<String>,
    pub notified: bool,
}

/// Who decided on the request and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Decision {
    pub approver_id: String,
    pub approver_email: String,
    #[schema(value_type = String, format = "date-time")]
    pub decided_at: DateTime<Utc>,
    #[schema(nullable = true)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Absence {
    #[schema(example = "0b7f6f0e-5a4c-4d43-9f6e-3d2a1b0c9e8d")]
    pub id: String,
    pub user_id: String,
    #[schema(example = "john.doe@company.com")]
    pub user_email: String,
    #[schema(example = "John Doe")]
    pub user_name: String,
    pub kind: AbsenceKind,
    #[schema(value_type = String, format = "date", example = "2026-06-10")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date", example = "2026-06-12")]
    pub end_date: NaiveDate,
    pub is_half_day: bool,
    #[schema(nullable = true)]
    pub half_day_period: Option<HalfDayPeriod>,
    #[schema(example = 3.0)]
    pub total_days: f64,
    pub status: AbsenceStatus,
    #[schema(nullable = true)]
    pub reason: Option<String>,
    #[schema(nullable = true)]
    pub decision: Option<Decision>,
    #[schema(nullable = true)]
    pub substitute: Option<Substitute>,
    pub auto_reply: AutoReplyConfig,
    pub conflict_warning: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Absence {
    /// Inclusive day-range intersection.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }

    /// Whether the absence lies completely inside `[start, end]`.
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date >= start && self.end_date <= end
    }
}

/// Request body for submitting an absence.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewAbsence {
    pub kind: AbsenceKind,
    #[schema(value_type = String, format = "date", example = "2026-06-10")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date", example = "2026-06-12")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_half_day: bool,
    pub half_day_period: Option<HalfDayPeriod>,
    #[schema(example = "Sommerurlaub")]
    pub reason: Option<String>,
    pub substitute_email: Option<String>,
    pub substitute_tasks: Option<String>,
    pub auto_reply: Option<AutoReplyInput>,
}

/// Fields the owner may change while the absence is pending. Anything else in
/// the body is rejected.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateAbsence {
    pub kind: Option<AbsenceKind>,
    #[schema(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    pub is_half_day: Option<bool>,
    pub half_day_period: Option<HalfDayPeriod>,
    pub reason: Option<String>,
    pub substitute_email: Option<String>,
    pub substitute_tasks: Option<String>,
    pub auto_reply: Option<AutoReplyInput>,
}
