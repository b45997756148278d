use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

/// Identifies one analytics window; also the snapshot cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct SnapshotKey {
    #[schema(example = 2026)]
    pub year: i32,
    /// 1..=12; `None` means the whole year
    #[schema(example = 6, nullable = true)]
    pub month: Option<u32>,
    #[schema(nullable = true)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KindBreakdown {
    pub vacation: u32,
    pub sick: u32,
    pub training: u32,
    pub parental: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusBreakdown {
    pub pending: u32,
    pub approved: u32,
    pub rejected: u32,
    pub cancelled: u32,
}

/// Difference against the immediately preceding month (or year).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PeriodComparison {
    pub total_change: i64,
    pub percentage_change: f64,
    pub sick_leave_change: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PeakDay {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub absence_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsSnapshot {
    pub year: i32,
    #[schema(nullable = true)]
    pub month: Option<u32>,
    #[schema(nullable = true)]
    pub department: Option<String>,
    pub total_absences: u32,
    pub total_days: f64,
    pub average_duration: f64,
    pub by_kind: KindBreakdown,
    pub by_status: StatusBreakdown,
    pub compared_to_previous: PeriodComparison,
    pub peak_days: Vec<PeakDay>,
    /// 0..=100
    pub vacation_score: u32,
    #[schema(value_type = String, format = "date-time")]
    pub computed_at: DateTime<Utc>,
}

impl AnalyticsSnapshot {
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey {
            year: self.year,
            month: self.month,
            department: self.department.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DepartmentStat {
    #[schema(example = "Engineering")]
    pub department: String,
    pub total_absences: u32,
    pub total_days: f64,
    pub average_duration: f64,
    /// Percentage of the department's entitlement used for vacation
    pub vacation_rate: f64,
    /// Sick days per head
    pub sick_leave_rate: f64,
    pub employee_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SickLeaveTrend {
    pub year: i32,
    pub month: u32,
    pub sick_days: f64,
    pub trend: TrendDirection,
    pub percentage_change: f64,
}
