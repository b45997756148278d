use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::{AppError, AppResult},
    model::{
        absence::{Absence, AbsenceKind, AbsenceStatus},
        analytics::{
            AnalyticsSnapshot, DepartmentStat, KindBreakdown, PeakDay, PeriodComparison,
            SickLeaveTrend, SnapshotKey, StatusBreakdown, TrendDirection,
        },
        user::User,
    },
    store::{AbsenceFilter, AbsenceStore, SnapshotStore, UserFilter, UserStore},
    utils::dates::{days_in_range, month_bounds, months_back, previous_month, year_bounds},
};

pub const PEAK_DAY_LIMIT: usize = 5;
pub const DEFAULT_TREND_MONTHS: u32 = 12;
pub const MAX_TREND_MONTHS: u32 = 36;
/// Month-over-month change (in percent) beyond which a trend is up or down.
const TREND_THRESHOLD: f64 = 10.0;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AnalyticsQuery {
    pub year: i32,
    /// 1..=12; the whole year when omitted
    pub month: Option<u32>,
    pub department: Option<String>,
    /// Serve a snapshot younger than 24 hours when available
    #[serde(default)]
    pub cached: bool,
}

impl AnalyticsQuery {
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey {
            year: self.year,
            month: self.month,
            department: self
                .department
                .as_ref()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// `[from, to]` of a month, or of the year when `month` is `None`.
pub fn window(year: i32, month: Option<u32>) -> AppResult<(NaiveDate, NaiveDate)> {
    let bounds = match month {
        Some(month) => month_bounds(year, month),
        None => year_bounds(year),
    };
    bounds.ok_or_else(|| AppError::Validation(format!("Invalid period {year}/{month:?}")))
}

/// The window immediately before `(year, month)`.
fn previous_window(year: i32, month: Option<u32>) -> AppResult<(NaiveDate, NaiveDate)> {
    match month {
        Some(month) => {
            let (year, month) = previous_month(year, month);
            window(year, Some(month))
        }
        None => window(year - 1, None),
    }
}

fn sum_days<'a>(absences: impl IntoIterator<Item = &'a Absence>) -> f64 {
    absences.into_iter().map(|a| a.total_days).sum()
}

pub fn kind_breakdown(absences: &[&Absence]) -> KindBreakdown {
    let mut breakdown = KindBreakdown::default();
    for absence in absences {
        match absence.kind {
            AbsenceKind::Vacation => breakdown.vacation += 1,
            AbsenceKind::Sick => breakdown.sick += 1,
            AbsenceKind::Training => breakdown.training += 1,
            AbsenceKind::Parental => breakdown.parental += 1,
        }
    }
    breakdown
}

pub fn status_breakdown(absences: &[Absence]) -> StatusBreakdown {
    let mut breakdown = StatusBreakdown::default();
    for absence in absences {
        match absence.status {
            AbsenceStatus::Pending => breakdown.pending += 1,
            AbsenceStatus::Approved => breakdown.approved += 1,
            AbsenceStatus::Rejected => breakdown.rejected += 1,
            AbsenceStatus::Cancelled => breakdown.cancelled += 1,
        }
    }
    breakdown
}

pub fn compare(current: &[&Absence], previous: &[&Absence]) -> PeriodComparison {
    let total_change = current.len() as i64 - previous.len() as i64;
    let sick = |set: &[&Absence]| set.iter().filter(|a| a.kind == AbsenceKind::Sick).count() as i64;
    PeriodComparison {
        total_change,
        percentage_change: round1(ratio(total_change as f64, previous.len() as f64) * 100.0),
        sick_leave_change: sick(current) - sick(previous),
    }
}

/// Days covered by the most absences at once; ties go to the earlier date.
pub fn peak_days(absences: &[&Absence], limit: usize) -> Vec<PeakDay> {
    let mut tally: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for absence in absences {
        for day in days_in_range(absence.start_date, absence.end_date) {
            *tally.entry(day).or_default() += 1;
        }
    }
    let mut peaks: Vec<PeakDay> = tally
        .into_iter()
        .map(|(date, absence_count)| PeakDay {
            date,
            absence_count,
        })
        .collect();
    // stable sort keeps the BTreeMap's date order among equal counts
    peaks.sort_by(|a, b| b.absence_count.cmp(&a.absence_count));
    peaks.truncate(limit);
    peaks
}

/// Share of the members' entitlement already used, 0..=100.
pub fn vacation_score(members: &[User]) -> u32 {
    let total: f64 = members.iter().map(|u| u.vacation.total).sum();
    let used: f64 = members.iter().map(|u| u.vacation.used).sum();
    (ratio(used, total) * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Aggregates one window. `window_absences` holds every absence inside the
/// window regardless of status; `previous` the active ones of the window before.
pub fn summarize(
    key: SnapshotKey,
    window_absences: &[Absence],
    previous: &[Absence],
    members: &[User],
    computed_at: DateTime<Utc>,
) -> AnalyticsSnapshot {
    let active: Vec<&Absence> = window_absences
        .iter()
        .filter(|a| a.status.is_active())
        .collect();
    let previous_active: Vec<&Absence> = previous.iter().filter(|a| a.status.is_active()).collect();

    let total_days = sum_days(active.iter().copied());
    AnalyticsSnapshot {
        year: key.year,
        month: key.month,
        department: key.department,
        total_absences: active.len() as u32,
        total_days,
        average_duration: round1(ratio(total_days, active.len() as f64)),
        by_kind: kind_breakdown(&active),
        by_status: status_breakdown(window_absences),
        compared_to_previous: compare(&active, &previous_active),
        peak_days: peak_days(&active, PEAK_DAY_LIMIT),
        vacation_score: vacation_score(members),
        computed_at,
    }
}

pub fn department_stat(department: &str, members: &[&User], absences: &[&Absence]) -> DepartmentStat {
    let total_days = sum_days(absences.iter().copied());
    let of_kind = |kind: AbsenceKind| sum_days(absences.iter().copied().filter(|a| a.kind == kind));
    let entitlement: f64 = members.iter().map(|u| u.vacation.total).sum();

    DepartmentStat {
        department: department.to_string(),
        total_absences: absences.len() as u32,
        total_days,
        average_duration: round1(ratio(total_days, absences.len() as f64)),
        vacation_rate: (ratio(of_kind(AbsenceKind::Vacation), entitlement) * 100.0).round(),
        sick_leave_rate: round1(ratio(of_kind(AbsenceKind::Sick), members.len() as f64)),
        employee_count: members.len() as u32,
    }
}

/// Classifies each month against the one before it; the first month is stable.
pub fn sick_trends(series: &[(i32, u32, f64)]) -> Vec<SickLeaveTrend> {
    let mut trends: Vec<SickLeaveTrend> = Vec::with_capacity(series.len());
    for &(year, month, sick_days) in series {
        let percentage_change = match trends.last() {
            Some(prev) => (ratio(sick_days - prev.sick_days, prev.sick_days) * 100.0).round(),
            None => 0.0,
        };
        let trend = if percentage_change > TREND_THRESHOLD {
            TrendDirection::Up
        } else if percentage_change < -TREND_THRESHOLD {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        };
        trends.push(SickLeaveTrend {
            year,
            month,
            sick_days,
            trend,
            percentage_change,
        });
    }
    trends
}

pub fn is_fresh(snapshot: &AnalyticsSnapshot, now: DateTime<Utc>) -> bool {
    now - snapshot.computed_at < Duration::hours(24)
}

pub struct AnalyticsService {
    absences: Arc<dyn AbsenceStore>,
    users: Arc<dyn UserStore>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl AnalyticsService {
    pub fn new(
        absences: Arc<dyn AbsenceStore>,
        users: Arc<dyn UserStore>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            absences,
            users,
            snapshots,
        }
    }

    pub async fn compute(&self, key: &SnapshotKey, now: DateTime<Utc>) -> AppResult<AnalyticsSnapshot> {
        let current_window = window(key.year, key.month)?;
        let previous = previous_window(key.year, key.month)?;

        let members = self
            .users
            .list_users(&UserFilter {
                department: key.department.clone(),
                active_only: true,
                ..Default::default()
            })
            .await?;
        let user_ids = key
            .department
            .as_ref()
            .map(|_| members.iter().map(|u| u.id.clone()).collect::<Vec<_>>());

        let window_absences = self
            .absences
            .list_absences(&AbsenceFilter {
                user_ids: user_ids.clone(),
                within: Some(current_window),
                ..Default::default()
            })
            .await?;
        let previous_absences = self
            .absences
            .list_absences(&AbsenceFilter {
                user_ids,
                statuses: Some(AbsenceFilter::active()),
                within: Some(previous),
                ..Default::default()
            })
            .await?;

        tracing::debug!(
            year = key.year,
            month = ?key.month,
            department = ?key.department,
            absences = window_absences.len(),
            "Analytics computed"
        );
        Ok(summarize(
            key.clone(),
            &window_absences,
            &previous_absences,
            &members,
            now,
        ))
    }

    /// Serves a snapshot younger than 24 hours, otherwise computes and
    /// overwrites it. Returns whether the stored snapshot was used.
    pub async fn cached(
        &self,
        key: &SnapshotKey,
        now: DateTime<Utc>,
    ) -> AppResult<(AnalyticsSnapshot, bool)> {
        if let Some(snapshot) = self.snapshots.find_snapshot(key).await? {
            if is_fresh(&snapshot, now) {
                return Ok((snapshot, true));
            }
        }
        let snapshot = self.compute(key, now).await?;
        self.snapshots.upsert_snapshot(&snapshot).await?;
        Ok((snapshot, false))
    }

    pub async fn by_department(&self, year: i32, month: Option<u32>) -> AppResult<Vec<DepartmentStat>> {
        let range = window(year, month)?;
        let members = self
            .users
            .list_users(&UserFilter {
                active_only: true,
                ..Default::default()
            })
            .await?;
        let absences = self
            .absences
            .list_absences(&AbsenceFilter {
                user_ids: Some(members.iter().map(|u| u.id.clone()).collect()),
                statuses: Some(AbsenceFilter::active()),
                within: Some(range),
                ..Default::default()
            })
            .await?;

        let mut by_user: HashMap<&str, Vec<&Absence>> = HashMap::new();
        for absence in &absences {
            by_user.entry(absence.user_id.as_str()).or_default().push(absence);
        }

        let mut stats: Vec<DepartmentStat> = self
            .users
            .departments()
            .await?
            .iter()
            .map(|department| {
                let team: Vec<&User> = members
                    .iter()
                    .filter(|u| u.department.as_deref() == Some(department.as_str()))
                    .collect();
                let team_absences: Vec<&Absence> = team
                    .iter()
                    .flat_map(|u| by_user.get(u.id.as_str()).into_iter().flatten().copied())
                    .collect();
                department_stat(department, &team, &team_absences)
            })
            .collect();
        stats.sort_by(|a, b| b.total_absences.cmp(&a.total_absences));
        Ok(stats)
    }

    /// Sick-day totals for the `months` months ending with `today`'s month.
    pub async fn sick_leave_trends(&self, today: NaiveDate, months: u32) -> AppResult<Vec<SickLeaveTrend>> {
        if months == 0 || months > MAX_TREND_MONTHS {
            return Err(AppError::Validation(format!(
                "months must be between 1 and {MAX_TREND_MONTHS}"
            )));
        }
        let (year, month) = (today.year(), today.month());
        let buckets: Vec<(i32, u32, (NaiveDate, NaiveDate))> = (0..months)
            .rev()
            .map(|back| {
                let (y, m) = months_back(year, month, back);
                window(y, Some(m)).map(|bounds| (y, m, bounds))
            })
            .collect::<AppResult<_>>()?;
        let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
            return Ok(Vec::new());
        };

        let sick = self
            .absences
            .list_absences(&AbsenceFilter {
                kind: Some(AbsenceKind::Sick),
                statuses: Some(AbsenceFilter::active()),
                within: Some((first.2.0, last.2.1)),
                ..Default::default()
            })
            .await?;

        let series: Vec<(i32, u32, f64)> = buckets
            .iter()
            .map(|&(y, m, (from, to))| {
                (y, m, sum_days(sick.iter().filter(|a| a.within(from, to))))
            })
            .collect();
        Ok(sick_trends(&series))
    }
}
