//! Persistence collaborator: record CRUD plus the filtered range queries the
//! absence workflow and the analytics need.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;

use crate::{
    error::AppError,
    model::{
        absence::{Absence, AbsenceKind, AbsenceStatus, Decision},
        analytics::{AnalyticsSnapshot, SnapshotKey},
        settings::CompanySettings,
        user::User,
    },
};

#[cfg(test)]
pub mod memory;
pub mod mysql;
pub mod snapshot_cache;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "corrupt record: {}", _0)]
    Corrupt(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "Storage operation failed");
        AppError::Storage(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOrder {
    /// Latest start date first
    #[default]
    NewestFirst,
    /// Earliest start date first
    OldestFirst,
}

#[derive(Debug, Clone, Default)]
pub struct AbsenceFilter {
    /// `Some(vec![])` matches nothing
    pub user_ids: Option<Vec<String>>,
    pub statuses: Option<Vec<AbsenceStatus>>,
    pub kind: Option<AbsenceKind>,
    /// Inclusive day-range intersection with `[from, to]`
    pub overlapping: Option<(NaiveDate, NaiveDate)>,
    /// Start and end both inside `[from, to]`
    pub within: Option<(NaiveDate, NaiveDate)>,
    pub starts_on_or_after: Option<NaiveDate>,
    pub order: ListOrder,
    pub limit: Option<u32>,
}

impl AbsenceFilter {
    pub fn active() -> Vec<AbsenceStatus> {
        vec![AbsenceStatus::Pending, AbsenceStatus::Approved]
    }

    /// Same predicate the SQL implementation encodes; used by in-process stores.
    pub fn matches(&self, absence: &Absence) -> bool {
        if let Some(ids) = &self.user_ids {
            if !ids.iter().any(|id| *id == absence.user_id) {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&absence.status) {
                return false;
            }
        }
        if self.kind.is_some_and(|k| k != absence.kind) {
            return false;
        }
        if let Some((from, to)) = self.overlapping {
            if !absence.overlaps(from, to) {
                return false;
            }
        }
        if let Some((from, to)) = self.within {
            if !absence.within(from, to) {
                return false;
            }
        }
        if self.starts_on_or_after.is_some_and(|d| absence.start_date < d) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub manager_id: Option<String>,
    pub department: Option<String>,
    pub active_only: bool,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if self.active_only && !user.is_active {
            return false;
        }
        if let Some(manager_id) = &self.manager_id {
            if user.manager_id.as_ref() != Some(manager_id) {
                return false;
            }
        }
        if let Some(department) = &self.department {
            if user.department.as_ref() != Some(department) {
                return false;
            }
        }
        true
    }
}

/// A vacation-balance debit applied together with an approval.
#[derive(Debug, Clone, PartialEq)]
pub struct VacationDebit {
    pub user_id: String,
    pub days: f64,
}

#[async_trait]
pub trait AbsenceStore: Send + Sync {
    async fn insert_absence(&self, absence: &Absence) -> StoreResult<()>;

    async fn find_absence(&self, id: &str) -> StoreResult<Option<Absence>>;

    async fn list_absences(&self, filter: &AbsenceFilter) -> StoreResult<Vec<Absence>>;

    /// Writes the owner-editable fields of a still-pending absence.
    /// Returns false when the record is no longer pending.
    async fn update_pending(&self, absence: &Absence) -> StoreResult<bool>;

    /// Moves a pending absence to `status`, stamping `decision` and applying
    /// `debit`, all or nothing. Returns false if the absence was not pending.
    async fn decide(
        &self,
        id: &str,
        status: AbsenceStatus,
        decision: &Decision,
        debit: Option<&VacationDebit>,
    ) -> StoreResult<bool>;

    /// Pending or approved to cancelled. Returns false otherwise.
    async fn cancel(&self, id: &str, at: DateTime<Utc>) -> StoreResult<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>>;

    /// Distinct non-empty departments of active users, sorted.
    async fn departments(&self) -> StoreResult<Vec<String>>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load_settings(&self) -> StoreResult<Option<CompanySettings>>;

    async fn save_settings(&self, settings: &CompanySettings) -> StoreResult<()>;
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn find_snapshot(&self, key: &SnapshotKey) -> StoreResult<Option<AnalyticsSnapshot>>;

    /// Inserts or replaces the snapshot stored under `snapshot.key()`.
    async fn upsert_snapshot(&self, snapshot: &AnalyticsSnapshot) -> StoreResult<()>;
}
