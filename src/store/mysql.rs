use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool, types::Json};

use crate::{
    model::{
        absence::{Absence, AbsenceKind, AbsenceStatus, Decision, HalfDayPeriod, Substitute},
        analytics::{AnalyticsSnapshot, SnapshotKey},
        auto_reply::AutoReplyConfig,
        role::Role,
        settings::CompanySettings,
        user::{User, VacationBalance},
    },
    store::{
        AbsenceFilter, AbsenceStore, ListOrder, SettingsStore, SnapshotStore, StoreError,
        StoreResult, UserFilter, UserStore, VacationDebit,
    },
};

const ABSENCE_COLUMNS: &str = r#"
    id, user_id, user_email, user_name, kind, start_date, end_date,
    is_half_day, half_day_period, total_days, status, reason,
    approver_id, approver_email, decided_at, rejection_reason,
    substitute, auto_reply, conflict_warning, created_at, updated_at
"#;

const USER_COLUMNS: &str = r#"
    id, email, name, department, job_title, manager_id, manager_email, role_id,
    vacation_total, vacation_used, vacation_carry_over, is_active, created_at, updated_at
"#;

// Owner edits of a pending absence. Status and decision columns stay untouched.
const UPDATE_PENDING_SQL: &str = r#"
    UPDATE absences
    SET kind = ?, start_date = ?, end_date = ?, is_half_day = ?, half_day_period = ?,
        total_days = ?, reason = ?, substitute = ?, auto_reply = ?,
        conflict_warning = ?, updated_at = ?
    WHERE id = ?
    AND status = 'pending'
"#;

// Typed binds for dynamically assembled WHERE clauses
enum FilterValue<'a> {
    Str(&'a str),
    Date(NaiveDate),
}

/// sqlx-backed implementation of every store trait.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AbsenceRow {
    id: String,
    user_id: String,
    user_email: String,
    user_name: String,
    kind: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    is_half_day: bool,
    half_day_period: Option<String>,
    total_days: f64,
    status: String,
    reason: Option<String>,
    approver_id: Option<String>,
    approver_email: Option<String>,
    decided_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    substitute: Option<Json<Substitute>>,
    auto_reply: Json<AutoReplyConfig>,
    conflict_warning: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_column<T: FromStr>(column: &str, value: &str) -> StoreResult<T> {
    T::from_str(value).map_err(|_| StoreError::Corrupt(format!("{column} = {value:?}")))
}

impl TryFrom<AbsenceRow> for Absence {
    type Error = StoreError;

    fn try_from(row: AbsenceRow) -> StoreResult<Self> {
        let decision = match (row.approver_id, row.approver_email, row.decided_at) {
            (Some(approver_id), Some(approver_email), Some(decided_at)) => Some(Decision {
                approver_id,
                approver_email,
                decided_at,
                rejection_reason: row.rejection_reason,
            }),
            _ => None,
        };
        let half_day_period = row
            .half_day_period
            .as_deref()
            .map(|p| parse_column::<HalfDayPeriod>("half_day_period", p))
            .transpose()?;

        Ok(Absence {
            kind: parse_column::<AbsenceKind>("kind", &row.kind)?,
            status: parse_column::<AbsenceStatus>("status", &row.status)?,
            id: row.id,
            user_id: row.user_id,
            user_email: row.user_email,
            user_name: row.user_name,
            start_date: row.start_date,
            end_date: row.end_date,
            is_half_day: row.is_half_day,
            half_day_period,
            total_days: row.total_days,
            reason: row.reason,
            decision,
            substitute: row.substitute.map(|s| s.0),
            auto_reply: row.auto_reply.0,
            conflict_warning: row.conflict_warning,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    department: Option<String>,
    job_title: Option<String>,
    manager_id: Option<String>,
    manager_email: Option<String>,
    role_id: u8,
    vacation_total: f64,
    vacation_used: f64,
    vacation_carry_over: f64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        let role = Role::from_id(row.role_id)
            .ok_or_else(|| StoreError::Corrupt(format!("role_id = {}", row.role_id)))?;
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            department: row.department,
            job_title: row.job_title,
            manager_id: row.manager_id,
            manager_email: row.manager_email,
            role,
            vacation: VacationBalance {
                total: row.vacation_total,
                used: row.vacation_used,
                remaining: row.vacation_total - row.vacation_used,
                carry_over: row.vacation_carry_over,
            },
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `IN (?, ?, ...)` with one placeholder per value.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[async_trait]
impl AbsenceStore for MySqlStore {
    async fn insert_absence(&self, absence: &Absence) -> StoreResult<()> {
        let decision = absence.decision.as_ref();
        sqlx::query(
            r#"
            INSERT INTO absences
                (id, user_id, user_email, user_name, kind, start_date, end_date,
                 is_half_day, half_day_period, total_days, status, reason,
                 approver_id, approver_email, decided_at, rejection_reason,
                 substitute, auto_reply, conflict_warning, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&absence.id)
        .bind(&absence.user_id)
        .bind(&absence.user_email)
        .bind(&absence.user_name)
        .bind(absence.kind.to_string())
        .bind(absence.start_date)
        .bind(absence.end_date)
        .bind(absence.is_half_day)
        .bind(absence.half_day_period.map(|p| p.to_string()))
        .bind(absence.total_days)
        .bind(absence.status.to_string())
        .bind(&absence.reason)
        .bind(decision.map(|d| d.approver_id.clone()))
        .bind(decision.map(|d| d.approver_email.clone()))
        .bind(decision.map(|d| d.decided_at))
        .bind(decision.and_then(|d| d.rejection_reason.clone()))
        .bind(absence.substitute.as_ref().map(Json))
        .bind(Json(&absence.auto_reply))
        .bind(absence.conflict_warning)
        .bind(absence.created_at)
        .bind(absence.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_absence(&self, id: &str) -> StoreResult<Option<Absence>> {
        let sql = format!("SELECT {ABSENCE_COLUMNS} FROM absences WHERE id = ?");
        sqlx::query_as::<_, AbsenceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Absence::try_from)
            .transpose()
    }

    async fn list_absences(&self, filter: &AbsenceFilter) -> StoreResult<Vec<Absence>> {
        let statuses: Option<Vec<String>> = filter
            .statuses
            .as_ref()
            .map(|wanted| wanted.iter().map(|s| s.to_string()).collect());
        let kind = filter.kind.map(|k| k.to_string());

        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(ids) = &filter.user_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            where_sql.push_str(&format!(" AND user_id IN ({})", placeholders(ids.len())));
            args.extend(ids.iter().map(|id| FilterValue::Str(id)));
        }

        if let Some(statuses) = &statuses {
            if statuses.is_empty() {
                return Ok(Vec::new());
            }
            where_sql.push_str(&format!(" AND status IN ({})", placeholders(statuses.len())));
            args.extend(statuses.iter().map(|s| FilterValue::Str(s)));
        }

        if let Some(kind) = kind.as_deref() {
            where_sql.push_str(" AND kind = ?");
            args.push(FilterValue::Str(kind));
        }

        if let Some((from, to)) = filter.overlapping {
            where_sql.push_str(" AND start_date <= ? AND end_date >= ?");
            args.push(FilterValue::Date(to));
            args.push(FilterValue::Date(from));
        }

        if let Some((from, to)) = filter.within {
            where_sql.push_str(" AND start_date >= ? AND end_date <= ?");
            args.push(FilterValue::Date(from));
            args.push(FilterValue::Date(to));
        }

        if let Some(from) = filter.starts_on_or_after {
            where_sql.push_str(" AND start_date >= ?");
            args.push(FilterValue::Date(from));
        }

        let order = match filter.order {
            ListOrder::NewestFirst => "start_date DESC, created_at DESC",
            ListOrder::OldestFirst => "start_date ASC, created_at ASC",
        };
        let limit = filter
            .limit
            .map(|n| format!(" LIMIT {n}"))
            .unwrap_or_default();

        let sql = format!("SELECT {ABSENCE_COLUMNS} FROM absences{where_sql} ORDER BY {order}{limit}");

        let mut query = sqlx::query_as::<_, AbsenceRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::Str(s) => query.bind(s),
                FilterValue::Date(d) => query.bind(d),
            };
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Absence::try_from)
            .collect()
    }

    async fn update_pending(&self, absence: &Absence) -> StoreResult<bool> {
        let result = sqlx::query(UPDATE_PENDING_SQL)
            .bind(absence.kind.to_string())
            .bind(absence.start_date)
            .bind(absence.end_date)
            .bind(absence.is_half_day)
            .bind(absence.half_day_period.map(|p| p.to_string()))
            .bind(absence.total_days)
            .bind(&absence.reason)
            .bind(absence.substitute.as_ref().map(Json))
            .bind(Json(&absence.auto_reply))
            .bind(absence.conflict_warning)
            .bind(absence.updated_at)
            .bind(&absence.id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn decide(
        &self,
        id: &str,
        status: AbsenceStatus,
        decision: &Decision,
        debit: Option<&VacationDebit>,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE absences
            SET status = ?, approver_id = ?, approver_email = ?, decided_at = ?,
                rejection_reason = ?, updated_at = ?
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(status.to_string())
        .bind(&decision.approver_id)
        .bind(&decision.approver_email)
        .bind(decision.decided_at)
        .bind(&decision.rejection_reason)
        .bind(decision.decided_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(debit) = debit {
            sqlx::query(
                r#"
                UPDATE users
                SET vacation_used = vacation_used + ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(debit.days)
            .bind(decision.decided_at)
            .bind(&debit.user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn cancel(&self, id: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE absences
            SET status = 'cancelled', updated_at = ?
            WHERE id = ?
            AND status IN ('pending', 'approved')
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<&str> = Vec::new();

        if filter.active_only {
            where_sql.push_str(" AND is_active = TRUE");
        }
        if let Some(manager_id) = filter.manager_id.as_deref() {
            where_sql.push_str(" AND manager_id = ?");
            args.push(manager_id);
        }
        if let Some(department) = filter.department.as_deref() {
            where_sql.push_str(" AND department = ?");
            args.push(department);
        }

        let sql = format!("SELECT {USER_COLUMNS} FROM users{where_sql} ORDER BY name");
        let mut query = sqlx::query_as::<_, UserRow>(&sql);
        for arg in args {
            query = query.bind(arg);
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn departments(&self) -> StoreResult<Vec<String>> {
        let departments = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT department
            FROM users
            WHERE is_active = TRUE
            AND department IS NOT NULL
            AND department <> ''
            ORDER BY department
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(departments)
    }
}

#[async_trait]
impl SettingsStore for MySqlStore {
    async fn load_settings(&self) -> StoreResult<Option<CompanySettings>> {
        let row = sqlx::query_scalar::<_, Json<CompanySettings>>(
            "SELECT settings FROM company_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|json| json.0))
    }

    async fn save_settings(&self, settings: &CompanySettings) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO company_settings (id, settings, updated_at)
            VALUES (1, ?, ?)
            ON DUPLICATE KEY UPDATE settings = VALUES(settings), updated_at = VALUES(updated_at)
            "#,
        )
        .bind(Json(settings))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// NULL never collides in a MySQL unique key, so the whole-year and
// all-departments windows are stored as 0 and ''.
fn snapshot_key_columns(key: &SnapshotKey) -> (i32, u32, &str) {
    (
        key.year,
        key.month.unwrap_or(0),
        key.department.as_deref().unwrap_or(""),
    )
}

#[async_trait]
impl SnapshotStore for MySqlStore {
    async fn find_snapshot(&self, key: &SnapshotKey) -> StoreResult<Option<AnalyticsSnapshot>> {
        let (year, month, department) = snapshot_key_columns(key);
        let row = sqlx::query_scalar::<_, Json<AnalyticsSnapshot>>(
            r#"
            SELECT payload
            FROM analytics_snapshots
            WHERE year = ? AND month = ? AND department = ?
            "#,
        )
        .bind(year)
        .bind(month)
        .bind(department)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|json| json.0))
    }

    async fn upsert_snapshot(&self, snapshot: &AnalyticsSnapshot) -> StoreResult<()> {
        let key = snapshot.key();
        let (year, month, department) = snapshot_key_columns(&key);
        sqlx::query(
            r#"
            INSERT INTO analytics_snapshots (year, month, department, payload, computed_at)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE payload = VALUES(payload), computed_at = VALUES(computed_at)
            "#,
        )
        .bind(year)
        .bind(month)
        .bind(department)
        .bind(Json(snapshot))
        .bind(snapshot.computed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
