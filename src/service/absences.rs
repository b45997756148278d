//! Absence lifecycle: submission, owner edits, approval, rejection and
//! cancellation, plus the read paths around them.
//!
//! ```text
//! create ──> pending ──approve──> approved ──cancel──> cancelled
//!   │          │  └──reject───> rejected
//!   │          └──cancel──────> cancelled
//!   └─(sick)─> approved
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    integrations::{
        IntegrationError, IntegrationOutcome, IntegrationReport, Integrations, OutOfOfficeEvent,
        auto_reply::map_auto_reply,
    },
    model::{
        absence::{
            Absence, AbsenceKind, AbsenceStatus, Decision, HalfDayPeriod, NewAbsence,
            UpdateAbsence,
        },
        auto_reply::AutoReplyInput,
        role::Role,
        user::{User, VacationBalance},
    },
    service::{
        settings::SettingsService,
        validation::{
            Period, resolve_auto_reply, validate_period, validate_reason, validate_substitute,
        },
    },
    store::{AbsenceFilter, AbsenceStore, ListOrder, UserFilter, UserStore, VacationDebit},
    utils::{
        auto_reply::user_signature,
        conflicts::{ConflictCheck, check_conflicts, warning_message},
        dates::{format_date, working_days_between},
    },
};

pub const DEFAULT_REJECTION_REASON: &str = "Keine Begründung angegeben";
pub const LIST_LIMIT: u32 = 100;
const UPCOMING_LIMIT: u32 = 5;

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedAbsence {
    pub absence: Absence,
    pub conflict: ConflictCheck,
    #[schema(nullable = true)]
    pub warning: Option<String>,
    pub integrations: IntegrationReport,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Transitioned {
    pub absence: Absence,
    pub integrations: IntegrationReport,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PersonalStats {
    pub total: u32,
    pub pending: u32,
    pub approved: u32,
    pub vacation: VacationBalance,
    pub upcoming: Vec<Absence>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Another user's absences; managers and admins only
    pub user_id: Option<String>,
    pub status: Option<AbsenceStatus>,
}

pub struct AbsenceService {
    absences: Arc<dyn AbsenceStore>,
    users: Arc<dyn UserStore>,
    settings: Arc<SettingsService>,
    integrations: Integrations,
}

impl AbsenceService {
    pub fn new(
        absences: Arc<dyn AbsenceStore>,
        users: Arc<dyn UserStore>,
        settings: Arc<SettingsService>,
        integrations: Integrations,
    ) -> Self {
        Self {
            absences,
            users,
            settings,
            integrations,
        }
    }

    async fn load_user(&self, id: &str) -> AppResult<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("user", id))
    }

    async fn load_absence(&self, id: &str) -> AppResult<Absence> {
        self.absences
            .find_absence(id)
            .await?
            .ok_or_else(|| AppError::not_found("absence", id))
    }

    /// Colleagues sharing the requester's manager, else their department.
    async fn team_ids(&self, requester: &User) -> AppResult<Vec<String>> {
        let filter = match (&requester.manager_id, &requester.department) {
            (Some(manager_id), _) => UserFilter {
                manager_id: Some(manager_id.clone()),
                active_only: true,
                ..Default::default()
            },
            (None, Some(department)) => UserFilter {
                department: Some(department.clone()),
                active_only: true,
                ..Default::default()
            },
            (None, None) => return Ok(Vec::new()),
        };
        Ok(self
            .users
            .list_users(&filter)
            .await?
            .into_iter()
            .map(|u| u.id)
            .filter(|id| *id != requester.id)
            .collect())
    }

    async fn assess_conflicts(
        &self,
        requester: &User,
        period: &Period,
        max_concurrent: u32,
    ) -> AppResult<ConflictCheck> {
        let team = self.team_ids(requester).await?;
        let overlapping = self
            .absences
            .list_absences(&AbsenceFilter {
                user_ids: Some(team),
                statuses: Some(AbsenceFilter::active()),
                overlapping: Some((period.start, period.end)),
                ..Default::default()
            })
            .await?;
        Ok(check_conflicts(
            period.start,
            period.end,
            &overlapping,
            max_concurrent,
            Some(&requester.id),
        ))
    }

    /// Persisted manager first, directory second. Directory trouble means
    /// "no manager known".
    async fn manager_id_of(&self, user: &User) -> Option<String> {
        if let Some(id) = &user.manager_id {
            return Some(id.clone());
        }
        match self.integrations.directory.manager_of(&user.id).await {
            Ok(manager) => manager.map(|m| m.id),
            Err(IntegrationError::NotConfigured(_)) => None,
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user.id, "Manager lookup failed");
                None
            }
        }
    }

    async fn require_approver(&self, actor: &AuthUser, absence: &Absence) -> AppResult<()> {
        if actor.role == Role::Admin {
            return Ok(());
        }
        if let Some(requester) = self.users.find_user(&absence.user_id).await? {
            if self.manager_id_of(&requester).await.as_deref() == Some(actor.user_id.as_str()) {
                return Ok(());
            }
        }
        Err(AppError::Forbidden(
            "Only the requester's manager or an admin may decide on this absence".into(),
        ))
    }

    fn signature_of(user: &User) -> String {
        user_signature(
            &user.name,
            &user.email,
            user.job_title.as_deref(),
            user.department.as_deref(),
            None,
        )
    }

    pub async fn create(&self, actor: &AuthUser, request: NewAbsence) -> AppResult<CreatedAbsence> {
        let period = validate_period(
            request.start_date,
            request.end_date,
            request.is_half_day,
            request.half_day_period,
        )?;
        let total_days = working_days_between(period.start, period.end, period.is_half_day);
        if total_days == 0.0 {
            return Err(AppError::Validation(
                "The requested range contains no working days".into(),
            ));
        }
        let reason = validate_reason(request.reason)?;
        let substitute = validate_substitute(request.substitute_email, request.substitute_tasks)?;

        let requester = self.load_user(&actor.user_id).await?;
        let settings = self.settings.current().await?;
        let signature = Self::signature_of(&requester);
        let auto_reply = resolve_auto_reply(
            request.auto_reply,
            &period,
            &requester.name,
            Some(&signature),
        )?;
        let conflict = self
            .assess_conflicts(&requester, &period, settings.max_concurrent_absences)
            .await?;

        let now = Utc::now();
        let absence = Absence {
            id: Uuid::new_v4().to_string(),
            user_id: requester.id.clone(),
            user_email: requester.email.clone(),
            user_name: requester.name.clone(),
            kind: request.kind,
            start_date: period.start,
            end_date: period.end,
            is_half_day: period.is_half_day,
            half_day_period: period.half_day_period,
            total_days,
            status: if request.kind == AbsenceKind::Sick {
                AbsenceStatus::Approved
            } else {
                AbsenceStatus::Pending
            },
            reason,
            decision: None,
            substitute,
            auto_reply,
            conflict_warning: conflict.has_conflict,
            created_at: now,
            updated_at: now,
        };
        self.absences.insert_absence(&absence).await?;
        tracing::info!(
            absence_id = %absence.id,
            user_id = %absence.user_id,
            kind = %absence.kind,
            status = %absence.status,
            total_days,
            conflict = conflict.has_conflict,
            "Absence created"
        );

        let mut integrations = IntegrationReport::default();
        if absence.kind != AbsenceKind::Sick && settings.notify_manager_on_request {
            if let Some(manager_id) = self.manager_id_of(&requester).await {
                let message = request_message(&absence);
                let result = self.integrations.notifier.notify(&manager_id, &message).await;
                integrations.notification = IntegrationOutcome::from_result("notify manager", result);
            }
        }

        let warning = warning_message(&conflict);
        Ok(CreatedAbsence {
            absence,
            conflict,
            warning,
            integrations,
        })
    }

    pub async fn get(&self, actor: &AuthUser, id: &str) -> AppResult<Absence> {
        let absence = self.load_absence(id).await?;
        if absence.user_id != actor.user_id && !actor.role.can_review() {
            return Err(AppError::Forbidden(
                "You may only view your own absences".into(),
            ));
        }
        Ok(absence)
    }

    pub async fn list(&self, actor: &AuthUser, query: ListQuery) -> AppResult<Vec<Absence>> {
        let user_id = match query.user_id {
            Some(other) if other != actor.user_id && !actor.role.can_review() => {
                return Err(AppError::Forbidden(
                    "You may only list your own absences".into(),
                ));
            }
            Some(other) => other,
            None => actor.user_id.clone(),
        };
        let absences = self
            .absences
            .list_absences(&AbsenceFilter {
                user_ids: Some(vec![user_id]),
                statuses: query.status.map(|s| vec![s]),
                order: ListOrder::NewestFirst,
                limit: Some(LIST_LIMIT),
                ..Default::default()
            })
            .await?;
        Ok(absences)
    }

    /// Owner edit of a pending absence through the `UpdateAbsence` whitelist.
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: &str,
        changes: UpdateAbsence,
    ) -> AppResult<Absence> {
        let current = self.load_absence(id).await?;
        if current.user_id != actor.user_id {
            return Err(AppError::Forbidden(
                "Only the requester may edit an absence".into(),
            ));
        }
        if current.status != AbsenceStatus::Pending {
            return Err(AppError::InvalidState {
                id: current.id,
                status: current.status,
                action: "edit",
            });
        }
        if changes.kind == Some(AbsenceKind::Sick) {
            return Err(AppError::Validation(
                "Sick leave must be reported as a new absence".into(),
            ));
        }

        let is_half_day = changes.is_half_day.unwrap_or(current.is_half_day);
        let half_day_period = match changes.half_day_period {
            Some(period) => Some(period),
            None if is_half_day => current.half_day_period,
            None => None,
        };
        let period = validate_period(
            changes.start_date.unwrap_or(current.start_date),
            changes.end_date.unwrap_or(current.end_date),
            is_half_day,
            half_day_period,
        )?;
        let total_days = working_days_between(period.start, period.end, period.is_half_day);
        if total_days == 0.0 {
            return Err(AppError::Validation(
                "The requested range contains no working days".into(),
            ));
        }

        let reason = match changes.reason {
            Some(reason) => validate_reason(Some(reason))?,
            None => current.reason.clone(),
        };
        let substitute = if changes.substitute_email.is_some() || changes.substitute_tasks.is_some() {
            let existing = current.substitute.as_ref();
            validate_substitute(
                changes
                    .substitute_email
                    .or_else(|| existing.map(|s| s.email.clone())),
                changes
                    .substitute_tasks
                    .or_else(|| existing.and_then(|s| s.tasks.clone())),
            )?
        } else {
            current.substitute.clone()
        };

        let requester = self.load_user(&current.user_id).await?;
        let signature = Self::signature_of(&requester);
        let auto_reply_input = changes
            .auto_reply
            .unwrap_or_else(|| AutoReplyInput::from(&current.auto_reply));
        let auto_reply = resolve_auto_reply(
            Some(auto_reply_input),
            &period,
            &requester.name,
            Some(&signature),
        )?;
        let settings = self.settings.current().await?;
        let conflict = self
            .assess_conflicts(&requester, &period, settings.max_concurrent_absences)
            .await?;

        let updated = Absence {
            kind: changes.kind.unwrap_or(current.kind),
            start_date: period.start,
            end_date: period.end,
            is_half_day: period.is_half_day,
            half_day_period: period.half_day_period,
            total_days,
            reason,
            substitute,
            auto_reply,
            conflict_warning: conflict.has_conflict,
            updated_at: Utc::now(),
            ..current
        };

        if !self.absences.update_pending(&updated).await? {
            let latest = self.load_absence(id).await?;
            return Err(AppError::InvalidState {
                id: latest.id,
                status: latest.status,
                action: "edit",
            });
        }
        tracing::info!(absence_id = %updated.id, "Absence updated");
        Ok(updated)
    }

    pub async fn approve(&self, actor: &AuthUser, id: &str) -> AppResult<Transitioned> {
        let absence = self.load_absence(id).await?;
        self.require_approver(actor, &absence).await?;
        ensure_pending(&absence, "approve")?;

        let decision = Decision {
            approver_id: actor.user_id.clone(),
            approver_email: actor.email.clone(),
            decided_at: Utc::now(),
            rejection_reason: None,
        };
        let debit = (absence.kind == AbsenceKind::Vacation).then(|| VacationDebit {
            user_id: absence.user_id.clone(),
            days: absence.total_days,
        });
        self.decide(&absence, AbsenceStatus::Approved, &decision, debit.as_ref(), "approve")
            .await?;

        let approved = Absence {
            status: AbsenceStatus::Approved,
            updated_at: decision.decided_at,
            decision: Some(decision),
            ..absence
        };
        tracing::info!(
            absence_id = %approved.id,
            approver_id = %actor.user_id,
            debited_days = debit.as_ref().map(|d| d.days).unwrap_or(0.0),
            "Absence approved"
        );

        let integrations = self.after_approval(&approved).await;
        Ok(Transitioned {
            absence: approved,
            integrations,
        })
    }

    pub async fn reject(
        &self,
        actor: &AuthUser,
        id: &str,
        reason: Option<String>,
    ) -> AppResult<Transitioned> {
        let absence = self.load_absence(id).await?;
        self.require_approver(actor, &absence).await?;
        ensure_pending(&absence, "reject")?;

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
        let decision = Decision {
            approver_id: actor.user_id.clone(),
            approver_email: actor.email.clone(),
            decided_at: Utc::now(),
            rejection_reason: Some(reason),
        };
        self.decide(&absence, AbsenceStatus::Rejected, &decision, None, "reject")
            .await?;

        let rejected = Absence {
            status: AbsenceStatus::Rejected,
            updated_at: decision.decided_at,
            decision: Some(decision),
            ..absence
        };
        tracing::info!(absence_id = %rejected.id, approver_id = %actor.user_id, "Absence rejected");

        let integrations = self.after_rejection(&rejected).await;
        Ok(Transitioned {
            absence: rejected,
            integrations,
        })
    }

    /// Owner cancellation. Status only; a debited vacation balance is not
    /// restored.
    pub async fn cancel(&self, actor: &AuthUser, id: &str) -> AppResult<Absence> {
        let absence = self.load_absence(id).await?;
        if absence.user_id != actor.user_id {
            return Err(AppError::Forbidden(
                "Only the requester may cancel an absence".into(),
            ));
        }
        if !absence.status.is_active() {
            return Err(AppError::InvalidState {
                id: absence.id,
                status: absence.status,
                action: "cancel",
            });
        }

        let now = Utc::now();
        if !self.absences.cancel(id, now).await? {
            let latest = self.load_absence(id).await?;
            return Err(AppError::InvalidState {
                id: latest.id,
                status: latest.status,
                action: "cancel",
            });
        }
        if absence.status == AbsenceStatus::Approved && absence.kind == AbsenceKind::Vacation {
            tracing::warn!(
                absence_id = %absence.id,
                days = absence.total_days,
                "Approved vacation cancelled; balance is not restored"
            );
        }
        tracing::info!(absence_id = %absence.id, "Absence cancelled");

        Ok(Absence {
            status: AbsenceStatus::Cancelled,
            updated_at: now,
            ..absence
        })
    }

    /// Pending absences the actor may decide on, oldest first.
    pub async fn approval_queue(&self, actor: &AuthUser) -> AppResult<Vec<Absence>> {
        let user_ids = match actor.role {
            Role::Admin => None,
            Role::Employee => {
                return Err(AppError::Forbidden(
                    "Only managers and admins have an approval queue".into(),
                ));
            }
            Role::Manager => Some(self.report_ids(&actor.user_id).await?),
        };
        let pending = self
            .absences
            .list_absences(&AbsenceFilter {
                user_ids,
                statuses: Some(vec![AbsenceStatus::Pending]),
                order: ListOrder::OldestFirst,
                ..Default::default()
            })
            .await?;
        Ok(pending)
    }

    async fn report_ids(&self, manager_id: &str) -> AppResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .users
            .list_users(&UserFilter {
                manager_id: Some(manager_id.to_string()),
                ..Default::default()
            })
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();
        match self.integrations.directory.direct_reports(manager_id).await {
            Ok(reports) => ids.extend(reports.into_iter().map(|r| r.id)),
            Err(IntegrationError::NotConfigured(_)) => {}
            Err(e) => tracing::warn!(error = %e, manager_id, "Direct report lookup failed"),
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    pub async fn personal_stats(&self, actor: &AuthUser, today: NaiveDate) -> AppResult<PersonalStats> {
        let user = self.load_user(&actor.user_id).await?;
        let all = self
            .absences
            .list_absences(&AbsenceFilter {
                user_ids: Some(vec![user.id.clone()]),
                ..Default::default()
            })
            .await?;
        let count = |status: AbsenceStatus| all.iter().filter(|a| a.status == status).count() as u32;

        let upcoming = self
            .absences
            .list_absences(&AbsenceFilter {
                user_ids: Some(vec![user.id.clone()]),
                statuses: Some(vec![AbsenceStatus::Approved]),
                starts_on_or_after: Some(today),
                order: ListOrder::OldestFirst,
                limit: Some(UPCOMING_LIMIT),
                ..Default::default()
            })
            .await?;

        Ok(PersonalStats {
            total: all.len() as u32,
            pending: count(AbsenceStatus::Pending),
            approved: count(AbsenceStatus::Approved),
            vacation: user.vacation,
            upcoming,
        })
    }

    async fn decide(
        &self,
        absence: &Absence,
        status: AbsenceStatus,
        decision: &Decision,
        debit: Option<&VacationDebit>,
        action: &'static str,
    ) -> AppResult<()> {
        if self
            .absences
            .decide(&absence.id, status, decision, debit)
            .await?
        {
            return Ok(());
        }
        // lost the race against another decision
        let latest = self.load_absence(&absence.id).await?;
        Err(AppError::InvalidState {
            id: latest.id,
            status: latest.status,
            action,
        })
    }

    async fn after_approval(&self, absence: &Absence) -> IntegrationReport {
        let mut report = IntegrationReport::default();

        let event = out_of_office_event(absence);
        let result = self
            .integrations
            .calendar
            .create_out_of_office(&absence.user_id, &event)
            .await;
        report.calendar_event = IntegrationOutcome::from_result("calendar event", result);

        if absence.auto_reply.enabled {
            let setting = map_auto_reply(
                &absence.auto_reply,
                absence.start_date,
                absence.end_date,
                &absence.user_name,
            );
            let result = self
                .integrations
                .auto_reply
                .apply(&absence.user_id, &setting)
                .await;
            report.auto_reply = IntegrationOutcome::from_result("auto-reply", result);
        }

        match self.settings.current().await {
            Ok(settings) if settings.notify_user_on_approval => {
                let result = self
                    .integrations
                    .notifier
                    .notify(&absence.user_id, &decision_message(absence))
                    .await;
                report.notification = IntegrationOutcome::from_result("notify requester", result);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, absence_id = %absence.id, "Settings unavailable after approval");
                report.notification = IntegrationOutcome::Failed(e.to_string());
            }
        }

        report
    }

    // The rejection is committed; nothing here may fail the call.
    async fn after_rejection(&self, absence: &Absence) -> IntegrationReport {
        let mut report = IntegrationReport::default();
        match self.settings.current().await {
            Ok(settings) if settings.notify_user_on_approval => {
                let result = self
                    .integrations
                    .notifier
                    .notify(&absence.user_id, &decision_message(absence))
                    .await;
                report.notification = IntegrationOutcome::from_result("notify requester", result);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, absence_id = %absence.id, "Settings unavailable after rejection");
                report.notification = IntegrationOutcome::Failed(e.to_string());
            }
        }
        report
    }
}

fn ensure_pending(absence: &Absence, action: &'static str) -> AppResult<()> {
    if absence.status == AbsenceStatus::Pending {
        return Ok(());
    }
    Err(AppError::InvalidState {
        id: absence.id.clone(),
        status: absence.status,
        action,
    })
}

fn at(date: NaiveDate, hour: u32) -> chrono::NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN))
}

pub fn out_of_office_event(absence: &Absence) -> OutOfOfficeEvent {
    let (start, end, all_day) = match (absence.is_half_day, absence.half_day_period) {
        (true, Some(HalfDayPeriod::Afternoon)) => {
            (at(absence.start_date, 13), at(absence.start_date, 17), false)
        }
        (true, _) => (at(absence.start_date, 8), at(absence.start_date, 12), false),
        // all-day events end at midnight after the last day
        (false, _) => (
            at(absence.start_date, 0),
            at(absence.end_date.succ_opt().unwrap_or(absence.end_date), 0),
            true,
        ),
    };
    OutOfOfficeEvent {
        subject: format!("{} - {}", absence.kind.label(), absence.user_name),
        body_html: absence
            .reason
            .clone()
            .unwrap_or_else(|| absence.kind.label().to_string()),
        start,
        end,
        all_day,
    }
}

fn span(absence: &Absence) -> String {
    format!(
        "vom {} bis {}",
        format_date(absence.start_date),
        format_date(absence.end_date)
    )
}

pub fn request_message(absence: &Absence) -> String {
    format!(
        "Neuer Antrag: {} hat {} {} beantragt ({} Tage).",
        absence.user_name,
        absence.kind.label(),
        span(absence),
        absence.total_days
    )
}

pub fn decision_message(absence: &Absence) -> String {
    match (absence.status, absence.decision.as_ref()) {
        (AbsenceStatus::Rejected, Some(decision)) => format!(
            "Ihr Antrag auf {} {} wurde abgelehnt. Grund: {}",
            absence.kind.label(),
            span(absence),
            decision
                .rejection_reason
                .as_deref()
                .unwrap_or(DEFAULT_REJECTION_REASON)
        ),
        _ => format!(
            "Ihr Antrag auf {} {} wurde genehmigt.",
            absence.kind.label(),
            span(absence)
        ),
    }
}
