use crate::api::analytics::AnalyticsResponse;
use crate::api::approval::RejectRequest;
use crate::api::holiday::{HolidayList, UpcomingHolidays};
use crate::integrations::{IntegrationOutcome, IntegrationReport};
use crate::model::absence::{
    Absence, AbsenceKind, AbsenceStatus, Decision, HalfDayPeriod, NewAbsence, Substitute,
    UpdateAbsence,
};
use crate::model::analytics::{
    AnalyticsSnapshot, DepartmentStat, KindBreakdown, PeakDay, PeriodComparison, SickLeaveTrend,
    StatusBreakdown, TrendDirection,
};
use crate::model::auto_reply::{
    AutoReplyConfig, AutoReplyInput, GeneratedReplies, RecipientsInput, ReplyRecipients,
    ReplyTiming, SubstituteContact,
};
use crate::model::settings::{CompanySettings, Region, SettingsUpdate};
use crate::service::absences::{CreatedAbsence, PersonalStats, Transitioned};
use crate::utils::bridge_days::{BridgeDay, BridgeSide};
use crate::utils::conflicts::ConflictCheck;
use crate::utils::holidays::{Holiday, HolidayScope};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Absence Manager API",
        version = "1.0.0",
        description = r#"
## Absence Management

Employees request vacation, sick leave, training and parental leave; managers approve or reject.

### Key Features
- **Absences**: submit, edit while pending, cancel, personal statistics
- **Approvals**: queue of the caller's direct reports, approve / reject with reason
- **Out-of-office**: generated German auto-reply texts, calendar event and mailbox reply on approval
- **Conflicts**: warning when too many team members are away at once
- **Holidays**: German public holidays per federal state and bridge-day suggestions
- **Analytics**: monthly/yearly statistics, department comparison, sick-leave trends

### Security
Every endpoint requires a **JWT Bearer** access token. Analytics and approvals need the
manager or admin role; company settings can only be changed by admins.

### Errors
Failures return `{ "error": <kind>, "message": <text> }` where kind is one of
`validation`, `not_found`, `invalid_state`, `forbidden`, `storage`.
"#,
    ),
    paths(
        crate::api::absence::create_absence,
        crate::api::absence::list_absences,
        crate::api::absence::absence_stats,
        crate::api::absence::get_absence,
        crate::api::absence::update_absence,
        crate::api::absence::cancel_absence,

        crate::api::approval::approval_queue,
        crate::api::approval::approve_absence,
        crate::api::approval::reject_absence,

        crate::api::analytics::get_analytics,
        crate::api::analytics::department_analytics,
        crate::api::analytics::sick_trends,

        crate::api::holiday::list_holidays,
        crate::api::holiday::upcoming,
        crate::api::holiday::bridge_days,

        crate::api::settings::get_company_settings,
        crate::api::settings::update_company_settings
    ),
    components(
        schemas(
            Absence,
            AbsenceKind,
            AbsenceStatus,
            HalfDayPeriod,
            Decision,
            Substitute,
            NewAbsence,
            UpdateAbsence,
            AutoReplyConfig,
            AutoReplyInput,
            RecipientsInput,
            ReplyRecipients,
            ReplyTiming,
            GeneratedReplies,
            SubstituteContact,
            CreatedAbsence,
            Transitioned,
            PersonalStats,
            ConflictCheck,
            IntegrationReport,
            IntegrationOutcome,
            RejectRequest,
            AnalyticsResponse,
            AnalyticsSnapshot,
            KindBreakdown,
            StatusBreakdown,
            PeriodComparison,
            PeakDay,
            DepartmentStat,
            SickLeaveTrend,
            TrendDirection,
            Holiday,
            HolidayScope,
            HolidayList,
            UpcomingHolidays,
            BridgeDay,
            BridgeSide,
            CompanySettings,
            SettingsUpdate,
            Region
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Absence", description = "Absence requests of the caller"),
        (name = "Approval", description = "Manager decisions on pending absences"),
        (name = "Analytics", description = "Absence statistics"),
        (name = "Holiday", description = "Public holidays and bridge days"),
        (name = "Settings", description = "Company absence policy"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
