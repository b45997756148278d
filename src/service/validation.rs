//! Boundary checks for absence requests. Everything here either returns a
//! normalised value or a `Validation` error.

use chrono::{NaiveDate, NaiveTime};

use crate::{
    error::{AppError, AppResult},
    model::{
        absence::{HalfDayPeriod, Substitute},
        auto_reply::{
            AutoReplyConfig, AutoReplyInput, ReplyRecipients, ReplyTiming, SubstituteContact,
        },
    },
    utils::auto_reply::{ReplyContext, generate_replies},
};

pub const MAX_REASON_LEN: usize = 500;
pub const MAX_TASKS_LEN: usize = 1000;
pub const MAX_SUBSTITUTE_NAME_LEN: usize = 100;
pub const MAX_PHONE_LEN: usize = 20;

/// Normalised date range of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub is_half_day: bool,
    pub half_day_period: Option<HalfDayPeriod>,
}

pub fn validate_period(
    start: NaiveDate,
    end: NaiveDate,
    is_half_day: bool,
    half_day_period: Option<HalfDayPeriod>,
) -> AppResult<Period> {
    if end < start {
        return Err(AppError::Validation(
            "end_date must not be before start_date".into(),
        ));
    }
    if !is_half_day && half_day_period.is_some() {
        return Err(AppError::Validation(
            "half_day_period is only allowed for half-day absences".into(),
        ));
    }
    if is_half_day && start != end {
        return Err(AppError::Validation(
            "a half-day absence must start and end on the same day".into(),
        ));
    }

    Ok(Period {
        start,
        end,
        is_half_day,
        half_day_period: is_half_day.then(|| half_day_period.unwrap_or(HalfDayPeriod::Morning)),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_len(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_reason(reason: Option<String>) -> AppResult<Option<String>> {
    let reason = non_empty(reason);
    if let Some(reason) = &reason {
        check_len("reason", reason, MAX_REASON_LEN)?;
    }
    Ok(reason)
}

/// Syntactic check only: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

pub fn validate_substitute(
    email: Option<String>,
    tasks: Option<String>,
) -> AppResult<Option<Substitute>> {
    let tasks = non_empty(tasks);
    if let Some(tasks) = &tasks {
        check_len("substitute_tasks", tasks, MAX_TASKS_LEN)?;
    }
    let Some(email) = non_empty(email) else {
        return Ok(None);
    };
    if !is_valid_email(&email) {
        return Err(AppError::Validation(format!(
            "Invalid substitute email: {email}"
        )));
    }
    Ok(Some(Substitute {
        email,
        tasks,
        notified: false,
    }))
}

pub fn parse_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AppError::Validation(format!("Invalid time {value:?}, expected HH:MM")))
}

fn validate_contact(contact: SubstituteContact) -> AppResult<SubstituteContact> {
    let name = contact.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("substitute name is required".into()));
    }
    check_len("substitute name", &name, MAX_SUBSTITUTE_NAME_LEN)?;

    let email = contact.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(AppError::Validation(format!(
            "Invalid substitute email: {email}"
        )));
    }

    let phone = non_empty(contact.phone);
    if let Some(phone) = &phone {
        check_len("substitute phone", phone, MAX_PHONE_LEN)?;
    }

    Ok(SubstituteContact { name, email, phone })
}

/// Applies defaults to caller-supplied auto-reply settings and renders the
/// reply texts. A disabled config is stored as-is without messages.
pub fn resolve_auto_reply(
    input: Option<AutoReplyInput>,
    period: &Period,
    user_name: &str,
    signature: Option<&str>,
) -> AppResult<AutoReplyConfig> {
    let input = input.unwrap_or_default();
    let enabled = input.enabled.unwrap_or(true);
    let defaults = ReplyRecipients::default();
    let recipients = input
        .recipients
        .map(|r| ReplyRecipients {
            internal: r.internal.unwrap_or(defaults.internal),
            external: r.external.unwrap_or(defaults.external),
        })
        .unwrap_or(defaults);

    if !enabled {
        return Ok(AutoReplyConfig {
            enabled,
            has_substitute: input.has_substitute.unwrap_or(false),
            substitute: input.substitute,
            recipients,
            timing: ReplyTiming {
                activate_immediately: input.activate_immediately.unwrap_or(false),
                scheduled_date: period.start,
                scheduled_time: NaiveTime::MIN,
            },
            messages: None,
        });
    }

    let has_substitute = input.has_substitute.unwrap_or(false);
    let substitute = match (has_substitute, input.substitute) {
        (true, Some(contact)) => Some(validate_contact(contact)?),
        (true, None) => {
            return Err(AppError::Validation(
                "substitute name and email are required when has_substitute is set".into(),
            ));
        }
        (false, contact) => contact,
    };
    let scheduled_time = match input.scheduled_time.as_deref() {
        Some(value) => parse_time(value)?,
        None => NaiveTime::MIN,
    };

    let mut config = AutoReplyConfig {
        enabled,
        has_substitute,
        substitute,
        recipients,
        timing: ReplyTiming {
            activate_immediately: input.activate_immediately.unwrap_or(false),
            scheduled_date: period.start,
            scheduled_time,
        },
        messages: None,
    };
    config.messages = Some(generate_replies(&ReplyContext {
        user_name,
        start_date: period.start,
        end_date: period.end,
        substitute: config.effective_substitute(),
        signature,
    }));
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::auto_reply::RecipientsInput;
    use crate::test_support::date;

    fn full_day() -> Period {
        validate_period(date(2024, 6, 10), date(2024, 6, 14), false, None).unwrap()
    }

    #[test]
    fn rejects_inverted_range() {
        let err = validate_period(date(2024, 6, 14), date(2024, 6, 10), false, None).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn half_day_defaults_to_morning() {
        let period = validate_period(date(2024, 6, 10), date(2024, 6, 10), true, None).unwrap();
        assert_eq!(period.half_day_period, Some(HalfDayPeriod::Morning));
    }

    #[test]
    fn half_day_rules() {
        assert!(
            validate_period(date(2024, 6, 10), date(2024, 6, 11), true, None).is_err(),
            "half day spanning two dates"
        );
        assert!(
            validate_period(
                date(2024, 6, 10),
                date(2024, 6, 10),
                false,
                Some(HalfDayPeriod::Afternoon)
            )
            .is_err(),
            "period without the half-day flag"
        );
    }

    #[test]
    fn reason_is_trimmed_and_bounded() {
        assert_eq!(validate_reason(Some("   ".into())).unwrap(), None);
        assert_eq!(
            validate_reason(Some(" Familienfeier ".into())).unwrap().as_deref(),
            Some("Familienfeier")
        );
        assert!(validate_reason(Some("x".repeat(501))).is_err());
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("jane.roe@company.com"));
        assert!(!is_valid_email("jane.roe"));
        assert!(!is_valid_email("@company.com"));
        assert!(!is_valid_email("jane@company"));
        assert!(!is_valid_email("jane roe@company.com"));
    }

    #[test]
    fn substitute_requires_valid_email() {
        assert!(validate_substitute(Some("nope".into()), None).is_err());
        let sub = validate_substitute(Some("jane@company.com".into()), Some("Tickets".into()))
            .unwrap()
            .unwrap();
        assert!(!sub.notified);
        assert_eq!(validate_substitute(None, None).unwrap(), None);
    }

    #[test]
    fn omitted_auto_reply_gets_defaults_and_messages() {
        let config = resolve_auto_reply(None, &full_day(), "John Doe", None).unwrap();
        assert!(config.enabled);
        assert_eq!(config.recipients, ReplyRecipients::default());
        assert!(!config.timing.activate_immediately);
        assert_eq!(config.timing.scheduled_date, date(2024, 6, 10));
        assert_eq!(config.timing.scheduled_time, NaiveTime::MIN);
        let messages = config.messages.unwrap();
        assert!(messages.internal.contains("an mein Team"));
    }

    #[test]
    fn substitute_fields_required_when_flagged() {
        let input = AutoReplyInput {
            has_substitute: Some(true),
            ..Default::default()
        };
        assert!(resolve_auto_reply(Some(input), &full_day(), "John Doe", None).is_err());
    }

    #[test]
    fn disabled_auto_reply_skips_validation() {
        let input = AutoReplyInput {
            enabled: Some(false),
            has_substitute: Some(true),
            scheduled_time: Some("not a time".into()),
            ..Default::default()
        };
        let config = resolve_auto_reply(Some(input), &full_day(), "John Doe", None).unwrap();
        assert!(!config.enabled);
        assert!(config.messages.is_none());
    }

    #[test]
    fn explicit_recipients_and_time() {
        let input = AutoReplyInput {
            recipients: Some(RecipientsInput {
                internal: None,
                external: Some(false),
            }),
            scheduled_time: Some("08:30".into()),
            ..Default::default()
        };
        let config = resolve_auto_reply(Some(input), &full_day(), "John Doe", None).unwrap();
        assert!(config.recipients.internal);
        assert!(!config.recipients.external);
        assert_eq!(
            config.timing.scheduled_time,
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert!(parse_time("25:00").is_err());
    }
}
