use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Contact details of the colleague covering for the absent person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubstituteContact {
    #[schema(example = "Jane Roe")]
    pub name: String,
    #[schema(example = "jane.roe@company.com")]
    pub email: String,
    #[schema(example = "+49 89 1234567", nullable = true)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReplyRecipients {
    /// Colleagues inside the organisation
    pub internal: bool,
    /// Everyone outside the organisation
    pub external: bool,
}

impl Default for ReplyRecipients {
    fn default() -> Self {
        Self {
            internal: true,
            external: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReplyTiming {
    pub activate_immediately: bool,
    #[schema(value_type = String, format = "date")]
    pub scheduled_date: NaiveDate,
    #[schema(value_type = String, example = "08:00")]
    pub scheduled_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GeneratedReplies {
    pub internal: String,
    pub external: String,
}

/// Out-of-office reply configuration embedded in an absence.
///
/// When `enabled` is false none of the other fields are interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AutoReplyConfig {
    pub enabled: bool,
    pub has_substitute: bool,
    #[schema(nullable = true)]
    pub substitute: Option<SubstituteContact>,
    pub recipients: ReplyRecipients,
    pub timing: ReplyTiming,
    #[schema(nullable = true)]
    pub messages: Option<GeneratedReplies>,
}

impl AutoReplyConfig {
    /// Substitute contact that should appear in generated messages.
    pub fn effective_substitute(&self) -> Option<&SubstituteContact> {
        if self.has_substitute {
            self.substitute.as_ref()
        } else {
            None
        }
    }
}

/// Caller-supplied auto-reply settings; every field falls back to a default.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AutoReplyInput {
    pub enabled: Option<bool>,
    pub has_substitute: Option<bool>,
    pub substitute: Option<SubstituteContact>,
    pub recipients: Option<RecipientsInput>,
    pub activate_immediately: Option<bool>,
    /// `HH:MM`, defaults to midnight
    #[schema(example = "08:00")]
    pub scheduled_time: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct RecipientsInput {
    pub internal: Option<bool>,
    pub external: Option<bool>,
}

impl From<&AutoReplyConfig> for AutoReplyInput {
    /// Turns a stored config back into input so it can be re-resolved against
    /// a changed date range.
    fn from(config: &AutoReplyConfig) -> Self {
        Self {
            enabled: Some(config.enabled),
            has_substitute: Some(config.has_substitute),
            substitute: config.substitute.clone(),
            recipients: Some(RecipientsInput {
                internal: Some(config.recipients.internal),
                external: Some(config.recipients.external),
            }),
            activate_immediately: Some(config.timing.activate_immediately),
            scheduled_time: Some(config.timing.scheduled_time.format("%H:%M").to_string()),
        }
    }
}
