use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    model::auto_reply::{AutoReplyConfig, GeneratedReplies},
    utils::auto_reply::{ReplyContext, generate_replies},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoReplyStatus {
    Disabled,
    AlwaysEnabled,
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExternalAudience {
    None,
    All,
}

/// Mailbox auto-reply state as the mail service understands it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomaticRepliesSetting {
    pub status: AutoReplyStatus,
    pub internal_reply_message: Option<String>,
    pub external_reply_message: Option<String>,
    pub external_audience: ExternalAudience,
    /// Local wall-clock times, present only when scheduled
    pub scheduled_start: Option<NaiveDateTime>,
    pub scheduled_end: Option<NaiveDateTime>,
}

fn last_second() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Translates an absence's auto-reply config into a mailbox setting.
pub fn map_auto_reply(
    config: &AutoReplyConfig,
    start_date: NaiveDate,
    end_date: NaiveDate,
    user_name: &str,
) -> AutomaticRepliesSetting {
    if !config.enabled {
        return AutomaticRepliesSetting {
            status: AutoReplyStatus::Disabled,
            internal_reply_message: None,
            external_reply_message: None,
            external_audience: ExternalAudience::None,
            scheduled_start: None,
            scheduled_end: None,
        };
    }

    let GeneratedReplies { internal, external } = config.messages.clone().unwrap_or_else(|| {
        generate_replies(&ReplyContext {
            user_name,
            start_date,
            end_date,
            substitute: config.effective_substitute(),
            signature: None,
        })
    });

    let (status, scheduled_start, scheduled_end) = if config.timing.activate_immediately {
        (AutoReplyStatus::AlwaysEnabled, None, None)
    } else {
        (
            AutoReplyStatus::Scheduled,
            Some(start_date.and_time(config.timing.scheduled_time)),
            Some(end_date.and_time(last_second())),
        )
    };

    AutomaticRepliesSetting {
        status,
        internal_reply_message: config.recipients.internal.then_some(internal),
        external_reply_message: config.recipients.external.then_some(external),
        external_audience: if config.recipients.external {
            ExternalAudience::All
        } else {
            ExternalAudience::None
        },
        scheduled_start,
        scheduled_end,
    }
}

impl AutomaticRepliesSetting {
    /// `mailboxSettings` PATCH body; times are sent without offset and
    /// interpreted in `time_zone`.
    pub fn to_mailbox_patch(&self, time_zone: &str) -> Value {
        let mut setting = json!({
            "status": self.status,
            "externalAudience": self.external_audience,
        });
        if let Some(message) = &self.internal_reply_message {
            setting["internalReplyMessage"] = json!(message);
        }
        if let Some(message) = &self.external_reply_message {
            setting["externalReplyMessage"] = json!(message);
        }
        if let (Some(start), Some(end)) = (self.scheduled_start, self.scheduled_end) {
            setting["scheduledStartDateTime"] = graph_time(start, time_zone);
            setting["scheduledEndDateTime"] = graph_time(end, time_zone);
        }
        json!({ "automaticRepliesSetting": setting })
    }
}

pub fn graph_time(at: NaiveDateTime, time_zone: &str) -> Value {
    json!({
        "dateTime": at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "timeZone": time_zone,
    })
}
