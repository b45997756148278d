//! External collaborators: directory, calendar, mailbox auto-reply and chat.
//!
//! Every call here is best-effort. Failures are logged and reported back as an
//! [`IntegrationOutcome`] and never roll back a persisted state change.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod auto_reply;
pub mod graph;

use auto_reply::AutomaticRepliesSetting;

#[derive(Debug, Display)]
pub enum IntegrationError {
    #[display(fmt = "{} integration is not configured", _0)]
    NotConfigured(&'static str),
    #[display(fmt = "request failed: {}", _0)]
    Http(reqwest::Error),
    #[display(fmt = "token request failed: {}", _0)]
    Auth(String),
    #[display(fmt = "{} returned {}: {}", operation, status, body)]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },
}

impl std::error::Error for IntegrationError {}

impl From<reqwest::Error> for IntegrationError {
    fn from(e: reqwest::Error) -> Self {
        IntegrationError::Http(e)
    }
}

/// A person as the directory knows them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    pub display_name: Option<String>,
    pub mail: Option<String>,
}

/// All-day or half-day out-of-office block on the absent person's calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct OutOfOfficeEvent {
    pub subject: String,
    pub body_html: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub all_day: bool,
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn manager_of(&self, user_id: &str) -> Result<Option<DirectoryUser>, IntegrationError>;

    async fn direct_reports(&self, manager_id: &str) -> Result<Vec<DirectoryUser>, IntegrationError>;
}

#[async_trait]
pub trait CalendarSync: Send + Sync {
    async fn create_out_of_office(
        &self,
        user_id: &str,
        event: &OutOfOfficeEvent,
    ) -> Result<(), IntegrationError>;
}

#[async_trait]
pub trait AutoReplyService: Send + Sync {
    async fn apply(
        &self,
        user_id: &str,
        setting: &AutomaticRepliesSetting,
    ) -> Result<(), IntegrationError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient_id: &str, message: &str) -> Result<(), IntegrationError>;
}

/// What happened to one best-effort side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationOutcome {
    Delivered,
    /// Not applicable, switched off, or no integration configured
    Skipped,
    Failed(String),
}

impl IntegrationOutcome {
    /// Folds a call result into an outcome, logging failures.
    pub fn from_result(operation: &str, result: Result<(), IntegrationError>) -> Self {
        match result {
            Ok(()) => IntegrationOutcome::Delivered,
            Err(IntegrationError::NotConfigured(_)) => IntegrationOutcome::Skipped,
            Err(e) => {
                tracing::warn!(error = %e, operation, "Integration call failed");
                IntegrationOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Side effects attempted after a state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IntegrationReport {
    pub calendar_event: IntegrationOutcome,
    pub auto_reply: IntegrationOutcome,
    pub notification: IntegrationOutcome,
}

impl Default for IntegrationReport {
    fn default() -> Self {
        Self {
            calendar_event: IntegrationOutcome::Skipped,
            auto_reply: IntegrationOutcome::Skipped,
            notification: IntegrationOutcome::Skipped,
        }
    }
}

/// Stand-in used when no directory tenant is configured.
pub struct Disabled;

#[async_trait]
impl Directory for Disabled {
    async fn manager_of(&self, _: &str) -> Result<Option<DirectoryUser>, IntegrationError> {
        Err(IntegrationError::NotConfigured("directory"))
    }

    async fn direct_reports(&self, _: &str) -> Result<Vec<DirectoryUser>, IntegrationError> {
        Err(IntegrationError::NotConfigured("directory"))
    }
}

#[async_trait]
impl CalendarSync for Disabled {
    async fn create_out_of_office(&self, _: &str, _: &OutOfOfficeEvent) -> Result<(), IntegrationError> {
        Err(IntegrationError::NotConfigured("calendar"))
    }
}

#[async_trait]
impl AutoReplyService for Disabled {
    async fn apply(&self, _: &str, _: &AutomaticRepliesSetting) -> Result<(), IntegrationError> {
        Err(IntegrationError::NotConfigured("auto-reply"))
    }
}

#[async_trait]
impl Notifier for Disabled {
    async fn notify(&self, _: &str, _: &str) -> Result<(), IntegrationError> {
        Err(IntegrationError::NotConfigured("chat"))
    }
}

/// The set of collaborators handed to the absence workflow.
#[derive(Clone)]
pub struct Integrations {
    pub directory: Arc<dyn Directory>,
    pub calendar: Arc<dyn CalendarSync>,
    pub auto_reply: Arc<dyn AutoReplyService>,
    pub notifier: Arc<dyn Notifier>,
}

impl Integrations {
    pub fn disabled() -> Self {
        let disabled = Arc::new(Disabled);
        Self {
            directory: disabled.clone(),
            calendar: disabled.clone(),
            auto_reply: disabled.clone(),
            notifier: disabled,
        }
    }

    /// One client serving all four roles.
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: Directory + CalendarSync + AutoReplyService + Notifier + 'static,
    {
        Self {
            directory: client.clone(),
            calendar: client.clone(),
            auto_reply: client.clone(),
            notifier: client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_configured_counts_as_skipped() {
        let outcome = IntegrationOutcome::from_result(
            "calendar",
            Err(IntegrationError::NotConfigured("calendar")),
        );
        assert_eq!(outcome, IntegrationOutcome::Skipped);
    }

    #[test]
    fn api_errors_surface_in_the_report() {
        let outcome = IntegrationOutcome::from_result(
            "chat",
            Err(IntegrationError::Api {
                operation: "send notification",
                status: 403,
                body: "Forbidden".into(),
            }),
        );
        assert_eq!(
            outcome,
            IntegrationOutcome::Failed("send notification returned 403: Forbidden".into())
        );
    }
}
