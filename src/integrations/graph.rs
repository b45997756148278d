use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::lock::Mutex;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header::AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;

use crate::integrations::{
    AutoReplyService, CalendarSync, Directory, DirectoryUser, IntegrationError, Notifier,
    OutOfOfficeEvent,
    auto_reply::{AutomaticRepliesSetting, graph_time},
};

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
const USER_SELECT: &str = "id,displayName,mail";
// refresh a little before the token actually expires
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// e.g. `https://graph.microsoft.com/v1.0`
    pub base_url: String,
    /// Client-credentials endpoint; derived from the tenant when unset
    pub token_url: Option<String>,
    /// IANA zone that calendar and mailbox times are expressed in
    pub time_zone: String,
    /// Link shown on activity notifications
    pub app_url: String,
    pub timeout: Duration,
}

impl GraphConfig {
    fn token_url(&self) -> String {
        self.token_url.clone().unwrap_or_else(|| {
            format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.tenant_id
            )
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

/// Directory, calendar, mailbox and activity-feed client using app-only
/// credentials. Owned by the composition root and shared behind an `Arc`.
pub struct GraphClient {
    http: Client,
    config: GraphConfig,
    token: Mutex<Option<CachedToken>>,
}

impl GraphClient {
    pub fn new(config: GraphConfig) -> Result<Self, IntegrationError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    pub fn time_zone(&self) -> &str {
        &self.config.time_zone
    }

    async fn access_token(&self) -> Result<String, IntegrationError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + EXPIRY_MARGIN {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Requesting directory access token");
        let response = self
            .http
            .post(self.config.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Auth(format!("{status}: {body}")));
        }

        let token: TokenResponse = response.json().await?;
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Sends an authorized request, retrying once with a fresh token on 401.
    async fn send<F>(&self, build: F) -> Result<Response, IntegrationError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.access_token().await?;
        let response = build(&self.http)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        self.invalidate_token().await;
        let token = self.access_token().await?;
        Ok(build(&self.http)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await?)
    }
}

async fn ensure_success(
    operation: &'static str,
    response: Response,
) -> Result<Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IntegrationError::Api {
        operation,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Directory for GraphClient {
    async fn manager_of(&self, user_id: &str) -> Result<Option<DirectoryUser>, IntegrationError> {
        let url = self.url(&format!("/users/{user_id}/manager"));
        let response = self
            .send(|http| http.get(&url).query(&[("$select", USER_SELECT)]))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let manager = ensure_success("get manager", response)
            .await?
            .json::<DirectoryUser>()
            .await?;
        Ok(Some(manager))
    }

    async fn direct_reports(&self, manager_id: &str) -> Result<Vec<DirectoryUser>, IntegrationError> {
        let url = self.url(&format!("/users/{manager_id}/directReports"));
        let response = self
            .send(|http| http.get(&url).query(&[("$select", USER_SELECT)]))
            .await?;
        let reports = ensure_success("list direct reports", response)
            .await?
            .json::<Collection<DirectoryUser>>()
            .await?;
        Ok(reports.value)
    }
}

#[async_trait]
impl CalendarSync for GraphClient {
    async fn create_out_of_office(
        &self,
        user_id: &str,
        event: &OutOfOfficeEvent,
    ) -> Result<(), IntegrationError> {
        let url = self.url(&format!("/users/{user_id}/calendar/events"));
        let body = json!({
            "subject": event.subject,
            "body": { "contentType": "HTML", "content": event.body_html },
            "start": graph_time(event.start, self.time_zone()),
            "end": graph_time(event.end, self.time_zone()),
            "isAllDay": event.all_day,
            "showAs": "oof",
            "categories": ["Absence"],
        });
        let response = self.send(|http| http.post(&url).json(&body)).await?;
        ensure_success("create calendar event", response).await?;
        Ok(())
    }
}

#[async_trait]
impl AutoReplyService for GraphClient {
    async fn apply(
        &self,
        user_id: &str,
        setting: &AutomaticRepliesSetting,
    ) -> Result<(), IntegrationError> {
        let url = self.url(&format!("/users/{user_id}/mailboxSettings"));
        let body = setting.to_mailbox_patch(self.time_zone());
        let response = self.send(|http| http.patch(&url).json(&body)).await?;
        ensure_success("update mailbox settings", response).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for GraphClient {
    async fn notify(&self, recipient_id: &str, message: &str) -> Result<(), IntegrationError> {
        let url = self.url(&format!(
            "/users/{recipient_id}/teamwork/sendActivityNotification"
        ));
        let body = json!({
            "topic": {
                "source": "text",
                "value": "Abwesenheiten",
                "webUrl": self.config.app_url,
            },
            "activityType": "systemDefault",
            "previewText": { "content": message },
            "templateParameters": [
                { "name": "systemDefaultText", "value": message }
            ],
        });
        let response = self.send(|http| http.post(&url).json(&body)).await?;
        ensure_success("send notification", response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::auto_reply::{AutoReplyStatus, ExternalAudience};
    use crate::test_support::date;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GraphClient {
        GraphClient::new(GraphConfig {
            tenant_id: "tenant".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            base_url: format!("{}/v1.0", server.uri()),
            token_url: Some(format!("{}/token", server.uri())),
            time_zone: "Europe/Berlin".into(),
            app_url: "http://localhost:8080".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok-1",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[actix_web::test]
    async fn token_is_reused_across_calls() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users/u1/manager"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "m1",
                "displayName": "Maria Manager",
                "mail": "maria@company.com"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let graph = client(&server);
        let first = graph.manager_of("u1").await.unwrap().unwrap();
        let second = graph.manager_of("u1").await.unwrap().unwrap();
        assert_eq!(first.id, "m1");
        assert_eq!(second.mail.as_deref(), Some("maria@company.com"));
    }

    #[actix_web::test]
    async fn missing_manager_is_none() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users/u1/manager"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(client(&server).manager_of("u1").await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn direct_reports_unwraps_collection() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/users/m1/directReports"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "id": "u1", "displayName": "John Doe", "mail": "john@company.com" },
                    { "id": "u2", "displayName": "Jane Roe", "mail": null }
                ]
            })))
            .mount(&server)
            .await;

        let reports = client(&server).direct_reports("m1").await.unwrap();
        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["u1", "u2"]);
    }

    #[actix_web::test]
    async fn mailbox_patch_sends_scheduled_setting() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("PATCH"))
            .and(path("/v1.0/users/u1/mailboxSettings"))
            .and(body_partial_json(json!({
                "automaticRepliesSetting": {
                    "status": "scheduled",
                    "externalAudience": "none",
                    "scheduledEndDateTime": {
                        "dateTime": "2024-06-14T23:59:59",
                        "timeZone": "Europe/Berlin"
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let setting = AutomaticRepliesSetting {
            status: AutoReplyStatus::Scheduled,
            internal_reply_message: Some("Guten Tag".into()),
            external_reply_message: None,
            external_audience: ExternalAudience::None,
            scheduled_start: date(2024, 6, 10).and_hms_opt(0, 0, 0),
            scheduled_end: date(2024, 6, 14).and_hms_opt(23, 59, 59),
        };
        client(&server).apply("u1", &setting).await.unwrap();
    }

    #[actix_web::test]
    async fn calendar_failure_is_reported_with_status() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1.0/users/u1/calendar/events"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Access denied"))
            .mount(&server)
            .await;

        let event = OutOfOfficeEvent {
            subject: "Urlaub - John Doe".into(),
            body_html: "<p>Urlaub</p>".into(),
            start: date(2024, 6, 10).and_hms_opt(0, 0, 0).unwrap(),
            end: date(2024, 6, 15).and_hms_opt(0, 0, 0).unwrap(),
            all_day: true,
        };
        let err = client(&server)
            .create_out_of_office("u1", &event)
            .await
            .unwrap_err();
        match err {
            IntegrationError::Api { status, body, .. } => {
                assert_eq!(status, 403);
                assert_eq!(body, "Access denied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[actix_web::test]
    async fn unauthorized_response_refreshes_token_once() {
        let server = MockServer::start().await;
        mount_token(&server, 2).await;
        Mock::given(method("POST"))
            .and(path("/v1.0/users/m1/teamwork/sendActivityNotification"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1.0/users/m1/teamwork/sendActivityNotification"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .notify("m1", "Neuer Urlaubsantrag")
            .await
            .unwrap();
    }
}
