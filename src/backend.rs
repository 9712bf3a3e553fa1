//! Client for the job-tracker backend that stores analyzed applications.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config;
use crate::connectors::redact_response_body;
use crate::models::{Application, ApplicationUpdate, StoredEmail, User};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: status={status} body={body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub message: String,
}

// Some endpoints wrap their payload in `{ "data": ... }`, others return it bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(value) => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl BackendClient {
    /// Client for `JOBTRACK_BACKEND_URL`, or the local default.
    pub fn new(auth_token: Option<String>) -> Self {
        Self::with_base_url(&config::backend_url(), auth_token)
    }

    pub fn with_base_url(base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: config::normalize_base_url(base_url),
            auth_token: auth_token.filter(|token| !token.trim().is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn current_user(&self) -> Result<User, BackendError> {
        self.send(self.client.get(self.url("/auth/me"))).await
    }

    pub async fn fetch_applications(&self) -> Result<Vec<Application>, BackendError> {
        let applications: Vec<Application> = self
            .send(self.client.get(self.url("/gmail/applications")))
            .await?;
        debug!("backend returned {} applications", applications.len());
        Ok(applications)
    }

    pub async fn update_application(
        &self,
        id: &str,
        update: &ApplicationUpdate,
    ) -> Result<Application, BackendError> {
        let request = self
            .client
            .patch(self.url(&format!("/gmail/applications/{id}")))
            .json(update);
        self.send(request).await
    }

    pub async fn fetch_emails(&self) -> Result<Vec<StoredEmail>, BackendError> {
        self.send(self.client.get(self.url("/gmail/emails"))).await
    }

    /// Ask the backend to analyze the mailbox server-side.
    pub async fn analyze(&self) -> Result<AnalyzeResponse, BackendError> {
        self.send(self.client.post(self.url("/gmail/analyze"))).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let request = match self.auth_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.header("accept", "application/json").send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: redact_response_body(&body),
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        Ok(envelope.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::{BackendClient, BackendError};
    use crate::models::{ApplicationStatus, ApplicationUpdate};

    fn application_json(id: &str, status: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "company": "Acme",
            "role": "Engineer",
            "location": "Remote",
            "date": "2026-02-01",
            "status": status,
            "emailIds": ["m1"]
        })
    }

    #[tokio::test]
    async fn fetch_applications_accepts_bare_arrays() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/applications"))
            .and(header("authorization", "Bearer session"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([application_json("a1", "Applied")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::with_base_url(&server.uri(), Some("session".to_string()));
        let applications = client.fetch_applications().await.expect("fetch applications");
        assert_eq!(applications.len(), 1);
        assert_eq!(applications[0].id, "a1");
        assert_eq!(applications[0].status, ApplicationStatus::Applied);
    }

    #[tokio::test]
    async fn fetch_emails_unwraps_data_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "emailId": "m1", "subject": "Interview", "date": "2026-02-02", "snippet": "Hi", "status": "Interview" }
                ]
            })))
            .mount(&server)
            .await;

        let client = BackendClient::with_base_url(&server.uri(), None);
        let emails = client.fetch_emails().await.expect("fetch emails");
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].email_id, "m1");
    }

    #[tokio::test]
    async fn requests_without_token_carry_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "email": "dev@example.com",
                "name": "Dev",
                "lastSyncTime": "2026-03-01T10:00:00Z"
            })))
            .mount(&server)
            .await;

        let client = BackendClient::with_base_url(&server.uri(), Some("   ".to_string()));
        let user = client.current_user().await.expect("current user");
        assert_eq!(user.email, "dev@example.com");
        assert_eq!(user.last_sync_time.as_deref(), Some("2026-03-01T10:00:00Z"));

        let requests: Vec<Request> = server.received_requests().await.expect("recorded requests");
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn update_application_sends_only_set_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/gmail/applications/a1"))
            .and(body_json(json!({ "status": "Offer" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": application_json("a1", "Offer") })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::with_base_url(&server.uri(), Some("session".to_string()));
        let update = ApplicationUpdate {
            status: Some(ApplicationStatus::Offer),
            ..ApplicationUpdate::default()
        };
        let updated = client
            .update_application("a1", &update)
            .await
            .expect("update application");
        assert_eq!(updated.status, ApplicationStatus::Offer);
    }

    #[tokio::test]
    async fn analyze_returns_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gmail/analyze"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "message": "Analyzed 12 emails" })),
            )
            .mount(&server)
            .await;

        let client = BackendClient::with_base_url(&format!("{}/", server.uri()), None);
        let response = client.analyze().await.expect("analyze");
        assert_eq!(response.message, "Analyzed 12 emails");
    }

    #[tokio::test]
    async fn http_errors_become_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/applications"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let client = BackendClient::with_base_url(&server.uri(), None);
        let error = client.fetch_applications().await.expect_err("unauthorized");
        match error {
            BackendError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unexpected_shapes_are_decode_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gmail/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
            .mount(&server)
            .await;

        let client = BackendClient::with_base_url(&server.uri(), None);
        let error = client.fetch_emails().await.expect_err("bad shape");
        assert!(matches!(error, BackendError::Decode(_)));
    }
}
