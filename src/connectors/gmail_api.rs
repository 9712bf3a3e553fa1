use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config;
use crate::connectors::{redact_response_body, MailApiError, MailSource};
use crate::mime;
use crate::models::{MessageDetail, NO_SUBJECT, UNKNOWN_SENDER};

#[derive(Debug, Clone)]
pub struct GmailApiConnector {
    client: Client,
    base_url: String,
}

impl Default for GmailApiConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl GmailApiConnector {
    /// Connector against the Gmail API, or `JOBTRACK_GMAIL_API_BASE` when set.
    pub fn new() -> Self {
        Self::with_base_url(&config::gmail_api_base())
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: config::normalize_base_url(base_url),
        }
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        token: &str,
        request: RequestBuilder,
    ) -> Result<T, MailApiError> {
        let response = request
            .bearer_auth(token)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MailApiError::RateLimited);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(MailApiError::Status {
                status: status.as_u16(),
                body: redact_response_body(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait(?Send)]
impl MailSource for GmailApiConnector {
    fn name(&self) -> &str {
        "gmail_api"
    }

    async fn list_recent(
        &self,
        token: &str,
        max_results: usize,
        category: &str,
    ) -> Result<Vec<String>, MailApiError> {
        let url = format!("{}/users/me/messages", self.base_url);
        let request = self.client.get(&url).query(&[
            ("maxResults", max_results.to_string()),
            ("q", format!("category:{category}")),
        ]);
        let list: GmailMessageList = self.fetch_json(token, request).await?;
        let ids: Vec<String> = list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|stub| stub.id)
            .collect();
        debug!("gmail list returned {} ids", ids.len());
        Ok(ids)
    }

    async fn get_message(
        &self,
        token: &str,
        message_id: &str,
    ) -> Result<GmailMessage, MailApiError> {
        let url = format!("{}/users/me/messages/{message_id}", self.base_url);
        let request = self.client.get(&url).query(&[("format", "full")]);
        self.fetch_json(token, request).await
    }
}

/// Build the display record for a fetched message.
///
/// `id` is the identifier from the list response, not the detail body.
pub fn map_message_to_detail(id: &str, message: &GmailMessage) -> MessageDetail {
    let snippet = message.snippet.clone().unwrap_or_default();
    let payload = message.payload.as_ref();

    let header = |name: &str| payload.and_then(|payload| extract_header(payload, name));

    let body = payload
        .map(|payload| mime::extract_body(payload, &snippet))
        .unwrap_or_else(|| snippet.clone());

    MessageDetail {
        id: id.to_string(),
        subject: header("Subject").unwrap_or_else(|| NO_SUBJECT.to_string()),
        from: header("From").unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
        date: header("Date").unwrap_or_default(),
        snippet,
        body,
    }
}

fn extract_header(payload: &GmailPayload, name: &str) -> Option<String> {
    payload
        .headers
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
        .filter(|value| !value.is_empty())
}

// --- Gmail API response types ---

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
struct GmailMessageList {
    messages: Option<Vec<GmailMessageStub>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
    #[serde(rename = "resultSizeEstimate")]
    result_size_estimate: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
struct GmailMessageStub {
    id: String,
    #[serde(rename = "threadId")]
    thread_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GmailMessage {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    pub snippet: Option<String>,
    pub payload: Option<GmailPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GmailPayload {
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub headers: Option<Vec<GmailHeader>>,
    pub body: Option<GmailBody>,
    pub parts: Option<Vec<GmailPayload>>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GmailHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GmailBody {
    pub size: Option<u64>,
    pub data: Option<String>,
    #[serde(rename = "attachmentId")]
    pub attachment_id: Option<String>,
}
