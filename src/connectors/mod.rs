use async_trait::async_trait;
use thiserror::Error;

pub mod gmail_api;

pub use gmail_api::{GmailApiConnector, GmailBody, GmailHeader, GmailMessage, GmailPayload};

#[derive(Debug, Error)]
pub enum MailApiError {
    #[error("mail api rate limited the request")]
    RateLimited,

    #[error("mail api request failed: status={status} body={body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("decode mail api response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A mailbox that can list recent message ids and fetch single messages.
#[async_trait(?Send)]
pub trait MailSource: Send + Sync {
    fn name(&self) -> &str;

    /// Newest-first ids of the most recent messages in `category`.
    /// An empty mailbox yields an empty list.
    async fn list_recent(
        &self,
        token: &str,
        max_results: usize,
        category: &str,
    ) -> Result<Vec<String>, MailApiError>;

    async fn get_message(&self, token: &str, message_id: &str)
        -> Result<GmailMessage, MailApiError>;
}

pub(crate) fn redact_response_body(body: &str) -> String {
    const REDACTED_BODY_MAX_LEN: usize = 200;

    let trimmed = body.trim();
    if trimmed.chars().count() <= REDACTED_BODY_MAX_LEN {
        trimmed.to_string()
    } else {
        let kept: String = trimmed.chars().take(REDACTED_BODY_MAX_LEN).collect();
        format!("{kept}…[truncated {} bytes]", trimmed.len())
    }
}
