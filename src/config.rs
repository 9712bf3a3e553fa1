use std::time::Duration;

pub const GMAIL_TOKEN_ENV: &str = "JOBTRACK_GMAIL_TOKEN";
pub const GMAIL_API_BASE_ENV: &str = "JOBTRACK_GMAIL_API_BASE";
pub const AUTH_TOKEN_ENV: &str = "JOBTRACK_AUTH_TOKEN";
pub const BACKEND_URL_ENV: &str = "JOBTRACK_BACKEND_URL";

pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080/api/v1";

const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_CATEGORY: &str = "primary";
const DEFAULT_MAX_MESSAGES: usize = 100;
const DEFAULT_PACE_MS: u64 = 50;
const DEFAULT_RATE_LIMIT_BACKOFF_MS: u64 = 1000;

/// Tuning for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Ids requested from the list endpoint, and the bootstrap/fallback slice size.
    pub page_size: usize,
    pub category: String,
    /// Cap on retained messages.
    pub max_messages: usize,
    /// Pause between consecutive detail requests.
    pub pace: Duration,
    /// Pause after a rate-limited detail request.
    pub rate_limit_backoff: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            category: DEFAULT_CATEGORY.to_string(),
            max_messages: DEFAULT_MAX_MESSAGES,
            pace: Duration::from_millis(DEFAULT_PACE_MS),
            rate_limit_backoff: Duration::from_millis(DEFAULT_RATE_LIMIT_BACKOFF_MS),
        }
    }
}

pub fn gmail_api_base() -> String {
    env_or(GMAIL_API_BASE_ENV, DEFAULT_GMAIL_API_BASE)
}

pub fn backend_url() -> String {
    env_or(BACKEND_URL_ENV, DEFAULT_BACKEND_URL)
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Drop trailing slashes so paths can be appended with `format!("{base}/...")`.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{env_or, normalize_base_url, IngestConfig};

    #[test]
    fn ingest_defaults_match_dashboard_behaviour() {
        let config = IngestConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.category, "primary");
        assert_eq!(config.max_messages, 100);
        assert_eq!(config.pace, Duration::from_millis(50));
        assert_eq!(config.rate_limit_backoff, Duration::from_millis(1000));
    }

    #[test]
    fn blank_env_values_fall_back_to_default() {
        assert_eq!(
            env_or("JOBTRACK_TEST_UNSET_VARIABLE", "fallback"),
            "fallback"
        );
    }

    #[test]
    fn base_urls_lose_trailing_slashes() {
        assert_eq!(
            normalize_base_url(" http://localhost:8080/api/v1/ "),
            "http://localhost:8080/api/v1"
        );
    }
}
