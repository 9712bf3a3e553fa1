use anyhow::Result;

use crate::applications::ApplicationPage;
use crate::backend::AnalyzeResponse;
use crate::ingest::IngestionState;
use crate::models::{StoredEmail, User};
use crate::output::{ApplicationDetail, StatsReport};

pub fn format_inbox(state: &IngestionState) -> Result<String> {
    Ok(serde_json::to_string_pretty(state)?)
}

pub fn format_applications(page: &ApplicationPage) -> Result<String> {
    Ok(serde_json::to_string_pretty(page)?)
}

pub fn format_application(detail: &ApplicationDetail<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(detail)?)
}

pub fn format_emails(emails: &[StoredEmail]) -> Result<String> {
    Ok(serde_json::to_string_pretty(emails)?)
}

pub fn format_stats(report: &StatsReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn format_user(user: &User) -> Result<String> {
    Ok(serde_json::to_string_pretty(user)?)
}

pub fn format_analyze(response: &AnalyzeResponse) -> Result<String> {
    Ok(serde_json::to_string_pretty(response)?)
}

#[cfg(test)]
mod tests {
    use crate::ingest::IngestionState;
    use crate::models::MessageDetail;

    use super::format_inbox;

    #[test]
    fn inbox_json_keeps_field_names() {
        let state = IngestionState {
            messages: vec![MessageDetail {
                id: "m1".to_string(),
                snippet: "Hi".to_string(),
                subject: "Offer".to_string(),
                from: "hr@example.com".to_string(),
                date: "Mon, 05 Jan 2026 09:00:00 +0000".to_string(),
                body: "Hi there".to_string(),
            }],
            watermark_id: Some("m1".to_string()),
            ..IngestionState::default()
        };

        let rendered = format_inbox(&state).expect("render json");
        let value: serde_json::Value = serde_json::from_str(&rendered).expect("parse json");
        assert_eq!(value["watermark_id"], "m1");
        assert_eq!(value["messages"][0]["subject"], "Offer");
        assert_eq!(value["is_syncing"], false);
    }
}
