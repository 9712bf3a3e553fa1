pub mod json;
pub mod table;

use anyhow::Result;
use serde::Serialize;

use crate::applications::{
    ActivityBucket, ApplicationPage, ApplicationStats, StatusCount,
};
use crate::backend::AnalyzeResponse;
use crate::ingest::IngestionState;
use crate::models::{Application, StoredEmail, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Table
        }
    }
}

/// Everything the `stats` command shows for one selected year.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub summary: ApplicationStats,
    pub year: i32,
    pub monthly: Vec<ActivityBucket>,
    pub yearly: Vec<ActivityBucket>,
    pub distribution: Vec<StatusCount>,
    pub available_years: Vec<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetail<'a> {
    pub application: &'a Application,
    pub emails: Vec<&'a StoredEmail>,
}

pub fn format_inbox(format: OutputFormat, state: &IngestionState, full: bool) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_inbox(state, full)),
        OutputFormat::Json => json::format_inbox(state),
    }
}

pub fn format_applications(format: OutputFormat, page: &ApplicationPage) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_applications(page)),
        OutputFormat::Json => json::format_applications(page),
    }
}

pub fn format_application(format: OutputFormat, detail: &ApplicationDetail<'_>) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_application(detail)),
        OutputFormat::Json => json::format_application(detail),
    }
}

pub fn format_emails(format: OutputFormat, emails: &[StoredEmail]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_emails(emails)),
        OutputFormat::Json => json::format_emails(emails),
    }
}

pub fn format_stats(format: OutputFormat, report: &StatsReport) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_stats(report)),
        OutputFormat::Json => json::format_stats(report),
    }
}

pub fn format_user(format: OutputFormat, user: &User) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_user(user)),
        OutputFormat::Json => json::format_user(user),
    }
}

pub fn format_analyze(format: OutputFormat, response: &AnalyzeResponse) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(response.message.clone()),
        OutputFormat::Json => json::format_analyze(response),
    }
}
