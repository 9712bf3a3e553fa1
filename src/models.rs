use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

pub const NO_SUBJECT: &str = "(No Subject)";
pub const UNKNOWN_SENDER: &str = "(Unknown)";

/// A fully fetched mailbox message, reduced to what the dashboard shows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageDetail {
    pub id: String,
    pub snippet: String,
    pub subject: String,
    pub from: String,
    pub date: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationStatus {
    Applied,
    Pending,
    Interview,
    Offer,
    Rejected,
    Other(String),
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Applied => "Applied",
            Self::Pending => "Pending",
            Self::Interview => "Interview",
            Self::Offer => "Offer",
            Self::Rejected => "Rejected",
            Self::Other(raw) => raw,
        }
    }
}

impl Display for ApplicationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ApplicationStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Applied" => Self::Applied,
            "Pending" => Self::Pending,
            "Interview" => Self::Interview,
            "Offer" => Self::Offer,
            "Rejected" => Self::Rejected,
            _ => Self::Other(value),
        }
    }
}

impl From<ApplicationStatus> for String {
    fn from(value: ApplicationStatus) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "applied" => Ok(Self::Applied),
            "pending" => Ok(Self::Pending),
            "interview" => Ok(Self::Interview),
            "offer" => Ok(Self::Offer),
            "rejected" => Ok(Self::Rejected),
            "" => Err("empty application status".to_string()),
            _ => Ok(Self::Other(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    #[serde(rename = "_id")]
    pub id: String,
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub location: String,
    pub date: String,
    pub status: ApplicationStatus,
    #[serde(rename = "emailIds", default)]
    pub email_ids: Vec<String>,
}

impl Application {
    /// Calendar date the application was sent, if the stored value parses.
    pub fn applied_on(&self) -> Option<NaiveDate> {
        parse_application_date(&self.date)
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_application_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Partial update sent to the backend; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ApplicationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationStatus>,
    #[serde(rename = "emailIds", skip_serializing_if = "Option::is_none")]
    pub email_ids: Option<Vec<String>>,
}

impl ApplicationUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// An email the backend has already analyzed and stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredEmail {
    #[serde(rename = "emailId")]
    pub email_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "lastSyncTime")]
    pub last_sync_time: Option<String>,
}
