//! Filtering, sorting and paging over the application list.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::models::{Application, ApplicationStatus, StoredEmail};

pub mod stats;

pub use stats::{
    available_years, monthly_activity, status_distribution, yearly_activity, ActivityBucket,
    ApplicationStats, StatusCount,
};

pub const DEFAULT_PER_PAGE: usize = 10;
pub const PAGE_SIZES: [usize; 4] = [10, 20, 50, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Id,
    Company,
    Role,
    Location,
    Date,
    Status,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "company" => Ok(Self::Company),
            "role" => Ok(Self::Role),
            "location" => Ok(Self::Location),
            "date" => Ok(Self::Date),
            "status" => Ok(Self::Status),
            other => Err(format!(
                "unknown sort field '{other}' (expected id, company, role, location, date or status)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: SortField::Date,
            direction: SortDirection::Desc,
        }
    }
}

impl SortState {
    /// Selecting the active column flips its direction; any other column
    /// becomes active in ascending order.
    pub fn toggle(self, field: SortField) -> Self {
        if self.field == field {
            Self {
                field,
                direction: self.direction.reversed(),
            }
        } else {
            Self {
                field,
                direction: SortDirection::Asc,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ApplicationStatus),
}

impl StatusFilter {
    fn matches(&self, status: &ApplicationStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationQuery {
    pub search: String,
    pub status: StatusFilter,
    pub sort: SortState,
    /// 1-based; clamped into the available range.
    pub page: usize,
    pub per_page: usize,
}

impl Default for ApplicationQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: StatusFilter::All,
            sort: SortState::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationPage {
    pub items: Vec<Application>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
    /// 1-based position of the first item shown, 0 when nothing matches.
    pub first: usize,
    pub last: usize,
}

impl ApplicationQuery {
    pub fn matches(&self, application: &Application) -> bool {
        let needle = self.search.trim().to_lowercase();
        let matches_search = needle.is_empty()
            || [&application.company, &application.role, &application.location]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
        matches_search && self.status.matches(&application.status)
    }

    pub fn run(&self, applications: &[Application]) -> ApplicationPage {
        let mut matching: Vec<&Application> =
            applications.iter().filter(|app| self.matches(app)).collect();
        matching.sort_by(|a, b| {
            let ordering = compare_by(self.sort.field, a, b);
            match self.sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let per_page = self.per_page.max(1);
        let total = matching.len();
        let total_pages = total.div_ceil(per_page);
        let page = self.page.clamp(1, total_pages.max(1));
        let start = (page - 1) * per_page;
        let end = (start + per_page).min(total);

        let items: Vec<Application> = matching
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|app| (*app).clone())
            .collect();

        ApplicationPage {
            first: if total == 0 { 0 } else { start + 1 },
            last: end,
            items,
            total,
            page,
            total_pages,
        }
    }
}

fn compare_by(field: SortField, a: &Application, b: &Application) -> Ordering {
    match field {
        SortField::Id => compare_text(&a.id, &b.id),
        SortField::Company => compare_text(&a.company, &b.company),
        SortField::Role => compare_text(&a.role, &b.role),
        SortField::Location => compare_text(&a.location, &b.location),
        SortField::Status => compare_text(a.status.as_str(), b.status.as_str()),
        // Unparseable dates order before every real date.
        SortField::Date => a.applied_on().cmp(&b.applied_on()),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Stored emails linked to `application`, in stored order.
pub fn related_emails<'a>(application: &Application, emails: &'a [StoredEmail]) -> Vec<&'a StoredEmail> {
    emails
        .iter()
        .filter(|email| application.email_ids.contains(&email.email_id))
        .collect()
}

/// Link `email_id` if absent, unlink it otherwise.
pub fn toggle_email(email_ids: &mut Vec<String>, email_id: &str) {
    match email_ids.iter().position(|id| id == email_id) {
        Some(idx) => {
            email_ids.remove(idx);
        }
        None => email_ids.push(email_id.to_string()),
    }
}
