use chrono::{DateTime, FixedOffset, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::applications::ApplicationPage;
use crate::ingest::IngestionState;
use crate::models::{ApplicationStatus, StoredEmail, User};
use crate::output::{ApplicationDetail, StatsReport};

const FROM_WIDTH: usize = 28;
const SUBJECT_WIDTH: usize = 52;
const DATE_WIDTH: usize = 12;

const ID_WIDTH: usize = 10;
const COMPANY_WIDTH: usize = 20;
const ROLE_WIDTH: usize = 26;
const LOCATION_WIDTH: usize = 16;
const STATUS_WIDTH: usize = 10;

pub fn format_inbox(state: &IngestionState, full: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Last sync: {}\n",
        state
            .last_sync
            .map(|at| relative_date(&at.to_rfc3339()))
            .unwrap_or_else(|| "never".to_string())
    ));

    if state.messages.is_empty() {
        out.push_str("No messages ingested.\n");
        return out;
    }
    out.push('\n');

    if full {
        for (idx, message) in state.messages.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
                out.push_str(&"-".repeat(80));
                out.push('\n');
            }
            out.push_str(&format!("ID: {}\n", message.id));
            out.push_str(&format!("Subject: {}\n", message.subject));
            out.push_str(&format!("From: {}\n", message.from));
            out.push_str(&format!("Date: {}\n", message.date));
            out.push('\n');
            out.push_str(if message.body.is_empty() {
                "(empty)"
            } else {
                message.body.as_str()
            });
            out.push('\n');
        }
        return out;
    }

    out.push_str(&format!(
        "{:<from$}  {:<subject$}  {:<date$}\n",
        "From",
        "Subject",
        "Date",
        from = FROM_WIDTH,
        subject = SUBJECT_WIDTH,
        date = DATE_WIDTH
    ));
    out.push_str(&format!(
        "{}  {}  {}\n",
        "-".repeat(FROM_WIDTH),
        "-".repeat(SUBJECT_WIDTH),
        "-".repeat(DATE_WIDTH)
    ));
    for message in &state.messages {
        out.push_str(&format!(
            "{}  {}  {}\n",
            pad(&message.from, FROM_WIDTH),
            pad(&message.subject, SUBJECT_WIDTH),
            pad(&relative_date(&message.date), DATE_WIDTH)
        ));
    }
    out
}

pub fn format_applications(page: &ApplicationPage) -> String {
    if page.total == 0 {
        return "No applications found.".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{}  {}  {}  {}  {}  {}\n",
        pad("ID", ID_WIDTH),
        pad("Company", COMPANY_WIDTH),
        pad("Role", ROLE_WIDTH),
        pad("Location", LOCATION_WIDTH),
        pad("Date", DATE_WIDTH),
        pad("Status", STATUS_WIDTH)
    ));
    out.push_str(&format!(
        "{}  {}  {}  {}  {}  {}\n",
        "-".repeat(ID_WIDTH),
        "-".repeat(COMPANY_WIDTH),
        "-".repeat(ROLE_WIDTH),
        "-".repeat(LOCATION_WIDTH),
        "-".repeat(DATE_WIDTH),
        "-".repeat(STATUS_WIDTH)
    ));

    for app in &page.items {
        let date = app
            .applied_on()
            .map(|day| day.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| app.date.clone());
        out.push_str(&format!(
            "{}  {}  {}  {}  {}  {}\n",
            pad(&format!("#{}", app.id), ID_WIDTH),
            pad(&app.company, COMPANY_WIDTH),
            pad(&app.role, ROLE_WIDTH),
            pad(&app.location, LOCATION_WIDTH),
            pad(&date, DATE_WIDTH),
            pad(app.status.as_str(), STATUS_WIDTH)
        ));
    }

    out.push_str(&format!(
        "\nShowing {} to {} of {} results (page {} of {})\n",
        page.first, page.last, page.total, page.page, page.total_pages
    ));
    out
}

pub fn format_application(detail: &ApplicationDetail<'_>) -> String {
    let app = detail.application;
    let mut out = String::new();
    out.push_str(&format!("ID: {}\n", app.id));
    out.push_str(&format!("Company: {}\n", app.company));
    out.push_str(&format!("Role: {}\n", app.role));
    if !app.location.is_empty() {
        out.push_str(&format!("Location: {}\n", app.location));
    }
    out.push_str(&format!("Date: {}\n", app.date));
    out.push_str(&format!("Status: {}\n", colorize_status(&app.status)));

    out.push('\n');
    out.push_str(&format!("Related emails ({})\n", detail.emails.len()));
    out.push_str("--------------\n");
    if detail.emails.is_empty() {
        out.push_str("(none)\n");
    }
    for email in &detail.emails {
        out.push_str(&format!(
            "{}  {}  {}\n",
            pad(&relative_date(&email.date), DATE_WIDTH),
            pad(&email.subject, SUBJECT_WIDTH),
            email.status
        ));
    }
    out
}

pub fn format_emails(emails: &[StoredEmail]) -> String {
    if emails.is_empty() {
        return "No emails found.".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{}  {}  {}  Status\n",
        pad("Email ID", 18),
        pad("Subject", SUBJECT_WIDTH),
        pad("Date", DATE_WIDTH)
    ));
    out.push_str(&format!(
        "{}  {}  {}  {}\n",
        "-".repeat(18),
        "-".repeat(SUBJECT_WIDTH),
        "-".repeat(DATE_WIDTH),
        "-".repeat(STATUS_WIDTH)
    ));
    for email in emails {
        out.push_str(&format!(
            "{}  {}  {}  {}\n",
            pad(&email.email_id, 18),
            pad(&email.subject, SUBJECT_WIDTH),
            pad(&relative_date(&email.date), DATE_WIDTH),
            email.status
        ));
    }
    out
}

pub fn format_stats(report: &StatsReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();
    out.push_str("Application Stats\n");
    out.push_str("=================\n");
    out.push_str(&format!("Total:         {}\n", summary.total));
    out.push_str(&format!("Applied:       {}\n", summary.applied));
    out.push_str(&format!("Interviews:    {}\n", summary.interviews));
    out.push_str(&format!("Offers:        {}\n", summary.offers));
    out.push_str(&format!("Rejected:      {}\n", summary.rejected));
    out.push_str(&format!("Response rate: {}%\n", summary.response_rate));

    out.push('\n');
    out.push_str(&format!("Activity in {}\n", report.year));
    out.push_str("----------------\n");
    out.push_str("Month  Applications  Interviews  Offers\n");
    for bucket in &report.monthly {
        out.push_str(&format!(
            "{:<5}  {:>12}  {:>10}  {:>6}\n",
            bucket.label, bucket.applications, bucket.interviews, bucket.offers
        ));
    }

    if !report.yearly.is_empty() {
        out.push('\n');
        out.push_str("All time\n");
        out.push_str("--------\n");
        for bucket in &report.yearly {
            out.push_str(&format!(
                "{:<5}  {:>12}  {:>10}  {:>6}\n",
                bucket.label, bucket.applications, bucket.interviews, bucket.offers
            ));
        }
    }

    out.push('\n');
    out.push_str(&format!("Outcomes in {}\n", report.year));
    out.push_str("----------------\n");
    if report.distribution.is_empty() {
        out.push_str("(no applications)\n");
    }
    for slice in &report.distribution {
        out.push_str(&format!("{:<10} {:>6}\n", slice.status.as_str(), slice.count));
    }

    let years: Vec<String> = report.available_years.iter().map(i32::to_string).collect();
    out.push_str(&format!("\nYears: {}\n", years.join(", ")));
    out
}

pub fn format_user(user: &User) -> String {
    let mut out = String::new();
    out.push_str(&format!("Name: {}\n", user.name));
    out.push_str(&format!("Email: {}\n", user.email));
    out.push_str(&format!("ID: {}\n", user.id));
    if let Some(created_at) = &user.created_at {
        out.push_str(&format!("Member since: {created_at}\n"));
    }
    out.push_str(&format!(
        "Last sync: {}\n",
        user.last_sync_time
            .as_deref()
            .map(relative_date)
            .unwrap_or_else(|| "never".to_string())
    ));
    out
}

fn colorize_status(status: &ApplicationStatus) -> String {
    match status {
        ApplicationStatus::Offer => format!("\u{1b}[32m{status}\u{1b}[0m"),
        ApplicationStatus::Rejected => format!("\u{1b}[31m{status}\u{1b}[0m"),
        ApplicationStatus::Interview => format!("\u{1b}[33m{status}\u{1b}[0m"),
        _ => status.to_string(),
    }
}

fn parse_timestamp(input: &str) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();
    DateTime::parse_from_rfc3339(input)
        .or_else(|_| DateTime::parse_from_rfc2822(input))
        .ok()
}

/// Short age for RFC 3339 or RFC 2822 timestamps; anything else is echoed.
fn relative_date(input: &str) -> String {
    let Some(parsed) = parse_timestamp(input) else {
        return input.to_string();
    };
    let parsed = parsed.with_timezone(&Utc);

    let delta = Utc::now().signed_duration_since(parsed);
    if delta.num_seconds() < 0 {
        return "in future".to_string();
    }
    if delta.num_minutes() < 1 {
        return "just now".to_string();
    }
    if delta.num_hours() < 1 {
        return format!("{}m ago", delta.num_minutes());
    }
    if delta.num_hours() < 24 {
        return format!("{}h ago", delta.num_hours());
    }
    if delta.num_days() == 1 {
        return "yesterday".to_string();
    }
    if delta.num_days() < 7 {
        return format!("{}d ago", delta.num_days());
    }
    parsed.format("%Y-%m-%d").to_string()
}

fn pad(value: &str, width: usize) -> String {
    let truncated = truncate_for_width(value, width);
    let used = UnicodeWidthStr::width(truncated.as_str());
    format!("{truncated}{}", " ".repeat(width.saturating_sub(used)))
}

fn truncate_for_width(value: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(value) <= max_width {
        return value.to_string();
    }

    if max_width <= 1 {
        return "…".to_string();
    }

    let mut out = String::new();
    let mut width = 0usize;
    for c in value.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw + 1 > max_width {
            break;
        }
        out.push(c);
        width += cw;
    }
    out.push('…');
    out
}
