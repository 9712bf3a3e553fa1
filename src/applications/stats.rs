use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::models::{Application, ApplicationStatus};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationStats {
    pub total: usize,
    pub applied: usize,
    pub interviews: usize,
    pub offers: usize,
    pub rejected: usize,
    /// Percentage of applications that got any answer, rounded.
    pub response_rate: u32,
}

impl ApplicationStats {
    pub fn from_applications(applications: &[Application]) -> Self {
        let count = |status: ApplicationStatus| {
            applications
                .iter()
                .filter(|app| app.status == status)
                .count()
        };

        let total = applications.len();
        let interviews = count(ApplicationStatus::Interview);
        let offers = count(ApplicationStatus::Offer);
        let rejected = count(ApplicationStatus::Rejected);
        let response_rate = if total == 0 {
            0
        } else {
            (((interviews + offers + rejected) as f64 / total as f64) * 100.0).round() as u32
        };

        Self {
            total,
            applied: count(ApplicationStatus::Applied),
            interviews,
            offers,
            rejected,
            response_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityBucket {
    pub label: String,
    pub applications: usize,
    pub interviews: usize,
    pub offers: usize,
}

impl ActivityBucket {
    fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            applications: 0,
            interviews: 0,
            offers: 0,
        }
    }

    fn record(&mut self, status: &ApplicationStatus) {
        self.applications += 1;
        match status {
            ApplicationStatus::Interview => self.interviews += 1,
            ApplicationStatus::Offer => self.offers += 1,
            _ => {}
        }
    }
}

/// Twelve buckets, January to December, for applications sent in `year`.
pub fn monthly_activity(applications: &[Application], year: i32) -> Vec<ActivityBucket> {
    let mut buckets: Vec<ActivityBucket> = MONTH_LABELS.iter().map(|m| ActivityBucket::empty(*m)).collect();

    for app in applications {
        let Some(day) = app.applied_on() else {
            continue;
        };
        if day.year() == year {
            buckets[day.month0() as usize].record(&app.status);
        }
    }
    buckets
}

/// One bucket per year with at least one dated application, oldest first.
pub fn yearly_activity(applications: &[Application]) -> Vec<ActivityBucket> {
    let mut by_year: BTreeMap<i32, ActivityBucket> = BTreeMap::new();

    for app in applications {
        let Some(day) = app.applied_on() else {
            continue;
        };
        by_year
            .entry(day.year())
            .or_insert_with(|| ActivityBucket::empty(day.year().to_string()))
            .record(&app.status);
    }
    by_year.into_values().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub count: usize,
}

/// Outcome breakdown over `Pending`, `Interview`, `Offer` and `Rejected`.
/// Any other status counts as pending; empty buckets are omitted.
pub fn status_distribution(applications: &[Application], year: Option<i32>) -> Vec<StatusCount> {
    let mut counts = [
        (ApplicationStatus::Pending, 0usize),
        (ApplicationStatus::Interview, 0),
        (ApplicationStatus::Offer, 0),
        (ApplicationStatus::Rejected, 0),
    ];

    let in_year = |app: &Application| match year {
        None => true,
        Some(year) => app.applied_on().is_some_and(|day| day.year() == year),
    };

    for app in applications.iter().filter(|app| in_year(app)) {
        let slot = match app.status {
            ApplicationStatus::Interview => 1,
            ApplicationStatus::Offer => 2,
            ApplicationStatus::Rejected => 3,
            _ => 0,
        };
        counts[slot].1 += 1;
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(status, count)| StatusCount { status, count })
        .collect()
}

/// Years with applications, plus `current_year`, newest first.
pub fn available_years(applications: &[Application], current_year: i32) -> Vec<i32> {
    let mut years: Vec<i32> = applications
        .iter()
        .filter_map(|app| app.applied_on().map(|day| day.year()))
        .chain(std::iter::once(current_year))
        .collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

#[cfg(test)]
mod tests {
    use super::{
        available_years, monthly_activity, status_distribution, yearly_activity,
        ApplicationStats, StatusCount,
    };
    use crate::models::{Application, ApplicationStatus};

    fn app(date: &str, status: ApplicationStatus) -> Application {
        Application {
            id: format!("{date}-{status}"),
            company: "Acme".to_string(),
            role: "Engineer".to_string(),
            location: String::new(),
            date: date.to_string(),
            status,
            email_ids: Vec::new(),
        }
    }

    fn sample() -> Vec<Application> {
        vec![
            app("2026-01-05", ApplicationStatus::Applied),
            app("2026-01-20", ApplicationStatus::Interview),
            app("2026-03-01T09:30:00Z", ApplicationStatus::Offer),
            app("2025-12-31", ApplicationStatus::Rejected),
            app("2024-06-15", ApplicationStatus::Other("Ghosted".to_string())),
            app("someday", ApplicationStatus::Pending),
        ]
    }

    #[test]
    fn summary_counts_and_response_rate() {
        let stats = ApplicationStats::from_applications(&sample());
        assert_eq!(stats.total, 6);
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.interviews, 1);
        assert_eq!(stats.offers, 1);
        assert_eq!(stats.rejected, 1);
        // 3 of 6 answered
        assert_eq!(stats.response_rate, 50);
    }

    #[test]
    fn response_rate_rounds_and_handles_empty() {
        assert_eq!(ApplicationStats::from_applications(&[]).response_rate, 0);

        let apps = vec![
            app("2026-01-01", ApplicationStatus::Interview),
            app("2026-01-02", ApplicationStatus::Applied),
            app("2026-01-03", ApplicationStatus::Applied),
        ];
        assert_eq!(ApplicationStats::from_applications(&apps).response_rate, 33);

        let apps = vec![
            app("2026-01-01", ApplicationStatus::Interview),
            app("2026-01-02", ApplicationStatus::Offer),
            app("2026-01-03", ApplicationStatus::Applied),
        ];
        assert_eq!(ApplicationStats::from_applications(&apps).response_rate, 67);
    }

    #[test]
    fn monthly_activity_has_twelve_buckets_for_the_year() {
        let months = monthly_activity(&sample(), 2026);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].label, "Jan");
        assert_eq!(months[0].applications, 2);
        assert_eq!(months[0].interviews, 1);
        assert_eq!(months[2].offers, 1);
        assert_eq!(months[11].applications, 0);
        let total: usize = months.iter().map(|m| m.applications).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn yearly_activity_is_ascending_and_skips_undated() {
        let years = yearly_activity(&sample());
        let labels: Vec<&str> = years.iter().map(|y| y.label.as_str()).collect();
        assert_eq!(labels, vec!["2024", "2025", "2026"]);
        assert_eq!(years[2].applications, 3);
        assert_eq!(years[2].offers, 1);
    }

    #[test]
    fn distribution_folds_unknown_statuses_into_pending() {
        let all = status_distribution(&sample(), None);
        assert_eq!(
            all,
            vec![
                StatusCount { status: ApplicationStatus::Pending, count: 3 },
                StatusCount { status: ApplicationStatus::Interview, count: 1 },
                StatusCount { status: ApplicationStatus::Offer, count: 1 },
                StatusCount { status: ApplicationStatus::Rejected, count: 1 },
            ]
        );

        let only_2025 = status_distribution(&sample(), Some(2025));
        assert_eq!(
            only_2025,
            vec![StatusCount { status: ApplicationStatus::Rejected, count: 1 }]
        );
    }

    #[test]
    fn available_years_include_current_and_sort_descending() {
        assert_eq!(available_years(&sample(), 2027), vec![2027, 2026, 2025, 2024]);
        assert_eq!(available_years(&[], 2026), vec![2026]);
    }
}
