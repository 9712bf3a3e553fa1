use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use jobtrack::applications::{SortField, StatusFilter};
use jobtrack::config;
use jobtrack::models::ApplicationStatus;

#[derive(Debug, Parser)]
#[command(name = "jobtrack", version, about = "Job application tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output structured JSON
    #[arg(long, global = true)]
    json: bool,

    /// Job tracker backend base URL
    #[arg(long, global = true, env = config::BACKEND_URL_ENV)]
    backend_url: Option<String>,

    /// Session token for the backend
    #[arg(long, global = true, env = config::AUTH_TOKEN_ENV, hide_env_values = true)]
    auth_token: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pull new messages from the primary Gmail inbox
    Sync(SyncArgs),
    /// List tracked applications
    Applications(ApplicationsArgs),
    /// Show application statistics and activity
    Stats(StatsArgs),
    /// List analyzed emails
    Emails(EmailsArgs),
    /// Edit one application
    Update(UpdateArgs),
    /// Ask the backend to analyze the mailbox
    Analyze,
    /// Show the signed-in user
    Me,
}

#[derive(Debug, Args)]
struct SyncArgs {
    /// Gmail OAuth access token
    #[arg(long, env = config::GMAIL_TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,
    /// Gmail API base URL
    #[arg(long, env = config::GMAIL_API_BASE_ENV)]
    api_base: Option<String>,
    /// Keep polling after the first run
    #[arg(long, default_value_t = false)]
    watch: bool,
    /// Seconds between polls in watch mode
    #[arg(long, default_value_t = 60)]
    interval: u64,
    /// Print full message bodies
    #[arg(long, default_value_t = false)]
    full: bool,
}

#[derive(Debug, Args)]
struct ApplicationsArgs {
    /// Match company, role or location
    #[arg(long)]
    search: Option<String>,
    /// `all` or one status (Pending, Interview, Offer, Rejected, ...)
    #[arg(long, default_value = "all")]
    status: StatusFilter,
    #[arg(long, default_value = "date")]
    sort: SortField,
    /// Sort ascending instead of descending
    #[arg(long, default_value_t = false)]
    asc: bool,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = 10, value_parser = parse_page_size)]
    per_page: usize,
}

#[derive(Debug, Args)]
struct StatsArgs {
    /// Year for monthly activity and outcomes (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,
}

#[derive(Debug, Args)]
struct EmailsArgs {
    /// Only emails linked to this application
    #[arg(long)]
    application: Option<String>,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    id: String,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    role: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    status: Option<ApplicationStatus>,
    /// Link or unlink an email id (repeatable)
    #[arg(long = "toggle-email")]
    toggle_email: Vec<String>,
}

fn parse_page_size(raw: &str) -> Result<usize, String> {
    let value: usize = raw
        .parse()
        .map_err(|_| format!("invalid page size '{raw}'"))?;
    if jobtrack::applications::PAGE_SIZES.contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "page size must be one of {:?}",
            jobtrack::applications::PAGE_SIZES
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::dispatch(cli).await
}

mod commands {
    use std::time::Duration;

    use anyhow::{anyhow, bail, Context, Result};
    use chrono::{Datelike, Local};

    use jobtrack::applications::{
        available_years, monthly_activity, related_emails, status_distribution, toggle_email,
        yearly_activity, ApplicationQuery, ApplicationStats, SortDirection, SortState,
    };
    use jobtrack::backend::BackendClient;
    use jobtrack::connectors::GmailApiConnector;
    use jobtrack::ingest::{GmailIngestor, Ingestor, SyncOutcome};
    use jobtrack::models::{Application, ApplicationUpdate};
    use jobtrack::output::{self, ApplicationDetail, OutputFormat, StatsReport};

    use super::{ApplicationsArgs, Cli, Commands, EmailsArgs, StatsArgs, SyncArgs, UpdateArgs};

    pub async fn dispatch(cli: Cli) -> Result<()> {
        let format = OutputFormat::from_json_flag(cli.json);
        let backend = match cli.backend_url.as_deref() {
            Some(url) => BackendClient::with_base_url(url, cli.auth_token),
            None => BackendClient::new(cli.auth_token),
        };

        match cli.command {
            Commands::Sync(args) => handle_sync(args, format).await,
            Commands::Applications(args) => handle_applications(&backend, args, format).await,
            Commands::Stats(args) => handle_stats(&backend, args, format).await,
            Commands::Emails(args) => handle_emails(&backend, args, format).await,
            Commands::Update(args) => handle_update(&backend, args, format).await,
            Commands::Analyze => handle_analyze(&backend, format).await,
            Commands::Me => handle_me(&backend, format).await,
        }
    }

    async fn handle_sync(args: SyncArgs, format: OutputFormat) -> Result<()> {
        let token = args
            .token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("no Gmail access token; pass --token or set {}", jobtrack::config::GMAIL_TOKEN_ENV)
            })?;
        let connector = match args.api_base.as_deref() {
            Some(base) => GmailApiConnector::with_base_url(base),
            None => GmailApiConnector::new(),
        };

        let mut host = GmailIngestor::new(Ingestor::new(connector));
        let outcome = host.connect(token).await;
        report_sync(&host, outcome, format, args.full)?;

        if args.watch {
            let interval = Duration::from_secs(args.interval.max(1));
            loop {
                tokio::time::sleep(interval).await;
                let outcome = host.sync().await;
                report_sync(&host, outcome, format, args.full)?;
            }
        }
        Ok(())
    }

    fn report_sync(
        host: &GmailIngestor<GmailApiConnector>,
        outcome: SyncOutcome,
        format: OutputFormat,
        full: bool,
    ) -> Result<()> {
        match outcome {
            SyncOutcome::NoToken => bail!("no Gmail access token available"),
            SyncOutcome::AlreadyRunning => {
                eprintln!("sync already in progress; skipped");
                return Ok(());
            }
            SyncOutcome::Completed(report) => {
                if format == OutputFormat::Table {
                    println!(
                        "sync: listed={} added={} rate_limited={} errors={}",
                        report.listed,
                        report.added,
                        report.rate_limited,
                        report.errors.len()
                    );
                }
            }
        }

        let formatted = output::format_inbox(format, &host.snapshot(), full)?;
        println!("{formatted}");
        Ok(())
    }

    async fn handle_applications(
        backend: &BackendClient,
        args: ApplicationsArgs,
        format: OutputFormat,
    ) -> Result<()> {
        let applications = load_applications(backend).await?;
        let query = ApplicationQuery {
            search: args.search.unwrap_or_default(),
            status: args.status,
            sort: SortState {
                field: args.sort,
                direction: if args.asc {
                    SortDirection::Asc
                } else {
                    SortDirection::Desc
                },
            },
            page: args.page,
            per_page: args.per_page,
        };

        let page = query.run(&applications);
        let formatted = output::format_applications(format, &page)?;
        println!("{formatted}");
        Ok(())
    }

    async fn handle_stats(backend: &BackendClient, args: StatsArgs, format: OutputFormat) -> Result<()> {
        let applications = load_applications(backend).await?;
        let current_year = Local::now().year();
        let year = args.year.unwrap_or(current_year);

        let report = StatsReport {
            summary: ApplicationStats::from_applications(&applications),
            year,
            monthly: monthly_activity(&applications, year),
            yearly: yearly_activity(&applications),
            distribution: status_distribution(&applications, Some(year)),
            available_years: available_years(&applications, current_year),
        };
        let formatted = output::format_stats(format, &report)?;
        println!("{formatted}");
        Ok(())
    }

    async fn handle_emails(backend: &BackendClient, args: EmailsArgs, format: OutputFormat) -> Result<()> {
        let emails = backend
            .fetch_emails()
            .await
            .context("fetch analyzed emails from backend")?;

        let Some(application_id) = args.application else {
            let formatted = output::format_emails(format, &emails)?;
            println!("{formatted}");
            return Ok(());
        };

        let applications = load_applications(backend).await?;
        let application = find_application(&applications, &application_id)?;
        let detail = ApplicationDetail {
            application,
            emails: related_emails(application, &emails),
        };
        let formatted = output::format_application(format, &detail)?;
        println!("{formatted}");
        Ok(())
    }

    async fn handle_update(backend: &BackendClient, args: UpdateArgs, format: OutputFormat) -> Result<()> {
        let mut update = ApplicationUpdate {
            company: args.company,
            role: args.role,
            location: args.location,
            date: args.date,
            status: args.status,
            email_ids: None,
        };

        if !args.toggle_email.is_empty() {
            let applications = load_applications(backend).await?;
            let mut email_ids = find_application(&applications, &args.id)?.email_ids.clone();
            for email_id in &args.toggle_email {
                toggle_email(&mut email_ids, email_id);
            }
            update.email_ids = Some(email_ids);
        }

        if update.is_empty() {
            bail!("nothing to update; pass at least one field");
        }

        let updated = backend
            .update_application(&args.id, &update)
            .await
            .with_context(|| format!("update application {}", args.id))?;
        let emails = backend
            .fetch_emails()
            .await
            .context("fetch analyzed emails from backend")?;
        let detail = ApplicationDetail {
            application: &updated,
            emails: related_emails(&updated, &emails),
        };
        let formatted = output::format_application(format, &detail)?;
        println!("{formatted}");
        Ok(())
    }

    async fn handle_analyze(backend: &BackendClient, format: OutputFormat) -> Result<()> {
        let response = backend
            .analyze()
            .await
            .context("request mailbox analysis from backend")?;
        let formatted = output::format_analyze(format, &response)?;
        println!("{formatted}");
        Ok(())
    }

    async fn handle_me(backend: &BackendClient, format: OutputFormat) -> Result<()> {
        let user = backend
            .current_user()
            .await
            .context("fetch current user from backend")?;
        let formatted = output::format_user(format, &user)?;
        println!("{formatted}");
        Ok(())
    }

    async fn load_applications(backend: &BackendClient) -> Result<Vec<Application>> {
        backend
            .fetch_applications()
            .await
            .with_context(|| format!("fetch applications from {}", backend.base_url()))
    }

    fn find_application<'a>(applications: &'a [Application], id: &str) -> Result<&'a Application> {
        applications
            .iter()
            .find(|app| app.id == id)
            .ok_or_else(|| anyhow!("application not found for id '{id}'"))
    }
}
