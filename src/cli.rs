// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::client::HttpJobsApi;
use crate::config::AppConfig;
use crate::notify::{Notification, NotificationKind};
use crate::session::{JobSearchSession, SessionMode};
use crate::types::{JobId, LocationId};

#[derive(Parser)]
#[command(name = "jobsearch")]
#[command(about = "Search, browse and save jobs from the command line")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// YAML configuration file (defaults to ./jobsearch.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Browse without an account: no favorites, no saving, one page only
    #[arg(long, global = true)]
    pub public: bool,

    /// Write JSON logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search jobs and print the results page by page
    Search {
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        city: Option<String>,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// List saved job ids
    Saved,
    /// Save a job, or remove it if it is already saved
    Toggle { job_id: String },
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    info!("Jobs API: {}", config.api.base_url);

    let api = HttpJobsApi::new(&config.api.base_url, config.token.clone(), config.api.timeout())?;
    let mode = session_mode(cli.public, &api);
    let (session, mut notifications) = JobSearchSession::new(Arc::new(api), config.search, mode);

    match cli.command {
        Command::Search {
            text,
            country,
            state,
            city,
            pages,
        } => {
            if let Some(text) = text {
                session.set_input_search_term(text);
                session.handle_search();
            }
            session.handle_country_change(country.map(LocationId::new));
            session.handle_state_change(state.map(LocationId::new));
            session.handle_city_change(city.map(LocationId::new));

            session.refresh().await.context("Failed to load jobs")?;
            print_page(&session);

            for _ in 1..pages {
                if !session.load_more() {
                    break;
                }
                session.fetch_jobs(false).await.context("Failed to load more jobs")?;
                print_page(&session);
            }
        }

        Command::Saved => {
            if mode.is_public() {
                println!("Saved jobs are not available in public mode");
                return Ok(());
            }
            session
                .fetch_favorites(false)
                .await
                .context("Failed to load saved jobs")?;

            let saved = session.saved_job_ids();
            println!("{} saved job(s)", saved.len());
            for job_id in saved {
                println!("  {}", job_id);
            }
        }

        Command::Toggle { job_id } => {
            toggle(&session, &mut notifications, JobId::new(job_id)).await?;
        }
    }

    Ok(())
}

fn session_mode(public: bool, api: &HttpJobsApi) -> SessionMode {
    if public {
        SessionMode::Public
    } else if !api.is_authenticated() {
        info!("No JOBS_API_TOKEN set, browsing in public mode");
        SessionMode::Public
    } else {
        SessionMode::Authenticated
    }
}

async fn toggle(
    session: &JobSearchSession,
    notifications: &mut mpsc::UnboundedReceiver<Notification>,
    job_id: JobId,
) -> Result<()> {
    // Direction depends on the current favorites.
    session
        .fetch_favorites(false)
        .await
        .context("Failed to load saved jobs")?;

    let result = session.handle_save(job_id.clone()).await;
    drain_notifications(notifications);
    result.with_context(|| format!("Failed to toggle saved state of {}", job_id))?;
    Ok(())
}

fn print_page(session: &JobSearchSession) {
    let pagination = session.pagination();
    let page = session.filters().page;
    println!(
        "Page {}/{} ({} jobs)",
        page, pagination.total_pages, pagination.total_items
    );

    let saved = session.saved_job_ids();
    for job in session.jobs() {
        let marker = if saved.contains(&job.id) { "★" } else { " " };
        println!(
            "{} {}  {}  {}",
            marker,
            job.id,
            job.title.as_deref().unwrap_or("(untitled)"),
            job.company.as_deref().unwrap_or("")
        );
    }
}

fn drain_notifications(notifications: &mut mpsc::UnboundedReceiver<Notification>) {
    while let Ok(notification) = notifications.try_recv() {
        let icon = match notification.kind {
            NotificationKind::Success => "✅",
            NotificationKind::Error => "❌",
            NotificationKind::Info => "ℹ️",
        };
        println!("{} {}", icon, notification.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::JobsApi;
    use crate::config::SearchSettings;
    use crate::error::ApiError;
    use crate::types::{FavoritesPage, JobsPage, ListJobsRequest};
    use async_trait::async_trait;

    struct RejectingApi;

    #[async_trait]
    impl JobsApi for RejectingApi {
        async fn list_jobs(&self, _request: &ListJobsRequest) -> Result<JobsPage, ApiError> {
            Err(ApiError::Timeout)
        }

        async fn list_favorites(&self, _page: u32, _limit: u32) -> Result<FavoritesPage, ApiError> {
            Ok(FavoritesPage { data: vec![] })
        }

        async fn save_job(&self, _job_id: &JobId) -> Result<(), ApiError> {
            Err(ApiError::Http {
                status: 500,
                message: "Database unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_failed_toggle_is_an_error() {
        let (session, mut notifications) = JobSearchSession::new(
            Arc::new(RejectingApi),
            SearchSettings::default(),
            SessionMode::Authenticated,
        );

        let result = toggle(&session, &mut notifications, JobId::from("job-42")).await;

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("job-42"), "{}", message);
        assert!(message.contains("Database unavailable"), "{}", message);
        assert!(notifications.try_recv().is_err(), "notifications were drained");
    }

    #[test]
    fn test_missing_token_selects_public_mode() {
        let anonymous = HttpJobsApi::new("http://localhost:8080/api", None, None).unwrap();
        assert_eq!(session_mode(false, &anonymous), SessionMode::Public);

        let signed_in =
            HttpJobsApi::new("http://localhost:8080/api", Some("t0k".to_string()), None).unwrap();
        assert_eq!(session_mode(false, &signed_in), SessionMode::Authenticated);
        assert_eq!(session_mode(true, &signed_in), SessionMode::Public);
    }

    #[test]
    fn test_parse_search_command() {
        let cli = Cli::try_parse_from([
            "jobsearch", "search", "--text", "rust", "--country", "ch", "--pages", "3",
        ])
        .unwrap();

        match cli.command {
            Command::Search {
                text, country, pages, ..
            } => {
                assert_eq!(text.as_deref(), Some("rust"));
                assert_eq!(country.as_deref(), Some("ch"));
                assert_eq!(pages, 3);
            }
            _ => panic!("expected search"),
        }
        assert!(!cli.public);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["jobsearch", "toggle", "job-42", "--public"]).unwrap();
        assert!(cli.public);
        assert!(matches!(cli.command, Command::Toggle { ref job_id } if job_id == "job-42"));
    }
}
