use std::time::Duration;

use clap::Parser;

use crate::collectors::AdzunaCredentials;
use crate::collectors::runner::{
    DEFAULT_LOCATION, DEFAULT_MAX_PAGES, DEFAULT_QUERY, DEFAULT_RUN_BUDGET,
};
use crate::collectors::scrape::{Pacing, ScrapeTimeouts};
use crate::models::job::Source;
use crate::retry::RetryPolicy;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobharvest", about = "Job listing ingestion service")]
pub struct Config {
    /// Database connection URL. Without one, jobs are kept in memory.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true")]
    pub run_migrations: bool,

    /// Log output format: "text" or "json"
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    #[arg(long, env = "ADZUNA_APP_ID")]
    pub adzuna_app_id: Option<String>,

    #[arg(long, env = "ADZUNA_APP_KEY", hide_env_values = true)]
    pub adzuna_app_key: Option<String>,

    /// RapidAPI key used for JSearch
    #[arg(long, env = "RAPID_API_KEY", hide_env_values = true)]
    pub rapid_api_key: Option<String>,

    #[arg(long, env = "JOOBLE_API_KEY", hide_env_values = true)]
    pub jooble_api_key: Option<String>,

    /// Bearer secret required by the HTTP API. Unset leaves it open.
    #[arg(long, env = "CRON_SECRET", hide_env_values = true)]
    pub cron_secret: Option<String>,

    /// Wall-clock budget for one ingestion run, in seconds
    #[arg(long, env = "RUN_BUDGET_SECS", default_value_t = DEFAULT_RUN_BUDGET.as_secs())]
    pub run_budget_secs: u64,

    /// Attempts per source, including the first
    #[arg(long, env = "RETRY_ATTEMPTS", default_value = "3")]
    pub retry_attempts: u32,

    /// Backoff after the first failed attempt, doubled after each further one
    #[arg(long, env = "RETRY_BASE_MS", default_value = "1000")]
    pub retry_base_ms: u64,

    #[arg(long, env = "PAGE_DELAY_MIN_MS", default_value = "3000")]
    pub page_delay_min_ms: u64,

    #[arg(long, env = "PAGE_DELAY_MAX_MS", default_value = "6000")]
    pub page_delay_max_ms: u64,

    #[arg(long, env = "NAVIGATION_TIMEOUT_SECS", default_value = "30")]
    pub navigation_timeout_secs: u64,

    #[arg(long, env = "SELECTOR_TIMEOUT_SECS", default_value = "15")]
    pub selector_timeout_secs: u64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the web server (default when no subcommand given)
    Serve {
        /// Listen address
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
        listen_addr: String,
    },
    /// Run one ingestion and print the report as JSON
    Ingest {
        #[arg(long, default_value = DEFAULT_QUERY)]
        query: String,

        #[arg(long, default_value = DEFAULT_LOCATION)]
        location: String,

        /// Comma-separated source names; all sources when omitted
        #[arg(long, value_delimiter = ',')]
        sources: Vec<Source>,

        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: u32,
    },
    /// Report duplicate jobs, optionally deleting all but the oldest of each
    Duplicates {
        #[arg(long)]
        purge: bool,
    },
    /// Print the busiest job domains among stored titles
    Trending,
}

impl Config {
    /// Resolve the command, defaulting to Serve if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }

    pub fn adzuna_credentials(&self) -> Option<AdzunaCredentials> {
        match (&self.adzuna_app_id, &self.adzuna_app_key) {
            (Some(app_id), Some(app_key)) => Some(AdzunaCredentials {
                app_id: app_id.clone(),
                app_key: app_key.clone(),
            }),
            _ => None,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            base_delay: Duration::from_millis(self.retry_base_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            min: Duration::from_millis(self.page_delay_min_ms),
            max: Duration::from_millis(self.page_delay_max_ms.max(self.page_delay_min_ms)),
        }
    }

    pub fn scrape_timeouts(&self) -> ScrapeTimeouts {
        ScrapeTimeouts {
            navigation: Duration::from_secs(self.navigation_timeout_secs),
            selector: Duration::from_secs(self.selector_timeout_secs),
        }
    }

    pub fn run_budget(&self) -> Duration {
        Duration::from_secs(self.run_budget_secs)
    }
}
